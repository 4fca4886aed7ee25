//! Flow type-checker boundary for imptool.
//!
//! This crate owns everything that touches the external checker process:
//! - The diagnostic report contract (`report`)
//! - Executable discovery and `check-contents` invocation (`check`)
//! - Named-export probing, using the checker as a black-box export oracle
//!   (`probe`)
//!
//! The checker is trusted only at its interface: source text in, a JSON
//! diagnostic report out. A non-zero exit status is its normal way of
//! signalling that it found issues.

pub mod check;
pub mod probe;
pub mod report;
