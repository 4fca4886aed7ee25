//! Automatic import resolution and insertion for Flow-typed JavaScript.
//!
//! Given a source snippet with free identifiers, imptool decides which
//! module exports each one (native module, installed dependency, project
//! file, or a named export confirmed by the Flow checker used as a
//! black-box oracle) and splices the resulting import statements into the
//! file text without corrupting the ones already there.
//!
//! The kernel lives in two engine crates; this crate wires them to a
//! project on disk and exposes the single host operation plus the `imp`
//! CLI front door:
//! - `imptool-core` — import statement model, merge engine, segmentation
//! - `imptool-flow` — the checker boundary: diagnostics, invocation, probing
//! - `project` — root discovery, manifest, candidate files
//! - `resolve` — the ordered resolver pipeline
//! - `engine` — resolve-and-insert, the host editing surface
//! - `error` / `output` — unified errors and JSON responses

pub mod engine;
pub mod error;
pub mod output;
pub mod project;
pub mod resolve;

pub use engine::{resolve_and_insert, ImportOutcome};
pub use error::ImpError;
pub use imptool_core::import::{ImportKind, ImportSpec};
