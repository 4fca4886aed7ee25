//! Core import model for imptool.
//!
//! This crate provides the language-level machinery for working with ES
//! import statements as structured data:
//! - Import statement model: specifiers, declarations, parsing, rendering
//! - Merge engine: folding new imports into existing declarations atomically
//! - Import block segmentation: splitting file text into preamble, import
//!   region, and body
//!
//! Everything here is synchronous, single-threaded, and performs no I/O.

pub mod import;
pub mod merge;
pub mod segment;
