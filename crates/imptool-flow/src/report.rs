//! The checker's diagnostic report contract.
//!
//! Shape fixed by the external tool: a report is a sequence of errors, each
//! with a kind, a severity level, and ordered message fragments carrying a
//! description and a source line. Unknown JSON fields are ignored; a report
//! that fails to deserialize altogether is a hard failure at the call site.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Report Types
// ============================================================================

/// A full diagnostic report from one checker invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowReport {
    /// All diagnostics, in checker order.
    #[serde(default)]
    pub errors: Vec<ErrorReport>,
}

/// One diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Diagnostic kind (`infer`, `parse`, ...). Open set.
    #[serde(default)]
    pub kind: String,
    /// Severity level.
    #[serde(default)]
    pub level: DiagnosticLevel,
    /// Message fragments; the first carries the primary description.
    #[serde(default)]
    pub message: Vec<MessageFragment>,
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    #[default]
    Error,
    Warning,
}

/// One human-readable fragment of a diagnostic message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageFragment {
    /// Description text.
    #[serde(default)]
    pub descr: String,
    /// 1-indexed source line the fragment refers to.
    #[serde(default)]
    pub line: u32,
}

impl ErrorReport {
    /// Build a single-fragment error (used by tests and synthetic reports).
    pub fn new(kind: impl Into<String>, level: DiagnosticLevel, descr: impl Into<String>, line: u32) -> Self {
        ErrorReport {
            kind: kind.into(),
            level,
            message: vec![MessageFragment {
                descr: descr.into(),
                line,
            }],
        }
    }
}

// ============================================================================
// Unresolved Identifier Extraction
// ============================================================================

fn unresolved_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Cannot resolve name `([^`]+)`\.$").expect("unresolved-name regex")
    })
}

/// If the error was caused by an unresolved identifier, return its name.
pub fn unresolved_identifier(error: &ErrorReport) -> Option<&str> {
    if error.kind == "infer" || error.level == DiagnosticLevel::Error {
        let first = error.message.first()?;
        return unresolved_re()
            .captures(&first.descr)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());
    }
    None
}

/// Names of all unresolved identifiers in the report, in diagnostic order.
///
/// An identifier used several times appears once per diagnostic; callers
/// that resolve per name deduplicate.
pub fn find_unresolved_identifiers(report: &FlowReport) -> Vec<String> {
    report
        .errors
        .iter()
        .filter_map(unresolved_identifier)
        .map(String::from)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
