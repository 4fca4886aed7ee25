//! JSON output types for CLI responses.
//!
//! Every response carries `status` first and a schema version, and error
//! responses use the stable code names from [`OutputErrorCode`]. Field
//! order is fixed so output stays deterministic for the same input.
//!
//! [`OutputErrorCode`]: crate::error::OutputErrorCode

use std::io::{self, Write};

use serde::Serialize;

use imptool_core::import::ImportSpec;

use crate::error::ImpError;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Responses
// ============================================================================

/// Successful `import` response.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Response schema version.
    pub schema_version: &'static str,
    /// The file that was processed.
    pub file: String,
    /// Whether the updated text was written back to the file.
    pub written: bool,
    /// Imports that were inserted.
    pub resolved: Vec<ImportSpec>,
    /// Identifiers that remain unresolved.
    pub unresolved: Vec<String>,
    /// Oracle failure encountered mid-run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle_error: Option<String>,
    /// The updated text, when not written back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Error details for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Stable error code name.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always `"error"`.
    pub status: &'static str,
    /// Response schema version.
    pub schema_version: &'static str,
    /// The error.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Build the envelope for an error.
    pub fn from_error(err: &ImpError) -> Self {
        ErrorResponse {
            status: "error",
            schema_version: SCHEMA_VERSION,
            error: ErrorInfo {
                code: err.error_code().name().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Serialize a response as one JSON line.
pub fn emit_response<T: Serialize>(writer: &mut impl Write, response: &T) -> io::Result<()> {
    let json = serde_json::to_string(response).map_err(io::Error::other)?;
    writeln!(writer, "{json}")
}

// ============================================================================
// Tests
// ============================================================================
