//! Unified error type and stable error codes for CLI output.
//!
//! Domain errors from the subsystems (project configuration, the checker
//! boundary, the merge engine) bridge into one [`ImpError`] via `From`
//! impls; [`OutputErrorCode`] maps each to a stable integer used both as
//! the process exit code and in JSON error responses.

use std::fmt;

use thiserror::Error;

use imptool_core::merge::ApplyError;
use imptool_flow::check::OracleError;

use crate::project::ConfigError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from the caller.
    InvalidArguments = 2,
    /// Missing manifest, static config, or required dependency.
    ConfigurationError = 3,
    /// Checker spawn failure, timeout, or unparsable output.
    OracleError = 4,
    /// Import merge conflict; the batch was not applied.
    MergeConflict = 5,
    /// Bugs and unexpected state.
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Stable code name for JSON responses.
    pub fn name(&self) -> &'static str {
        match self {
            OutputErrorCode::InvalidArguments => "InvalidArguments",
            OutputErrorCode::ConfigurationError => "ConfigurationError",
            OutputErrorCode::OracleError => "OracleError",
            OutputErrorCode::MergeConflict => "MergeConflict",
            OutputErrorCode::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// The canonical error type every subsystem error converts into before
/// reaching CLI output.
#[derive(Debug, Error)]
pub enum ImpError {
    /// Invalid arguments from the caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Project configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Checker process failure.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Import merge failure; no partial text was produced.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// IO error outside the subsystems.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ImpError {
    /// Create an invalid-arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        ImpError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ImpError::Internal {
            message: message.into(),
        }
    }

    /// The stable error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

impl From<&ImpError> for OutputErrorCode {
    fn from(err: &ImpError) -> Self {
        match err {
            ImpError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            ImpError::Config(_) => OutputErrorCode::ConfigurationError,
            ImpError::Oracle(_) => OutputErrorCode::OracleError,
            ImpError::Apply(_) => OutputErrorCode::MergeConflict,
            ImpError::Io(_) => OutputErrorCode::InternalError,
            ImpError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
