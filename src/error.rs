//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the logaudit application.
///
/// - 0: Success (completed normally, repairs were performed)
/// - 1: General error (unexpected failure, bad configuration)
/// - 2: Clean run (completed normally, nothing to prune and no missing lines)
/// - 3: Partial success (completed with recorded per-partition failures,
///   skipped source files, or partially pruned duplicate groups)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: audit completed and found work to do.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// Clean: audit completed, store already matches the corpus.
    Clean = 2,
    /// Partial success: audit completed but some units failed.
    PartialSuccess = 3,
    /// Interrupted: audit was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "LA000",
            Self::GeneralError => "LA001",
            Self::Clean => "LA002",
            Self::PartialSuccess => "LA003",
            Self::Interrupted => "LA130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "LA001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
