//! Exit codes and structured error output.

use serde::Serialize;

/// Process exit codes.
///
/// - 0: scan completed and duplicates were found
/// - 1: unexpected failure
/// - 2: scan completed without duplicates
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Duplicates were found.
    Success = 0,
    /// An error occurred.
    GeneralError = 1,
    /// No duplicates were found.
    NoDuplicates = 2,
    /// The scan was interrupted.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DF000",
            Self::GeneralError => "DF001",
            Self::NoDuplicates => "DF002",
            Self::Interrupted => "DF130",
        }
    }
}

/// Error report printed by `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code prefix such as `DF001`
    pub code: String,
    /// Numeric exit code
    pub exit_code: i32,
    /// Error message including its causes
    pub message: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Build a report from an application error.
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
