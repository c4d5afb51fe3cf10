//! Exit codes for the vegtrend CLI.
//!
//! Exit code ranges:
//! - 0-1: Operational outcomes
//! - 10-19: User/input errors (recoverable by fixing inputs or arguments)
//! - 20-29: Internal and I/O errors

use vt_common::{Error, ErrorCategory};

/// Exit codes for vegtrend operations. These are a stable contract for
/// scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Result produced with at least one row.
    Clean = 0,

    /// Ran fine but the result is empty (e.g. filters matched nothing).
    EmptyResult = 1,

    /// Invalid arguments
    ArgsError = 10,

    /// Request does not fit the data (missing column, bad filter)
    StructuralError = 11,

    /// Reference table unusable
    RegistryError = 12,

    /// Configuration or scenario file invalid
    ConfigError = 13,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Codes 0-1.
    pub fn is_success(self) -> bool {
        (self as i32) < 10
    }

    /// Codes 10-19, resolvable by the user.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Name for JSON error output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::EmptyResult => "OK_EMPTY",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::StructuralError => "ERR_STRUCTURAL",
            ExitCode::RegistryError => "ERR_REGISTRY",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Structural => ExitCode::StructuralError,
            ErrorCategory::Registry => ExitCode::RegistryError,
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
