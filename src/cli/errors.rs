//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code. Errors raised
//! by a subsystem keep that subsystem's category.

use std::fmt;
use std::io;

use crate::errors::ErrorCategory;
use crate::pipeline::{ArtifactError, PipelineError};

/// Severity levels for CLI errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Process exits non-zero
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing or invalid
    ConfigError,
    /// Database could not be opened
    DatabaseError,
    /// stdout or filesystem failure
    IoError,
    /// Analysis run aborted
    RunFailed,
    /// Requested policy is not registered
    UnknownPolicy,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "TABSIGHT_CLI_CONFIG_ERROR",
            Self::DatabaseError => "TABSIGHT_CLI_DATABASE_ERROR",
            Self::IoError => "TABSIGHT_CLI_IO_ERROR",
            Self::RunFailed => "TABSIGHT_CLI_RUN_FAILED",
            Self::UnknownPolicy => "TABSIGHT_CLI_UNKNOWN_POLICY",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
    category: Option<ErrorCategory>,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            category: None,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn database_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::DatabaseError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn unknown_policy(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::UnknownPolicy, msg)
    }

    /// Run aborted with an error of `category`
    pub fn run_failed(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            code: CliErrorCode::RunFailed,
            message: msg.into(),
            category: Some(category),
        }
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Category of the subsystem error behind a failed run
    pub fn category(&self) -> Option<ErrorCategory> {
        self.category
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Artifact(a) => a.into(),
            other => Self::run_failed(other.category(), other.to_string()),
        }
    }
}

impl From<ArtifactError> for CliError {
    fn from(e: ArtifactError) -> Self {
        Self {
            code: CliErrorCode::IoError,
            message: e.to_string(),
            category: Some(e.category()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
