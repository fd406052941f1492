//! CLI error types with exit code handling
//!
//! Every command returns a [`CliError`]; `main` renders it with miette and
//! exits with [`CliError::exit_code`].

use kubemix_core::CoreError;
use kubemix_engine::EngineError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// The plan (or an input file) could not be understood
    #[error("Plan error: {message}")]
    #[diagnostic(code(kubemix::cli::plan))]
    Plan {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A helper rejected the resource it was given
    #[error(transparent)]
    #[diagnostic(transparent)]
    Assembly(#[from] EngineError),

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(kubemix::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Plan { .. } => exit_codes::PLAN_ERROR,
            CliError::Assembly(_) => exit_codes::ASSEMBLY_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    /// Create a plan error
    pub fn plan(message: impl Into<String>) -> Self {
        Self::Plan {
            message: message.into(),
            help: None,
        }
    }

    /// Create a plan error with help text
    pub fn plan_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Plan {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an IO error naming the path involved
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(err) => err.into(),
            other => CliError::plan(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::plan(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::plan(err.to_string())
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
