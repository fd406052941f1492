//! Assembler error types

use kubemix_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while assembling a manifest
///
/// Every builder fails fast: a missing precondition is reported instead of
/// producing a manifest with holes in it.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(code(kubemix::engine::resource))]
    Core(#[from] CoreError),

    /// A pod template label the operation depends on is absent
    #[error("{resource} has no pod template label '{label}'")]
    #[diagnostic(
        code(kubemix::engine::missing_label),
        help("set spec.template.metadata.labels.{label} before applying this step")
    )]
    MissingLabel { resource: String, label: String },

    /// The service port name format references an unknown placeholder
    #[error("invalid port name format '{format}': unknown placeholder '%({placeholder})s'")]
    #[diagnostic(
        code(kubemix::engine::name_format),
        help("only %(container)s and %(port)s are available")
    )]
    InvalidNameFormat { format: String, placeholder: String },

    /// A container port cannot be turned into a service port
    #[error("container '{container}' in {resource} has an invalid port: {message}")]
    #[diagnostic(code(kubemix::engine::port))]
    InvalidPort {
        resource: String,
        container: String,
        message: String,
    },

    #[error("YAML error: {0}")]
    #[diagnostic(code(kubemix::engine::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(kubemix::engine::json))]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn missing_label(resource: impl Into<String>, label: impl Into<String>) -> Self {
        Self::MissingLabel {
            resource: resource.into(),
            label: label.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
