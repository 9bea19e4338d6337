//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use kubeseed_core::CoreError;
use kubeseed_engine::RenderError;
use kubeseed_kube::ClientError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Node configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    #[diagnostic(code(kubeseed::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A bundled manifest failed to render
    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    /// No bundled component carries this name
    #[error("Unknown component '{name}'")]
    #[diagnostic(code(kubeseed::cli::component))]
    UnknownComponent {
        name: String,
        #[help]
        help: Option<String>,
    },

    /// The API client could not be built
    #[error("Cluster error: {message}")]
    #[diagnostic(
        code(kubeseed::cli::cluster),
        help("check that the kubeconfig exists and names a reachable cluster")
    )]
    Cluster { message: String },

    /// One or more components failed to start
    #[error("{failed} of {total} component(s) failed to start")]
    #[diagnostic(
        code(kubeseed::cli::start),
        help("objects applied before the failure stay live; re-running converges once the cause is fixed")
    )]
    StartFailed { failed: usize, total: usize },

    /// Installs were interrupted before finishing
    #[error("Interrupted before every component started")]
    #[diagnostic(code(kubeseed::cli::cancelled))]
    Cancelled,

    /// IO error (stdout closed, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(kubeseed::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(kubeseed::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Render(_) => exit_codes::TEMPLATE_ERROR,
            CliError::UnknownComponent { .. } => exit_codes::USAGE_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::StartFailed { .. } => exit_codes::INSTALL_ERROR,
            CliError::Cancelled => exit_codes::CANCELLED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an unknown-component error listing the valid names
    pub fn unknown_component(name: impl Into<String>, known: &[&str]) -> Self {
        Self::UnknownComponent {
            name: name.into(),
            help: Some(format!("bundled components: {}", known.join(", "))),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io { path, source } => CliError::Io {
                message: format!("{path}: {source}"),
            },
            CoreError::InvalidConfig { message } => CliError::Config {
                message,
                help: Some("fix the node configuration file and retry".to_string()),
            },
            CoreError::YamlParse(err) => CliError::Config {
                message: err.to_string(),
                help: None,
            },
            other => CliError::internal(other.to_string()),
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        CliError::Cluster {
            message: err.to_string(),
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

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
