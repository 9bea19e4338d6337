//! Core error types

use thiserror::Error;

use crate::resource::ResourceKind;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Manifest asset not found: {path}")]
    AssetNotFound { path: String },

    #[error("Component '{component}': {kind} group must not follow {previous} group")]
    GroupOrder {
        component: String,
        kind: ResourceKind,
        previous: ResourceKind,
    },

    #[error("Component '{component}': {path} carries a payload that does not fit the {kind} group")]
    PayloadMismatch {
        component: String,
        path: String,
        kind: ResourceKind,
    },

    #[error("Component '{component}': {path} requests a policy that does not apply to {kind}")]
    PolicyMismatch {
        component: String,
        path: String,
        kind: ResourceKind,
    },

    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
