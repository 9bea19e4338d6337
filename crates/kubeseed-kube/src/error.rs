//! Error types for kubeseed-kube

use kubeseed_core::{CoreError, ResourceDescriptor, ResourceKind};
use kubeseed_engine::RenderError;
use thiserror::Error;

use crate::installer::InstallState;

/// Errors from applying one manifest
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApplyError {
    /// Template not present in the asset source
    #[error("manifest asset not found: {path}")]
    MissingAsset { path: String },

    #[error("failed to render {path}: {source}")]
    Render {
        path: String,
        #[source]
        source: RenderError,
    },

    /// Manifest bytes do not decode as the declared kind
    #[error("failed to decode {path} as {kind}: {source}")]
    Decode {
        path: String,
        kind: ResourceKind,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid manifest {path}: {message}")]
    InvalidManifest { path: String, message: String },

    /// Connectivity, TLS or authentication failure reaching the API server
    #[error("cannot reach API server for {resource}: {source}")]
    Transport {
        resource: ResourceDescriptor,
        #[source]
        source: kube::Error,
    },

    /// Resource changed between get and update
    #[error("conflict applying {resource}: {source}")]
    Conflict {
        resource: ResourceDescriptor,
        #[source]
        source: kube::Error,
    },

    /// RBAC denial
    #[error("permission denied applying {resource}: {source}")]
    Permission {
        resource: ResourceDescriptor,
        #[source]
        source: kube::Error,
    },

    /// Any other API status
    #[error("API server rejected {resource} ({code}): {source}")]
    Rejected {
        resource: ResourceDescriptor,
        code: u16,
        #[source]
        source: kube::Error,
    },

    #[error("cancelled while applying {resource}")]
    Cancelled { resource: ResourceDescriptor },

    #[error("deadline exceeded while applying {resource}")]
    DeadlineExceeded { resource: ResourceDescriptor },
}

impl ApplyError {
    /// Classify a kube error raised while applying `resource`
    pub fn from_kube(resource: ResourceDescriptor, err: kube::Error) -> Self {
        let code = match &err {
            kube::Error::Api(resp) => Some(resp.code),
            _ => None,
        };

        match code {
            Some(409) => ApplyError::Conflict {
                resource,
                source: err,
            },
            Some(403) => ApplyError::Permission {
                resource,
                source: err,
            },
            Some(401) | None => ApplyError::Transport {
                resource,
                source: err,
            },
            Some(code) => ApplyError::Rejected {
                resource,
                code,
                source: err,
            },
        }
    }

    /// The resource this error is attributed to, if it reached the API
    pub fn resource(&self) -> Option<&ResourceDescriptor> {
        match self {
            ApplyError::Transport { resource, .. }
            | ApplyError::Conflict { resource, .. }
            | ApplyError::Permission { resource, .. }
            | ApplyError::Rejected { resource, .. }
            | ApplyError::Cancelled { resource }
            | ApplyError::DeadlineExceeded { resource } => Some(resource),
            _ => None,
        }
    }

    /// Cancelled or past its deadline
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ApplyError::Cancelled { .. } | ApplyError::DeadlineExceeded { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApplyError::Conflict { .. })
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, ApplyError::Permission { .. })
    }

    /// Create rejected because the requested Service cluster IP is held by another Service
    pub fn is_cluster_ip_allocated(&self) -> bool {
        match self {
            ApplyError::Rejected {
                code: 422,
                source: kube::Error::Api(resp),
                ..
            } => resp.message.contains("clusterIP") && resp.message.contains("already allocated"),
            _ => false,
        }
    }
}

/// Errors building an API client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to load kubeconfig {path}: {source}")]
    Kubeconfig {
        path: String,
        #[source]
        source: kube::config::KubeconfigError,
    },

    #[error("failed to create client: {0}")]
    Client(#[from] kube::Error),
}

/// Errors from installing one component
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// A group failed; earlier groups remain applied
    #[error("component '{component}' failed at step '{step}' [{}]: {source}", .resources.join(", "))]
    Step {
        component: String,
        step: &'static str,
        /// Index of the failed group in the component spec
        group: usize,
        resources: Vec<String>,
        #[source]
        source: ApplyError,
    },

    #[error("component '{component}' cancelled at step '{step}' [{}]", .resources.join(", "))]
    Cancelled {
        component: String,
        step: &'static str,
        group: usize,
        resources: Vec<String>,
        #[source]
        source: ApplyError,
    },

    /// Payload file could not be read
    #[error("component '{component}': failed to read {path}: {source}")]
    Payload {
        component: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("component '{component}': {source}")]
    Spec {
        component: String,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl InstallError {
    /// True when the install stopped because of cancellation or its deadline
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallError::Cancelled { .. })
    }

    /// Step name for group failures
    pub fn step(&self) -> Option<&'static str> {
        match self {
            InstallError::Step { step, .. } | InstallError::Cancelled { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Where a group failure left the install
    pub fn state(&self) -> Option<InstallState> {
        match self {
            InstallError::Step { group, .. } | InstallError::Cancelled { group, .. } => {
                Some(InstallState::Failed(*group))
            }
            _ => None,
        }
    }

    /// Resources attempted in the failed step
    pub fn resources(&self) -> &[String] {
        match self {
            InstallError::Step { resources, .. } | InstallError::Cancelled { resources, .. } => {
                resources
            }
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "synthetic".to_string(),
            reason: "Test".to_string(),
            code,
        })
    }

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::namespaced(ResourceKind::Service, "openshift-dns", "dns-default")
    }

    #[test]
    fn test_classify_status_codes() {
        assert!(ApplyError::from_kube(descriptor(), api_error(409)).is_conflict());
        assert!(ApplyError::from_kube(descriptor(), api_error(403)).is_permission());
        assert!(matches!(
            ApplyError::from_kube(descriptor(), api_error(401)),
            ApplyError::Transport { .. }
        ));
        assert!(matches!(
            ApplyError::from_kube(descriptor(), api_error(422)),
            ApplyError::Rejected { code: 422, .. }
        ));
    }

    #[test]
    fn test_classify_non_api_as_transport() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = kube::Error::SerdeError(parse);
        assert!(matches!(
            ApplyError::from_kube(descriptor(), err),
            ApplyError::Transport { .. }
        ));
    }

    #[test]
    fn test_error_names_resource() {
        let err = ApplyError::from_kube(descriptor(), api_error(409));
        assert!(err.to_string().contains("openshift-dns/Service/dns-default"));
        assert_eq!(err.resource(), Some(&descriptor()));
    }

    #[test]
    fn test_step_error_lists_resources() {
        let err = InstallError::Step {
            component: "dns".to_string(),
            step: "services",
            group: 8,
            resources: vec!["a.yaml".to_string(), "b.yaml".to_string()],
            source: ApplyError::Cancelled {
                resource: descriptor(),
            },
        };
        let message = err.to_string();
        assert!(message.starts_with("component 'dns' failed at step 'services' [a.yaml, b.yaml]"));
        assert_eq!(err.step(), Some("services"));
        assert_eq!(err.resources().len(), 2);
        assert_eq!(err.state(), Some(InstallState::Failed(8)));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cluster_ip_allocation_is_recognised() {
        let allocated = ApplyError::from_kube(
            descriptor(),
            kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "Service \"dns-default\" is invalid: spec.clusterIPs: Invalid value: []string{\"10.43.0.10\"}: failed to allocate IP 10.43.0.10: provided IP is already allocated".to_string(),
                reason: "Invalid".to_string(),
                code: 422,
            }),
        );
        assert!(allocated.is_cluster_ip_allocated());

        let invalid = ApplyError::from_kube(descriptor(), api_error(422));
        assert!(!invalid.is_cluster_ip_allocated());
        let forbidden = ApplyError::from_kube(descriptor(), api_error(403));
        assert!(!forbidden.is_cluster_ip_allocated());
    }
}
