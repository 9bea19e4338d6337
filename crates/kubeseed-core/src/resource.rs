//! The closed set of resource kinds kubeseed knows how to apply

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Resource kinds handled by the appliers
///
/// Declaration order is the canonical apply order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Namespace,
    ClusterRole,
    ClusterRoleBinding,
    Role,
    RoleBinding,
    ServiceAccount,
    Secret,
    ConfigMap,
    Service,
    Deployment,
    DaemonSet,
}

/// Dependency stage of a kind
///
/// A group may only be applied after every group of a lower stage.
/// Kinds sharing a stage (Secret/ConfigMap, Deployment/DaemonSet) have no
/// ordering constraint between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApplyStage {
    /// Namespace - created before anything namespaced
    Namespace = 0,
    /// ClusterRole
    ClusterRole = 10,
    /// ClusterRoleBinding - references cluster roles
    ClusterRoleBinding = 11,
    /// Role
    Role = 20,
    /// RoleBinding - references roles
    RoleBinding = 21,
    /// ServiceAccount
    ServiceAccount = 30,
    /// Secret, ConfigMap
    Config = 40,
    /// Service
    Network = 50,
    /// Deployment, DaemonSet
    Workload = 60,
}

impl ResourceKind {
    /// Every kind, in canonical apply order
    pub const ALL: [ResourceKind; 11] = [
        ResourceKind::Namespace,
        ResourceKind::ClusterRole,
        ResourceKind::ClusterRoleBinding,
        ResourceKind::Role,
        ResourceKind::RoleBinding,
        ResourceKind::ServiceAccount,
        ResourceKind::Secret,
        ResourceKind::ConfigMap,
        ResourceKind::Service,
        ResourceKind::Deployment,
        ResourceKind::DaemonSet,
    ];

    /// The `kind` field as it appears in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Namespace => "Namespace",
            Self::ClusterRole => "ClusterRole",
            Self::ClusterRoleBinding => "ClusterRoleBinding",
            Self::Role => "Role",
            Self::RoleBinding => "RoleBinding",
            Self::ServiceAccount => "ServiceAccount",
            Self::Secret => "Secret",
            Self::ConfigMap => "ConfigMap",
            Self::Service => "Service",
            Self::Deployment => "Deployment",
            Self::DaemonSet => "DaemonSet",
        }
    }

    /// The `apiVersion` the bundled manifests use for this kind
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::Namespace
            | Self::ServiceAccount
            | Self::Secret
            | Self::ConfigMap
            | Self::Service => "v1",
            Self::ClusterRole | Self::ClusterRoleBinding | Self::Role | Self::RoleBinding => {
                "rbac.authorization.k8s.io/v1"
            }
            Self::Deployment | Self::DaemonSet => "apps/v1",
        }
    }

    /// Whether objects of this kind live inside a namespace
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            Self::Namespace | Self::ClusterRole | Self::ClusterRoleBinding
        )
    }

    pub fn stage(&self) -> ApplyStage {
        match self {
            Self::Namespace => ApplyStage::Namespace,
            Self::ClusterRole => ApplyStage::ClusterRole,
            Self::ClusterRoleBinding => ApplyStage::ClusterRoleBinding,
            Self::Role => ApplyStage::Role,
            Self::RoleBinding => ApplyStage::RoleBinding,
            Self::ServiceAccount => ApplyStage::ServiceAccount,
            Self::Secret | Self::ConfigMap => ApplyStage::Config,
            Self::Service => ApplyStage::Network,
            Self::Deployment | Self::DaemonSet => ApplyStage::Workload,
        }
    }

    /// Step name used in logs and errors for a group of this kind
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::Namespace => "namespaces",
            Self::ClusterRole => "cluster-roles",
            Self::ClusterRoleBinding => "cluster-role-bindings",
            Self::Role => "roles",
            Self::RoleBinding => "role-bindings",
            Self::ServiceAccount => "service-accounts",
            Self::Secret => "secrets",
            Self::ConfigMap => "config-maps",
            Self::Service => "services",
            Self::Deployment => "deployments",
            Self::DaemonSet => "daemon-sets",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}

/// Identity of one live object: (kind, name, namespace)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub name: String,
    /// None for cluster-scoped kinds
    pub namespace: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: if kind.is_namespaced() {
                namespace.map(str::to_string)
            } else {
                None
            },
        }
    }

    pub fn cluster(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::new(kind, name, None)
    }

    pub fn namespaced(kind: ResourceKind, namespace: &str, name: impl Into<String>) -> Self {
        Self::new(kind, name, Some(namespace))
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", ns, self.kind, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}
