//! Typed manifest objects over the closed set of applied kinds

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PodSpec, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use kubeseed_core::{ResourceDescriptor, ResourceKind};

/// One decoded manifest, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestObject {
    Namespace(Namespace),
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    Role(Role),
    RoleBinding(RoleBinding),
    ServiceAccount(ServiceAccount),
    Secret(Secret),
    ConfigMap(ConfigMap),
    Service(Service),
    Deployment(Deployment),
    DaemonSet(DaemonSet),
}

/// Run `$body` with `$inner` bound to the wrapped k8s-openapi object
macro_rules! with_object {
    ($object:expr, $inner:ident => $body:expr) => {
        match $object {
            ManifestObject::Namespace($inner) => $body,
            ManifestObject::ClusterRole($inner) => $body,
            ManifestObject::ClusterRoleBinding($inner) => $body,
            ManifestObject::Role($inner) => $body,
            ManifestObject::RoleBinding($inner) => $body,
            ManifestObject::ServiceAccount($inner) => $body,
            ManifestObject::Secret($inner) => $body,
            ManifestObject::ConfigMap($inner) => $body,
            ManifestObject::Service($inner) => $body,
            ManifestObject::Deployment($inner) => $body,
            ManifestObject::DaemonSet($inner) => $body,
        }
    };
}

/// Deserialize into the variant matching `$kind`
macro_rules! decode_as {
    ($kind:expr, $decode:expr) => {
        match $kind {
            ResourceKind::Namespace => $decode.map(ManifestObject::Namespace),
            ResourceKind::ClusterRole => $decode.map(ManifestObject::ClusterRole),
            ResourceKind::ClusterRoleBinding => $decode.map(ManifestObject::ClusterRoleBinding),
            ResourceKind::Role => $decode.map(ManifestObject::Role),
            ResourceKind::RoleBinding => $decode.map(ManifestObject::RoleBinding),
            ResourceKind::ServiceAccount => $decode.map(ManifestObject::ServiceAccount),
            ResourceKind::Secret => $decode.map(ManifestObject::Secret),
            ResourceKind::ConfigMap => $decode.map(ManifestObject::ConfigMap),
            ResourceKind::Service => $decode.map(ManifestObject::Service),
            ResourceKind::Deployment => $decode.map(ManifestObject::Deployment),
            ResourceKind::DaemonSet => $decode.map(ManifestObject::DaemonSet),
        }
    };
}

impl ManifestObject {
    /// Decode manifest YAML as an object of `kind`
    pub fn decode(kind: ResourceKind, bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        decode_as!(kind, serde_yaml::from_slice(bytes))
    }

    /// Convert a JSON value (as returned by the API server) into an object of `kind`
    pub fn from_value(kind: ResourceKind, value: serde_json::Value) -> serde_json::Result<Self> {
        decode_as!(kind, serde_json::from_value(value))
    }

    /// JSON representation, including `apiVersion` and `kind`
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        with_object!(self, object => serde_json::to_value(object))
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Namespace(_) => ResourceKind::Namespace,
            Self::ClusterRole(_) => ResourceKind::ClusterRole,
            Self::ClusterRoleBinding(_) => ResourceKind::ClusterRoleBinding,
            Self::Role(_) => ResourceKind::Role,
            Self::RoleBinding(_) => ResourceKind::RoleBinding,
            Self::ServiceAccount(_) => ResourceKind::ServiceAccount,
            Self::Secret(_) => ResourceKind::Secret,
            Self::ConfigMap(_) => ResourceKind::ConfigMap,
            Self::Service(_) => ResourceKind::Service,
            Self::Deployment(_) => ResourceKind::Deployment,
            Self::DaemonSet(_) => ResourceKind::DaemonSet,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        with_object!(self, object => Resource::meta(object))
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        with_object!(self, object => Resource::meta_mut(object))
    }

    pub fn name(&self) -> Option<&str> {
        self.meta().name.as_deref()
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.meta().resource_version.as_deref()
    }

    /// Identity of this object, if it carries a name
    pub fn descriptor(&self) -> Option<ResourceDescriptor> {
        let name = self.name()?;
        Some(ResourceDescriptor::new(
            self.kind(),
            name,
            self.meta().namespace.as_deref(),
        ))
    }

    /// Pod template spec of workload kinds
    pub fn pod_spec(&self) -> Option<&PodSpec> {
        match self {
            Self::Deployment(d) => d.spec.as_ref()?.template.spec.as_ref(),
            Self::DaemonSet(d) => d.spec.as_ref()?.template.spec.as_ref(),
            _ => None,
        }
    }

    /// `spec.clusterIP` of a Service
    pub fn cluster_ip(&self) -> Option<&str> {
        match self {
            Self::Service(svc) => svc.spec.as_ref()?.cluster_ip.as_deref(),
            _ => None,
        }
    }

    /// Carry server-owned state from `live` into this desired object so a
    /// full replace does not drop it
    ///
    /// Maps are merged with desired keys winning; optional fields are only
    /// copied when the manifest leaves them unset.
    pub fn adopt_server_state(&mut self, live: &ManifestObject) {
        let live_meta = live.meta();
        let meta = self.meta_mut();
        meta.resource_version = live_meta.resource_version.clone();
        if meta.uid.is_none() {
            meta.uid = live_meta.uid.clone();
        }
        merge_maps(&mut meta.labels, &live_meta.labels);
        merge_maps(&mut meta.annotations, &live_meta.annotations);

        match (self, live) {
            (Self::Namespace(desired), Self::Namespace(live)) => {
                if desired.spec.is_none() {
                    desired.spec = live.spec.clone();
                }
            }
            (Self::ServiceAccount(desired), Self::ServiceAccount(live)) => {
                if desired.secrets.is_none() {
                    desired.secrets = live.secrets.clone();
                }
                if desired.image_pull_secrets.is_none() {
                    desired.image_pull_secrets = live.image_pull_secrets.clone();
                }
            }
            (Self::Secret(desired), Self::Secret(live)) => {
                merge_maps(&mut desired.data, &live.data);
                if desired.type_.is_none() {
                    desired.type_ = live.type_.clone();
                }
            }
            (Self::ConfigMap(desired), Self::ConfigMap(live)) => {
                merge_maps(&mut desired.data, &live.data);
                merge_maps(&mut desired.binary_data, &live.binary_data);
            }
            (Self::Service(desired), Self::Service(live)) => {
                if let (Some(spec), Some(live_spec)) = (desired.spec.as_mut(), live.spec.as_ref()) {
                    if spec.cluster_ip.is_none() {
                        spec.cluster_ip = live_spec.cluster_ip.clone();
                    }
                    if spec.cluster_ips.is_none() {
                        spec.cluster_ips = live_spec.cluster_ips.clone();
                    }
                }
            }
            _ => {}
        }
    }
}

/// Fill `target` with entries of `live` it does not define itself
fn merge_maps<V: Clone>(
    target: &mut Option<BTreeMap<String, V>>,
    live: &Option<BTreeMap<String, V>>,
) {
    let Some(live) = live else {
        return;
    };
    let target = target.get_or_insert_with(BTreeMap::new);
    for (key, value) in live {
        target.entry(key.clone()).or_insert_with(|| value.clone());
    }
}
