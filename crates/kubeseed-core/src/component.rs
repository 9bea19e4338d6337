//! Component specs: the ordered kind groups one add-on needs
//!
//! A [`ComponentSpec`] replaces ad-hoc call sequences with a value whose
//! ordering can be checked. Groups must follow the dependency stages of
//! [`ResourceKind`]: namespaces first, then RBAC, service accounts, config,
//! services and finally workloads.

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::resource::ResourceKind;

/// Data produced at call time and merged into a manifest before apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Raw bytes merged into a Secret's `data`
    SecretData(BTreeMap<String, Vec<u8>>),
    /// Strings merged into a ConfigMap's `data`
    ConfigMapData(BTreeMap<String, String>),
}

impl Payload {
    fn fits(&self, kind: ResourceKind) -> bool {
        matches!(
            (self, kind),
            (Payload::SecretData(_), ResourceKind::Secret)
                | (Payload::ConfigMapData(_), ResourceKind::ConfigMap)
        )
    }
}

/// How the applier treats an object that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyPolicy {
    /// Create or update
    #[default]
    Reconcile,
    /// Service whose cluster IP is owned by another in-cluster component:
    /// if the live object already holds a different `clusterIP`, keep it
    /// untouched and report success.
    RetainClusterIp,
}

/// One manifest template reference inside a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRef {
    pub path: String,
    pub payload: Option<Payload>,
    pub policy: ApplyPolicy,
}

impl ManifestRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            payload: None,
            policy: ApplyPolicy::Reconcile,
        }
    }

    pub fn with_secret_data(mut self, data: BTreeMap<String, Vec<u8>>) -> Self {
        self.payload = Some(Payload::SecretData(data));
        self
    }

    pub fn with_config_map_data(mut self, data: BTreeMap<String, String>) -> Self {
        self.payload = Some(Payload::ConfigMapData(data));
        self
    }

    pub fn retain_cluster_ip(mut self) -> Self {
        self.policy = ApplyPolicy::RetainClusterIp;
        self
    }
}

impl From<&str> for ManifestRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ManifestRef {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// All manifests of one kind, applied together as one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindGroup {
    pub kind: ResourceKind,
    pub manifests: Vec<ManifestRef>,
}

impl KindGroup {
    pub fn new<I, M>(kind: ResourceKind, manifests: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ManifestRef>,
    {
        Self {
            kind,
            manifests: manifests.into_iter().map(Into::into).collect(),
        }
    }

    pub fn step_name(&self) -> &'static str {
        self.kind.step_name()
    }

    /// Template paths of this group, used for error attribution
    pub fn paths(&self) -> Vec<String> {
        self.manifests.iter().map(|m| m.path.clone()).collect()
    }
}

/// Everything one bundled add-on needs, in apply order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSpec {
    name: String,
    groups: Vec<KindGroup>,
}

impl ComponentSpec {
    /// Build a spec from explicit groups, rejecting any group that would be
    /// applied before a group it depends on
    pub fn new(name: impl Into<String>, groups: Vec<KindGroup>) -> Result<Self> {
        let name = name.into();

        let mut previous: Option<ResourceKind> = None;
        for group in &groups {
            if let Some(prev) = previous
                && group.kind.stage() < prev.stage()
            {
                return Err(CoreError::GroupOrder {
                    component: name,
                    kind: group.kind,
                    previous: prev,
                });
            }
            previous = Some(group.kind);

            for manifest in &group.manifests {
                if let Some(payload) = &manifest.payload
                    && !payload.fits(group.kind)
                {
                    return Err(CoreError::PayloadMismatch {
                        component: name,
                        path: manifest.path.clone(),
                        kind: group.kind,
                    });
                }
                if manifest.policy == ApplyPolicy::RetainClusterIp
                    && group.kind != ResourceKind::Service
                {
                    return Err(CoreError::PolicyMismatch {
                        component: name,
                        path: manifest.path.clone(),
                        kind: group.kind,
                    });
                }
            }
        }

        Ok(Self { name, groups })
    }

    pub fn builder(name: impl Into<String>) -> ComponentSpecBuilder {
        ComponentSpecBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[KindGroup] {
        &self.groups
    }

    /// Total number of manifests across all groups
    pub fn resource_count(&self) -> usize {
        self.groups.iter().map(|g| g.manifests.len()).sum()
    }
}

/// Builder that always emits groups in canonical order, regardless of the
/// order in which they were added
#[derive(Debug, Clone)]
pub struct ComponentSpecBuilder {
    name: String,
    groups: BTreeMap<ResourceKind, Vec<ManifestRef>>,
}

macro_rules! group_setters {
    ($($method:ident => $kind:ident),* $(,)?) => {
        $(
            pub fn $method<I, M>(self, manifests: I) -> Self
            where
                I: IntoIterator<Item = M>,
                M: Into<ManifestRef>,
            {
                self.group(ResourceKind::$kind, manifests)
            }
        )*
    };
}

impl ComponentSpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: BTreeMap::new(),
        }
    }

    /// Append manifests to the group of `kind`
    pub fn group<I, M>(mut self, kind: ResourceKind, manifests: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ManifestRef>,
    {
        self.groups
            .entry(kind)
            .or_default()
            .extend(manifests.into_iter().map(Into::into));
        self
    }

    group_setters! {
        namespaces => Namespace,
        cluster_roles => ClusterRole,
        cluster_role_bindings => ClusterRoleBinding,
        roles => Role,
        role_bindings => RoleBinding,
        service_accounts => ServiceAccount,
        secrets => Secret,
        config_maps => ConfigMap,
        services => Service,
        deployments => Deployment,
        daemon_sets => DaemonSet,
    }

    pub fn build(self) -> Result<ComponentSpec> {
        let groups = self
            .groups
            .into_iter()
            .filter(|(_, manifests)| !manifests.is_empty())
            .map(|(kind, manifests)| KindGroup { kind, manifests })
            .collect();
        ComponentSpec::new(self.name, groups)
    }
}
