//! Named values substituted into manifest templates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::NodeConfig;

/// Mapping from parameter name to string value
///
/// Keys are unique; merging overwrites on collision (later wins). An ordered
/// map keeps listing and rendering deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults every component can reference
    pub fn from_config(config: &NodeConfig) -> Self {
        let mut params = Self::new();
        params.insert("NodeName", &config.node_name);
        params.insert("NodeIP", &config.node_ip);
        params.insert("DataDir", config.data_dir.to_string_lossy());
        params.insert("BaseDomain", &config.base_domain);
        params.insert("ClusterDomain", &config.cluster.domain);
        params.insert("ClusterDNS", &config.cluster.dns);
        params.insert("ClusterCIDR", &config.cluster.cluster_cidr);
        params.insert("ServiceCIDR", &config.cluster.service_cidr);
        params.insert("CoreDNSImage", &config.images.coredns);
        params.insert("KubeRbacProxyImage", &config.images.kube_rbac_proxy);
        params.insert("CLIImage", &config.images.cli);
        params.insert("RouterImage", &config.images.haproxy_router);
        params.insert("ServiceCAImage", &config.images.service_ca_operator);
        params
    }

    /// Insert or overwrite a single parameter
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Merge another set into this one; keys in `overlay` win
    pub fn merge(&mut self, overlay: &ParameterSet) {
        for (k, v) in &overlay.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Consuming variant of [`merge`](Self::merge)
    pub fn merged(mut self, overlay: &ParameterSet) -> Self {
        self.merge(overlay);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
