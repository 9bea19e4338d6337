//! Runtime configuration of the node
//!
//! The configuration is loaded once by the process driver and passed
//! explicitly to everything that needs it. Nothing in kubeseed reads it
//! from process-wide state.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Node-level configuration consumed to build parameter sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeConfig {
    /// Root of the node's persistent state (certificates, generated resources)
    pub data_dir: PathBuf,

    /// Hostname of this node
    pub node_name: String,

    /// Primary IP address of this node
    #[serde(rename = "nodeIP")]
    pub node_ip: String,

    /// Base domain used for routes
    pub base_domain: String,

    /// Cluster networking
    pub cluster: ClusterConfig,

    /// Container images of the bundled components
    pub images: Images,
}

/// Cluster networking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Cluster DNS service IP
    pub dns: String,

    /// Cluster domain
    pub domain: String,

    /// Pod network CIDR
    pub cluster_cidr: String,

    /// Service network CIDR
    pub service_cidr: String,
}

/// Images of the bundled components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Images {
    pub coredns: String,
    pub kube_rbac_proxy: String,
    pub cli: String,
    pub haproxy_router: String,
    pub service_ca_operator: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/kubeseed"),
            node_name: "localhost".to_string(),
            node_ip: "127.0.0.1".to_string(),
            base_domain: "example.com".to_string(),
            cluster: ClusterConfig::default(),
            images: Images::default(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            dns: "10.43.0.10".to_string(),
            domain: "cluster.local".to_string(),
            cluster_cidr: "10.42.0.0/16".to_string(),
            service_cidr: "10.43.0.0/16".to_string(),
        }
    }
}

impl Default for Images {
    fn default() -> Self {
        Self {
            coredns: "quay.io/openshift/okd-content:coredns".to_string(),
            kube_rbac_proxy: "quay.io/openshift/okd-content:kube-rbac-proxy".to_string(),
            cli: "quay.io/openshift/okd-content:cli".to_string(),
            haproxy_router: "quay.io/openshift/okd-content:haproxy-router".to_string(),
            service_ca_operator: "quay.io/openshift/okd-content:service-ca-operator".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string; missing fields take defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Check the fields the bundled components cannot do without
    pub fn validate(&self) -> Result<()> {
        if self.node_name.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "nodeName must not be empty".to_string(),
            });
        }
        if self.cluster.dns.parse::<IpAddr>().is_err() {
            return Err(CoreError::InvalidConfig {
                message: format!(
                    "cluster.dns must be an IP address, got '{}'",
                    self.cluster.dns
                ),
            });
        }
        Ok(())
    }

    /// Trust bundle shared by every component that verifies serving certificates
    pub fn ca_bundle_path(&self) -> PathBuf {
        self.data_dir
            .join("certs")
            .join("ca-bundle")
            .join("ca-bundle.crt")
    }

    /// Directory holding the service CA signing key pair (`tls.crt`, `tls.key`)
    pub fn service_ca_tls_dir(&self) -> PathBuf {
        self.data_dir
            .join("resources")
            .join("service-ca")
            .join("secrets")
            .join("service-ca")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = NodeConfig::from_yaml("").unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = NodeConfig::from_yaml(
            r#"
nodeName: edge-01
cluster:
  dns: 10.96.0.10
"#,
        )
        .unwrap();

        assert_eq!(config.node_name, "edge-01");
        assert_eq!(config.cluster.dns, "10.96.0.10");
        assert_eq!(config.cluster.domain, "cluster.local");
        assert_eq!(config.images, Images::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dataDir: /srv/node\nnodeIP: 192.168.1.20").unwrap();

        let config = NodeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/node"));
        assert_eq!(config.node_ip, "192.168.1.20");
    }

    #[test]
    fn test_from_missing_file() {
        let err = NodeConfig::from_file("/nonexistent/kubeseed.yaml").unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_dns() {
        let mut config = NodeConfig::default();
        config.cluster.dns = "not-an-ip".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cluster.dns"));
    }

    #[test]
    fn test_validate_rejects_empty_node_name() {
        let config = NodeConfig {
            node_name: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(NodeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_payload_paths() {
        let config = NodeConfig {
            data_dir: PathBuf::from("/data"),
            ..Default::default()
        };
        assert_eq!(
            config.ca_bundle_path(),
            PathBuf::from("/data/certs/ca-bundle/ca-bundle.crt")
        );
        assert_eq!(
            config.service_ca_tls_dir(),
            PathBuf::from("/data/resources/service-ca/secrets/service-ca")
        );
    }
}
