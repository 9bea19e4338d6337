//! Service-signing CA controller
//!
//! The signing key pair and the trust bundle are issued outside kubeseed and
//! read from the data directory on every install.

use std::collections::BTreeMap;
use std::path::Path;

use kubeseed_core::{ComponentSpec, CoreError, ManifestRef, NodeConfig, ParameterSet};

use super::Component;
use crate::error::{InstallError, Result};

const DIR: &str = "assets/components/service-ca";

const SECRET_NAME: &str = "signing-key";
const CONFIG_MAP_NAME: &str = "signing-cabundle";

#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceCa;

/// Call-time data for the signing secret and CA bundle
struct Payloads {
    secret: BTreeMap<String, Vec<u8>>,
    bundle: BTreeMap<String, String>,
}

impl ServiceCa {
    fn build(&self, payloads: Option<Payloads>) -> std::result::Result<ComponentSpec, CoreError> {
        let mut secret = ManifestRef::new(format!("{DIR}/signing-secret.yaml"));
        let mut bundle = ManifestRef::new(format!("{DIR}/signing-cabundle.yaml"));
        if let Some(payloads) = payloads {
            secret = secret.with_secret_data(payloads.secret);
            bundle = bundle.with_config_map_data(payloads.bundle);
        }

        ComponentSpec::builder(self.name())
            .namespaces([format!("{DIR}/ns.yaml")])
            .cluster_roles([format!("{DIR}/clusterrole.yaml")])
            .cluster_role_bindings([format!("{DIR}/clusterrolebinding.yaml")])
            .roles([format!("{DIR}/role.yaml")])
            .role_bindings([format!("{DIR}/rolebinding.yaml")])
            .service_accounts([format!("{DIR}/sa.yaml")])
            .secrets([secret])
            .config_maps([bundle])
            .deployments([format!("{DIR}/deployment.yaml")])
            .build()
    }

    fn read_payloads(&self, config: &NodeConfig) -> Result<Payloads> {
        let tls_dir = config.service_ca_tls_dir();

        let mut secret = BTreeMap::new();
        secret.insert("tls.crt".to_string(), self.read(&tls_dir.join("tls.crt"))?);
        secret.insert("tls.key".to_string(), self.read(&tls_dir.join("tls.key"))?);

        let ca_bundle = self.read(&config.ca_bundle_path())?;
        let mut bundle = BTreeMap::new();
        bundle.insert(
            "ca-bundle.crt".to_string(),
            String::from_utf8_lossy(&ca_bundle).into_owned(),
        );

        Ok(Payloads { secret, bundle })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|source| InstallError::Payload {
            component: self.name().to_string(),
            path: path.display().to_string(),
            source,
        })
    }
}

impl Component for ServiceCa {
    fn name(&self) -> &'static str {
        "service-ca"
    }

    fn layout(&self) -> std::result::Result<ComponentSpec, CoreError> {
        self.build(None)
    }

    fn spec(&self, config: &NodeConfig) -> Result<ComponentSpec> {
        let payloads = self.read_payloads(config)?;
        self.build(Some(payloads))
            .map_err(|source| InstallError::Spec {
                component: self.name().to_string(),
                source,
            })
    }

    fn overrides(&self, _config: &NodeConfig) -> ParameterSet {
        ParameterSet::new()
            .with("CAConfigMap", CONFIG_MAP_NAME)
            .with("TLSSecret", SECRET_NAME)
    }
}
