//! Bundled platform add-ons and the drivers that install them

mod dns;
mod ingress;
mod service_ca;

pub use dns::Dns;
pub use ingress::Ingress;
pub use service_ca::ServiceCa;

use std::path::Path;

use kubeseed_core::{AssetSource, ComponentSpec, CoreError, NodeConfig, ParameterSet};
use tracing::{info, warn};

use crate::assets::BundledAssets;
use crate::client::{KubeApi, ObjectApi};
use crate::error::{InstallError, Result};
use crate::installer::{InstallOptions, InstallReport, Installer};

/// One bundled add-on
pub trait Component: Send + Sync {
    /// Stable name used on the command line and in logs
    fn name(&self) -> &'static str;

    /// Ordered groups without any call-time payloads
    fn layout(&self) -> std::result::Result<ComponentSpec, CoreError>;

    /// Ordered groups ready to install; may read payload files
    fn spec(&self, _config: &NodeConfig) -> Result<ComponentSpec> {
        self.layout().map_err(|source| InstallError::Spec {
            component: self.name().to_string(),
            source,
        })
    }

    /// Component-specific parameters layered over the config defaults
    fn overrides(&self, _config: &NodeConfig) -> ParameterSet {
        ParameterSet::new()
    }

    fn parameters(&self, config: &NodeConfig) -> ParameterSet {
        ParameterSet::from_config(config).merged(&self.overrides(config))
    }
}

/// Every bundled component, in start order
pub fn bundled() -> Vec<Box<dyn Component>> {
    vec![Box::new(ServiceCa), Box::new(Ingress), Box::new(Dns)]
}

/// Look up a bundled component by name
pub fn find(name: &str) -> Option<Box<dyn Component>> {
    bundled().into_iter().find(|c| c.name() == name)
}

/// Install one component
pub async fn install_component(
    component: &dyn Component,
    config: &NodeConfig,
    api: &dyn ObjectApi,
    assets: &dyn AssetSource,
    options: &InstallOptions,
) -> Result<InstallReport> {
    let spec = component.spec(config)?;
    let params = component.parameters(config);

    Installer::new(api, assets)
        .with_options(options.clone())
        .install(&spec, &params)
        .await
}

/// Install one component against the cluster at `kubeconfig`
pub async fn install(
    component: &dyn Component,
    config: &NodeConfig,
    kubeconfig: &Path,
    options: &InstallOptions,
) -> Result<InstallReport> {
    let api = KubeApi::from_kubeconfig(kubeconfig).await?;
    install_component(component, config, &api, &BundledAssets, options).await
}

/// Install `components` concurrently, one future per component
///
/// Components share no state beyond the API, so one failing does not stop
/// the others. Results come back in input order.
pub async fn start_components(
    components: &[Box<dyn Component>],
    config: &NodeConfig,
    api: &dyn ObjectApi,
    assets: &dyn AssetSource,
    options: &InstallOptions,
) -> Vec<(&'static str, Result<InstallReport>)> {
    let installs = components.iter().map(|component| async move {
        let result = install_component(component.as_ref(), config, api, assets, options).await;
        match &result {
            Ok(report) => info!(
                component = component.name(),
                applied = report.applied.len(),
                "Component started"
            ),
            Err(err) => warn!(component = component.name(), error = %err, "Component failed to start"),
        }
        (component.name(), result)
    });

    futures::future::join_all(installs).await
}
