//! Render command - print a component's manifests without contacting a cluster

use std::io::Write;
use std::path::Path;

use kubeseed_core::AssetSource;
use kubeseed_engine::Renderer;
use kubeseed_kube::BundledAssets;
use kubeseed_kube::components::find;

use super::load_config;
use crate::error::{CliError, Result};

/// Render `component` in apply order to `out`
///
/// Payload-backed manifests (the service CA secret and bundle) are rendered
/// from their templates alone; call-time data is never read here.
pub fn run(config_path: Option<&Path>, component: &str, out: &mut impl Write) -> Result<()> {
    let config = load_config(config_path)?;
    let component = find(component).ok_or_else(|| {
        let known: Vec<&str> = kubeseed_kube::bundled().iter().map(|c| c.name()).collect();
        CliError::unknown_component(component, &known)
    })?;

    let spec = component.layout()?;
    let params = component.parameters(&config);
    let renderer = Renderer::new();

    for group in spec.groups() {
        for manifest in &group.manifests {
            let template = BundledAssets.load(&manifest.path, group.kind)?;
            let rendered = renderer.render(&template, &params)?;

            writeln!(out, "---")?;
            writeln!(out, "# Source: {}", rendered.path())?;
            let body = rendered.as_str();
            write!(out, "{}", body)?;
            if !body.ends_with('\n') {
                writeln!(out)?;
            }
        }
    }

    Ok(())
}
