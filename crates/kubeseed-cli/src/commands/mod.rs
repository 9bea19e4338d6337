//! CLI commands

pub mod components;
pub mod render;
pub mod start;

use std::path::Path;

use kubeseed_core::NodeConfig;
use kubeseed_kube::Component;
use kubeseed_kube::components::{bundled, find};

use crate::error::{CliError, Result};

/// Load and validate the node configuration; no path means defaults
pub(crate) fn load_config(path: Option<&Path>) -> Result<NodeConfig> {
    let config = match path {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Resolve component names; an empty list selects every bundled component
pub(crate) fn select_components(names: &[String]) -> Result<Vec<Box<dyn Component>>> {
    if names.is_empty() {
        return Ok(bundled());
    }

    let mut selected: Vec<Box<dyn Component>> = Vec::with_capacity(names.len());
    for name in names {
        if selected.iter().any(|c| c.name() == name) {
            continue;
        }
        let component = find(name).ok_or_else(|| {
            let known: Vec<&str> = bundled().iter().map(|c| c.name()).collect();
            CliError::unknown_component(name, &known)
        })?;
        selected.push(component);
    }
    Ok(selected)
}
