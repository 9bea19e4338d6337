//! Manifest templates addressed by path

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::resource::ResourceKind;

/// One manifest template for a known kind
///
/// The path is the template's identity; the source is never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestTemplate {
    path: String,
    kind: ResourceKind,
    source: String,
}

impl ManifestTemplate {
    pub fn new(path: impl Into<String>, kind: ResourceKind, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            source: source.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Kind the rendered manifest must declare
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Read-only store of template text
///
/// Implementations must be Send + Sync so one store can serve every
/// component installer concurrently.
pub trait AssetSource: Send + Sync {
    /// Raw template text stored under `path`
    fn get(&self, path: &str) -> Option<&str>;

    /// All paths known to this source
    fn paths(&self) -> Vec<&str>;

    /// Load the template at `path`, declaring the kind it must render to
    fn load(&self, path: &str, kind: ResourceKind) -> Result<ManifestTemplate> {
        self.get(path)
            .map(|source| ManifestTemplate::new(path, kind, source))
            .ok_or_else(|| CoreError::AssetNotFound {
                path: path.to_string(),
            })
    }
}

impl AssetSource for BTreeMap<String, String> {
    fn get(&self, path: &str) -> Option<&str> {
        BTreeMap::get(self, path).map(String::as_str)
    }

    fn paths(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}
