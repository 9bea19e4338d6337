//! API capability set used by the applier
//!
//! The applier needs only get, create and replace. [`KubeApi`] serves them
//! from a live API server; [`MockApi`] from memory for tests.

mod cluster;
mod mock;

pub use cluster::KubeApi;
pub use mock::{ApiCall, ApiOperation, MockApi};

use async_trait::async_trait;
use kubeseed_core::ResourceDescriptor;

use crate::object::ManifestObject;

/// Field manager recorded on every write
pub const FIELD_MANAGER: &str = "kubeseed";

/// Get/create/replace for the closed set of applied kinds
///
/// Implementations are shared by concurrently running installers; the API
/// server arbitrates writes through resource versions.
#[async_trait]
pub trait ObjectApi: Send + Sync {
    /// Fetch the live object, `None` if it does not exist
    async fn get(&self, id: &ResourceDescriptor) -> Result<Option<ManifestObject>, kube::Error>;

    /// Create `object`; fails with 409 if it already exists
    async fn create(
        &self,
        id: &ResourceDescriptor,
        object: &ManifestObject,
    ) -> Result<ManifestObject, kube::Error>;

    /// Replace `object`; fails with 409 if its resource version is stale
    async fn replace(
        &self,
        id: &ResourceDescriptor,
        object: &ManifestObject,
    ) -> Result<ManifestObject, kube::Error>;
}
