//! kube-rs backed capability set

use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::{Api, DynamicObject, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use kubeseed_core::{ResourceDescriptor, ResourceKind};
use tracing::debug;

use super::{FIELD_MANAGER, ObjectApi};
use crate::error::ClientError;
use crate::object::ManifestObject;

/// Capability set backed by a kube client
#[derive(Clone)]
pub struct KubeApi {
    client: Client,
}

impl KubeApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the kubeconfig at `path`
    pub async fn from_kubeconfig(path: &Path) -> Result<Self, ClientError> {
        let kubeconfig = Kubeconfig::read_from(path).map_err(|source| ClientError::Kubeconfig {
            path: path.display().to_string(),
            source,
        })?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|source| ClientError::Kubeconfig {
                path: path.display().to_string(),
                source,
            })?;

        debug!(cluster_url = %config.cluster_url, "Connecting to API server");
        let client = Client::try_from(config)?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api(&self, id: &ResourceDescriptor) -> Api<DynamicObject> {
        let resource = api_resource(id.kind);
        match &id.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

fn api_resource(kind: ResourceKind) -> ApiResource {
    match kind {
        ResourceKind::Namespace => ApiResource::erase::<Namespace>(&()),
        ResourceKind::ClusterRole => ApiResource::erase::<ClusterRole>(&()),
        ResourceKind::ClusterRoleBinding => ApiResource::erase::<ClusterRoleBinding>(&()),
        ResourceKind::Role => ApiResource::erase::<Role>(&()),
        ResourceKind::RoleBinding => ApiResource::erase::<RoleBinding>(&()),
        ResourceKind::ServiceAccount => ApiResource::erase::<ServiceAccount>(&()),
        ResourceKind::Secret => ApiResource::erase::<Secret>(&()),
        ResourceKind::ConfigMap => ApiResource::erase::<ConfigMap>(&()),
        ResourceKind::Service => ApiResource::erase::<Service>(&()),
        ResourceKind::Deployment => ApiResource::erase::<Deployment>(&()),
        ResourceKind::DaemonSet => ApiResource::erase::<DaemonSet>(&()),
    }
}

fn to_dynamic(object: &ManifestObject) -> Result<DynamicObject, kube::Error> {
    let value = object.to_value().map_err(kube::Error::SerdeError)?;
    serde_json::from_value(value).map_err(kube::Error::SerdeError)
}

fn from_dynamic(kind: ResourceKind, object: DynamicObject) -> Result<ManifestObject, kube::Error> {
    let value = serde_json::to_value(object).map_err(kube::Error::SerdeError)?;
    ManifestObject::from_value(kind, value).map_err(kube::Error::SerdeError)
}

#[async_trait]
impl ObjectApi for KubeApi {
    async fn get(&self, id: &ResourceDescriptor) -> Result<Option<ManifestObject>, kube::Error> {
        match self.api(id).get_opt(&id.name).await? {
            Some(object) => from_dynamic(id.kind, object).map(Some),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        id: &ResourceDescriptor,
        object: &ManifestObject,
    ) -> Result<ManifestObject, kube::Error> {
        let created = self
            .api(id)
            .create(&Self::post_params(), &to_dynamic(object)?)
            .await?;
        from_dynamic(id.kind, created)
    }

    async fn replace(
        &self,
        id: &ResourceDescriptor,
        object: &ManifestObject,
    ) -> Result<ManifestObject, kube::Error> {
        let replaced = self
            .api(id)
            .replace(&id.name, &Self::post_params(), &to_dynamic(object)?)
            .await?;
        from_dynamic(id.kind, replaced)
    }
}
