//! Idempotent create-or-update of one manifest
//!
//! Every kind goes through the same algorithm: decode, get, then create or
//! update carrying the live resource version and server-owned fields. There
//! is no retry; a failed apply surfaces to the installer, and convergence
//! comes from running the whole install again.

use std::collections::BTreeMap;
use std::future::Future;

use k8s_openapi::ByteString;
use kubeseed_core::{ApplyPolicy, ResourceDescriptor};
use kubeseed_engine::RenderedManifest;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::ObjectApi;
use crate::error::ApplyError;
use crate::object::ManifestObject;

/// What an apply did to the live object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    /// Service left untouched because its cluster IP is owned elsewhere
    /// or already allocated to another Service
    Retained,
}

/// Result of one successful apply
#[derive(Debug, Clone)]
pub struct Applied {
    pub descriptor: ResourceDescriptor,
    pub outcome: ApplyOutcome,
    /// The live object as returned by the API; the submitted object when a
    /// create was retained
    pub object: ManifestObject,
}

/// Applies rendered manifests through an [`ObjectApi`]
pub struct Applier<'a> {
    api: &'a dyn ObjectApi,
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl<'a> Applier<'a> {
    pub fn new(api: &'a dyn ObjectApi) -> Self {
        Self {
            api,
            cancel: None,
            deadline: None,
        }
    }

    /// Abort in-flight and future calls once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Abort calls still running at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Create or update the object described by `manifest`
    ///
    /// `namespace` is used for namespaced kinds whose manifest does not set
    /// one.
    pub async fn apply(
        &self,
        namespace: Option<&str>,
        manifest: &RenderedManifest,
        policy: ApplyPolicy,
    ) -> Result<Applied, ApplyError> {
        let object = decode(namespace, manifest)?;
        self.apply_object(object, policy).await
    }

    /// Apply a Secret manifest with `data` merged into its `data` map
    ///
    /// Payload keys win over keys of the same name in the manifest.
    pub async fn apply_secret_with_data(
        &self,
        namespace: Option<&str>,
        manifest: &RenderedManifest,
        data: &BTreeMap<String, Vec<u8>>,
    ) -> Result<Applied, ApplyError> {
        let mut object = decode(namespace, manifest)?;
        let ManifestObject::Secret(secret) = &mut object else {
            return Err(payload_mismatch(manifest, "secret data"));
        };

        let target = secret.data.get_or_insert_with(BTreeMap::new);
        for (key, value) in data {
            target.insert(key.clone(), ByteString(value.clone()));
        }

        self.apply_object(object, ApplyPolicy::Reconcile).await
    }

    /// Apply a ConfigMap manifest with `data` merged into its `data` map
    pub async fn apply_config_map_with_data(
        &self,
        namespace: Option<&str>,
        manifest: &RenderedManifest,
        data: &BTreeMap<String, String>,
    ) -> Result<Applied, ApplyError> {
        let mut object = decode(namespace, manifest)?;
        let ManifestObject::ConfigMap(config_map) = &mut object else {
            return Err(payload_mismatch(manifest, "config map data"));
        };

        let target = config_map.data.get_or_insert_with(BTreeMap::new);
        for (key, value) in data {
            target.insert(key.clone(), value.clone());
        }

        self.apply_object(object, ApplyPolicy::Reconcile).await
    }

    async fn apply_object(
        &self,
        mut object: ManifestObject,
        policy: ApplyPolicy,
    ) -> Result<Applied, ApplyError> {
        // decode() guarantees a name
        let Some(id) = object.descriptor() else {
            return Err(ApplyError::InvalidManifest {
                path: object.kind().to_string(),
                message: "missing metadata.name".to_string(),
            });
        };

        let Some(live) = self.call(&id, self.api.get(&id)).await? else {
            let created = self.call(&id, self.api.create(&id, &object)).await;
            return match created {
                Ok(created) => {
                    debug!(resource = %id, "Created");
                    Ok(Applied {
                        descriptor: id,
                        outcome: ApplyOutcome::Created,
                        object: created,
                    })
                }
                Err(err)
                    if policy == ApplyPolicy::RetainClusterIp && err.is_cluster_ip_allocated() =>
                {
                    warn!(
                        resource = %id,
                        cluster_ip = ?object.cluster_ip(),
                        error = %err,
                        "Service cluster IP is already allocated to another component, leaving it untouched"
                    );
                    Ok(Applied {
                        descriptor: id,
                        outcome: ApplyOutcome::Retained,
                        object,
                    })
                }
                Err(err) => Err(err),
            };
        };

        if policy == ApplyPolicy::RetainClusterIp
            && let (Some(owned), Some(wanted)) = (live.cluster_ip(), object.cluster_ip())
            && owned != wanted
        {
            warn!(
                resource = %id,
                cluster_ip = owned,
                manifest_cluster_ip = wanted,
                "Service cluster IP is owned by another component, leaving it untouched"
            );
            return Ok(Applied {
                descriptor: id,
                outcome: ApplyOutcome::Retained,
                object: live,
            });
        }

        object.adopt_server_state(&live);
        let updated = self.call(&id, self.api.replace(&id, &object)).await?;
        debug!(resource = %id, resource_version = ?updated.resource_version(), "Updated");

        Ok(Applied {
            descriptor: id,
            outcome: ApplyOutcome::Updated,
            object: updated,
        })
    }

    /// Run one API call under the cancellation token and deadline
    async fn call<T, F>(&self, id: &ResourceDescriptor, request: F) -> Result<T, ApplyError>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        // timeout_at polls the request once before looking at the clock
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(ApplyError::DeadlineExceeded {
                resource: id.clone(),
            });
        }

        let guarded = async {
            match &self.cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ApplyError::Cancelled { resource: id.clone() }),
                    result = request => result.map_err(|e| ApplyError::from_kube(id.clone(), e)),
                },
                None => request
                    .await
                    .map_err(|e| ApplyError::from_kube(id.clone(), e)),
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or_else(|_| Err(ApplyError::DeadlineExceeded { resource: id.clone() })),
            None => guarded.await,
        }
    }
}

/// Decode `manifest` and fill in the default namespace
fn decode(namespace: Option<&str>, manifest: &RenderedManifest) -> Result<ManifestObject, ApplyError> {
    let kind = manifest.kind();
    let mut object =
        ManifestObject::decode(kind, manifest.as_bytes()).map_err(|source| ApplyError::Decode {
            path: manifest.path().to_string(),
            kind,
            source,
        })?;

    if object.name().is_none_or(str::is_empty) {
        return Err(ApplyError::InvalidManifest {
            path: manifest.path().to_string(),
            message: "missing metadata.name".to_string(),
        });
    }

    let meta = object.meta_mut();
    if kind.is_namespaced() {
        if meta.namespace.is_none() {
            meta.namespace = Some(namespace.unwrap_or("default").to_string());
        }
    } else {
        meta.namespace = None;
    }

    Ok(object)
}

fn payload_mismatch(manifest: &RenderedManifest, payload: &str) -> ApplyError {
    ApplyError::InvalidManifest {
        path: manifest.path().to_string(),
        message: format!("{} cannot carry {}", manifest.kind(), payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiOperation, MockApi};
    use kubeseed_core::{ManifestTemplate, ParameterSet, ResourceKind};
    use async_trait::async_trait;
    use kubeseed_engine::Renderer;
    use std::time::Duration;

    /// Every lookup hangs; writes echo the submitted object
    struct StalledApi;

    #[async_trait]
    impl ObjectApi for StalledApi {
        async fn get(&self, _id: &ResourceDescriptor) -> Result<Option<ManifestObject>, kube::Error> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }

        async fn create(
            &self,
            _id: &ResourceDescriptor,
            object: &ManifestObject,
        ) -> Result<ManifestObject, kube::Error> {
            Ok(object.clone())
        }

        async fn replace(
            &self,
            _id: &ResourceDescriptor,
            object: &ManifestObject,
        ) -> Result<ManifestObject, kube::Error> {
            Ok(object.clone())
        }
    }

    fn legacy_dns_service(ip: &str) -> RenderedManifest {
        render(
            ResourceKind::Service,
            &format!(
                "apiVersion: v1\nkind: Service\nmetadata:\n  name: legacy-dns\n  namespace: kube-system\nspec:\n  clusterIP: {}\n  ports:\n  - name: dns\n    port: 53\n",
                ip
            ),
        )
    }

    fn render(kind: ResourceKind, text: &str) -> RenderedManifest {
        Renderer::new()
            .render(
                &ManifestTemplate::new("test.yaml", kind, text),
                &ParameterSet::new(),
            )
            .unwrap()
    }

    fn dns_service(ip: &str) -> RenderedManifest {
        render(
            ResourceKind::Service,
            &format!(
                "apiVersion: v1\nkind: Service\nmetadata:\n  name: dns-default\n  namespace: openshift-dns\nspec:\n  clusterIP: {}\n  ports:\n  - name: dns\n    port: 53\n",
                ip
            ),
        )
    }

    fn bundle() -> RenderedManifest {
        render(
            ResourceKind::ConfigMap,
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: signing-cabundle\n  namespace: openshift-service-ca\n",
        )
    }

    #[tokio::test]
    async fn test_apply_creates_then_updates() {
        let api = MockApi::new();
        let applier = Applier::new(&api);
        let manifest = bundle();

        let first = applier.apply(None, &manifest, ApplyPolicy::Reconcile).await.unwrap();
        assert_eq!(first.outcome, ApplyOutcome::Created);

        let second = applier.apply(None, &manifest, ApplyPolicy::Reconcile).await.unwrap();
        assert_eq!(second.outcome, ApplyOutcome::Updated);
        assert_eq!(second.descriptor, first.descriptor);
        assert_eq!(api.object_count(), 1);
    }

    #[tokio::test]
    async fn test_apply_defaults_namespace() {
        let api = MockApi::new();
        let manifest = render(
            ResourceKind::ServiceAccount,
            "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: router\n",
        );

        let applied = Applier::new(&api)
            .apply(Some("openshift-ingress"), &manifest, ApplyPolicy::Reconcile)
            .await
            .unwrap();
        assert_eq!(applied.descriptor.namespace.as_deref(), Some("openshift-ingress"));
    }

    #[tokio::test]
    async fn test_config_map_payload_merges() {
        let api = MockApi::new();
        let existing = ManifestObject::decode(
            ResourceKind::ConfigMap,
            b"apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: signing-cabundle\n  namespace: openshift-service-ca\ndata:\n  foo: bar\n",
        )
        .unwrap();
        let id = api.seed(existing).unwrap();

        let mut payload = BTreeMap::new();
        payload.insert("ca-bundle.crt".to_string(), "X".to_string());

        let applied = Applier::new(&api)
            .apply_config_map_with_data(None, &bundle(), &payload)
            .await
            .unwrap();
        assert_eq!(applied.outcome, ApplyOutcome::Updated);

        let Some(ManifestObject::ConfigMap(cm)) = api.object(&id) else {
            panic!("config map missing");
        };
        let data = cm.data.unwrap();
        assert_eq!(data["foo"], "bar");
        assert_eq!(data["ca-bundle.crt"], "X");
    }

    #[tokio::test]
    async fn test_secret_payload_on_create() {
        let api = MockApi::new();
        let manifest = render(
            ResourceKind::Secret,
            "apiVersion: v1\nkind: Secret\nmetadata:\n  name: signing-key\n  namespace: openshift-service-ca\ntype: kubernetes.io/tls\ndata:\n  tls.crt: \"\"\n  tls.key: \"\"\n",
        );

        let mut payload = BTreeMap::new();
        payload.insert("tls.crt".to_string(), b"CERT".to_vec());
        payload.insert("tls.key".to_string(), b"KEY".to_vec());

        let applied = Applier::new(&api)
            .apply_secret_with_data(None, &manifest, &payload)
            .await
            .unwrap();

        let ManifestObject::Secret(secret) = applied.object else {
            panic!("expected secret");
        };
        let data = secret.data.unwrap();
        assert_eq!(data["tls.crt"].0, b"CERT".to_vec());
        assert_eq!(data["tls.key"].0, b"KEY".to_vec());
    }

    #[tokio::test]
    async fn test_payload_kind_mismatch() {
        let api = MockApi::new();
        let err = Applier::new(&api)
            .apply_secret_with_data(None, &bundle(), &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::InvalidManifest { .. }));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_retains_owned_cluster_ip() {
        let api = MockApi::new();
        let applier = Applier::new(&api);
        applier
            .apply(None, &dns_service("10.43.0.53"), ApplyPolicy::Reconcile)
            .await
            .unwrap();

        let applied = applier
            .apply(None, &dns_service("10.43.0.10"), ApplyPolicy::RetainClusterIp)
            .await
            .unwrap();

        assert_eq!(applied.outcome, ApplyOutcome::Retained);
        assert_eq!(applied.object.cluster_ip(), Some("10.43.0.53"));
        assert_eq!(api.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_cluster_ip_change_fails_without_policy() {
        let api = MockApi::new();
        let applier = Applier::new(&api);
        applier
            .apply(None, &dns_service("10.43.0.53"), ApplyPolicy::Reconcile)
            .await
            .unwrap();

        let err = applier
            .apply(None, &dns_service("10.43.0.10"), ApplyPolicy::Reconcile)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::Rejected { code: 422, .. }));
    }

    #[tokio::test]
    async fn test_retain_policy_does_not_swallow_permission_errors() {
        let api = MockApi::new();
        api.fail_on(ApiOperation::Get, ResourceKind::Service, "dns-default", 403);

        let err = Applier::new(&api)
            .apply(None, &dns_service("10.43.0.10"), ApplyPolicy::RetainClusterIp)
            .await
            .unwrap_err();
        assert!(err.is_permission());
    }

    #[tokio::test]
    async fn test_same_cluster_ip_updates_normally() {
        let api = MockApi::new();
        let applier = Applier::new(&api);
        applier
            .apply(None, &dns_service("10.43.0.10"), ApplyPolicy::RetainClusterIp)
            .await
            .unwrap();

        let applied = applier
            .apply(None, &dns_service("10.43.0.10"), ApplyPolicy::RetainClusterIp)
            .await
            .unwrap();
        assert_eq!(applied.outcome, ApplyOutcome::Updated);
    }

    #[tokio::test]
    async fn test_update_conflict_surfaces() {
        let api = MockApi::new();
        api.fail_on(ApiOperation::Replace, ResourceKind::ConfigMap, "signing-cabundle", 409);
        let applier = Applier::new(&api);

        applier.apply(None, &bundle(), ApplyPolicy::Reconcile).await.unwrap();
        let err = applier
            .apply(None, &bundle(), ApplyPolicy::Reconcile)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_decode_error_names_path() {
        let api = MockApi::new();
        let manifest = render(
            ResourceKind::Deployment,
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: router\nspec:\n  replicas: many\n",
        );

        let err = Applier::new(&api)
            .apply(None, &manifest, ApplyPolicy::Reconcile)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::Decode { ref path, .. } if path == "test.yaml"));
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let api = MockApi::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = Applier::new(&api)
            .with_cancellation(token)
            .apply(None, &bundle(), ApplyPolicy::Reconcile)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::Cancelled { .. }));
        assert_eq!(api.object_count(), 0);
    }

    #[tokio::test]
    async fn test_deadline_in_the_past() {
        let api = MockApi::new();
        let deadline = Instant::now() - Duration::from_millis(1);

        let err = Applier::new(&api)
            .with_deadline(deadline)
            .apply(None, &bundle(), ApplyPolicy::Reconcile)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::DeadlineExceeded { .. }));
    }

    #[tokio::test]
    async fn test_retains_cluster_ip_allocated_to_another_service() {
        let api = MockApi::new();
        let applier = Applier::new(&api);
        applier
            .apply(None, &legacy_dns_service("10.43.0.10"), ApplyPolicy::Reconcile)
            .await
            .unwrap();

        let applied = applier
            .apply(None, &dns_service("10.43.0.10"), ApplyPolicy::RetainClusterIp)
            .await
            .unwrap();

        assert_eq!(applied.outcome, ApplyOutcome::Retained);
        assert_eq!(applied.object.cluster_ip(), Some("10.43.0.10"));
        assert!(!api.contains(&applied.descriptor));
    }

    #[tokio::test]
    async fn test_allocated_cluster_ip_fails_without_policy() {
        let api = MockApi::new();
        let applier = Applier::new(&api);
        applier
            .apply(None, &legacy_dns_service("10.43.0.10"), ApplyPolicy::Reconcile)
            .await
            .unwrap();

        let err = applier
            .apply(None, &dns_service("10.43.0.10"), ApplyPolicy::Reconcile)
            .await
            .unwrap_err();
        assert!(err.is_cluster_ip_allocated());
    }

    #[tokio::test]
    async fn test_unrelated_create_rejection_is_not_retained() {
        let api = MockApi::new();
        api.fail_on(ApiOperation::Create, ResourceKind::Service, "dns-default", 422);

        let err = Applier::new(&api)
            .apply(None, &dns_service("10.43.0.10"), ApplyPolicy::RetainClusterIp)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::Rejected { code: 422, .. }));
        assert!(!err.is_cluster_ip_allocated());
    }

    #[tokio::test]
    async fn test_retain_policy_does_not_swallow_forbidden_create() {
        let api = MockApi::new();
        api.fail_on(ApiOperation::Create, ResourceKind::Service, "dns-default", 403);

        let err = Applier::new(&api)
            .apply(None, &dns_service("10.43.0.10"), ApplyPolicy::RetainClusterIp)
            .await
            .unwrap_err();
        assert!(err.is_permission());
    }

    #[tokio::test]
    async fn test_deadline_expires_during_call() {
        let deadline = Instant::now() + Duration::from_millis(20);

        let err = Applier::new(&StalledApi)
            .with_deadline(deadline)
            .apply(None, &bundle(), ApplyPolicy::Reconcile)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::DeadlineExceeded { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_during_call() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = Applier::new(&StalledApi)
            .with_cancellation(token)
            .apply(None, &bundle(), ApplyPolicy::Reconcile)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::Cancelled { .. }));
    }
}
