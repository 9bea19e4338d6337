//! In-memory API for testing
//!
//! Behaves like an API server for the subset the applier uses: resource
//! versions, optimistic concurrency, duplicate detection, an immutable
//! Service `clusterIP` and one Service per cluster IP. Admission checks for
//! missing namespaces and service accounts can be switched on to catch
//! ordering mistakes.

use async_trait::async_trait;
use kube::error::ErrorResponse;
use kubeseed_core::{ResourceDescriptor, ResourceKind};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::ObjectApi;
use crate::object::ManifestObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    Get,
    Create,
    Replace,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub operation: ApiOperation,
    pub resource: ResourceDescriptor,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: ApiOperation,
    kind: ResourceKind,
    name: String,
    code: u16,
}

#[derive(Debug, Default)]
struct MockState {
    objects: BTreeMap<ResourceDescriptor, ManifestObject>,
    version: u64,
    next_cluster_ip: u8,
    calls: Vec<ApiCall>,
    failures: Vec<InjectedFailure>,
    admission: bool,
}

impl MockState {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    fn allocate_cluster_ip(&mut self) -> String {
        self.next_cluster_ip = self.next_cluster_ip.wrapping_add(1);
        format!("10.43.1.{}", self.next_cluster_ip)
    }

    fn record(&mut self, operation: ApiOperation, id: &ResourceDescriptor) -> Result<(), kube::Error> {
        self.calls.push(ApiCall {
            operation,
            resource: id.clone(),
        });

        match self
            .failures
            .iter()
            .find(|f| f.operation == operation && f.kind == id.kind && f.name == id.name)
        {
            Some(failure) => Err(status(
                failure.code,
                "Injected",
                format!("injected failure for {}", id),
            )),
            None => Ok(()),
        }
    }

    /// What a real server rejects at admission
    fn admit(&self, id: &ResourceDescriptor, object: &ManifestObject) -> Result<(), kube::Error> {
        if !self.admission {
            return Ok(());
        }

        if let Some(ns) = &id.namespace {
            let namespace = ResourceDescriptor::cluster(ResourceKind::Namespace, ns.as_str());
            if !self.objects.contains_key(&namespace) {
                return Err(status(404, "NotFound", format!("namespaces \"{}\" not found", ns)));
            }
        }

        if let Some(account) = object
            .pod_spec()
            .and_then(|spec| spec.service_account_name.as_deref())
        {
            let ns = id.namespace.as_deref().unwrap_or("default");
            let sa = ResourceDescriptor::namespaced(ResourceKind::ServiceAccount, ns, account);
            if account != "default" && !self.objects.contains_key(&sa) {
                return Err(status(
                    422,
                    "Invalid",
                    format!("error looking up service account {}/{}", ns, account),
                ));
            }
        }

        Ok(())
    }
}

fn status(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

/// In-memory capability set for tests
#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<RwLock<MockState>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject creates into missing namespaces and workloads whose service
    /// account does not exist yet
    pub fn with_admission_checks(self) -> Self {
        self.state.write().unwrap().admission = true;
        self
    }

    /// Store `object` directly, assigning a resource version
    ///
    /// Seeded objects do not appear in the call log. Objects without a name
    /// are ignored.
    pub fn seed(&self, mut object: ManifestObject) -> Option<ResourceDescriptor> {
        let id = object.descriptor()?;
        let mut state = self.state.write().unwrap();
        object.meta_mut().resource_version = Some(state.next_version());
        state.objects.insert(id.clone(), object);
        Some(id)
    }

    /// Fail every `operation` on the named object with HTTP `code`
    pub fn fail_on(&self, operation: ApiOperation, kind: ResourceKind, name: &str, code: u16) {
        self.state.write().unwrap().failures.push(InjectedFailure {
            operation,
            kind,
            name: name.to_string(),
            code,
        });
    }

    pub fn clear_failures(&self) {
        self.state.write().unwrap().failures.clear();
    }

    /// Bump the stored resource version, as a concurrent writer would
    pub fn touch(&self, id: &ResourceDescriptor) {
        let mut state = self.state.write().unwrap();
        let version = state.next_version();
        if let Some(object) = state.objects.get_mut(id) {
            object.meta_mut().resource_version = Some(version);
        }
    }

    pub fn object(&self, id: &ResourceDescriptor) -> Option<ManifestObject> {
        self.state.read().unwrap().objects.get(id).cloned()
    }

    pub fn contains(&self, id: &ResourceDescriptor) -> bool {
        self.state.read().unwrap().objects.contains_key(id)
    }

    pub fn object_count(&self) -> usize {
        self.state.read().unwrap().objects.len()
    }

    /// Every stored object
    pub fn objects(&self) -> Vec<ManifestObject> {
        self.state.read().unwrap().objects.values().cloned().collect()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.read().unwrap().calls.clone()
    }

    /// Create and replace calls, in order
    pub fn writes(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation != ApiOperation::Get)
            .collect()
    }

    pub fn reset_calls(&self) {
        self.state.write().unwrap().calls.clear();
    }
}

#[async_trait]
impl ObjectApi for MockApi {
    async fn get(&self, id: &ResourceDescriptor) -> Result<Option<ManifestObject>, kube::Error> {
        let mut state = self.state.write().unwrap();
        state.record(ApiOperation::Get, id)?;
        Ok(state.objects.get(id).cloned())
    }

    async fn create(
        &self,
        id: &ResourceDescriptor,
        object: &ManifestObject,
    ) -> Result<ManifestObject, kube::Error> {
        let mut state = self.state.write().unwrap();
        state.record(ApiOperation::Create, id)?;

        if state.objects.contains_key(id) {
            return Err(status(
                409,
                "AlreadyExists",
                format!("{} already exists", id),
            ));
        }
        state.admit(id, object)?;

        if let Some(ip) = object.cluster_ip()
            && ip != "None"
            && state.objects.values().any(|o| o.cluster_ip() == Some(ip))
        {
            return Err(status(
                422,
                "Invalid",
                format!(
                    "Service \"{}\" is invalid: spec.clusterIPs: Invalid value: []string{{\"{ip}\"}}: failed to allocate IP {ip}: provided IP is already allocated",
                    id.name
                ),
            ));
        }

        let mut stored = object.clone();
        stored.meta_mut().resource_version = Some(state.next_version());
        stored.meta_mut().uid = Some(format!("uid-{}", state.version));
        if let ManifestObject::Service(svc) = &mut stored
            && let Some(spec) = svc.spec.as_mut()
            && spec.cluster_ip.is_none()
        {
            let ip = state.allocate_cluster_ip();
            spec.cluster_ips = Some(vec![ip.clone()]);
            spec.cluster_ip = Some(ip);
        }

        state.objects.insert(id.clone(), stored.clone());
        Ok(stored)
    }

    async fn replace(
        &self,
        id: &ResourceDescriptor,
        object: &ManifestObject,
    ) -> Result<ManifestObject, kube::Error> {
        let mut state = self.state.write().unwrap();
        state.record(ApiOperation::Replace, id)?;

        let Some(current) = state.objects.get(id) else {
            return Err(status(404, "NotFound", format!("{} not found", id)));
        };

        if object.resource_version() != current.resource_version() {
            return Err(status(
                409,
                "Conflict",
                format!(
                    "Operation cannot be fulfilled on {}: the object has been modified",
                    id
                ),
            ));
        }

        if let (Some(live_ip), Some(wanted_ip)) = (current.cluster_ip(), object.cluster_ip())
            && live_ip != wanted_ip
        {
            return Err(status(
                422,
                "Invalid",
                format!("{}: spec.clusterIP: Invalid value: \"{}\": field is immutable", id, wanted_ip),
            ));
        }

        let uid = current.meta().uid.clone();
        let mut stored = object.clone();
        stored.meta_mut().resource_version = Some(state.next_version());
        stored.meta_mut().uid = uid;

        state.objects.insert(id.clone(), stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace(name: &str) -> ManifestObject {
        ManifestObject::decode(
            ResourceKind::Namespace,
            format!("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: {}\n", name).as_bytes(),
        )
        .unwrap()
    }

    fn config_map(ns: &str, name: &str) -> ManifestObject {
        ManifestObject::decode(
            ResourceKind::ConfigMap,
            format!(
                "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {}\n  namespace: {}\n",
                name, ns
            )
            .as_bytes(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let api = MockApi::new();
        let object = namespace("openshift-dns");
        let id = object.descriptor().unwrap();

        let created = api.create(&id, &object).await.unwrap();
        assert_eq!(created.resource_version(), Some("1"));

        let fetched = api.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let api = MockApi::new();
        let object = namespace("openshift-dns");
        let id = api.seed(object.clone()).unwrap();

        let err = api.create(&id, &object).await.unwrap_err();
        assert!(matches!(err, kube::Error::Api(ref resp) if resp.code == 409));
    }

    #[tokio::test]
    async fn test_stale_replace_conflicts() {
        let api = MockApi::new();
        let id = api.seed(namespace("openshift-dns")).unwrap();
        let fetched = api.get(&id).await.unwrap().unwrap();

        api.touch(&id);

        let err = api.replace(&id, &fetched).await.unwrap_err();
        assert!(matches!(err, kube::Error::Api(ref resp) if resp.code == 409));
    }

    #[tokio::test]
    async fn test_admission_requires_namespace() {
        let api = MockApi::new().with_admission_checks();
        let object = config_map("openshift-dns", "dns-default");
        let id = object.descriptor().unwrap();

        let err = api.create(&id, &object).await.unwrap_err();
        assert!(matches!(err, kube::Error::Api(ref resp) if resp.code == 404));

        api.seed(namespace("openshift-dns"));
        assert!(api.create(&id, &object).await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let api = MockApi::new();
        api.fail_on(ApiOperation::Get, ResourceKind::Namespace, "openshift-dns", 503);
        let id = ResourceDescriptor::cluster(ResourceKind::Namespace, "openshift-dns");

        let err = api.get(&id).await.unwrap_err();
        assert!(matches!(err, kube::Error::Api(ref resp) if resp.code == 503));

        api.clear_failures();
        assert!(api.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cluster_ip_allocated_once() {
        let api = MockApi::new();
        let service = |namespace: &str, name: &str| {
            ManifestObject::decode(
                ResourceKind::Service,
                format!(
                    "apiVersion: v1\nkind: Service\nmetadata:\n  name: {}\n  namespace: {}\nspec:\n  clusterIP: 10.43.0.10\n",
                    name, namespace
                )
                .as_bytes(),
            )
            .unwrap()
        };

        let first = service("kube-system", "legacy-dns");
        api.create(&first.descriptor().unwrap(), &first).await.unwrap();

        let second = service("openshift-dns", "dns-default");
        let err = api
            .create(&second.descriptor().unwrap(), &second)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            kube::Error::Api(ref resp) if resp.code == 422 && resp.message.contains("already allocated")
        ));
    }

    #[test]
    fn test_writes_filter_gets() {
        let api = MockApi::new();
        api.seed(namespace("a"));
        assert!(api.writes().is_empty());
        assert_eq!(api.object_count(), 1);
    }
}
