//! Cluster DNS: CoreDNS daemonset, node resolver and the cluster DNS service

use kubeseed_core::{ComponentSpec, CoreError, ManifestRef, NodeConfig, ParameterSet};

use super::Component;

const DIR: &str = "assets/components/openshift-dns";

/// CoreDNS and the node resolver
///
/// The `dns-default` service carries the cluster DNS address. When the live
/// service already holds a different address it is left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dns;

impl Component for Dns {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn layout(&self) -> Result<ComponentSpec, CoreError> {
        ComponentSpec::builder(self.name())
            .namespaces([format!("{DIR}/dns/namespace.yaml")])
            .cluster_roles([format!("{DIR}/dns/cluster-role.yaml")])
            .cluster_role_bindings([format!("{DIR}/dns/cluster-role-binding.yaml")])
            .service_accounts([
                format!("{DIR}/dns/service-account.yaml"),
                format!("{DIR}/node-resolver/service-account.yaml"),
            ])
            .config_maps([format!("{DIR}/dns/configmap.yaml")])
            .services([ManifestRef::new(format!("{DIR}/dns/service.yaml")).retain_cluster_ip()])
            .daemon_sets([
                format!("{DIR}/dns/daemonset.yaml"),
                format!("{DIR}/node-resolver/daemonset.yaml"),
            ])
            .build()
    }

    fn overrides(&self, config: &NodeConfig) -> ParameterSet {
        ParameterSet::new().with("ClusterIP", &config.cluster.dns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::ApplyOutcome;
    use crate::assets::BundledAssets;
    use crate::client::MockApi;
    use crate::components::install_component;
    use crate::installer::InstallOptions;
    use crate::object::ManifestObject;
    use kubeseed_core::{ApplyPolicy, AssetSource, ResourceDescriptor, ResourceKind};
    use kubeseed_engine::Renderer;

    #[test]
    fn test_dns_layout() {
        let spec = Dns.layout().unwrap();
        let steps: Vec<&str> = spec.groups().iter().map(|g| g.step_name()).collect();
        assert_eq!(
            steps,
            vec![
                "namespaces",
                "cluster-roles",
                "cluster-role-bindings",
                "service-accounts",
                "config-maps",
                "services",
                "daemon-sets",
            ]
        );
        assert_eq!(spec.resource_count(), 9);

        let services = &spec.groups()[5];
        assert_eq!(services.kind, ResourceKind::Service);
        assert_eq!(services.manifests[0].policy, ApplyPolicy::RetainClusterIp);
    }

    #[test]
    fn test_cluster_ip_from_config() {
        let mut config = NodeConfig::default();
        config.cluster.dns = "10.43.0.53".to_string();

        let params = Dns.parameters(&config);
        assert_eq!(params.get("ClusterIP"), Some("10.43.0.53"));
        assert_eq!(params.get("ClusterDNS"), Some("10.43.0.53"));
    }

    #[tokio::test]
    async fn test_install_converges_when_address_is_taken() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().to_path_buf(),
            ..NodeConfig::default()
        };
        let api = MockApi::new();
        api.seed(
            ManifestObject::decode(
                ResourceKind::Service,
                b"apiVersion: v1\nkind: Service\nmetadata:\n  name: coredns\n  namespace: kube-system\nspec:\n  clusterIP: 10.43.0.10\n",
            )
            .unwrap(),
        );

        let report = install_component(&Dns, &config, &api, &BundledAssets, &InstallOptions::default())
            .await
            .unwrap();

        let service = report
            .applied
            .iter()
            .find(|a| a.descriptor.kind == ResourceKind::Service)
            .unwrap();
        assert_eq!(service.outcome, ApplyOutcome::Retained);
        assert!(
            api.contains(&ResourceDescriptor::namespaced(
                ResourceKind::DaemonSet,
                "openshift-dns",
                "node-resolver"
            ))
        );
    }

    #[test]
    fn test_node_resolver_env_is_quoted() {
        let template = BundledAssets
            .load(
                &format!("{DIR}/node-resolver/daemonset.yaml"),
                ResourceKind::DaemonSet,
            )
            .unwrap();
        let rendered = Renderer::new()
            .render(&template, &Dns.parameters(&NodeConfig::default()))
            .unwrap();
        assert!(rendered.as_str().contains("value: \"10.43.0.10\""));

        let Ok(ManifestObject::DaemonSet(ds)) =
            ManifestObject::decode(ResourceKind::DaemonSet, rendered.as_bytes())
        else {
            panic!("expected daemonset");
        };
        let env = ds.spec.unwrap().template.spec.unwrap().containers[0]
            .env
            .clone()
            .unwrap();
        let nameserver = env.iter().find(|e| e.name == "NAMESERVER").unwrap();
        assert_eq!(nameserver.value.as_deref(), Some("10.43.0.10"));
    }
}
