//! Ingress router

use kubeseed_core::{ComponentSpec, CoreError};

use super::Component;

const DIR: &str = "assets/components/openshift-router";

#[derive(Debug, Default, Clone, Copy)]
pub struct Ingress;

impl Component for Ingress {
    fn name(&self) -> &'static str {
        "ingress"
    }

    fn layout(&self) -> Result<ComponentSpec, CoreError> {
        ComponentSpec::builder(self.name())
            .namespaces([format!("{DIR}/namespace.yaml")])
            .cluster_roles([
                format!("{DIR}/cluster-role.yaml"),
                format!("{DIR}/ingress-to-route-controller-clusterrole.yaml"),
            ])
            .cluster_role_bindings([
                format!("{DIR}/cluster-role-binding.yaml"),
                format!("{DIR}/ingress-to-route-controller-clusterrolebinding.yaml"),
            ])
            .service_accounts([format!("{DIR}/service-account.yaml")])
            .config_maps([format!("{DIR}/configmap.yaml")])
            .services([
                format!("{DIR}/service-internal.yaml"),
                format!("{DIR}/service-cloud.yaml"),
            ])
            .deployments([format!("{DIR}/deployment.yaml")])
            .build()
    }
}
