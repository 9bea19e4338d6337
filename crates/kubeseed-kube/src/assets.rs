//! Manifest templates compiled into the binary

use kubeseed_core::AssetSource;

macro_rules! bundled {
    ($($path:literal),* $(,)?) => {
        &[$(($path, include_str!(concat!("../", $path)))),*]
    };
}

static ASSETS: &[(&str, &str)] = bundled![
    "assets/components/openshift-dns/dns/namespace.yaml",
    "assets/components/openshift-dns/dns/cluster-role.yaml",
    "assets/components/openshift-dns/dns/cluster-role-binding.yaml",
    "assets/components/openshift-dns/dns/service-account.yaml",
    "assets/components/openshift-dns/dns/configmap.yaml",
    "assets/components/openshift-dns/dns/service.yaml",
    "assets/components/openshift-dns/dns/daemonset.yaml",
    "assets/components/openshift-dns/node-resolver/service-account.yaml",
    "assets/components/openshift-dns/node-resolver/daemonset.yaml",
    "assets/components/openshift-router/namespace.yaml",
    "assets/components/openshift-router/cluster-role.yaml",
    "assets/components/openshift-router/ingress-to-route-controller-clusterrole.yaml",
    "assets/components/openshift-router/cluster-role-binding.yaml",
    "assets/components/openshift-router/ingress-to-route-controller-clusterrolebinding.yaml",
    "assets/components/openshift-router/service-account.yaml",
    "assets/components/openshift-router/configmap.yaml",
    "assets/components/openshift-router/service-internal.yaml",
    "assets/components/openshift-router/service-cloud.yaml",
    "assets/components/openshift-router/deployment.yaml",
    "assets/components/service-ca/ns.yaml",
    "assets/components/service-ca/clusterrole.yaml",
    "assets/components/service-ca/clusterrolebinding.yaml",
    "assets/components/service-ca/role.yaml",
    "assets/components/service-ca/rolebinding.yaml",
    "assets/components/service-ca/sa.yaml",
    "assets/components/service-ca/signing-secret.yaml",
    "assets/components/service-ca/signing-cabundle.yaml",
    "assets/components/service-ca/deployment.yaml",
];

/// Templates of the bundled components, addressed by `assets/components/...` path
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledAssets;

impl AssetSource for BundledAssets {
    fn get(&self, path: &str) -> Option<&str> {
        ASSETS
            .iter()
            .find(|(asset, _)| *asset == path)
            .map(|(_, source)| *source)
    }

    fn paths(&self) -> Vec<&str> {
        ASSETS.iter().map(|(path, _)| *path).collect()
    }
}
