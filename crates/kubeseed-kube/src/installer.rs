//! Ordered, fail-fast installation of one component
//!
//! Groups are applied strictly in spec order and every manifest of a group is
//! applied before the next group starts. The first failure stops the install;
//! objects applied so far stay live and the next run converges from the top.

use std::time::Duration;

use kubeseed_core::{AssetSource, ComponentSpec, KindGroup, ParameterSet, Payload};
use kubeseed_engine::Renderer;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::applier::{Applied, Applier};
use crate::client::ObjectApi;
use crate::error::{ApplyError, InstallError, Result};

/// Options shared by every install of one run
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Cancels every in-flight install
    pub cancel: CancellationToken,
    /// Upper bound for one component install
    pub timeout: Option<Duration>,
}

impl InstallOptions {
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Progress of one install invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotStarted,
    /// Applying the group at this index
    ApplyingGroup(usize),
    Complete,
    /// Stopped at the group at this index
    Failed(usize),
}

impl InstallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstallState::Complete | InstallState::Failed(_))
    }
}

/// Outcome of a successful install
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub component: String,
    /// Every applied object, in apply order
    pub applied: Vec<Applied>,
    pub state: InstallState,
}

/// Applies a [`ComponentSpec`] through one API and asset source
pub struct Installer<'a> {
    api: &'a dyn ObjectApi,
    assets: &'a dyn AssetSource,
    renderer: Renderer,
    options: InstallOptions,
}

impl<'a> Installer<'a> {
    pub fn new(api: &'a dyn ObjectApi, assets: &'a dyn AssetSource) -> Self {
        Self {
            api,
            assets,
            renderer: Renderer::new(),
            options: InstallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    /// Render and apply every group of `spec` with `params`
    pub async fn install(&self, spec: &ComponentSpec, params: &ParameterSet) -> Result<InstallReport> {
        let component = spec.name();
        let mut applier = Applier::new(self.api).with_cancellation(self.options.cancel.clone());
        if let Some(timeout) = self.options.timeout {
            applier = applier.with_deadline(Instant::now() + timeout);
        }

        info!(
            component,
            groups = spec.groups().len(),
            resources = spec.resource_count(),
            "Installing component"
        );

        let mut applied = Vec::with_capacity(spec.resource_count());

        for (index, group) in spec.groups().iter().enumerate() {
            let state = InstallState::ApplyingGroup(index);
            info!(
                component,
                step = group.step_name(),
                count = group.manifests.len(),
                ?state,
                "Applying"
            );

            if let Err(source) = self.apply_group(&applier, group, params, &mut applied).await {
                let state = InstallState::Failed(index);
                let resources = group.paths();
                warn!(
                    component,
                    step = group.step_name(),
                    ?resources,
                    ?state,
                    error = %source,
                    "Failed to apply"
                );

                let component = component.to_string();
                let step = group.step_name();
                return Err(if source.is_cancelled() {
                    InstallError::Cancelled {
                        component,
                        step,
                        group: index,
                        resources,
                        source,
                    }
                } else {
                    InstallError::Step {
                        component,
                        step,
                        group: index,
                        resources,
                        source,
                    }
                });
            }
        }

        info!(component, applied = applied.len(), "Component installed");

        Ok(InstallReport {
            component: component.to_string(),
            applied,
            state: InstallState::Complete,
        })
    }

    async fn apply_group(
        &self,
        applier: &Applier<'_>,
        group: &KindGroup,
        params: &ParameterSet,
        applied: &mut Vec<Applied>,
    ) -> std::result::Result<(), ApplyError> {
        for manifest in &group.manifests {
            let template = self
                .assets
                .load(&manifest.path, group.kind)
                .map_err(|_| ApplyError::MissingAsset {
                    path: manifest.path.clone(),
                })?;
            let rendered =
                self.renderer
                    .render(&template, params)
                    .map_err(|source| ApplyError::Render {
                        path: manifest.path.clone(),
                        source,
                    })?;

            let result = match &manifest.payload {
                Some(Payload::SecretData(data)) => {
                    applier.apply_secret_with_data(None, &rendered, data).await?
                }
                Some(Payload::ConfigMapData(data)) => {
                    applier
                        .apply_config_map_with_data(None, &rendered, data)
                        .await?
                }
                None => applier.apply(None, &rendered, manifest.policy).await?,
            };

            debug!(
                kind = %result.descriptor.kind,
                name = %result.descriptor.name,
                namespace = ?result.descriptor.namespace,
                outcome = ?result.outcome,
                "Applied"
            );
            applied.push(result);
        }
        Ok(())
    }
}
