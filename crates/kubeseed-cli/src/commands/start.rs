//! Start command - install bundled components against a cluster

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use console::style;
use kubeseed_core::NodeConfig;
use kubeseed_kube::{
    ApplyOutcome, BundledAssets, Component, InstallOptions, InstallReport, KubeApi, ObjectApi,
    start_components,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{load_config, select_components};
use crate::error::{CliError, Result};

/// Install the selected components (all when `names` is empty)
///
/// Ctrl-C cancels every in-flight install; objects already applied stay live.
pub async fn run(
    config_path: &Path,
    kubeconfig: &Path,
    names: &[String],
    timeout: Option<u64>,
) -> Result<()> {
    let config = load_config(Some(config_path))?;
    let components = select_components(names)?;
    let api = KubeApi::from_kubeconfig(kubeconfig).await?;

    let cancel = CancellationToken::new();
    let mut options = InstallOptions::default().with_cancellation(cancel.clone());
    if let Some(secs) = timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight installs");
                cancel.cancel();
            }
        }
    });

    let result = start(
        &components,
        &config,
        &api,
        &options,
        &mut std::io::stdout().lock(),
    )
    .await;
    interrupt.abort();
    result
}

/// Drive the installs and print one line per component
pub(crate) async fn start(
    components: &[Box<dyn Component>],
    config: &NodeConfig,
    api: &dyn ObjectApi,
    options: &InstallOptions,
    out: &mut impl Write,
) -> Result<()> {
    let results = start_components(components, config, api, &BundledAssets, options).await;

    let mut failed = 0;
    let mut cancelled = 0;
    for (name, result) in &results {
        match result {
            Ok(report) => writeln!(
                out,
                "{} {} {}",
                style("✓").green().bold(),
                style(name).cyan(),
                summary(report)
            )?,
            Err(err) => {
                failed += 1;
                if err.is_cancelled() {
                    cancelled += 1;
                }
                writeln!(out, "{} {} {}", style("✗").red().bold(), style(name).cyan(), err)?;
                if let Some(step) = err.step() {
                    writeln!(out, "    at step {}: {}", step, err.resources().join(", "))?;
                }
            }
        }
    }

    match (failed, cancelled) {
        (0, _) => Ok(()),
        (failed, cancelled) if failed == cancelled => Err(CliError::Cancelled),
        (failed, _) => Err(CliError::StartFailed {
            failed,
            total: results.len(),
        }),
    }
}

fn summary(report: &InstallReport) -> String {
    let count = |outcome: ApplyOutcome| {
        report
            .applied
            .iter()
            .filter(|a| a.outcome == outcome)
            .count()
    };
    let mut summary = format!(
        "{} created, {} updated",
        count(ApplyOutcome::Created),
        count(ApplyOutcome::Updated)
    );
    let retained = count(ApplyOutcome::Retained);
    if retained > 0 {
        summary.push_str(&format!(", {} retained", retained));
    }
    summary
}
