//! Subcommand implementations

pub mod kvm;
pub mod pull;
pub mod push;

use crate::config::EdgeConfig;
use crate::output::print_info;
use anyhow::Result;
use edgeci_lib::scheduler::PollScheduler;
use edgeci_lib::sync::{
    ProxySelector, SyncConfig, SyncMode, SyncOrchestrator, SyncOrchestratorBuilder, TickReport,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Build an orchestrator for one organization and workflow
fn orchestrator(
    config: &EdgeConfig,
    org: &str,
    proxies: &[String],
    mode: SyncMode,
) -> Result<Arc<SyncOrchestrator>> {
    let client = config.client()?;

    let orchestrator = SyncOrchestratorBuilder::new()
        .config(SyncConfig {
            org: org.to_string(),
            selector: ProxySelector::from_args(proxies.iter().cloned()),
            mode,
        })
        .client(Arc::new(client))
        .build()?;

    Ok(Arc::new(orchestrator))
}

/// Run the scheduler until Ctrl-C
async fn run_until_interrupted(scheduler: PollScheduler) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(());
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    print_info("Watching for changes, press Ctrl-C to stop");
    scheduler.run(shutdown_rx).await
}

/// Fail when any proxy of a single run failed
fn ensure_success(report: &TickReport) -> Result<()> {
    if let Some(e) = &report.discovery_error {
        anyhow::bail!("Proxy discovery failed: {}", e);
    }
    if report.is_success() {
        Ok(())
    } else {
        anyhow::bail!("{} proxies failed", report.failed_count())
    }
}
