//! Publish local proxies to the management API

use super::{ensure_success, orchestrator};
use crate::config::EdgeConfig;
use crate::output::print_report;
use anyhow::Result;
use edgeci_lib::scheduler::PollSchedulerBuilder;
use edgeci_lib::sync::SyncMode;
use std::path::PathBuf;

/// Package and publish each selected proxy once, deploying it when `environment` is set
pub async fn push(
    config: &EdgeConfig,
    org: &str,
    proxies: &[String],
    source: PathBuf,
    update: bool,
    environment: Option<String>,
) -> Result<()> {
    let mode = SyncMode::Push {
        source,
        update,
        environment,
    };
    let scheduler = PollSchedulerBuilder::new()
        .orchestrator(orchestrator(config, org, proxies, mode)?)
        .build()?;

    let report = scheduler.run_once().await;
    print_report(&report, "Published");
    ensure_success(&report)
}
