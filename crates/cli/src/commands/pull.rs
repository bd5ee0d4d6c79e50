//! Pull changed proxies from the management API

use super::{ensure_success, orchestrator, run_until_interrupted};
use crate::config::EdgeConfig;
use crate::output::print_report;
use anyhow::Result;
use edgeci_lib::scheduler::PollSchedulerBuilder;
use edgeci_lib::sync::SyncMode;
use std::path::PathBuf;
use std::time::Duration;

/// Pull once, or keep pulling on an interval when `continuous` is set
pub async fn pull(
    config: &EdgeConfig,
    org: &str,
    proxies: &[String],
    destination: PathBuf,
    continuous: bool,
    interval: Duration,
) -> Result<()> {
    let orchestrator = orchestrator(config, org, proxies, SyncMode::Pull { destination })?;
    let scheduler = PollSchedulerBuilder::new()
        .orchestrator(orchestrator)
        .interval(interval)
        .build()?;

    if continuous {
        return run_until_interrupted(scheduler).await;
    }

    let report = scheduler.run_once().await;
    print_report(&report, "Pulled");
    ensure_success(&report)
}
