//! Polling loop
//!
//! Drives the orchestrator on a fixed interval and, when watch paths are
//! configured, on local file changes. Every trigger runs in its own task so a
//! slow tick never holds up the timer; overlap per proxy is handled by the
//! orchestrator's in-flight guard.

use super::watcher::FileWatcher;
use crate::observability::SyncLogger;
use crate::sync::{SyncOrchestrator, TickReport};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Default interval between pull ticks
pub const DEFAULT_PULL_INTERVAL: Duration = Duration::from_secs(30);

/// Default interval between test ticks
pub const DEFAULT_TEST_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the polling loop
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Directories whose changes trigger the test command
    pub watch_paths: Vec<PathBuf>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PULL_INTERVAL,
            watch_paths: Vec::new(),
        }
    }
}

/// Runs orchestrator ticks once or continuously
pub struct PollScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    config: ScheduleConfig,
    logger: SyncLogger,
}

impl PollScheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, config: ScheduleConfig) -> Self {
        let logger = SyncLogger::new(orchestrator.config().org.clone());
        Self {
            orchestrator,
            config,
            logger,
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Run a single tick and log its summary
    pub async fn run_once(&self) -> TickReport {
        run_tick(Arc::clone(&self.orchestrator), self.logger.clone()).await
    }

    /// Tick until a shutdown signal arrives.
    ///
    /// The first tick fires immediately. File-change triggers only run the
    /// test command and never wait for the timer.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let (trigger_tx, mut trigger_rx) = mpsc::channel(1);
        let _watch = if self.config.watch_paths.is_empty() {
            None
        } else {
            Some(FileWatcher::new(self.config.watch_paths.clone(), trigger_tx.clone()).start()?)
        };

        info!(
            mode = self.orchestrator.config().mode.name(),
            interval_secs = self.config.interval.as_secs(),
            watched = self.config.watch_paths.len(),
            "Starting polling scheduler"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut running = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let tick = run_tick(Arc::clone(&self.orchestrator), self.logger.clone());
                    running.spawn(async move {
                        tick.await;
                    });
                }
                Some(()) = trigger_rx.recv() => {
                    let orchestrator = Arc::clone(&self.orchestrator);
                    running.spawn(async move {
                        if let Err(e) = orchestrator.run_watch_trigger().await {
                            warn!(error = %e, "Test command could not be started");
                        }
                    });
                }
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    log_join(joined);
                }
                _ = shutdown.recv() => {
                    info!("Shutting down polling scheduler");
                    break;
                }
            }
        }

        drop(trigger_tx);
        if !running.is_empty() {
            info!(pending = running.len(), "Waiting for running ticks to finish");
        }
        while let Some(joined) = running.join_next().await {
            log_join(joined);
        }
        Ok(())
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "Scheduled task aborted");
    }
}

async fn run_tick(orchestrator: Arc<SyncOrchestrator>, logger: SyncLogger) -> TickReport {
    let mode = orchestrator.config().mode.name();
    let report = orchestrator.run_tick().await;
    logger.log_tick_report(mode, &report);
    report
}

/// Builder for creating a polling scheduler
pub struct PollSchedulerBuilder {
    orchestrator: Option<Arc<SyncOrchestrator>>,
    config: ScheduleConfig,
}

impl PollSchedulerBuilder {
    pub fn new() -> Self {
        Self {
            orchestrator: None,
            config: ScheduleConfig::default(),
        }
    }

    pub fn orchestrator(mut self, orchestrator: Arc<SyncOrchestrator>) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    /// Set the tick interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Add a directory whose changes trigger the test command
    pub fn watch_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.watch_paths.push(path.into());
        self
    }

    pub fn build(self) -> Result<PollScheduler> {
        let orchestrator = self
            .orchestrator
            .ok_or_else(|| anyhow::anyhow!("Orchestrator is required"))?;
        if self.config.interval.is_zero() {
            anyhow::bail!("Polling interval must be greater than zero");
        }

        Ok(PollScheduler::new(orchestrator, self.config))
    }
}

impl Default for PollSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
