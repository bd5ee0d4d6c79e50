//! Synchronization orchestrator
//!
//! One tick fans out a pipeline per tracked proxy:
//! discover → probe → decide → act. Failures stay inside the proxy that
//! produced them; the tick always completes and reports every outcome.

use super::guard::InFlightRegistry;
use crate::bundle::{clear_directory, BundleCodec, ZipBundleCodec};
use crate::cache::ProxyStateCache;
use crate::error::{SyncError, SyncResult};
use crate::gateway::GatewayClient;
use crate::models::{MetadataProbe, ProxyState, SyncDecision};
use crate::observability::SyncLogger;
use crate::revision::{resolve_max_revision, resolve_push_plan, PushPlan};
use crate::runner::{CommandOutcome, CommandRunner, ShellCommandRunner};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Selector argument that expands to every proxy
pub const ALL_PROXIES: &str = "all";

/// Which proxies a tick works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxySelector {
    /// Every proxy: remote proxies for pull and test, local source directories for push
    All,
    Named(Vec<String>),
}

impl ProxySelector {
    /// Build a selector from command line values; a leading "all" selects everything
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = args.into_iter().map(Into::into).collect();
        if names.first().map(String::as_str) == Some(ALL_PROXIES) {
            ProxySelector::All
        } else {
            ProxySelector::Named(names)
        }
    }
}

/// Pipeline run for a changed proxy
#[derive(Debug, Clone)]
pub enum SyncMode {
    /// Export changed proxies into `destination/<proxy>`
    Pull { destination: PathBuf },
    /// Package `source/<proxy>` and publish it, optionally deploying it
    Push {
        source: PathBuf,
        update: bool,
        environment: Option<String>,
    },
    /// Pull changed proxies, then run the test command
    Test {
        destination: PathBuf,
        command: String,
    },
}

impl SyncMode {
    pub fn name(&self) -> &'static str {
        match self {
            SyncMode::Pull { .. } => "pull",
            SyncMode::Push { .. } => "push",
            SyncMode::Test { .. } => "test",
        }
    }
}

/// Static configuration of an orchestrator
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub org: String,
    pub selector: ProxySelector,
    pub mode: SyncMode,
}

/// What happened to one proxy during a tick
#[derive(Debug)]
pub enum ProxyOutcome {
    /// The pipeline ran and acted on this revision
    Synced { revision: u32 },
    Unchanged,
    /// Another tick is still running a pipeline for this proxy
    SkippedInFlight,
    Failed(SyncError),
}

/// Outcomes of one tick, sorted by proxy name
#[derive(Debug, Default)]
pub struct TickReport {
    pub outcomes: Vec<(String, ProxyOutcome)>,
    /// Set when the proxy list could not be resolved; no proxy ran
    pub discovery_error: Option<SyncError>,
}

impl TickReport {
    pub fn outcome(&self, proxy: &str) -> Option<&ProxyOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == proxy)
            .map(|(_, outcome)| outcome)
    }

    pub fn synced_count(&self) -> usize {
        self.count(|o| matches!(o, ProxyOutcome::Synced { .. }))
    }

    pub fn unchanged_count(&self) -> usize {
        self.count(|o| matches!(o, ProxyOutcome::Unchanged))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ProxyOutcome::SkippedInFlight))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ProxyOutcome::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.discovery_error.is_none() && self.failed_count() == 0
    }

    fn count(&self, predicate: impl Fn(&ProxyOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }
}

/// A recorded change and the cache entry it replaced
struct DetectedChange {
    revision: u32,
    previous: Option<ProxyState>,
}

/// Drives the pull, push and test pipelines against the management API
pub struct SyncOrchestrator {
    config: SyncConfig,
    client: Arc<dyn GatewayClient>,
    cache: Arc<ProxyStateCache>,
    codec: Arc<dyn BundleCodec>,
    runner: Arc<dyn CommandRunner>,
    in_flight: InFlightRegistry,
    /// Expansion of the "all" selector, resolved on the first successful tick
    discovered: OnceCell<Vec<String>>,
    logger: SyncLogger,
}

impl SyncOrchestrator {
    pub fn new(
        config: SyncConfig,
        client: Arc<dyn GatewayClient>,
        cache: Arc<ProxyStateCache>,
        codec: Arc<dyn BundleCodec>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let logger = SyncLogger::new(config.org.clone());
        Self {
            config,
            client,
            cache,
            codec,
            runner,
            in_flight: InFlightRegistry::new(),
            discovered: OnceCell::new(),
            logger,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ProxyStateCache> {
        &self.cache
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Run one tick over every tracked proxy.
    ///
    /// Proxies are processed concurrently. A proxy whose previous pipeline
    /// is still running is skipped without touching the cache.
    pub async fn run_tick(self: Arc<Self>) -> TickReport {
        let proxies = match self.resolve_proxies().await {
            Ok(proxies) => proxies,
            Err(e) => {
                self.logger.log_tick_failure("discover", &e);
                return TickReport {
                    discovery_error: Some(e),
                    ..TickReport::default()
                };
            }
        };

        let mut tasks = JoinSet::new();
        for proxy in proxies {
            let this = Arc::clone(&self);
            tasks.spawn(async move {
                let outcome = this.sync_proxy(&proxy).await;
                (proxy, outcome)
            });
        }

        let mut report = TickReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => report.outcomes.push(entry),
                Err(e) => warn!(error = %e, "Proxy pipeline task aborted"),
            }
        }
        report.outcomes.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(
            mode = self.config.mode.name(),
            synced = report.synced_count(),
            unchanged = report.unchanged_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "Tick complete"
        );
        report
    }

    /// React to a change in a watched test directory.
    ///
    /// Only the test workflow runs anything; other modes ignore the trigger.
    pub async fn run_watch_trigger(&self) -> SyncResult<Option<CommandOutcome>> {
        match &self.config.mode {
            SyncMode::Test { command, .. } => {
                let outcome = self.runner.run(command).await?;
                self.logger.log_test_run("file_change", &outcome);
                Ok(Some(outcome))
            }
            _ => Ok(None),
        }
    }

    /// Expand the selector into concrete proxy names
    async fn resolve_proxies(&self) -> SyncResult<Vec<String>> {
        let ProxySelector::Named(names) = &self.config.selector else {
            let proxies = self
                .discovered
                .get_or_try_init(|| async {
                    let proxies = match &self.config.mode {
                        SyncMode::Push { source, .. } => list_source_dirs(source)?,
                        _ => self.client.list_proxies(&self.config.org).await?,
                    };
                    self.logger.log_discovered(&proxies);
                    Ok::<_, SyncError>(proxies)
                })
                .await?;
            return Ok(proxies.clone());
        };

        Ok(names.clone())
    }

    /// Run the pipeline of one proxy and classify the result
    async fn sync_proxy(&self, proxy: &str) -> ProxyOutcome {
        let Some(_permit) = self.in_flight.try_acquire(proxy) else {
            self.logger.log_skipped_in_flight(proxy);
            return ProxyOutcome::SkippedInFlight;
        };

        let result = match &self.config.mode {
            SyncMode::Pull { destination } => self.pull_pipeline(proxy, destination, None).await,
            SyncMode::Test {
                destination,
                command,
            } => {
                self.pull_pipeline(proxy, destination, Some(command.as_str()))
                    .await
            }
            SyncMode::Push {
                source,
                update,
                environment,
            } => self
                .push_pipeline(proxy, source, *update, environment.as_deref())
                .await
                .map(Some),
        };

        match result {
            Ok(Some(revision)) => ProxyOutcome::Synced { revision },
            Ok(None) => {
                self.logger.log_unchanged(proxy);
                ProxyOutcome::Unchanged
            }
            Err(e) => {
                self.logger.log_failure(proxy, &e);
                ProxyOutcome::Failed(e)
            }
        }
    }

    /// Probe the remote metadata and record it.
    ///
    /// Returns the revision to act on together with the cache entry it
    /// replaced, so a failed action can be rolled back.
    async fn detect_change(&self, proxy: &str) -> SyncResult<Option<DetectedChange>> {
        let metadata = match self.client.fetch_metadata(&self.config.org, proxy).await? {
            MetadataProbe::Found(metadata) => metadata,
            MetadataProbe::NotFound => {
                debug!(proxy = %proxy, "Proxy not found remotely, nothing to pull");
                return Ok(None);
            }
        };

        let revision = resolve_max_revision(&metadata.revisions)?;
        // Only the holder of the in-flight permit writes this entry
        let previous = self.cache.get(proxy);
        match self
            .cache
            .record_if_newer(proxy, revision, metadata.last_modified())
        {
            SyncDecision::Unchanged => Ok(None),
            SyncDecision::ChangedTo(revision) => {
                self.logger
                    .log_change_detected(proxy, revision, metadata.last_modified());
                Ok(Some(DetectedChange { revision, previous }))
            }
        }
    }

    /// Pull a changed proxy, then run `command` if one is given.
    ///
    /// Any failure restores the cache entry so the next tick tries again.
    async fn pull_pipeline(
        &self,
        proxy: &str,
        destination: &Path,
        command: Option<&str>,
    ) -> SyncResult<Option<u32>> {
        let Some(change) = self.detect_change(proxy).await? else {
            return Ok(None);
        };

        if let Err(e) = self
            .act_on_change(proxy, change.revision, destination, command)
            .await
        {
            self.cache.restore(proxy, change.previous);
            return Err(e);
        }
        Ok(Some(change.revision))
    }

    async fn act_on_change(
        &self,
        proxy: &str,
        revision: u32,
        destination: &Path,
        command: Option<&str>,
    ) -> SyncResult<()> {
        self.export_and_extract(proxy, revision, destination).await?;

        if let Some(command) = command {
            // A failing test run is reported, the pull itself still counts
            let outcome = self.runner.run(command).await?;
            self.logger.log_test_run(proxy, &outcome);
        }
        Ok(())
    }

    /// Replace `destination/proxy` with the exported bundle.
    ///
    /// The previous extraction is only removed once the download succeeded.
    async fn export_and_extract(
        &self,
        proxy: &str,
        revision: u32,
        destination: &Path,
    ) -> SyncResult<()> {
        let bundle = self
            .client
            .export_bundle(&self.config.org, proxy, revision)
            .await?;

        let target = destination.join(proxy);
        clear_directory(&target)?;
        self.codec.extract(&bundle, &target)?;

        self.logger
            .log_exported(proxy, revision, &target.display().to_string());
        Ok(())
    }

    /// Package, publish and optionally deploy a local proxy.
    ///
    /// Push always probes the remote state fresh and never consults the cache.
    async fn push_pipeline(
        &self,
        proxy: &str,
        source: &Path,
        update: bool,
        environment: Option<&str>,
    ) -> SyncResult<u32> {
        let staging = source.join(format!("{}.zip", proxy));
        let bundle = self.codec.package(&source.join(proxy), &staging)?;

        let result = self.publish(proxy, bundle, update, environment).await;

        if let Err(e) = std::fs::remove_file(&staging) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %staging.display(), error = %e, "Could not remove staging archive");
            }
        }

        result
    }

    async fn publish(
        &self,
        proxy: &str,
        bundle: Vec<u8>,
        update: bool,
        environment: Option<&str>,
    ) -> SyncResult<u32> {
        let org = &self.config.org;

        let probe = self.client.fetch_metadata(org, proxy).await?;
        let plan = resolve_push_plan(&probe, update)?;
        self.logger.log_push_plan(proxy, &plan);

        let revision = match plan {
            PushPlan::Update(revision) => {
                self.client
                    .update_bundle(org, proxy, revision, bundle)
                    .await?;
                revision
            }
            PushPlan::Import(_) | PushPlan::ImportFresh => {
                let created = self.client.import_bundle(org, proxy, bundle).await?;
                if created != plan.target_revision() {
                    warn!(
                        proxy = %proxy,
                        expected = plan.target_revision(),
                        created = created,
                        "Import created an unexpected revision"
                    );
                }
                created
            }
        };
        self.logger.log_published(proxy, revision, plan.is_import());

        if let Some(env) = environment.filter(|env| !env.is_empty()) {
            self.client.deploy(org, proxy, revision, env).await?;
            self.logger.log_deployed(proxy, revision, env);
        }

        Ok(revision)
    }
}

/// Proxy names for "all" in push mode: the non-hidden subdirectories of the source
fn list_source_dirs(source: &Path) -> SyncResult<Vec<String>> {
    let listing = std::fs::read_dir(source).map_err(|e| SyncError::path_io("read", source, e))?;

    let mut names = Vec::new();
    for entry in listing {
        let entry = entry.map_err(|e| SyncError::path_io("read", source, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// Builder for creating a sync orchestrator
pub struct SyncOrchestratorBuilder {
    config: Option<SyncConfig>,
    client: Option<Arc<dyn GatewayClient>>,
    cache: Option<Arc<ProxyStateCache>>,
    codec: Option<Arc<dyn BundleCodec>>,
    runner: Option<Arc<dyn CommandRunner>>,
}

impl SyncOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            client: None,
            cache: None,
            codec: None,
            runner: None,
        }
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the management API client
    pub fn client(mut self, client: Arc<dyn GatewayClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Share an existing state cache (a fresh one is created otherwise)
    pub fn cache(mut self, cache: Arc<ProxyStateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn BundleCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn build(self) -> Result<SyncOrchestrator> {
        let config = self
            .config
            .ok_or_else(|| anyhow::anyhow!("Sync configuration is required"))?;
        let client = self
            .client
            .ok_or_else(|| anyhow::anyhow!("Gateway client is required"))?;
        if config.org.is_empty() {
            anyhow::bail!("Organization must not be empty");
        }
        if config.selector == ProxySelector::Named(Vec::new()) {
            anyhow::bail!("At least one proxy must be selected");
        }

        Ok(SyncOrchestrator::new(
            config,
            client,
            self.cache
                .unwrap_or_else(|| Arc::new(ProxyStateCache::new())),
            self.codec
                .unwrap_or_else(|| Arc::new(ZipBundleCodec::new())),
            self.runner
                .unwrap_or_else(|| Arc::new(ShellCommandRunner::new())),
        ))
    }
}

impl Default for SyncOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
