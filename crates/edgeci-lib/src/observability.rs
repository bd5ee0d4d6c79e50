//! Structured logging for synchronization events
//!
//! Every significant step of a pipeline is logged with an `event` field and
//! the organization, so JSON output can be filtered per proxy or per step.

use crate::error::SyncError;
use crate::revision::PushPlan;
use crate::runner::CommandOutcome;
use crate::sync::TickReport;
use tracing::{debug, info, warn};

/// Structured logger bound to one organization
#[derive(Debug, Clone)]
pub struct SyncLogger {
    org: String,
}

impl SyncLogger {
    pub fn new(org: impl Into<String>) -> Self {
        Self { org: org.into() }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    /// Log the proxies resolved from the "all" selector
    pub fn log_discovered(&self, proxies: &[String]) {
        info!(
            event = "proxies_discovered",
            org = %self.org,
            count = proxies.len(),
            proxies = ?proxies,
            "Resolved proxy list"
        );
    }

    /// Log a detected remote change
    pub fn log_change_detected(&self, proxy: &str, revision: u32, last_modified: i64) {
        let modified_at = chrono::DateTime::from_timestamp_millis(last_modified)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| last_modified.to_string());

        info!(
            event = "proxy_changed",
            org = %self.org,
            proxy = %proxy,
            revision = revision,
            modified_at = %modified_at,
            "Remote proxy changed"
        );
    }

    pub fn log_unchanged(&self, proxy: &str) {
        debug!(
            event = "proxy_unchanged",
            org = %self.org,
            proxy = %proxy,
            "No remote change"
        );
    }

    pub fn log_skipped_in_flight(&self, proxy: &str) {
        info!(
            event = "proxy_in_flight",
            org = %self.org,
            proxy = %proxy,
            "Previous pipeline still running, skipping proxy this tick"
        );
    }

    /// Log a completed export and extraction
    pub fn log_exported(&self, proxy: &str, revision: u32, destination: &str) {
        info!(
            event = "proxy_exported",
            org = %self.org,
            proxy = %proxy,
            revision = revision,
            destination = %destination,
            "Exported proxy bundle"
        );
    }

    pub fn log_push_plan(&self, proxy: &str, plan: &PushPlan) {
        info!(
            event = "push_planned",
            org = %self.org,
            proxy = %proxy,
            plan = ?plan,
            revision = plan.target_revision(),
            "Resolved push plan"
        );
    }

    /// Log a published bundle
    pub fn log_published(&self, proxy: &str, revision: u32, imported: bool) {
        let event = if imported {
            "proxy_imported"
        } else {
            "proxy_updated"
        };
        info!(
            event = event,
            org = %self.org,
            proxy = %proxy,
            revision = revision,
            "Published proxy bundle"
        );
    }

    pub fn log_deployed(&self, proxy: &str, revision: u32, env: &str) {
        info!(
            event = "proxy_deployed",
            org = %self.org,
            proxy = %proxy,
            revision = revision,
            env = %env,
            "Deployed proxy revision"
        );
    }

    /// Log the result of an external test command run
    pub fn log_test_run(&self, trigger: &str, outcome: &CommandOutcome) {
        if outcome.success {
            info!(
                event = "tests_passed",
                org = %self.org,
                trigger = %trigger,
                "Test command succeeded"
            );
        } else {
            warn!(
                event = "tests_failed",
                org = %self.org,
                trigger = %trigger,
                exit_code = ?outcome.exit_code,
                "Test command failed"
            );
        }
    }

    /// Log a failed step of a proxy pipeline
    pub fn log_failure(&self, proxy: &str, error: &SyncError) {
        warn!(
            event = "proxy_sync_failed",
            org = %self.org,
            proxy = %proxy,
            operation = error.operation().unwrap_or("local"),
            status = ?error.status(),
            error = %error,
            "Proxy synchronization failed"
        );
    }

    /// Log the summary of a finished tick
    pub fn log_tick_report(&self, mode: &str, report: &TickReport) {
        if report.is_success() {
            info!(
                event = "tick_complete",
                org = %self.org,
                mode = %mode,
                synced = report.synced_count(),
                unchanged = report.unchanged_count(),
                skipped = report.skipped_count(),
                "Synchronization tick complete"
            );
        } else {
            warn!(
                event = "tick_complete",
                org = %self.org,
                mode = %mode,
                synced = report.synced_count(),
                unchanged = report.unchanged_count(),
                skipped = report.skipped_count(),
                failed = report.failed_count(),
                discovery_failed = report.discovery_error.is_some(),
                "Synchronization tick complete with failures"
            );
        }
    }

    /// Log a failure that is not tied to one proxy
    pub fn log_tick_failure(&self, stage: &str, error: &SyncError) {
        warn!(
            event = "tick_failed",
            org = %self.org,
            stage = %stage,
            operation = error.operation().unwrap_or("local"),
            status = ?error.status(),
            error = %error,
            "Synchronization tick aborted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_logger_creation() {
        let logger = SyncLogger::new("acme");
        assert_eq!(logger.org(), "acme");
    }

    #[test]
    fn test_logging_does_not_panic_without_subscriber() {
        let logger = SyncLogger::new("acme");
        logger.log_change_detected("orders-api", 2, 100);
        logger.log_change_detected("orders-api", 2, i64::MAX);
        logger.log_push_plan("orders-api", &PushPlan::ImportFresh);
        logger.log_failure("orders-api", &SyncError::InvalidRevisionSet);
        logger.log_tick_report("pull", &TickReport::default());
    }
}
