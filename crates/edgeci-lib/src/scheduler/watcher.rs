//! Local file-change triggers
//!
//! Watches directories recursively and turns bursts of filesystem events into
//! single trigger messages. Paths with a hidden component below the watched
//! root (editor swap files, `.git`) never trigger.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Watches local directories and sends a trigger on relevant changes
pub struct FileWatcher {
    paths: Vec<PathBuf>,
    trigger_tx: mpsc::Sender<()>,
}

impl FileWatcher {
    pub fn new(paths: Vec<PathBuf>, trigger_tx: mpsc::Sender<()>) -> Self {
        Self { paths, trigger_tx }
    }

    /// Start watching.
    /// Returns a handle that stops watching when dropped.
    pub fn start(self) -> Result<WatchHandle> {
        let roots: Vec<PathBuf> = self
            .paths
            .iter()
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
            .collect();

        let trigger_tx = self.trigger_tx;
        let event_roots = roots.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if is_relevant(&event, &event_roots) {
                        // A full channel already holds a pending trigger
                        let _ = trigger_tx.try_send(());
                    }
                }
                Err(e) => warn!(error = %e, "File watcher error"),
            },
            notify::Config::default(),
        )
        .context("Failed to create filesystem watcher")?;

        for root in &roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch {}", root.display()))?;
            info!(path = %root.display(), "Watching directory for changes");
        }

        Ok(WatchHandle {
            _watcher: watcher,
            roots,
        })
    }
}

/// Handle to a running watcher
/// Stops watching when dropped
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl WatchHandle {
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

fn is_relevant(event: &Event, roots: &[PathBuf]) -> bool {
    let kind_matches = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    if !kind_matches {
        return false;
    }

    let relevant = event.paths.iter().any(|path| !is_hidden(path, roots));
    if relevant {
        debug!(paths = ?event.paths, "Watched file changed");
    }
    relevant
}

/// True if any component of `path` below its watch root starts with a dot
pub(crate) fn is_hidden(path: &Path, roots: &[PathBuf]) -> bool {
    let relative = roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);

    relative.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}
