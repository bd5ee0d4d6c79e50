//! Local state cache
//!
//! Remembers the last observed revision and modification time of each
//! proxy so that polling cycles only act on real remote changes.

use crate::models::{ProxyState, SyncDecision};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// Process-lifetime cache of proxy states keyed by proxy name
#[derive(Debug, Default)]
pub struct ProxyStateCache {
    entries: DashMap<String, ProxyState>,
}

impl ProxyStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a metadata observation if it is newer than the cached one.
    ///
    /// The compare and the replace happen under the shard lock of the entry,
    /// so concurrent ticks cannot both win for the same observation.
    pub fn record_if_newer(
        &self,
        proxy_name: &str,
        last_revision: u32,
        last_modified: i64,
    ) -> SyncDecision {
        let state = ProxyState {
            proxy_name: proxy_name.to_string(),
            last_revision,
            last_modified,
        };

        match self.entries.entry(proxy_name.to_string()) {
            Entry::Vacant(vacant) => {
                debug!(proxy = %proxy_name, revision = last_revision, "First observation of proxy");
                vacant.insert(state);
                SyncDecision::ChangedTo(last_revision)
            }
            Entry::Occupied(mut occupied) => {
                if last_modified > occupied.get().last_modified {
                    debug!(
                        proxy = %proxy_name,
                        previous_revision = occupied.get().last_revision,
                        revision = last_revision,
                        "Proxy modified since last observation"
                    );
                    occupied.insert(state);
                    SyncDecision::ChangedTo(last_revision)
                } else {
                    SyncDecision::Unchanged
                }
            }
        }
    }

    /// Get the cached state of a proxy
    pub fn get(&self, proxy_name: &str) -> Option<ProxyState> {
        self.entries.get(proxy_name).map(|r| r.clone())
    }

    /// Put back a state taken with [`get`](Self::get) before a failed pipeline.
    ///
    /// `None` removes the entry so the next observation counts as a change.
    /// Callers must hold the proxy's in-flight permit.
    pub fn restore(&self, proxy_name: &str, previous: Option<ProxyState>) {
        match previous {
            Some(state) => {
                self.entries.insert(proxy_name.to_string(), state);
            }
            None => {
                self.entries.remove(proxy_name);
            }
        }
        debug!(proxy = %proxy_name, "Restored cached proxy state");
    }

    /// List all cached states
    pub fn list(&self) -> Vec<ProxyState> {
        self.entries.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
