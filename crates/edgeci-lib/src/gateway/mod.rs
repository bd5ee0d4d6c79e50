//! Management API access
//!
//! The [`GatewayClient`] trait is the seam between the synchronization
//! logic and the remote management service. [`EdgeClient`] implements it
//! over HTTP.

mod client;

pub use client::{ClientConfig, Credentials, EdgeClient, EdgeClientBuilder, DEFAULT_BASE_URL};

use crate::error::SyncResult;
use crate::models::{KvmEntry, MetadataProbe};

pub use async_trait::async_trait;

/// Typed operations against the management API.
///
/// Implementations never retry; a failed call surfaces once and the next
/// polling tick is the retry.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// List the names of all proxies in an organization
    async fn list_proxies(&self, org: &str) -> SyncResult<Vec<String>>;

    /// Fetch revision and modification metadata for a proxy
    async fn fetch_metadata(&self, org: &str, proxy: &str) -> SyncResult<MetadataProbe>;

    /// Download the bundle archive of a revision
    async fn export_bundle(&self, org: &str, proxy: &str, revision: u32) -> SyncResult<Vec<u8>>;

    /// Import a bundle as a new revision, returning the revision created
    async fn import_bundle(&self, org: &str, proxy: &str, bundle: Vec<u8>) -> SyncResult<u32>;

    /// Overwrite an existing revision with a bundle
    async fn update_bundle(
        &self,
        org: &str,
        proxy: &str,
        revision: u32,
        bundle: Vec<u8>,
    ) -> SyncResult<()>;

    /// Deploy a revision to an environment, overriding the current deployment
    async fn deploy(&self, org: &str, proxy: &str, revision: u32, env: &str) -> SyncResult<()>;

    /// Read a key value map entry
    async fn fetch_kvm_entry(
        &self,
        org: &str,
        env: &str,
        map: &str,
        key: &str,
    ) -> SyncResult<KvmEntry>;

    /// Insert a key value map entry
    async fn insert_kvm_entry(
        &self,
        org: &str,
        env: &str,
        map: &str,
        key: &str,
        value: &str,
    ) -> SyncResult<()>;
}
