//! Continuous synchronization of API proxy bundles
//!
//! This crate provides the core functionality for:
//! - Talking to the gateway management API
//! - Detecting remote proxy changes and pulling them locally
//! - Packaging local proxies and publishing or deploying them
//! - Running a test command on remote or local changes

pub mod bundle;
pub mod cache;
pub mod error;
pub mod gateway;
pub mod models;
pub mod observability;
pub mod revision;
pub mod runner;
pub mod scheduler;
pub mod sync;

pub use cache::ProxyStateCache;
pub use error::{SyncError, SyncResult};
pub use models::*;
pub use observability::SyncLogger;
pub use revision::{resolve_max_revision, resolve_push_plan, PushPlan};
