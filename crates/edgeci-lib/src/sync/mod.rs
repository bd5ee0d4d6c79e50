//! Synchronization with the management API
//!
//! This module provides:
//! - The orchestrator that runs the pull, push and test pipelines per proxy
//! - The per-proxy in-flight guard that keeps pipelines from overlapping

mod guard;
mod orchestrator;


pub use guard::{FlightPermit, FlightState, InFlightRegistry};
pub use orchestrator::{
    ProxyOutcome, ProxySelector, SyncConfig, SyncMode, SyncOrchestrator, SyncOrchestratorBuilder,
    TickReport, ALL_PROXIES,
};
