//! Tick scheduling
//!
//! This module provides:
//! - The polling loop that drives the orchestrator on an interval
//! - Local file watching that triggers the test command on change

mod r#loop;
mod watcher;


pub use r#loop::{
    PollScheduler, PollSchedulerBuilder, ScheduleConfig, DEFAULT_PULL_INTERVAL,
    DEFAULT_TEST_INTERVAL,
};
pub use watcher::{FileWatcher, WatchHandle};
