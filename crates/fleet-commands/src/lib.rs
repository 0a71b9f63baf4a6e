//! Command orchestration: single-device jobs, group fan-out, and the
//! background worker loop.
//!
//! Jobs are claimed with a conditional status transition so that any
//! number of concurrent executors agree on exactly one winner per job.
//! Group commands fan out to member devices with per-device failure
//! isolation and resolve to a terminal status derived purely from the
//! per-device outcomes.

pub mod executor;
pub mod group;
pub mod worker;

pub use executor::JobExecutor;
pub use group::{aggregate_outcome, GroupOrchestrator};
pub use worker::Worker;
