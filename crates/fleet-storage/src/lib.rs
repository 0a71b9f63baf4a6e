//! Data model and store interfaces for the fleet orchestration core.
//!
//! The orchestration core never talks to a database directly. It consumes
//! the narrow trait seams defined here; the surrounding dashboard wires
//! them to its persistence layer. The in-memory backend in this crate
//! implements every seam with compare-and-swap semantics and backs the
//! test suites across the workspace.

pub mod command_log;
pub mod device;
pub mod job;
pub mod memory;
pub mod state;
pub mod traits;

pub use command_log::{CommandLog, DeviceOutcome, DeviceResult, GroupCommandStatus};
pub use device::{Device, DeviceAddress, DeviceKind};
pub use job::{Job, JobStatus, NewJob};
pub use memory::MemoryStore;
pub use state::{merge_patch, DeviceStateSnapshot, StateMeta};
pub use traits::{
    CommandLogStore, DeviceDirectory, DeviceEventRecord, DeviceEventSink, DeviceStateStore,
    JobStore,
};
