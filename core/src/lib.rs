//! Shared domain types, configuration, error taxonomy and persisted-state
//! stores for the maestro execution core.

pub mod checkpoint;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod history;
pub mod selector;
pub mod usage;

pub use checkpoint::{CheckpointError, CheckpointManifest, CheckpointStore};
pub use config::{CliOverrides, Config, ModelProfile};
pub use domain::*;
pub use error::MaestroErrorKind;
pub use events::{EventKind, EventReceiver, EventSender, ExecutorEvent};
pub use history::{hash_task, ExecutionOutcome, ExecutionRecord, HistoryError, HistoryStore, ModelStatistics};
pub use selector::{Candidate, ModelSelector};
pub use usage::{UsageCounter, UsageError, UsageStore};
