//! # Orchestration
//!
//! The job state machine driver and the dispatch layer that feeds it.
//!
//! [`JobOrchestrator`] owns every status mutation: submission, claim,
//! finalization, and progress appends all funnel through it into the
//! store's compare-and-transition primitive. The [`Dispatcher`] decouples
//! submission from execution with one queue per provider and a fixed
//! worker pool per queue.

pub mod dispatcher;
pub mod orchestrator;

pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherHandle, WorkerPoolHandle};
pub use orchestrator::{JobOrchestrator, SubmitRequest};
