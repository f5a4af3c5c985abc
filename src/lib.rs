#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Deploy Core
//!
//! Deployment job orchestration core: accepts deployment/removal
//! requests, assigns each a durable identity, and advances it through a
//! strict lifecycle (`pending` -> `in_progress` -> `completed`/`failed`)
//! while background workers execute the actual provisioning through
//! pluggable provider adapters.
//!
//! ## Guarantees
//!
//! - **At-most-one active worker per job**: claims and finalizations go
//!   through an atomic compare-and-transition, so concurrent workers
//!   cannot race a job into an inconsistent state.
//! - **Monotonic status progression**: a job only moves forward; terminal
//!   states are final and illegal transitions fail loudly.
//! - **Durable audit trail**: every transition lands with a log entry in
//!   the same logical update; entries are append-only.
//! - **Safe concurrent reads**: status pollers and log viewers read the
//!   store independently of the write path.
//!
//! ## Module Organization
//!
//! - [`models`] - job, log, spec, and credential row types
//! - [`state_machine`] - lifecycle states, events, transition validation
//! - [`store`] - the Job Record Store contract with memory and Postgres backends
//! - [`auth`] - credential resolution and scope checks
//! - [`providers`] - per-cloud provisioning adapters behind a registry
//! - [`orchestration`] - the orchestrator and the per-provider dispatcher
//! - [`services`] - the submit/remove and status/log boundaries
//! - [`config`] / [`logging`] / [`error`] - ambient runtime concerns
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use deploy_core::config::DeployConfig;
//! use deploy_core::orchestration::{Dispatcher, JobOrchestrator};
//! use deploy_core::providers::AdapterRegistry;
//! use deploy_core::services::{DeploymentService, StatusService};
//! use deploy_core::store::MemoryJobStore;
//!
//! # async fn example() {
//! let config = DeployConfig::default();
//! let store = Arc::new(MemoryJobStore::new());
//!
//! let dispatcher = Dispatcher::new(config.dispatcher());
//! let orchestrator = Arc::new(JobOrchestrator::new(store.clone(), dispatcher.handle()));
//! let pool = dispatcher.start(orchestrator.clone(), Arc::new(AdapterRegistry::with_builtin()));
//!
//! let deployments = DeploymentService::new(orchestrator);
//! let statuses = StatusService::new(store);
//! # let _ = (deployments, statuses, pool);
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod providers;
pub mod services;
pub mod state_machine;
pub mod store;
pub mod validation;

pub use error::{DeployError, Result};
