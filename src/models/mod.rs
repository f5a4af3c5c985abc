//! # Data Layer
//!
//! Row types for deployment jobs, their append-only log entries, and API
//! credentials, plus the immutable deployment spec snapshot captured at
//! submission time.

pub mod api_key;
pub mod job;
pub mod job_log;
pub mod spec;

pub use api_key::ApiKey;
pub use job::{Job, JobKind, NewJob, Provider};
pub use job_log::{LogEntry, LogLevel, NewLogEntry};
pub use spec::{BuildConfig, DeploymentSpec, NetworkingConfig, ResourceLimits, Runtime};
