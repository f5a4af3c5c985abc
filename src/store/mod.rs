//! # Job Record Store
//!
//! Durable storage contract for jobs and their append-only logs, plus the
//! credential table consumed by the resolver.
//!
//! ## Overview
//!
//! The store is the single source of truth for job status and the only
//! component permitted to mutate it. `compare_and_transition` is the
//! linchpin: it atomically verifies the job still holds the expected
//! status, applies the new status plus terminal fields and timestamps, and
//! appends the transition log entry in the same logical update. A
//! concurrent actor that already moved the status observes
//! [`DeployError::Conflict`](crate::error::DeployError::Conflict) instead
//! of silently overwriting, which is what enforces at-most-one finalizer
//! per job.
//!
//! Two implementations ship: [`MemoryJobStore`] for tests and local runs,
//! and [`PgJobStore`] backed by Postgres through sqlx.

pub mod memory;
pub mod postgres;

pub use memory::{MemoryApiKeyStore, MemoryJobStore};
pub use postgres::{PgApiKeyStore, PgJobStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ApiKey, Job, LogEntry, NewJob, NewLogEntry};
use crate::state_machine::JobStatus;

/// Terminal and transition fields applied together with a status change.
///
/// Timestamps are assigned by the store itself: `started_at` on the move
/// to `in_progress`, `completed_at` on the move to a terminal state. They
/// are set exactly once and never overwritten.
#[derive(Debug, Clone, Default)]
pub struct TransitionUpdate {
    pub result_url: Option<String>,
    pub result_resources: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl TransitionUpdate {
    pub fn success(url: Option<String>, resources: Option<serde_json::Value>) -> Self {
        Self {
            result_url: url,
            result_resources: resources,
            error: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            result_url: None,
            result_resources: None,
            error: Some(reason.into()),
        }
    }
}

/// Durable table of deployment jobs and their log entries.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job at `pending`. The job id is caller-assigned and
    /// must be globally unique.
    async fn create_job(&self, new_job: NewJob) -> Result<Job>;

    /// Fetch a job by id.
    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Jobs for a target, newest first, optionally restricted to an owner.
    async fn list_by_target(
        &self,
        target_name: &str,
        owner_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Job>>;

    /// Atomically verify the job is still in `expected` and move it to
    /// `new_status`, applying `update` fields and appending
    /// `transition_log` in the same logical update.
    ///
    /// Fails with `NotFound` for an unknown job and `Conflict` when
    /// another actor already changed the status.
    async fn compare_and_transition(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        new_status: JobStatus,
        update: TransitionUpdate,
        transition_log: NewLogEntry,
    ) -> Result<Job>;

    /// Append a log entry. The store assigns a timestamp that is
    /// non-decreasing within the job.
    async fn append_log(&self, job_id: Uuid, entry: NewLogEntry) -> Result<()>;

    /// Log entries for a job, oldest first.
    async fn list_logs(&self, job_id: Uuid, limit: usize) -> Result<Vec<LogEntry>>;
}

/// Credential lookup used by the resolver.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Fetch a credential row by its opaque key value.
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKey>>;

    /// Record that the key was used. Called synchronously on each
    /// successful resolution.
    async fn touch_last_used(&self, key: &str, at: DateTime<Utc>) -> Result<()>;
}
