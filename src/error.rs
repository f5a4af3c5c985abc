//! # Error Types
//!
//! Structured error handling for the orchestration core using thiserror
//! instead of `Box<dyn Error>` patterns.
//!
//! The taxonomy separates boundary rejections (validation, auth) from
//! lifecycle conflicts (claim/finalize races) and internal invariant
//! violations. Boundary errors never reach the orchestrator; conflict
//! errors are surfaced to the caller that lost the race and never retried
//! automatically.

use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the deployment orchestration core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeployError {
    /// Malformed request rejected at the boundary.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credential missing, unknown, revoked, or expired (401-equivalent).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Credential valid but lacking the required permission, or the
    /// requester does not own the resource (403-equivalent).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unknown job id or target (404-equivalent).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lost a compare-and-transition race. Retryable by the caller that
    /// triggered it, never retried internally.
    #[error("Conflict on job {job_id}: expected status {expected}, found {actual}")]
    Conflict {
        job_id: Uuid,
        expected: String,
        actual: String,
    },

    /// Another worker already moved this job out of pending.
    #[error("Job {0} already claimed by another worker")]
    AlreadyClaimed(Uuid),

    /// Illegal state machine transition. An internal invariant violation,
    /// raised loudly rather than handled gracefully.
    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: Uuid,
        from: String,
        to: String,
    },

    /// Adapter-reported provisioning failure. Terminal for the job;
    /// surfaced via the job's error field, not thrown to the submitter.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Storage-layer failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration failure at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DeployError {
    /// True when retrying the same call could succeed (lost CAS races).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::AlreadyClaimed(_))
    }
}

impl From<sqlx::Error> for DeployError {
    fn from(err: sqlx::Error) -> Self {
        DeployError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
