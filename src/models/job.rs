//! # Job Model
//!
//! One deployment or removal attempt and its tracked lifecycle.
//!
//! ## Overview
//!
//! A `Job` is the primary orchestration unit. It is created at `pending`
//! by the submission boundary, advanced by exactly one worker through the
//! state machine, and becomes a read-only historical record once terminal.
//!
//! ## Key Invariants
//!
//! - `job_id` is globally unique and never reused.
//! - `spec` is an immutable snapshot taken at submission time; later
//!   changes to the caller's live configuration never touch it.
//! - `started_at` is set exactly once, on the pending -> in_progress
//!   transition; `completed_at` exactly once, on the terminal transition.
//! - After a terminal transition exactly one of `result_url` / `error`
//!   carries data for deploy jobs (removals complete without a URL).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::spec::DeploymentSpec;
use crate::state_machine::JobStatus;

/// Cloud provider handling a job. Selects the adapter and the dispatch
/// queue, so a stalled provider backend never starves the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Gcp, Provider::Azure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "gcp" => Ok(Self::Gcp),
            "azure" => Ok(Self::Azure),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Whether a job provisions or tears down a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Deploy,
    Remove,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deploy" => Ok(Self::Deploy),
            "remove" => Ok(Self::Remove),
            other => Err(format!("unknown job kind: {other}")),
        }
    }
}

/// A deployment job row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub target_name: String,
    pub owner_id: i64,
    pub kind: JobKind,
    pub provider: Provider,
    /// Immutable configuration snapshot taken at submission.
    pub spec: DeploymentSpec,
    pub status: JobStatus,
    /// Public URL of the deployment; set only on successful completion.
    pub result_url: Option<String>,
    /// Cloud resources recorded by the adapter; set only on success.
    pub result_resources: Option<serde_json::Value>,
    /// Failure reason; set only when the job failed.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// New job for creation. The store assigns `created_at` and starts the
/// row at `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub job_id: Uuid,
    pub target_name: String,
    pub owner_id: i64,
    pub kind: JobKind,
    pub provider: Provider,
    pub spec: DeploymentSpec,
}

impl NewJob {
    /// Build a new job with a freshly generated id.
    pub fn new(
        target_name: impl Into<String>,
        owner_id: i64,
        kind: JobKind,
        provider: Provider,
        spec: DeploymentSpec,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            target_name: target_name.into(),
            owner_id,
            kind,
            provider,
            spec,
        }
    }
}
