//! Status and log read path.
//!
//! Reads go straight to the store, independent of the write path, and
//! never cache status across calls. The human-readable message on a
//! [`JobView`] is derived at read time and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthContext, Scope};
use crate::error::{DeployError, Result};
use crate::models::{Job, JobKind, LogEntry, Provider};
use crate::state_machine::JobStatus;
use crate::store::JobStore;
use crate::validation::{validate_limit, LOG_LIMIT_RANGE, STATUS_LIMIT_RANGE};

/// Read-model of a job for external callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: Uuid,
    pub target_name: String,
    pub kind: JobKind,
    pub provider: Provider,
    pub status: JobStatus,
    /// Derived, human-readable summary of the current status.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobView {
    /// Project a job row into its read model, deriving the message at
    /// `now`.
    pub fn from_job(job: &Job, now: DateTime<Utc>) -> Self {
        Self {
            job_id: job.job_id,
            target_name: job.target_name.clone(),
            kind: job.kind,
            provider: job.provider,
            status: job.status,
            message: derive_message(job.status, job.started_at, job.error.as_deref(), now),
            url: job.result_url.clone(),
            error: job.error.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// Pure derivation of the status message. Stateless; computed on every
/// read.
pub fn derive_message(
    status: JobStatus,
    started_at: Option<DateTime<Utc>>,
    error: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    match status {
        JobStatus::Pending => "Deployment is queued and waiting to start".to_string(),
        JobStatus::InProgress => match started_at {
            Some(started) => {
                let elapsed = (now - started).num_seconds().max(0);
                format!("Deployment is in progress (running for {elapsed}s)")
            }
            None => "Deployment is in progress".to_string(),
        },
        JobStatus::Completed => "Deployment completed successfully".to_string(),
        JobStatus::Failed => {
            format!("Deployment failed: {}", error.unwrap_or("Unknown error"))
        }
    }
}

/// Read-side service for status pollers and log viewers.
pub struct StatusService {
    store: Arc<dyn JobStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Current view of one job. `Forbidden` when the requester is not
    /// the owner; ownership mismatch is never flattened into `NotFound`
    /// or an empty result.
    pub async fn get_status(&self, job_id: Uuid, requester: &AuthContext) -> Result<JobView> {
        requester.require_scope(Scope::ReadDeployments)?;
        let job = self.owned_job(job_id, requester).await?;
        Ok(JobView::from_job(&job, Utc::now()))
    }

    /// Views of the requester's jobs for a target, newest first.
    pub async fn list_statuses(
        &self,
        target_name: &str,
        requester: &AuthContext,
        limit: usize,
    ) -> Result<Vec<JobView>> {
        requester.require_scope(Scope::ReadDeployments)?;
        validate_limit("limit", limit, STATUS_LIMIT_RANGE)?;

        let jobs = self
            .store
            .list_by_target(target_name, Some(requester.owner_id), limit)
            .await?;
        let now = Utc::now();
        Ok(jobs.iter().map(|job| JobView::from_job(job, now)).collect())
    }

    /// Log entries for one job, oldest first.
    pub async fn get_logs(
        &self,
        job_id: Uuid,
        requester: &AuthContext,
        limit: usize,
    ) -> Result<Vec<LogEntry>> {
        requester.require_scope(Scope::ReadDeployments)?;
        validate_limit("limit", limit, LOG_LIMIT_RANGE)?;

        self.owned_job(job_id, requester).await?;
        self.store.list_logs(job_id, limit).await
    }

    async fn owned_job(&self, job_id: Uuid, requester: &AuthContext) -> Result<Job> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| DeployError::NotFound(format!("job {job_id} not found")))?;
        if job.owner_id != requester.owner_id {
            return Err(DeployError::Forbidden(
                "you do not have access to this job".to_string(),
            ));
        }
        Ok(job)
    }
}
