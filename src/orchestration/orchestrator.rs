//! # Job Orchestrator
//!
//! ## Overview
//!
//! The orchestrator is the state machine around deployment jobs. It
//! creates jobs at `pending`, lets exactly one worker move each to
//! `in_progress` via an atomic claim, records the terminal outcome, and
//! appends the audit entries that accompany every transition.
//!
//! ## Concurrency
//!
//! Claim and finalize are single compare-and-transition calls against the
//! store; a lost race surfaces as `AlreadyClaimed` or `Conflict` and is
//! never retried here. Submission returns as soon as the durable write and
//! enqueue are done; it never blocks on provisioning.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{DeployError, Result};
use crate::models::{DeploymentSpec, Job, JobKind, LogLevel, NewJob, NewLogEntry, Provider};
use crate::orchestration::dispatcher::DispatcherHandle;
use crate::providers::ProvisionOutcome;
use crate::state_machine::{determine_target_state, JobEvent, JobStatus};
use crate::store::{JobStore, TransitionUpdate};

/// How far back to look for a prior deployment when validating removals.
const REMOVAL_LOOKBACK: usize = 100;

/// A validated submission, handed in by the deployment service boundary.
///
/// Removals carry no provider or spec of their own: they snapshot both
/// from the target's most recent completed deployment.
#[derive(Debug, Clone)]
pub enum SubmitRequest {
    Deploy {
        target_name: String,
        owner_id: i64,
        provider: Provider,
        spec: DeploymentSpec,
    },
    Remove {
        target_name: String,
        owner_id: i64,
    },
}

impl SubmitRequest {
    pub fn target_name(&self) -> &str {
        match self {
            Self::Deploy { target_name, .. } | Self::Remove { target_name, .. } => target_name,
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            Self::Deploy { .. } => JobKind::Deploy,
            Self::Remove { .. } => JobKind::Remove,
        }
    }
}

/// The deployment job state machine.
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    queue: DispatcherHandle,
}

impl JobOrchestrator {
    pub fn new(store: Arc<dyn JobStore>, queue: DispatcherHandle) -> Self {
        Self { store, queue }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Create a job at `pending`, write its first log entry, and hand it
    /// to the dispatcher. Returns immediately.
    ///
    /// Removal submissions require at least one prior completed
    /// deployment for the target under the same owner; otherwise this is
    /// `NotFound` and no row is created.
    #[instrument(skip(self, request), fields(target = %request.target_name(), kind = %request.kind()))]
    pub async fn submit(&self, request: SubmitRequest) -> Result<Job> {
        let new_job = match request {
            SubmitRequest::Deploy {
                target_name,
                owner_id,
                provider,
                spec,
            } => NewJob::new(
                target_name,
                owner_id,
                JobKind::Deploy,
                provider,
                spec.normalized(),
            ),
            SubmitRequest::Remove {
                target_name,
                owner_id,
            } => {
                let prior = self
                    .latest_completed_deploy(&target_name, owner_id)
                    .await?
                    .ok_or_else(|| {
                        DeployError::NotFound(format!("no deployment found for {target_name}"))
                    })?;
                NewJob::new(
                    target_name,
                    owner_id,
                    JobKind::Remove,
                    prior.provider,
                    prior.spec,
                )
            }
        };
        let job = self.store.create_job(new_job).await?;

        self.store
            .append_log(
                job.job_id,
                NewLogEntry::info(format!(
                    "{} job created for {}",
                    capitalized(job.kind),
                    job.target_name
                ))
                .with_data(serde_json::json!({
                    "kind": job.kind,
                    "provider": job.provider,
                })),
            )
            .await?;

        info!(job_id = %job.job_id, provider = %job.provider, "job submitted");
        self.queue.enqueue(job.provider, job.job_id);
        Ok(job)
    }

    /// Take exclusive responsibility for a pending job. Exactly one
    /// concurrent caller wins; the rest observe `AlreadyClaimed`.
    #[instrument(skip(self))]
    pub async fn claim(&self, job_id: Uuid) -> Result<Job> {
        let target = determine_target_state(job_id, JobStatus::Pending, &JobEvent::Start)?;
        let result = self
            .store
            .compare_and_transition(
                job_id,
                JobStatus::Pending,
                target,
                TransitionUpdate::default(),
                NewLogEntry::info("Job claimed; provisioning started"),
            )
            .await;

        match result {
            Ok(job) => {
                debug!(job_id = %job_id, "job claimed");
                Ok(job)
            }
            Err(DeployError::Conflict { .. }) => Err(DeployError::AlreadyClaimed(job_id)),
            Err(err) => Err(err),
        }
    }

    /// Record a job's terminal outcome. A second finalize observes
    /// `Conflict`, which is logged and surfaced but never retried.
    #[instrument(skip(self, outcome))]
    pub async fn finalize(&self, job_id: Uuid, outcome: ProvisionOutcome) -> Result<Job> {
        let (event, update, log) = match outcome {
            ProvisionOutcome::Success { url, resources } => {
                let message = match &url {
                    Some(url) => format!("Deployment completed: {url}"),
                    None => "Job completed successfully".to_string(),
                };
                (
                    JobEvent::Complete,
                    TransitionUpdate::success(url, resources),
                    NewLogEntry::info(message),
                )
            }
            ProvisionOutcome::Failure { reason } => (
                JobEvent::Fail(reason.clone()),
                TransitionUpdate::failure(reason.clone()),
                NewLogEntry::error(format!("Job failed: {reason}")),
            ),
        };
        let new_status = determine_target_state(job_id, JobStatus::InProgress, &event)?;

        let result = self
            .store
            .compare_and_transition(job_id, JobStatus::InProgress, new_status, update, log)
            .await;

        match &result {
            Ok(job) => {
                info!(job_id = %job_id, status = %job.status, "job finalized");
            }
            Err(DeployError::Conflict { actual, .. }) => {
                warn!(
                    job_id = %job_id,
                    actual_status = %actual,
                    "finalize lost the race; another actor already finalized"
                );
            }
            Err(err) => warn!(job_id = %job_id, error = %err, "finalize failed"),
        }
        result
    }

    /// Stream a progress entry while the job is in progress. No status
    /// change implied.
    pub async fn append_progress(
        &self,
        job_id: Uuid,
        level: LogLevel,
        message: &str,
        data: Option<serde_json::Value>,
    ) -> Result<()> {
        let entry = NewLogEntry {
            level,
            message: message.to_string(),
            data,
        };
        self.store.append_log(job_id, entry).await
    }

    /// Resources recorded by the most recent completed deployment of a
    /// removal job's target. The snapshot is whatever was stored at
    /// deploy time; out-of-band infrastructure drift is not reconciled.
    pub async fn teardown_resources(&self, job: &Job) -> Result<serde_json::Value> {
        let deploy = self
            .latest_completed_deploy(&job.target_name, job.owner_id)
            .await?
            .ok_or_else(|| {
                DeployError::NotFound(format!(
                    "no deployment resources found for {}",
                    job.target_name
                ))
            })?;
        Ok(deploy
            .result_resources
            .unwrap_or_else(|| serde_json::json!({})))
    }

    async fn latest_completed_deploy(&self, target: &str, owner_id: i64) -> Result<Option<Job>> {
        let jobs = self
            .store
            .list_by_target(target, Some(owner_id), REMOVAL_LOOKBACK)
            .await?;
        Ok(jobs
            .into_iter()
            .find(|j| j.kind == JobKind::Deploy && j.status == JobStatus::Completed))
    }
}

fn capitalized(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Deploy => "Deployment",
        JobKind::Remove => "Removal",
    }
}
