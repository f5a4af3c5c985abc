//! In-memory store implementation.
//!
//! Backs tests and local runs. Compare-and-transition relies on dashmap's
//! entry-level exclusivity: the status check and the update happen while
//! holding the job's entry, so two racing actors serialize and exactly one
//! observes the expected status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{DeployError, Result};
use crate::models::{ApiKey, Job, LogEntry, NewJob, NewLogEntry};
use crate::state_machine::JobStatus;
use crate::store::{ApiKeyStore, JobStore, TransitionUpdate};

/// In-memory job record store.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: DashMap<Uuid, Job>,
    logs: DashMap<Uuid, Mutex<Vec<LogEntry>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append under the job's log lock, clamping the timestamp so the
    /// per-job sequence never decreases even when the clock jitters.
    fn push_log(&self, job_id: Uuid, entry: NewLogEntry) {
        let slot = self.logs.entry(job_id).or_default();
        let mut entries = slot.lock();
        let now = Utc::now();
        let timestamp = match entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        entries.push(LogEntry {
            job_id,
            timestamp,
            level: entry.level,
            message: entry.message,
            data: entry.data,
        });
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, new_job: NewJob) -> Result<Job> {
        let job = Job {
            job_id: new_job.job_id,
            target_name: new_job.target_name,
            owner_id: new_job.owner_id,
            kind: new_job.kind,
            provider: new_job.provider,
            spec: new_job.spec,
            status: JobStatus::Pending,
            result_url: None,
            result_resources: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.jobs.insert(job.job_id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.get(&job_id).map(|j| j.clone()))
    }

    async fn list_by_target(
        &self,
        target_name: &str,
        owner_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|j| j.target_name == target_name)
            .filter(|j| owner_id.is_none_or(|owner| j.owner_id == owner))
            .map(|j| j.clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn compare_and_transition(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        new_status: JobStatus,
        update: TransitionUpdate,
        transition_log: NewLogEntry,
    ) -> Result<Job> {
        let updated = {
            let mut entry = self
                .jobs
                .get_mut(&job_id)
                .ok_or_else(|| DeployError::NotFound(format!("job {job_id} not found")))?;

            if entry.status != expected {
                return Err(DeployError::Conflict {
                    job_id,
                    expected: expected.to_string(),
                    actual: entry.status.to_string(),
                });
            }

            let now = Utc::now();
            entry.status = new_status;
            if new_status == JobStatus::InProgress && entry.started_at.is_none() {
                entry.started_at = Some(now);
            }
            if new_status.is_terminal() && entry.completed_at.is_none() {
                entry.completed_at = Some(now);
            }
            if update.result_url.is_some() {
                entry.result_url = update.result_url;
            }
            if update.result_resources.is_some() {
                entry.result_resources = update.result_resources;
            }
            if update.error.is_some() {
                entry.error = update.error;
            }
            entry.clone()
        };

        // Only the CAS winner reaches this append, so transition entries
        // keep their per-job order.
        self.push_log(job_id, transition_log);
        Ok(updated)
    }

    async fn append_log(&self, job_id: Uuid, entry: NewLogEntry) -> Result<()> {
        if !self.jobs.contains_key(&job_id) {
            return Err(DeployError::NotFound(format!("job {job_id} not found")));
        }
        self.push_log(job_id, entry);
        Ok(())
    }

    async fn list_logs(&self, job_id: Uuid, limit: usize) -> Result<Vec<LogEntry>> {
        let entries = match self.logs.get(&job_id) {
            Some(slot) => {
                let entries = slot.lock();
                entries.iter().take(limit).cloned().collect()
            }
            None => Vec::new(),
        };
        Ok(entries)
    }
}

/// In-memory credential store.
#[derive(Default)]
pub struct MemoryApiKeyStore {
    keys: DashMap<String, ApiKey>,
}

impl MemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential. Test and local-run helper.
    pub fn insert(&self, api_key: ApiKey) {
        self.keys.insert(api_key.key.clone(), api_key);
    }
}

#[async_trait]
impl ApiKeyStore for MemoryApiKeyStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKey>> {
        Ok(self.keys.get(key).map(|k| k.clone()))
    }

    async fn touch_last_used(&self, key: &str, at: DateTime<Utc>) -> Result<()> {
        if let Some(mut entry) = self.keys.get_mut(key) {
            entry.last_used_at = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeploymentSpec, JobKind, LogLevel, Provider};

    fn new_job(target: &str, owner: i64) -> NewJob {
        NewJob::new(
            target,
            owner,
            JobKind::Deploy,
            Provider::Aws,
            DeploymentSpec::default(),
        )
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = MemoryJobStore::new();
        let job = store.create_job(new_job("demo", 1)).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());

        let fetched = store.get_job(job.job_id).await.unwrap().unwrap();
        assert_eq!(fetched, job);
    }

    #[tokio::test]
    async fn transition_sets_timestamps_once() {
        let store = MemoryJobStore::new();
        let job = store.create_job(new_job("demo", 1)).await.unwrap();

        let claimed = store
            .compare_and_transition(
                job.job_id,
                JobStatus::Pending,
                JobStatus::InProgress,
                TransitionUpdate::default(),
                NewLogEntry::info("claimed"),
            )
            .await
            .unwrap();
        assert!(claimed.started_at.is_some());
        assert!(claimed.completed_at.is_none());

        let done = store
            .compare_and_transition(
                job.job_id,
                JobStatus::InProgress,
                JobStatus::Completed,
                TransitionUpdate::success(Some("https://demo".into()), None),
                NewLogEntry::info("done"),
            )
            .await
            .unwrap();
        assert_eq!(done.started_at, claimed.started_at);
        assert!(done.completed_at.is_some());
        assert_eq!(done.result_url.as_deref(), Some("https://demo"));
    }

    #[tokio::test]
    async fn stale_expected_status_conflicts() {
        let store = MemoryJobStore::new();
        let job = store.create_job(new_job("demo", 1)).await.unwrap();

        store
            .compare_and_transition(
                job.job_id,
                JobStatus::Pending,
                JobStatus::InProgress,
                TransitionUpdate::default(),
                NewLogEntry::info("claimed"),
            )
            .await
            .unwrap();

        let err = store
            .compare_and_transition(
                job.job_id,
                JobStatus::Pending,
                JobStatus::InProgress,
                TransitionUpdate::default(),
                NewLogEntry::info("claimed again"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Conflict { .. }));
    }

    #[tokio::test]
    async fn list_by_target_newest_first_and_owner_filtered() {
        let store = MemoryJobStore::new();
        let first = store.create_job(new_job("demo", 1)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = store.create_job(new_job("demo", 1)).await.unwrap();
        store.create_job(new_job("demo", 2)).await.unwrap();
        store.create_job(new_job("other", 1)).await.unwrap();

        let jobs = store.list_by_target("demo", Some(1), 10).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_id, second.job_id);
        assert_eq!(jobs[1].job_id, first.job_id);
    }

    #[tokio::test]
    async fn logs_are_oldest_first_and_limited() {
        let store = MemoryJobStore::new();
        let job = store.create_job(new_job("demo", 1)).await.unwrap();
        for i in 0..5 {
            store
                .append_log(job.job_id, NewLogEntry::info(format!("entry {i}")))
                .await
                .unwrap();
        }

        let logs = store.list_logs(job.job_id, 2).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "entry 0");
        assert_eq!(logs[1].message, "entry 1");
        assert_eq!(logs[0].level, LogLevel::Info);
        assert!(logs[0].timestamp <= logs[1].timestamp);
    }

    #[tokio::test]
    async fn append_log_for_unknown_job_is_not_found() {
        let store = MemoryJobStore::new();
        let err = store
            .append_log(Uuid::new_v4(), NewLogEntry::info("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::NotFound(_)));
    }
}
