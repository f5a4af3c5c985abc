//! Postgres-backed store implementation.
//!
//! Uses runtime-checked sqlx queries so the crate builds without a live
//! database. Compare-and-transition takes a row lock (`FOR UPDATE`) inside
//! a transaction, verifies the expected status, applies the update, and
//! inserts the transition log entry before committing, so the status
//! change and its audit record land together or not at all.
//!
//! Schema DDL lives under `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

use crate::error::{DeployError, Result};
use crate::models::{ApiKey, Job, LogEntry, NewJob, NewLogEntry};
use crate::state_machine::JobStatus;
use crate::store::{ApiKeyStore, JobStore, TransitionUpdate};

const JOB_COLUMNS: &str = "job_id, target_name, owner_id, kind, provider, spec, status, \
     result_url, result_resources, error, created_at, started_at, completed_at";

/// Postgres job record store.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw row shape; converted into the typed [`Job`].
#[derive(FromRow)]
struct JobRow {
    job_id: Uuid,
    target_name: String,
    owner_id: i64,
    kind: String,
    provider: String,
    spec: serde_json::Value,
    status: String,
    result_url: Option<String>,
    result_resources: Option<serde_json::Value>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = DeployError;

    fn try_from(row: JobRow) -> Result<Job> {
        let corrupt = |what: &str, detail: String| {
            error!(job_id = %row.job_id, what, detail, "corrupt job row");
            DeployError::Database(format!("corrupt job row {}: {what}: {detail}", row.job_id))
        };
        Ok(Job {
            job_id: row.job_id,
            target_name: row.target_name.clone(),
            owner_id: row.owner_id,
            kind: row.kind.parse().map_err(|e: String| corrupt("kind", e))?,
            provider: row
                .provider
                .parse()
                .map_err(|e: String| corrupt("provider", e))?,
            spec: serde_json::from_value(row.spec.clone())
                .map_err(|e| corrupt("spec", e.to_string()))?,
            status: row
                .status
                .parse()
                .map_err(|e: String| corrupt("status", e))?,
            result_url: row.result_url,
            result_resources: row.result_resources,
            error: row.error,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(FromRow)]
struct LogRow {
    job_id: Uuid,
    timestamp: DateTime<Utc>,
    level: String,
    message: String,
    data: Option<serde_json::Value>,
}

impl TryFrom<LogRow> for LogEntry {
    type Error = DeployError;

    fn try_from(row: LogRow) -> Result<LogEntry> {
        Ok(LogEntry {
            job_id: row.job_id,
            timestamp: row.timestamp,
            level: row
                .level
                .parse()
                .map_err(|e: String| DeployError::Database(format!("corrupt log row: {e}")))?,
            message: row.message,
            data: row.data,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, new_job: NewJob) -> Result<Job> {
        let spec = serde_json::to_value(&new_job.spec)
            .map_err(|e| DeployError::Database(format!("spec serialization failed: {e}")))?;

        let sql = format!(
            "INSERT INTO deploy_jobs \
             (job_id, target_name, owner_id, kind, provider, spec, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', NOW()) \
             RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(new_job.job_id)
            .bind(&new_job.target_name)
            .bind(new_job.owner_id)
            .bind(new_job.kind.as_str())
            .bind(new_job.provider.as_str())
            .bind(spec)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM deploy_jobs WHERE job_id = $1");
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Job::try_from).transpose()
    }

    async fn list_by_target(
        &self,
        target_name: &str,
        owner_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Job>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM deploy_jobs \
             WHERE target_name = $1 AND ($2::BIGINT IS NULL OR owner_id = $2) \
             ORDER BY created_at DESC LIMIT $3"
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(target_name)
            .bind(owner_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn compare_and_transition(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        new_status: JobStatus,
        update: TransitionUpdate,
        transition_log: NewLogEntry,
    ) -> Result<Job> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM deploy_jobs WHERE job_id = $1 FOR UPDATE")
                .bind(job_id)
                .fetch_optional(&mut *tx)
                .await?;

        let current = match current {
            Some((status,)) => status,
            None => return Err(DeployError::NotFound(format!("job {job_id} not found"))),
        };
        if current != expected.as_str() {
            return Err(DeployError::Conflict {
                job_id,
                expected: expected.to_string(),
                actual: current,
            });
        }

        let sql = format!(
            "UPDATE deploy_jobs SET \
               status = $2, \
               started_at = CASE WHEN $2 = 'in_progress' \
                   THEN COALESCE(started_at, NOW()) ELSE started_at END, \
               completed_at = CASE WHEN $2 IN ('completed', 'failed') \
                   THEN COALESCE(completed_at, NOW()) ELSE completed_at END, \
               result_url = COALESCE($3, result_url), \
               result_resources = COALESCE($4, result_resources), \
               error = COALESCE($5, error) \
             WHERE job_id = $1 \
             RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(job_id)
            .bind(new_status.as_str())
            .bind(update.result_url)
            .bind(update.result_resources)
            .bind(update.error)
            .fetch_one(&mut *tx)
            .await?;

        // Same logical update as the status change: the transition entry
        // commits with it or not at all.
        sqlx::query(
            "INSERT INTO deploy_job_logs (job_id, timestamp, level, message, data) \
             SELECT $1, GREATEST(NOW(), COALESCE(MAX(timestamp), NOW())), $2, $3, $4 \
             FROM deploy_job_logs WHERE job_id = $1",
        )
        .bind(job_id)
        .bind(transition_log.level.as_str())
        .bind(&transition_log.message)
        .bind(transition_log.data)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn append_log(&self, job_id: Uuid, entry: NewLogEntry) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO deploy_job_logs (job_id, timestamp, level, message, data) \
             SELECT job_id, NOW(), $2, $3, $4 FROM deploy_jobs WHERE job_id = $1",
        )
        .bind(job_id)
        .bind(entry.level.as_str())
        .bind(&entry.message)
        .bind(entry.data)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DeployError::NotFound(format!("job {job_id} not found")));
        }
        Ok(())
    }

    async fn list_logs(&self, job_id: Uuid, limit: usize) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query_as::<_, LogRow>(
            "SELECT job_id, timestamp, level, message, data FROM deploy_job_logs \
             WHERE job_id = $1 ORDER BY timestamp ASC, id ASC LIMIT $2",
        )
        .bind(job_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LogEntry::try_from).collect()
    }
}

/// Postgres credential store.
#[derive(Clone)]
pub struct PgApiKeyStore {
    pool: PgPool,
}

impl PgApiKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ApiKeyRow {
    key: String,
    name: String,
    owner_id: i64,
    is_revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    scopes: String,
    created_at: DateTime<Utc>,
}

impl From<ApiKeyRow> for ApiKey {
    fn from(row: ApiKeyRow) -> Self {
        ApiKey {
            key: row.key,
            name: row.name,
            owner_id: row.owner_id,
            is_revoked: row.is_revoked,
            revoked_at: row.revoked_at,
            expires_at: row.expires_at,
            last_used_at: row.last_used_at,
            scopes: row.scopes,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ApiKeyStore for PgApiKeyStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKey>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT key, name, owner_id, is_revoked, revoked_at, expires_at, \
                    last_used_at, scopes, created_at \
             FROM deploy_api_keys WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ApiKey::from))
    }

    async fn touch_last_used(&self, key: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE deploy_api_keys SET last_used_at = $2 WHERE key = $1")
            .bind(key)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
