//! Read-path tests: status views, log retrieval, ownership and scope
//! enforcement, plus end-to-end credential resolution.

mod common;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use deploy_core::auth::{ApiKeyResolver, CredentialResolver};
use deploy_core::error::DeployError;
use deploy_core::models::{ApiKey, LogLevel, NewLogEntry};
use deploy_core::state_machine::JobStatus;
use deploy_core::store::{JobStore, MemoryApiKeyStore};
use std::sync::Arc;

#[tokio::test]
async fn status_reflects_terminal_outcome() -> Result<()> {
    let harness = harness();
    let auth = auth(1);

    let ack = harness
        .deployments
        .submit_deployment(deploy_request("demo"), &auth)
        .await?;
    wait_terminal(&harness.store, ack.job_id).await;

    let view = harness.statuses.get_status(ack.job_id, &auth).await?;
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.message, "Deployment completed successfully");
    assert!(view.url.is_some());
    assert!(view.error.is_none());

    harness.pool.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn pending_status_message_is_derived_not_stored() -> Result<()> {
    let (store, orchestrator) = unstarted_harness();
    let service = deploy_core::services::DeploymentService::new(orchestrator);
    let statuses = deploy_core::services::StatusService::new(store);
    let auth = auth(1);

    let ack = service
        .submit_deployment(deploy_request("demo"), &auth)
        .await?;
    let view = statuses.get_status(ack.job_id, &auth).await?;
    assert_eq!(view.status, JobStatus::Pending);
    assert_eq!(view.message, "Deployment is queued and waiting to start");
    Ok(())
}

#[tokio::test]
async fn other_owners_jobs_are_forbidden_not_hidden() -> Result<()> {
    let harness = harness();

    let ack = harness
        .deployments
        .submit_deployment(deploy_request("demo"), &auth(1))
        .await?;
    wait_terminal(&harness.store, ack.job_id).await;

    let err = harness
        .statuses
        .get_status(ack.job_id, &auth(2))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Forbidden(_)));

    let err = harness
        .statuses
        .get_logs(ack.job_id, &auth(2), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Forbidden(_)));

    harness.pool.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let harness = harness();
    let err = harness
        .statuses
        .get_status(uuid::Uuid::new_v4(), &auth(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NotFound(_)));
    harness.pool.shutdown().await;
}

#[tokio::test]
async fn list_statuses_is_newest_first_and_owner_scoped() -> Result<()> {
    let harness = harness();
    let auth1 = auth(1);

    let first = harness
        .deployments
        .submit_deployment(deploy_request("demo"), &auth1)
        .await?;
    wait_terminal(&harness.store, first.job_id).await;
    let second = harness
        .deployments
        .submit_deployment(deploy_request("demo"), &auth1)
        .await?;
    wait_terminal(&harness.store, second.job_id).await;
    harness
        .deployments
        .submit_deployment(deploy_request("demo"), &auth(2))
        .await?;

    let views = harness.statuses.list_statuses("demo", &auth1, 10).await?;
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].job_id, second.job_id);
    assert_eq!(views[1].job_id, first.job_id);

    harness.pool.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn log_limit_returns_oldest_entries() -> Result<()> {
    let (store, orchestrator) = unstarted_harness();
    let statuses = deploy_core::services::StatusService::new(store.clone());
    let auth = auth(1);

    let job = orchestrator
        .submit(deploy_core::orchestration::SubmitRequest::Deploy {
            target_name: "demo".to_string(),
            owner_id: 1,
            provider: deploy_core::models::Provider::Aws,
            spec: Default::default(),
        })
        .await?;
    for i in 0..4 {
        store
            .append_log(job.job_id, NewLogEntry::info(format!("entry {i}")))
            .await?;
    }

    let logs = statuses.get_logs(job.job_id, &auth, 2).await?;
    assert_eq!(logs.len(), 2);
    // Submission wrote the creation entry first.
    assert_eq!(logs[0].message, "Deployment job created for demo");
    assert_eq!(logs[1].message, "entry 0");
    assert_eq!(logs[0].level, LogLevel::Info);
    Ok(())
}

#[tokio::test]
async fn limits_are_bounded() {
    let harness = harness();
    let auth = auth(1);

    let err = harness
        .statuses
        .list_statuses("demo", &auth, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Validation(_)));

    let err = harness
        .statuses
        .list_statuses("demo", &auth, 101)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Validation(_)));

    let err = harness
        .statuses
        .get_logs(uuid::Uuid::new_v4(), &auth, 1001)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Validation(_)));

    harness.pool.shutdown().await;
}

#[tokio::test]
async fn read_scope_is_required() {
    let harness = harness();
    let no_scopes = deploy_core::auth::AuthContext {
        owner_id: 1,
        scopes: vec![],
    };

    let err = harness
        .statuses
        .get_status(uuid::Uuid::new_v4(), &no_scopes)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Forbidden(_)));
    harness.pool.shutdown().await;
}

#[tokio::test]
async fn resolved_credential_drives_the_full_request_path() -> Result<()> {
    let harness = harness();
    let keys = Arc::new(MemoryApiKeyStore::new());
    let issued = ApiKey::issue("ci deploy key", 7);
    let key_value = issued.key.clone();
    keys.insert(issued);

    let resolver = ApiKeyResolver::new(keys);
    let auth = resolver.resolve(Some(&key_value)).await?;
    assert_eq!(auth.owner_id, 7);

    let ack = harness
        .deployments
        .submit_deployment(deploy_request("demo"), &auth)
        .await?;
    let job = wait_terminal(&harness.store, ack.job_id).await;
    assert_eq!(job.owner_id, 7);

    harness.pool.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn revoked_and_expired_keys_are_unauthorized() {
    let keys = Arc::new(MemoryApiKeyStore::new());

    let mut revoked = ApiKey::issue("revoked", 1);
    revoked.is_revoked = true;
    revoked.revoked_at = Some(Utc::now());
    let revoked_value = revoked.key.clone();
    keys.insert(revoked);

    let mut expired = ApiKey::issue("expired", 1);
    expired.expires_at = Some(Utc::now() - ChronoDuration::hours(1));
    let expired_value = expired.key.clone();
    keys.insert(expired);

    let resolver = ApiKeyResolver::new(keys);
    assert!(matches!(
        resolver.resolve(Some(&revoked_value)).await.unwrap_err(),
        DeployError::Unauthorized(_)
    ));
    assert!(matches!(
        resolver.resolve(Some(&expired_value)).await.unwrap_err(),
        DeployError::Unauthorized(_)
    ));
    assert!(matches!(
        resolver.resolve(Some("no-such-key")).await.unwrap_err(),
        DeployError::Unauthorized(_)
    ));
    assert!(matches!(
        resolver.resolve(None).await.unwrap_err(),
        DeployError::Unauthorized(_)
    ));
}
