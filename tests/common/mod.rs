//! Shared factories for integration tests.

#![allow(dead_code)] // not every test binary uses every helper

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use deploy_core::auth::{AuthContext, Scope};
use deploy_core::models::Job;
use deploy_core::orchestration::{
    Dispatcher, DispatcherConfig, JobOrchestrator, WorkerPoolHandle,
};
use deploy_core::providers::{AdapterRegistry, AwsAdapter, AzureAdapter, GcpAdapter};
use deploy_core::services::{DeployRequest, DeploymentService, StatusService};
use deploy_core::store::{JobStore, MemoryJobStore};

/// Requester with both read and write permissions.
pub fn auth(owner_id: i64) -> AuthContext {
    AuthContext {
        owner_id,
        scopes: vec![Scope::ReadDeployments, Scope::WriteDeployments],
    }
}

/// Requester with only the read permission.
pub fn read_only_auth(owner_id: i64) -> AuthContext {
    AuthContext {
        owner_id,
        scopes: vec![Scope::ReadDeployments],
    }
}

/// A valid aws/docker submission for the given target.
pub fn deploy_request(target_name: &str) -> DeployRequest {
    DeployRequest {
        target_name: target_name.to_string(),
        provider: "aws".to_string(),
        region: "us-west-2".to_string(),
        runtime: "docker".to_string(),
        build: None,
        env: None,
        resources: None,
        networking: None,
    }
}

/// Fully wired core against the in-memory store, with zero-delay
/// simulation so tests run fast.
pub struct Harness {
    pub store: Arc<MemoryJobStore>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub deployments: DeploymentService,
    pub statuses: StatusService,
    pub pool: WorkerPoolHandle,
}

pub fn harness() -> Harness {
    harness_with(DispatcherConfig {
        workers_per_provider: 2,
        adapter_timeout: Duration::from_secs(5),
    })
}

pub fn harness_with(config: DispatcherConfig) -> Harness {
    let store = Arc::new(MemoryJobStore::new());

    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(AwsAdapter::new(Duration::ZERO)));
    registry.register(Arc::new(GcpAdapter));
    registry.register(Arc::new(AzureAdapter));

    let dispatcher = Dispatcher::new(config);
    let orchestrator = Arc::new(JobOrchestrator::new(store.clone(), dispatcher.handle()));
    let pool = dispatcher.start(orchestrator.clone(), Arc::new(registry));

    Harness {
        store: store.clone(),
        orchestrator: orchestrator.clone(),
        deployments: DeploymentService::new(orchestrator),
        statuses: StatusService::new(store),
        pool,
    }
}

/// Orchestrator wired to a dispatcher that never starts its workers, so
/// submitted jobs stay pending for manual claim/finalize tests.
pub fn unstarted_harness() -> (Arc<MemoryJobStore>, Arc<JobOrchestrator>) {
    let store = Arc::new(MemoryJobStore::new());
    let dispatcher = Dispatcher::new(DispatcherConfig::default());
    let orchestrator = Arc::new(JobOrchestrator::new(store.clone(), dispatcher.handle()));
    // Dropping the dispatcher closes the queues; enqueue becomes a no-op.
    drop(dispatcher);
    (store, orchestrator)
}

/// Poll the store until the job reaches a terminal status.
pub async fn wait_terminal(store: &MemoryJobStore, job_id: Uuid) -> Job {
    for _ in 0..500 {
        let job = store
            .get_job(job_id)
            .await
            .expect("store read failed")
            .expect("job missing");
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached a terminal status");
}
