//! # Dispatcher / Worker Pool
//!
//! ## Overview
//!
//! Decouples job submission from execution. Each provider gets its own
//! queue and a fixed pool of workers, so a stalled AWS backend never
//! starves GCP or Azure work. A worker processes one job at a time to
//! completion; jobs never migrate between workers mid-flight.
//!
//! ## Failure Semantics
//!
//! Every path out of a claimed job reaches finalize: adapter failures,
//! timeouts, and even panics inside an adapter are converted into a
//! `Failure` outcome. A failed job is terminal; resubmission is the
//! caller's explicit decision, never an automatic retry.

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DeployError;
use crate::models::{Job, JobKind, LogLevel, Provider};
use crate::orchestration::orchestrator::JobOrchestrator;
use crate::providers::{AdapterRegistry, ProgressSink, ProvisionOutcome};

/// Worker pool sizing and execution bounds.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Concurrent workers per provider queue.
    pub workers_per_provider: usize,
    /// Upper bound on one adapter invocation. Exceeding it finalizes the
    /// job as `Failure{reason: "timeout"}` instead of holding it in
    /// `in_progress` indefinitely.
    pub adapter_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers_per_provider: 2,
            adapter_timeout: Duration::from_secs(300),
        }
    }
}

enum QueueMessage {
    Job(Uuid),
    Shutdown,
}

/// Cloneable enqueue side of the per-provider queues.
#[derive(Clone)]
pub struct DispatcherHandle {
    senders: HashMap<Provider, mpsc::UnboundedSender<QueueMessage>>,
}

impl DispatcherHandle {
    /// Non-blocking hand-off of a job to its provider queue. If the pool
    /// is gone the job stays `pending`; a restarted dispatcher can pick
    /// it up, so this only warns.
    pub fn enqueue(&self, provider: Provider, job_id: Uuid) {
        match self.senders.get(&provider) {
            Some(sender) => {
                if sender.send(QueueMessage::Job(job_id)).is_err() {
                    warn!(%job_id, %provider, "dispatcher queue closed; job left pending");
                }
            }
            None => warn!(%job_id, %provider, "no queue for provider; job left pending"),
        }
    }
}

/// Per-provider queues plus the receivers the worker pool will consume.
pub struct Dispatcher {
    config: DispatcherConfig,
    handle: DispatcherHandle,
    receivers: HashMap<Provider, mpsc::UnboundedReceiver<QueueMessage>>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for provider in Provider::ALL {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(provider, tx);
            receivers.insert(provider, rx);
        }
        Self {
            config,
            handle: DispatcherHandle { senders },
            receivers,
        }
    }

    /// The enqueue handle, available before the workers start so the
    /// orchestrator can be constructed first.
    pub fn handle(&self) -> DispatcherHandle {
        self.handle.clone()
    }

    /// Spawn the worker pools and consume the receivers.
    pub fn start(
        self,
        orchestrator: Arc<JobOrchestrator>,
        registry: Arc<AdapterRegistry>,
    ) -> WorkerPoolHandle {
        let mut handles = Vec::new();
        for (provider, receiver) in self.receivers {
            let receiver = Arc::new(Mutex::new(receiver));
            for worker_index in 0..self.config.workers_per_provider {
                let worker = Worker {
                    provider,
                    worker_index,
                    orchestrator: orchestrator.clone(),
                    registry: registry.clone(),
                    adapter_timeout: self.config.adapter_timeout,
                };
                let receiver = receiver.clone();
                handles.push(tokio::spawn(worker.run(receiver)));
            }
        }
        info!(
            workers_per_provider = self.config.workers_per_provider,
            "dispatcher worker pools started"
        );
        WorkerPoolHandle {
            handle: self.handle,
            workers_per_provider: self.config.workers_per_provider,
            handles,
        }
    }
}

/// Running worker pool; shuts the workers down cleanly when asked.
pub struct WorkerPoolHandle {
    handle: DispatcherHandle,
    workers_per_provider: usize,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPoolHandle {
    /// Ask every worker to stop after its current job and wait for them.
    pub async fn shutdown(self) {
        for sender in self.handle.senders.values() {
            for _ in 0..self.workers_per_provider {
                let _ = sender.send(QueueMessage::Shutdown);
            }
        }
        join_all(self.handles).await;
        info!("dispatcher worker pools stopped");
    }
}

/// One worker: dequeues, claims, invokes the adapter, finalizes.
struct Worker {
    provider: Provider,
    worker_index: usize,
    orchestrator: Arc<JobOrchestrator>,
    registry: Arc<AdapterRegistry>,
    adapter_timeout: Duration,
}

impl Worker {
    async fn run(self, receiver: Arc<Mutex<mpsc::UnboundedReceiver<QueueMessage>>>) {
        debug!(provider = %self.provider, worker = self.worker_index, "worker started");
        loop {
            let message = {
                let mut rx = receiver.lock().await;
                rx.recv().await
            };
            match message {
                Some(QueueMessage::Job(job_id)) => self.process(job_id).await,
                Some(QueueMessage::Shutdown) | None => break,
            }
        }
        debug!(provider = %self.provider, worker = self.worker_index, "worker stopped");
    }

    async fn process(&self, job_id: Uuid) {
        let job = match self.orchestrator.claim(job_id).await {
            Ok(job) => job,
            Err(DeployError::AlreadyClaimed(_)) => {
                debug!(%job_id, "job already claimed elsewhere; skipping");
                return;
            }
            Err(err) => {
                error!(%job_id, error = %err, "claim failed");
                return;
            }
        };

        let outcome = self.execute(&job).await;
        if let Err(err) = self.orchestrator.finalize(job_id, outcome).await {
            // Conflict means another actor finalized first; anything else
            // is a storage fault worth alerting on.
            if !err.is_retryable() {
                error!(%job_id, error = %err, "finalize failed");
            }
        }
    }

    /// Run the adapter under a time bound, converting every failure mode
    /// into an outcome so finalize is always reached.
    async fn execute(&self, job: &Job) -> ProvisionOutcome {
        let adapter = match self.registry.adapter_for(job.provider) {
            Some(adapter) => adapter,
            None => return ProvisionOutcome::unsupported(job.provider),
        };

        let progress = OrchestratorProgress {
            orchestrator: self.orchestrator.clone(),
            job_id: job.job_id,
        };

        let invocation = async {
            match job.kind {
                JobKind::Deploy => adapter.deploy(job, &progress).await,
                JobKind::Remove => {
                    let resources = match self.orchestrator.teardown_resources(job).await {
                        Ok(resources) => resources,
                        Err(err) => return ProvisionOutcome::failure(err.to_string()),
                    };
                    adapter.remove(job, &resources, &progress).await
                }
            }
        };

        let bounded = tokio::time::timeout(
            self.adapter_timeout,
            AssertUnwindSafe(invocation).catch_unwind(),
        );
        match bounded.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_panic)) => {
                error!(job_id = %job.job_id, "adapter panicked during provisioning");
                ProvisionOutcome::failure("provisioning panicked")
            }
            Err(_elapsed) => {
                warn!(
                    job_id = %job.job_id,
                    timeout_secs = self.adapter_timeout.as_secs(),
                    "adapter exceeded its time bound"
                );
                ProvisionOutcome::failure("timeout")
            }
        }
    }
}

/// Streams adapter progress into the job's audit log. Append failures are
/// logged and swallowed; losing one progress line must not fail the job.
struct OrchestratorProgress {
    orchestrator: Arc<JobOrchestrator>,
    job_id: Uuid,
}

#[async_trait]
impl ProgressSink for OrchestratorProgress {
    async fn log(&self, level: LogLevel, message: &str, data: Option<serde_json::Value>) {
        if let Err(err) = self
            .orchestrator
            .append_progress(self.job_id, level, message, data)
            .await
        {
            warn!(job_id = %self.job_id, error = %err, "progress append failed");
        }
    }
}
