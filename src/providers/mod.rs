//! # Provider Adapters
//!
//! Polymorphic capability performing (or simulating) provisioning and
//! teardown for one cloud provider each. Adapters are selected from a
//! lookup table keyed by [`Provider`], so adding a provider touches
//! neither the orchestrator nor the dispatcher.
//!
//! Outcomes are opaque to the orchestrator: it records what the adapter
//! reports and never inspects provider-specific resource shapes. An
//! adapter for an unimplemented provider must fail deterministically and
//! immediately, without blocking or partially mutating anything.

pub mod aws;
pub mod azure;
pub mod gcp;

pub use aws::AwsAdapter;
pub use azure::AzureAdapter;
pub use gcp::GcpAdapter;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Job, LogLevel, Provider};

/// Structured result of a provisioning or teardown attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionOutcome {
    Success {
        /// Public URL; present for deployments, absent for teardowns.
        url: Option<String>,
        /// Provider-specific resource map, recorded verbatim on the job.
        resources: Option<serde_json::Value>,
    },
    Failure {
        reason: String,
    },
}

impl ProvisionOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Deterministic failure for providers without an implementation.
    pub fn unsupported(provider: Provider) -> Self {
        Self::failure(format!("{provider} not supported"))
    }
}

/// Capability adapters use to stream progress entries into the job's
/// audit log while it is in progress.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn log(&self, level: LogLevel, message: &str, data: Option<serde_json::Value>);

    async fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None).await;
    }
}

/// No-op sink for tests and dry runs.
pub struct NullProgressSink;

#[async_trait]
impl ProgressSink for NullProgressSink {
    async fn log(&self, _level: LogLevel, _message: &str, _data: Option<serde_json::Value>) {}
}

/// One cloud provider's provisioning capability.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider tag this adapter serves.
    fn provider(&self) -> Provider;

    /// Provision the job's target from its spec snapshot.
    async fn deploy(&self, job: &Job, progress: &dyn ProgressSink) -> ProvisionOutcome;

    /// Tear down previously recorded resources.
    async fn remove(
        &self,
        job: &Job,
        resources: &serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> ProvisionOutcome;
}

/// Lookup table from provider tag to adapter.
pub struct AdapterRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with the built-in adapter set: simulated aws, unsupported
    /// gcp and azure.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AwsAdapter::default()));
        registry.register(Arc::new(GcpAdapter));
        registry.register(Arc::new(AzureAdapter));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn adapter_for(&self, provider: Provider) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
