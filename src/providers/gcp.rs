//! GCP adapter placeholder.
//!
//! No provisioning implementation exists for GCP yet. The adapter fails
//! deterministically and immediately so jobs routed here end `failed`
//! with a clear reason instead of hanging or half-provisioning.

use async_trait::async_trait;

use crate::models::{Job, Provider};
use crate::providers::{ProgressSink, ProviderAdapter, ProvisionOutcome};

pub struct GcpAdapter;

#[async_trait]
impl ProviderAdapter for GcpAdapter {
    fn provider(&self) -> Provider {
        Provider::Gcp
    }

    async fn deploy(&self, _job: &Job, _progress: &dyn ProgressSink) -> ProvisionOutcome {
        ProvisionOutcome::unsupported(Provider::Gcp)
    }

    async fn remove(
        &self,
        _job: &Job,
        _resources: &serde_json::Value,
        _progress: &dyn ProgressSink,
    ) -> ProvisionOutcome {
        ProvisionOutcome::unsupported(Provider::Gcp)
    }
}
