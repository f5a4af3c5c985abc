//! Azure adapter placeholder. See the GCP adapter for the contract.

use async_trait::async_trait;

use crate::models::{Job, Provider};
use crate::providers::{ProgressSink, ProviderAdapter, ProvisionOutcome};

pub struct AzureAdapter;

#[async_trait]
impl ProviderAdapter for AzureAdapter {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    async fn deploy(&self, _job: &Job, _progress: &dyn ProgressSink) -> ProvisionOutcome {
        ProvisionOutcome::unsupported(Provider::Azure)
    }

    async fn remove(
        &self,
        _job: &Job,
        _resources: &serde_json::Value,
        _progress: &dyn ProgressSink,
    ) -> ProvisionOutcome {
        ProvisionOutcome::unsupported(Provider::Azure)
    }
}
