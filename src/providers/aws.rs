//! Simulated AWS adapter.
//!
//! Walks the build -> push -> deploy phases of a container deployment
//! with short pauses standing in for real provisioning work, then reports
//! a deterministic URL and resource map. Teardown is simulated the same
//! way. Real SDK calls are out of scope; this adapter exists so the
//! orchestration lifecycle is exercised end to end.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::models::{Job, Provider};
use crate::providers::{ProgressSink, ProviderAdapter, ProvisionOutcome};

/// Simulated AWS provisioning.
pub struct AwsAdapter {
    /// Pause per simulated phase.
    phase_delay: Duration,
}

impl AwsAdapter {
    pub fn new(phase_delay: Duration) -> Self {
        Self { phase_delay }
    }
}

impl Default for AwsAdapter {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

#[async_trait]
impl ProviderAdapter for AwsAdapter {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    async fn deploy(&self, job: &Job, progress: &dyn ProgressSink) -> ProvisionOutcome {
        let target = &job.target_name;
        let region = &job.spec.region;

        progress.info("Starting AWS deployment").await;
        progress
            .info(&format!("Building application for AWS in {region}"))
            .await;
        tokio::time::sleep(self.phase_delay).await;

        progress.info("Pushing to ECR").await;
        tokio::time::sleep(self.phase_delay).await;

        progress.info("Deploying to Fargate").await;
        tokio::time::sleep(self.phase_delay).await;

        let short_id = &job.job_id.simple().to_string()[..8];
        let url = format!("https://{target}-{short_id}.{region}.aws.example.com");
        let resources = json!({
            "ecr_repository": target,
            "cluster": format!("{target}-cluster"),
            "service": format!("{target}-service"),
            "task_definition": format!("{target}:1"),
            "region": region,
        });

        debug!(job_id = %job.job_id, %url, "simulated AWS deployment finished");
        ProvisionOutcome::Success {
            url: Some(url),
            resources: Some(resources),
        }
    }

    async fn remove(
        &self,
        job: &Job,
        resources: &serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> ProvisionOutcome {
        progress
            .info(&format!("Removing AWS resources for {}", job.target_name))
            .await;
        tokio::time::sleep(self.phase_delay).await;

        debug!(job_id = %job.job_id, ?resources, "simulated AWS teardown finished");
        ProvisionOutcome::Success {
            url: None,
            resources: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeploymentSpec, JobKind, NewJob};
    use crate::providers::NullProgressSink;
    use crate::state_machine::JobStatus;
    use chrono::Utc;

    fn job() -> Job {
        let new_job = NewJob::new(
            "demo",
            1,
            JobKind::Deploy,
            Provider::Aws,
            DeploymentSpec::default(),
        );
        Job {
            job_id: new_job.job_id,
            target_name: new_job.target_name,
            owner_id: new_job.owner_id,
            kind: new_job.kind,
            provider: new_job.provider,
            spec: new_job.spec,
            status: JobStatus::InProgress,
            result_url: None,
            result_resources: None,
            error: None,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn deploy_reports_url_and_resource_map() {
        let adapter = AwsAdapter::new(Duration::ZERO);
        let job = job();
        match adapter.deploy(&job, &NullProgressSink).await {
            ProvisionOutcome::Success { url, resources } => {
                let url = url.unwrap();
                assert!(url.starts_with("https://demo-"));
                assert!(url.ends_with(".us-west-2.aws.example.com"));
                let resources = resources.unwrap();
                assert_eq!(resources["cluster"], "demo-cluster");
                assert_eq!(resources["region"], "us-west-2");
            }
            ProvisionOutcome::Failure { reason } => panic!("unexpected failure: {reason}"),
        }
    }

    #[tokio::test]
    async fn remove_succeeds_without_result_fields() {
        let adapter = AwsAdapter::new(Duration::ZERO);
        let outcome = adapter
            .remove(&job(), &serde_json::json!({}), &NullProgressSink)
            .await;
        assert_eq!(
            outcome,
            ProvisionOutcome::Success {
                url: None,
                resources: None
            }
        );
    }
}
