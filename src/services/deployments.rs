//! Deployment submission boundary.
//!
//! Accepts raw request payloads, validates field bounds and enumerations,
//! checks the credential's scope, and hands a typed submission to the
//! orchestrator. Both operations acknowledge with the job id before any
//! provisioning happens.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{AuthContext, Scope};
use crate::error::{DeployError, Result};
use crate::models::{
    BuildConfig, DeploymentSpec, NetworkingConfig, Provider, ResourceLimits, Runtime,
};
use crate::orchestration::{JobOrchestrator, SubmitRequest};
use crate::validation::{validate_region, validate_target_name};

/// Raw deployment submission as received from the outside. Provider and
/// runtime arrive as strings and are validated against the closed sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub target_name: String,
    pub provider: String,
    pub region: String,
    pub runtime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceLimits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<NetworkingConfig>,
}

/// Accepted-job acknowledgement returned to the submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub job_id: Uuid,
    pub message: String,
}

/// Write-side service the API layer calls after resolving credentials.
pub struct DeploymentService {
    orchestrator: Arc<JobOrchestrator>,
}

impl DeploymentService {
    pub fn new(orchestrator: Arc<JobOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Validate and queue a deployment. Returns once the job row is
    /// durable and enqueued; provisioning continues in the background.
    #[instrument(skip(self, request, auth), fields(target = %request.target_name))]
    pub async fn submit_deployment(
        &self,
        request: DeployRequest,
        auth: &AuthContext,
    ) -> Result<SubmitAck> {
        auth.require_scope(Scope::WriteDeployments)?;

        validate_target_name(&request.target_name)?;
        validate_region(&request.region)?;
        let provider: Provider = request
            .provider
            .parse()
            .map_err(DeployError::Validation)?;
        let runtime: Runtime = request.runtime.parse().map_err(DeployError::Validation)?;

        let spec = DeploymentSpec {
            region: request.region,
            runtime,
            build: request.build,
            env: request.env,
            resources: request.resources,
            networking: request.networking,
        };

        let job = self
            .orchestrator
            .submit(SubmitRequest::Deploy {
                target_name: request.target_name,
                owner_id: auth.owner_id,
                provider,
                spec,
            })
            .await?;

        info!(job_id = %job.job_id, "deployment accepted");
        Ok(SubmitAck {
            job_id: job.job_id,
            message: "Deployment job submitted successfully".to_string(),
        })
    }

    /// Validate and queue a removal. `NotFound` when the caller has no
    /// completed deployment for the target.
    #[instrument(skip(self, auth))]
    pub async fn remove_deployment(
        &self,
        target_name: &str,
        auth: &AuthContext,
    ) -> Result<SubmitAck> {
        auth.require_scope(Scope::WriteDeployments)?;
        validate_target_name(target_name)?;

        let job = self
            .orchestrator
            .submit(SubmitRequest::Remove {
                target_name: target_name.to_string(),
                owner_id: auth.owner_id,
            })
            .await?;

        info!(job_id = %job.job_id, "removal accepted");
        Ok(SubmitAck {
            job_id: job.job_id,
            message: format!("Removal of {target_name} has been queued"),
        })
    }
}
