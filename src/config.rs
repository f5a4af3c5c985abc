//! # Configuration
//!
//! Layered configuration: compiled defaults, an optional `deploy.toml`
//! next to the process, then `DEPLOY_*` environment variables on top.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{DeployError, Result};
use crate::orchestration::DispatcherConfig;

fn default_database_url() -> String {
    "postgresql://localhost/deploy_development".to_string()
}

fn default_workers_per_provider() -> usize {
    2
}

fn default_adapter_timeout_secs() -> u64 {
    300
}

/// Runtime configuration for the orchestration core.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_workers_per_provider")]
    pub workers_per_provider: usize,
    /// Upper bound on a single provider adapter invocation, in seconds.
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            workers_per_provider: default_workers_per_provider(),
            adapter_timeout_secs: default_adapter_timeout_secs(),
        }
    }
}

impl DeployConfig {
    /// Load from `deploy.toml` (if present) and `DEPLOY_*` environment
    /// variables, e.g. `DEPLOY_DATABASE_URL`, `DEPLOY_WORKERS_PER_PROVIDER`.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("deploy").required(false))
            .add_source(config::Environment::with_prefix("DEPLOY"))
            .build()
            .map_err(|e| DeployError::Configuration(e.to_string()))?;

        let config: DeployConfig = settings
            .try_deserialize()
            .map_err(|e| DeployError::Configuration(e.to_string()))?;

        if config.workers_per_provider == 0 {
            return Err(DeployError::Configuration(
                "workers_per_provider must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Dispatcher view of this configuration.
    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            workers_per_provider: self.workers_per_provider,
            adapter_timeout: Duration::from_secs(self.adapter_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = DeployConfig::default();
        assert_eq!(config.workers_per_provider, 2);
        assert_eq!(config.adapter_timeout_secs, 300);
        assert!(config.database_url.starts_with("postgresql://"));
    }

    #[test]
    fn dispatcher_view_converts_units() {
        let config = DeployConfig {
            adapter_timeout_secs: 10,
            ..DeployConfig::default()
        };
        assert_eq!(config.dispatcher().adapter_timeout, Duration::from_secs(10));
    }
}
