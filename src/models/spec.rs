//! # Deployment Spec
//!
//! The configuration snapshot captured when a job is submitted. Stored as
//! JSON on the job row and never mutated afterwards, so a job always
//! reflects the configuration it was actually provisioned with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application runtime flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Docker,
    Serverless,
    Static,
}

impl Runtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Serverless => "serverless",
            Self::Static => "static",
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Runtime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "serverless" => Ok(Self::Serverless),
            "static" => Ok(Self::Static),
            other => Err(format!("unknown runtime: {other}")),
        }
    }
}

/// Container build settings, defaulted when the runtime is docker and the
/// caller omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub dockerfile: String,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dockerfile: "Dockerfile".to_string(),
            context: ".".to_string(),
            args: None,
        }
    }
}

/// Compute sizing for the deployed application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu: u32,
    pub memory_mb: u32,
    pub min_instances: u32,
    pub max_instances: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu: 1,
            memory_mb: 1024,
            min_instances: 1,
            max_instances: 1,
        }
    }
}

/// Network exposure settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkingConfig {
    pub port: u16,
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
}

impl Default for NetworkingConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            public: true,
            custom_domain: None,
        }
    }
}

/// Immutable deployment configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub region: String,
    pub runtime: Runtime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,
    /// Environment entries in `KEY=VALUE` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceLimits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<NetworkingConfig>,
}

impl DeploymentSpec {
    /// Fill in defaults the original submission left implicit: docker
    /// runtimes always carry a build config.
    pub fn normalized(mut self) -> Self {
        if self.runtime == Runtime::Docker && self.build.is_none() {
            self.build = Some(BuildConfig::default());
        }
        self
    }
}

impl Default for DeploymentSpec {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            runtime: Runtime::Docker,
            build: None,
            env: None,
            resources: None,
            networking: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_runtime_gets_default_build() {
        let spec = DeploymentSpec::default().normalized();
        let build = spec.build.expect("docker spec should carry build config");
        assert_eq!(build.dockerfile, "Dockerfile");
        assert_eq!(build.context, ".");
    }

    #[test]
    fn static_runtime_keeps_no_build() {
        let spec = DeploymentSpec {
            runtime: Runtime::Static,
            ..DeploymentSpec::default()
        }
        .normalized();
        assert!(spec.build.is_none());
    }

    #[test]
    fn spec_round_trips_through_json() {
        let spec = DeploymentSpec {
            env: Some(vec!["PORT=8080".to_string()]),
            resources: Some(ResourceLimits::default()),
            networking: Some(NetworkingConfig::default()),
            ..DeploymentSpec::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        let back: DeploymentSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }
}
