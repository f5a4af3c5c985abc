//! # Credential Resolution
//!
//! Maps an opaque credential to an identity and permission set before any
//! orchestration call runs.
//!
//! ## Rejection Rules
//!
//! - unknown credential: `UnknownKey`
//! - credential explicitly revoked: `Revoked`
//! - credential past its expiry: `Expired`
//!
//! All three collapse into the same 401-equivalent
//! [`DeployError::Unauthorized`] at the boundary but are logged
//! distinctly. A valid credential carries scope tags; a missing required
//! scope is a 403-equivalent [`DeployError::Forbidden`], never a silent
//! no-op.

use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{DeployError, Result};
use crate::store::ApiKeyStore;

/// Permission tags carried by a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    ReadDeployments,
    WriteDeployments,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadDeployments => "read:deployments",
            Self::WriteDeployments => "write:deployments",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "read:deployments" => Ok(Self::ReadDeployments),
            "write:deployments" => Ok(Self::WriteDeployments),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}

/// Why a credential was rejected. Collapsed to `Unauthorized` at the
/// boundary; the variant drives distinct log lines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("credential is required")]
    MissingCredential,

    #[error("unknown credential")]
    UnknownKey,

    #[error("credential has been revoked")]
    Revoked,

    #[error("credential has expired")]
    Expired,
}

impl From<AuthError> for DeployError {
    fn from(err: AuthError) -> Self {
        DeployError::Unauthorized(err.to_string())
    }
}

/// Resolved identity and permission set for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub owner_id: i64,
    pub scopes: Vec<Scope>,
}

impl AuthContext {
    /// Check that the operation's required scope is present.
    pub fn require_scope(&self, scope: Scope) -> Result<()> {
        if self.scopes.contains(&scope) {
            Ok(())
        } else {
            Err(DeployError::Forbidden(format!(
                "credential does not have the required scope ({scope})"
            )))
        }
    }
}

/// Capability the API boundary uses to turn a credential into an identity.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, credential: Option<&str>) -> Result<AuthContext>;
}

/// API-key-backed resolver.
///
/// Resolution touches `last_used_at` synchronously on success. That
/// couples a write to a read-heavy path; the touch is isolated in the
/// store call so a deferred strategy can replace it without changing this
/// contract.
pub struct ApiKeyResolver<S: ApiKeyStore> {
    keys: Arc<S>,
}

impl<S: ApiKeyStore> ApiKeyResolver<S> {
    pub fn new(keys: Arc<S>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl<S: ApiKeyStore> CredentialResolver for ApiKeyResolver<S> {
    async fn resolve(&self, credential: Option<&str>) -> Result<AuthContext> {
        let credential = match credential {
            Some(c) if !c.is_empty() => c,
            _ => {
                warn!("request rejected: missing credential");
                return Err(AuthError::MissingCredential.into());
            }
        };

        let api_key = match self.keys.find_by_key(credential).await? {
            Some(key) => key,
            None => {
                warn!("request rejected: unknown credential");
                return Err(AuthError::UnknownKey.into());
            }
        };

        if api_key.is_revoked {
            warn!(owner_id = api_key.owner_id, "request rejected: revoked credential");
            return Err(AuthError::Revoked.into());
        }
        let now = Utc::now();
        if api_key.is_expired(now) {
            warn!(owner_id = api_key.owner_id, "request rejected: expired credential");
            return Err(AuthError::Expired.into());
        }

        self.keys.touch_last_used(credential, now).await?;

        // Unknown tags are skipped rather than rejected so scope
        // vocabulary can grow without invalidating old keys.
        let scopes: Vec<Scope> = api_key
            .scope_tags()
            .filter_map(|tag| tag.parse().ok())
            .collect();

        debug!(owner_id = api_key.owner_id, ?scopes, "credential resolved");
        Ok(AuthContext {
            owner_id: api_key.owner_id,
            scopes,
        })
    }
}
