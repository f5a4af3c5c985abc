//! # API Key Model
//!
//! Credential rows consumed by the credential resolver. A key is valid
//! when it is neither revoked nor past its expiry; the two invalid causes
//! are distinguished so rejections can be logged separately even though
//! both surface as the same 401-equivalent to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default scope grant for newly issued keys.
pub const DEFAULT_SCOPES: &str = "read:deployments,write:deployments";

/// An API credential row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    /// The opaque credential presented by callers.
    pub key: String,
    pub name: String,
    pub owner_id: i64,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    /// Comma-separated permission tags, e.g. `read:deployments`.
    pub scopes: String,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// Issue a new key with a random 32-character credential.
    pub fn issue(name: impl Into<String>, owner_id: i64) -> Self {
        Self {
            key: generate_key(),
            name: name.into(),
            owner_id,
            is_revoked: false,
            revoked_at: None,
            expires_at: None,
            last_used_at: None,
            scopes: DEFAULT_SCOPES.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// Valid means neither revoked nor expired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && !self.is_expired(now)
    }

    /// Split the scopes column into individual tags.
    pub fn scope_tags(&self) -> impl Iterator<Item = &str> {
        self.scopes.split(',').map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Generate a 32-character hex credential.
pub fn generate_key() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn issued_keys_are_valid_and_unique() {
        let a = ApiKey::issue("ci", 1);
        let b = ApiKey::issue("ci", 1);
        assert_ne!(a.key, b.key);
        assert_eq!(a.key.len(), 32);
        assert!(a.is_valid(Utc::now()));
    }

    #[test]
    fn revoked_key_is_invalid() {
        let mut key = ApiKey::issue("ci", 1);
        key.is_revoked = true;
        key.revoked_at = Some(Utc::now());
        assert!(!key.is_valid(Utc::now()));
    }

    #[test]
    fn expired_key_is_invalid() {
        let mut key = ApiKey::issue("ci", 1);
        let now = Utc::now();
        key.expires_at = Some(now - Duration::hours(1));
        assert!(key.is_expired(now));
        assert!(!key.is_valid(now));

        key.expires_at = Some(now + Duration::hours(1));
        assert!(key.is_valid(now));
    }

    #[test]
    fn scope_tags_split_and_trim() {
        let mut key = ApiKey::issue("ci", 1);
        key.scopes = "read:deployments, write:deployments".to_string();
        let tags: Vec<&str> = key.scope_tags().collect();
        assert_eq!(tags, vec!["read:deployments", "write:deployments"]);
    }
}
