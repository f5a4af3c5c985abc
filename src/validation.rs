//! Request-boundary validation.
//!
//! Malformed requests are rejected here and never reach the orchestrator.

use crate::error::{DeployError, Result};

/// Longest permitted target name, matching DNS label limits.
pub const MAX_TARGET_NAME_LEN: usize = 63;

/// Inclusive bounds on the status listing page size.
pub const STATUS_LIMIT_RANGE: (usize, usize) = (1, 100);

/// Inclusive bounds on the log listing page size.
pub const LOG_LIMIT_RANGE: (usize, usize) = (1, 1000);

/// A target name must be non-empty (after trimming) and at most 63
/// characters.
pub fn validate_target_name(target_name: &str) -> Result<()> {
    if target_name.trim().is_empty() {
        return Err(DeployError::Validation(
            "target_name cannot be empty".to_string(),
        ));
    }
    if target_name.len() > MAX_TARGET_NAME_LEN {
        return Err(DeployError::Validation(format!(
            "target_name must be {MAX_TARGET_NAME_LEN} characters or less"
        )));
    }
    Ok(())
}

pub fn validate_region(region: &str) -> Result<()> {
    if region.trim().is_empty() {
        return Err(DeployError::Validation("region cannot be empty".to_string()));
    }
    Ok(())
}

/// Check a caller-supplied page size against its inclusive bounds.
pub fn validate_limit(name: &str, limit: usize, (min, max): (usize, usize)) -> Result<()> {
    if limit < min || limit > max {
        return Err(DeployError::Validation(format!(
            "{name} must be between {min} and {max}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_name_bounds() {
        assert!(validate_target_name("demo").is_ok());
        assert!(validate_target_name(&"a".repeat(63)).is_ok());
        assert!(validate_target_name("").is_err());
        assert!(validate_target_name("   ").is_err());
        assert!(validate_target_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn limit_bounds() {
        assert!(validate_limit("limit", 1, STATUS_LIMIT_RANGE).is_ok());
        assert!(validate_limit("limit", 100, STATUS_LIMIT_RANGE).is_ok());
        assert!(validate_limit("limit", 0, STATUS_LIMIT_RANGE).is_err());
        assert!(validate_limit("limit", 101, STATUS_LIMIT_RANGE).is_err());
        assert!(validate_limit("limit", 1000, LOG_LIMIT_RANGE).is_ok());
        assert!(validate_limit("limit", 1001, LOG_LIMIT_RANGE).is_err());
    }
}
