//! # Job State Machine
//!
//! Lifecycle management for deployment jobs: pending -> in_progress ->
//! {completed, failed}. Transitions are validated here and persisted
//! through the store's compare-and-transition primitive, which is what
//! makes concurrent claim/finalize races safe.

pub mod events;
pub mod states;

pub use events::JobEvent;
pub use states::JobStatus;

use crate::error::{DeployError, Result};
use uuid::Uuid;

/// Resolve the target state for an event applied in `from`, or fail with
/// `InvalidTransition` when the event is not legal from that state.
///
/// Terminal states accept no events at all; that is a programming error on
/// the caller's side and must surface, not be swallowed.
pub fn determine_target_state(job_id: Uuid, from: JobStatus, event: &JobEvent) -> Result<JobStatus> {
    let target = match (from, event) {
        (JobStatus::Pending, JobEvent::Start) => JobStatus::InProgress,
        (JobStatus::InProgress, JobEvent::Complete) => JobStatus::Completed,
        (JobStatus::InProgress, JobEvent::Fail(_)) => JobStatus::Failed,
        _ => {
            return Err(DeployError::InvalidTransition {
                job_id,
                from: from.to_string(),
                to: event.target_hint().to_string(),
            })
        }
    };
    Ok(target)
}
