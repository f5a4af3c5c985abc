use serde::{Deserialize, Serialize};

/// Events that drive job state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum JobEvent {
    /// A worker claimed the job and began provisioning.
    Start,
    /// Provisioning finished successfully.
    Complete,
    /// Provisioning failed with the given reason.
    Fail(String),
}

impl JobEvent {
    /// String form of the event type for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
        }
    }

    /// The state this event aims for, used in `InvalidTransition` messages.
    pub fn target_hint(&self) -> &'static str {
        match self {
            Self::Start => "in_progress",
            Self::Complete => "completed",
            Self::Fail(_) => "failed",
        }
    }

    /// Extract the error message if this is a failure event.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(reason) => Some(reason),
            _ => None,
        }
    }

    /// Whether this event moves the job into a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Fail(_))
    }
}
