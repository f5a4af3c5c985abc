//! # Service Boundary
//!
//! The operations an HTTP layer or CLI client calls: deployment
//! submission and removal on the write side, status and log queries on
//! the read side. Validation and scope checks live here; nothing
//! malformed or unauthorized reaches the orchestrator.

pub mod deployments;
pub mod status;

pub use deployments::{DeployRequest, DeploymentService, SubmitAck};
pub use status::{JobView, StatusService};
