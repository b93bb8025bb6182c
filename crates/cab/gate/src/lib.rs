//! CAB Gate - the approval-gate engine
//!
//! Turns a risk score, a blast-radius class, and the active risk model into
//! a gate decision, and owns the approval-request and exception state
//! machines. Every terminal decision is recorded as an immutable,
//! hash-stamped record; that ledger is the compliance evidence.

#![deny(unsafe_code)]

mod engine;
mod error;
mod exception;
mod request;

pub use engine::{ApprovalGateEngine, DeploymentSubmission, GateConfig, GateEvaluation};
pub use error::GateError;
pub use exception::{Exception, ExceptionRequest, ExceptionReview, ExceptionStatus};
pub use request::{
    ApprovalDecision, ApprovalRequest, DecisionKind, GateDecision, RequestNote, RequestStatus,
};
