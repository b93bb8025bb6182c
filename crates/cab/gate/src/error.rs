//! Errors from the approval-gate engine.

use crate::exception::ExceptionStatus;
use crate::request::RequestStatus;
use cab_evidence::EvidenceError;
use cab_registry::RegistryError;
use cab_types::{ExceptionId, RequestId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    /// Malformed exception request or submission. Lists every violated
    /// precondition so CAB reviewers see the full picture.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Illegal state transition on a request, including re-deciding a
    /// terminal request. Never a silent no-op.
    #[error("cannot {action} request {request_id} in status {status}")]
    InvalidState {
        request_id: RequestId,
        status: RequestStatus,
        action: &'static str,
    },

    #[error("cannot {action} exception {exception_id} in status {status}")]
    InvalidExceptionState {
        exception_id: ExceptionId,
        status: ExceptionStatus,
        action: &'static str,
    },

    /// The exception lapsed before review; it has been marked expired and
    /// can never become approved retroactively.
    #[error("exception {0} expired before review")]
    ExceptionExpired(ExceptionId),

    #[error("approval request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("exception not found: {0}")]
    ExceptionNotFound(ExceptionId),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error("lock error")]
    LockError,
}
