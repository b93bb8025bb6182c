//! Time-boxed security exceptions.
//!
//! An exception is the only path past an `exception_required` gate decision.
//! It must name at least one compensating control and always expires; there
//! are no perpetual exceptions.

use cab_types::{CorrelationId, DeploymentId, ExceptionId};
use serde::{Deserialize, Serialize};

/// Longest lifetime an exception may be granted, in days.
pub const MAX_EXCEPTION_DAYS: i64 = 90;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl std::fmt::Display for ExceptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExceptionStatus::Pending => "pending",
            ExceptionStatus::Approved => "approved",
            ExceptionStatus::Rejected => "rejected",
            ExceptionStatus::Expired => "expired",
        };
        write!(f, "{name}")
    }
}

/// Parameters for opening an exception.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExceptionRequest {
    pub deployment_id: DeploymentId,
    pub requested_by: String,
    pub reason: String,
    pub risk_justification: String,
    /// At least one named mitigation is mandatory.
    pub compensating_controls: Vec<String>,
    /// Lifetime in days, 1..=90.
    pub expiry_days: i64,
}

/// Security-reviewer verdict on an exception.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExceptionReview {
    pub reviewer: String,
    pub rationale: String,
    pub decided_at: chrono::DateTime<chrono::Utc>,
}

/// A time-boxed exception permitting a high-risk deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exception {
    pub exception_id: ExceptionId,
    pub correlation_id: CorrelationId,
    pub deployment_id: DeploymentId,
    pub reason: String,
    pub risk_justification: String,
    pub compensating_controls: Vec<String>,
    pub requested_by: String,
    pub status: ExceptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ExceptionReview>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl Exception {
    pub fn is_expired_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        now > self.expires_at
    }
}
