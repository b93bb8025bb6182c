//! Approval requests and their immutable decision records.

use cab_types::{
    BlastRadiusClass, CorrelationId, DecisionId, DeploymentId, EvidenceRef, RequestId, RiskScore,
};
use serde::{Deserialize, Serialize};

/// Outcome of the gate decision procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    AutoApproved,
    UnderReview,
    ExceptionRequired,
}

/// Lifecycle status of an approval request.
///
/// `submitted → {auto_approved | under_review | exception_required}`;
/// `under_review → {approved | rejected}`. ExceptionRequired is not
/// terminal: the request holds there until an exception resolves the
/// deployment out-of-band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Submitted,
    AutoApproved,
    UnderReview,
    ExceptionRequired,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::AutoApproved | RequestStatus::Approved | RequestStatus::Rejected
        )
    }

    /// Whether a human approve/reject is still legal from this status.
    pub fn accepts_human_decision(self) -> bool {
        matches!(self, RequestStatus::Submitted | RequestStatus::UnderReview)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestStatus::Submitted => "submitted",
            RequestStatus::AutoApproved => "auto_approved",
            RequestStatus::UnderReview => "under_review",
            RequestStatus::ExceptionRequired => "exception_required",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        };
        write!(f, "{name}")
    }
}

/// A CAB approval request.
///
/// Mutated only by the gate engine; immutable once terminal except for
/// append-only notes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub request_id: RequestId,
    pub correlation_id: CorrelationId,
    pub deployment_id: DeploymentId,
    pub evidence: EvidenceRef,
    pub risk_score: RiskScore,
    pub blast_radius: BlastRadiusClass,
    /// Model version the decision was computed against, for later incident
    /// correlation. None when no model was active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub status: RequestStatus,
    pub quorum: u32,
    pub submitter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
    pub rationale: String,
    pub conditions: Vec<String>,
    pub notes: Vec<RequestNote>,
    /// SHA-256 over the canonical decision inputs.
    pub decision_hash: String,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Append-only note on a request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestNote {
    pub author: String,
    pub body: String,
    pub noted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionKind {
    Approved,
    Rejected,
}

/// One append-only record per terminal decision on a request.
///
/// Never updated after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub decision_id: DecisionId,
    pub request_id: RequestId,
    pub decision: DecisionKind,
    pub rationale: String,
    pub decided_by: String,
    pub conditions: Vec<String>,
    pub decided_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_reject_human_decisions() {
        for status in [
            RequestStatus::AutoApproved,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ] {
            assert!(status.is_terminal());
            assert!(!status.accepts_human_decision());
        }
    }

    #[test]
    fn exception_required_is_not_terminal() {
        assert!(!RequestStatus::ExceptionRequired.is_terminal());
        assert!(!RequestStatus::ExceptionRequired.accepts_human_decision());
    }
}
