//! Production incident records tied to specific deployments.
//!
//! These are the ground truth the trust-maturity engine learns from. Once an
//! incident is resolved the record is treated as immutable history.

use crate::{BlastRadiusClass, DeploymentId, RiskScore};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub String);
impl IncidentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    P1,
    P2,
    P3,
    P4,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::P1 => "P1",
            Severity::P2 => "P2",
            Severity::P3 => "P3",
            Severity::P4 => "P4",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    Monitoring,
    UserReport,
    SecurityScan,
    PostDeploymentAudit,
}

/// A production incident attributed to a deployment that passed the gate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeploymentIncident {
    pub incident_id: IncidentId,
    pub deployment_id: DeploymentId,
    pub severity: Severity,
    pub detection_method: DetectionMethod,
    /// Whether the triggering deployment cleared the gate without human review.
    pub auto_approved: bool,
    pub risk_score_at_approval: RiskScore,
    pub model_version_at_approval: String,
    pub blast_radius: BlastRadiusClass,
    pub impacted_users: u32,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_summary: Option<String>,
    /// Post-incident review verdict on whether the gate should have caught it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preventable: Option<bool>,
}
