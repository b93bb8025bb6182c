//! CAB Types - shared vocabulary of the deployment approval gate
//!
//! Identifiers, fixed-point scores, the blast-radius class catalogue, and
//! incident records shared by every gate component.

#![deny(unsafe_code)]

mod blast;
mod incident;
mod score;

pub use blast::{BlastRadiusClass, BlastRadiusProfile, BusinessCriticality, CriticalityTier};
pub use incident::{DeploymentIncident, DetectionMethod, IncidentId, Severity};
pub use score::{BasisPoints, RiskScore, ScoreOutOfRange};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentId(pub String);
impl DeploymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}
impl std::fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);
impl RequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub String);
impl DecisionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExceptionId(pub String);
impl ExceptionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
impl std::fmt::Display for ExceptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates a gate record with upstream pipeline artifacts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub String);
impl CorrelationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Opaque reference to an externally stored evidence pack.
///
/// The gate never dereferences the pack; it records the id and content hash
/// so a decision can later be matched to the exact artifacts it was based on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub evidence_id: String,
    pub content_hash: String,
}

impl EvidenceRef {
    pub fn new(evidence_id: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            evidence_id: evidence_id.into(),
            content_hash: content_hash.into(),
        }
    }
}
