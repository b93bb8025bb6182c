//! Blast-radius class catalogue.
//!
//! The classes are a closed set of reference data. CriticalInfrastructure
//! carries a hard auto-approve veto that no risk score can override.

use serde::{Deserialize, Serialize};

/// Impact-scope category of a deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlastRadiusClass {
    CriticalInfrastructure,
    BusinessCritical,
    ProductivityTools,
    NonCritical,
}

impl BlastRadiusClass {
    pub fn all() -> [BlastRadiusClass; 4] {
        [
            BlastRadiusClass::CriticalInfrastructure,
            BlastRadiusClass::BusinessCritical,
            BlastRadiusClass::ProductivityTools,
            BlastRadiusClass::NonCritical,
        ]
    }

    /// Reference profile for this class.
    pub fn profile(self) -> BlastRadiusProfile {
        match self {
            BlastRadiusClass::CriticalInfrastructure => BlastRadiusProfile {
                class: self,
                description: "Security, identity, and OS-level software where a bad \
                              deployment can take down the fleet"
                    .to_string(),
                max_impacted_users: None,
                criticality_tier: CriticalityTier::MissionCritical,
                min_cab_quorum: 3,
                auto_approve_allowed: false,
                example_apps: vec![
                    "endpoint protection agent".to_string(),
                    "vpn client".to_string(),
                    "os kernel update".to_string(),
                ],
            },
            BlastRadiusClass::BusinessCritical => BlastRadiusProfile {
                class: self,
                description: "Revenue and finance systems with enterprise-wide reach"
                    .to_string(),
                max_impacted_users: Some(50_000),
                criticality_tier: CriticalityTier::High,
                min_cab_quorum: 2,
                auto_approve_allowed: true,
                example_apps: vec![
                    "erp suite".to_string(),
                    "crm platform".to_string(),
                    "payroll system".to_string(),
                ],
            },
            BlastRadiusClass::ProductivityTools => BlastRadiusProfile {
                class: self,
                description: "Collaboration and office software used broadly but \
                              recoverable within a working day"
                    .to_string(),
                max_impacted_users: Some(10_000),
                criticality_tier: CriticalityTier::Medium,
                min_cab_quorum: 1,
                auto_approve_allowed: true,
                example_apps: vec![
                    "office suite".to_string(),
                    "chat client".to_string(),
                    "video conferencing".to_string(),
                ],
            },
            BlastRadiusClass::NonCritical => BlastRadiusProfile {
                class: self,
                description: "Single-team utilities with no business dependency"
                    .to_string(),
                max_impacted_users: Some(500),
                criticality_tier: CriticalityTier::Low,
                min_cab_quorum: 1,
                auto_approve_allowed: true,
                example_apps: vec![
                    "screensaver".to_string(),
                    "font pack".to_string(),
                    "desktop widget".to_string(),
                ],
            },
        }
    }

    pub fn auto_approve_allowed(self) -> bool {
        self.profile().auto_approve_allowed
    }

    pub fn min_cab_quorum(self) -> u32 {
        self.profile().min_cab_quorum
    }
}

impl std::fmt::Display for BlastRadiusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BlastRadiusClass::CriticalInfrastructure => "critical-infrastructure",
            BlastRadiusClass::BusinessCritical => "business-critical",
            BlastRadiusClass::ProductivityTools => "productivity-tools",
            BlastRadiusClass::NonCritical => "non-critical",
        };
        write!(f, "{name}")
    }
}

/// Static reference data describing one blast-radius class.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlastRadiusProfile {
    pub class: BlastRadiusClass,
    pub description: String,
    /// None means "no upper bound" (the whole fleet is in scope).
    pub max_impacted_users: Option<u32>,
    pub criticality_tier: CriticalityTier,
    pub min_cab_quorum: u32,
    /// Hard veto: when false, no risk score ever auto-approves.
    pub auto_approve_allowed: bool,
    pub example_apps: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriticalityTier {
    MissionCritical,
    High,
    Medium,
    Low,
}

/// Business criticality as declared by the submitting pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessCriticality {
    High,
    Medium,
    Low,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_infrastructure_never_allows_auto_approval() {
        assert!(!BlastRadiusClass::CriticalInfrastructure.auto_approve_allowed());
    }

    #[test]
    fn every_class_has_a_quorum_of_at_least_one() {
        for class in BlastRadiusClass::all() {
            assert!(class.min_cab_quorum() >= 1, "{class} has zero quorum");
        }
    }
}
