//! CAB Registry - versioned risk-model configuration
//!
//! Holds every scoring-model version ever created and enforces the two
//! registry invariants: weight maps sum to 1.0 within tolerance, and at most
//! one version is active at any time. Versions are never deleted, only
//! superseded.

#![deny(unsafe_code)]

use cab_types::{BasisPoints, BlastRadiusClass, RiskScore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{info, warn};

/// Weight maps must sum to 1.0 (10 000 bp) within ±0.01 (100 bp).
pub const WEIGHT_SUM_TARGET: BasisPoints = BasisPoints::new(10_000);
pub const WEIGHT_SUM_TOLERANCE: BasisPoints = BasisPoints::new(100);

/// How aggressively a model version trades review effort for automation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingMode {
    Conservative,
    Balanced,
    Aggressive,
    Optimized,
}

/// CAB sign-off recorded against a model version before activation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CabApproval {
    pub approver: String,
    pub rationale: String,
    pub approved_at: chrono::DateTime<chrono::Utc>,
}

/// One version of the scoring configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskModelVersion {
    /// Unique label, monotonic by convention ("1.0", "1.1", ...).
    pub version: String,
    pub mode: OperatingMode,
    pub effective_date: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_date: Option<chrono::DateTime<chrono::Utc>>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cab_approval: Option<CabApproval>,
    /// Per-class ceiling below which a deployment may skip human review.
    pub auto_approve_thresholds: HashMap<BlastRadiusClass, RiskScore>,
    /// Scoring weights by risk-factor name, in basis points.
    pub risk_factor_weights: BTreeMap<String, BasisPoints>,
    /// Free-form calibration evidence kept with the version for audit.
    pub calibration_evidence: serde_json::Value,
}

impl RiskModelVersion {
    /// Sum of all factor weights, saturating on overflow.
    pub fn weight_sum(&self) -> BasisPoints {
        self.risk_factor_weights
            .values()
            .try_fold(BasisPoints::ZERO, |acc, w| acc.checked_add(*w))
            .unwrap_or(BasisPoints::new(u32::MAX))
    }

    /// Threshold for a class; absence means "never auto-approve".
    pub fn auto_approve_threshold(&self, class: BlastRadiusClass) -> RiskScore {
        self.auto_approve_thresholds
            .get(&class)
            .copied()
            .unwrap_or(RiskScore::ZERO)
    }
}

/// The versioned risk-model registry.
pub struct RiskModelRegistry {
    versions: RwLock<HashMap<String, RiskModelVersion>>,
}

impl RiskModelRegistry {
    pub fn new() -> Self {
        Self {
            versions: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new version as an inactive draft.
    ///
    /// Drafts cannot arrive pre-activated; activation is a separate,
    /// CAB-gated step.
    pub fn insert_draft(&self, version: RiskModelVersion) -> Result<(), RegistryError> {
        let mut violations = validate_weights(&version);
        if version.active {
            violations.push(format!(
                "version {} must enter as an inactive draft; activation is a separate step",
                version.version
            ));
        }
        if !violations.is_empty() {
            return Err(RegistryError::InvalidConfiguration(violations));
        }

        let mut versions = self.versions.write().map_err(|_| RegistryError::LockError)?;
        if versions.contains_key(&version.version) {
            return Err(RegistryError::DuplicateVersion(version.version));
        }
        info!(version = %version.version, mode = ?version.mode, "risk model draft registered");
        versions.insert(version.version.clone(), version);
        Ok(())
    }

    /// Re-validate a version against both registry invariants.
    ///
    /// Collects every violation rather than stopping at the first, so CAB
    /// reviewers see the full list.
    pub fn validate(&self, version: &RiskModelVersion) -> Result<(), RegistryError> {
        let mut violations = validate_weights(version);

        if version.active {
            let versions = self.versions.read().map_err(|_| RegistryError::LockError)?;
            for other in versions.values() {
                if other.active && other.version != version.version {
                    violations.push(format!(
                        "version {} cannot be active while {} is active",
                        version.version, other.version
                    ));
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::InvalidConfiguration(violations))
        }
    }

    /// Record CAB sign-off on a draft version.
    pub fn record_cab_approval(
        &self,
        version: &str,
        approver: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let mut versions = self.versions.write().map_err(|_| RegistryError::LockError)?;
        let entry = versions
            .get_mut(version)
            .ok_or_else(|| RegistryError::VersionNotFound(version.to_string()))?;
        entry.cab_approval = Some(CabApproval {
            approver: approver.into(),
            rationale: rationale.into(),
            approved_at: chrono::Utc::now(),
        });
        info!(version = %version, "CAB approval recorded for risk model");
        Ok(())
    }

    /// Atomically make `version` the single active version.
    ///
    /// The previous active version is deactivated and the new one activated
    /// under one write lock, so no reader ever observes zero or two active
    /// versions. Fails without side effects when the version is unknown, not
    /// CAB-approved, or violates the weight invariant.
    pub fn activate(&self, version: &str) -> Result<RiskModelVersion, RegistryError> {
        let mut versions = self.versions.write().map_err(|_| RegistryError::LockError)?;

        let candidate = versions
            .get(version)
            .ok_or_else(|| RegistryError::VersionNotFound(version.to_string()))?;
        if candidate.cab_approval.is_none() {
            return Err(RegistryError::NotCabApproved(version.to_string()));
        }
        let violations = validate_weights(candidate);
        if !violations.is_empty() {
            warn!(version = %version, "activation blocked by invalid configuration");
            return Err(RegistryError::InvalidConfiguration(violations));
        }

        let previous: Option<String> = versions
            .values()
            .find(|v| v.active && v.version != version)
            .map(|v| v.version.clone());
        if let Some(prev) = &previous {
            if let Some(entry) = versions.get_mut(prev) {
                entry.active = false;
            }
        }
        // Unwrap-free: presence checked above, lock still held.
        let entry = versions
            .get_mut(version)
            .ok_or_else(|| RegistryError::VersionNotFound(version.to_string()))?;
        entry.active = true;
        let snapshot = entry.clone();

        info!(
            version = %version,
            superseded = previous.as_deref().unwrap_or("none"),
            "risk model activated"
        );
        Ok(snapshot)
    }

    /// The single active version.
    ///
    /// `NotConfigured` means the caller must fall back to the most
    /// conservative manual review, never skip the gate.
    pub fn active_version(&self) -> Result<RiskModelVersion, RegistryError> {
        let versions = self.versions.read().map_err(|_| RegistryError::LockError)?;
        versions
            .values()
            .find(|v| v.active)
            .cloned()
            .ok_or(RegistryError::NotConfigured)
    }

    /// Look up a version by label.
    pub fn version(&self, label: &str) -> Result<RiskModelVersion, RegistryError> {
        let versions = self.versions.read().map_err(|_| RegistryError::LockError)?;
        versions
            .get(label)
            .cloned()
            .ok_or_else(|| RegistryError::VersionNotFound(label.to_string()))
    }

    /// All version labels, active or not.
    pub fn version_labels(&self) -> Result<Vec<String>, RegistryError> {
        let versions = self.versions.read().map_err(|_| RegistryError::LockError)?;
        let mut labels: Vec<String> = versions.keys().cloned().collect();
        labels.sort();
        Ok(labels)
    }
}

impl Default for RiskModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_weights(version: &RiskModelVersion) -> Vec<String> {
    let mut violations = Vec::new();
    if version.risk_factor_weights.is_empty() {
        violations.push(format!(
            "version {} has an empty risk-factor weight map",
            version.version
        ));
        return violations;
    }
    let sum = version.weight_sum();
    let low = WEIGHT_SUM_TARGET.value() - WEIGHT_SUM_TOLERANCE.value();
    let high = WEIGHT_SUM_TARGET.value() + WEIGHT_SUM_TOLERANCE.value();
    if sum.value() < low || sum.value() > high {
        violations.push(format!(
            "version {} weights sum to {} but must be within {}..={} basis points",
            version.version,
            sum.value(),
            low,
            high
        ));
    }
    violations
}

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No version is active. Callers must degrade to manual review.
    #[error("no active risk model version is configured")]
    NotConfigured,

    #[error("invalid risk model configuration: {}", .0.join("; "))]
    InvalidConfiguration(Vec<String>),

    #[error("risk model version not found: {0}")]
    VersionNotFound(String),

    #[error("risk model version already exists: {0}")]
    DuplicateVersion(String),

    #[error("risk model version {0} has no recorded CAB approval")]
    NotCabApproved(String),

    #[error("lock error")]
    LockError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn draft(label: &str, weights: &[(&str, u32)]) -> RiskModelVersion {
        RiskModelVersion {
            version: label.to_string(),
            mode: OperatingMode::Conservative,
            effective_date: chrono::Utc::now(),
            review_date: None,
            active: false,
            cab_approval: None,
            auto_approve_thresholds: HashMap::from([
                (
                    BlastRadiusClass::ProductivityTools,
                    RiskScore::from_points(50).unwrap(),
                ),
                (
                    BlastRadiusClass::NonCritical,
                    RiskScore::from_points(70).unwrap(),
                ),
            ]),
            risk_factor_weights: weights
                .iter()
                .map(|(name, bp)| (name.to_string(), BasisPoints::new(*bp)))
                .collect(),
            calibration_evidence: serde_json::json!({"source": "unit test"}),
        }
    }

    fn balanced_weights() -> Vec<(&'static str, u32)> {
        vec![
            ("vulnerability_density", 3_000),
            ("publisher_trust", 2_500),
            ("rollback_readiness", 2_500),
            ("change_surface", 2_000),
        ]
    }

    fn approve_and_activate(registry: &RiskModelRegistry, label: &str) {
        registry
            .record_cab_approval(label, "cab-chair", "calibration reviewed")
            .unwrap();
        registry.activate(label).unwrap();
    }

    #[test]
    fn activation_requires_cab_approval() {
        let registry = RiskModelRegistry::new();
        registry
            .insert_draft(draft("1.0", &balanced_weights()))
            .unwrap();
        assert!(matches!(
            registry.activate("1.0"),
            Err(RegistryError::NotCabApproved(_))
        ));
        assert!(matches!(
            registry.active_version(),
            Err(RegistryError::NotConfigured)
        ));
    }

    #[test]
    fn activate_flips_exactly_one_active_version() {
        let registry = RiskModelRegistry::new();
        registry
            .insert_draft(draft("1.0", &balanced_weights()))
            .unwrap();
        registry
            .insert_draft(draft("1.1", &balanced_weights()))
            .unwrap();

        approve_and_activate(&registry, "1.0");
        assert_eq!(registry.active_version().unwrap().version, "1.0");

        approve_and_activate(&registry, "1.1");
        let active = registry.active_version().unwrap();
        assert_eq!(active.version, "1.1");
        assert!(!registry.version("1.0").unwrap().active);
    }

    #[test]
    fn invalid_weights_block_activation_and_leave_previous_active() {
        let registry = RiskModelRegistry::new();
        registry
            .insert_draft(draft("1.0", &balanced_weights()))
            .unwrap();
        approve_and_activate(&registry, "1.0");

        // Draft insertion already rejects bad weights.
        let err = registry
            .insert_draft(draft("1.1", &[("only_factor", 5_000)]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidConfiguration(_)));

        assert_eq!(registry.active_version().unwrap().version, "1.0");
    }

    #[test]
    fn validation_lists_every_violation() {
        let registry = RiskModelRegistry::new();
        registry
            .insert_draft(draft("1.0", &balanced_weights()))
            .unwrap();
        approve_and_activate(&registry, "1.0");

        let mut bad = draft("2.0", &[("only_factor", 2_000)]);
        bad.active = true;
        let err = registry.validate(&bad).unwrap_err();
        match err {
            RegistryError::InvalidConfiguration(violations) => {
                assert_eq!(violations.len(), 2, "{violations:?}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_class_threshold_means_never_auto_approve() {
        let version = draft("1.0", &balanced_weights());
        assert_eq!(
            version.auto_approve_threshold(BlastRadiusClass::CriticalInfrastructure),
            RiskScore::ZERO
        );
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let registry = RiskModelRegistry::new();
        registry
            .insert_draft(draft("1.0", &balanced_weights()))
            .unwrap();
        assert!(matches!(
            registry.insert_draft(draft("1.0", &balanced_weights())),
            Err(RegistryError::DuplicateVersion(_))
        ));
    }

    proptest! {
        /// Weight sums inside the tolerance band activate; outside never do.
        #[test]
        fn weight_sum_tolerance_is_exact(sum in 0u32..=20_000) {
            let registry = RiskModelRegistry::new();
            let version = draft("p.1", &[("a", sum / 2), ("b", sum - sum / 2)]);
            let in_band = (9_900..=10_100).contains(&sum);

            match registry.insert_draft(version) {
                Ok(()) => {
                    prop_assert!(in_band);
                    registry
                        .record_cab_approval("p.1", "cab-chair", "prop test")
                        .unwrap();
                    prop_assert!(registry.activate("p.1").is_ok());
                }
                Err(RegistryError::InvalidConfiguration(_)) => prop_assert!(!in_band),
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }
    }
}
