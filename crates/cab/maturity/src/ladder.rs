//! The trust-maturity ladder.
//!
//! A fixed, linear progression of automation levels. Each rung names the
//! requirements to reach it and the risk-model version (with thresholds) to
//! activate once promotion is approved.

use crate::MaturityError;
use cab_types::{BasisPoints, BlastRadiusClass, RiskScore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One rung of the ladder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustMaturityLevel {
    pub name: String,
    /// Minimum weeks the organization must hold the prior level.
    pub min_weeks_at_prior: u32,
    /// Ceiling on incidents per estimated deployment, in basis points.
    pub max_incident_rate: BasisPoints,
    pub max_p1_incidents: u32,
    pub max_p2_incidents: u32,
    /// Risk-model version to activate upon promotion to this level.
    pub model_version: String,
    pub thresholds: HashMap<BlastRadiusClass, RiskScore>,
}

/// The ordered ladder.
#[derive(Clone, Debug)]
pub struct MaturityLadder {
    levels: Vec<TrustMaturityLevel>,
}

impl MaturityLadder {
    /// Build a ladder, rejecting empty or duplicate-named configurations.
    pub fn new(levels: Vec<TrustMaturityLevel>) -> Result<Self, MaturityError> {
        if levels.is_empty() {
            return Err(MaturityError::Configuration(
                "maturity ladder has no levels".to_string(),
            ));
        }
        for (i, level) in levels.iter().enumerate() {
            if levels[..i].iter().any(|other| other.name == level.name) {
                return Err(MaturityError::Configuration(format!(
                    "duplicate maturity level name: {}",
                    level.name
                )));
            }
        }
        Ok(Self { levels })
    }

    /// The standard five-rung ladder shipped with the platform.
    pub fn standard() -> Self {
        let rung = |name: &str,
                    min_weeks: u32,
                    rate_bp: u32,
                    max_p1: u32,
                    max_p2: u32,
                    model: &str,
                    thresholds: &[(BlastRadiusClass, u32)]| {
            TrustMaturityLevel {
                name: name.to_string(),
                min_weeks_at_prior: min_weeks,
                max_incident_rate: BasisPoints::new(rate_bp),
                max_p1_incidents: max_p1,
                max_p2_incidents: max_p2,
                model_version: model.to_string(),
                thresholds: thresholds
                    .iter()
                    .map(|(class, points)| {
                        (
                            *class,
                            RiskScore::from_points(*points).unwrap_or(RiskScore::ZERO),
                        )
                    })
                    .collect(),
            }
        };
        // CriticalInfrastructure never appears in a threshold map: absence
        // means "never auto-approve" at every rung.
        let levels = vec![
            rung(
                "initial",
                0,
                10_000,
                u32::MAX,
                u32::MAX,
                "1.0",
                &[
                    (BlastRadiusClass::ProductivityTools, 30),
                    (BlastRadiusClass::NonCritical, 40),
                ],
            ),
            rung(
                "repeatable",
                8,
                200,
                0,
                2,
                "1.1",
                &[
                    (BlastRadiusClass::ProductivityTools, 40),
                    (BlastRadiusClass::NonCritical, 55),
                    (BlastRadiusClass::BusinessCritical, 10),
                ],
            ),
            rung(
                "defined",
                12,
                100,
                0,
                1,
                "1.2",
                &[
                    (BlastRadiusClass::ProductivityTools, 50),
                    (BlastRadiusClass::NonCritical, 65),
                    (BlastRadiusClass::BusinessCritical, 20),
                ],
            ),
            rung(
                "managed",
                16,
                50,
                0,
                0,
                "1.3",
                &[
                    (BlastRadiusClass::ProductivityTools, 55),
                    (BlastRadiusClass::NonCritical, 70),
                    (BlastRadiusClass::BusinessCritical, 25),
                ],
            ),
            rung(
                "optimizing",
                24,
                25,
                0,
                0,
                "1.4",
                &[
                    (BlastRadiusClass::ProductivityTools, 60),
                    (BlastRadiusClass::NonCritical, 75),
                    (BlastRadiusClass::BusinessCritical, 30),
                ],
            ),
        ];
        Self { levels }
    }

    pub fn levels(&self) -> &[TrustMaturityLevel] {
        &self.levels
    }

    pub fn level(&self, name: &str) -> Option<&TrustMaturityLevel> {
        self.levels.iter().find(|l| l.name == name)
    }

    /// The rung above `name`, or None at the top.
    ///
    /// An unknown name is a configuration error; the evaluation must never
    /// silently default to "ready".
    pub fn next_after(&self, name: &str) -> Result<Option<&TrustMaturityLevel>, MaturityError> {
        let index = self
            .levels
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| {
                MaturityError::Configuration(format!("unknown maturity level: {name}"))
            })?;
        Ok(self.levels.get(index + 1))
    }
}
