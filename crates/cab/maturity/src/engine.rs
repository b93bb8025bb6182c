//! The trust-maturity evaluation engine.

use crate::ladder::{MaturityLadder, TrustMaturityLevel};
use crate::MaturityError;
use cab_types::{BasisPoints, BlastRadiusClass, DeploymentIncident, RiskScore, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{info, warn};

/// Tunables for the evaluation.
#[derive(Clone, Copy, Debug)]
pub struct MaturityConfig {
    /// Assumed deployment throughput per week, used as the incident-rate
    /// denominator. A capacity assumption rather than a measured count, so
    /// it is injectable rather than hardcoded.
    pub weekly_deployment_estimate: u32,
}

impl Default for MaturityConfig {
    fn default() -> Self {
        Self {
            weekly_deployment_estimate: 50,
        }
    }
}

/// Incident counts by severity within an evaluation window.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub p1: u32,
    pub p2: u32,
    pub p3: u32,
    pub p4: u32,
}

impl SeverityCounts {
    pub fn total(&self) -> u32 {
        self.p1 + self.p2 + self.p3 + self.p4
    }

    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::P1 => self.p1 += 1,
            Severity::P2 => self.p2 += 1,
            Severity::P3 => self.p3 += 1,
            Severity::P4 => self.p4 += 1,
        }
    }
}

/// The four promotion criteria. All must pass; there is no partial credit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    MinimumWeeksAtLevel,
    IncidentRateCeiling,
    P1IncidentCeiling,
    P2IncidentCeiling,
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Criterion::MinimumWeeksAtLevel => "minimum weeks at level",
            Criterion::IncidentRateCeiling => "incident-rate ceiling",
            Criterion::P1IncidentCeiling => "P1 incident ceiling",
            Criterion::P2IncidentCeiling => "P2 incident ceiling",
        };
        write!(f, "{name}")
    }
}

/// Required-vs-actual outcome for one criterion.
///
/// Weeks and counts are plain integers; the rate criterion is expressed in
/// basis points.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CriterionResult {
    pub criterion: Criterion,
    pub required: u32,
    pub actual: u32,
    pub passed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStatus {
    CriteriaMet,
    CriteriaNotMet,
    AlreadyAtMaximum,
}

/// What the organization should do next.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recommendation {
    pub summary: String,
    /// Present only when criteria were met: the model version to activate
    /// through the normal CAB-gated registry path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<HashMap<BlastRadiusClass, RiskScore>>,
}

/// Immutable record of one evaluation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustMaturityProgress {
    pub progress_id: String,
    pub evaluated_at: chrono::DateTime<chrono::Utc>,
    pub current_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_level: Option<String>,
    pub window_weeks: u32,
    pub window_start: chrono::DateTime<chrono::Utc>,
    pub incident_counts: SeverityCounts,
    /// Incidents attributable to auto-approved deployments.
    pub auto_approved_incidents: u32,
    pub estimated_deployments: u64,
    pub incident_rate: BasisPoints,
    pub criteria: Vec<CriterionResult>,
    pub status: ProgressStatus,
    pub recommendation: Recommendation,
    /// Set once a human signs off on the promotion this record recommends.
    pub cab_approved: bool,
}

/// Evaluation outcome handed back to the scheduler.
#[derive(Clone, Debug)]
pub struct EvaluationResult {
    pub ready_to_progress: bool,
    pub progress: TrustMaturityProgress,
}

struct MaturityState {
    incidents: Vec<DeploymentIncident>,
    history: Vec<TrustMaturityProgress>,
    level_entered_at: chrono::DateTime<chrono::Utc>,
}

/// The trust-maturity engine.
pub struct TrustMaturityEngine {
    ladder: MaturityLadder,
    config: MaturityConfig,
    state: RwLock<MaturityState>,
}

impl TrustMaturityEngine {
    pub fn new(ladder: MaturityLadder, config: MaturityConfig) -> Result<Self, MaturityError> {
        if config.weekly_deployment_estimate == 0 {
            return Err(MaturityError::Configuration(
                "weekly deployment estimate must be positive".to_string(),
            ));
        }
        Ok(Self {
            ladder,
            config,
            state: RwLock::new(MaturityState {
                incidents: Vec::new(),
                history: Vec::new(),
                level_entered_at: chrono::Utc::now(),
            }),
        })
    }

    pub fn ladder(&self) -> &MaturityLadder {
        &self.ladder
    }

    /// Record when the current level was entered (backdated on restore,
    /// advanced on promotion).
    pub fn record_level_entry(
        &self,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), MaturityError> {
        let mut state = self.state.write().map_err(|_| MaturityError::LockError)?;
        state.level_entered_at = at;
        Ok(())
    }

    /// Ingest a resolved production incident.
    pub fn record_incident(&self, incident: DeploymentIncident) -> Result<(), MaturityError> {
        let mut state = self.state.write().map_err(|_| MaturityError::LockError)?;
        state.incidents.push(incident);
        Ok(())
    }

    /// Evaluate readiness to progress from `current_level`.
    pub fn evaluate_progression(
        &self,
        current_level: &str,
        window_weeks: u32,
    ) -> Result<EvaluationResult, MaturityError> {
        self.evaluate_progression_at(current_level, window_weeks, chrono::Utc::now())
    }

    /// Evaluation with an explicit clock, for schedulers and tests.
    pub fn evaluate_progression_at(
        &self,
        current_level: &str,
        window_weeks: u32,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<EvaluationResult, MaturityError> {
        if window_weeks == 0 {
            return Err(MaturityError::Configuration(
                "evaluation window must be at least one week".to_string(),
            ));
        }
        let next = self.ladder.next_after(current_level)?.cloned();
        let window_start = now - chrono::Duration::weeks(i64::from(window_weeks));

        let mut state = self.state.write().map_err(|_| MaturityError::LockError)?;

        let mut counts = SeverityCounts::default();
        let mut auto_approved = 0u32;
        for incident in &state.incidents {
            if incident.occurred_at > window_start && incident.occurred_at <= now {
                counts.record(incident.severity);
                if incident.auto_approved {
                    auto_approved += 1;
                }
            }
        }

        let estimated_deployments =
            u64::from(self.config.weekly_deployment_estimate) * u64::from(window_weeks);
        let incident_rate =
            BasisPoints::from_ratio(u64::from(counts.total()), estimated_deployments)
                .unwrap_or(BasisPoints::ZERO);

        let Some(next) = next else {
            // Terminal: nothing above the current rung.
            let progress = TrustMaturityProgress {
                progress_id: uuid::Uuid::new_v4().to_string(),
                evaluated_at: now,
                current_level: current_level.to_string(),
                target_level: None,
                window_weeks,
                window_start,
                incident_counts: counts,
                auto_approved_incidents: auto_approved,
                estimated_deployments,
                incident_rate,
                criteria: Vec::new(),
                status: ProgressStatus::AlreadyAtMaximum,
                recommendation: Recommendation {
                    summary: format!(
                        "{current_level} is the highest maturity level; no further automation expansion is available"
                    ),
                    model_version: None,
                    thresholds: None,
                },
                cab_approved: false,
            };
            state.history.push(progress.clone());
            return Ok(EvaluationResult {
                ready_to_progress: false,
                progress,
            });
        };

        let elapsed = now - state.level_entered_at;
        let weeks_at_level = u32::try_from(elapsed.num_weeks().max(0)).unwrap_or(u32::MAX);

        let criteria = vec![
            CriterionResult {
                criterion: Criterion::MinimumWeeksAtLevel,
                required: next.min_weeks_at_prior,
                actual: weeks_at_level,
                passed: weeks_at_level >= next.min_weeks_at_prior,
            },
            CriterionResult {
                criterion: Criterion::IncidentRateCeiling,
                required: next.max_incident_rate.value(),
                actual: incident_rate.value(),
                passed: incident_rate <= next.max_incident_rate,
            },
            CriterionResult {
                criterion: Criterion::P1IncidentCeiling,
                required: next.max_p1_incidents,
                actual: counts.p1,
                passed: counts.p1 <= next.max_p1_incidents,
            },
            CriterionResult {
                criterion: Criterion::P2IncidentCeiling,
                required: next.max_p2_incidents,
                actual: counts.p2,
                passed: counts.p2 <= next.max_p2_incidents,
            },
        ];

        let ready = criteria.iter().all(|c| c.passed);
        let recommendation = if ready {
            Recommendation {
                summary: format!(
                    "all criteria met; recommend promotion to {} and CAB review of model version {}",
                    next.name, next.model_version
                ),
                model_version: Some(next.model_version.clone()),
                thresholds: Some(next.thresholds.clone()),
            }
        } else {
            Recommendation {
                summary: remediation_summary(&next, &criteria),
                model_version: None,
                thresholds: None,
            }
        };

        let progress = TrustMaturityProgress {
            progress_id: uuid::Uuid::new_v4().to_string(),
            evaluated_at: now,
            current_level: current_level.to_string(),
            target_level: Some(next.name.clone()),
            window_weeks,
            window_start,
            incident_counts: counts,
            auto_approved_incidents: auto_approved,
            estimated_deployments,
            incident_rate,
            criteria,
            status: if ready {
                ProgressStatus::CriteriaMet
            } else {
                ProgressStatus::CriteriaNotMet
            },
            recommendation,
            cab_approved: false,
        };
        state.history.push(progress.clone());

        if ready {
            info!(
                current = current_level,
                target = %next.name,
                rate_bp = incident_rate.value(),
                "maturity criteria met; promotion recommended"
            );
        } else {
            warn!(
                current = current_level,
                target = %next.name,
                rate_bp = incident_rate.value(),
                "maturity criteria not met"
            );
        }

        Ok(EvaluationResult {
            ready_to_progress: ready,
            progress,
        })
    }

    /// Record CAB sign-off on a criteria-met evaluation and start the clock
    /// at the new level. The model activation itself still goes through the
    /// registry's own CAB-gated path.
    pub fn record_promotion(
        &self,
        progress_id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<TrustMaturityProgress, MaturityError> {
        let mut state = self.state.write().map_err(|_| MaturityError::LockError)?;
        let record = state
            .history
            .iter_mut()
            .find(|p| p.progress_id == progress_id)
            .ok_or_else(|| MaturityError::ProgressNotFound(progress_id.to_string()))?;
        if record.status != ProgressStatus::CriteriaMet {
            return Err(MaturityError::PromotionNotReady(format!(
                "evaluation {progress_id} did not meet promotion criteria"
            )));
        }
        record.cab_approved = true;
        let snapshot = record.clone();
        state.level_entered_at = now;
        info!(
            progress_id,
            target = snapshot.target_level.as_deref().unwrap_or(""),
            "maturity promotion approved by CAB"
        );
        Ok(snapshot)
    }

    /// Full evaluation history, oldest first.
    pub fn history(&self) -> Result<Vec<TrustMaturityProgress>, MaturityError> {
        let state = self.state.read().map_err(|_| MaturityError::LockError)?;
        Ok(state.history.clone())
    }
}

fn remediation_summary(next: &TrustMaturityLevel, criteria: &[CriterionResult]) -> String {
    let failures: Vec<String> = criteria
        .iter()
        .filter(|c| !c.passed)
        .map(|c| format!("{}: required {}, actual {}", c.criterion, c.required, c.actual))
        .collect();
    format!(
        "not ready for {}; remediate before the next window: {}",
        next.name,
        failures.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cab_types::{DeploymentId, DetectionMethod, IncidentId};

    fn incident(severity: Severity, auto: bool, at: chrono::DateTime<chrono::Utc>) -> DeploymentIncident {
        DeploymentIncident {
            incident_id: IncidentId::generate(),
            deployment_id: DeploymentId::new("dep-1"),
            severity,
            detection_method: DetectionMethod::Monitoring,
            auto_approved: auto,
            risk_score_at_approval: RiskScore::from_points(40).unwrap(),
            model_version_at_approval: "1.0".to_string(),
            blast_radius: BlastRadiusClass::ProductivityTools,
            impacted_users: 250,
            occurred_at: at,
            resolved_at: Some(at + chrono::Duration::hours(4)),
            resolution_summary: Some("rolled back".to_string()),
            preventable: Some(true),
        }
    }

    fn engine() -> TrustMaturityEngine {
        TrustMaturityEngine::new(MaturityLadder::standard(), MaturityConfig::default()).unwrap()
    }

    #[test]
    fn p1_incidents_block_promotion_with_required_vs_actual() {
        let engine = engine();
        let now = chrono::Utc::now();
        engine.record_level_entry(now - chrono::Duration::weeks(20)).unwrap();
        for _ in 0..3 {
            engine
                .record_incident(incident(Severity::P1, true, now - chrono::Duration::weeks(2)))
                .unwrap();
        }

        let result = engine
            .evaluate_progression_at("initial", 12, now)
            .unwrap();
        assert!(!result.ready_to_progress);
        assert_eq!(result.progress.status, ProgressStatus::CriteriaNotMet);

        let p1 = result
            .progress
            .criteria
            .iter()
            .find(|c| c.criterion == Criterion::P1IncidentCeiling)
            .unwrap();
        assert!(!p1.passed);
        assert_eq!(p1.required, 0);
        assert_eq!(p1.actual, 3);
        assert!(result.progress.recommendation.summary.contains("required 0, actual 3"));
    }

    #[test]
    fn clean_history_meets_criteria_and_recommends_next_model() {
        let engine = engine();
        let now = chrono::Utc::now();
        engine.record_level_entry(now - chrono::Duration::weeks(10)).unwrap();

        let result = engine.evaluate_progression_at("initial", 8, now).unwrap();
        assert!(result.ready_to_progress);
        assert_eq!(result.progress.status, ProgressStatus::CriteriaMet);
        assert_eq!(
            result.progress.recommendation.model_version.as_deref(),
            Some("1.1")
        );
        let thresholds = result.progress.recommendation.thresholds.as_ref().unwrap();
        assert_eq!(
            thresholds.get(&BlastRadiusClass::ProductivityTools),
            Some(&RiskScore::from_points(40).unwrap())
        );
        // Recommendation only; nothing is activated here.
        assert!(!result.progress.cab_approved);
    }

    #[test]
    fn insufficient_tenure_fails_only_the_weeks_criterion() {
        let engine = engine();
        let now = chrono::Utc::now();
        engine.record_level_entry(now - chrono::Duration::weeks(3)).unwrap();

        let result = engine.evaluate_progression_at("initial", 8, now).unwrap();
        assert!(!result.ready_to_progress);
        let failing: Vec<_> = result
            .progress
            .criteria
            .iter()
            .filter(|c| !c.passed)
            .collect();
        assert_eq!(failing.len(), 1);
        assert_eq!(failing[0].criterion, Criterion::MinimumWeeksAtLevel);
        assert_eq!(failing[0].required, 8);
        assert_eq!(failing[0].actual, 3);
    }

    #[test]
    fn incidents_outside_the_window_are_ignored() {
        let engine = engine();
        let now = chrono::Utc::now();
        engine.record_level_entry(now - chrono::Duration::weeks(30)).unwrap();
        engine
            .record_incident(incident(Severity::P1, false, now - chrono::Duration::weeks(26)))
            .unwrap();

        let result = engine.evaluate_progression_at("initial", 12, now).unwrap();
        assert_eq!(result.progress.incident_counts.total(), 0);
        assert!(result.ready_to_progress);
    }

    #[test]
    fn incident_rate_uses_the_injectable_volume_estimate() {
        let ladder = MaturityLadder::standard();
        let engine = TrustMaturityEngine::new(
            ladder,
            MaturityConfig {
                weekly_deployment_estimate: 10,
            },
        )
        .unwrap();
        let now = chrono::Utc::now();
        engine.record_level_entry(now - chrono::Duration::weeks(20)).unwrap();
        // 3 P3 incidents over 10 weeks * 10 deployments = 3%.
        for _ in 0..3 {
            engine
                .record_incident(incident(Severity::P3, false, now - chrono::Duration::weeks(1)))
                .unwrap();
        }

        let result = engine.evaluate_progression_at("initial", 10, now).unwrap();
        assert_eq!(result.progress.estimated_deployments, 100);
        assert_eq!(result.progress.incident_rate, BasisPoints::new(300));
        // 3% exceeds repeatable's 2% ceiling.
        assert!(!result.ready_to_progress);
    }

    #[test]
    fn top_of_ladder_is_terminal() {
        let engine = engine();
        let result = engine.evaluate_progression("optimizing", 12).unwrap();
        assert!(!result.ready_to_progress);
        assert_eq!(result.progress.status, ProgressStatus::AlreadyAtMaximum);
        assert!(result.progress.target_level.is_none());
    }

    #[test]
    fn every_evaluation_is_persisted() {
        let engine = engine();
        let now = chrono::Utc::now();
        engine.evaluate_progression_at("initial", 8, now).unwrap();
        engine.evaluate_progression_at("initial", 8, now).unwrap();
        assert_eq!(engine.history().unwrap().len(), 2);
    }

    #[test]
    fn promotion_requires_a_criteria_met_record() {
        let engine = engine();
        let now = chrono::Utc::now();
        engine.record_level_entry(now - chrono::Duration::weeks(3)).unwrap();
        let failed = engine.evaluate_progression_at("initial", 8, now).unwrap();
        assert!(matches!(
            engine.record_promotion(&failed.progress.progress_id, now),
            Err(MaturityError::PromotionNotReady(_))
        ));

        engine.record_level_entry(now - chrono::Duration::weeks(10)).unwrap();
        let passed = engine.evaluate_progression_at("initial", 8, now).unwrap();
        let promoted = engine
            .record_promotion(&passed.progress.progress_id, now)
            .unwrap();
        assert!(promoted.cab_approved);
    }

    #[test]
    fn zero_week_window_is_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.evaluate_progression("initial", 0),
            Err(MaturityError::Configuration(_))
        ));
    }

    #[test]
    fn zero_volume_estimate_is_rejected_at_construction() {
        assert!(matches!(
            TrustMaturityEngine::new(
                MaturityLadder::standard(),
                MaturityConfig {
                    weekly_deployment_estimate: 0
                }
            ),
            Err(MaturityError::Configuration(_))
        ));
    }
}
