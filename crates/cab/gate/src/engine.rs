//! The approval-gate engine.
//!
//! A single state lock covers requests, decisions, and exceptions so a
//! status change and its decision record always commit together. Partial
//! writes are a correctness bug, not a degraded mode.

use crate::error::GateError;
use crate::exception::{
    Exception, ExceptionRequest, ExceptionReview, ExceptionStatus, MAX_EXCEPTION_DAYS,
};
use crate::request::{
    ApprovalDecision, ApprovalRequest, DecisionKind, GateDecision, RequestNote, RequestStatus,
};
use cab_evidence::DecisionInputs;
use cab_registry::{RegistryError, RiskModelRegistry};
use cab_types::{
    BlastRadiusClass, CorrelationId, DecisionId, DeploymentId, EvidenceRef, ExceptionId,
    RequestId, RiskScore,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Decider recorded on decisions the gate makes without a human.
const AUTO_DECIDER: &str = "approval-gate-engine";

/// Engine configuration.
///
/// The manual-review ceiling is an explicit parameter of the engine, never a
/// shared mutable default: concurrent evaluations can never observe each
/// other's overrides.
#[derive(Clone, Copy, Debug)]
pub struct GateConfig {
    /// Scores above the class threshold but at or below this ceiling go to
    /// human review; above it an exception is required. Default 75.00.
    pub manual_review_ceiling: RiskScore,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            // 75.00 in hundredths; within range by construction.
            manual_review_ceiling: RiskScore::from_hundredths(7_500)
                .unwrap_or(RiskScore::MAX),
        }
    }
}

/// Result of the gate decision procedure.
#[derive(Clone, Debug)]
pub struct GateEvaluation {
    pub decision: GateDecision,
    pub threshold: RiskScore,
    pub quorum: u32,
    pub rationale: String,
    pub model_version: Option<String>,
}

/// A deployment submission entering the gate.
#[derive(Clone, Debug)]
pub struct DeploymentSubmission {
    pub deployment_id: DeploymentId,
    pub evidence: EvidenceRef,
    pub risk_score: RiskScore,
    pub blast_radius: BlastRadiusClass,
    pub submitter: String,
    pub notes: Option<String>,
}

struct GateState {
    requests: HashMap<RequestId, ApprovalRequest>,
    decisions: Vec<ApprovalDecision>,
    exceptions: HashMap<ExceptionId, Exception>,
    deployment_index: HashMap<DeploymentId, Vec<RequestId>>,
}

/// The approval-gate engine.
pub struct ApprovalGateEngine {
    registry: Arc<RiskModelRegistry>,
    config: GateConfig,
    state: RwLock<GateState>,
}

impl ApprovalGateEngine {
    pub fn new(registry: Arc<RiskModelRegistry>, config: GateConfig) -> Self {
        Self {
            registry,
            config,
            state: RwLock::new(GateState {
                requests: HashMap::new(),
                decisions: Vec::new(),
                exceptions: HashMap::new(),
                deployment_index: HashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The decision procedure.
    ///
    /// Ties at boundaries resolve to the more permissive branch: `<=` is
    /// inclusive both for auto-approval and for the manual-review ceiling.
    /// This is a compliance-visible boundary and must not drift.
    pub fn evaluate(
        &self,
        risk_score: RiskScore,
        class: BlastRadiusClass,
    ) -> Result<GateEvaluation, GateError> {
        let model = match self.registry.active_version() {
            Ok(model) => model,
            Err(RegistryError::NotConfigured) => {
                // Fail safe, never fail open.
                return Ok(GateEvaluation {
                    decision: GateDecision::UnderReview,
                    threshold: RiskScore::ZERO,
                    quorum: class.min_cab_quorum(),
                    rationale: "no active risk model; defaulting to manual review"
                        .to_string(),
                    model_version: None,
                });
            }
            Err(other) => return Err(other.into()),
        };

        let threshold = model.auto_approve_threshold(class);
        let evaluation = if !class.auto_approve_allowed() {
            GateEvaluation {
                decision: GateDecision::UnderReview,
                threshold,
                quorum: class.min_cab_quorum(),
                rationale: format!("{class} never auto-approves regardless of score"),
                model_version: Some(model.version.clone()),
            }
        } else if risk_score <= threshold {
            GateEvaluation {
                decision: GateDecision::AutoApproved,
                threshold,
                quorum: 0,
                rationale: format!(
                    "risk score {risk_score} within auto-approve threshold {threshold} for {class}"
                ),
                model_version: Some(model.version.clone()),
            }
        } else if risk_score <= self.config.manual_review_ceiling {
            GateEvaluation {
                decision: GateDecision::UnderReview,
                threshold,
                quorum: class.min_cab_quorum(),
                rationale: format!(
                    "risk score {risk_score} exceeds auto-approve threshold {threshold} for {class}"
                ),
                model_version: Some(model.version.clone()),
            }
        } else {
            GateEvaluation {
                decision: GateDecision::ExceptionRequired,
                threshold,
                quorum: class.min_cab_quorum(),
                rationale: format!(
                    "risk score {} exceeds the manual-review ceiling {}; a security exception is required",
                    risk_score, self.config.manual_review_ceiling
                ),
                model_version: Some(model.version.clone()),
            }
        };
        Ok(evaluation)
    }

    /// Submit a deployment for a gate decision.
    ///
    /// When the outcome is auto-approval, the request and its terminal
    /// decision record are created under the same lock: there is no window
    /// where an auto-approved request lacks its decision record.
    pub fn submit(
        &self,
        submission: DeploymentSubmission,
    ) -> Result<ApprovalRequest, GateError> {
        let evaluation = self.evaluate(submission.risk_score, submission.blast_radius)?;
        let now = chrono::Utc::now();

        let decision_hash = cab_evidence::decision_hash(&DecisionInputs {
            deployment_id: submission.deployment_id.clone(),
            evidence: submission.evidence.clone(),
            risk_score: submission.risk_score,
            blast_radius: submission.blast_radius,
            model_version: evaluation.model_version.clone(),
            threshold: evaluation.threshold,
        })?;

        let status = match evaluation.decision {
            GateDecision::AutoApproved => RequestStatus::AutoApproved,
            GateDecision::UnderReview => RequestStatus::UnderReview,
            GateDecision::ExceptionRequired => RequestStatus::ExceptionRequired,
        };

        let mut notes = Vec::new();
        if let Some(body) = submission.notes {
            notes.push(RequestNote {
                author: submission.submitter.clone(),
                body,
                noted_at: now,
            });
        }

        let request = ApprovalRequest {
            request_id: RequestId::generate(),
            correlation_id: CorrelationId::generate(),
            deployment_id: submission.deployment_id.clone(),
            evidence: submission.evidence,
            risk_score: submission.risk_score,
            blast_radius: submission.blast_radius,
            model_version: evaluation.model_version.clone(),
            status,
            quorum: evaluation.quorum,
            submitter: submission.submitter,
            approver: (status == RequestStatus::AutoApproved).then(|| AUTO_DECIDER.to_string()),
            rationale: evaluation.rationale.clone(),
            conditions: Vec::new(),
            notes,
            decision_hash,
            submitted_at: now,
            decided_at: (status == RequestStatus::AutoApproved).then_some(now),
        };

        let mut state = self.state.write().map_err(|_| GateError::LockError)?;
        if status == RequestStatus::AutoApproved {
            state.decisions.push(ApprovalDecision {
                decision_id: DecisionId::generate(),
                request_id: request.request_id.clone(),
                decision: DecisionKind::Approved,
                rationale: evaluation.rationale,
                decided_by: AUTO_DECIDER.to_string(),
                conditions: Vec::new(),
                decided_at: now,
            });
        }
        state
            .deployment_index
            .entry(submission.deployment_id)
            .or_default()
            .push(request.request_id.clone());
        state
            .requests
            .insert(request.request_id.clone(), request.clone());

        info!(
            request_id = %request.request_id,
            deployment_id = %request.deployment_id,
            class = %request.blast_radius,
            score = %request.risk_score,
            status = %request.status,
            "deployment submitted to approval gate"
        );
        Ok(request)
    }

    /// Record a human approval. Legal only from submitted/under_review.
    pub fn approve(
        &self,
        request_id: &RequestId,
        approver: impl Into<String>,
        rationale: impl Into<String>,
        conditions: Vec<String>,
    ) -> Result<ApprovalRequest, GateError> {
        self.record_human_decision(
            request_id,
            DecisionKind::Approved,
            approver.into(),
            rationale.into(),
            conditions,
        )
    }

    /// Record a human rejection. Same legality constraints as approval.
    pub fn reject(
        &self,
        request_id: &RequestId,
        rejector: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<ApprovalRequest, GateError> {
        self.record_human_decision(
            request_id,
            DecisionKind::Rejected,
            rejector.into(),
            rationale.into(),
            Vec::new(),
        )
    }

    fn record_human_decision(
        &self,
        request_id: &RequestId,
        decision: DecisionKind,
        decider: String,
        rationale: String,
        conditions: Vec<String>,
    ) -> Result<ApprovalRequest, GateError> {
        let action = match decision {
            DecisionKind::Approved => "approve",
            DecisionKind::Rejected => "reject",
        };
        let now = chrono::Utc::now();

        let mut state = self.state.write().map_err(|_| GateError::LockError)?;
        let request = state
            .requests
            .get_mut(request_id)
            .ok_or_else(|| GateError::RequestNotFound(request_id.clone()))?;

        if !request.status.accepts_human_decision() {
            warn!(
                request_id = %request_id,
                status = %request.status,
                action,
                "illegal state transition attempt on approval request"
            );
            return Err(GateError::InvalidState {
                request_id: request_id.clone(),
                status: request.status,
                action,
            });
        }

        request.status = match decision {
            DecisionKind::Approved => RequestStatus::Approved,
            DecisionKind::Rejected => RequestStatus::Rejected,
        };
        request.approver = Some(decider.clone());
        request.rationale = rationale.clone();
        request.conditions = conditions.clone();
        request.decided_at = Some(now);
        let snapshot = request.clone();

        // Status and decision record commit under the same lock.
        state.decisions.push(ApprovalDecision {
            decision_id: DecisionId::generate(),
            request_id: request_id.clone(),
            decision,
            rationale,
            decided_by: decider,
            conditions,
            decided_at: now,
        });

        info!(
            request_id = %request_id,
            status = %snapshot.status,
            decided_by = %snapshot.approver.as_deref().unwrap_or(""),
            "approval request decided"
        );
        Ok(snapshot)
    }

    /// Append a note to a request. Allowed in any status; notes are the one
    /// append-only mutation a terminal request accepts.
    pub fn append_note(
        &self,
        request_id: &RequestId,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), GateError> {
        let mut state = self.state.write().map_err(|_| GateError::LockError)?;
        let request = state
            .requests
            .get_mut(request_id)
            .ok_or_else(|| GateError::RequestNotFound(request_id.clone()))?;
        request.notes.push(RequestNote {
            author: author.into(),
            body: body.into(),
            noted_at: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Open a time-boxed exception for a deployment.
    ///
    /// Fails validation unless at least one compensating control is named
    /// and the expiry is within 1..=90 days.
    pub fn create_exception(&self, request: ExceptionRequest) -> Result<Exception, GateError> {
        let mut violations = Vec::new();
        if request.compensating_controls.iter().all(|c| c.trim().is_empty()) {
            violations.push(
                "at least one compensating control must be named".to_string(),
            );
        }
        if request.expiry_days < 1 || request.expiry_days > MAX_EXCEPTION_DAYS {
            violations.push(format!(
                "expiry of {} days is outside the allowed 1..={} day window",
                request.expiry_days, MAX_EXCEPTION_DAYS
            ));
        }
        if !violations.is_empty() {
            return Err(GateError::Validation(violations));
        }

        let now = chrono::Utc::now();
        let exception = Exception {
            exception_id: ExceptionId::generate(),
            correlation_id: CorrelationId::generate(),
            deployment_id: request.deployment_id,
            reason: request.reason,
            risk_justification: request.risk_justification,
            compensating_controls: request.compensating_controls,
            requested_by: request.requested_by,
            status: ExceptionStatus::Pending,
            review: None,
            created_at: now,
            expires_at: now + chrono::Duration::days(request.expiry_days),
        };

        let mut state = self.state.write().map_err(|_| GateError::LockError)?;
        state
            .exceptions
            .insert(exception.exception_id.clone(), exception.clone());

        info!(
            exception_id = %exception.exception_id,
            deployment_id = %exception.deployment_id,
            expires_at = %exception.expires_at,
            "security exception opened"
        );
        Ok(exception)
    }

    pub fn approve_exception(
        &self,
        exception_id: &ExceptionId,
        reviewer: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<Exception, GateError> {
        self.review_exception_at(
            exception_id,
            ExceptionStatus::Approved,
            reviewer.into(),
            rationale.into(),
            chrono::Utc::now(),
        )
    }

    pub fn reject_exception(
        &self,
        exception_id: &ExceptionId,
        reviewer: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<Exception, GateError> {
        self.review_exception_at(
            exception_id,
            ExceptionStatus::Rejected,
            reviewer.into(),
            rationale.into(),
            chrono::Utc::now(),
        )
    }

    /// Review an exception with an explicit clock, for schedulers and tests.
    ///
    /// Reviewing a pending exception past its expiry transitions it to
    /// expired and fails the attempt: an expired exception can never become
    /// approved retroactively.
    pub fn review_exception_at(
        &self,
        exception_id: &ExceptionId,
        verdict: ExceptionStatus,
        reviewer: String,
        rationale: String,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Exception, GateError> {
        debug_assert!(matches!(
            verdict,
            ExceptionStatus::Approved | ExceptionStatus::Rejected
        ));
        let action = match verdict {
            ExceptionStatus::Approved => "approve",
            _ => "reject",
        };

        let mut state = self.state.write().map_err(|_| GateError::LockError)?;
        let exception = state
            .exceptions
            .get_mut(exception_id)
            .ok_or_else(|| GateError::ExceptionNotFound(exception_id.clone()))?;

        if exception.status != ExceptionStatus::Pending {
            return Err(GateError::InvalidExceptionState {
                exception_id: exception_id.clone(),
                status: exception.status,
                action,
            });
        }
        if exception.is_expired_at(now) {
            exception.status = ExceptionStatus::Expired;
            warn!(
                exception_id = %exception_id,
                expired_at = %exception.expires_at,
                "exception expired before review"
            );
            return Err(GateError::ExceptionExpired(exception_id.clone()));
        }

        exception.status = verdict;
        exception.review = Some(ExceptionReview {
            reviewer,
            rationale,
            decided_at: now,
        });
        let snapshot = exception.clone();
        info!(
            exception_id = %exception_id,
            status = %snapshot.status,
            "security exception reviewed"
        );
        Ok(snapshot)
    }

    /// Fetch an exception, lazily expiring it when overdue.
    pub fn exception(&self, exception_id: &ExceptionId) -> Result<Exception, GateError> {
        self.exception_at(exception_id, chrono::Utc::now())
    }

    pub fn exception_at(
        &self,
        exception_id: &ExceptionId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Exception, GateError> {
        let mut state = self.state.write().map_err(|_| GateError::LockError)?;
        let exception = state
            .exceptions
            .get_mut(exception_id)
            .ok_or_else(|| GateError::ExceptionNotFound(exception_id.clone()))?;
        if exception.status == ExceptionStatus::Pending && exception.is_expired_at(now) {
            exception.status = ExceptionStatus::Expired;
        }
        Ok(exception.clone())
    }

    /// Sweep job: expire every overdue pending exception.
    pub fn expire_overdue(&self) -> Result<Vec<ExceptionId>, GateError> {
        self.expire_overdue_at(chrono::Utc::now())
    }

    pub fn expire_overdue_at(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<ExceptionId>, GateError> {
        let mut state = self.state.write().map_err(|_| GateError::LockError)?;
        let mut expired = Vec::new();
        for exception in state.exceptions.values_mut() {
            if exception.status == ExceptionStatus::Pending && exception.is_expired_at(now) {
                exception.status = ExceptionStatus::Expired;
                expired.push(exception.exception_id.clone());
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "expired overdue exceptions");
        }
        Ok(expired)
    }

    pub fn request(&self, request_id: &RequestId) -> Result<ApprovalRequest, GateError> {
        let state = self.state.read().map_err(|_| GateError::LockError)?;
        state
            .requests
            .get(request_id)
            .cloned()
            .ok_or_else(|| GateError::RequestNotFound(request_id.clone()))
    }

    pub fn requests_for_deployment(
        &self,
        deployment_id: &DeploymentId,
    ) -> Result<Vec<ApprovalRequest>, GateError> {
        let state = self.state.read().map_err(|_| GateError::LockError)?;
        Ok(state
            .deployment_index
            .get(deployment_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.requests.get(id))
            .cloned()
            .collect())
    }

    pub fn decisions_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalDecision>, GateError> {
        let state = self.state.read().map_err(|_| GateError::LockError)?;
        Ok(state
            .decisions
            .iter()
            .filter(|d| &d.request_id == request_id)
            .cloned()
            .collect())
    }

    /// Most recent decisions first.
    pub fn decision_history(&self, limit: usize) -> Result<Vec<ApprovalDecision>, GateError> {
        let state = self.state.read().map_err(|_| GateError::LockError)?;
        Ok(state.decisions.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cab_registry::{OperatingMode, RiskModelVersion};
    use proptest::prelude::*;
    use std::collections::{BTreeMap, HashMap as StdHashMap};

    fn registry_with_active_model() -> Arc<RiskModelRegistry> {
        let registry = Arc::new(RiskModelRegistry::new());
        let version = RiskModelVersion {
            version: "1.0".to_string(),
            mode: OperatingMode::Conservative,
            effective_date: chrono::Utc::now(),
            review_date: None,
            active: false,
            cab_approval: None,
            auto_approve_thresholds: StdHashMap::from([
                (
                    BlastRadiusClass::ProductivityTools,
                    RiskScore::from_points(50).unwrap(),
                ),
                (
                    BlastRadiusClass::NonCritical,
                    RiskScore::from_points(70).unwrap(),
                ),
                (
                    BlastRadiusClass::BusinessCritical,
                    RiskScore::from_points(20).unwrap(),
                ),
            ]),
            risk_factor_weights: BTreeMap::from([
                ("vulnerability_density".to_string(), cab_types::BasisPoints::new(5_000)),
                ("rollback_readiness".to_string(), cab_types::BasisPoints::new(5_000)),
            ]),
            calibration_evidence: serde_json::json!({}),
        };
        registry.insert_draft(version).unwrap();
        registry
            .record_cab_approval("1.0", "cab-chair", "initial calibration")
            .unwrap();
        registry.activate("1.0").unwrap();
        registry
    }

    fn engine() -> ApprovalGateEngine {
        ApprovalGateEngine::new(registry_with_active_model(), GateConfig::default())
    }

    fn submission(score: RiskScore, class: BlastRadiusClass) -> DeploymentSubmission {
        DeploymentSubmission {
            deployment_id: DeploymentId::new("dep-1"),
            evidence: EvidenceRef::new("ev-1", "cafe0123"),
            risk_score: score,
            blast_radius: class,
            submitter: "pipeline".to_string(),
            notes: None,
        }
    }

    fn exception_request(days: i64, controls: Vec<String>) -> ExceptionRequest {
        ExceptionRequest {
            deployment_id: DeploymentId::new("dep-1"),
            requested_by: "release-manager".to_string(),
            reason: "zero-day hotfix".to_string(),
            risk_justification: "vendor patch outpaces our review cycle".to_string(),
            compensating_controls: controls,
            expiry_days: days,
        }
    }

    #[test]
    fn score_at_threshold_auto_approves_and_just_over_does_not() {
        let engine = engine();
        let at = engine
            .evaluate(
                RiskScore::from_points(50).unwrap(),
                BlastRadiusClass::ProductivityTools,
            )
            .unwrap();
        assert_eq!(at.decision, GateDecision::AutoApproved);
        assert_eq!(at.quorum, 0);

        let over = engine
            .evaluate(
                RiskScore::from_hundredths(5_001).unwrap(),
                BlastRadiusClass::ProductivityTools,
            )
            .unwrap();
        assert_eq!(over.decision, GateDecision::UnderReview);
        assert_eq!(
            over.quorum,
            BlastRadiusClass::ProductivityTools.min_cab_quorum()
        );
    }

    #[test]
    fn ceiling_is_inclusive_for_manual_review() {
        let engine = engine();
        let at_ceiling = engine
            .evaluate(
                RiskScore::from_points(75).unwrap(),
                BlastRadiusClass::NonCritical,
            )
            .unwrap();
        assert_eq!(at_ceiling.decision, GateDecision::UnderReview);

        let over_ceiling = engine
            .evaluate(
                RiskScore::from_hundredths(7_501).unwrap(),
                BlastRadiusClass::NonCritical,
            )
            .unwrap();
        assert_eq!(over_ceiling.decision, GateDecision::ExceptionRequired);
    }

    #[test]
    fn critical_infrastructure_is_vetoed_at_any_score() {
        let engine = engine();
        let result = engine
            .evaluate(
                RiskScore::from_points(80).unwrap(),
                BlastRadiusClass::CriticalInfrastructure,
            )
            .unwrap();
        assert_eq!(result.decision, GateDecision::UnderReview);
        assert_eq!(result.quorum, 3);
    }

    #[test]
    fn missing_active_model_defaults_to_manual_review() {
        let engine =
            ApprovalGateEngine::new(Arc::new(RiskModelRegistry::new()), GateConfig::default());
        let result = engine
            .evaluate(RiskScore::ZERO, BlastRadiusClass::NonCritical)
            .unwrap();
        assert_eq!(result.decision, GateDecision::UnderReview);
        assert!(result.model_version.is_none());
        assert!(result.rationale.contains("no active risk model"));
    }

    #[test]
    fn auto_approval_writes_request_and_decision_together() {
        let engine = engine();
        let request = engine
            .submit(submission(
                RiskScore::from_points(45).unwrap(),
                BlastRadiusClass::ProductivityTools,
            ))
            .unwrap();
        assert_eq!(request.status, RequestStatus::AutoApproved);
        assert_eq!(request.model_version.as_deref(), Some("1.0"));
        assert_eq!(request.decision_hash.len(), 64);

        let decisions = engine.decisions_for_request(&request.request_id).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].decision, DecisionKind::Approved);
        assert_eq!(decisions[0].decided_by, AUTO_DECIDER);
    }

    #[test]
    fn human_approval_from_under_review() {
        let engine = engine();
        let request = engine
            .submit(submission(
                RiskScore::from_points(60).unwrap(),
                BlastRadiusClass::ProductivityTools,
            ))
            .unwrap();
        assert_eq!(request.status, RequestStatus::UnderReview);

        let approved = engine
            .approve(
                &request.request_id,
                "cab-reviewer",
                "rollback plan verified",
                vec!["staged rollout".to_string()],
            )
            .unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.approver.as_deref(), Some("cab-reviewer"));
    }

    #[test]
    fn terminal_requests_reject_further_decisions() {
        let engine = engine();
        let request = engine
            .submit(submission(
                RiskScore::from_points(60).unwrap(),
                BlastRadiusClass::ProductivityTools,
            ))
            .unwrap();
        engine
            .reject(&request.request_id, "cab-reviewer", "missing SBOM")
            .unwrap();

        let err = engine
            .approve(&request.request_id, "cab-reviewer", "retry", Vec::new())
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidState { .. }));

        // The original decision record is unchanged and no new one appeared.
        let decisions = engine.decisions_for_request(&request.request_id).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].decision, DecisionKind::Rejected);
    }

    #[test]
    fn high_score_requires_exception() {
        let engine = engine();
        let request = engine
            .submit(submission(
                RiskScore::from_points(80).unwrap(),
                BlastRadiusClass::NonCritical,
            ))
            .unwrap();
        assert_eq!(request.status, RequestStatus::ExceptionRequired);

        // exception_required is not terminal, but a direct approve is
        // still illegal.
        let err = engine
            .approve(&request.request_id, "cab-reviewer", "approved", Vec::new())
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidState { .. }));
    }

    #[test]
    fn exception_validation_collects_every_violation() {
        let engine = engine();
        let err = engine
            .create_exception(exception_request(120, vec![]))
            .unwrap_err();
        match err {
            GateError::Validation(violations) => assert_eq!(violations.len(), 2),
            other => panic!("unexpected error: {other}"),
        }

        // One control and the maximum lifetime is legal.
        let exception = engine
            .create_exception(exception_request(
                90,
                vec!["network isolation during rollout".to_string()],
            ))
            .unwrap();
        assert_eq!(exception.status, ExceptionStatus::Pending);
        assert!(exception.expires_at - exception.created_at <= chrono::Duration::days(90));
    }

    #[test]
    fn expired_exception_can_never_be_approved() {
        let engine = engine();
        let exception = engine
            .create_exception(exception_request(
                1,
                vec!["manual smoke test".to_string()],
            ))
            .unwrap();

        let later = exception.expires_at + chrono::Duration::seconds(1);
        let err = engine
            .review_exception_at(
                &exception.exception_id,
                ExceptionStatus::Approved,
                "security-reviewer".to_string(),
                "late".to_string(),
                later,
            )
            .unwrap_err();
        assert!(matches!(err, GateError::ExceptionExpired(_)));

        let refreshed = engine.exception(&exception.exception_id).unwrap();
        assert_eq!(refreshed.status, ExceptionStatus::Expired);

        // Still expired: a second attempt is an invalid-state error.
        let err = engine
            .review_exception_at(
                &exception.exception_id,
                ExceptionStatus::Approved,
                "security-reviewer".to_string(),
                "again".to_string(),
                later,
            )
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidExceptionState { .. }));
    }

    #[test]
    fn sweep_expires_overdue_pending_exceptions() {
        let engine = engine();
        let exception = engine
            .create_exception(exception_request(2, vec!["egress block".to_string()]))
            .unwrap();

        let expired = engine
            .expire_overdue_at(exception.expires_at + chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(expired, vec![exception.exception_id.clone()]);
    }

    proptest! {
        /// The hard veto holds for every possible score.
        #[test]
        fn veto_class_never_auto_approves(hundredths in 0u32..=10_000) {
            let engine = engine();
            let score = RiskScore::from_hundredths(hundredths).unwrap();
            let result = engine
                .evaluate(score, BlastRadiusClass::CriticalInfrastructure)
                .unwrap();
            prop_assert_ne!(result.decision, GateDecision::AutoApproved);
        }

        /// Auto-approval happens exactly when the score is at or below the
        /// class threshold, for classes where it is permitted at all.
        #[test]
        fn threshold_comparison_is_inclusive(hundredths in 0u32..=10_000) {
            let engine = engine();
            let score = RiskScore::from_hundredths(hundredths).unwrap();
            let result = engine
                .evaluate(score, BlastRadiusClass::ProductivityTools)
                .unwrap();
            let threshold = RiskScore::from_points(50).unwrap();
            prop_assert_eq!(
                result.decision == GateDecision::AutoApproved,
                score <= threshold
            );
        }
    }
}
