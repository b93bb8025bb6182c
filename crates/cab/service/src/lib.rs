//! CAB Service - the platform-facing facade.
//!
//! Wires the blast-radius classifier, the risk-model registry, the approval
//! gate, and the trust-maturity engine into one surface the deployment
//! pipeline calls. The facade owns no policy of its own: it sequences the
//! components and translates their errors.

#![deny(unsafe_code)]

pub mod telemetry;

use cab_classifier::{BlastRadiusClassifier, Classification, ClassifierConfig, DeploymentAttributes};
use cab_gate::{
    ApprovalGateEngine, ApprovalRequest, DeploymentSubmission, Exception, ExceptionRequest,
    GateConfig, GateError,
};
use cab_maturity::{
    EvaluationResult, MaturityConfig, MaturityError, MaturityLadder, TrustMaturityEngine,
    TrustMaturityProgress,
};
use cab_registry::{RegistryError, RiskModelRegistry, RiskModelVersion};
use cab_types::{
    BlastRadiusClass, DeploymentIncident, DeploymentId, EvidenceRef, ExceptionId, RequestId,
    RiskScore,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Maturity(#[from] MaturityError),

    /// A manual blast-radius override diverged from the automatic class
    /// without a justification.
    #[error(
        "blast-radius override to {proposed} rejected: classified as {auto} and no justification given"
    )]
    OverrideRejected {
        auto: BlastRadiusClass,
        proposed: BlastRadiusClass,
    },
}

/// Facade-level configuration, one field per component.
pub struct ServiceConfig {
    pub classifier: ClassifierConfig,
    pub gate: GateConfig,
    pub maturity: MaturityConfig,
    pub ladder: MaturityLadder,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            gate: GateConfig::default(),
            maturity: MaturityConfig::default(),
            ladder: MaturityLadder::standard(),
        }
    }
}

/// A deployment as the pipeline hands it over: attributes for
/// classification, pre-computed risk score, and evidence pointer.
#[derive(Clone, Debug)]
pub struct DeploymentRequest {
    pub deployment_id: DeploymentId,
    pub attributes: DeploymentAttributes,
    pub evidence: EvidenceRef,
    pub risk_score: RiskScore,
    pub submitter: String,
    pub notes: Option<String>,
    /// Optional manual blast-radius override; divergence from the automatic
    /// class requires a justification.
    pub class_override: Option<ClassOverride>,
}

#[derive(Clone, Debug)]
pub struct ClassOverride {
    pub class: BlastRadiusClass,
    pub justification: Option<String>,
}

/// What the pipeline gets back from a submission.
#[derive(Clone, Debug)]
pub struct SubmissionOutcome {
    pub classification: Classification,
    /// The class the gate actually evaluated (override or automatic).
    pub effective_class: BlastRadiusClass,
    pub override_applied: bool,
    pub request: ApprovalRequest,
}

/// The deployment-gate service.
pub struct DeploymentGateService {
    classifier: BlastRadiusClassifier,
    registry: Arc<RiskModelRegistry>,
    gate: ApprovalGateEngine,
    maturity: TrustMaturityEngine,
}

impl DeploymentGateService {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let registry = Arc::new(RiskModelRegistry::new());
        let gate = ApprovalGateEngine::new(registry.clone(), config.gate);
        let maturity = TrustMaturityEngine::new(config.ladder, config.maturity)?;
        Ok(Self {
            classifier: BlastRadiusClassifier::new(config.classifier),
            registry,
            gate,
            maturity,
        })
    }

    /// Classify, resolve any override, and run the gate.
    pub fn submit_deployment(
        &self,
        request: DeploymentRequest,
    ) -> Result<SubmissionOutcome, ServiceError> {
        let classification = self.classifier.classify(&request.attributes);

        let (effective_class, override_applied) = match request.class_override {
            Some(ref proposed) => {
                let validation = self.classifier.validate_manual_override(
                    &request.attributes,
                    proposed.class,
                    proposed.justification.as_deref(),
                );
                if !validation.valid {
                    return Err(ServiceError::OverrideRejected {
                        auto: validation.auto_class,
                        proposed: proposed.class,
                    });
                }
                (proposed.class, proposed.class != classification.class)
            }
            None => (classification.class, false),
        };

        let approval = self.gate.submit(DeploymentSubmission {
            deployment_id: request.deployment_id,
            evidence: request.evidence,
            risk_score: request.risk_score,
            blast_radius: effective_class,
            submitter: request.submitter,
            notes: request.notes,
        })?;

        info!(
            deployment_id = %approval.deployment_id,
            class = %effective_class,
            rule = classification.rule_id,
            override_applied,
            status = %approval.status,
            "deployment processed by gate service"
        );
        Ok(SubmissionOutcome {
            classification,
            effective_class,
            override_applied,
            request: approval,
        })
    }

    // Model lifecycle. Each step is a distinct call so the draft / CAB
    // sign-off / activation sequence stays visible in the audit log.

    pub fn register_model_draft(&self, version: RiskModelVersion) -> Result<(), ServiceError> {
        Ok(self.registry.insert_draft(version)?)
    }

    pub fn approve_model(
        &self,
        version: &str,
        approver: &str,
        rationale: &str,
    ) -> Result<(), ServiceError> {
        Ok(self
            .registry
            .record_cab_approval(version, approver, rationale)?)
    }

    pub fn activate_model(&self, version: &str) -> Result<RiskModelVersion, ServiceError> {
        Ok(self.registry.activate(version)?)
    }

    pub fn active_model(&self) -> Result<RiskModelVersion, ServiceError> {
        Ok(self.registry.active_version()?)
    }

    // Human review pass-throughs.

    pub fn approve_request(
        &self,
        request_id: &RequestId,
        approver: &str,
        rationale: &str,
        conditions: Vec<String>,
    ) -> Result<ApprovalRequest, ServiceError> {
        Ok(self.gate.approve(request_id, approver, rationale, conditions)?)
    }

    pub fn reject_request(
        &self,
        request_id: &RequestId,
        rejector: &str,
        rationale: &str,
    ) -> Result<ApprovalRequest, ServiceError> {
        Ok(self.gate.reject(request_id, rejector, rationale)?)
    }

    // Exception pass-throughs.

    pub fn request_exception(&self, request: ExceptionRequest) -> Result<Exception, ServiceError> {
        Ok(self.gate.create_exception(request)?)
    }

    pub fn approve_exception(
        &self,
        exception_id: &ExceptionId,
        reviewer: &str,
        rationale: &str,
    ) -> Result<Exception, ServiceError> {
        Ok(self.gate.approve_exception(exception_id, reviewer, rationale)?)
    }

    pub fn reject_exception(
        &self,
        exception_id: &ExceptionId,
        reviewer: &str,
        rationale: &str,
    ) -> Result<Exception, ServiceError> {
        Ok(self.gate.reject_exception(exception_id, reviewer, rationale)?)
    }

    // Maturity pass-throughs.

    pub fn record_incident(&self, incident: DeploymentIncident) -> Result<(), ServiceError> {
        Ok(self.maturity.record_incident(incident)?)
    }

    pub fn evaluate_maturity(
        &self,
        current_level: &str,
        window_weeks: u32,
    ) -> Result<EvaluationResult, ServiceError> {
        Ok(self.maturity.evaluate_progression(current_level, window_weeks)?)
    }

    pub fn maturity_history(&self) -> Result<Vec<TrustMaturityProgress>, ServiceError> {
        Ok(self.maturity.history()?)
    }

    // Component access for schedulers and admin tooling.

    pub fn classifier(&self) -> &BlastRadiusClassifier {
        &self.classifier
    }

    pub fn registry(&self) -> &Arc<RiskModelRegistry> {
        &self.registry
    }

    pub fn gate(&self) -> &ApprovalGateEngine {
        &self.gate
    }

    pub fn maturity(&self) -> &TrustMaturityEngine {
        &self.maturity
    }
}
