//! Walks a seeded gate through the three decision paths and prints the
//! resulting requests. Useful for eyeballing log output and decision hashes.

use anyhow::Result;
use cab_registry::{OperatingMode, RiskModelVersion};
use cab_service::{telemetry, DeploymentGateService, DeploymentRequest, ServiceConfig};
use cab_classifier::DeploymentAttributes;
use cab_types::{BasisPoints, BlastRadiusClass, DeploymentId, EvidenceRef, RiskScore};
use std::collections::{BTreeMap, HashMap};

fn baseline_model() -> Result<RiskModelVersion> {
    Ok(RiskModelVersion {
        version: "1.0".to_string(),
        mode: OperatingMode::Balanced,
        effective_date: chrono::Utc::now(),
        review_date: None,
        active: false,
        cab_approval: None,
        auto_approve_thresholds: HashMap::from([
            (BlastRadiusClass::ProductivityTools, RiskScore::from_points(50)?),
            (BlastRadiusClass::NonCritical, RiskScore::from_points(70)?),
        ]),
        risk_factor_weights: BTreeMap::from([
            ("vulnerability_density".to_string(), BasisPoints::new(4_000)),
            ("publisher_trust".to_string(), BasisPoints::new(3_000)),
            ("rollback_readiness".to_string(), BasisPoints::new(3_000)),
        ]),
        calibration_evidence: serde_json::json!({"window": "2026-Q2"}),
    })
}

fn main() -> Result<()> {
    telemetry::init();

    let service = DeploymentGateService::new(ServiceConfig::default())?;
    service.register_model_draft(baseline_model()?)?;
    service.approve_model("1.0", "cab-chair", "quarterly calibration")?;
    service.activate_model("1.0")?;

    let cases = [
        ("slack desktop client", 45),
        ("vpn client", 20),
        ("bespoke lab tool", 82),
    ];
    for (app, score) in cases {
        let outcome = service.submit_deployment(DeploymentRequest {
            deployment_id: DeploymentId::new(format!("demo-{}", app.replace(' ', "-"))),
            attributes: DeploymentAttributes::new(app),
            evidence: EvidenceRef::new(format!("ev-{app}"), "deadbeef"),
            risk_score: RiskScore::from_points(score)?,
            submitter: "gate-demo".to_string(),
            notes: None,
            class_override: None,
        })?;
        println!(
            "{app}: class={} status={} hash={}",
            outcome.effective_class, outcome.request.status, outcome.request.decision_hash
        );
    }
    Ok(())
}
