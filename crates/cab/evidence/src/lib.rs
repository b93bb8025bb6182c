//! CAB Evidence - canonical hashing of decision inputs
//!
//! Every gate decision is hashed over a canonical, sorted-key serialization
//! of its inputs so auditors can independently verify that a recorded
//! decision matches the evidence it was based on.

#![deny(unsafe_code)]

use cab_types::{BlastRadiusClass, DeploymentId, EvidenceRef, RiskScore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use thiserror::Error;

/// The inputs a gate decision is computed from, in hashable form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionInputs {
    pub deployment_id: DeploymentId,
    pub evidence: EvidenceRef,
    pub risk_score: RiskScore,
    pub blast_radius: BlastRadiusClass,
    /// Empty when no model was active and the gate fell back to manual review.
    pub model_version: Option<String>,
    pub threshold: RiskScore,
}

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SHA-256 over the canonical rendering of the decision inputs, hex encoded.
pub fn decision_hash(inputs: &DecisionInputs) -> Result<String, EvidenceError> {
    let value = serde_json::to_value(inputs)?;
    Ok(sha256_hex(canonical_json(&value).as_bytes()))
}

/// Render a JSON value with object keys sorted at every level.
///
/// Arrays keep their order: the position of a compensating control or a
/// rule reference is meaningful.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // String serialization of a key cannot fail.
                out.push_str(&serde_json::to_string(key).unwrap_or_default());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => {
            out.push_str(&other.to_string());
        }
    }
}

/// Hex-encoded SHA-256 digest of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
