//! CAB Maturity - trust-maturity progression
//!
//! Periodically evaluates incident history against the next rung of a fixed
//! maturity ladder and recommends (never applies) looser automation
//! thresholds. Every evaluation, pass or fail, is persisted as audit
//! evidence of due diligence.

#![deny(unsafe_code)]

mod engine;
mod ladder;

pub use engine::{
    Criterion, CriterionResult, EvaluationResult, MaturityConfig, ProgressStatus,
    Recommendation, SeverityCounts, TrustMaturityEngine, TrustMaturityProgress,
};
pub use ladder::{MaturityLadder, TrustMaturityLevel};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MaturityError {
    /// Ladder misconfiguration: unknown level, missing rung, bad estimates.
    #[error("maturity configuration error: {0}")]
    Configuration(String),

    #[error("maturity progress record not found: {0}")]
    ProgressNotFound(String),

    /// Promotion was requested for an evaluation that did not meet criteria.
    #[error("promotion not permitted: {0}")]
    PromotionNotReady(String),

    #[error("lock error")]
    LockError,
}
