//! Fixed-point numerics for scores, weights, and rates.
//!
//! Threshold comparisons are compliance-visible, so every score is a scaled
//! integer. Binary floating point never appears in a persisted field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A deployment risk score in the range 0.00..=100.00, stored as hundredths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(u32);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("risk score {0} hundredths exceeds the 0.00..=100.00 range")]
pub struct ScoreOutOfRange(pub u32);

impl RiskScore {
    pub const ZERO: RiskScore = RiskScore(0);
    pub const MAX: RiskScore = RiskScore(10_000);

    /// Build a score from hundredths of a point (4550 => 45.50).
    pub fn from_hundredths(hundredths: u32) -> Result<Self, ScoreOutOfRange> {
        if hundredths > Self::MAX.0 {
            return Err(ScoreOutOfRange(hundredths));
        }
        Ok(Self(hundredths))
    }

    /// Build a score from whole points (45 => 45.00).
    pub fn from_points(points: u32) -> Result<Self, ScoreOutOfRange> {
        Self::from_hundredths(points.saturating_mul(100))
    }

    pub const fn hundredths(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for RiskScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// A ratio stored in basis points (10 000 = 1.0).
///
/// Used for risk-factor weights and incident rates. Unlike [`RiskScore`]
/// this is unbounded above: an incident rate can legitimately exceed 1.0
/// when a window holds more incidents than estimated deployments.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BasisPoints(u32);

impl BasisPoints {
    pub const ZERO: BasisPoints = BasisPoints(0);
    /// One whole unit (1.0, i.e. 100%).
    pub const UNIT: BasisPoints = BasisPoints(10_000);

    pub const fn new(basis_points: u32) -> Self {
        Self(basis_points)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }

    pub fn checked_add(self, other: BasisPoints) -> Option<BasisPoints> {
        self.0.checked_add(other.0).map(BasisPoints)
    }

    /// Ratio of `numerator / denominator`, rounded to the nearest basis point.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Option<BasisPoints> {
        if denominator == 0 {
            return None;
        }
        let scaled = numerator.checked_mul(10_000)?;
        u32::try_from((scaled + denominator / 2) / denominator)
            .ok()
            .map(BasisPoints)
    }
}

impl std::fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds_are_enforced() {
        assert_eq!(RiskScore::from_hundredths(10_000), Ok(RiskScore::MAX));
        assert_eq!(
            RiskScore::from_hundredths(10_001),
            Err(ScoreOutOfRange(10_001))
        );
        assert!(RiskScore::from_points(101).is_err());
    }

    #[test]
    fn score_ordering_is_exact_at_hundredths() {
        let threshold = RiskScore::from_points(50).unwrap();
        let just_over = RiskScore::from_hundredths(5_001).unwrap();
        assert!(threshold <= threshold);
        assert!(just_over > threshold);
    }

    #[test]
    fn score_display_keeps_two_decimals() {
        assert_eq!(RiskScore::from_hundredths(4_505).unwrap().to_string(), "45.05");
        assert_eq!(RiskScore::ZERO.to_string(), "0.00");
    }

    #[test]
    fn ratio_rounds_to_nearest_basis_point() {
        // 3 incidents over 400 deployments = 0.75% = 75 bp
        assert_eq!(BasisPoints::from_ratio(3, 400), Some(BasisPoints::new(75)));
        assert_eq!(BasisPoints::from_ratio(1, 3), Some(BasisPoints::new(3_333)));
        assert_eq!(BasisPoints::from_ratio(1, 0), None);
    }

    #[test]
    fn ratio_can_exceed_unit() {
        assert_eq!(
            BasisPoints::from_ratio(5, 2),
            Some(BasisPoints::new(25_000))
        );
    }
}
