//! # Score Aggregation
//!
//! Weighted per-KRA scores and the overall performance band.
//!
//! ```text
//! finalScore(kra) = (self*0.2 + r1*0.4 + r2*0.4) * weightage/100
//! overall         = sum of finalScore over all KRAs
//! ```
//!
//! Evaluated exactly in integer ten-thousandths:
//! `(self*20 + r1*40 + r2*40) * weightage`. Missing ratings count as 0,
//! so a KRA without an R2 rating still contributes its partial score.
//!
//! Nothing here is cached; call [`summarize`] again after any change.

use crate::KraId;
use crate::model::{KraInReview, ReviewData};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// FIXED-POINT SCORE
// =============================================================================

/// Number of score units per whole point.
pub const SCORE_SCALE: u32 = 10_000;

/// Reviewer weights in percent. Must sum to 100.
pub const SELF_WEIGHT: u32 = 20;
pub const R1_WEIGHT: u32 = 40;
pub const R2_WEIGHT: u32 = 40;

/// A score in ten-thousandths of a point (`2.28` is `22800`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Score(u32);

impl Score {
    pub const ZERO: Score = Score(0);

    #[must_use]
    pub const fn from_ten_thousandths(units: u32) -> Self {
        Self(units)
    }

    #[must_use]
    pub const fn from_points(points: u32) -> Self {
        Self(points.saturating_mul(SCORE_SCALE))
    }

    #[must_use]
    pub const fn ten_thousandths(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn saturating_add(self, other: Score) -> Score {
        Score(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Score {
    /// Decimal with up to four places, trailing zeros dropped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCORE_SCALE;
        let mut frac = self.0 % SCORE_SCALE;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let mut width = 4;
        while frac % 10 == 0 {
            frac /= 10;
            width -= 1;
        }
        write!(f, "{whole}.{frac:0width$}")
    }
}

// =============================================================================
// PERFORMANCE BAND
// =============================================================================

/// Overall classification of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceBand {
    Green,
    Yellow,
    Red,
}

/// Lowest overall score classified GREEN.
pub const GREEN_THRESHOLD: Score = Score::from_points(8);
/// Lowest overall score classified YELLOW.
pub const YELLOW_THRESHOLD: Score = Score::from_points(5);

impl PerformanceBand {
    #[must_use]
    pub fn classify(overall: Score) -> Self {
        if overall >= GREEN_THRESHOLD {
            Self::Green
        } else if overall >= YELLOW_THRESHOLD {
            Self::Yellow
        } else {
            Self::Red
        }
    }
}

impl fmt::Display for PerformanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        })
    }
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Weighted score of one KRA.
#[must_use]
pub fn kra_score(kra: &KraInReview) -> Score {
    let blended = u32::from(kra.self_assessment.rating) * SELF_WEIGHT
        + u32::from(kra.r1_review.rating) * R1_WEIGHT
        + u32::from(kra.r2_review.rating) * R2_WEIGHT;
    Score(blended.saturating_mul(u32::from(kra.weightage)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KraScore {
    pub kra_id: KraId,
    pub name: String,
    pub weightage: u8,
    pub self_rating: u8,
    pub r1_rating: u8,
    pub r2_rating: u8,
    pub final_score: Score,
}

/// Derived, read-only metrics for a review snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub kras: Vec<KraScore>,
    pub overall_score: Score,
    pub band: PerformanceBand,
}

/// Compute per-KRA scores, the overall score and its band.
#[must_use]
pub fn summarize(review: &ReviewData) -> ScoreSummary {
    let kras: Vec<KraScore> = review
        .kras
        .iter()
        .map(|kra| KraScore {
            kra_id: kra.id.clone(),
            name: kra.name.clone(),
            weightage: kra.weightage,
            self_rating: kra.self_assessment.rating,
            r1_rating: kra.r1_review.rating,
            r2_rating: kra.r2_review.rating,
            final_score: kra_score(kra),
        })
        .collect();

    let overall_score = kras
        .iter()
        .fold(Score::ZERO, |acc, k| acc.saturating_add(k.final_score));

    ScoreSummary {
        band: PerformanceBand::classify(overall_score),
        overall_score,
        kras,
    }
}

/// Shortcut for the overall score alone.
#[must_use]
pub fn overall_score(review: &ReviewData) -> Score {
    review
        .kras
        .iter()
        .fold(Score::ZERO, |acc, kra| acc.saturating_add(kra_score(kra)))
}

// =============================================================================
// TESTS
// =============================================================================
