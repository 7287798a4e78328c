//! Review stages and their ordering.

use crate::model::OverallStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow phase. Ordered; a review only ever moves forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Employee self-assessment.
    #[default]
    #[serde(rename = "self")]
    SelfReview,
    /// First-line (team lead) review.
    R1,
    /// Second-line (manager) review.
    R2,
    /// HR finalization.
    Hr,
    Completed,
}

impl Stage {
    /// All stages in workflow order.
    pub const ALL: [Stage; 5] = [
        Stage::SelfReview,
        Stage::R1,
        Stage::R2,
        Stage::Hr,
        Stage::Completed,
    ];

    /// The stage that follows this one, `None` once completed.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        match self {
            Self::SelfReview => Some(Self::R1),
            Self::R1 => Some(Self::R2),
            Self::R2 => Some(Self::Hr),
            Self::Hr => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Completed
    }

    /// Overall status a review carries after arriving at this stage.
    #[must_use]
    pub fn status_on_entry(self) -> OverallStatus {
        match self {
            Self::SelfReview => OverallStatus::Draft,
            Self::R1 => OverallStatus::Submitted,
            Self::R2 | Self::Hr => OverallStatus::InReview,
            Self::Completed => OverallStatus::Approved,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfReview => "self",
            Self::R1 => "r1",
            Self::R2 => "r2",
            Self::Hr => "hr",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown stage: {s}"))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::SelfReview < Stage::R1);
        assert!(Stage::R1 < Stage::R2);
        assert!(Stage::R2 < Stage::Hr);
        assert!(Stage::Hr < Stage::Completed);
    }

    #[test]
    fn next_walks_forward_and_stops() {
        let mut stage = Stage::SelfReview;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen, Stage::ALL.to_vec());
        assert!(stage.is_terminal());
    }

    #[test]
    fn parse_and_display_agree() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>(), Ok(stage));
        }
        assert!("review".parse::<Stage>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&Stage::SelfReview).ok().as_deref(),
            Some("\"self\"")
        );
        assert_eq!(
            serde_json::from_str::<Stage>("\"r2\"").ok(),
            Some(Stage::R2)
        );
    }

    #[test]
    fn status_follows_stage() {
        assert_eq!(Stage::R1.status_on_entry(), OverallStatus::Submitted);
        assert_eq!(Stage::Hr.status_on_entry(), OverallStatus::InReview);
        assert_eq!(Stage::Completed.status_on_entry(), OverallStatus::Approved);
    }
}
