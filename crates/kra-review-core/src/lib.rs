//! # KRA Review Core - The Logic
//!
//! Deterministic engine for staged performance reviews organised around
//! Key Result Areas (KRAs) and their linked Goals.
//!
//! ## Layout
//!
//! - [`model`]: the review aggregate (`ReviewData` -> KRAs -> Goals)
//! - [`evidence`]: evidence metadata, upload validation, size labels
//! - [`workflow`]: stages, permission gating, submission
//! - [`mutation`]: closed edit variants applied to immutable snapshots
//! - [`scoring`]: fixed-point weighted scores and performance bands
//!
//! ## Constraints
//!
//! - No async, no I/O, no wall clock: timestamps are passed in by callers
//! - No floats: scores are integers in ten-thousandths
//! - Every mutation returns a new `ReviewData`; inputs are never modified

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod evidence;
pub mod model;
pub mod mutation;
pub mod scoring;
pub mod workflow;

pub use evidence::{EvidenceFile, EvidenceUpload, format_size};
pub use model::{
    AchievementLevel, GoalInReview, GoalR1Validation, GoalR2Validation, GoalSelfAssessment,
    GoalStatus, KraInReview, OverallStatus, R1Review, R2Review, ReviewData, ReviewPeriod,
    SelfAssessment,
};
pub use mutation::{
    GoalR1Edit, GoalR2Edit, GoalSelfEdit, R1ReviewEdit, R2ReviewEdit, ReviewEdit,
    SelfAssessmentEdit,
};
pub use scoring::{KraScore, PerformanceBand, Score, ScoreSummary};
pub use workflow::{DenialPolicy, Gate, GatedAction, Section, Stage, can_edit};

// =============================================================================
// PRIMITIVES
// =============================================================================

/// Highest rating a reviewer may give on any KRA.
pub const MAX_RATING: u8 = 10;

/// Highest goal progress percentage.
pub const MAX_PROGRESS: u8 = 100;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

string_id!(
    /// Identity of one review instance (one employee, one cycle).
    ReviewId
);
string_id!(
    /// Identity of the employee under review.
    EmployeeId
);
string_id!(
    /// Identity of a KRA within a review.
    KraId
);
string_id!(
    /// Identity of a Goal within its owning KRA.
    GoalId
);
string_id!(
    /// Identity of an uploaded evidence file.
    EvidenceId
);

/// Role of the person acting on a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    /// First-line reviewer (R1).
    TeamLead,
    /// Second-line reviewer (R2). Also allowed to act at R1.
    Manager,
    /// Finalizes reviews at the `hr` stage; never edits assessments.
    Hr,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::TeamLead => "team_lead",
            Self::Manager => "manager",
            Self::Hr => "hr",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "employee" => Ok(Self::Employee),
            "team_lead" | "teamlead" | "r1" => Ok(Self::TeamLead),
            "manager" | "r2" => Ok(Self::Manager),
            "hr" => Ok(Self::Hr),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The person performing an operation.
///
/// Passed explicitly into every gated call; nothing in the core reads
/// ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: EmployeeId,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(user_id: impl Into<EmployeeId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

impl From<String> for EmployeeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Input rejected before any state change was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("file '{name}' is {size_bytes} bytes, limit is {limit_bytes} bytes")]
    FileTooLarge {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("file '{name}' has unsupported type '{mime_type}'")]
    UnsupportedType { name: String, mime_type: String },

    #[error("rating {0} is outside 0..={MAX_RATING}")]
    RatingOutOfRange(u8),

    #[error("progress {0} is outside 0..={MAX_PROGRESS}")]
    ProgressOutOfRange(u8),

    /// Submission completeness failures, one message per missing field.
    #[error("review is incomplete: {}", .0.join("; "))]
    Incomplete(Vec<String>),
}

/// Errors produced by the review engine and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("{role} may not {action} at stage {stage}")]
    PermissionDenied {
        role: Role,
        stage: Stage,
        action: GatedAction,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("review cannot advance from stage {from}")]
    InvalidTransition { from: Stage },

    /// A save/submit/upload/delete collaborator rejected or timed out.
    #[error("external collaborator failed: {0}")]
    ExternalFailure(String),
}

impl ReviewError {
    /// Messages carried by a completeness failure, empty for other kinds.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Validation(ValidationError::Incomplete(messages)) => messages,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn role_parses_aliases() {
        assert_eq!("r1".parse::<Role>(), Ok(Role::TeamLead));
        assert_eq!("Manager".parse::<Role>(), Ok(Role::Manager));
        assert!("ceo".parse::<Role>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&KraId::new("kra-1")).unwrap();
        assert_eq!(json, "\"kra-1\"");
    }

    #[test]
    fn incomplete_error_lists_messages() {
        let err = ReviewError::from(ValidationError::Incomplete(vec![
            "a is required".to_string(),
            "b is required".to_string(),
        ]));
        assert_eq!(err.messages().len(), 2);
        assert!(err.to_string().contains("a is required; b is required"));
    }
}
