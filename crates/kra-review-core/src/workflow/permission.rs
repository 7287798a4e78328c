//! Role/stage permission engine and the gated mutation entry point.
//!
//! Rule table for editing (first match wins):
//!
//! | condition                     | result                           |
//! |-------------------------------|----------------------------------|
//! | read-only session             | false                            |
//! | stage `self`                  | Employee, or the review's owner  |
//! | stage `r1`                    | TeamLead or Manager              |
//! | stage `r2`                    | Manager                          |
//! | stage `hr` / `completed`      | false                            |
//!
//! On top of that, each section is writable only at its own stage.

use super::stage::Stage;
use super::submission;
use crate::evidence::EvidenceFile;
use crate::model::ReviewData;
use crate::mutation::{self, ReviewEdit};
use crate::{Actor, EvidenceId, GoalId, KraId, Result, ReviewError, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// SECTIONS AND ACTIONS
// =============================================================================

/// An assessment block, owned by exactly one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// KRA self-assessment, goal self-assessment, goal progress and evidence.
    SelfAssessment,
    /// KRA R1 review and goal R1 validation.
    R1,
    /// KRA R2 review and goal R2 validation.
    R2,
}

impl Section {
    /// The only stage at which this section may change.
    #[must_use]
    pub fn owning_stage(self) -> Stage {
        match self {
            Self::SelfAssessment => Stage::SelfReview,
            Self::R1 => Stage::R1,
            Self::R2 => Stage::R2,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SelfAssessment => "self-assessment",
            Self::R1 => "r1 review",
            Self::R2 => "r2 review",
        })
    }
}

/// What a gated request is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatedAction {
    Edit(Section),
    /// Persist the current draft. Allowed to anyone who may edit now.
    Save,
    Submit,
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edit(section) => write!(f, "edit {section}"),
            Self::Save => f.write_str("save"),
            Self::Submit => f.write_str("submit"),
        }
    }
}

// =============================================================================
// RULES
// =============================================================================

/// Role-only edit rule. Does not know about review ownership.
#[must_use]
pub fn can_edit(role: Role, stage: Stage, read_only: bool) -> bool {
    if read_only {
        return false;
    }
    match stage {
        Stage::SelfReview => role == Role::Employee,
        Stage::R1 => matches!(role, Role::TeamLead | Role::Manager),
        Stage::R2 => role == Role::Manager,
        Stage::Hr | Stage::Completed => false,
    }
}

/// Edit rule for a concrete actor on a concrete review.
///
/// At the `self` stage the review's own employee may edit regardless of
/// role.
#[must_use]
pub fn can_edit_review(actor: &Actor, review: &ReviewData, read_only: bool) -> bool {
    if read_only {
        return false;
    }
    if review.current_stage == Stage::SelfReview && actor.user_id == review.employee_id {
        return true;
    }
    can_edit(actor.role, review.current_stage, false)
}

// =============================================================================
// GATE
// =============================================================================

/// How a denied request is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialPolicy {
    /// Return `PermissionDenied`.
    #[default]
    Reject,
    /// Return the review unchanged, as a disabled UI control would.
    Ignore,
}

/// Outcome of a permission check that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Denied under [`DenialPolicy::Ignore`]; the caller must not mutate.
    Ignore,
}

/// Permission engine bound to one session's policy and read-only flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Gate {
    pub policy: DenialPolicy,
    pub read_only: bool,
}

impl Gate {
    #[must_use]
    pub fn new(policy: DenialPolicy, read_only: bool) -> Self {
        Self { policy, read_only }
    }

    /// Whether `actor` may perform `action` on `review` right now.
    #[must_use]
    pub fn permits(&self, actor: &Actor, review: &ReviewData, action: GatedAction) -> bool {
        if self.read_only {
            return false;
        }
        match action {
            GatedAction::Edit(section) => {
                can_edit_review(actor, review, false)
                    && section.owning_stage() == review.current_stage
            }
            GatedAction::Save => can_edit_review(actor, review, false),
            GatedAction::Submit => submission::may_submit(actor, review),
        }
    }

    /// Check a request and resolve denials through the policy.
    pub fn decide(
        &self,
        actor: &Actor,
        review: &ReviewData,
        action: GatedAction,
    ) -> Result<Decision> {
        if action == GatedAction::Submit && review.current_stage.is_terminal() {
            return Err(ReviewError::InvalidTransition {
                from: review.current_stage,
            });
        }
        if self.permits(actor, review, action) {
            return Ok(Decision::Allow);
        }
        match self.policy {
            DenialPolicy::Ignore => Ok(Decision::Ignore),
            DenialPolicy::Reject => Err(ReviewError::PermissionDenied {
                role: actor.role,
                stage: review.current_stage,
                action,
            }),
        }
    }

    /// Apply one field edit after permission and range checks.
    pub fn apply(&self, actor: &Actor, review: &ReviewData, edit: ReviewEdit) -> Result<ReviewData> {
        if self.decide(actor, review, GatedAction::Edit(edit.section()))? == Decision::Ignore {
            return Ok(review.clone());
        }
        edit.validate()?;
        Ok(edit.apply(review))
    }

    /// Attach an already-stored evidence file.
    pub fn add_evidence(
        &self,
        actor: &Actor,
        review: &ReviewData,
        kra_id: &KraId,
        goal_id: Option<&GoalId>,
        file: EvidenceFile,
    ) -> Result<ReviewData> {
        let action = GatedAction::Edit(Section::SelfAssessment);
        if self.decide(actor, review, action)? == Decision::Ignore {
            return Ok(review.clone());
        }
        Ok(mutation::add_evidence(review, kra_id, goal_id, file))
    }

    /// Drop an evidence reference. Absent ids are a no-op.
    pub fn remove_evidence(
        &self,
        actor: &Actor,
        review: &ReviewData,
        kra_id: &KraId,
        goal_id: Option<&GoalId>,
        evidence_id: &EvidenceId,
    ) -> Result<ReviewData> {
        let action = GatedAction::Edit(Section::SelfAssessment);
        if self.decide(actor, review, action)? == Decision::Ignore {
            return Ok(review.clone());
        }
        Ok(mutation::remove_evidence(review, kra_id, goal_id, evidence_id))
    }

    /// Validate the active stage and move the review one stage forward.
    pub fn submit(&self, actor: &Actor, review: &ReviewData) -> Result<ReviewData> {
        if self.decide(actor, review, GatedAction::Submit)? == Decision::Ignore {
            return Ok(review.clone());
        }
        submission::advance_stage(review)
    }
}

// =============================================================================
// TESTS
// =============================================================================
