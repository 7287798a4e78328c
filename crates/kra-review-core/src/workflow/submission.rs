//! Submission: completeness checks and one-step stage advancement.

use super::stage::Stage;
use crate::model::ReviewData;
use crate::{Actor, Result, ReviewError, Role, ValidationError};

/// Whether `actor` is the one who hands the review to the next stage.
///
/// `self`: the employee (by role or ownership); `r1`: team lead or
/// manager; `r2`: manager; `hr`: HR; `completed`: nobody.
#[must_use]
pub fn may_submit(actor: &Actor, review: &ReviewData) -> bool {
    match review.current_stage {
        Stage::SelfReview => actor.role == Role::Employee || actor.user_id == review.employee_id,
        Stage::R1 => matches!(actor.role, Role::TeamLead | Role::Manager),
        Stage::R2 => actor.role == Role::Manager,
        Stage::Hr => actor.role == Role::Hr,
        Stage::Completed => false,
    }
}

fn kra_label(index: usize, name: &str) -> String {
    format!("KRA {} ({})", index + 1, name)
}

/// Every missing field of the active stage, one message each.
///
/// Messages are collected in KRA/goal order; nothing short-circuits.
#[must_use]
pub fn completeness_issues(review: &ReviewData) -> Vec<String> {
    let mut issues = Vec::new();

    for (i, kra) in review.kras.iter().enumerate() {
        let label = kra_label(i, &kra.name);
        match review.current_stage {
            Stage::SelfReview => {
                if kra.self_assessment.rating == 0 {
                    issues.push(format!("{label}: self-assessment rating is required"));
                }
                if kra.self_assessment.comments.trim().is_empty() {
                    issues.push(format!("{label}: self-assessment comments are required"));
                }
                for (j, goal) in kra.related_goals.iter().enumerate() {
                    let goal_label = format!("{label}, Goal {} ({})", j + 1, goal.title);
                    if goal.self_assessment.achievement_level.is_none() {
                        issues.push(format!("{goal_label}: achievement level is required"));
                    }
                    if goal.self_assessment.comments.trim().is_empty() {
                        issues.push(format!("{goal_label}: comments are required"));
                    }
                }
            }
            Stage::R1 => {
                if kra.r1_review.rating == 0 {
                    issues.push(format!("{label}: R1 rating is required"));
                }
                if kra.r1_review.comments.trim().is_empty() {
                    issues.push(format!("{label}: R1 comments are required"));
                }
            }
            Stage::R2 => {
                if kra.r2_review.rating == 0 {
                    issues.push(format!("{label}: R2 rating is required"));
                }
                if kra.r2_review.comments.trim().is_empty() {
                    issues.push(format!("{label}: R2 comments are required"));
                }
            }
            Stage::Hr | Stage::Completed => {}
        }
    }

    issues
}

/// Fail with every missing field of the active stage.
pub fn check_completeness(review: &ReviewData) -> std::result::Result<(), ValidationError> {
    let issues = completeness_issues(review);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Incomplete(issues))
    }
}

/// Move an ungated review exactly one stage forward.
///
/// The stage never regresses: a completed review is an
/// `InvalidTransition`, an incomplete one a `Validation` error, and in both
/// cases no new state is produced.
pub fn advance_stage(review: &ReviewData) -> Result<ReviewData> {
    let Some(next_stage) = review.current_stage.next() else {
        return Err(ReviewError::InvalidTransition {
            from: review.current_stage,
        });
    };
    check_completeness(review)?;

    let mut next = review.clone();
    next.current_stage = next_stage;
    next.overall_status = next_stage.status_on_entry();
    Ok(next)
}

// =============================================================================
// TESTS
// =============================================================================
