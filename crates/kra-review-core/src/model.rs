//! # Review Data Model
//!
//! The review aggregate: one `ReviewData` owns its KRAs, each KRA owns its
//! Goals, and KRAs/Goals own their evidence lists.
//!
//! Field names serialize as camelCase and enum values as snake_case so
//! externally supplied review documents load without translation.

use crate::evidence::EvidenceFile;
use crate::workflow::Stage;
use crate::{EmployeeId, EvidenceId, GoalId, KraId, MAX_PROGRESS, MAX_RATING, ReviewId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// ENUMS
// =============================================================================

/// Lifecycle status shown alongside the stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    #[default]
    Draft,
    Submitted,
    InReview,
    Approved,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    NotStarted,
    InProgress,
    Achieved,
    Exceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementLevel {
    NotAchieved,
    Partial,
    Achieved,
    Exceeded,
}

// =============================================================================
// KRA-LEVEL ASSESSMENTS
// =============================================================================

/// Employee's own assessment of a KRA.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelfAssessment {
    pub rating: u8,
    pub comments: String,
    pub evidence: Vec<EvidenceFile>,
}

/// First-line reviewer's assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct R1Review {
    pub rating: u8,
    pub comments: String,
    pub validation_note: String,
    pub agrees: bool,
}

/// Second-line reviewer's assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct R2Review {
    pub rating: u8,
    pub comments: String,
    pub approval_note: String,
    pub final_approval: bool,
}

// =============================================================================
// GOAL-LEVEL ASSESSMENTS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoalSelfAssessment {
    /// Unset until the employee picks a level.
    pub achievement_level: Option<AchievementLevel>,
    pub comments: String,
    pub challenges_faced: String,
    pub next_steps: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoalR1Validation {
    pub agrees: bool,
    pub comments: String,
    pub evidence_review: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoalR2Validation {
    pub final_approval: bool,
    pub comments: String,
    pub impact_assessment: String,
}

// =============================================================================
// GOAL
// =============================================================================

/// A trackable objective. Exists only inside its owning KRA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalInReview {
    pub id: GoalId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_value: String,
    /// Percentage, 0-100.
    #[serde(default)]
    pub current_progress: u8,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub evidence: Vec<EvidenceFile>,
    #[serde(default)]
    pub self_assessment: GoalSelfAssessment,
    #[serde(default)]
    pub r1_validation: GoalR1Validation,
    #[serde(default)]
    pub r2_validation: GoalR2Validation,
}

impl GoalInReview {
    /// Create a goal with empty assessments.
    #[must_use]
    pub fn new(id: impl Into<GoalId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            target_value: String::new(),
            current_progress: 0,
            status: GoalStatus::NotStarted,
            evidence: Vec::new(),
            self_assessment: GoalSelfAssessment::default(),
            r1_validation: GoalR1Validation::default(),
            r2_validation: GoalR2Validation::default(),
        }
    }

    /// Check whether an evidence file is attached to this goal.
    #[must_use]
    pub fn has_evidence(&self, id: &EvidenceId) -> bool {
        self.evidence.iter().any(|e| &e.id == id)
    }
}

// =============================================================================
// KRA
// =============================================================================

/// A weighted performance area with its goals and three assessments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KraInReview {
    pub id: KraId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Percentage contribution to the overall score.
    pub weightage: u8,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub related_goals: Vec<GoalInReview>,
    #[serde(default)]
    pub self_assessment: SelfAssessment,
    #[serde(default)]
    pub r1_review: R1Review,
    #[serde(default)]
    pub r2_review: R2Review,
}

impl KraInReview {
    /// Create a KRA with empty assessments and no goals.
    #[must_use]
    pub fn new(id: impl Into<KraId>, name: impl Into<String>, weightage: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            weightage,
            category: String::new(),
            related_goals: Vec::new(),
            self_assessment: SelfAssessment::default(),
            r1_review: R1Review::default(),
            r2_review: R2Review::default(),
        }
    }

    /// Builder-style goal attachment.
    #[must_use]
    pub fn with_goal(mut self, goal: GoalInReview) -> Self {
        self.related_goals.push(goal);
        self
    }

    #[must_use]
    pub fn goal(&self, id: &GoalId) -> Option<&GoalInReview> {
        self.related_goals.iter().find(|g| &g.id == id)
    }

    pub(crate) fn goal_mut(&mut self, id: &GoalId) -> Option<&mut GoalInReview> {
        self.related_goals.iter_mut().find(|g| &g.id == id)
    }
}

// =============================================================================
// REVIEW AGGREGATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Root aggregate for one employee's review in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewData {
    pub id: ReviewId,
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub review_cycle: String,
    pub review_period: ReviewPeriod,
    #[serde(default)]
    pub current_stage: Stage,
    #[serde(default)]
    pub kras: Vec<KraInReview>,
    #[serde(default)]
    pub overall_status: OverallStatus,
    pub last_saved: DateTime<Utc>,
}

impl ReviewData {
    /// Create a draft review at the `self` stage with no KRAs.
    #[must_use]
    pub fn new(
        id: impl Into<ReviewId>,
        employee_id: impl Into<EmployeeId>,
        employee_name: impl Into<String>,
        review_cycle: impl Into<String>,
        review_period: ReviewPeriod,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            employee_id: employee_id.into(),
            employee_name: employee_name.into(),
            review_cycle: review_cycle.into(),
            review_period,
            current_stage: Stage::SelfReview,
            kras: Vec::new(),
            overall_status: OverallStatus::Draft,
            last_saved: created_at,
        }
    }

    /// Builder-style KRA attachment.
    #[must_use]
    pub fn with_kra(mut self, kra: KraInReview) -> Self {
        self.kras.push(kra);
        self
    }

    #[must_use]
    pub fn kra(&self, id: &KraId) -> Option<&KraInReview> {
        self.kras.iter().find(|k| &k.id == id)
    }

    pub(crate) fn kra_mut(&mut self, id: &KraId) -> Option<&mut KraInReview> {
        self.kras.iter_mut().find(|k| &k.id == id)
    }

    #[must_use]
    pub fn goal(&self, kra_id: &KraId, goal_id: &GoalId) -> Option<&GoalInReview> {
        self.kra(kra_id)?.goal(goal_id)
    }

    /// A completed review is read-only.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.current_stage == Stage::Completed
    }

    /// Sum of all KRA weightages (conceptually at most 100).
    #[must_use]
    pub fn total_weightage(&self) -> u32 {
        self.kras.iter().map(|k| u32::from(k.weightage)).sum()
    }

    /// Return a copy stamped with a new `lastSaved` time.
    #[must_use]
    pub fn saved_at(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.last_saved = at;
        next
    }

    /// Report structural problems without rejecting the document.
    ///
    /// Checks duplicate KRA ids, duplicate goal ids within a KRA, total
    /// weightage above 100, ratings above `MAX_RATING` and progress
    /// above 100.
    #[must_use]
    pub fn structural_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let mut kra_ids = BTreeSet::new();
        for kra in &self.kras {
            if !kra_ids.insert(&kra.id) {
                issues.push(format!("duplicate KRA id '{}'", kra.id));
            }

            let mut goal_ids = BTreeSet::new();
            for goal in &kra.related_goals {
                if !goal_ids.insert(&goal.id) {
                    issues.push(format!(
                        "duplicate goal id '{}' in KRA '{}'",
                        goal.id, kra.id
                    ));
                }
                if goal.current_progress > MAX_PROGRESS {
                    issues.push(format!(
                        "goal '{}' in KRA '{}' has progress {} above {MAX_PROGRESS}",
                        goal.id, kra.id, goal.current_progress
                    ));
                }
            }

            for (label, rating) in [
                ("self", kra.self_assessment.rating),
                ("r1", kra.r1_review.rating),
                ("r2", kra.r2_review.rating),
            ] {
                if rating > MAX_RATING {
                    issues.push(format!(
                        "KRA '{}' has {label} rating {rating} above {MAX_RATING}",
                        kra.id
                    ));
                }
            }
        }

        let total = self.total_weightage();
        if total > 100 {
            issues.push(format!("KRA weightages sum to {total}, above 100"));
        }

        issues
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    fn period() -> ReviewPeriod {
        ReviewPeriod {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }
    }

    fn review() -> ReviewData {
        ReviewData::new(
            "rev-1",
            "emp-1",
            "Dana",
            "FY2024",
            period(),
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        )
    }

    #[test]
    fn new_review_starts_as_draft_at_self_stage() {
        let r = review();
        assert_eq!(r.current_stage, Stage::SelfReview);
        assert_eq!(r.overall_status, OverallStatus::Draft);
        assert!(!r.is_completed());
    }

    #[test]
    fn lookups_by_id() {
        let r = review().with_kra(
            KraInReview::new("k1", "Delivery", 40).with_goal(GoalInReview::new("g1", "Ship")),
        );
        assert!(r.kra(&KraId::new("k1")).is_some());
        assert!(r.kra(&KraId::new("missing")).is_none());
        assert!(r.goal(&KraId::new("k1"), &GoalId::new("g1")).is_some());
        assert!(r.goal(&KraId::new("k1"), &GoalId::new("g2")).is_none());
    }

    #[test]
    fn structural_issues_flag_duplicates_and_overweight() {
        let r = review()
            .with_kra(
                KraInReview::new("k1", "A", 70)
                    .with_goal(GoalInReview::new("g1", "x"))
                    .with_goal(GoalInReview::new("g1", "y")),
            )
            .with_kra(KraInReview::new("k1", "B", 40));

        let issues = r.structural_issues();
        assert!(issues.iter().any(|i| i.contains("duplicate KRA id 'k1'")));
        assert!(issues.iter().any(|i| i.contains("duplicate goal id 'g1'")));
        assert!(issues.iter().any(|i| i.contains("sum to 110")));
    }

    #[test]
    fn well_formed_review_has_no_issues() {
        let r = review()
            .with_kra(KraInReview::new("k1", "A", 60))
            .with_kra(KraInReview::new("k2", "B", 40));
        assert!(r.structural_issues().is_empty());
    }

    #[test]
    fn deserializes_camel_case_document() {
        let json = r#"{
            "id": "rev-9",
            "employeeId": "emp-9",
            "employeeName": "Sam",
            "reviewCycle": "FY2024",
            "reviewPeriod": {"startDate": "2024-01-01", "endDate": "2024-12-31"},
            "currentStage": "r1",
            "overallStatus": "submitted",
            "lastSaved": "2024-06-01T10:00:00Z",
            "kras": [{
                "id": "k1",
                "name": "Technical Excellence",
                "weightage": 30,
                "selfAssessment": {"rating": 8, "comments": "done"},
                "relatedGoals": [{
                    "id": "g1",
                    "title": "Migrate",
                    "status": "in_progress",
                    "selfAssessment": {"achievementLevel": "partial"}
                }]
            }]
        }"#;

        let r: ReviewData = serde_json::from_str(json).unwrap();
        assert_eq!(r.current_stage, Stage::R1);
        assert_eq!(r.overall_status, OverallStatus::Submitted);
        assert_eq!(r.kras[0].self_assessment.rating, 8);
        assert_eq!(r.kras[0].r1_review.rating, 0);
        let goal = &r.kras[0].related_goals[0];
        assert_eq!(goal.status, GoalStatus::InProgress);
        assert_eq!(
            goal.self_assessment.achievement_level,
            Some(AchievementLevel::Partial)
        );
    }
}
