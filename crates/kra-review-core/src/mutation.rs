//! # Mutation API
//!
//! Closed edit variants for every editable field, and the pure functions
//! that apply them.
//!
//! Every function takes a `&ReviewData` snapshot and returns a new one with
//! exactly the addressed field replaced. Unknown KRA, goal or evidence ids
//! produce an unchanged copy: stale client state is tolerated, not reported.
//!
//! These functions do NOT check roles or stages. Gated entry points live in
//! [`crate::workflow::Gate`].

use crate::evidence::EvidenceFile;
use crate::model::{
    AchievementLevel, GoalInReview, GoalR1Validation, GoalR2Validation, GoalStatus, KraInReview,
    R1Review, R2Review, ReviewData, SelfAssessment,
};
use crate::workflow::Section;
use crate::{EvidenceId, GoalId, KraId, MAX_PROGRESS, MAX_RATING, ValidationError};
use serde::{Deserialize, Serialize};

fn check_rating(rating: u8) -> Result<(), ValidationError> {
    if rating > MAX_RATING {
        return Err(ValidationError::RatingOutOfRange(rating));
    }
    Ok(())
}

// =============================================================================
// KRA-LEVEL EDITS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SelfAssessmentEdit {
    Rating(u8),
    Comments(String),
}

impl SelfAssessmentEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Rating(r) => check_rating(*r),
            Self::Comments(_) => Ok(()),
        }
    }

    fn apply_to(self, block: &mut SelfAssessment) {
        match self {
            Self::Rating(r) => block.rating = r,
            Self::Comments(c) => block.comments = c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum R1ReviewEdit {
    Rating(u8),
    Comments(String),
    ValidationNote(String),
    Agrees(bool),
}

impl R1ReviewEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Rating(r) => check_rating(*r),
            _ => Ok(()),
        }
    }

    fn apply_to(self, block: &mut R1Review) {
        match self {
            Self::Rating(r) => block.rating = r,
            Self::Comments(c) => block.comments = c,
            Self::ValidationNote(n) => block.validation_note = n,
            Self::Agrees(a) => block.agrees = a,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum R2ReviewEdit {
    Rating(u8),
    Comments(String),
    ApprovalNote(String),
    FinalApproval(bool),
}

impl R2ReviewEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Rating(r) => check_rating(*r),
            _ => Ok(()),
        }
    }

    fn apply_to(self, block: &mut R2Review) {
        match self {
            Self::Rating(r) => block.rating = r,
            Self::Comments(c) => block.comments = c,
            Self::ApprovalNote(n) => block.approval_note = n,
            Self::FinalApproval(f) => block.final_approval = f,
        }
    }
}

// =============================================================================
// GOAL-LEVEL EDITS
// =============================================================================

/// Employee edits to a goal. Progress and status are updated alongside the
/// self-assessment during the `self` stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum GoalSelfEdit {
    AchievementLevel(AchievementLevel),
    Comments(String),
    ChallengesFaced(String),
    NextSteps(String),
    Progress(u8),
    Status(GoalStatus),
}

impl GoalSelfEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Progress(p) if *p > MAX_PROGRESS => Err(ValidationError::ProgressOutOfRange(*p)),
            _ => Ok(()),
        }
    }

    fn apply_to(self, goal: &mut GoalInReview) {
        match self {
            Self::AchievementLevel(level) => goal.self_assessment.achievement_level = Some(level),
            Self::Comments(c) => goal.self_assessment.comments = c,
            Self::ChallengesFaced(c) => goal.self_assessment.challenges_faced = c,
            Self::NextSteps(n) => goal.self_assessment.next_steps = n,
            Self::Progress(p) => goal.current_progress = p,
            Self::Status(s) => goal.status = s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum GoalR1Edit {
    Agrees(bool),
    Comments(String),
    EvidenceReview(String),
}

impl GoalR1Edit {
    fn apply_to(self, block: &mut GoalR1Validation) {
        match self {
            Self::Agrees(a) => block.agrees = a,
            Self::Comments(c) => block.comments = c,
            Self::EvidenceReview(e) => block.evidence_review = e,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum GoalR2Edit {
    FinalApproval(bool),
    Comments(String),
    ImpactAssessment(String),
}

impl GoalR2Edit {
    fn apply_to(self, block: &mut GoalR2Validation) {
        match self {
            Self::FinalApproval(f) => block.final_approval = f,
            Self::Comments(c) => block.comments = c,
            Self::ImpactAssessment(i) => block.impact_assessment = i,
        }
    }
}

// =============================================================================
// ADDRESSED EDITS
// =============================================================================

/// One edit addressed to a KRA (and optionally a goal inside it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ReviewEdit {
    KraSelf {
        kra_id: KraId,
        edit: SelfAssessmentEdit,
    },
    KraR1 {
        kra_id: KraId,
        edit: R1ReviewEdit,
    },
    KraR2 {
        kra_id: KraId,
        edit: R2ReviewEdit,
    },
    GoalSelf {
        kra_id: KraId,
        goal_id: GoalId,
        edit: GoalSelfEdit,
    },
    GoalR1 {
        kra_id: KraId,
        goal_id: GoalId,
        edit: GoalR1Edit,
    },
    GoalR2 {
        kra_id: KraId,
        goal_id: GoalId,
        edit: GoalR2Edit,
    },
}

impl ReviewEdit {
    /// The assessment block this edit writes to.
    #[must_use]
    pub fn section(&self) -> Section {
        match self {
            Self::KraSelf { .. } | Self::GoalSelf { .. } => Section::SelfAssessment,
            Self::KraR1 { .. } | Self::GoalR1 { .. } => Section::R1,
            Self::KraR2 { .. } | Self::GoalR2 { .. } => Section::R2,
        }
    }

    #[must_use]
    pub fn kra_id(&self) -> &KraId {
        match self {
            Self::KraSelf { kra_id, .. }
            | Self::KraR1 { kra_id, .. }
            | Self::KraR2 { kra_id, .. }
            | Self::GoalSelf { kra_id, .. }
            | Self::GoalR1 { kra_id, .. }
            | Self::GoalR2 { kra_id, .. } => kra_id,
        }
    }

    /// Range checks on the carried value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::KraSelf { edit, .. } => edit.validate(),
            Self::KraR1 { edit, .. } => edit.validate(),
            Self::KraR2 { edit, .. } => edit.validate(),
            Self::GoalSelf { edit, .. } => edit.validate(),
            Self::GoalR1 { .. } | Self::GoalR2 { .. } => Ok(()),
        }
    }

    /// Apply without any gating.
    #[must_use]
    pub fn apply(self, review: &ReviewData) -> ReviewData {
        match self {
            Self::KraSelf { kra_id, edit } => update_kra_self_assessment(review, &kra_id, edit),
            Self::KraR1 { kra_id, edit } => update_kra_r1_review(review, &kra_id, edit),
            Self::KraR2 { kra_id, edit } => update_kra_r2_review(review, &kra_id, edit),
            Self::GoalSelf {
                kra_id,
                goal_id,
                edit,
            } => update_goal_self_assessment(review, &kra_id, &goal_id, edit),
            Self::GoalR1 {
                kra_id,
                goal_id,
                edit,
            } => update_goal_r1_validation(review, &kra_id, &goal_id, edit),
            Self::GoalR2 {
                kra_id,
                goal_id,
                edit,
            } => update_goal_r2_validation(review, &kra_id, &goal_id, edit),
        }
    }
}

// =============================================================================
// PURE UPDATE FUNCTIONS
// =============================================================================

fn with_kra(review: &ReviewData, kra_id: &KraId, f: impl FnOnce(&mut KraInReview)) -> ReviewData {
    let mut next = review.clone();
    if let Some(kra) = next.kra_mut(kra_id) {
        f(kra);
    }
    next
}

fn with_goal(
    review: &ReviewData,
    kra_id: &KraId,
    goal_id: &GoalId,
    f: impl FnOnce(&mut GoalInReview),
) -> ReviewData {
    with_kra(review, kra_id, |kra| {
        if let Some(goal) = kra.goal_mut(goal_id) {
            f(goal);
        }
    })
}

#[must_use]
pub fn update_kra_self_assessment(
    review: &ReviewData,
    kra_id: &KraId,
    edit: SelfAssessmentEdit,
) -> ReviewData {
    with_kra(review, kra_id, |kra| edit.apply_to(&mut kra.self_assessment))
}

#[must_use]
pub fn update_kra_r1_review(review: &ReviewData, kra_id: &KraId, edit: R1ReviewEdit) -> ReviewData {
    with_kra(review, kra_id, |kra| edit.apply_to(&mut kra.r1_review))
}

#[must_use]
pub fn update_kra_r2_review(review: &ReviewData, kra_id: &KraId, edit: R2ReviewEdit) -> ReviewData {
    with_kra(review, kra_id, |kra| edit.apply_to(&mut kra.r2_review))
}

#[must_use]
pub fn update_goal_self_assessment(
    review: &ReviewData,
    kra_id: &KraId,
    goal_id: &GoalId,
    edit: GoalSelfEdit,
) -> ReviewData {
    with_goal(review, kra_id, goal_id, |goal| edit.apply_to(goal))
}

#[must_use]
pub fn update_goal_r1_validation(
    review: &ReviewData,
    kra_id: &KraId,
    goal_id: &GoalId,
    edit: GoalR1Edit,
) -> ReviewData {
    with_goal(review, kra_id, goal_id, |goal| {
        edit.apply_to(&mut goal.r1_validation);
    })
}

#[must_use]
pub fn update_goal_r2_validation(
    review: &ReviewData,
    kra_id: &KraId,
    goal_id: &GoalId,
    edit: GoalR2Edit,
) -> ReviewData {
    with_goal(review, kra_id, goal_id, |goal| {
        edit.apply_to(&mut goal.r2_validation);
    })
}

/// Append evidence to the KRA's self-assessment, or to a goal when
/// `goal_id` is given. A file whose id is already in the list is not
/// appended twice.
#[must_use]
pub fn add_evidence(
    review: &ReviewData,
    kra_id: &KraId,
    goal_id: Option<&GoalId>,
    file: EvidenceFile,
) -> ReviewData {
    fn push(list: &mut Vec<EvidenceFile>, file: EvidenceFile) {
        if !list.iter().any(|e| e.id == file.id) {
            list.push(file);
        }
    }

    match goal_id {
        Some(goal_id) => with_goal(review, kra_id, goal_id, |goal| {
            push(&mut goal.evidence, file);
        }),
        None => with_kra(review, kra_id, |kra| {
            push(&mut kra.self_assessment.evidence, file);
        }),
    }
}

/// Remove evidence by id from the matching list. Absent ids are a no-op.
#[must_use]
pub fn remove_evidence(
    review: &ReviewData,
    kra_id: &KraId,
    goal_id: Option<&GoalId>,
    evidence_id: &EvidenceId,
) -> ReviewData {
    match goal_id {
        Some(goal_id) => with_goal(review, kra_id, goal_id, |goal| {
            goal.evidence.retain(|e| &e.id != evidence_id);
        }),
        None => with_kra(review, kra_id, |kra| {
            kra.self_assessment.evidence.retain(|e| &e.id != evidence_id);
        }),
    }
}

/// Find the evidence list holding `evidence_id`, if any.
#[must_use]
pub fn locate_evidence(
    review: &ReviewData,
    kra_id: &KraId,
    goal_id: Option<&GoalId>,
    evidence_id: &EvidenceId,
) -> Option<EvidenceFile> {
    let kra = review.kra(kra_id)?;
    let list = match goal_id {
        Some(goal_id) => &kra.goal(goal_id)?.evidence,
        None => &kra.self_assessment.evidence,
    };
    list.iter().find(|e| &e.id == evidence_id).cloned()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::model::ReviewPeriod;
    use chrono::{NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;

    fn review() -> ReviewData {
        ReviewData::new(
            "rev-1",
            "emp-1",
            "Dana",
            "FY2024",
            ReviewPeriod {
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            },
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .with_kra(KraInReview::new("k1", "Delivery", 50).with_goal(GoalInReview::new("g1", "Ship")))
        .with_kra(KraInReview::new("k2", "Quality", 50))
    }

    fn evidence(id: &str) -> EvidenceFile {
        EvidenceFile {
            id: EvidenceId::new(id),
            name: format!("{id}.pdf"),
            size_label: "1 KB".to_string(),
            mime_type: "application/pdf".to_string(),
            uploaded_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            url: None,
        }
    }

    #[test]
    fn update_replaces_only_target_field() {
        let before = review();
        let after =
            update_kra_self_assessment(&before, &KraId::new("k1"), SelfAssessmentEdit::Rating(7));

        assert_eq!(after.kras[0].self_assessment.rating, 7);
        assert_eq!(after.kras[0].self_assessment.comments, "");
        assert_eq!(after.kras[1], before.kras[1]);
        // input snapshot untouched
        assert_eq!(before.kras[0].self_assessment.rating, 0);
    }

    #[test]
    fn unknown_kra_is_noop() {
        let before = review();
        let after = update_kra_r1_review(&before, &KraId::new("nope"), R1ReviewEdit::Agrees(true));
        assert_eq!(after, before);
    }

    #[test]
    fn goal_edits_reach_nested_goal() {
        let before = review();
        let k1 = KraId::new("k1");
        let g1 = GoalId::new("g1");

        let after = update_goal_self_assessment(
            &before,
            &k1,
            &g1,
            GoalSelfEdit::AchievementLevel(AchievementLevel::Exceeded),
        );
        let after = update_goal_self_assessment(&after, &k1, &g1, GoalSelfEdit::Progress(80));
        let after = update_goal_r1_validation(
            &after,
            &k1,
            &g1,
            GoalR1Edit::EvidenceReview("checked".into()),
        );
        let after = update_goal_r2_validation(&after, &k1, &g1, GoalR2Edit::FinalApproval(true));

        let goal = after.goal(&k1, &g1).unwrap();
        assert_eq!(
            goal.self_assessment.achievement_level,
            Some(AchievementLevel::Exceeded)
        );
        assert_eq!(goal.current_progress, 80);
        assert_eq!(goal.r1_validation.evidence_review, "checked");
        assert!(goal.r2_validation.final_approval);
    }

    #[test]
    fn unknown_goal_is_noop() {
        let before = review();
        let after = update_goal_self_assessment(
            &before,
            &KraId::new("k1"),
            &GoalId::new("missing"),
            GoalSelfEdit::Comments("x".into()),
        );
        assert_eq!(after, before);
    }

    #[test]
    fn evidence_goes_to_kra_or_goal() {
        let k1 = KraId::new("k1");
        let g1 = GoalId::new("g1");

        let r = add_evidence(&review(), &k1, None, evidence("a"));
        let r = add_evidence(&r, &k1, Some(&g1), evidence("b"));

        assert_eq!(r.kras[0].self_assessment.evidence.len(), 1);
        assert_eq!(r.kras[0].related_goals[0].evidence.len(), 1);
        assert!(locate_evidence(&r, &k1, Some(&g1), &EvidenceId::new("b")).is_some());
        assert!(locate_evidence(&r, &k1, None, &EvidenceId::new("b")).is_none());
    }

    #[test]
    fn duplicate_evidence_id_not_appended() {
        let k1 = KraId::new("k1");
        let r = add_evidence(&review(), &k1, None, evidence("a"));
        let r = add_evidence(&r, &k1, None, evidence("a"));
        assert_eq!(r.kras[0].self_assessment.evidence.len(), 1);
    }

    #[test]
    fn remove_evidence_twice_is_safe() {
        let k1 = KraId::new("k1");
        let id = EvidenceId::new("a");
        let r = add_evidence(&review(), &k1, None, evidence("a"));
        let r = add_evidence(&r, &k1, None, evidence("b"));

        let once = remove_evidence(&r, &k1, None, &id);
        let twice = remove_evidence(&once, &k1, None, &id);

        assert_eq!(once, twice);
        assert_eq!(twice.kras[0].self_assessment.evidence.len(), 1);
        assert_eq!(twice.kras[0].self_assessment.evidence[0].id.as_str(), "b");
    }

    #[test]
    fn sections_map_to_blocks() {
        let k = KraId::new("k1");
        let g = GoalId::new("g1");
        let edit = ReviewEdit::GoalR2 {
            kra_id: k.clone(),
            goal_id: g,
            edit: GoalR2Edit::Comments("ok".into()),
        };
        assert_eq!(edit.section(), Section::R2);
        assert_eq!(edit.kra_id(), &k);
        assert_eq!(
            ReviewEdit::KraSelf {
                kra_id: k,
                edit: SelfAssessmentEdit::Rating(1)
            }
            .section(),
            Section::SelfAssessment
        );
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let k = KraId::new("k1");
        let rating = ReviewEdit::KraR2 {
            kra_id: k.clone(),
            edit: R2ReviewEdit::Rating(11),
        };
        assert_eq!(rating.validate(), Err(ValidationError::RatingOutOfRange(11)));

        let progress = ReviewEdit::GoalSelf {
            kra_id: k,
            goal_id: GoalId::new("g1"),
            edit: GoalSelfEdit::Progress(101),
        };
        assert_eq!(
            progress.validate(),
            Err(ValidationError::ProgressOutOfRange(101))
        );
    }

    #[test]
    fn edit_json_shape() {
        let edit: ReviewEdit = serde_json::from_str(
            r#"{"target":"kra_r1","kra_id":"k1","edit":{"field":"validation_note","value":"ok"}}"#,
        )
        .unwrap();
        assert_eq!(
            edit,
            ReviewEdit::KraR1 {
                kra_id: KraId::new("k1"),
                edit: R1ReviewEdit::ValidationNote("ok".into()),
            }
        );
    }

    proptest! {
        #[test]
        fn removal_is_idempotent(ids in proptest::collection::vec("[a-d]", 0..8), target in "[a-d]") {
            let k1 = KraId::new("k1");
            let mut r = review();
            for id in &ids {
                r = add_evidence(&r, &k1, None, evidence(id));
            }
            let target = EvidenceId::new(target);
            let once = remove_evidence(&r, &k1, None, &target);
            let twice = remove_evidence(&once, &k1, None, &target);
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.kras[0].self_assessment.evidence.iter().all(|e| e.id != target));
        }
    }
}
