//! # CLI Commands
//!
//! One `cmd_*` function per subcommand. Each prints a short text report,
//! or pretty JSON when `json` is set.
//!
//! `score` and `validate` work on a review document directly. The other
//! commands address a review by id inside the configured data directory
//! and go through a [`ReviewSession`].

use crate::collab::{EvidenceStore, FsEvidenceStore, FsReviewStore, ReviewStore};
use crate::config::Config;
use crate::error::AppError;
use crate::session::{ReviewSession, SessionContext};
use kra_review_core::evidence::mime_type_for_extension;
use kra_review_core::scoring;
use kra_review_core::workflow::completeness_issues;
use kra_review_core::{
    Actor, EvidenceId, EvidenceUpload, GoalId, GoalR1Edit, GoalR2Edit, GoalSelfEdit, KraId,
    R1ReviewEdit, R2ReviewEdit, ReviewData, ReviewEdit, ReviewId, Role, Section,
    SelfAssessmentEdit, Stage, can_edit,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

// =============================================================================
// HELPERS
// =============================================================================

fn print_json(value: &impl serde::Serialize) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn warn_structural(review: &ReviewData) {
    for issue in review.structural_issues() {
        warn!(review = %review.id, "{issue}");
    }
}

/// Read a review document from disk.
///
/// Structural problems (duplicate ids, weightage above 100, ...) are
/// logged, not rejected.
pub fn read_review_file(path: &Path) -> Result<ReviewData, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let review: ReviewData = serde_json::from_str(&raw)?;
    warn_structural(&review);
    Ok(review)
}

/// Load a stored review by id.
pub async fn load_review(store: &FsReviewStore, id: &ReviewId) -> Result<ReviewData, AppError> {
    let review = store
        .load(id)
        .await?
        .ok_or_else(|| AppError::ReviewNotFound(id.to_string()))?;
    warn_structural(&review);
    Ok(review)
}

/// Log in as `actor` and open the stored review `review_id`.
pub async fn open_session(
    config: &Config,
    review_id: &str,
    actor: Actor,
    read_only: bool,
) -> Result<ReviewSession, AppError> {
    let store = FsReviewStore::new(&config.data_dir);
    let review = load_review(&store, &ReviewId::new(review_id)).await?;
    let evidence: Arc<dyn EvidenceStore> = Arc::new(FsEvidenceStore::new(&config.evidence_dir));
    let store: Arc<dyn ReviewStore> = Arc::new(store);

    Ok(ReviewSession::open(
        SessionContext::login(actor, read_only),
        review,
        config.denial_policy,
        store,
        evidence,
        config.collaborator_timeout(),
    ))
}

/// Parse the `--section` argument.
pub fn parse_section(raw: &str) -> Result<Section, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "self" | "self_assessment" | "self-assessment" => Ok(Section::SelfAssessment),
        "r1" => Ok(Section::R1),
        "r2" => Ok(Section::R2),
        other => Err(AppError::Usage(format!(
            "unknown section '{other}' (expected self, r1 or r2)"
        ))),
    }
}

/// Decode one `field = value` pair into a field edit.
///
/// The value is first read as JSON (numbers, booleans), then as a plain
/// string, so `--value 7` and `--value "great quarter"` both work.
fn parse_field<E: DeserializeOwned>(field: &str, value: &str) -> Result<E, AppError> {
    let typed = serde_json::from_str::<Value>(value)
        .ok()
        .and_then(|v| serde_json::from_value(json!({ "field": field, "value": v })).ok());
    if let Some(edit) = typed {
        return Ok(edit);
    }
    serde_json::from_value(json!({ "field": field, "value": value }))
        .map_err(|e| AppError::Usage(format!("cannot set '{field}' to '{value}': {e}")))
}

/// Build a [`ReviewEdit`] from command-line pieces.
pub fn parse_edit(
    kra: &str,
    goal: Option<&str>,
    section: Section,
    field: &str,
    value: &str,
) -> Result<ReviewEdit, AppError> {
    let kra_id = KraId::new(kra);
    let edit = match (goal.map(GoalId::new), section) {
        (None, Section::SelfAssessment) => ReviewEdit::KraSelf {
            kra_id,
            edit: parse_field::<SelfAssessmentEdit>(field, value)?,
        },
        (None, Section::R1) => ReviewEdit::KraR1 {
            kra_id,
            edit: parse_field::<R1ReviewEdit>(field, value)?,
        },
        (None, Section::R2) => ReviewEdit::KraR2 {
            kra_id,
            edit: parse_field::<R2ReviewEdit>(field, value)?,
        },
        (Some(goal_id), Section::SelfAssessment) => ReviewEdit::GoalSelf {
            kra_id,
            goal_id,
            edit: parse_field::<GoalSelfEdit>(field, value)?,
        },
        (Some(goal_id), Section::R1) => ReviewEdit::GoalR1 {
            kra_id,
            goal_id,
            edit: parse_field::<GoalR1Edit>(field, value)?,
        },
        (Some(goal_id), Section::R2) => ReviewEdit::GoalR2 {
            kra_id,
            goal_id,
            edit: parse_field::<GoalR2Edit>(field, value)?,
        },
    };
    Ok(edit)
}

// =============================================================================
// READ-ONLY COMMANDS
// =============================================================================

/// Print per-KRA scores, the overall score and the band.
pub fn cmd_score(path: &Path, json: bool) -> Result<(), AppError> {
    let review = read_review_file(path)?;
    let summary = scoring::summarize(&review);

    if json {
        return print_json(&summary);
    }
    println!("Review {} ({})", review.id, review.employee_name);
    for kra in &summary.kras {
        println!(
            "  {:<30} w={:>3}  self={:>2} r1={:>2} r2={:>2}  score={}",
            kra.name, kra.weightage, kra.self_rating, kra.r1_rating, kra.r2_rating, kra.final_score
        );
    }
    println!("Overall: {} [{}]", summary.overall_score, summary.band);
    Ok(())
}

/// Report completeness for the current stage plus structural issues.
///
/// Returns whether the review could be submitted as-is.
pub fn cmd_validate(path: &Path, json: bool) -> Result<bool, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let review: ReviewData = serde_json::from_str(&raw)?;
    let missing = completeness_issues(&review);
    let structural = review.structural_issues();
    let ready = missing.is_empty() && !review.is_completed();

    if json {
        print_json(&json!({
            "stage": review.current_stage,
            "ready": ready,
            "missing": missing,
            "structural": structural,
        }))?;
        return Ok(ready);
    }
    println!("Stage: {}", review.current_stage);
    if review.is_completed() {
        println!("Review is completed.");
    } else if missing.is_empty() {
        println!("Ready to submit.");
    } else {
        println!("Missing ({}):", missing.len());
        for message in &missing {
            println!("  - {message}");
        }
    }
    for issue in &structural {
        println!("Warning: {issue}");
    }
    Ok(ready)
}

/// Answer the role/stage edit rule.
pub fn cmd_can_edit(role: Role, stage: Stage, read_only: bool, json: bool) -> Result<(), AppError> {
    let allowed = can_edit(role, stage, read_only);
    if json {
        return print_json(&json!({
            "role": role,
            "stage": stage,
            "readOnly": read_only,
            "canEdit": allowed,
        }));
    }
    let verdict = if allowed { "may" } else { "may not" };
    println!("{role} {verdict} edit at stage {stage}");
    Ok(())
}

// =============================================================================
// STORE COMMANDS
// =============================================================================

/// Copy a review document into the data directory.
pub async fn cmd_import(config: &Config, file: &Path, json: bool) -> Result<ReviewId, AppError> {
    let review = read_review_file(file)?;
    let store = FsReviewStore::new(&config.data_dir);
    store.save(&review).await?;

    if json {
        print_json(&json!({ "imported": review.id, "stage": review.current_stage }))?;
    } else {
        println!("Imported review {} at stage {}", review.id, review.current_stage);
    }
    Ok(review.id)
}

/// Apply one field edit and save the draft.
///
/// Nothing is written when the edit leaves the review as it was, which
/// includes requests ignored by the denial policy.
pub async fn cmd_edit(
    config: &Config,
    review_id: &str,
    actor: Actor,
    edit: ReviewEdit,
    json: bool,
) -> Result<(), AppError> {
    let mut session = open_session(config, review_id, actor, false).await?;
    let before = session.review().clone();
    let edited = *session.apply(edit)? != before;
    let changed = edited && session.save().await?;
    let review = session.close();

    if json {
        return print_json(&json!({ "changed": changed, "review": review }));
    }
    if changed {
        println!("Saved review {} at {}", review.id, review.last_saved);
    } else {
        println!("Review {} unchanged", review.id);
    }
    Ok(())
}

/// Submit the active stage.
pub async fn cmd_submit(
    config: &Config,
    review_id: &str,
    actor: Actor,
    json: bool,
) -> Result<(), AppError> {
    let mut session = open_session(config, review_id, actor, false).await?;
    let from = session.review().current_stage;
    let advanced = session.submit().await?;
    let review = session.close();

    if json {
        return print_json(&json!({
            "advanced": advanced,
            "from": from,
            "stage": review.current_stage,
            "status": review.overall_status,
        }));
    }
    if advanced {
        println!("Review {} moved {} -> {}", review.id, from, review.current_stage);
    } else {
        println!("Review {} unchanged at {}", review.id, review.current_stage);
    }
    Ok(())
}

/// Upload a local file as evidence and persist its reference.
pub async fn cmd_attach(
    config: &Config,
    review_id: &str,
    actor: Actor,
    kra: &str,
    goal: Option<&str>,
    file: &Path,
    json: bool,
) -> Result<(), AppError> {
    let content = tokio::fs::read(file).await?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::Usage(format!("'{}' is not a file", file.display())))?;
    let mime_type = file
        .extension()
        .and_then(|ext| mime_type_for_extension(&ext.to_string_lossy()))
        .unwrap_or("application/octet-stream");
    let upload = EvidenceUpload::new(name, mime_type, content.len() as u64);

    let mut session = open_session(config, review_id, actor, false).await?;
    let goal_id = goal.map(GoalId::new);
    let attached = session
        .attach_evidence(&KraId::new(kra), goal_id.as_ref(), upload, content)
        .await?;
    session.close();

    if json {
        return print_json(&json!({ "attached": attached }));
    }
    match attached {
        Some(file) => println!("Attached {} ({}) as {}", file.name, file.size_label, file.id),
        None => println!("Nothing attached"),
    }
    Ok(())
}

/// Delete evidence content and drop its reference.
pub async fn cmd_detach(
    config: &Config,
    review_id: &str,
    actor: Actor,
    kra: &str,
    goal: Option<&str>,
    evidence_id: &str,
    json: bool,
) -> Result<(), AppError> {
    let mut session = open_session(config, review_id, actor, false).await?;
    let goal_id = goal.map(GoalId::new);
    let evidence_id = EvidenceId::new(evidence_id);
    let removed = session
        .detach_evidence(&KraId::new(kra), goal_id.as_ref(), &evidence_id)
        .await?;
    session.close();

    if json {
        return print_json(&json!({ "removed": removed, "evidenceId": evidence_id }));
    }
    if removed {
        println!("Removed evidence {evidence_id}");
    } else {
        println!("Evidence {evidence_id} not found");
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
