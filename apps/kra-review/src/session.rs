//! # Review Sessions
//!
//! A [`SessionContext`] is the explicit replacement for ambient
//! "who is logged in" state: it is created on login, handed to every
//! [`ReviewSession`] and consumed on logout.
//!
//! A `ReviewSession` owns the current snapshot of one review and the
//! collaborators that persist it. Every collaborator call is bounded by a
//! timeout, and the snapshot is replaced only after the call succeeds, so
//! a failed save, upload or delete leaves the session exactly as it was.

use crate::collab::{CollabError, EvidenceStore, ReviewStore};
use chrono::{DateTime, Utc};
use kra_review_core::mutation::locate_evidence;
use kra_review_core::scoring::{self, ScoreSummary};
use kra_review_core::workflow::{Decision, can_edit_review};
use kra_review_core::{
    Actor, DenialPolicy, EvidenceFile, EvidenceId, EvidenceUpload, Gate, GatedAction, GoalId,
    KraId, Result, ReviewData, ReviewError, ReviewEdit, Section,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// =============================================================================
// SESSION CONTEXT
// =============================================================================

/// The logged-in actor and whether the session is read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    actor: Actor,
    read_only: bool,
    started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn login(actor: Actor, read_only: bool) -> Self {
        info!(user = %actor.user_id, role = %actor.role, read_only, "login");
        Self {
            actor,
            read_only,
            started_at: Utc::now(),
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn logout(self) {
        let elapsed = Utc::now() - self.started_at;
        info!(user = %self.actor.user_id, session_secs = elapsed.num_seconds(), "logout");
    }
}

// =============================================================================
// REVIEW SESSION
// =============================================================================

/// One actor working on one review.
pub struct ReviewSession {
    context: SessionContext,
    gate: Gate,
    review: ReviewData,
    store: Arc<dyn ReviewStore>,
    evidence: Arc<dyn EvidenceStore>,
    timeout: Duration,
}

impl ReviewSession {
    pub fn open(
        context: SessionContext,
        review: ReviewData,
        policy: DenialPolicy,
        store: Arc<dyn ReviewStore>,
        evidence: Arc<dyn EvidenceStore>,
        timeout: Duration,
    ) -> Self {
        let gate = Gate::new(policy, context.read_only());
        debug!(
            review = %review.id,
            stage = %review.current_stage,
            user = %context.actor().user_id,
            "review opened"
        );
        Self {
            context,
            gate,
            review,
            store,
            evidence,
            timeout,
        }
    }

    /// The current snapshot.
    pub fn review(&self) -> &ReviewData {
        &self.review
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Whether the actor may edit the review at its current stage.
    pub fn can_edit(&self) -> bool {
        can_edit_review(self.context.actor(), &self.review, self.context.read_only())
    }

    /// Apply one field edit in memory. Call [`save`](Self::save) to persist.
    pub fn apply(&mut self, edit: ReviewEdit) -> Result<&ReviewData> {
        let section = edit.section();
        let next = self.gated(self.gate.apply(self.context.actor(), &self.review, edit))?;
        if next != self.review {
            self.review = next;
            info!(review = %self.review.id, %section, "edit applied");
        }
        Ok(&self.review)
    }

    /// Upload a file, reference it from a KRA or one of its goals and
    /// persist the review.
    ///
    /// Returns `None` when the request was ignored by policy or the target
    /// does not exist; nothing is uploaded in either case. If the review
    /// cannot be persisted the uploaded content is deleted again.
    pub async fn attach_evidence(
        &mut self,
        kra_id: &KraId,
        goal_id: Option<&GoalId>,
        upload: EvidenceUpload,
        content: Vec<u8>,
    ) -> Result<Option<EvidenceFile>> {
        if self.decide(GatedAction::Edit(Section::SelfAssessment))? == Decision::Ignore {
            return Ok(None);
        }
        let target_exists = match goal_id {
            Some(goal_id) => self.review.goal(kra_id, goal_id).is_some(),
            None => self.review.kra(kra_id).is_some(),
        };
        if !target_exists {
            debug!(kra = %kra_id, "evidence target not found");
            return Ok(None);
        }
        upload.validate()?;

        let file = self.upload(kra_id, goal_id, upload, content).await?;

        let next = self
            .gate
            .add_evidence(self.context.actor(), &self.review, kra_id, goal_id, file.clone())?
            .saved_at(Utc::now());
        let store = Arc::clone(&self.store);
        if let Err(e) = self.bounded("save", store.save(&next)).await {
            self.discard(&file.id).await;
            return Err(e);
        }

        self.review = next;
        info!(review = %self.review.id, evidence = %file.id, "evidence attached");
        Ok(Some(file))
    }

    /// Drop an evidence reference and delete the stored content.
    ///
    /// The reference-free review is persisted before the content is
    /// deleted, so a stored review never points at missing content. If
    /// the delete then fails, the previous review is written back and the
    /// session keeps the reference. Returns `false` when there was nothing
    /// to remove.
    pub async fn detach_evidence(
        &mut self,
        kra_id: &KraId,
        goal_id: Option<&GoalId>,
        evidence_id: &EvidenceId,
    ) -> Result<bool> {
        if self.decide(GatedAction::Edit(Section::SelfAssessment))? == Decision::Ignore {
            return Ok(false);
        }
        if locate_evidence(&self.review, kra_id, goal_id, evidence_id).is_none() {
            return Ok(false);
        }
        let next = self
            .gate
            .remove_evidence(self.context.actor(), &self.review, kra_id, goal_id, evidence_id)?
            .saved_at(Utc::now());

        let store = Arc::clone(&self.store);
        self.bounded("save", store.save(&next)).await?;

        let evidence = Arc::clone(&self.evidence);
        if let Err(e) = self.bounded("delete", evidence.delete(evidence_id)).await {
            if let Err(restore) = self.bounded("save", store.save(&self.review)).await {
                // content is still there, only unreferenced
                warn!(
                    review = %self.review.id,
                    evidence = %evidence_id,
                    error = %restore,
                    "reference not restored"
                );
            }
            return Err(e);
        }

        self.review = next;
        info!(review = %self.review.id, evidence = %evidence_id, "evidence detached");
        Ok(true)
    }

    /// Persist the current draft, stamping `lastSaved`.
    ///
    /// Returns `false` if the request was ignored by policy.
    pub async fn save(&mut self) -> Result<bool> {
        if self.decide(GatedAction::Save)? == Decision::Ignore {
            return Ok(false);
        }
        let stamped = self.review.saved_at(Utc::now());

        let store = Arc::clone(&self.store);
        self.bounded("save", store.save(&stamped)).await?;

        self.review = stamped;
        debug!(review = %self.review.id, "draft saved");
        Ok(true)
    }

    /// Validate the active stage and advance the review.
    ///
    /// Returns `false` if the request was ignored by policy.
    pub async fn submit(&mut self) -> Result<bool> {
        let from = self.review.current_stage;
        let next = self.gated(self.gate.submit(self.context.actor(), &self.review))?;
        if next.current_stage == from {
            return Ok(false);
        }
        let stamped = next.saved_at(Utc::now());

        let store = Arc::clone(&self.store);
        self.bounded("submit", store.submit(&stamped)).await?;

        self.review = stamped;
        info!(
            review = %self.review.id,
            from = %from,
            to = %self.review.current_stage,
            status = ?self.review.overall_status,
            "review submitted"
        );
        Ok(true)
    }

    pub fn summary(&self) -> ScoreSummary {
        scoring::summarize(&self.review)
    }

    /// End the session, returning the final snapshot.
    pub fn close(self) -> ReviewData {
        self.context.logout();
        self.review
    }

    fn decide(&self, action: GatedAction) -> Result<Decision> {
        self.gated(self.gate.decide(self.context.actor(), &self.review, action))
    }

    /// Log permission denials on their way out.
    fn gated<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e @ ReviewError::PermissionDenied { .. }) = &result {
            warn!(review = %self.review.id, user = %self.context.actor().user_id, "{e}");
        }
        result
    }

    /// Run the upload on its own task so a timeout does not cancel a write
    /// half way. Content that lands after the timeout is deleted.
    async fn upload(
        &self,
        kra_id: &KraId,
        goal_id: Option<&GoalId>,
        upload: EvidenceUpload,
        content: Vec<u8>,
    ) -> Result<EvidenceFile> {
        let evidence = Arc::clone(&self.evidence);
        let (kra_id, goal_id) = (kra_id.clone(), goal_id.cloned());
        let mut task = tokio::spawn(async move {
            evidence
                .upload(&kra_id, goal_id.as_ref(), upload, content)
                .await
        });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => result.map_err(|e| self.collab_failure("upload", e)),
            Ok(Err(e)) => Err(ReviewError::ExternalFailure(format!("upload: {e}"))),
            Err(_) => {
                let evidence = Arc::clone(&self.evidence);
                tokio::spawn(async move {
                    if let Ok(Ok(file)) = task.await {
                        if let Err(e) = evidence.delete(&file.id).await {
                            warn!(evidence = %file.id, error = %e, "late upload not removed");
                        }
                    }
                });
                Err(self.timed_out("upload"))
            }
        }
    }

    /// Best-effort removal of content that never got referenced.
    async fn discard(&self, evidence_id: &EvidenceId) {
        let evidence = Arc::clone(&self.evidence);
        if let Err(e) = self.bounded("delete", evidence.delete(evidence_id)).await {
            warn!(
                review = %self.review.id,
                evidence = %evidence_id,
                error = %e,
                "orphaned evidence left behind"
            );
        }
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = std::result::Result<T, CollabError>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| self.collab_failure(what, e)),
            Err(_) => Err(self.timed_out(what)),
        }
    }

    fn collab_failure(&self, what: &str, e: CollabError) -> ReviewError {
        match e {
            CollabError::Validation(e) => ReviewError::Validation(e),
            e => {
                warn!(review = %self.review.id, error = %e, "{what} failed");
                ReviewError::ExternalFailure(format!("{what}: {e}"))
            }
        }
    }

    fn timed_out(&self, what: &str) -> ReviewError {
        warn!(
            review = %self.review.id,
            timeout_ms = self.timeout.as_millis() as u64,
            "{what} timed out"
        );
        ReviewError::ExternalFailure(format!(
            "{what} timed out after {} ms",
            self.timeout.as_millis()
        ))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kra_review_core::Role;

    #[test]
    fn login_records_start_time() {
        let before = Utc::now();
        let context = SessionContext::login(Actor::new("emp-1", Role::Employee), true);
        assert!(context.started_at >= before);
        assert!(context.read_only());
        context.logout();
    }
}
