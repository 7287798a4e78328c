//! # Collaborators
//!
//! Async contracts for everything the review engine does not own:
//! persisting drafts and submissions, and storing evidence content.
//!
//! Implementations must be idempotent under retry. The session layer wraps
//! every call in a timeout and only commits state after success.

mod fs;

pub use fs::{FsEvidenceStore, FsReviewStore};

use async_trait::async_trait;
use kra_review_core::{
    EvidenceFile, EvidenceId, EvidenceUpload, GoalId, KraId, ReviewData, ValidationError,
};
use thiserror::Error;

/// Failure reported by a collaborator.
#[derive(Debug, Error)]
pub enum CollabError {
    /// The collaborator refused the input (size/type limits, ...).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rejected: {0}")]
    Rejected(String),
}

/// Persistence for review drafts and submissions.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Persist the current draft.
    async fn save(&self, review: &ReviewData) -> Result<(), CollabError>;

    /// Persist a review that has just advanced a stage.
    async fn submit(&self, review: &ReviewData) -> Result<(), CollabError>;
}

/// Opaque storage for evidence content.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Store `content` and return its metadata with a fresh id.
    async fn upload(
        &self,
        kra_id: &KraId,
        goal_id: Option<&GoalId>,
        upload: EvidenceUpload,
        content: Vec<u8>,
    ) -> Result<EvidenceFile, CollabError>;

    /// Remove stored content. Deleting an unknown id succeeds.
    async fn delete(&self, evidence_id: &EvidenceId) -> Result<(), CollabError>;
}
