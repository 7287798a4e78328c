//! Filesystem-backed collaborators.
//!
//! Reviews are pretty-printed JSON documents named `<review-id>.json`.
//! Evidence content is stored as one file per evidence id.

use super::{CollabError, EvidenceStore, ReviewStore};
use async_trait::async_trait;
use chrono::Utc;
use kra_review_core::{EvidenceFile, EvidenceId, EvidenceUpload, GoalId, KraId, ReviewData, ReviewId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Ids become file names; refuse anything that could escape the directory.
fn safe_file_stem(id: &str) -> Result<&str, CollabError> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || id.chars().any(char::is_control);
    if bad {
        return Err(CollabError::Rejected(format!("invalid id '{id}'")));
    }
    Ok(id)
}

/// Write via a temp file and rename so readers never see a partial file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CollabError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

// =============================================================================
// REVIEW STORE
// =============================================================================

/// One JSON document per review under a data directory.
#[derive(Debug, Clone)]
pub struct FsReviewStore {
    dir: PathBuf,
}

impl FsReviewStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &ReviewId) -> Result<PathBuf, CollabError> {
        let stem = safe_file_stem(id.as_str())?;
        Ok(self.dir.join(format!("{stem}.json")))
    }

    /// Load a review, `None` if no document exists.
    pub async fn load(&self, id: &ReviewId) -> Result<Option<ReviewData>, CollabError> {
        let path = self.path_for(id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, review: &ReviewData) -> Result<PathBuf, CollabError> {
        let path = self.path_for(&review.id)?;
        let bytes = serde_json::to_vec_pretty(review)?;
        write_atomic(&path, &bytes).await?;
        Ok(path)
    }
}

#[async_trait]
impl ReviewStore for FsReviewStore {
    async fn save(&self, review: &ReviewData) -> Result<(), CollabError> {
        let path = self.write(review).await?;
        debug!(review = %review.id, path = %path.display(), "draft written");
        Ok(())
    }

    async fn submit(&self, review: &ReviewData) -> Result<(), CollabError> {
        let path = self.write(review).await?;
        debug!(
            review = %review.id,
            stage = %review.current_stage,
            path = %path.display(),
            "submission written"
        );
        Ok(())
    }
}

// =============================================================================
// EVIDENCE STORE
// =============================================================================

/// Evidence content stored as `<dir>/<uuid>`.
#[derive(Debug, Clone)]
pub struct FsEvidenceStore {
    dir: PathBuf,
}

impl FsEvidenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &EvidenceId) -> Result<PathBuf, CollabError> {
        Ok(self.dir.join(safe_file_stem(id.as_str())?))
    }
}

#[async_trait]
impl EvidenceStore for FsEvidenceStore {
    async fn upload(
        &self,
        kra_id: &KraId,
        goal_id: Option<&GoalId>,
        upload: EvidenceUpload,
        content: Vec<u8>,
    ) -> Result<EvidenceFile, CollabError> {
        upload.validate()?;
        if content.len() as u64 != upload.size_bytes {
            return Err(CollabError::Rejected(format!(
                "declared size {} does not match {} bytes received",
                upload.size_bytes,
                content.len()
            )));
        }

        let id = EvidenceId::new(Uuid::new_v4().to_string());
        let path = self.path_for(&id)?;
        write_atomic(&path, &content).await?;
        debug!(
            evidence = %id,
            kra = %kra_id,
            goal = goal_id.map(GoalId::as_str).unwrap_or("-"),
            "evidence stored"
        );

        let url = Some(format!("file://{}", path.display()));
        Ok(upload.into_file(id, Utc::now(), url)?)
    }

    async fn delete(&self, evidence_id: &EvidenceId) -> Result<(), CollabError> {
        let path = self.path_for(evidence_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn path_traversal_ids_are_rejected() {
        assert!(safe_file_stem("../etc").is_err());
        assert!(safe_file_stem("a/b").is_err());
        assert!(safe_file_stem("..").is_err());
        assert!(safe_file_stem("").is_err());
        assert!(safe_file_stem("rev-2024").is_ok());
    }

    #[tokio::test]
    async fn upload_then_delete_twice() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEvidenceStore::new(dir.path());
        let content = b"hello evidence".to_vec();
        let upload = EvidenceUpload::new("notes.txt", "text/plain", content.len() as u64);

        let file = store
            .upload(&KraId::new("k1"), None, upload, content)
            .await
            .unwrap();
        let path = store.path_for(&file.id).unwrap();
        assert!(path.exists());
        assert_eq!(file.size_label, "14 Bytes");

        store.delete(&file.id).await.unwrap();
        assert!(!path.exists());
        store.delete(&file.id).await.unwrap();
    }

    #[tokio::test]
    async fn upload_rejects_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEvidenceStore::new(dir.path());
        let upload = EvidenceUpload::new("notes.txt", "text/plain", 99);
        let result = store
            .upload(&KraId::new("k1"), None, upload, b"short".to_vec())
            .await;
        assert!(matches!(result, Err(CollabError::Rejected(_))));
    }

    #[tokio::test]
    async fn load_missing_review_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsReviewStore::new(dir.path());
        let loaded = store.load(&ReviewId::new("absent")).await.unwrap();
        assert!(loaded.is_none());
    }
}
