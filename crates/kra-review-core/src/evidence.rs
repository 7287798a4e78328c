//! # Evidence
//!
//! Metadata for files that substantiate a KRA or Goal claim.
//!
//! The core only validates uploads and produces `EvidenceFile` records.
//! Storing bytes is the job of the evidence collaborator in the app layer.

use crate::{EvidenceId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// LIMITS
// =============================================================================

/// Largest accepted upload: 10 MiB.
pub const MAX_EVIDENCE_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types accepted as evidence.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
    "image/gif",
    "text/plain",
];

/// Check a MIME type against [`ALLOWED_MIME_TYPES`].
///
/// Parameters such as `; charset=utf-8` are ignored.
#[must_use]
pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_MIME_TYPES.contains(&essence.as_str())
}

/// Guess a MIME type from a file extension, limited to the allowed set.
#[must_use]
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

// =============================================================================
// EVIDENCE FILE
// =============================================================================

/// An uploaded file. Immutable once created; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceFile {
    pub id: EvidenceId,
    pub name: String,
    /// Human-readable size, e.g. "1.5 KB".
    pub size_label: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A file offered for upload, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceUpload {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl EvidenceUpload {
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    /// Enforce the size limit and the MIME allow-list.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.size_bytes > MAX_EVIDENCE_BYTES {
            return Err(ValidationError::FileTooLarge {
                name: self.name.clone(),
                size_bytes: self.size_bytes,
                limit_bytes: MAX_EVIDENCE_BYTES,
            });
        }
        if !is_allowed_mime_type(&self.mime_type) {
            return Err(ValidationError::UnsupportedType {
                name: self.name.clone(),
                mime_type: self.mime_type.clone(),
            });
        }
        Ok(())
    }

    /// Validate and turn into a stored `EvidenceFile`.
    pub fn into_file(
        self,
        id: EvidenceId,
        uploaded_at: DateTime<Utc>,
        url: Option<String>,
    ) -> Result<EvidenceFile, ValidationError> {
        self.validate()?;
        Ok(EvidenceFile {
            id,
            size_label: format_size(self.size_bytes),
            name: self.name,
            mime_type: self.mime_type,
            uploaded_at,
            url,
        })
    }
}

// =============================================================================
// SIZE LABELS
// =============================================================================

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count with base-1024 units and up to two decimals.
///
/// Trailing zeros are dropped: `1536` is `"1.5 KB"`, `1048576` is `"1 MB"`.
/// Uses integer arithmetic with half-up rounding to hundredths.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0usize;
    let mut divisor: u128 = 1;
    while unit + 1 < SIZE_UNITS.len() && u128::from(bytes) >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }

    // Hundredths of the chosen unit, rounded half-up.
    let hundredths = (u128::from(bytes) * 200 + divisor) / (divisor * 2);
    let whole = hundredths / 100;
    let frac = hundredths % 100;

    let number = if frac == 0 {
        whole.to_string()
    } else if frac % 10 == 0 {
        format!("{whole}.{}", frac / 10)
    } else {
        format!("{whole}.{frac:02}")
    };

    format!("{number} {}", SIZE_UNITS[unit])
}

// =============================================================================
// TESTS
// =============================================================================
