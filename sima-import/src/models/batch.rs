//! Import batch lifecycle and structured row errors
//!
//! A batch progresses through five states:
//! draft → previewed → processing → completed | failed
//!
//! `draft` is entered when the uploaded file is stored; `previewed` once
//! validation finished (no member mutation yet); `processing` when an
//! explicit commit starts; `completed` when the per-row commit loop ran to
//! the end (row-level failures are counted, not fatal); `failed` only when
//! the stored file cannot be read back at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Preview stores at most this many error rows per batch
pub const MAX_STORED_ERROR_ROWS: usize = 100;

/// Batch lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Draft,
    Previewed,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Previewed => "previewed",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "previewed" => Some(Self::Previewed),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Legal lifecycle transitions. There is no re-preview and no way out
    /// of a terminal state.
    pub fn can_transition_to(self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Previewed)
                | (Self::Previewed, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Severity of one field error. Critical blocks the row's commit,
/// warning is informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

/// One structured validation finding on one field of one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub severity: Severity,
    /// Offending value, truncated and masked for sensitive fields
    pub current_value: Option<String>,
    pub message: String,
    pub expected_format: Option<String>,
}

impl FieldError {
    pub fn critical(
        field: &str,
        current_value: Option<String>,
        message: impl Into<String>,
        expected_format: Option<&str>,
    ) -> Self {
        Self {
            field: field.to_string(),
            severity: Severity::Critical,
            current_value,
            message: message.into(),
            expected_format: expected_format.map(str::to_string),
        }
    }

    pub fn warning(
        field: &str,
        current_value: Option<String>,
        message: impl Into<String>,
        expected_format: Option<&str>,
    ) -> Self {
        Self {
            field: field.to_string(),
            severity: Severity::Warning,
            current_value,
            message: message.into(),
            expected_format: expected_format.map(str::to_string),
        }
    }
}

/// All findings for one spreadsheet row
///
/// `row_number` is 1-based counting the header as row 1, so the first data
/// row is row 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowErrors {
    pub row_number: i64,
    pub errors: Vec<FieldError>,
}

impl RowErrors {
    /// A row commits only when it has no critical finding
    pub fn has_critical(&self) -> bool {
        self.errors.iter().any(|e| e.severity == Severity::Critical)
    }
}

/// One submitted file and its lifecycle
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub id: Uuid,
    pub submitted_by: String,
    /// None means a global batch spanning multiple units; each row must
    /// then carry its own organization_unit_id
    pub organization_unit_id: Option<i64>,
    pub status: BatchStatus,
    pub original_filename: String,
    pub stored_path: String,
    pub content_hash: String,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub invalid_rows: i64,
    pub created_count: i64,
    pub updated_count: i64,
    pub error_count: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub committed_at: Option<DateTime<Utc>>,
}

/// Caller-facing batch summary
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub id: Uuid,
    pub status: BatchStatus,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub invalid_rows: i64,
    pub created_count: i64,
    pub updated_count: i64,
    pub error_count: i64,
    /// Capped at [`MAX_STORED_ERROR_ROWS`] rows
    pub errors: Vec<RowErrors>,
}
