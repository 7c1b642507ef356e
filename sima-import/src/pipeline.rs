//! Import pipeline orchestration
//!
//! Two-phase workflow over one stored upload:
//!
//! 1. `preview`: store the file, parse and validate every row, record
//!    counts and the capped error list on the batch. No member is touched.
//! 2. `commit`: explicit second call; re-reads the stored file and
//!    upserts row by row (see [`crate::committer`]).

use crate::committer::Committer;
use crate::db;
use crate::error::{ImportError, ImportResult};
use crate::models::{BatchReport, BatchStatus, ImportBatch};
use crate::normalizer::normalize_row;
use crate::parser::{self, RowMap};
use crate::storage::FileStore;
use crate::validator::RowValidator;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

/// Entry point for the bulk member reconciliation pipeline
pub struct ImportPipeline {
    pool: SqlitePool,
    store: FileStore,
}

impl ImportPipeline {
    /// `data_dir` is the service data directory; uploads are stored under
    /// its `imports/` subdirectory
    pub fn new(pool: SqlitePool, data_dir: PathBuf) -> Self {
        let store = FileStore::new(data_dir.join("imports"));
        Self { pool, store }
    }

    /// Store an upload and validate it without touching any member.
    ///
    /// `unit` scopes the batch to one organization unit; `None` submits a
    /// global batch whose rows must each name their own unit. An
    /// unparseable file previews to zero rows with no stored errors.
    pub async fn preview(
        &self,
        submitted_by: &str,
        unit: Option<i64>,
        filename: &str,
        bytes: &[u8],
    ) -> ImportResult<BatchReport> {
        let (stored_path, content_hash) = self.store.store(filename, bytes)?;

        let batch = ImportBatch {
            id: Uuid::new_v4(),
            submitted_by: submitted_by.to_string(),
            organization_unit_id: unit,
            status: BatchStatus::Draft,
            original_filename: filename.to_string(),
            stored_path,
            content_hash,
            total_rows: 0,
            valid_rows: 0,
            invalid_rows: 0,
            created_count: 0,
            updated_count: 0,
            error_count: 0,
            started_at: None,
            finished_at: None,
            committed_at: None,
        };
        db::batches::insert_draft(&self.pool, &batch).await?;
        info!(batch = %batch.id, filename, "upload stored, batch drafted");

        let rows = match self.parse_rows(filename, bytes) {
            Ok(rows) => rows,
            Err(e) => {
                // The batch produced no data; it previews with zero rows
                // and nothing to commit
                warn!(batch = %batch.id, error = %e, "upload could not be parsed");
                db::batches::mark_previewed(&self.pool, batch.id, 0, 0, 0, &[]).await?;
                return self.status(batch.id).await;
            }
        };

        let validator = RowValidator::new(self.pool.clone());
        let reports = validator.validate_rows(&rows, unit).await?;

        let total = reports.len() as i64;
        let invalid = reports.iter().filter(|r| r.has_critical()).count() as i64;
        let valid = total - invalid;

        let error_rows: Vec<_> = reports
            .into_iter()
            .filter(|r| !r.errors.is_empty())
            .collect();

        db::batches::mark_previewed(&self.pool, batch.id, total, valid, invalid, &error_rows)
            .await?;
        info!(batch = %batch.id, total, valid, invalid, "preview complete");

        self.status(batch.id).await
    }

    /// Commit a previewed batch and return its final report
    pub async fn commit(&self, batch_id: Uuid) -> ImportResult<BatchReport> {
        let committer = Committer::new(self.pool.clone(), self.store.clone());
        committer.commit(batch_id).await?;
        self.status(batch_id).await
    }

    /// Caller-facing batch summary with the capped error list
    pub async fn status(&self, batch_id: Uuid) -> ImportResult<BatchReport> {
        let batch = db::batches::load_batch(&self.pool, batch_id)
            .await?
            .ok_or_else(|| ImportError::BatchNotFound(batch_id.to_string()))?;
        let errors = db::batches::load_errors(&self.pool, batch_id).await?;

        Ok(BatchReport {
            id: batch.id,
            status: batch.status,
            total_rows: batch.total_rows,
            valid_rows: batch.valid_rows,
            invalid_rows: batch.invalid_rows,
            created_count: batch.created_count,
            updated_count: batch.updated_count,
            error_count: batch.error_count,
            errors,
        })
    }

    fn parse_rows(&self, filename: &str, bytes: &[u8]) -> ImportResult<Vec<(i64, RowMap)>> {
        let row_parser = parser::parser_for_extension(&parser::file_extension(filename))?;
        let raw_rows = row_parser.parse(bytes)?;
        Ok(raw_rows
            .iter()
            .enumerate()
            // Header is row 1, data starts at row 2
            .map(|(i, raw)| (i as i64 + 2, normalize_row(raw)))
            .collect())
    }
}
