//! Import batch persistence
//!
//! Lifecycle transitions are written with an optimistic `WHERE status = ?`
//! guard; an update that matches zero rows means the batch was not in the
//! expected state and the transition is refused.

use crate::models::{
    batch::MAX_STORED_ERROR_ROWS, BatchStatus, ImportBatch, RowErrors,
};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn batch_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ImportBatch> {
    let id: String = row.get("id");
    let status: String = row.get("status");
    let started_at: Option<String> = row.get("started_at");
    let finished_at: Option<String> = row.get("finished_at");
    let committed_at: Option<String> = row.get("committed_at");

    let parse_ts = |s: String| -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc))
    };

    Ok(ImportBatch {
        id: Uuid::parse_str(&id)?,
        submitted_by: row.get("submitted_by"),
        organization_unit_id: row.get("organization_unit_id"),
        status: BatchStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("unknown batch status: {status}"))?,
        original_filename: row.get("original_filename"),
        stored_path: row.get("stored_path"),
        content_hash: row.get("content_hash"),
        total_rows: row.get("total_rows"),
        valid_rows: row.get("valid_rows"),
        invalid_rows: row.get("invalid_rows"),
        created_count: row.get("created_count"),
        updated_count: row.get("updated_count"),
        error_count: row.get("error_count"),
        started_at: started_at.map(parse_ts).transpose()?,
        finished_at: finished_at.map(parse_ts).transpose()?,
        committed_at: committed_at.map(parse_ts).transpose()?,
    })
}

/// Insert a freshly stored batch in `draft`
pub async fn insert_draft(pool: &SqlitePool, batch: &ImportBatch) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO import_batches (
            id, submitted_by, organization_unit_id, status, original_filename,
            stored_path, content_hash, created_at, updated_at
        )
        VALUES (?, ?, ?, 'draft', ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(batch.id.to_string())
    .bind(&batch.submitted_by)
    .bind(batch.organization_unit_id)
    .bind(&batch.original_filename)
    .bind(&batch.stored_path)
    .bind(&batch.content_hash)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one batch by id
pub async fn load_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<Option<ImportBatch>> {
    let row = sqlx::query("SELECT * FROM import_batches WHERE id = ?")
        .bind(batch_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(batch_from_row).transpose()
}

/// draft → previewed: record counts and persist the capped error rows
pub async fn mark_previewed(
    pool: &SqlitePool,
    batch_id: Uuid,
    total_rows: i64,
    valid_rows: i64,
    invalid_rows: i64,
    errors: &[RowErrors],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE import_batches
        SET status = 'previewed', total_rows = ?, valid_rows = ?, invalid_rows = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'draft'
        "#,
    )
    .bind(total_rows)
    .bind(valid_rows)
    .bind(invalid_rows)
    .bind(batch_id.to_string())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        bail!("batch {batch_id} is not in draft state");
    }

    for row_errors in errors.iter().take(MAX_STORED_ERROR_ROWS) {
        sqlx::query(
            r#"
            INSERT INTO import_batch_errors (id, batch_id, row_number, errors)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(batch_id.to_string())
        .bind(row_errors.row_number)
        .bind(serde_json::to_string(&row_errors.errors)?)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// previewed → processing: stamp startedAt
pub async fn mark_processing(pool: &SqlitePool, batch_id: Uuid) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE import_batches
        SET status = 'processing', started_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'previewed'
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(batch_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("batch {batch_id} is not in previewed state");
    }
    Ok(())
}

/// processing → completed: final counts
pub async fn mark_completed(
    pool: &SqlitePool,
    batch_id: Uuid,
    created_count: i64,
    updated_count: i64,
    error_count: i64,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE import_batches
        SET status = 'completed', created_count = ?, updated_count = ?, error_count = ?,
            finished_at = ?, committed_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'processing'
        "#,
    )
    .bind(created_count)
    .bind(updated_count)
    .bind(error_count)
    .bind(&now)
    .bind(&now)
    .bind(batch_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("batch {batch_id} is not in processing state");
    }
    Ok(())
}

/// processing → failed: batch-level failure before any row was processed
pub async fn mark_failed(pool: &SqlitePool, batch_id: Uuid) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE import_batches
        SET status = 'failed', finished_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'processing'
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(batch_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("batch {batch_id} is not in processing state");
    }
    Ok(())
}

/// Stored error rows for one batch, ordered by row number
pub async fn load_errors(pool: &SqlitePool, batch_id: Uuid) -> Result<Vec<RowErrors>> {
    let rows = sqlx::query(
        "SELECT row_number, errors FROM import_batch_errors
         WHERE batch_id = ? ORDER BY row_number",
    )
    .bind(batch_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let row_number: i64 = row.get("row_number");
        let errors_json: String = row.get("errors");
        out.push(RowErrors {
            row_number,
            errors: serde_json::from_str(&errors_json)?,
        });
    }
    Ok(out)
}
