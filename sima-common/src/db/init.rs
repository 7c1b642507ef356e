//! Database initialization
//!
//! Opens (or creates) the SQLite database and applies the schema
//! idempotently. Every table uses `CREATE TABLE IF NOT EXISTS`, so startup
//! is safe against existing databases.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Apply pragmas and create all tables on an already-open pool
///
/// Split out from [`init_database`] so tests can run against in-memory
/// databases.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    // Wait for locks instead of failing immediately
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    create_organization_units_table(pool).await?;
    create_union_positions_table(pool).await?;
    create_members_table(pool).await?;
    create_users_table(pool).await?;
    create_member_sequences_table(pool).await?;
    create_import_batches_table(pool).await?;
    create_import_batch_errors_table(pool).await?;

    Ok(())
}

async fn create_organization_units_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organization_units (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_union_positions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS union_positions (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            organization_unit_id INTEGER NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            nip TEXT,
            nra TEXT,
            kta_number TEXT,
            birth_place TEXT,
            birth_date TEXT,
            gender TEXT,
            join_date TEXT,
            join_year INTEGER,
            sequence_number INTEGER,
            status TEXT NOT NULL DEFAULT 'aktif',
            employment_type TEXT NOT NULL DEFAULT 'organik',
            union_position_code TEXT,
            company_email TEXT,
            address TEXT,
            user_id TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Natural keys are unique per organization unit; nullable keys use
    // partial indexes so absent values do not collide
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_members_unit_email
         ON members(organization_unit_id, email)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_members_unit_nra
         ON members(organization_unit_id, nra) WHERE nra IS NOT NULL",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_members_unit_nip
         ON members(organization_unit_id, nip) WHERE nip IS NOT NULL",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_members_unit_kta
         ON members(organization_unit_id, kta_number) WHERE kta_number IS NOT NULL",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            member_id TEXT,
            organization_unit_id INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_member_sequences_table(pool: &SqlitePool) -> Result<()> {
    // Durable counter backing sequence allocation. Never replaced by an
    // in-memory counter: allocation must be safe across processes.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS member_sequences (
            organization_unit_id INTEGER NOT NULL,
            join_year INTEGER NOT NULL,
            last_sequence INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (organization_unit_id, join_year)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_import_batches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            id TEXT PRIMARY KEY,
            submitted_by TEXT NOT NULL,
            organization_unit_id INTEGER,
            status TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'previewed', 'processing', 'completed', 'failed')),
            original_filename TEXT NOT NULL,
            stored_path TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            total_rows INTEGER NOT NULL DEFAULT 0,
            valid_rows INTEGER NOT NULL DEFAULT 0,
            invalid_rows INTEGER NOT NULL DEFAULT 0,
            created_count INTEGER NOT NULL DEFAULT 0,
            updated_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            started_at TEXT,
            finished_at TEXT,
            committed_at TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_import_batch_errors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batch_errors (
            id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL REFERENCES import_batches(id),
            row_number INTEGER NOT NULL,
            errors TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_batch_errors_batch
         ON import_batch_errors(batch_id, row_number)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
