//! Shared test fixtures

use sima_import::models::Member;
use sima_import::ImportPipeline;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

/// In-memory database with the full schema.
///
/// A single connection keeps the in-memory database shared; tests needing
/// real concurrency use [`file_pool`] instead.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    sima_common::db::init_schema(&pool).await.unwrap();
    pool
}

/// File-backed database shared across pooled connections
pub async fn file_pool(dir: &Path) -> SqlitePool {
    let db_path = dir.join("test.db");
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("sqlite://{}?mode=rwc", db_path.display()))
        .await
        .unwrap();
    sima_common::db::init_schema(&pool).await.unwrap();
    pool
}

/// Seed the reference tables used across tests
pub async fn seed_reference(pool: &SqlitePool) {
    for (id, name) in [(5, "Unit Lima"), (7, "Unit Tujuh"), (9, "Unit Sembilan")] {
        sima_import::db::reference::insert_unit(pool, id, name)
            .await
            .unwrap();
    }
    for (code, name) in [("KETUA", "Ketua"), ("SEKRETARIS", "Sekretaris")] {
        sima_import::db::reference::insert_position(pool, code, name)
            .await
            .unwrap();
    }
}

/// Pipeline writing uploads under a temp data directory
pub fn pipeline(pool: &SqlitePool, dir: &TempDir) -> ImportPipeline {
    ImportPipeline::new(pool.clone(), dir.path().to_path_buf())
}

/// Minimal persisted member fixture
pub fn member_fixture(unit: i64, full_name: &str, email: &str) -> Member {
    Member {
        id: Uuid::new_v4(),
        organization_unit_id: unit,
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: None,
        nip: None,
        nra: None,
        kta_number: None,
        birth_place: None,
        birth_date: None,
        gender: None,
        join_date: None,
        join_year: None,
        sequence_number: None,
        status: "aktif".to_string(),
        employment_type: "organik".to_string(),
        union_position_code: None,
        company_email: None,
        address: None,
        user_id: None,
    }
}
