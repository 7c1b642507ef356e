//! Reference table lookups
//!
//! Organization units and union positions are managed elsewhere in the
//! system; the import pipeline only checks existence.

use anyhow::Result;
use sqlx::SqlitePool;

/// Does an organization unit exist?
pub async fn unit_exists(pool: &SqlitePool, unit_id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM organization_units WHERE id = ?")
        .bind(unit_id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Does a union position code exist?
pub async fn position_exists(pool: &SqlitePool, code: &str) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM union_positions WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Insert an organization unit (seed/admin path)
pub async fn insert_unit(pool: &SqlitePool, unit_id: i64, name: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO organization_units (id, name) VALUES (?, ?)")
        .bind(unit_id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a union position (seed/admin path)
pub async fn insert_position(pool: &SqlitePool, code: &str, name: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO union_positions (code, name) VALUES (?, ?)")
        .bind(code)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}
