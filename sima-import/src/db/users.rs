//! User account persistence

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Linked user account record
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub member_id: Option<Uuid>,
    pub organization_unit_id: Option<i64>,
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserAccount> {
    let id: String = row.get("id");
    let member_id: Option<String> = row.get("member_id");

    Ok(UserAccount {
        id: Uuid::parse_str(&id)?,
        email: row.get("email"),
        member_id: member_id.map(|m| Uuid::parse_str(&m)).transpose()?,
        organization_unit_id: row.get("organization_unit_id"),
    })
}

/// Find a user account by email
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserAccount>> {
    let row = sqlx::query(
        "SELECT id, email, member_id, organization_unit_id FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Create a user account
pub async fn insert_user(
    pool: &SqlitePool,
    user: &UserAccount,
    password_hash: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, member_id, organization_unit_id,
                           created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(password_hash)
    .bind(user.member_id.map(|m| m.to_string()))
    .bind(user.organization_unit_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Attach a member to an account that has none yet
pub async fn set_member_id(pool: &SqlitePool, user_id: Uuid, member_id: Uuid) -> Result<()> {
    sqlx::query(
        "UPDATE users SET member_id = ?, updated_at = CURRENT_TIMESTAMP
         WHERE id = ? AND member_id IS NULL",
    )
    .bind(member_id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}
