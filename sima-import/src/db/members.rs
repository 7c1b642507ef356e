//! Member persistence
//!
//! Natural keys (`nra`, `kta_number`, `nip`, `email`) are unique per
//! organization unit; the schema enforces this with per-unit unique
//! indexes, so a constraint violation at write time surfaces as a
//! row-level error to the caller.

use crate::models::Member;
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Natural key columns checked for cross-unit ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalKey {
    Nra,
    Email,
    Nip,
    KtaNumber,
}

impl NaturalKey {
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Nra => "nra",
            Self::Email => "email",
            Self::Nip => "nip",
            Self::KtaNumber => "kta_number",
        }
    }
}

const MEMBER_COLUMNS: &str = "id, organization_unit_id, full_name, email, phone, nip, nra, \
     kta_number, birth_place, birth_date, gender, join_date, join_year, \
     sequence_number, status, employment_type, union_position_code, \
     company_email, address, user_id";

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Member> {
    let id: String = row.get("id");
    let user_id: Option<String> = row.get("user_id");
    let birth_date: Option<String> = row.get("birth_date");
    let join_date: Option<String> = row.get("join_date");

    Ok(Member {
        id: Uuid::parse_str(&id)?,
        organization_unit_id: row.get("organization_unit_id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        nip: row.get("nip"),
        nra: row.get("nra"),
        kta_number: row.get("kta_number"),
        birth_place: row.get("birth_place"),
        birth_date: birth_date
            .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
            .transpose()?,
        gender: row.get("gender"),
        join_date: join_date
            .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
            .transpose()?,
        join_year: row.get("join_year"),
        sequence_number: row.get("sequence_number"),
        status: row.get("status"),
        employment_type: row.get("employment_type"),
        union_position_code: row.get("union_position_code"),
        company_email: row.get("company_email"),
        address: row.get("address"),
        user_id: user_id.map(|u| Uuid::parse_str(&u)).transpose()?,
    })
}

/// Look up a member within one unit by a natural key column
async fn find_by_key_in_unit(
    pool: &SqlitePool,
    unit_id: i64,
    key: NaturalKey,
    value: &str,
) -> Result<Option<Member>> {
    let sql = match key {
        NaturalKey::Nip => format!("SELECT {MEMBER_COLUMNS} FROM members WHERE organization_unit_id = ? AND nip = ?"),
        NaturalKey::Nra => format!("SELECT {MEMBER_COLUMNS} FROM members WHERE organization_unit_id = ? AND nra = ?"),
        NaturalKey::Email => format!("SELECT {MEMBER_COLUMNS} FROM members WHERE organization_unit_id = ? AND email = ?"),
        NaturalKey::KtaNumber => format!("SELECT {MEMBER_COLUMNS} FROM members WHERE organization_unit_id = ? AND kta_number = ?"),
    };
    let row = sqlx::query(&sql)
        .bind(unit_id)
        .bind(value)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(member_from_row).transpose()
}

/// Resolve an existing member inside one unit by `nip`, else `nra`, else
/// `email`, in that priority order
pub async fn find_match_in_unit(
    pool: &SqlitePool,
    unit_id: i64,
    nip: Option<&str>,
    nra: Option<&str>,
    email: Option<&str>,
) -> Result<Option<Member>> {
    if let Some(nip) = nip {
        if let Some(m) = find_by_key_in_unit(pool, unit_id, NaturalKey::Nip, nip).await? {
            return Ok(Some(m));
        }
    }
    if let Some(nra) = nra {
        if let Some(m) = find_by_key_in_unit(pool, unit_id, NaturalKey::Nra, nra).await? {
            return Ok(Some(m));
        }
    }
    if let Some(email) = email {
        if let Some(m) = find_by_key_in_unit(pool, unit_id, NaturalKey::Email, email).await? {
            return Ok(Some(m));
        }
    }
    Ok(None)
}

/// Which unit (if any) already owns a natural key value, anywhere in the
/// store. Any existing occurrence is treated as owned by that unit.
pub async fn unit_holding(
    pool: &SqlitePool,
    key: NaturalKey,
    value: &str,
) -> Result<Option<i64>> {
    let sql = match key {
        NaturalKey::Nra => "SELECT organization_unit_id FROM members WHERE nra = ? LIMIT 1",
        NaturalKey::Email => "SELECT organization_unit_id FROM members WHERE email = ? LIMIT 1",
        NaturalKey::Nip => "SELECT organization_unit_id FROM members WHERE nip = ? LIMIT 1",
        NaturalKey::KtaNumber => {
            "SELECT organization_unit_id FROM members WHERE kta_number = ? LIMIT 1"
        }
    };
    let unit: Option<i64> = sqlx::query_scalar(sql).bind(value).fetch_optional(pool).await?;
    Ok(unit)
}

/// Insert a new member record
pub async fn insert_member(pool: &SqlitePool, member: &Member) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO members (
            id, organization_unit_id, full_name, email, phone, nip, nra,
            kta_number, birth_place, birth_date, gender, join_date, join_year,
            sequence_number, status, employment_type, union_position_code,
            company_email, address, user_id, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(member.id.to_string())
    .bind(member.organization_unit_id)
    .bind(&member.full_name)
    .bind(&member.email)
    .bind(&member.phone)
    .bind(&member.nip)
    .bind(&member.nra)
    .bind(&member.kta_number)
    .bind(&member.birth_place)
    .bind(member.birth_date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&member.gender)
    .bind(member.join_date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(member.join_year)
    .bind(member.sequence_number)
    .bind(&member.status)
    .bind(&member.employment_type)
    .bind(&member.union_position_code)
    .bind(&member.company_email)
    .bind(&member.address)
    .bind(member.user_id.map(|u| u.to_string()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Update the mutable whitelist of an existing member.
///
/// The caller merges incoming row values onto the loaded record first, so
/// this writes the merged state. Identity columns (id, unit, nra,
/// kta_number, sequence_number, join_year) are never touched here.
pub async fn update_member(pool: &SqlitePool, member: &Member) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE members SET
            full_name = ?,
            email = ?,
            phone = ?,
            nip = ?,
            birth_place = ?,
            birth_date = ?,
            gender = ?,
            join_date = ?,
            status = ?,
            employment_type = ?,
            union_position_code = ?,
            company_email = ?,
            address = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&member.full_name)
    .bind(&member.email)
    .bind(&member.phone)
    .bind(&member.nip)
    .bind(&member.birth_place)
    .bind(member.birth_date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&member.gender)
    .bind(member.join_date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&member.status)
    .bind(&member.employment_type)
    .bind(&member.union_position_code)
    .bind(&member.company_email)
    .bind(&member.address)
    .bind(member.id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Point a member at its linked user account
pub async fn set_member_user(pool: &SqlitePool, member_id: Uuid, user_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE members SET user_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(user_id.to_string())
        .bind(member_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Load one member by id
pub async fn load_member(pool: &SqlitePool, member_id: Uuid) -> Result<Option<Member>> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(member_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(member_from_row).transpose()
}

/// Count members within one unit
pub async fn count_members_in_unit(pool: &SqlitePool, unit_id: i64) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE organization_unit_id = ?")
            .bind(unit_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
