//! Batch commit
//!
//! Replays a previewed batch against the member store. The stored file is
//! re-read and re-parsed (commit never trusts preview-time state), and the
//! full validation pass runs again against the store as it is now, closing
//! the race window between preview and commit. Rows are then upserted one
//! at a time; a failing row is counted and skipped, it never aborts the
//! batch.

use crate::db;
use crate::error::{ImportError, ImportResult};
use crate::linker::AccountLinker;
use crate::models::{BatchStatus, EmploymentType, Gender, Member, MemberStatus};
use crate::normalizer::normalize_row;
use crate::parser::{self, RowMap};
use crate::scope::resolve_effective_unit;
use crate::sequence::SequenceAllocator;
use crate::storage::FileStore;
use crate::validator::{norm_code, norm_email, parse_flexible_date, RowValidator};
use chrono::{Datelike, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

/// Final commit counts for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub created_count: i64,
    pub updated_count: i64,
    pub error_count: i64,
}

enum RowAction {
    Created,
    Updated,
}

/// Per-row idempotent upsert against the member store
pub struct Committer {
    pool: SqlitePool,
    store: FileStore,
    allocator: SequenceAllocator,
    linker: AccountLinker,
}

impl Committer {
    pub fn new(pool: SqlitePool, store: FileStore) -> Self {
        let allocator = SequenceAllocator::new(pool.clone());
        let linker = AccountLinker::new(pool.clone());
        Self {
            pool,
            store,
            allocator,
            linker,
        }
    }

    /// Commit a previewed batch. The batch reaches `completed` whenever
    /// the row loop ran, regardless of per-row outcomes; it reaches
    /// `failed` only when commit dies before any row is processed, that
    /// is while reloading the stored file or re-running validation.
    pub async fn commit(&self, batch_id: Uuid) -> ImportResult<CommitOutcome> {
        let batch = db::batches::load_batch(&self.pool, batch_id)
            .await?
            .ok_or_else(|| ImportError::BatchNotFound(batch_id.to_string()))?;

        if batch.status != BatchStatus::Previewed {
            return Err(ImportError::InvalidState {
                expected: BatchStatus::Previewed.as_str().to_string(),
                found: batch.status.as_str().to_string(),
            });
        }

        db::batches::mark_processing(&self.pool, batch_id).await?;

        let rows = match self.reload_rows(&batch.stored_path, &batch.original_filename) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(batch = %batch_id, error = %e, "batch failed before any row");
                db::batches::mark_failed(&self.pool, batch_id).await?;
                return Err(e);
            }
        };

        let validator = RowValidator::new(self.pool.clone());
        let reports = match validator
            .validate_rows(&rows, batch.organization_unit_id)
            .await
        {
            Ok(reports) => reports,
            Err(e) => {
                warn!(batch = %batch_id, error = %e, "batch failed before any row");
                db::batches::mark_failed(&self.pool, batch_id).await?;
                return Err(e.into());
            }
        };

        let mut created = 0i64;
        let mut updated = 0i64;
        let mut errors = 0i64;

        for ((row_number, row), report) in rows.iter().zip(&reports) {
            if report.has_critical() {
                continue;
            }
            match self.commit_row(row, batch.organization_unit_id).await {
                Ok(RowAction::Created) => created += 1,
                Ok(RowAction::Updated) => updated += 1,
                Err(e) => {
                    warn!(batch = %batch_id, row = row_number, error = %e, "row commit failed");
                    errors += 1;
                }
            }
        }

        db::batches::mark_completed(&self.pool, batch_id, created, updated, errors).await?;
        info!(
            batch = %batch_id,
            created, updated, errors,
            "batch commit finished"
        );

        Ok(CommitOutcome {
            created_count: created,
            updated_count: updated,
            error_count: errors,
        })
    }

    /// Re-read and re-parse the stored upload into numbered canonical rows
    fn reload_rows(
        &self,
        stored_path: &str,
        original_filename: &str,
    ) -> ImportResult<Vec<(i64, RowMap)>> {
        let bytes = self.store.read(stored_path)?;
        let row_parser = parser::parser_for_extension(&parser::file_extension(original_filename))?;
        let raw_rows = row_parser.parse(&bytes)?;

        Ok(raw_rows
            .iter()
            .enumerate()
            // Header is row 1, data starts at row 2
            .map(|(i, raw)| (i as i64 + 2, normalize_row(raw)))
            .collect())
    }

    /// Upsert one validated row
    async fn commit_row(&self, row: &RowMap, batch_unit: Option<i64>) -> ImportResult<RowAction> {
        let row_unit = row
            .get("organization_unit_id")
            .and_then(|v| v.trim().parse::<i64>().ok());
        let unit = resolve_effective_unit(batch_unit, row_unit)
            .map_err(|v| anyhow::anyhow!("unit scope violation after validation: {v:?}"))?;

        let nip = row.get("nip").map(|v| norm_code(v)).filter(|v| !v.is_empty());
        let nra = row.get("nra").map(|v| norm_code(v)).filter(|v| !v.is_empty());
        let email = row
            .get("email")
            .map(|v| norm_email(v))
            .filter(|v| !v.is_empty());
        let kta_number = row
            .get("kta_number")
            .map(|v| norm_code(v))
            .filter(|v| !v.is_empty());

        let existing = db::members::find_match_in_unit(
            &self.pool,
            unit,
            nip.as_deref(),
            nra.as_deref(),
            email.as_deref(),
        )
        .await?;

        match existing {
            Some(mut member) => {
                merge_row_into(&mut member, row, nip, email);
                db::members::update_member(&self.pool, &member).await?;
                self.linker.link(&member, row).await?;
                Ok(RowAction::Updated)
            }
            None => {
                let member = self
                    .build_new_member(row, unit, nip, nra, email, kta_number)
                    .await?;
                db::members::insert_member(&self.pool, &member).await?;
                self.linker.link(&member, row).await?;
                Ok(RowAction::Created)
            }
        }
    }

    /// Assemble a new member record, allocating identifiers where the row
    /// carries none
    async fn build_new_member(
        &self,
        row: &RowMap,
        unit: i64,
        nip: Option<String>,
        nra: Option<String>,
        email: Option<String>,
        kta_number: Option<String>,
    ) -> ImportResult<Member> {
        let id = Uuid::new_v4();

        let join_date = row.get("join_date").and_then(|d| parse_flexible_date(d));
        let join_year = join_date
            .map(|d| d.year())
            .unwrap_or_else(|| Utc::now().year());

        // One allocation covers whichever of nra/kta_number is missing,
        // so the two identifiers cannot drift apart
        let (nra, kta_number, sequence_number) = if nra.is_none() || kta_number.is_none() {
            let allocated = self.allocator.allocate(unit, join_year).await?;
            (
                nra.unwrap_or(allocated.nra),
                kta_number.unwrap_or(allocated.kta_number),
                Some(allocated.sequence),
            )
        } else {
            (nra.unwrap(), kta_number.unwrap(), None)
        };

        // The store requires a non-null email; synthesize a unique
        // placeholder when the row carries none
        let email = email.unwrap_or_else(|| {
            format!("anggota-{}@no-email.simanggota.local", id.simple())
        });

        let status = row
            .get("status")
            .and_then(|s| MemberStatus::parse(s))
            .unwrap_or_else(MemberStatus::default_for_new);
        let employment_type = row
            .get("employment_type")
            .and_then(|s| EmploymentType::parse(s))
            .unwrap_or_else(EmploymentType::default_for_new);

        Ok(Member {
            id,
            organization_unit_id: unit,
            full_name: row.get("full_name").cloned().unwrap_or_default(),
            email,
            phone: row.get("phone").cloned(),
            nip,
            nra: Some(nra),
            kta_number: Some(kta_number),
            birth_place: row.get("birth_place").cloned(),
            birth_date: row.get("birth_date").and_then(|d| parse_flexible_date(d)),
            gender: row
                .get("gender")
                .and_then(|g| Gender::parse(g))
                .map(|g| g.as_str().to_string()),
            join_date,
            join_year: Some(join_year),
            sequence_number,
            status: status.as_str().to_string(),
            employment_type: employment_type.as_str().to_string(),
            union_position_code: row.get("union_position_code").cloned(),
            company_email: row.get("company_email").map(|e| norm_email(e)),
            address: row.get("address").cloned(),
            user_id: None,
        })
    }
}

/// Merge whitelisted mutable fields from a row onto an existing member.
/// An absent or empty incoming value never clobbers an existing one;
/// identity columns (unit, nra, kta_number, sequence) are never touched.
fn merge_row_into(
    member: &mut Member,
    row: &RowMap,
    nip: Option<String>,
    email: Option<String>,
) {
    if let Some(name) = row.get("full_name").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        member.full_name = name.to_string();
    }
    if let Some(email) = email {
        member.email = email;
    }
    if let Some(phone) = row.get("phone").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        member.phone = Some(phone.to_string());
    }
    if let Some(nip) = nip {
        member.nip = Some(nip);
    }
    if let Some(place) = row.get("birth_place").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        member.birth_place = Some(place.to_string());
    }
    if let Some(date) = row.get("birth_date").and_then(|d| parse_flexible_date(d)) {
        member.birth_date = Some(date);
    }
    if let Some(gender) = row.get("gender").and_then(|g| Gender::parse(g)) {
        member.gender = Some(gender.as_str().to_string());
    }
    if let Some(date) = row.get("join_date").and_then(|d| parse_flexible_date(d)) {
        member.join_date = Some(date);
    }
    if let Some(status) = row.get("status").and_then(|s| MemberStatus::parse(s)) {
        member.status = status.as_str().to_string();
    }
    if let Some(et) = row.get("employment_type").and_then(|s| EmploymentType::parse(s)) {
        member.employment_type = et.as_str().to_string();
    }
    if let Some(code) = row
        .get("union_position_code")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        member.union_position_code = Some(code.to_string());
    }
    if let Some(ce) = row.get("company_email").map(|e| norm_email(e)).filter(|e| !e.is_empty()) {
        member.company_email = Some(ce);
    }
    if let Some(addr) = row.get("address").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        member.address = Some(addr.to_string());
    }
}
