//! Row validation
//!
//! Applies structural field rules, tenant-scope rules, intra-batch
//! duplicate detection, and cross-store conflict detection to a full
//! parsed row set. Every finding is a structured [`FieldError`] with a
//! severity: critical findings block the row at commit, warnings are
//! informational only.
//!
//! Duplicate detection is order-dependent by design: the first occurrence
//! of a value always wins and every later occurrence is flagged against
//! it. The same validation runs at preview and again at commit (against
//! the then-current store), so the two phases cannot disagree.

use crate::db::members::{self, NaturalKey};
use crate::db::reference;
use crate::models::{EmploymentType, FieldError, Gender, MemberStatus, RowErrors};
use crate::parser::RowMap;
use crate::scope::{resolve_effective_unit, ScopeViolation};
use anyhow::Result;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::SqlitePool;
use std::collections::HashMap;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9+\-() ]+$").unwrap());
static NIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());
static NRA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]+-\d{4}-\d{3,4}$").unwrap());

/// Accepted date formats, first match wins
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

const DATE_HINT: &str = "YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY or YYYY/MM/DD";
const STATUS_HINT: &str = "aktif, nonaktif, cuti, keluar or pensiun";
const EMPLOYMENT_HINT: &str = "organik, pkwt or outsourcing";

/// Parse a date in any accepted format
pub fn parse_flexible_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s.trim(), f).ok())
}

/// Normalized comparison key for emails
pub fn norm_email(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

/// Normalized comparison key for code-like identifiers (nip, nra, kta)
pub fn norm_code(s: &str) -> String {
    s.trim().to_ascii_uppercase().replace(' ', "")
}

/// Value as shown in an error: truncated, masked for sensitive fields
fn shown_value(field: &str, value: &str) -> Option<String> {
    let masked = match field {
        "nip" | "phone" => {
            let head: String = value.chars().take(3).collect();
            format!("{head}***")
        }
        _ => value.chars().take(64).collect(),
    };
    Some(masked)
}

/// Validates rows against structural rules and the persisted store
pub struct RowValidator {
    pool: SqlitePool,
}

impl RowValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Validate a full normalized row set for one batch.
    ///
    /// `rows` carries (row_number, canonical row) pairs, row numbers
    /// 1-based with the header as row 1. Returns one report per row, in
    /// input order; rows without findings get an empty error list.
    pub async fn validate_rows(
        &self,
        rows: &[(i64, RowMap)],
        batch_unit: Option<i64>,
    ) -> Result<Vec<RowErrors>> {
        let mut reports = Vec::with_capacity(rows.len());

        // First occurrence of each normalized natural key wins
        let mut seen_nip: HashMap<String, i64> = HashMap::new();
        let mut seen_nra: HashMap<String, i64> = HashMap::new();
        let mut seen_email: HashMap<String, i64> = HashMap::new();

        for (row_number, row) in rows {
            let mut errors = field_checks(row);

            self.check_reference_fields(row, &mut errors).await?;

            let effective_unit = self
                .check_unit_scope(row, batch_unit, &mut errors)
                .await?;

            check_intra_batch_duplicates(
                row,
                *row_number,
                &mut seen_nip,
                &mut seen_nra,
                &mut seen_email,
                &mut errors,
            );

            if let Some(unit) = effective_unit {
                self.check_cross_store_conflicts(row, unit, &mut errors)
                    .await?;
            }

            reports.push(RowErrors {
                row_number: *row_number,
                errors,
            });
        }

        Ok(reports)
    }

    /// Reference lookups: union position code must exist when supplied
    async fn check_reference_fields(
        &self,
        row: &RowMap,
        errors: &mut Vec<FieldError>,
    ) -> Result<()> {
        if let Some(code) = row.get("union_position_code") {
            if !reference::position_exists(&self.pool, code.trim()).await? {
                errors.push(FieldError::warning(
                    "union_position_code",
                    shown_value("union_position_code", code),
                    "unknown union position code",
                    Some("a registered union position code"),
                ));
            }
        }
        Ok(())
    }

    /// Tenant-scope rules; returns the resolved effective unit when the
    /// row may proceed
    async fn check_unit_scope(
        &self,
        row: &RowMap,
        batch_unit: Option<i64>,
        errors: &mut Vec<FieldError>,
    ) -> Result<Option<i64>> {
        let raw_unit = row.get("organization_unit_id");
        let row_unit = match raw_unit {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push(FieldError::critical(
                        "organization_unit_id",
                        shown_value("organization_unit_id", raw),
                        "organization unit id must be a number",
                        Some("numeric organization unit id"),
                    ));
                    return Ok(None);
                }
            },
            None => None,
        };

        let effective = match resolve_effective_unit(batch_unit, row_unit) {
            Ok(unit) => unit,
            Err(ScopeViolation::MissingUnit) => {
                errors.push(FieldError::critical(
                    "organization_unit_id",
                    None,
                    "organization unit id is required for a multi-unit upload",
                    Some("numeric organization unit id"),
                ));
                return Ok(None);
            }
            Err(ScopeViolation::UnitMismatch {
                batch_unit,
                row_unit,
            }) => {
                errors.push(FieldError::critical(
                    "organization_unit_id",
                    Some(row_unit.to_string()),
                    format!("row names unit {row_unit} but this upload is restricted to unit {batch_unit}"),
                    None,
                ));
                return Ok(None);
            }
        };

        // Row-supplied units must exist; batch-level units were resolved
        // by the caller
        if row_unit == Some(effective) && batch_unit.is_none() {
            if !reference::unit_exists(&self.pool, effective).await? {
                errors.push(FieldError::critical(
                    "organization_unit_id",
                    Some(effective.to_string()),
                    "unknown organization unit",
                    Some("an existing organization unit id"),
                ));
                return Ok(None);
            }
        }

        Ok(Some(effective))
    }

    /// Conflicts against the persisted store: a natural key already owned
    /// by a different unit blocks the row
    async fn check_cross_store_conflicts(
        &self,
        row: &RowMap,
        effective_unit: i64,
        errors: &mut Vec<FieldError>,
    ) -> Result<()> {
        let checks = [
            (NaturalKey::Nra, row.get("nra").map(|v| norm_code(v))),
            (NaturalKey::Email, row.get("email").map(|v| norm_email(v))),
            (NaturalKey::Nip, row.get("nip").map(|v| norm_code(v))),
            (
                NaturalKey::KtaNumber,
                row.get("kta_number").map(|v| norm_code(v)),
            ),
        ];

        for (key, value) in checks {
            let Some(value) = value else { continue };
            if value.is_empty() {
                continue;
            }
            if let Some(owner) = members::unit_holding(&self.pool, key, &value).await? {
                if owner != effective_unit {
                    errors.push(FieldError::critical(
                        key.field_name(),
                        shown_value(key.field_name(), &value),
                        format!(
                            "{} already belongs to a member of another organization unit",
                            key.field_name()
                        ),
                        None,
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Structural per-field rules; pure, no store access
fn field_checks(row: &RowMap) -> Vec<FieldError> {
    let mut errors = Vec::new();

    // Required: full_name, 2-255 characters
    match row.get("full_name").map(|s| s.trim()) {
        None | Some("") => errors.push(FieldError::critical(
            "full_name",
            None,
            "full name is required",
            Some("2-255 characters"),
        )),
        Some(name) => {
            let len = name.chars().count();
            if !(2..=255).contains(&len) {
                errors.push(FieldError::critical(
                    "full_name",
                    shown_value("full_name", name),
                    "full name must be 2-255 characters",
                    Some("2-255 characters"),
                ));
            }
        }
    }

    // Required when present: status from the closed set. A missing status
    // defaults at commit, an invalid one blocks the row.
    if let Some(status) = row.get("status") {
        if MemberStatus::parse(status).is_none() {
            errors.push(FieldError::critical(
                "status",
                shown_value("status", status),
                "unknown membership status",
                Some(STATUS_HINT),
            ));
        }
    }

    if let Some(email) = row.get("email") {
        if !EMAIL_RE.is_match(email.trim()) {
            errors.push(FieldError::warning(
                "email",
                shown_value("email", email),
                "email address looks malformed",
                Some("user@example.com"),
            ));
        }
    }

    if let Some(phone) = row.get("phone") {
        if !PHONE_RE.is_match(phone.trim()) {
            errors.push(FieldError::warning(
                "phone",
                shown_value("phone", phone),
                "phone number may only contain digits, spaces and +-()",
                Some("digits, spaces, +-()"),
            ));
        }
    }

    for field in ["birth_date", "join_date"] {
        if let Some(date) = row.get(field) {
            if parse_flexible_date(date).is_none() {
                errors.push(FieldError::warning(
                    field,
                    shown_value(field, date),
                    "unrecognized date format",
                    Some(DATE_HINT),
                ));
            }
        }
    }

    if let Some(gender) = row.get("gender") {
        if Gender::parse(gender).is_none() {
            errors.push(FieldError::warning(
                "gender",
                shown_value("gender", gender),
                "gender must be L or P",
                Some("L or P"),
            ));
        }
    }

    if let Some(et) = row.get("employment_type") {
        if EmploymentType::parse(et).is_none() {
            errors.push(FieldError::warning(
                "employment_type",
                shown_value("employment_type", et),
                "unknown employment type",
                Some(EMPLOYMENT_HINT),
            ));
        }
    }

    if let Some(nip) = row.get("nip") {
        if !NIP_RE.is_match(nip.trim()) {
            errors.push(FieldError::warning(
                "nip",
                shown_value("nip", nip),
                "nip must be alphanumeric",
                Some("letters and digits only"),
            ));
        }
    }

    if let Some(nra) = row.get("nra") {
        if !NRA_RE.is_match(nra.trim()) {
            errors.push(FieldError::warning(
                "nra",
                shown_value("nra", nra),
                "nra does not match the registration number pattern",
                Some("PREFIX-1234-001"),
            ));
        }
    }

    errors
}

/// Intra-batch duplicate detection on normalized nip/nra/email.
/// First occurrence wins; later rows get a critical error naming the
/// earlier row.
fn check_intra_batch_duplicates(
    row: &RowMap,
    row_number: i64,
    seen_nip: &mut HashMap<String, i64>,
    seen_nra: &mut HashMap<String, i64>,
    seen_email: &mut HashMap<String, i64>,
    errors: &mut Vec<FieldError>,
) {
    let checks: [(&str, Option<String>, &mut HashMap<String, i64>); 3] = [
        ("nip", row.get("nip").map(|v| norm_code(v)), seen_nip),
        ("nra", row.get("nra").map(|v| norm_code(v)), seen_nra),
        ("email", row.get("email").map(|v| norm_email(v)), seen_email),
    ];

    for (field, value, seen) in checks {
        let Some(value) = value else { continue };
        if value.is_empty() {
            continue;
        }
        match seen.get(&value) {
            Some(first_row) => errors.push(FieldError::critical(
                field,
                shown_value(field, &value),
                format!("duplicate of row {first_row} in this file"),
                None,
            )),
            None => {
                seen.insert(value, row_number);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn row(pairs: &[(&str, &str)]) -> RowMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_full_name_is_critical() {
        let errors = field_checks(&row(&[("email", "a@x.com")]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "full_name");
        assert_eq!(errors[0].severity, Severity::Critical);
    }

    #[test]
    fn one_char_name_is_too_short() {
        let errors = field_checks(&row(&[("full_name", "B")]));
        assert_eq!(errors[0].field, "full_name");
    }

    #[test]
    fn valid_minimal_row_has_no_errors() {
        let errors = field_checks(&row(&[("full_name", "Budi Santoso")]));
        assert!(errors.is_empty());
    }

    #[test]
    fn invalid_status_is_critical_but_absent_status_is_fine() {
        let errors = field_checks(&row(&[("full_name", "Budi"), ("status", "resigned")]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "status");
        assert_eq!(errors[0].severity, Severity::Critical);

        let errors = field_checks(&row(&[("full_name", "Budi")]));
        assert!(errors.is_empty());
    }

    #[test]
    fn malformed_optional_fields_are_warnings() {
        let errors = field_checks(&row(&[
            ("full_name", "Budi"),
            ("email", "not-an-email"),
            ("phone", "08x11"),
            ("gender", "M"),
            ("employment_type", "freelance"),
            ("nip", "AB-123"),
            ("nra", "lowercase-24-001"),
        ]));
        assert_eq!(errors.len(), 6);
        assert!(errors.iter().all(|e| e.severity == Severity::Warning));
    }

    #[test]
    fn all_four_date_formats_parse() {
        for s in ["2024-01-31", "31/01/2024", "31-01-2024", "2024/01/31"] {
            assert_eq!(
                parse_flexible_date(s),
                Some(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
                "failed for {s}"
            );
        }
        assert!(parse_flexible_date("31.01.2024").is_none());
    }

    #[test]
    fn ambiguous_date_takes_first_matching_format() {
        // 03/04/2024 is valid as DD/MM/YYYY; that format is tried first
        assert_eq!(
            parse_flexible_date("03/04/2024"),
            Some(NaiveDate::from_ymd_opt(2024, 4, 3).unwrap())
        );
    }

    #[test]
    fn nip_and_phone_values_are_masked() {
        let errors = field_checks(&row(&[("full_name", "Budi"), ("nip", "AB-12345678")]));
        assert_eq!(errors[0].current_value.as_deref(), Some("AB-***"));
    }

    #[test]
    fn duplicate_detection_first_occurrence_wins() {
        let mut seen_nip = HashMap::new();
        let mut seen_nra = HashMap::new();
        let mut seen_email = HashMap::new();

        let mut errors = Vec::new();
        check_intra_batch_duplicates(
            &row(&[("email", "A@x.com")]),
            2,
            &mut seen_nip,
            &mut seen_nra,
            &mut seen_email,
            &mut errors,
        );
        assert!(errors.is_empty());

        // Same email, different case: still a duplicate of row 2
        let mut errors = Vec::new();
        check_intra_batch_duplicates(
            &row(&[("email", "a@X.COM")]),
            3,
            &mut seen_nip,
            &mut seen_nra,
            &mut seen_email,
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "email");
        assert_eq!(errors[0].severity, Severity::Critical);
        assert!(errors[0].message.contains("row 2"));
    }
}
