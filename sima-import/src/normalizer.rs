//! Row normalizer
//!
//! Maps heterogeneous column names coming from legacy and current upload
//! templates onto one canonical row shape. Pure: no I/O, never invents
//! values, absent fields stay absent.

use crate::parser::RowMap;

/// Canonical target keys in output order
pub const CANONICAL_KEYS: &[&str] = &[
    "full_name",
    "email",
    "phone",
    "nip",
    "nra",
    "kta_number",
    "birth_place",
    "birth_date",
    "gender",
    "join_date",
    "status",
    "employment_type",
    "union_position_code",
    "organization_unit_id",
    "company_email",
    "address",
];

/// Known legacy/alternate headers per canonical key, in priority order.
/// The canonical key itself always wins when present and non-empty.
const ALIASES: &[(&str, &[&str])] = &[
    ("full_name", &["nama_lengkap", "nama", "name"]),
    ("email", &["alamat_email", "e-mail", "surel"]),
    ("phone", &["no_hp", "no_telp", "telepon", "hp", "phone_number"]),
    ("nip", &["nomor_induk", "no_induk", "nip_pegawai"]),
    ("nra", &["nomor_anggota", "no_anggota", "no_registrasi"]),
    ("kta_number", &["no_kta", "nomor_kta", "kta"]),
    ("birth_place", &["tempat_lahir"]),
    ("birth_date", &["tanggal_lahir", "tgl_lahir"]),
    ("gender", &["jenis_kelamin", "jk", "kelamin"]),
    ("join_date", &["tanggal_bergabung", "tgl_bergabung", "tanggal_masuk"]),
    ("status", &["status_anggota", "status_keanggotaan"]),
    ("employment_type", &["status_karyawan", "jenis_karyawan", "status_kepegawaian"]),
    ("union_position_code", &["jabatan_serikat", "kode_jabatan"]),
    ("organization_unit_id", &["unit_id", "unit_kerja_id", "id_unit"]),
    ("company_email", &["email_perusahaan", "email_kantor"]),
    ("address", &["alamat"]),
];

/// Normalize a raw header for lookup: trim, lowercase, spaces to
/// underscores
fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '.'], "_")
}

/// Map one raw row onto the canonical shape.
///
/// Resolution per canonical key: the canonical name itself if present and
/// non-empty, else the first matching alias in priority order.
pub fn normalize_row(raw: &RowMap) -> RowMap {
    // Index the raw row once under normalized header names
    let mut indexed = RowMap::new();
    for (key, value) in raw {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        // First occurrence of a header wins
        indexed
            .entry(normalize_key(key))
            .or_insert_with(|| value.to_string());
    }

    let mut out = RowMap::new();
    for (canonical, aliases) in ALIASES {
        if let Some(v) = indexed.get(*canonical) {
            out.insert(canonical.to_string(), v.clone());
            continue;
        }
        for alias in *aliases {
            if let Some(v) = indexed.get(*alias) {
                out.insert(canonical.to_string(), v.clone());
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RowMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn canonical_key_wins_over_alias() {
        let raw = row(&[("full_name", "Budi"), ("nama", "Ignored")]);
        let out = normalize_row(&raw);
        assert_eq!(out.get("full_name").unwrap(), "Budi");
    }

    #[test]
    fn first_alias_in_priority_order_wins() {
        let raw = row(&[("nama", "Dari Nama"), ("name", "Dari Name")]);
        let out = normalize_row(&raw);
        // nama_lengkap > nama > name
        assert_eq!(out.get("full_name").unwrap(), "Dari Nama");
    }

    #[test]
    fn headers_are_case_and_space_insensitive() {
        let raw = row(&[("Nama Lengkap", "Budi"), ("JENIS KELAMIN", "L")]);
        let out = normalize_row(&raw);
        assert_eq!(out.get("full_name").unwrap(), "Budi");
        assert_eq!(out.get("gender").unwrap(), "L");
    }

    #[test]
    fn absent_fields_stay_absent() {
        let raw = row(&[("nama", "Budi")]);
        let out = normalize_row(&raw);
        assert_eq!(out.len(), 1);
        assert!(out.get("email").is_none());
    }

    #[test]
    fn empty_values_do_not_shadow_aliases() {
        let raw = row(&[("email", "   "), ("alamat_email", "budi@x.com")]);
        let out = normalize_row(&raw);
        assert_eq!(out.get("email").unwrap(), "budi@x.com");
    }
}
