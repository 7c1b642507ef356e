//! Member record and its closed vocabularies

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership status, closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Aktif,
    Nonaktif,
    Cuti,
    Keluar,
    Pensiun,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aktif => "aktif",
            Self::Nonaktif => "nonaktif",
            Self::Cuti => "cuti",
            Self::Keluar => "keluar",
            Self::Pensiun => "pensiun",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aktif" => Some(Self::Aktif),
            "nonaktif" | "non-aktif" => Some(Self::Nonaktif),
            "cuti" => Some(Self::Cuti),
            "keluar" => Some(Self::Keluar),
            "pensiun" => Some(Self::Pensiun),
            _ => None,
        }
    }

    /// Default for created members when the row carries no status
    pub fn default_for_new() -> Self {
        Self::Aktif
    }
}

/// Employment relationship, closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmploymentType {
    Organik,
    Pkwt,
    Outsourcing,
}

impl EmploymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organik => "organik",
            Self::Pkwt => "pkwt",
            Self::Outsourcing => "outsourcing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "organik" => Some(Self::Organik),
            "pkwt" => Some(Self::Pkwt),
            "outsourcing" => Some(Self::Outsourcing),
            _ => None,
        }
    }

    pub fn default_for_new() -> Self {
        Self::Organik
    }
}

/// Gender marker as used on the membership card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    L,
    P,
}

impl Gender {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Some(Self::L),
            "P" => Some(Self::P),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::P => "P",
        }
    }
}

/// Persisted member record
#[derive(Debug, Clone)]
pub struct Member {
    pub id: Uuid,
    pub organization_unit_id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub nip: Option<String>,
    pub nra: Option<String>,
    pub kta_number: Option<String>,
    pub birth_place: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub join_year: Option<i32>,
    pub sequence_number: Option<i64>,
    pub status: String,
    pub employment_type: String,
    pub union_position_code: Option<String>,
    pub company_email: Option<String>,
    pub address: Option<String>,
    pub user_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(MemberStatus::parse("AKTIF"), Some(MemberStatus::Aktif));
        assert_eq!(MemberStatus::parse(" cuti "), Some(MemberStatus::Cuti));
        assert_eq!(MemberStatus::parse("unknown"), None);
    }

    #[test]
    fn employment_round_trips() {
        for et in [
            EmploymentType::Organik,
            EmploymentType::Pkwt,
            EmploymentType::Outsourcing,
        ] {
            assert_eq!(EmploymentType::parse(et.as_str()), Some(et));
        }
    }

    #[test]
    fn gender_accepts_lowercase() {
        assert_eq!(Gender::parse("l"), Some(Gender::L));
        assert_eq!(Gender::parse("p"), Some(Gender::P));
        assert_eq!(Gender::parse("x"), None);
    }
}
