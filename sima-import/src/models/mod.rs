//! Data models for the member import pipeline

pub mod batch;
pub mod member;

pub use batch::{BatchReport, BatchStatus, FieldError, ImportBatch, RowErrors, Severity};
pub use member::{EmploymentType, Gender, Member, MemberStatus};
