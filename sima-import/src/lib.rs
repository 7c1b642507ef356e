//! sima-import - Bulk member reconciliation pipeline
//!
//! Ingests a spreadsheet of member records, validates each row against
//! structural and tenant-isolation rules, previews the outcome without
//! side effects, and commits an idempotent create-or-update against the
//! member store, allocating tenant-scoped sequential identifiers and
//! synchronizing linked user accounts.

pub mod committer;
pub mod db;
pub mod error;
pub mod linker;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod scope;
pub mod sequence;
pub mod storage;
pub mod validator;

pub use committer::{CommitOutcome, Committer};
pub use error::{ImportError, ImportResult};
pub use pipeline::ImportPipeline;
