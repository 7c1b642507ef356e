//! sima-common - Shared infrastructure for SIMANGGOTA services
//!
//! Provides the common error type, configuration resolution, and database
//! initialization used by the membership administration services.

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
