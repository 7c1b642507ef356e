//! Database initialization and shared helpers

pub mod init;

pub use init::*;
