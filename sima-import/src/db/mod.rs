//! Database operations for the import pipeline

pub mod batches;
pub mod members;
pub mod reference;
pub mod users;
