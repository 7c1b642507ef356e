//! Stored upload files
//!
//! Uploads are kept under the data directory's `imports/` subdirectory
//! with content-addressed names, so re-submitting an identical file maps
//! to the same stored object and the recorded hash supports idempotent
//! re-commit detection. Commit re-reads the stored bytes rather than
//! trusting anything held in memory since preview.

use crate::error::{ImportError, ImportResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Content-addressed file store for uploaded spreadsheets
#[derive(Clone)]
pub struct FileStore {
    imports_dir: PathBuf,
}

impl FileStore {
    pub fn new(imports_dir: PathBuf) -> Self {
        Self { imports_dir }
    }

    /// Store raw upload bytes; returns the stored path and content hash
    pub fn store(&self, original_filename: &str, bytes: &[u8]) -> ImportResult<(String, String)> {
        std::fs::create_dir_all(&self.imports_dir)?;

        let hash = content_hash(bytes);
        let extension = crate::parser::file_extension(original_filename);
        let stored_name = if extension.is_empty() {
            hash.clone()
        } else {
            format!("{hash}.{extension}")
        };
        let path = self.imports_dir.join(stored_name);

        // Same content, same path: rewriting is harmless and keeps the
        // operation idempotent
        std::fs::write(&path, bytes)?;

        Ok((path.to_string_lossy().into_owned(), hash))
    }

    /// Read stored bytes back for commit-time re-parsing
    pub fn read(&self, stored_path: &str) -> ImportResult<Vec<u8>> {
        std::fs::read(Path::new(stored_path))
            .map_err(|e| ImportError::StoredFileUnreadable(format!("{stored_path}: {e}")))
    }
}

/// SHA-256 hex digest of file contents
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
