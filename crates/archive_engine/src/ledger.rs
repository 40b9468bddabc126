use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::PersistError;

/// Ledger key meaning "everything under this directory is processed".
///
/// Shares the namespace of file ids: a record with id `dir` reads and writes
/// the same marker.
pub const DIRECTORY_MARKER: &str = "dir";

const MARKER_EXTENSION: &str = "saved";

/// Completion markers keyed by `(directory, id)`.
///
/// Markers are only ever added. Removing one is a manual operation.
pub trait ResumeLedger: Send + Sync {
    fn is_done(&self, directory: &Path, id: &str) -> bool;

    /// Idempotent: marking an already-marked key succeeds.
    fn mark_done(&self, directory: &Path, id: &str) -> Result<(), PersistError>;
}

/// Ledger backed by empty `{id}.saved` files next to the content they cover.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerFileLedger;

impl MarkerFileLedger {
    pub fn marker_path(directory: &Path, id: &str) -> PathBuf {
        directory.join(format!("{id}.{MARKER_EXTENSION}"))
    }
}

impl ResumeLedger for MarkerFileLedger {
    fn is_done(&self, directory: &Path, id: &str) -> bool {
        Self::marker_path(directory, id).is_file()
    }

    fn mark_done(&self, directory: &Path, id: &str) -> Result<(), PersistError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(Self::marker_path(directory, id))?;
        Ok(())
    }
}
