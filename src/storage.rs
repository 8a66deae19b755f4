//! Storage collaborator.
//!
//! The engine consumes storage through the [`Storage`] trait: create a
//! named blob, resolve a blob to a filesystem path. [`TempStorage`] is the
//! default implementation, backing blobs with a temporary directory that is
//! removed when the storage is dropped.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tempfile::TempDir;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Storage
// ============================================================================

/// Named-blob storage consumed by the export facade.
pub trait Storage: Send + Sync {
    /// Creates (or overwrites) a blob with the given content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] or [`Error::Io`] if the blob cannot be
    /// written.
    fn create(&self, name: &str, content: &[u8]) -> Result<()>;

    /// Resolves a blob name to a filesystem path.
    ///
    /// With `absolute` set, the returned path is usable from anywhere
    /// (e.g. to build a `file://` URL); otherwise it is relative to the
    /// storage root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] for blobs that were never created.
    fn resolve_path(&self, name: &str, absolute: bool) -> Result<PathBuf>;
}

// ============================================================================
// TempStorage
// ============================================================================

/// Temporary-directory backed [`Storage`].
///
/// Blobs live under one `TempDir` and disappear with it.
pub struct TempStorage {
    root: TempDir,
    blobs: Mutex<FxHashMap<String, PathBuf>>,
}

impl TempStorage {
    /// Creates a storage rooted in a fresh temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created.
    pub fn new() -> Result<Self> {
        let root = tempfile::Builder::new().prefix("pdf-export-").tempdir()?;
        debug!(root = %root.path().display(), "Temporary storage created");

        Ok(Self {
            root,
            blobs: Mutex::new(FxHashMap::default()),
        })
    }
}

impl Storage for TempStorage {
    fn create(&self, name: &str, content: &[u8]) -> Result<()> {
        if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
            return Err(Error::storage(format!("blob name {name:?} is not flat")));
        }

        let path = self.root.path().join(name);
        fs::write(&path, content)?;
        self.blobs.lock().insert(name.to_owned(), path);

        Ok(())
    }

    fn resolve_path(&self, name: &str, absolute: bool) -> Result<PathBuf> {
        let blobs = self.blobs.lock();
        let path = blobs
            .get(name)
            .ok_or_else(|| Error::storage(format!("unknown blob {name:?}")))?;

        Ok(if absolute {
            path.clone()
        } else {
            PathBuf::from(name)
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve_round_trip() {
        let storage = TempStorage::new().expect("storage");
        storage.create("page.html", b"<html></html>").expect("create");

        let path = storage.resolve_path("page.html", true).expect("resolve");
        assert!(path.is_absolute());
        assert_eq!(fs::read(&path).expect("read"), b"<html></html>");
    }

    #[test]
    fn test_relative_resolution_returns_blob_name() {
        let storage = TempStorage::new().expect("storage");
        storage.create("out.pdf", b"").expect("create");

        let path = storage.resolve_path("out.pdf", false).expect("resolve");
        assert_eq!(path, PathBuf::from("out.pdf"));
    }

    #[test]
    fn test_unknown_blob_is_an_error() {
        let storage = TempStorage::new().expect("storage");
        let err = storage.resolve_path("missing", true).unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[test]
    fn test_nested_blob_names_are_rejected() {
        let storage = TempStorage::new().expect("storage");
        let err = storage.create("../escape", b"").unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[test]
    fn test_create_overwrites_existing_blob() {
        let storage = TempStorage::new().expect("storage");
        storage.create("blob", b"first").expect("create");
        storage.create("blob", b"second").expect("overwrite");

        let path = storage.resolve_path("blob", true).expect("resolve");
        assert_eq!(fs::read(&path).expect("read"), b"second");
    }
}
