//! Storage backend seam used by serializer loads.
//!
//! The content-addressed engine that owns cache folders is external to this
//! crate; serializers only need a way to resolve a file inside an entry
//! folder into bytes, so that is the whole seam.

use std::fs;
use std::path::Path;

use mds_core::{ErrorInfo, MdsError};

/// Resolves files referenced by cache-entry folders into raw bytes.
pub trait StorageBackend {
    /// Reads the full contents of the file at `path`.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, MdsError>;
}

/// Plain filesystem backend: entry files hold their payloads directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl StorageBackend for FsStorage {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, MdsError> {
        fs::read(path).map_err(|err| {
            MdsError::Storage(
                ErrorInfo::new("mds_cache.storage_read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}
