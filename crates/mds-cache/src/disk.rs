//! Thin disk-cache wrapper over the serializer chain.
//!
//! This layer only resolves storage locations from the repository, derives
//! content fingerprints for keys, and forwards entry folders to the
//! serializer. Locking, eviction, and concurrent-writer coordination are
//! the business of the surrounding storage engine, not this code.

use std::fs;
use std::path::{Path, PathBuf};

use mds_core::{to_canonical_json_bytes, CacheValue, ErrorInfo, MdsError};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::repo::Repository;
use crate::serializers::{default_serializer, ChainSerializer, Serializer};
use crate::storage::FsStorage;

fn storage_error(code: &str, message: impl Into<String>) -> MdsError {
    MdsError::Storage(ErrorInfo::new(code, message))
}

/// Disk cache bound to a repository's local (and optionally remote) roots.
pub struct DiskCache {
    local_roots: Vec<PathBuf>,
    remote_roots: Vec<PathBuf>,
    serializer: ChainSerializer,
    storage: FsStorage,
    names: Vec<String>,
}

impl DiskCache {
    /// Builds a cache from the repository configuration.
    ///
    /// `names` are the key field names folded into every fingerprint.
    /// Passing `None` for `serializer` selects the default chain; remote
    /// roots are consulted only when `fetch` is set.
    pub fn new(
        repo: &Repository,
        names: impl IntoIterator<Item = impl Into<String>>,
        serializer: Option<ChainSerializer>,
        fetch: bool,
    ) -> Self {
        Self {
            local_roots: repo.local_roots(),
            remote_roots: if fetch {
                repo.remote_roots()
            } else {
                Vec::new()
            },
            serializer: serializer.unwrap_or_else(default_serializer),
            storage: FsStorage,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Content fingerprint for a cache key: sha256 over canonical JSON of
    /// the key field names and the key itself.
    pub fn fingerprint<K: Serialize>(&self, key: &K) -> Result<String, MdsError> {
        let bytes = to_canonical_json_bytes(&(&self.names, key))?;
        Ok(hex::encode(Sha256::digest(bytes)))
    }

    fn entry_dir(root: &Path, fingerprint: &str) -> Result<PathBuf, MdsError> {
        if fingerprint.len() < 3 || !fingerprint.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(storage_error(
                "mds_cache.fingerprint",
                format!("malformed fingerprint {fingerprint:?}"),
            ));
        }
        Ok(root.join(&fingerprint[..2]).join(&fingerprint[2..]))
    }

    /// Persists a value under `fingerprint` in the first local root.
    ///
    /// The entry folder must not exist yet; a failed save removes the
    /// partially written folder before the error propagates.
    pub fn store(&self, fingerprint: &str, value: &CacheValue) -> Result<PathBuf, MdsError> {
        let root = self.local_roots.first().ok_or_else(|| {
            storage_error("mds_cache.no_local_root", "cache has no local roots")
        })?;
        let dir = Self::entry_dir(root, fingerprint)?;
        if dir.exists() {
            return Err(MdsError::Storage(
                ErrorInfo::new("mds_cache.entry_exists", "cache entry already present")
                    .with_context("path", dir.display().to_string()),
            ));
        }
        fs::create_dir_all(&dir).map_err(|err| {
            MdsError::Storage(
                ErrorInfo::new("mds_cache.entry_create", err.to_string())
                    .with_context("path", dir.display().to_string()),
            )
        })?;
        if let Err(err) = self.serializer.save(value, &dir) {
            let _ = fs::remove_dir_all(&dir);
            return Err(err);
        }
        Ok(dir)
    }

    fn locate(&self, fingerprint: &str) -> Result<Option<PathBuf>, MdsError> {
        for root in &self.local_roots {
            let dir = Self::entry_dir(root, fingerprint)?;
            if dir.is_dir() {
                return Ok(Some(dir));
            }
        }
        for root in &self.remote_roots {
            let remote_dir = Self::entry_dir(root, fingerprint)?;
            if remote_dir.is_dir() {
                let local_root = self.local_roots.first().ok_or_else(|| {
                    storage_error("mds_cache.no_local_root", "cache has no local roots")
                })?;
                let local_dir = Self::entry_dir(local_root, fingerprint)?;
                copy_entry(&remote_dir, &local_dir)?;
                return Ok(Some(local_dir));
            }
        }
        Ok(None)
    }

    /// Loads the value stored under `fingerprint`, fetching from a remote
    /// root when enabled and the entry is absent locally.
    pub fn load(&self, fingerprint: &str) -> Result<CacheValue, MdsError> {
        let dir = self.locate(fingerprint)?.ok_or_else(|| {
            MdsError::Storage(
                ErrorInfo::new("mds_cache.entry_missing", "cache entry not found")
                    .with_context("fingerprint", fingerprint),
            )
        })?;
        self.serializer.load_entry(&dir, &self.storage)
    }

    /// Returns the cached value for `key`, computing and storing it on a
    /// miss. This is the whole caching decorator: everything else is the
    /// serializer's and the storage layer's business.
    pub fn get_or_compute<K: Serialize>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<CacheValue, MdsError>,
    ) -> Result<CacheValue, MdsError> {
        let fingerprint = self.fingerprint(key)?;
        match self.load(&fingerprint) {
            Ok(value) => Ok(value),
            Err(MdsError::Storage(info)) if info.code == "mds_cache.entry_missing" => {
                let value = compute()?;
                self.store(&fingerprint, &value)?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }
}

/// Recursively copies a cache entry folder.
fn copy_entry(src: &Path, dst: &Path) -> Result<(), MdsError> {
    let copy_error = |err: std::io::Error, path: &Path| {
        MdsError::Storage(
            ErrorInfo::new("mds_cache.entry_copy", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    };
    fs::create_dir_all(dst).map_err(|err| copy_error(err, dst))?;
    for entry in fs::read_dir(src).map_err(|err| copy_error(err, src))? {
        let entry = entry.map_err(|err| copy_error(err, src))?;
        let target = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(|err| copy_error(err, &target))?;
        if file_type.is_dir() {
            copy_entry(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| copy_error(err, &target))?;
        }
    }
    Ok(())
}
