//! Serializer chain for heterogeneous cache values.
//!
//! Each serializer owns a fixed file layout inside an entry folder so loads
//! can recover without metadata about which serializer wrote the folder.
//! Applicability is an explicit capability check (`can_save`) on the save
//! path and a tagged `Ok(None)` on the load path; hard errors are reserved
//! for genuinely broken entries.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use mds_core::{
    to_canonical_json_bytes, CacheValue, DType, ErrorInfo, MdsError, TensorValue,
};
use serde::{Deserialize, Serialize};

use crate::npy::{decode_npy, encode_npy};
use crate::storage::StorageBackend;

/// File written by [`JsonSerializer`].
pub const JSON_FILE: &str = "value.json";
/// Uncompressed file written by [`TensorSerializer`].
pub const NPY_FILE: &str = "value.npy";
/// Compressed file written by [`TensorSerializer`].
pub const NPY_GZ_FILE: &str = "value.npy.gz";
/// Key manifest written by [`MapSerializer`].
pub const KEYS_FILE: &str = "keys.json";
/// File written by [`BinarySerializer`].
pub const BIN_FILE: &str = "value.bin";

fn serializer_error(code: &str, message: impl Into<String>) -> MdsError {
    MdsError::Serializer(ErrorInfo::new(code, message))
}

fn io_error(code: &str, path: &Path, err: std::io::Error) -> MdsError {
    MdsError::Storage(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Lists the immediate entries of a folder, sorted by file name.
fn folder_entries(folder: &Path) -> Result<Vec<PathBuf>, MdsError> {
    let reader = fs::read_dir(folder).map_err(|err| io_error("mds_cache.read_dir", folder, err))?;
    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|err| io_error("mds_cache.read_dir", folder, err))?;
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

fn single_file_named(folder: &Path, name: &str) -> Result<Option<PathBuf>, MdsError> {
    let entries = folder_entries(folder)?;
    match entries.as_slice() {
        [only] if only.file_name().and_then(|n| n.to_str()) == Some(name) => {
            Ok(Some(only.clone()))
        }
        _ => Ok(None),
    }
}

/// Persists one kind of cache value under a fixed folder layout.
pub trait Serializer {
    /// Returns true when `save` would accept the value.
    fn can_save(&self, value: &CacheValue) -> bool;

    /// Writes the value into `folder`. The folder is empty and exclusively
    /// owned by the caller for the duration of the save.
    fn save(&self, value: &CacheValue, folder: &Path) -> Result<(), MdsError>;

    /// Restores a value from `folder`. `Ok(None)` means the folder layout
    /// belongs to a different serializer.
    fn load(
        &self,
        folder: &Path,
        storage: &dyn StorageBackend,
    ) -> Result<Option<CacheValue>, MdsError>;
}

/// Portable text encoding for JSON-able scalars and structures.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn can_save(&self, value: &CacheValue) -> bool {
        matches!(value, CacheValue::Json(_))
    }

    fn save(&self, value: &CacheValue, folder: &Path) -> Result<(), MdsError> {
        let CacheValue::Json(json) = value else {
            return Err(serializer_error(
                "mds_cache.json_value",
                "json serializer only accepts JSON values",
            ));
        };
        let path = folder.join(JSON_FILE);
        let bytes = to_canonical_json_bytes(json)?;
        fs::write(&path, bytes).map_err(|err| io_error("mds_cache.write", &path, err))
    }

    fn load(
        &self,
        folder: &Path,
        storage: &dyn StorageBackend,
    ) -> Result<Option<CacheValue>, MdsError> {
        let Some(path) = single_file_named(folder, JSON_FILE)? else {
            return Ok(None);
        };
        let bytes = storage.read_bytes(&path)?;
        let json = mds_core::from_json_slice(&bytes)?;
        Ok(Some(CacheValue::Json(json)))
    }
}

/// Gzip levels applied per numeric element category at save time.
///
/// The boolean category is consulted first, then the integer category, then
/// the default; an unset slot means "no compression" for values that reach
/// it. Levels follow gzip semantics (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompressionPolicy {
    /// Level for boolean tensors.
    pub bool_level: Option<u32>,
    /// Level for integer tensors (unsigned or signed).
    pub integer_level: Option<u32>,
    /// Level for every other element type.
    pub default_level: Option<u32>,
}

impl CompressionPolicy {
    /// Picks the gzip level for the given element type, if any.
    pub fn choose(&self, dtype: DType) -> Option<u32> {
        if dtype.is_bool() {
            if let Some(level) = self.bool_level {
                return Some(level);
            }
        }
        if dtype.is_integer() {
            if let Some(level) = self.integer_level {
                return Some(level);
            }
        }
        self.default_level
    }
}

/// NPY encoding for dense numeric arrays, optionally gzip compressed.
#[derive(Debug, Clone, Default)]
pub struct TensorSerializer {
    compression: CompressionPolicy,
}

impl TensorSerializer {
    /// Creates a tensor serializer with the given compression policy.
    pub fn new(compression: CompressionPolicy) -> Self {
        Self { compression }
    }

    fn save_tensor(&self, tensor: &TensorValue, folder: &Path) -> Result<(), MdsError> {
        let bytes = encode_npy(tensor);
        match self.compression.choose(tensor.dtype()) {
            Some(level) => {
                if level > 9 {
                    return Err(serializer_error(
                        "mds_cache.gzip_level",
                        format!("gzip level {level} outside 0-9"),
                    ));
                }
                let path = folder.join(NPY_GZ_FILE);
                let file =
                    fs::File::create(&path).map_err(|err| io_error("mds_cache.write", &path, err))?;
                // mtime pinned to zero so identical tensors produce identical bytes.
                let mut encoder = GzBuilder::new()
                    .mtime(0)
                    .write(file, Compression::new(level));
                encoder
                    .write_all(&bytes)
                    .and_then(|_| encoder.finish().map(drop))
                    .map_err(|err| io_error("mds_cache.gzip_write", &path, err))
            }
            None => {
                let path = folder.join(NPY_FILE);
                fs::write(&path, bytes).map_err(|err| io_error("mds_cache.write", &path, err))
            }
        }
    }
}

impl Serializer for TensorSerializer {
    fn can_save(&self, value: &CacheValue) -> bool {
        matches!(value, CacheValue::Tensor(_))
    }

    fn save(&self, value: &CacheValue, folder: &Path) -> Result<(), MdsError> {
        let CacheValue::Tensor(tensor) = value else {
            return Err(serializer_error(
                "mds_cache.tensor_value",
                "tensor serializer only accepts tensors",
            ));
        };
        self.save_tensor(tensor, folder)
    }

    fn load(
        &self,
        folder: &Path,
        storage: &dyn StorageBackend,
    ) -> Result<Option<CacheValue>, MdsError> {
        let entries = folder_entries(folder)?;
        let [only] = entries.as_slice() else {
            return Ok(None);
        };
        let tensor = match only.file_name().and_then(|n| n.to_str()) {
            Some(name) if name == NPY_FILE => decode_npy(&storage.read_bytes(only)?)?,
            Some(name) if name == NPY_GZ_FILE => {
                let compressed = storage.read_bytes(only)?;
                let mut decoder = GzDecoder::new(compressed.as_slice());
                let mut bytes = Vec::new();
                decoder
                    .read_to_end(&mut bytes)
                    .map_err(|err| io_error("mds_cache.gzip_read", only, err))?;
                decode_npy(&bytes)?
            }
            _ => return Ok(None),
        };
        Ok(Some(CacheValue::Tensor(tensor)))
    }
}

/// Mapping layout: a sorted key manifest plus one numbered subfolder per
/// key, each saved with the inner serializer.
pub struct MapSerializer {
    inner: Box<dyn Serializer>,
}

impl MapSerializer {
    /// Creates a map serializer delegating leaf values to `inner`.
    pub fn new(inner: Box<dyn Serializer>) -> Self {
        Self { inner }
    }
}

impl Serializer for MapSerializer {
    fn can_save(&self, value: &CacheValue) -> bool {
        match value {
            CacheValue::Map(entries) => entries.values().all(|leaf| self.inner.can_save(leaf)),
            _ => false,
        }
    }

    fn save(&self, value: &CacheValue, folder: &Path) -> Result<(), MdsError> {
        let CacheValue::Map(entries) = value else {
            return Err(serializer_error(
                "mds_cache.map_value",
                "map serializer only accepts mappings",
            ));
        };
        let keys: Vec<&String> = entries.keys().collect();
        let manifest_path = folder.join(KEYS_FILE);
        let manifest = to_canonical_json_bytes(&keys)?;
        fs::write(&manifest_path, manifest)
            .map_err(|err| io_error("mds_cache.write", &manifest_path, err))?;
        for (idx, leaf) in entries.values().enumerate() {
            if !self.inner.can_save(leaf) {
                return Err(serializer_error(
                    "mds_cache.map_leaf",
                    format!("inner serializer rejects value for key {:?}", keys[idx]),
                ));
            }
            let subfolder = folder.join(idx.to_string());
            fs::create_dir(&subfolder)
                .map_err(|err| io_error("mds_cache.create_dir", &subfolder, err))?;
            self.inner.save(leaf, &subfolder)?;
        }
        Ok(())
    }

    fn load(
        &self,
        folder: &Path,
        storage: &dyn StorageBackend,
    ) -> Result<Option<CacheValue>, MdsError> {
        let manifest_path = folder.join(KEYS_FILE);
        if !manifest_path.is_file() {
            return Ok(None);
        }
        let keys: Vec<String> = mds_core::from_json_slice(&storage.read_bytes(&manifest_path)?)?;
        let mut entries = BTreeMap::new();
        for (idx, key) in keys.into_iter().enumerate() {
            let subfolder = folder.join(idx.to_string());
            if !subfolder.is_dir() {
                return Err(serializer_error(
                    "mds_cache.map_entry",
                    format!("missing subfolder {idx} for key {key:?}"),
                ));
            }
            let leaf = self.inner.load(&subfolder, storage)?.ok_or_else(|| {
                serializer_error(
                    "mds_cache.map_entry",
                    format!("unreadable subfolder {idx} for key {key:?}"),
                )
            })?;
            entries.insert(key, leaf);
        }
        Ok(Some(CacheValue::Map(entries)))
    }
}

/// Catch-all MessagePack encoding over the whole [`CacheValue`] model.
///
/// Entries written here are opaque to non-array-aware readers, so this
/// sits last in the default chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

impl Serializer for BinarySerializer {
    fn can_save(&self, _value: &CacheValue) -> bool {
        true
    }

    fn save(&self, value: &CacheValue, folder: &Path) -> Result<(), MdsError> {
        let path = folder.join(BIN_FILE);
        let bytes = rmp_serde::to_vec_named(value).map_err(|err| {
            MdsError::Serde(ErrorInfo::new("mds_cache.msgpack_encode", err.to_string()))
        })?;
        fs::write(&path, bytes).map_err(|err| io_error("mds_cache.write", &path, err))
    }

    fn load(
        &self,
        folder: &Path,
        storage: &dyn StorageBackend,
    ) -> Result<Option<CacheValue>, MdsError> {
        let Some(path) = single_file_named(folder, BIN_FILE)? else {
            return Ok(None);
        };
        let bytes = storage.read_bytes(&path)?;
        let value = rmp_serde::from_slice(&bytes).map_err(|err| {
            MdsError::Serde(ErrorInfo::new("mds_cache.msgpack_decode", err.to_string()))
        })?;
        Ok(Some(value))
    }
}

/// Ordered composite running its members as one unit.
///
/// Save picks the first member whose capability check passes; load returns
/// the first member that recognises the folder. Member order is policy:
/// it decides which layout claims values several members could handle.
pub struct ChainSerializer {
    members: Vec<Box<dyn Serializer>>,
}

impl ChainSerializer {
    /// Creates a chain from an ordered member list.
    pub fn new(members: Vec<Box<dyn Serializer>>) -> Self {
        Self { members }
    }

    /// Restores a value from `folder`, trying members in order.
    ///
    /// A folder no member recognises is a corrupt entry, so unlike the
    /// trait's `load` this never answers "not mine".
    pub fn load_entry(
        &self,
        folder: &Path,
        storage: &dyn StorageBackend,
    ) -> Result<CacheValue, MdsError> {
        for member in &self.members {
            if let Some(value) = member.load(folder, storage)? {
                return Ok(value);
            }
        }
        Err(MdsError::Serializer(
            ErrorInfo::new(
                "mds_cache.entry_corrupt",
                "cache entry layout is unsupported or corrupted",
            )
            .with_context("path", folder.display().to_string()),
        ))
    }
}

impl Serializer for ChainSerializer {
    fn can_save(&self, value: &CacheValue) -> bool {
        self.members.iter().any(|member| member.can_save(value))
    }

    fn save(&self, value: &CacheValue, folder: &Path) -> Result<(), MdsError> {
        for member in &self.members {
            if member.can_save(value) {
                return member.save(value, folder);
            }
        }
        Err(serializer_error(
            "mds_cache.no_serializer",
            "no serializer in the chain accepts this value",
        ))
    }

    fn load(
        &self,
        folder: &Path,
        storage: &dyn StorageBackend,
    ) -> Result<Option<CacheValue>, MdsError> {
        self.load_entry(folder, storage).map(Some)
    }
}

/// Default chain: JSON text, tensor-leaf mappings, bare tensors, then the
/// binary catch-all. Booleans and integers compress at level 1, floats
/// stay uncompressed.
pub fn default_serializer() -> ChainSerializer {
    let compression = CompressionPolicy {
        bool_level: Some(1),
        integer_level: Some(1),
        default_level: None,
    };
    ChainSerializer::new(vec![
        Box::new(JsonSerializer),
        Box::new(MapSerializer::new(Box::new(TensorSerializer::new(
            compression,
        )))),
        Box::new(TensorSerializer::new(compression)),
        Box::new(BinarySerializer),
    ])
}
