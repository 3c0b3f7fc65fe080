//! Disk-cache glue for MDS dataset loaders.
//!
//! The pieces here are deliberately thin: a serializer chain that maps
//! heterogeneous values onto fixed folder layouts, an NPY codec for the
//! array payloads, and a wrapper that resolves cache roots from a
//! repository config and fingerprints keys. The surrounding
//! content-addressed storage engine stays external.

mod disk;
mod npy;
mod repo;
mod serializers;
mod storage;

pub use disk::DiskCache;
pub use npy::{decode_npy, encode_npy};
pub use repo::{Repository, CONFIG_FILE};
pub use serializers::{
    default_serializer, BinarySerializer, ChainSerializer, CompressionPolicy, JsonSerializer,
    MapSerializer, Serializer, TensorSerializer, BIN_FILE, JSON_FILE, KEYS_FILE, NPY_FILE,
    NPY_GZ_FILE,
};
pub use storage::{FsStorage, StorageBackend};
