#![deny(missing_docs)]
#![doc = "Core error and value types shared by the MDS dataset utilities."]

pub mod errors;
pub mod serde;
mod value;

pub use crate::serde::{from_json_slice, to_canonical_json_bytes};
pub use errors::{ErrorInfo, MdsError};
pub use value::{CacheValue, DType, TensorData, TensorValue};
