use std::collections::BTreeMap;

use ::serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, MdsError};

/// Element type of a [`TensorValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// Boolean elements stored as one byte each.
    Bool,
    /// Unsigned 8-bit integers (masks, label maps).
    U8,
    /// Signed 64-bit integers.
    I64,
    /// IEEE-754 double precision floats.
    F64,
}

impl DType {
    /// Returns true for the boolean element type.
    pub fn is_bool(&self) -> bool {
        matches!(self, DType::Bool)
    }

    /// Returns true for integer element types (unsigned or signed).
    pub fn is_integer(&self) -> bool {
        matches!(self, DType::U8 | DType::I64)
    }
}

/// Flat element storage backing a [`TensorValue`], tagged by element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TensorData {
    /// Boolean elements.
    Bool(Vec<bool>),
    /// Unsigned 8-bit elements.
    U8(Vec<u8>),
    /// Signed 64-bit elements.
    I64(Vec<i64>),
    /// Double precision elements.
    F64(Vec<f64>),
}

impl TensorData {
    /// Number of elements held.
    pub fn len(&self) -> usize {
        match self {
            TensorData::Bool(values) => values.len(),
            TensorData::U8(values) => values.len(),
            TensorData::I64(values) => values.len(),
            TensorData::F64(values) => values.len(),
        }
    }

    /// Returns true when no elements are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the storage.
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::Bool(_) => DType::Bool,
            TensorData::U8(_) => DType::U8,
            TensorData::I64(_) => DType::I64,
            TensorData::F64(_) => DType::F64,
        }
    }
}

/// Dense numeric array in C (row major) order.
///
/// A zero dimensional shape describes a scalar holding exactly one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorValue {
    shape: Vec<usize>,
    data: TensorData,
}

impl TensorValue {
    /// Creates a tensor, validating that the element count matches the shape.
    pub fn new(shape: Vec<usize>, data: TensorData) -> Result<Self, MdsError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(MdsError::Serde(
                ErrorInfo::new(
                    "mds_core.tensor_shape",
                    format!(
                        "shape {:?} expects {} elements, got {}",
                        shape,
                        expected,
                        data.len()
                    ),
                )
                .with_hint("element count must equal the product of the shape"),
            ));
        }
        Ok(Self { shape, data })
    }

    /// Creates a zero dimensional scalar tensor.
    pub fn scalar(data: TensorData) -> Result<Self, MdsError> {
        Self::new(Vec::new(), data)
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element type of the tensor.
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Number of elements held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when no elements are held.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat element storage in row major order.
    pub fn data(&self) -> &TensorData {
        &self.data
    }
}

/// Heterogeneous value persisted by a cache entry.
///
/// Every variant is serde serializable so the catch-all binary serializer
/// can persist values the format-specific serializers decline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CacheValue {
    /// JSON-able scalars and structures.
    Json(serde_json::Value),
    /// Dense numeric arrays.
    Tensor(TensorValue),
    /// String-keyed mappings whose values may themselves be any cache value.
    Map(BTreeMap<String, CacheValue>),
}
