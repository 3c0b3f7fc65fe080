//! Minimal NPY v1.0 codec for [`TensorValue`] payloads.
//!
//! Only the subset needed for cache entries is supported: little-endian
//! element order, C contiguous layout, no pickled objects. Headers are
//! padded to a multiple of 64 bytes so encoded bytes are reproducible.

use mds_core::{DType, ErrorInfo, MdsError, TensorData, TensorValue};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

fn npy_error(code: &str, message: impl Into<String>) -> MdsError {
    MdsError::Serializer(ErrorInfo::new(code, message))
}

fn descr(dtype: DType) -> &'static str {
    match dtype {
        DType::Bool => "|b1",
        DType::U8 => "|u1",
        DType::I64 => "<i8",
        DType::F64 => "<f8",
    }
}

fn dtype_from_descr(descr: &str) -> Option<DType> {
    match descr {
        "|b1" => Some(DType::Bool),
        "|u1" => Some(DType::U8),
        "<i8" => Some(DType::I64),
        "<f8" => Some(DType::F64),
        _ => None,
    }
}

fn elem_size(dtype: DType) -> usize {
    match dtype {
        DType::Bool | DType::U8 => 1,
        DType::I64 | DType::F64 => 8,
    }
}

fn shape_literal(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [only] => format!("({only},)"),
        dims => {
            let joined = dims
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("({joined})")
        }
    }
}

/// Encodes a tensor into NPY v1.0 bytes.
pub fn encode_npy(tensor: &TensorValue) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        descr(tensor.dtype()),
        shape_literal(tensor.shape())
    );
    let unpadded = MAGIC.len() + 4 + header.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(
        MAGIC.len() + 4 + header.len() + tensor.len() * elem_size(tensor.dtype()),
    );
    out.extend_from_slice(MAGIC);
    out.push(1);
    out.push(0);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    match tensor.data() {
        TensorData::Bool(values) => out.extend(values.iter().map(|&v| u8::from(v))),
        TensorData::U8(values) => out.extend_from_slice(values),
        TensorData::I64(values) => {
            for value in values {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        TensorData::F64(values) => {
            for value in values {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
    out
}

/// Decodes NPY v1.0 bytes into a tensor.
pub fn decode_npy(bytes: &[u8]) -> Result<TensorValue, MdsError> {
    if bytes.len() < MAGIC.len() + 4 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(npy_error("mds_cache.npy_magic", "missing NPY magic bytes"));
    }
    let (major, minor) = (bytes[6], bytes[7]);
    if (major, minor) != (1, 0) {
        return Err(npy_error(
            "mds_cache.npy_version",
            format!("unsupported NPY version {major}.{minor}"),
        ));
    }
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let data_start = MAGIC.len() + 4 + header_len;
    if bytes.len() < data_start {
        return Err(npy_error("mds_cache.npy_header", "truncated NPY header"));
    }
    let header = std::str::from_utf8(&bytes[MAGIC.len() + 4..data_start])
        .map_err(|err| npy_error("mds_cache.npy_header", err.to_string()))?;

    let descr = header_field(header, "descr")?;
    let dtype = dtype_from_descr(&descr).ok_or_else(|| {
        npy_error(
            "mds_cache.npy_descr",
            format!("unsupported element descriptor {descr:?}"),
        )
    })?;
    let order = header_field(header, "fortran_order")?;
    if order != "False" {
        return Err(npy_error(
            "mds_cache.npy_order",
            "fortran ordered payloads are not supported",
        ));
    }
    let shape = parse_shape(&header_field(header, "shape")?)?;

    let expected: usize = shape.iter().product();
    let payload = &bytes[data_start..];
    if payload.len() != expected * elem_size(dtype) {
        return Err(npy_error(
            "mds_cache.npy_payload",
            format!(
                "payload holds {} bytes, shape {:?} expects {}",
                payload.len(),
                shape,
                expected * elem_size(dtype)
            ),
        ));
    }
    let data = match dtype {
        DType::Bool => {
            let mut values = Vec::with_capacity(expected);
            for &byte in payload {
                match byte {
                    0 => values.push(false),
                    1 => values.push(true),
                    other => {
                        return Err(npy_error(
                            "mds_cache.npy_payload",
                            format!("invalid boolean byte {other}"),
                        ))
                    }
                }
            }
            TensorData::Bool(values)
        }
        DType::U8 => TensorData::U8(payload.to_vec()),
        DType::I64 => TensorData::I64(
            payload
                .chunks_exact(8)
                .map(|chunk| {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(chunk);
                    i64::from_le_bytes(buf)
                })
                .collect(),
        ),
        DType::F64 => TensorData::F64(
            payload
                .chunks_exact(8)
                .map(|chunk| {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(chunk);
                    f64::from_le_bytes(buf)
                })
                .collect(),
        ),
    };
    TensorValue::new(shape, data)
}

/// Extracts the literal following `'name':` in the header dict text.
fn header_field(header: &str, name: &str) -> Result<String, MdsError> {
    let marker = format!("'{name}':");
    let start = header.find(&marker).ok_or_else(|| {
        npy_error(
            "mds_cache.npy_header",
            format!("header field {name:?} missing"),
        )
    })? + marker.len();
    let rest = header[start..].trim_start();
    let value = if let Some(stripped) = rest.strip_prefix('\'') {
        let end = stripped.find('\'').ok_or_else(|| {
            npy_error(
                "mds_cache.npy_header",
                format!("unterminated string for {name:?}"),
            )
        })?;
        stripped[..end].to_string()
    } else if let Some(stripped) = rest.strip_prefix('(') {
        let end = stripped.find(')').ok_or_else(|| {
            npy_error(
                "mds_cache.npy_header",
                format!("unterminated tuple for {name:?}"),
            )
        })?;
        format!("({})", &stripped[..end])
    } else {
        let end = rest
            .find(|c| c == ',' || c == '}')
            .ok_or_else(|| npy_error("mds_cache.npy_header", "malformed header dict"))?;
        rest[..end].trim().to_string()
    };
    Ok(value)
}

fn parse_shape(literal: &str) -> Result<Vec<usize>, MdsError> {
    let inner = literal
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| {
            npy_error(
                "mds_cache.npy_shape",
                format!("malformed shape literal {literal:?}"),
            )
        })?;
    let mut shape = Vec::new();
    for part in inner.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let dim = part.parse::<usize>().map_err(|err| {
            npy_error(
                "mds_cache.npy_shape",
                format!("invalid dimension {part:?}: {err}"),
            )
        })?;
        shape.push(dim);
    }
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_aligned_and_tagged() {
        let tensor = TensorValue::new(vec![2, 2], TensorData::I64(vec![1, 2, 3, 4])).unwrap();
        let bytes = encode_npy(&tensor);
        assert_eq!(&bytes[..6], MAGIC);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % HEADER_ALIGN, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
    }

    #[test]
    fn scalar_shape_round_trips() {
        let tensor = TensorValue::scalar(TensorData::F64(vec![1.5])).unwrap();
        let decoded = decode_npy(&encode_npy(&tensor)).unwrap();
        assert_eq!(decoded, tensor);
    }

    #[test]
    fn invalid_bool_byte_is_rejected() {
        let tensor = TensorValue::new(vec![1], TensorData::Bool(vec![true])).unwrap();
        let mut bytes = encode_npy(&tensor);
        let last = bytes.len() - 1;
        bytes[last] = 2;
        let err = decode_npy(&bytes).unwrap_err();
        assert_eq!(err.info().code, "mds_cache.npy_payload");
    }

    #[test]
    fn fortran_order_is_rejected() {
        let tensor = TensorValue::new(vec![1], TensorData::U8(vec![9])).unwrap();
        let mut bytes = encode_npy(&tensor);
        let pos = bytes.windows(5).position(|w| w == b"False").unwrap();
        bytes[pos..pos + 5].copy_from_slice(b"True,");
        let err = decode_npy(&bytes).unwrap_err();
        assert_eq!(err.info().code, "mds_cache.npy_order");
    }
}
