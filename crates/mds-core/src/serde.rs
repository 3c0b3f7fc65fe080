//! Canonical JSON encoding for fingerprint payloads and `value.json` entries.
//!
//! Cache fingerprints hash these bytes and the JSON entry layout stores
//! them verbatim, so the encoding must be deterministic: object keys are
//! emitted in sorted order and the output carries no insignificant
//! whitespace. Scalars and string escaping are delegated to `serde_json`;
//! only the container framing is written here.

use ::serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ErrorInfo, MdsError};

fn serde_error(code: &str, err: impl ToString) -> MdsError {
    MdsError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// Serializes a value into canonical JSON bytes with deterministic ordering.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, MdsError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json-encode", err))?;
    let mut bytes = Vec::new();
    write_canonical(&value, &mut bytes)?;
    Ok(bytes)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), MdsError> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push(b'{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)
                    .map_err(|err| serde_error("json-write", err))?;
                out.push(b':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => {
            serde_json::to_writer(&mut *out, scalar)
                .map_err(|err| serde_error("json-write", err))?;
        }
    }
    Ok(())
}

/// Restores a value from canonical JSON bytes.
pub fn from_json_slice<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, MdsError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json-read", err))
}
