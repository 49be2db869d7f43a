use std::fmt;

use serde::{Deserialize, Serialize};

use super::registry::SchemaId;

/// Serialization schema for the cells of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellSchema {
    Bool,
    Int,
    Long,
    Double,
    Bytes,
    Utf8,
}

impl CellSchema {
    /// Canonical encoding of this schema, the input to its registry
    /// fingerprint. Stable across releases.
    pub fn canonical_bytes(&self) -> &'static [u8] {
        match self {
            CellSchema::Bool => b"bool",
            CellSchema::Int => b"int",
            CellSchema::Long => b"long",
            CellSchema::Double => b"double",
            CellSchema::Bytes => b"bytes",
            CellSchema::Utf8 => b"utf8",
        }
    }
}

impl fmt::Display for CellSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // canonical_bytes is ASCII by construction
        f.write_str(std::str::from_utf8(self.canonical_bytes()).unwrap_or("?"))
    }
}

/// Errors raised while decoding a stored cell.
///
/// Decode failures are per-cell: one undecodable cell never discards its row
/// or its siblings.
#[derive(Debug)]
pub enum DecodeError {
    /// The payload is shorter than its schema tag.
    Truncated,
    /// The embedded schema id is not known to the registry.
    UnknownSchema(SchemaId),
    /// The cell was written under a schema other than the one the layout
    /// configures for its column.
    SchemaMismatch {
        expected: CellSchema,
        actual: CellSchema,
    },
    /// The value bytes do not parse under their schema.
    Malformed(String),
    /// The schema registry could not be reached.
    RegistryUnavailable(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated => write!(f, "cell payload truncated before schema tag"),
            DecodeError::UnknownSchema(id) => write!(f, "unknown schema id {id}"),
            DecodeError::SchemaMismatch { expected, actual } => {
                write!(f, "cell written as '{actual}' but column expects '{expected}'")
            }
            DecodeError::Malformed(reason) => write!(f, "malformed cell value: {reason}"),
            DecodeError::RegistryUnavailable(reason) => {
                write!(f, "schema registry unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// A decoded, typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Bytes(Vec<u8>),
    Utf8(String),
}

impl CellValue {
    /// The schema this value encodes under.
    pub fn schema(&self) -> CellSchema {
        match self {
            CellValue::Bool(_) => CellSchema::Bool,
            CellValue::Int(_) => CellSchema::Int,
            CellValue::Long(_) => CellSchema::Long,
            CellValue::Double(_) => CellSchema::Double,
            CellValue::Bytes(_) => CellSchema::Bytes,
            CellValue::Utf8(_) => CellSchema::Utf8,
        }
    }

    /// Encodes the value portion of a cell payload (little-endian for the
    /// fixed-width schemas, raw bytes otherwise).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            CellValue::Bool(v) => vec![u8::from(*v)],
            CellValue::Int(v) => v.to_le_bytes().to_vec(),
            CellValue::Long(v) => v.to_le_bytes().to_vec(),
            CellValue::Double(v) => v.to_le_bytes().to_vec(),
            CellValue::Bytes(v) => v.clone(),
            CellValue::Utf8(v) => v.as_bytes().to_vec(),
        }
    }

    /// Decodes the value portion of a cell payload under the given schema.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] for wrong-width fixed values or
    /// invalid UTF-8.
    pub fn from_bytes(schema: CellSchema, data: &[u8]) -> Result<Self, DecodeError> {
        match schema {
            CellSchema::Bool => match data {
                [0] => Ok(CellValue::Bool(false)),
                [1] => Ok(CellValue::Bool(true)),
                _ => Err(DecodeError::Malformed(format!(
                    "expected 1 boolean byte, got {} bytes",
                    data.len()
                ))),
            },
            CellSchema::Int => {
                let bytes: [u8; 4] = data.try_into().map_err(|_| {
                    DecodeError::Malformed(format!("expected 4 bytes, got {}", data.len()))
                })?;
                Ok(CellValue::Int(i32::from_le_bytes(bytes)))
            }
            CellSchema::Long => {
                let bytes: [u8; 8] = data.try_into().map_err(|_| {
                    DecodeError::Malformed(format!("expected 8 bytes, got {}", data.len()))
                })?;
                Ok(CellValue::Long(i64::from_le_bytes(bytes)))
            }
            CellSchema::Double => {
                let bytes: [u8; 8] = data.try_into().map_err(|_| {
                    DecodeError::Malformed(format!("expected 8 bytes, got {}", data.len()))
                })?;
                Ok(CellValue::Double(f64::from_le_bytes(bytes)))
            }
            CellSchema::Bytes => Ok(CellValue::Bytes(data.to_vec())),
            CellSchema::Utf8 => match std::str::from_utf8(data) {
                Ok(s) => Ok(CellValue::Utf8(s.to_string())),
                Err(e) => Err(DecodeError::Malformed(format!("invalid utf8: {e}"))),
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            CellValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            CellValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            CellValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CellValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Utf8(v) => Some(v),
            _ => None,
        }
    }
}

/// Frames a complete cell payload: `schema id (u32 LE) | value bytes`.
///
/// This is the writer-side counterpart of the cell decoders; it is exposed so
/// embedders and fixtures can produce store payloads the read path accepts.
pub fn encode_cell(schema_id: SchemaId, value: &CellValue) -> Vec<u8> {
    let value_bytes = value.to_bytes();
    let mut payload = Vec::with_capacity(4 + value_bytes.len());
    payload.extend_from_slice(&schema_id.as_u32().to_le_bytes());
    payload.extend_from_slice(&value_bytes);
    payload
}

/// Splits a cell payload into its embedded schema id and value bytes.
pub(crate) fn split_cell(payload: &[u8]) -> Result<(SchemaId, &[u8]), DecodeError> {
    if payload.len() < 4 {
        return Err(DecodeError::Truncated);
    }
    let id = u32::from_le_bytes(payload[0..4].try_into().unwrap());
    Ok((SchemaId::new(id), &payload[4..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_round_trip() {
        let values = [
            CellValue::Bool(true),
            CellValue::Int(-42),
            CellValue::Long(1_234_567_890_123),
            CellValue::Double(2.5),
            CellValue::Bytes(vec![0, 1, 2]),
            CellValue::Utf8("généalogie".to_string()),
        ];
        for value in values {
            let decoded = CellValue::from_bytes(value.schema(), &value.to_bytes()).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_wrong_width_rejected() {
        assert!(matches!(
            CellValue::from_bytes(CellSchema::Long, &[1, 2, 3]),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            CellValue::from_bytes(CellSchema::Bool, &[7]),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        assert!(matches!(split_cell(&[1, 2]), Err(DecodeError::Truncated)));
    }

    #[test]
    fn test_cell_framing() {
        let id = SchemaId::new(0xDEAD_BEEF);
        let value = CellValue::Utf8("x".to_string());
        let payload = encode_cell(id, &value);
        let (decoded_id, rest) = split_cell(&payload).unwrap();
        assert_eq!(decoded_id, id);
        assert_eq!(rest, b"x");
    }
}
