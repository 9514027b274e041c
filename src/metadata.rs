//! Canonical JSON encoding/decoding of array and group descriptors (spec §4.3, §6).
//!
//! Descriptors round-trip through [`serde_json`] with the crate's one custom piece of
//! machinery living in [`data_type`] (dtype strings/lists) and [`fill_value`] (the
//! `NaN`/`Infinity`/base64 scalar encodings and their materialisation into raw bytes).

pub mod array;
pub mod data_type;
pub mod fill_value;
pub mod group;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use array::ArrayMetadata;
pub use data_type::DataType;
pub use fill_value::FillValueMetadata;
pub use group::GroupMetadata;

/// An error decoding or validating a persisted descriptor.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The JSON was syntactically malformed or missing a required field.
    #[error("malformed metadata: {0}")]
    Malformed(String),
    /// `zarr_format` was absent or named an unsupported version.
    #[error("unsupported zarr_format: {0}")]
    UnsupportedFormat(String),
    /// A dtype string/list could not be parsed.
    #[error("invalid dtype: {0}")]
    InvalidDType(String),
    /// A fill-value JSON scalar did not match any documented encoding.
    #[error("invalid fill_value: {0}")]
    InvalidFillValue(String),
    /// A fill value's shape (scalar vs. structured) did not match its dtype.
    #[error("fill_value does not match the array's dtype")]
    FillValueDTypeMismatch,
    /// `chunks` and `shape` had different lengths.
    #[error("chunks has {chunks_len} entries but shape has {shape_len}")]
    ChunkShapeMismatch {
        /// Length of `chunks`.
        chunks_len: usize,
        /// Length of `shape`.
        shape_len: usize,
    },
}

/// A codec's JSON configuration (spec §4.2): an `id` plus arbitrary parameters.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CodecMetadata {
    /// The codec registry key.
    pub id: String,
    /// The codec's own parameters, flattened alongside `id`.
    #[serde(flatten)]
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

impl CodecMetadata {
    /// Construct a configuration with no parameters beyond `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            configuration: serde_json::Map::new(),
        }
    }
}

/// Recursively sort the keys of every JSON object in `value`, depth-first.
///
/// `serde_json`'s `preserve_order` feature makes struct fields serialise in declaration
/// order rather than alphabetical order; this restores the sorted-keys form spec'd for
/// descriptors without giving up `preserve_order`'s other benefit (stable iteration of
/// user-supplied maps such as attributes and codec configuration).
fn sort_object_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().map(|(k, v)| (k, sort_object_keys(v))).collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: serde_json::Map<String, serde_json::Value> = entries.into_iter().collect();
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.into_iter().map(sort_object_keys).collect()),
        other => other,
    }
}

/// Encode a value to canonical, indented UTF-8 JSON with recursively sorted object keys
/// (spec §4.3 "sorted keys and indentation, for diffability").
///
/// # Errors
/// Returns [`MetadataError::Malformed`] if serialisation fails (practically unreachable
/// for the descriptor types in this module, which are total).
pub fn encode_metadata<T: Serialize>(value: &T) -> Result<Vec<u8>, MetadataError> {
    let value = serde_json::to_value(value).map_err(|e| MetadataError::Malformed(e.to_string()))?;
    let sorted = sort_object_keys(value);
    serde_json::to_vec_pretty(&sorted).map_err(|e| MetadataError::Malformed(e.to_string()))
}

/// Decode a descriptor from UTF-8 JSON bytes.
///
/// # Errors
/// Returns [`MetadataError::Malformed`] if the JSON is syntactically invalid or missing a
/// required field.
pub fn decode_metadata<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, MetadataError> {
    serde_json::from_slice(bytes).map_err(|e| MetadataError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_metadata_round_trips_with_parameters() {
        let mut configuration = serde_json::Map::new();
        configuration.insert("level".to_string(), serde_json::json!(5));
        let codec = CodecMetadata {
            id: "gzip".to_string(),
            configuration,
        };
        let json = encode_metadata(&codec).unwrap();
        let back: CodecMetadata = decode_metadata(&json).unwrap();
        assert_eq!(codec, back);
    }

    #[test]
    fn encode_metadata_sorts_object_keys() {
        let mut configuration = serde_json::Map::new();
        configuration.insert("zlevel".to_string(), serde_json::json!(5));
        configuration.insert("alevel".to_string(), serde_json::json!(1));
        let codec = CodecMetadata {
            id: "gzip".to_string(),
            configuration,
        };
        let json = String::from_utf8(encode_metadata(&codec).unwrap()).unwrap();
        assert!(json.find("\"alevel\"").unwrap() < json.find("\"id\"").unwrap());
        assert!(json.find("\"id\"").unwrap() < json.find("\"zlevel\"").unwrap());
    }
}
