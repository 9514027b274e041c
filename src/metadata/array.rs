//! The array descriptor (spec §3 "Array descriptor (persisted)", §6).

use serde::{Deserialize, Serialize};

use crate::array_subset::Order;

use super::{CodecMetadata, DataType, FillValueMetadata, MetadataError};

/// The currently-supported descriptor format version.
pub const ZARR_FORMAT: u64 = 2;

/// The persisted array descriptor (the `.zarray` document).
///
/// Immutable after creation except for `shape`, which `resize` rewrites in place.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ArrayMetadata {
    /// The descriptor format version. Always [`ZARR_FORMAT`] for descriptors this crate
    /// writes; decoding rejects any other value.
    pub zarr_format: u64,
    /// The array's shape: one non-negative length per axis.
    pub shape: Vec<u64>,
    /// The chunk shape: one positive length per axis, same length as `shape`.
    pub chunks: Vec<u64>,
    /// The element type.
    pub dtype: DataType,
    /// The memory layout of a decoded chunk buffer.
    pub order: Order,
    /// The compressor applied after filters on encode, before filters on decode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressor: Option<CodecMetadata>,
    /// The fill value for uninitialised chunk regions, or `None` for "no fill value".
    #[serde(default)]
    pub fill_value: Option<FillValueMetadata>,
    /// Codecs applied (in declared order) before the compressor on encode, and in reverse
    /// order after the decompressor on decode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<CodecMetadata>>,
}

/// Decode and validate an array descriptor in one step, the form callers should use.
///
/// # Errors
/// Returns [`MetadataError::Malformed`] on malformed JSON or a missing required field,
/// or the error from [`ArrayMetadata::validate`] for a semantically invalid descriptor.
pub fn decode_array_metadata(bytes: &[u8]) -> Result<ArrayMetadata, MetadataError> {
    let metadata: ArrayMetadata = super::decode_metadata(bytes)?;
    metadata.validate()?;
    Ok(metadata)
}

impl ArrayMetadata {
    /// Validate the cross-field invariants spec §3 requires of a descriptor:
    /// `len(chunks) == len(shape)`, every chunk length is positive, and `zarr_format` is
    /// the one this crate understands.
    ///
    /// # Errors
    /// Returns [`MetadataError::UnsupportedFormat`] or
    /// [`MetadataError::ChunkShapeMismatch`] as appropriate.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.zarr_format != ZARR_FORMAT {
            return Err(MetadataError::UnsupportedFormat(self.zarr_format.to_string()));
        }
        if self.chunks.len() != self.shape.len() {
            return Err(MetadataError::ChunkShapeMismatch {
                chunks_len: self.chunks.len(),
                shape_len: self.shape.len(),
            });
        }
        if self.chunks.iter().any(|&c| c == 0) {
            return Err(MetadataError::Malformed(
                "chunks entries must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The chunk grid shape: `ceil(shape[i] / chunks[i])` per axis (spec §3 "Chunk").
    #[must_use]
    pub fn grid_shape(&self) -> Vec<u64> {
        self.shape
            .iter()
            .zip(self.chunks.iter())
            .map(|(&s, &c)| s.div_ceil(c))
            .collect()
    }

    /// The fill value materialised to raw, `itemsize`-length bytes, or `None` if
    /// `fill_value` is `null`.
    ///
    /// # Errors
    /// Returns [`MetadataError::FillValueDTypeMismatch`] if the fill value does not match
    /// `dtype`'s shape.
    pub fn fill_bytes(&self) -> Result<Option<Vec<u8>>, MetadataError> {
        self.fill_value
            .as_ref()
            .map(|fv| fv.materialize(&self.dtype))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{decode_metadata, encode_metadata};

    fn sample() -> ArrayMetadata {
        ArrayMetadata {
            zarr_format: ZARR_FORMAT,
            shape: vec![100],
            chunks: vec![10],
            dtype: DataType::Simple(crate::metadata::data_type::SimpleDType::from_dtype_string("<i8").unwrap()),
            order: Order::C,
            compressor: None,
            fill_value: None,
            filters: None,
        }
    }

    #[test]
    fn round_trips_through_json() {
        let metadata = sample();
        let json = encode_metadata(&metadata).unwrap();
        let back: ArrayMetadata = decode_metadata(&json).unwrap();
        assert_eq!(metadata, back);
    }

    #[test]
    fn rejects_unsupported_format() {
        let mut metadata = sample();
        metadata.zarr_format = 3;
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn rejects_shape_chunk_length_mismatch() {
        let mut metadata = sample();
        metadata.chunks = vec![10, 10];
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn grid_shape_rounds_up() {
        let metadata = sample();
        assert_eq!(metadata.grid_shape(), vec![10]);
        let mut uneven = metadata;
        uneven.shape = vec![95];
        assert_eq!(uneven.grid_shape(), vec![10]);
    }
}
