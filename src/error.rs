//! The crate's unified error type.

use thiserror::Error;

use crate::array::codec::CodecError;
use crate::metadata::MetadataError;
use crate::storage::StorageError;

/// The top-level error type returned by fallible operations across the crate.
///
/// Each architectural layer (storage, codec, metadata, selection, group hierarchy) defines
/// its own error enum; this type composes them via `#[from]` at the boundary where a caller
/// actually invokes the public API, mirroring the layered error handling used throughout.
#[derive(Debug, Error)]
pub enum ZarrError {
    /// A descriptor was missing, malformed, or named an unsupported `zarr_format`.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// An axis index lay outside `shape` after wraparound.
    #[error("index {index} is out of bounds for axis of length {length}")]
    IndexOutOfBounds {
        /// The offending index.
        index: i64,
        /// The axis length.
        length: u64,
    },
    /// A slice used a step other than `1`/`None`.
    #[error("unsupported slicing: {0}")]
    UnsupportedSlicing(String),
    /// A write value's shape did not match the selection's output shape.
    #[error("shape mismatch: value has shape {value_shape:?}, selection has shape {selection_shape:?}")]
    ShapeMismatch {
        /// The shape of the value the caller supplied.
        value_shape: Vec<u64>,
        /// The shape implied by the selection.
        selection_shape: Vec<u64>,
    },
    /// A mutation was attempted through a read-only handle.
    #[error("array or group is read-only")]
    ReadOnly,
    /// A `create_group`/`create_dataset`/array creation collided with an existing node.
    #[error("a group or array already exists at {0}")]
    ContainerExists(String),
    /// A path lookup in a group found nothing.
    #[error("no array or group found at {0}")]
    KeyNotFound(String),
    /// A path contained a `.` or `..` segment, or was otherwise malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// A codec reported an encode/decode failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The store reported an I/O failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// `require_dataset` found an existing array with an incompatible shape/dtype.
    #[error("array at {path} has shape {existing_shape:?} and dtype {existing_dtype}, expected shape {expected_shape:?} and dtype {expected_dtype}")]
    TypeError {
        /// The path of the existing array.
        path: String,
        /// The existing array's shape.
        existing_shape: Vec<u64>,
        /// The existing array's dtype, formatted for display.
        existing_dtype: String,
        /// The shape the caller required.
        expected_shape: Vec<u64>,
        /// The dtype the caller required, formatted for display.
        expected_dtype: String,
    },
}

/// A convenience alias for `Result<T, ZarrError>`.
pub type ZarrResult<T> = Result<T, ZarrError>;
