//! The group descriptor (spec §3 "Group descriptor (persisted)").

use serde::{Deserialize, Serialize};

use super::MetadataError;

/// The persisted group descriptor (the `.zgroup` document). Contains only `zarr_format`;
/// a group's children are discovered by prefix-scanning the store, not by anything in
/// this document.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct GroupMetadata {
    /// The descriptor format version.
    pub zarr_format: u64,
}

impl Default for GroupMetadata {
    fn default() -> Self {
        Self {
            zarr_format: super::array::ZARR_FORMAT,
        }
    }
}

impl GroupMetadata {
    /// Validate that `zarr_format` is one this crate understands.
    ///
    /// # Errors
    /// Returns [`MetadataError::UnsupportedFormat`] otherwise.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.zarr_format != super::array::ZARR_FORMAT {
            return Err(MetadataError::UnsupportedFormat(self.zarr_format.to_string()));
        }
        Ok(())
    }
}

/// Decode and validate a group descriptor in one step.
///
/// # Errors
/// Returns [`MetadataError::Malformed`] on malformed JSON, or
/// [`MetadataError::UnsupportedFormat`] for an unsupported `zarr_format`.
pub fn decode_group_metadata(bytes: &[u8]) -> Result<GroupMetadata, MetadataError> {
    let metadata: GroupMetadata = super::decode_metadata(bytes)?;
    metadata.validate()?;
    Ok(metadata)
}
