//! The codec contract (spec §4.2): a reversible byte-to-byte transform applied before the
//! compressor (a *filter*) or as the compressor itself, plus the registry that resolves a
//! persisted [`CodecMetadata`] back into a live codec instance.
//!
//! Codecs are pure functions of their configuration and input, immutable once constructed,
//! and shared across threads as `Arc<dyn Codec>` rather than cloned, matching the spec's
//! "cheaply cloneable, shareable across threads" requirement without needing `dyn-clone`.

#[cfg(feature = "crc32c")]
mod crc32c;
#[cfg(feature = "gzip")]
mod gzip;
mod identity;
#[cfg(feature = "blosc")]
mod blosc;
#[cfg(feature = "zstd")]
mod zstd;

#[cfg(feature = "crc32c")]
pub use self::crc32c::Crc32cCodec;
#[cfg(feature = "gzip")]
pub use gzip::GzipCodec;
pub use identity::IdentityCodec;
#[cfg(feature = "blosc")]
pub use blosc::BloscCodec;
#[cfg(feature = "zstd")]
pub use zstd::ZstdCodec;

use std::sync::Arc;

use thiserror::Error;

use crate::config::ZarrConfig;
use crate::metadata::CodecMetadata;

/// A codec-reported encode/decode failure.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The codec's JSON configuration was invalid or incomplete.
    #[error("invalid codec configuration: {0}")]
    InvalidConfiguration(String),
    /// No registered codec matches the `id` in a [`CodecMetadata`].
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),
    /// A checksum codec found the stored checksum did not match the decoded data.
    #[error("checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        /// The checksum read from the encoded bytes.
        expected: u32,
        /// The checksum computed from the decoded bytes.
        actual: u32,
    },
    /// Any other codec-internal failure (malformed compressed stream, etc).
    #[error("{0}")]
    Other(String),
}

/// A reversible byte-to-byte transform, parameterised by a JSON configuration (spec §4.2).
///
/// `decode_into` has a default implementation in terms of `decode`; codecs for which
/// decoding directly into a caller-supplied buffer is meaningfully cheaper than allocating
/// and copying may override it. The array engine's whole-chunk fast path (spec §4.5 step 5)
/// calls `decode_into` so that override is where a zero-copy decode would plug in.
pub trait Codec: core::fmt::Debug + Send + Sync {
    /// Apply this codec's forward transform.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the input cannot be encoded.
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Apply this codec's inverse transform.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `encoded` is not a valid encoding for this codec.
    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode directly into `dst`, which must be exactly the decoded length.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `encoded` is invalid or its decoded length does not
    /// match `dst.len()`.
    fn decode_into(&self, encoded: &[u8], dst: &mut [u8]) -> Result<(), CodecError> {
        let decoded = self.decode(encoded)?;
        if decoded.len() != dst.len() {
            return Err(CodecError::Other(format!(
                "decoded length {} does not match destination length {}",
                decoded.len(),
                dst.len()
            )));
        }
        dst.copy_from_slice(&decoded);
        Ok(())
    }

    /// This codec's persisted configuration, including its registry `id`.
    fn get_config(&self) -> CodecMetadata;
}

/// A codec registry entry, submitted at compile time with [`inventory::submit!`].
///
/// Mirrors the sibling crate's plugin-registration pattern: each codec module registers
/// itself with a name-matching predicate and a constructor, and [`codec_from_metadata`]
/// walks the registered set at runtime to resolve a persisted `id` back to a live codec.
pub struct CodecPlugin {
    match_name_fn: fn(&str) -> bool,
    create_fn: fn(&CodecMetadata, &ZarrConfig) -> Result<Arc<dyn Codec>, CodecError>,
}

impl CodecPlugin {
    /// Register a codec plugin.
    #[must_use]
    pub const fn new(
        match_name_fn: fn(&str) -> bool,
        create_fn: fn(&CodecMetadata, &ZarrConfig) -> Result<Arc<dyn Codec>, CodecError>,
    ) -> Self {
        Self {
            match_name_fn,
            create_fn,
        }
    }
}

inventory::collect!(CodecPlugin);

/// Resolve a persisted [`CodecMetadata`] to a live codec via the compile-time registry.
///
/// # Errors
/// Returns [`CodecError::UnsupportedCodec`] if no registered codec matches `metadata.id`
/// (for example, the crate was built without the feature gating that codec), or any error
/// the matching codec's constructor reports for an invalid configuration.
pub fn codec_from_metadata(
    metadata: &CodecMetadata,
    config: &ZarrConfig,
) -> Result<Arc<dyn Codec>, CodecError> {
    for plugin in inventory::iter::<CodecPlugin> {
        if (plugin.match_name_fn)(&metadata.id) {
            return (plugin.create_fn)(metadata, config);
        }
    }
    Err(CodecError::UnsupportedCodec(metadata.id.clone()))
}

/// Resolve an array's `filters` + `compressor` descriptors into a live codec pipeline.
///
/// # Errors
/// Returns [`CodecError`] if any codec in `filters` or `compressor` fails to resolve.
pub fn resolve_pipeline(
    filters: Option<&[CodecMetadata]>,
    compressor: Option<&CodecMetadata>,
    config: &ZarrConfig,
) -> Result<(Vec<Arc<dyn Codec>>, Option<Arc<dyn Codec>>), CodecError> {
    let filters = filters
        .unwrap_or_default()
        .iter()
        .map(|m| codec_from_metadata(m, config))
        .collect::<Result<Vec<_>, _>>()?;
    let compressor = compressor.map(|m| codec_from_metadata(m, config)).transpose()?;
    Ok((filters, compressor))
}

/// Encode a decoded chunk buffer through filters (declared order) then the compressor
/// (spec §4.6 step 3, §6 "Chunk payload").
///
/// # Errors
/// Returns [`CodecError`] if any stage of the pipeline fails.
pub fn encode_pipeline(
    decoded: &[u8],
    filters: &[Arc<dyn Codec>],
    compressor: Option<&Arc<dyn Codec>>,
) -> Result<Vec<u8>, CodecError> {
    let mut bytes = decoded.to_vec();
    for filter in filters {
        bytes = filter.encode(&bytes)?;
    }
    if let Some(compressor) = compressor {
        bytes = compressor.encode(&bytes)?;
    }
    Ok(bytes)
}

/// Decode an encoded chunk payload: the compressor, then each filter's decode in reverse
/// declared order (spec §4.5 step 4, §6 "Chunk payload").
///
/// # Errors
/// Returns [`CodecError`] if any stage of the pipeline fails.
pub fn decode_pipeline(
    encoded: &[u8],
    filters: &[Arc<dyn Codec>],
    compressor: Option<&Arc<dyn Codec>>,
) -> Result<Vec<u8>, CodecError> {
    let mut bytes = match compressor {
        Some(compressor) => compressor.decode(encoded)?,
        None => encoded.to_vec(),
    };
    for filter in filters.iter().rev() {
        bytes = filter.decode(&bytes)?;
    }
    Ok(bytes)
}

/// Decode an encoded chunk payload directly into `dst` (spec §4.5 step 5, the whole-chunk
/// fast path), using [`Codec::decode_into`] on the innermost stage to skip one allocation
/// when there are no filters.
///
/// # Errors
/// Returns [`CodecError`] if any stage of the pipeline fails or the final decoded length
/// does not match `dst.len()`.
pub fn decode_pipeline_into(
    encoded: &[u8],
    filters: &[Arc<dyn Codec>],
    compressor: Option<&Arc<dyn Codec>>,
    dst: &mut [u8],
) -> Result<(), CodecError> {
    if filters.is_empty() {
        return match compressor {
            Some(compressor) => compressor.decode_into(encoded, dst),
            None => {
                if encoded.len() != dst.len() {
                    return Err(CodecError::Other(format!(
                        "decoded length {} does not match destination length {}",
                        encoded.len(),
                        dst.len()
                    )));
                }
                dst.copy_from_slice(encoded);
                Ok(())
            }
        };
    }
    let decoded = decode_pipeline(encoded, filters, compressor)?;
    if decoded.len() != dst.len() {
        return Err(CodecError::Other(format!(
            "decoded length {} does not match destination length {}",
            decoded.len(),
            dst.len()
        )));
    }
    dst.copy_from_slice(&decoded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_codec_id_errors() {
        let config = ZarrConfig::default();
        let metadata = CodecMetadata::new("nonexistent-codec-xyz");
        assert!(matches!(
            codec_from_metadata(&metadata, &config),
            Err(CodecError::UnsupportedCodec(_))
        ));
    }

    #[test]
    fn identity_pipeline_round_trips() {
        let config = ZarrConfig::default();
        let (filters, compressor) = resolve_pipeline(
            Some(&[CodecMetadata::new("identity")]),
            Some(&CodecMetadata::new("identity")),
            &config,
        )
        .unwrap();
        let data = b"hello world".to_vec();
        let encoded = encode_pipeline(&data, &filters, compressor.as_ref()).unwrap();
        let decoded = decode_pipeline(&encoded, &filters, compressor.as_ref()).unwrap();
        assert_eq!(decoded, data);
    }
}
