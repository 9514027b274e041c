//! The `crc32c` checksum codec: a bytes-to-bytes filter that appends a 4-byte little-endian
//! CRC32C checksum on encode, and verifies (or, if disabled, merely strips) it on decode.
//!
//! Whether decode actually verifies is controlled by [`ZarrConfig::validate_checksums`]
//! (spec SPEC_FULL §4.13) rather than by the codec's own JSON configuration, since it is a
//! runtime behaviour toggle rather than a parameter of the encoding itself.

use crate::config::ZarrConfig;
use crate::metadata::CodecMetadata;

use super::{Codec, CodecError, CodecPlugin};

const IDENTIFIER: &str = "crc32c";

inventory::submit! {
    CodecPlugin::new(is_name_crc32c, create_codec_crc32c)
}

fn is_name_crc32c(name: &str) -> bool {
    name == IDENTIFIER
}

fn create_codec_crc32c(
    _metadata: &CodecMetadata,
    config: &ZarrConfig,
) -> Result<std::sync::Arc<dyn Codec>, CodecError> {
    Ok(std::sync::Arc::new(Crc32cCodec::new(
        config.validate_checksums(),
    )))
}

/// The `crc32c` checksum codec.
#[derive(Clone, Copy, Debug)]
pub struct Crc32cCodec {
    validate_checksums: bool,
}

impl Crc32cCodec {
    /// Create a new checksum codec; `validate_checksums` controls whether `decode` checks
    /// the stored checksum against the recomputed one or merely strips it.
    #[must_use]
    pub fn new(validate_checksums: bool) -> Self {
        Self { validate_checksums }
    }
}

impl Codec for Crc32cCodec {
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let checksum = crc32c::crc32c(decoded);
        let mut out = Vec::with_capacity(decoded.len() + 4);
        out.extend_from_slice(decoded);
        out.extend_from_slice(&checksum.to_le_bytes());
        Ok(out)
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        if encoded.len() < 4 {
            return Err(CodecError::Other(
                "crc32c-encoded data shorter than the 4-byte checksum".to_string(),
            ));
        }
        let (data, checksum_bytes) = encoded.split_at(encoded.len() - 4);
        if self.validate_checksums {
            let expected = u32::from_le_bytes(checksum_bytes.try_into().unwrap());
            let actual = crc32c::crc32c(data);
            if expected != actual {
                return Err(CodecError::ChecksumMismatch { expected, actual });
            }
        }
        Ok(data.to_vec())
    }

    fn get_config(&self) -> CodecMetadata {
        CodecMetadata::new(IDENTIFIER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_validation() {
        let codec = Crc32cCodec::new(true);
        let data = b"the quick brown fox".to_vec();
        let encoded = codec.encode(&data).unwrap();
        assert_eq!(encoded.len(), data.len() + 4);
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn corrupted_checksum_fails_when_validating() {
        let codec = Crc32cCodec::new(true);
        let mut encoded = codec.encode(b"payload").unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert!(matches!(
            codec.decode(&encoded),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn corrupted_checksum_is_ignored_when_not_validating() {
        let codec = Crc32cCodec::new(false);
        let mut encoded = codec.encode(b"payload").unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert_eq!(codec.decode(&encoded).unwrap(), b"payload".to_vec());
    }
}
