//! The `identity` codec: a no-op bytes-to-bytes pass-through.
//!
//! Useful as an explicit filter/compressor entry when a caller wants the pipeline stage
//! present in metadata without it doing anything, and as the simplest possible codec to
//! exercise the registry and pipeline machinery against.

use crate::config::ZarrConfig;
use crate::metadata::CodecMetadata;

use super::{Codec, CodecError, CodecPlugin};

const IDENTIFIER: &str = "identity";

inventory::submit! {
    CodecPlugin::new(is_name_identity, create_codec_identity)
}

fn is_name_identity(name: &str) -> bool {
    name == IDENTIFIER
}

fn create_codec_identity(
    _metadata: &CodecMetadata,
    _config: &ZarrConfig,
) -> Result<std::sync::Arc<dyn Codec>, CodecError> {
    Ok(std::sync::Arc::new(IdentityCodec))
}

/// The no-op codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(decoded.to_vec())
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(encoded.to_vec())
    }

    fn decode_into(&self, encoded: &[u8], dst: &mut [u8]) -> Result<(), CodecError> {
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

    fn get_config(&self) -> CodecMetadata {
        CodecMetadata::new(IDENTIFIER)
    }
}
