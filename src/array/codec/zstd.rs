//! The `zstd` bytes-to-bytes compressor, via the [`zstd`] crate.

use serde::{Deserialize, Serialize};

use crate::config::ZarrConfig;
use crate::metadata::CodecMetadata;

use super::{Codec, CodecError, CodecPlugin};

const IDENTIFIER: &str = "zstd";

inventory::submit! {
    CodecPlugin::new(is_name_zstd, create_codec_zstd)
}

fn is_name_zstd(name: &str) -> bool {
    name == IDENTIFIER
}

fn create_codec_zstd(
    metadata: &CodecMetadata,
    _config: &ZarrConfig,
) -> Result<std::sync::Arc<dyn Codec>, CodecError> {
    let configuration: ZstdConfiguration = if metadata.configuration.is_empty() {
        ZstdConfiguration::default()
    } else {
        serde_json::from_value(serde_json::Value::Object(metadata.configuration.clone()))
            .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?
    };
    Ok(std::sync::Arc::new(ZstdCodec::new(
        configuration.level,
        configuration.checksum,
    )))
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct ZstdConfiguration {
    #[serde(default = "default_level")]
    level: i32,
    #[serde(default)]
    checksum: bool,
}

fn default_level() -> i32 {
    3
}

impl Default for ZstdConfiguration {
    fn default() -> Self {
        Self {
            level: default_level(),
            checksum: false,
        }
    }
}

/// The `zstd` compressor.
#[derive(Clone, Copy, Debug)]
pub struct ZstdCodec {
    level: i32,
    checksum: bool,
}

impl ZstdCodec {
    /// Create a new zstd codec at compression `level`, optionally with zstd's own frame
    /// checksum enabled.
    #[must_use]
    pub fn new(level: i32, checksum: bool) -> Self {
        Self { level, checksum }
    }
}

impl Codec for ZstdCodec {
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder =
            zstd::stream::Encoder::new(Vec::new(), self.level).map_err(|e| CodecError::Other(e.to_string()))?;
        encoder
            .include_checksum(self.checksum)
            .map_err(|e| CodecError::Other(e.to_string()))?;
        std::io::copy(&mut &decoded[..], &mut encoder).map_err(|e| CodecError::Other(e.to_string()))?;
        encoder.finish().map_err(|e| CodecError::Other(e.to_string()))
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::stream::decode_all(encoded).map_err(|e| CodecError::Other(e.to_string()))
    }

    fn get_config(&self) -> CodecMetadata {
        let mut codec = CodecMetadata::new(IDENTIFIER);
        codec
            .configuration
            .insert("level".to_string(), serde_json::json!(self.level));
        codec
            .configuration
            .insert("checksum".to_string(), serde_json::json!(self.checksum));
        codec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let codec = ZstdCodec::new(3, true);
        let data = vec![42u8; 8192];
        let encoded = codec.encode(&data).unwrap();
        assert!(encoded.len() < data.len());
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }
}
