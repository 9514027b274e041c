//! The `gzip` bytes-to-bytes compressor, via [`flate2`].

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::config::ZarrConfig;
use crate::metadata::CodecMetadata;

use super::{Codec, CodecError, CodecPlugin};

const IDENTIFIER: &str = "gzip";

inventory::submit! {
    CodecPlugin::new(is_name_gzip, create_codec_gzip)
}

fn is_name_gzip(name: &str) -> bool {
    name == IDENTIFIER
}

fn create_codec_gzip(
    metadata: &CodecMetadata,
    _config: &ZarrConfig,
) -> Result<std::sync::Arc<dyn Codec>, CodecError> {
    let configuration: GzipConfiguration = if metadata.configuration.is_empty() {
        GzipConfiguration::default()
    } else {
        serde_json::from_value(serde_json::Value::Object(metadata.configuration.clone()))
            .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?
    };
    if configuration.level > 9 {
        return Err(CodecError::InvalidConfiguration(format!(
            "gzip level must be 0..=9, got {}",
            configuration.level
        )));
    }
    Ok(std::sync::Arc::new(GzipCodec::new(configuration.level)))
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct GzipConfiguration {
    #[serde(default = "default_level")]
    level: u32,
}

fn default_level() -> u32 {
    5
}

impl Default for GzipConfiguration {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// The `gzip` compressor.
#[derive(Clone, Copy, Debug)]
pub struct GzipCodec {
    level: u32,
}

impl GzipCodec {
    /// Create a new gzip codec at compression `level` (0..=9).
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self { level }
    }
}

impl Codec for GzipCodec {
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(decoded)
            .map_err(|e| CodecError::Other(e.to_string()))?;
        encoder.finish().map_err(|e| CodecError::Other(e.to_string()))
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(encoded);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Other(e.to_string()))?;
        Ok(out)
    }

    fn get_config(&self) -> CodecMetadata {
        let mut codec = CodecMetadata::new(IDENTIFIER);
        codec
            .configuration
            .insert("level".to_string(), serde_json::json!(self.level));
        codec
    }
}
