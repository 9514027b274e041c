//! The `blosc` bytes-to-bytes compressor, via the `blosc-sys` FFI bindings.
//!
//! Blosc frames are self-describing (the header records the decoded length), so `decode`
//! queries it with `blosc_cbuffer_sizes` rather than needing an externally-tracked
//! decoded-size hint.

use std::ffi::{c_char, c_int, c_void};

use serde::{Deserialize, Serialize};

use crate::config::ZarrConfig;
use crate::metadata::CodecMetadata;

use super::{Codec, CodecError, CodecPlugin};

const IDENTIFIER: &str = "blosc";

inventory::submit! {
    CodecPlugin::new(is_name_blosc, create_codec_blosc)
}

fn is_name_blosc(name: &str) -> bool {
    name == IDENTIFIER
}

fn create_codec_blosc(
    metadata: &CodecMetadata,
    _config: &ZarrConfig,
) -> Result<std::sync::Arc<dyn Codec>, CodecError> {
    let configuration: BloscConfiguration = if metadata.configuration.is_empty() {
        BloscConfiguration::default()
    } else {
        serde_json::from_value(serde_json::Value::Object(metadata.configuration.clone()))
            .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?
    };
    BloscCodec::new(
        &configuration.cname,
        configuration.clevel,
        configuration.shuffle,
        configuration.typesize,
        configuration.blocksize,
    )
    .map(|codec| std::sync::Arc::new(codec) as std::sync::Arc<dyn Codec>)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct BloscConfiguration {
    #[serde(default = "default_cname")]
    cname: String,
    #[serde(default = "default_clevel")]
    clevel: u8,
    #[serde(default)]
    shuffle: BloscShuffle,
    #[serde(default)]
    typesize: usize,
    #[serde(default)]
    blocksize: usize,
}

fn default_cname() -> String {
    "zstd".to_string()
}

fn default_clevel() -> u8 {
    5
}

impl Default for BloscConfiguration {
    fn default() -> Self {
        Self {
            cname: default_cname(),
            clevel: default_clevel(),
            shuffle: BloscShuffle::Noshuffle,
            typesize: 0,
            blocksize: 0,
        }
    }
}

/// The blosc shuffle filter applied before the named compressor.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloscShuffle {
    /// No byte shuffling.
    #[default]
    Noshuffle,
    /// Byte-wise shuffling (requires `typesize`).
    Shuffle,
    /// Bit-wise shuffling.
    Bitshuffle,
}

impl BloscShuffle {
    fn as_c_int(self) -> c_int {
        match self {
            Self::Noshuffle => blosc_sys::BLOSC_NOSHUFFLE as c_int,
            Self::Shuffle => blosc_sys::BLOSC_SHUFFLE as c_int,
            Self::Bitshuffle => blosc_sys::BLOSC_BITSHUFFLE as c_int,
        }
    }
}

/// The `blosc` compressor.
#[derive(Clone, Debug)]
pub struct BloscCodec {
    cname: String,
    clevel: u8,
    shuffle: BloscShuffle,
    typesize: usize,
    blocksize: usize,
}

impl BloscCodec {
    /// Create a new blosc codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidConfiguration`] if `shuffle` is not `Noshuffle` and
    /// `typesize` is zero, or `clevel` exceeds 9.
    pub fn new(
        cname: &str,
        clevel: u8,
        shuffle: BloscShuffle,
        typesize: usize,
        blocksize: usize,
    ) -> Result<Self, CodecError> {
        if clevel > 9 {
            return Err(CodecError::InvalidConfiguration(format!(
                "blosc clevel must be 0..=9, got {clevel}"
            )));
        }
        if shuffle != BloscShuffle::Noshuffle && typesize == 0 {
            return Err(CodecError::InvalidConfiguration(
                "typesize must be positive when shuffling is enabled".to_string(),
            ));
        }
        Ok(Self {
            cname: cname.to_string(),
            clevel,
            shuffle,
            typesize,
            blocksize,
        })
    }

    fn cname_cstr(&self) -> Result<std::ffi::CString, CodecError> {
        std::ffi::CString::new(self.cname.as_str())
            .map_err(|_| CodecError::InvalidConfiguration("cname contains a nul byte".to_string()))
    }
}

impl Codec for BloscCodec {
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let cname = self.cname_cstr()?;
        let destsize = decoded.len() + blosc_sys::BLOSC_MAX_OVERHEAD as usize;
        let mut dest: Vec<u8> = Vec::with_capacity(destsize);
        let written = unsafe {
            blosc_sys::blosc_compress_ctx(
                c_int::from(self.clevel),
                self.shuffle.as_c_int(),
                self.typesize,
                decoded.len(),
                decoded.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                destsize,
                cname.as_ptr().cast::<c_char>(),
                self.blocksize,
                1,
            )
        };
        if written <= 0 {
            return Err(CodecError::Other("blosc_compress_ctx failed".to_string()));
        }
        unsafe {
            dest.set_len(written as usize);
        }
        Ok(dest)
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut nbytes: usize = 0;
        let mut cbytes: usize = 0;
        let mut blocksize: usize = 0;
        unsafe {
            blosc_sys::blosc_cbuffer_sizes(
                encoded.as_ptr().cast::<c_void>(),
                std::ptr::addr_of_mut!(nbytes),
                std::ptr::addr_of_mut!(cbytes),
                std::ptr::addr_of_mut!(blocksize),
            );
        }
        if nbytes == 0 {
            return Err(CodecError::Other("not a valid blosc buffer".to_string()));
        }
        let mut dest: Vec<u8> = Vec::with_capacity(nbytes);
        let written = unsafe {
            blosc_sys::blosc_decompress_ctx(
                encoded.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                nbytes,
                1,
            )
        };
        if written <= 0 {
            return Err(CodecError::Other("blosc_decompress_ctx failed".to_string()));
        }
        unsafe {
            dest.set_len(written as usize);
        }
        Ok(dest)
    }

    fn get_config(&self) -> CodecMetadata {
        let mut codec = CodecMetadata::new(IDENTIFIER);
        codec.configuration.insert("cname".to_string(), serde_json::json!(self.cname));
        codec.configuration.insert("clevel".to_string(), serde_json::json!(self.clevel));
        codec
            .configuration
            .insert("shuffle".to_string(), serde_json::to_value(self.shuffle).unwrap());
        codec.configuration.insert("typesize".to_string(), serde_json::json!(self.typesize));
        codec.configuration.insert("blocksize".to_string(), serde_json::json!(self.blocksize));
        codec
    }
}
