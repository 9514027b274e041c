//! A builder for [`Array`] descriptors (spec §3 "Lifecycle").
//!
//! The builder is initialised from an array shape, chunk shape, and data type; fill value,
//! order, filters, compressor, and configuration all default to the same values
//! [`ArrayMetadata`] itself defaults to, and can be overridden with the setter methods
//! before calling [`ArrayBuilder::build`] or [`ArrayBuilder::open`].

use std::sync::Arc;

use crate::array_subset::Order;
use crate::config::ZarrConfig;
use crate::error::ZarrResult;
use crate::metadata::array::{ArrayMetadata, ZARR_FORMAT};
use crate::metadata::{CodecMetadata, DataType, FillValueMetadata};
use crate::storage::Store;

use super::{Array, OpenMode};

/// Builds an [`ArrayMetadata`] descriptor and creates or opens the [`Array`] it describes.
#[derive(Clone, Debug)]
pub struct ArrayBuilder {
    shape: Vec<u64>,
    chunks: Vec<u64>,
    dtype: DataType,
    order: Order,
    fill_value: Option<FillValueMetadata>,
    filters: Option<Vec<CodecMetadata>>,
    compressor: Option<CodecMetadata>,
    config: ZarrConfig,
}

impl ArrayBuilder {
    /// Start a builder for an array of `shape`, chunked as `chunks`, holding `dtype`
    /// elements. `shape` and `chunks` must have the same length; this is only checked when
    /// [`ArrayBuilder::build`] or [`ArrayBuilder::open`] resolves the descriptor.
    #[must_use]
    pub fn new(shape: Vec<u64>, chunks: Vec<u64>, dtype: DataType) -> Self {
        Self {
            shape,
            chunks,
            dtype,
            order: Order::default(),
            fill_value: None,
            filters: None,
            compressor: None,
            config: ZarrConfig::default(),
        }
    }

    /// Set the memory order chunks are laid out in.
    ///
    /// If left unmodified, the array uses row-major (`C`) order.
    pub fn order(&mut self, order: Order) -> &mut Self {
        self.order = order;
        self
    }

    /// Set the fill value materialised for chunks that have never been written.
    ///
    /// If left unmodified, unwritten regions read back as zero bytes.
    pub fn fill_value(&mut self, fill_value: FillValueMetadata) -> &mut Self {
        self.fill_value = Some(fill_value);
        self
    }

    /// Set the filter pipeline, applied in order before the compressor on encode.
    ///
    /// If left unmodified, the array has no filters.
    pub fn filters(&mut self, filters: Vec<CodecMetadata>) -> &mut Self {
        self.filters = Some(filters);
        self
    }

    /// Set the compressor.
    ///
    /// If left unmodified, chunks are stored uncompressed.
    pub fn compressor(&mut self, compressor: CodecMetadata) -> &mut Self {
        self.compressor = Some(compressor);
        self
    }

    /// Set the configuration the built array validates checksums and bounds chunk
    /// concurrency with.
    ///
    /// If left unmodified, the array is built with [`ZarrConfig::default`].
    pub fn config(&mut self, config: ZarrConfig) -> &mut Self {
        self.config = config;
        self
    }

    fn metadata(&self) -> ArrayMetadata {
        ArrayMetadata {
            zarr_format: ZARR_FORMAT,
            shape: self.shape.clone(),
            chunks: self.chunks.clone(),
            dtype: self.dtype.clone(),
            order: self.order,
            compressor: self.compressor.clone(),
            fill_value: self.fill_value.clone(),
            filters: self.filters.clone(),
        }
    }

    /// Build the array at `path`, creating its descriptor and attributes (spec §3
    /// "Lifecycle"), overwriting any array already there.
    ///
    /// # Errors
    /// Returns any error [`Array::create`] can return, notably
    /// [`crate::error::ZarrError::Metadata`] if the shape/chunks/dtype combination fails
    /// [`ArrayMetadata::validate`].
    pub fn build(&self, store: Arc<dyn Store>, path: impl Into<String>) -> ZarrResult<Array> {
        Array::create(store, path, self.metadata(), self.config.clone())
    }

    /// Open the array at `path` according to `mode` (spec §6 "Open modes"), using this
    /// builder's descriptor as `create_metadata` where `mode` may need to create one.
    ///
    /// # Errors
    /// Returns any error [`Array::open`] can return.
    pub fn open(&self, store: Arc<dyn Store>, path: impl Into<String>, mode: OpenMode) -> ZarrResult<Array> {
        Array::open(store, path, mode, Some(self.metadata()), self.config.clone())
    }
}
