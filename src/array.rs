//! The array engine (spec §4.5–§4.8): typed create/open, selection-driven read/write,
//! resize, and append, built on the selection engine's chunk enumeration and the codec
//! pipeline's encode/decode.

pub mod builder;
pub mod codec;
mod engine;

pub use builder::ArrayBuilder;

use std::sync::Arc;

use crate::array_subset::num_elements;
use crate::attributes::Attributes;
use crate::config::ZarrConfig;
use crate::error::{ZarrError, ZarrResult};
use crate::metadata::array::{decode_array_metadata, ArrayMetadata};
use crate::metadata::encode_metadata;
use crate::paths::{node_key, normalize_path, ARRAY_DESCRIPTOR_KEY, ATTRIBUTES_KEY};
use crate::selection::{enumerate_chunks, normalize, output_shape, ChunkProjection, Selection, SelectionItem};
use crate::storage::Store;
use crate::sync::Synchroniser;
use rayon::prelude::*;
use unsafe_cell_slice::UnsafeCellSlice;

use self::codec::{decode_pipeline, decode_pipeline_into, encode_pipeline, resolve_pipeline, Codec};

/// An array or chunk shape: one length per axis.
pub type ArrayShape = Vec<u64>;

/// A value retrieved through a selection (spec §4.4 "Output shape detail", §4.5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Retrieved {
    /// A single element's raw bytes — every selection axis was `Int`.
    Scalar(Vec<u8>),
    /// An output buffer of `itemsize(dtype) * product(shape)` bytes, laid out in the
    /// array's `order`.
    Array {
        /// The output shape.
        shape: ArrayShape,
        /// The output buffer's raw bytes.
        bytes: Vec<u8>,
    },
}

/// A value to write through a selection (spec §4.6).
#[derive(Clone, Copy, Debug)]
pub enum WriteValue<'a> {
    /// A single element's raw bytes, broadcast across every position the selection touches.
    Scalar(&'a [u8]),
    /// A buffer of raw bytes in the array's `order`, whose shape must equal the
    /// selection's output shape.
    Array {
        /// The value's shape.
        shape: &'a [u64],
        /// The value's raw bytes, `itemsize(dtype) * product(shape)` long.
        bytes: &'a [u8],
    },
}

/// How an array is opened relative to any existing descriptor at its path (spec §6
/// "Open modes").
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum OpenMode {
    /// `r`: read-only; fails if the descriptor is absent.
    ReadOnly,
    /// `r+`: read/write; fails if the descriptor is absent.
    ReadWrite,
    /// `a`: read/write; creates the descriptor (with caller-supplied metadata) if absent.
    ReadWriteCreate,
    /// `w`: creates the descriptor, overwriting any existing one and its chunks.
    Create,
    /// `w-`/`x`: creates the descriptor; fails with [`ZarrError::ContainerExists`] if one
    /// already exists.
    CreateExclusive,
}

/// A chunked N-dimensional array bound to a store and path.
#[derive(Debug)]
pub struct Array {
    store: Arc<dyn Store>,
    path: String,
    metadata: ArrayMetadata,
    filters: Vec<Arc<dyn Codec>>,
    compressor: Option<Arc<dyn Codec>>,
    read_only: bool,
    synchroniser: Option<Arc<dyn Synchroniser>>,
    config: ZarrConfig,
}

impl Array {
    /// Create a new array at `path`, writing its descriptor and empty attributes
    /// (spec §3 "Lifecycle").
    ///
    /// # Errors
    /// Returns [`ZarrError::Metadata`] if `metadata` fails [`ArrayMetadata::validate`], or
    /// [`ZarrError::Storage`]/[`ZarrError::Codec`] on a storage or codec-resolution failure.
    pub fn create(
        store: Arc<dyn Store>,
        path: impl Into<String>,
        metadata: ArrayMetadata,
        config: ZarrConfig,
    ) -> ZarrResult<Self> {
        let path = normalize_path(&path.into())?;
        metadata.validate()?;
        let (filters, compressor) = resolve_pipeline(
            metadata.filters.as_deref(),
            metadata.compressor.as_ref(),
            &config,
        )?;
        store.set(&node_key(&path, ARRAY_DESCRIPTOR_KEY)?, &encode_metadata(&metadata)?)?;
        if store.get(&node_key(&path, ATTRIBUTES_KEY)?)?.is_none() {
            store.set(&node_key(&path, ATTRIBUTES_KEY)?, b"{}")?;
        }
        Ok(Self {
            store,
            path,
            metadata,
            filters,
            compressor,
            read_only: false,
            synchroniser: None,
            config,
        })
    }

    /// Open an existing array, or create one, according to `mode` (spec §6 "Open modes").
    ///
    /// `create_metadata` is only consulted for `Create`/`ReadWriteCreate`/`CreateExclusive`
    /// when no descriptor is yet present.
    ///
    /// # Errors
    /// Returns [`ZarrError::KeyNotFound`] for `ReadOnly`/`ReadWrite` when no descriptor
    /// exists, [`ZarrError::ContainerExists`] for `CreateExclusive` when one does, or any
    /// error [`Array::create`] or [`decode_array_metadata`] can return.
    pub fn open(
        store: Arc<dyn Store>,
        path: impl Into<String>,
        mode: OpenMode,
        create_metadata: Option<ArrayMetadata>,
        config: ZarrConfig,
    ) -> ZarrResult<Self> {
        let path = normalize_path(&path.into())?;
        let descriptor_key = node_key(&path, ARRAY_DESCRIPTOR_KEY)?;
        let existing = store.get(&descriptor_key)?;

        if mode == OpenMode::Create {
            if existing.is_some() {
                let prefix = if path.is_empty() { String::new() } else { format!("{path}/") };
                store.erase_prefix(&prefix)?;
                store.delete(&descriptor_key)?;
            }
            let metadata = create_metadata.ok_or_else(|| ZarrError::KeyNotFound(path.clone()))?;
            return Self::create(store, path, metadata, config);
        }
        if mode == OpenMode::CreateExclusive {
            if existing.is_some() {
                return Err(ZarrError::ContainerExists(path));
            }
            let metadata = create_metadata.ok_or_else(|| ZarrError::KeyNotFound(path.clone()))?;
            return Self::create(store, path, metadata, config);
        }

        let read_only = mode == OpenMode::ReadOnly;
        let metadata = match existing {
            Some(bytes) => decode_array_metadata(&bytes)?,
            None if mode == OpenMode::ReadWriteCreate => {
                let metadata = create_metadata.ok_or_else(|| ZarrError::KeyNotFound(path.clone()))?;
                return Self::create(store, path, metadata, config);
            }
            None => return Err(ZarrError::KeyNotFound(path)),
        };
        let (filters, compressor) = resolve_pipeline(
            metadata.filters.as_deref(),
            metadata.compressor.as_ref(),
            &config,
        )?;
        Ok(Self {
            store,
            path,
            metadata,
            filters,
            compressor,
            read_only,
            synchroniser: None,
            config,
        })
    }

    /// Attach a synchroniser for per-chunk and per-attributes mutual exclusion (spec §4.11).
    #[must_use]
    pub fn with_synchroniser(mut self, synchroniser: Arc<dyn Synchroniser>) -> Self {
        self.synchroniser = Some(synchroniser);
        self
    }

    /// The path this array is bound to.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The array's current shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.metadata.shape
    }

    /// The array's chunk shape.
    #[must_use]
    pub fn chunks(&self) -> &[u64] {
        &self.metadata.chunks
    }

    /// The array's descriptor (shape, chunks, dtype, order, compressor, filters, fill value).
    #[must_use]
    pub fn metadata(&self) -> &ArrayMetadata {
        &self.metadata
    }

    /// Returns true if this handle was opened read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The configuration this array uses for checksum validation and chunk concurrency.
    #[must_use]
    pub fn config(&self) -> &ZarrConfig {
        &self.config
    }

    /// This array's attributes document.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        let attrs = Attributes::new(self.store.clone(), self.path.clone(), self.read_only, false);
        match &self.synchroniser {
            Some(s) => attrs.with_synchroniser(s.clone()),
            None => attrs,
        }
    }

    /// Read the elements described by `selection` (spec §4.5).
    ///
    /// # Errors
    /// Returns [`ZarrError::IndexOutOfBounds`]/[`ZarrError::UnsupportedSlicing`] if
    /// `selection` does not normalise against `shape`, or a storage/codec error from a
    /// chunk fetch or decode.
    pub fn retrieve(&self, selection: &Selection) -> ZarrResult<Retrieved> {
        let axes = normalize(selection, &self.metadata.shape)?;
        let itemsize = self.metadata.dtype.itemsize();
        let fill_bytes = self.metadata.fill_bytes()?;
        match output_shape(&axes) {
            None => {
                let mut output = vec![0u8; itemsize];
                let chunks: Vec<ChunkProjection> = enumerate_chunks(&axes, &self.metadata.chunks).collect();
                self.retrieve_chunks_into(&chunks, &mut output, &[], fill_bytes.as_deref())?;
                Ok(Retrieved::Scalar(output))
            }
            Some(shape) => {
                let total = num_elements(&shape) as usize;
                let mut output = vec![0u8; total * itemsize];
                let chunks: Vec<ChunkProjection> = enumerate_chunks(&axes, &self.metadata.chunks).collect();
                self.retrieve_chunks_into(&chunks, &mut output, &shape, fill_bytes.as_deref())?;
                Ok(Retrieved::Array { shape, bytes: output })
            }
        }
    }

    /// Fetch and decode every chunk in `chunks` into disjoint regions of `output`,
    /// concurrently (spec §5), bounded by [`ZarrConfig::chunk_concurrency`].
    fn retrieve_chunks_into(
        &self,
        chunks: &[ChunkProjection],
        output: &mut [u8],
        output_shape: &[u64],
        fill_bytes: Option<&[u8]>,
    ) -> ZarrResult<()> {
        let limit = self.config.chunk_concurrency(chunks.len());
        let output = UnsafeCellSlice::new(output);
        rayon_iter_concurrent_limit::iter_concurrent_limit!(limit, chunks, try_for_each, |chunk| {
            self.read_chunk_into(chunk, unsafe { output.get() }, output_shape, fill_bytes)
        })
    }

    fn read_chunk_into(
        &self,
        chunk: &ChunkProjection,
        output: &mut [u8],
        output_shape: &[u64],
        fill_bytes: Option<&[u8]>,
    ) -> ZarrResult<()> {
        let key = node_key(&self.path, &chunk.chunk_key())?;
        let _guard = self.synchroniser.as_ref().map(|s| s.chunk_lock(&chunk.chunk_key()));
        let itemsize = self.metadata.dtype.itemsize();
        match self.store.get(&key)? {
            None => {
                if let Some(fill) = fill_bytes {
                    engine::fill_output_region(
                        output,
                        chunk,
                        self.metadata.order,
                        &self.metadata.chunks,
                        output_shape,
                        itemsize,
                        fill,
                    );
                }
                Ok(())
            }
            Some(encoded) => {
                if engine::is_whole_chunk_contiguous(chunk, &self.metadata.chunks, output_shape) {
                    decode_pipeline_into(&encoded, &self.filters, self.compressor.as_ref(), output)?;
                } else {
                    let decoded = decode_pipeline(&encoded, &self.filters, self.compressor.as_ref())?;
                    engine::gather(
                        &decoded,
                        output,
                        chunk,
                        self.metadata.order,
                        &self.metadata.chunks,
                        output_shape,
                        itemsize,
                    );
                }
                Ok(())
            }
        }
    }

    /// Write `value` to the elements described by `selection` (spec §4.6).
    ///
    /// # Errors
    /// Returns [`ZarrError::ReadOnly`] if this handle is read-only,
    /// [`ZarrError::ShapeMismatch`] if an array value's shape does not match the
    /// selection's output shape, or a storage/codec error from a chunk read/write.
    pub fn store(&self, selection: &Selection, value: WriteValue) -> ZarrResult<()> {
        if self.read_only {
            return Err(ZarrError::ReadOnly);
        }
        let axes = normalize(selection, &self.metadata.shape)?;
        let itemsize = self.metadata.dtype.itemsize();
        let out_shape = output_shape(&axes).unwrap_or_default();
        if let WriteValue::Array { shape, bytes } = value {
            if shape != out_shape.as_slice() {
                return Err(ZarrError::ShapeMismatch {
                    value_shape: shape.to_vec(),
                    selection_shape: out_shape,
                });
            }
            let expected = num_elements(shape) as usize * itemsize;
            if bytes.len() != expected {
                return Err(ZarrError::ShapeMismatch {
                    value_shape: shape.to_vec(),
                    selection_shape: out_shape,
                });
            }
        }
        let fill_bytes = self.metadata.fill_bytes()?;
        let chunks: Vec<ChunkProjection> = enumerate_chunks(&axes, &self.metadata.chunks).collect();
        let limit = self.config.chunk_concurrency(chunks.len());
        rayon_iter_concurrent_limit::iter_concurrent_limit!(limit, chunks, try_for_each, |chunk| {
            self.write_chunk(chunk, value, &out_shape, fill_bytes.as_deref())
        })
    }

    fn write_chunk(
        &self,
        chunk: &ChunkProjection,
        value: WriteValue,
        output_shape: &[u64],
        fill_bytes: Option<&[u8]>,
    ) -> ZarrResult<()> {
        let key = node_key(&self.path, &chunk.chunk_key())?;
        let _guard = self.synchroniser.as_ref().map(|s| s.chunk_lock(&chunk.chunk_key()));
        let itemsize = self.metadata.dtype.itemsize();
        let chunk_elements = num_elements(&self.metadata.chunks) as usize;
        let whole = engine::is_whole_chunk_contiguous(chunk, &self.metadata.chunks, output_shape);

        let mut buffer = match value {
            WriteValue::Scalar(scalar) if whole => scalar.repeat(chunk_elements),
            WriteValue::Array { bytes, .. } if whole => bytes.to_vec(),
            _ => match self.store.get(&key)? {
                Some(encoded) => decode_pipeline(&encoded, &self.filters, self.compressor.as_ref())?,
                None => Self::fresh_chunk_buffer(chunk_elements * itemsize, fill_bytes),
            },
        };

        if !whole {
            match value {
                WriteValue::Scalar(scalar) => {
                    engine::scatter_scalar(&mut buffer, chunk, self.metadata.order, &self.metadata.chunks, itemsize, scalar);
                }
                WriteValue::Array { bytes, .. } => {
                    engine::scatter(
                        bytes,
                        &mut buffer,
                        chunk,
                        self.metadata.order,
                        &self.metadata.chunks,
                        output_shape,
                        itemsize,
                    );
                }
            }
        }

        let encoded = encode_pipeline(&buffer, &self.filters, self.compressor.as_ref())?;
        self.store.set(&key, &encoded)?;
        Ok(())
    }

    fn fresh_chunk_buffer(len: usize, fill_bytes: Option<&[u8]>) -> Vec<u8> {
        match fill_bytes {
            Some(fill) if !fill.is_empty() => fill.iter().copied().cycle().take(len).collect(),
            _ => vec![0u8; len],
        }
    }

    /// Rewrite the descriptor's `shape` and delete every chunk now outside the new chunk
    /// grid (spec §4.7).
    ///
    /// # Errors
    /// Returns [`ZarrError::ReadOnly`] if this handle is read-only, or
    /// [`ZarrError::ShapeMismatch`] if `new_shape` has a different dimensionality.
    pub fn resize(&mut self, new_shape: ArrayShape) -> ZarrResult<()> {
        if self.read_only {
            return Err(ZarrError::ReadOnly);
        }
        if new_shape.len() != self.metadata.shape.len() {
            return Err(ZarrError::ShapeMismatch {
                value_shape: new_shape,
                selection_shape: self.metadata.shape.clone(),
            });
        }
        log::debug!(
            "resizing array at {:?} from {:?} to {new_shape:?}",
            self.path,
            self.metadata.shape
        );
        let new_grid: Vec<u64> = new_shape
            .iter()
            .zip(self.metadata.chunks.iter())
            .map(|(&s, &c)| s.div_ceil(c))
            .collect();
        let prefix = if self.path.is_empty() { String::new() } else { format!("{}/", self.path) };
        for key in self.store.iter_keys(&prefix)? {
            let rest = key.as_str().strip_prefix(prefix.as_str()).unwrap_or(key.as_str());
            if rest == ARRAY_DESCRIPTOR_KEY || rest == ATTRIBUTES_KEY || rest.contains('/') {
                continue;
            }
            let Some(coords) = parse_chunk_key(rest, new_grid.len()) else {
                continue;
            };
            if coords.iter().zip(new_grid.iter()).any(|(&c, &g)| c >= g) {
                self.store.delete(&key)?;
            }
        }
        self.metadata.shape = new_shape;
        self.store.set(&node_key(&self.path, ARRAY_DESCRIPTOR_KEY)?, &encode_metadata(&self.metadata)?)?;
        Ok(())
    }

    /// Grow the array along `axis` by `value`'s extent there, then write `value` into the
    /// newly-created slice (spec §4.8).
    ///
    /// # Errors
    /// Returns [`ZarrError::ShapeMismatch`] if `value`'s shape disagrees with the array's
    /// current shape on any axis other than `axis`, or any error [`Array::resize`] or
    /// [`Array::store`] can return.
    pub fn append(&mut self, axis: usize, shape: &[u64], bytes: &[u8]) -> ZarrResult<()> {
        if axis >= self.metadata.shape.len() || shape.len() != self.metadata.shape.len() {
            return Err(ZarrError::ShapeMismatch {
                value_shape: shape.to_vec(),
                selection_shape: self.metadata.shape.clone(),
            });
        }
        for (i, (&s, &existing)) in shape.iter().zip(self.metadata.shape.iter()).enumerate() {
            if i != axis && s != existing {
                return Err(ZarrError::ShapeMismatch {
                    value_shape: shape.to_vec(),
                    selection_shape: self.metadata.shape.clone(),
                });
            }
        }
        let old_len = self.metadata.shape[axis];
        let mut new_shape = self.metadata.shape.clone();
        new_shape[axis] += shape[axis];
        self.resize(new_shape)?;

        let mut selection: Selection = self.metadata.shape.iter().map(|_| SelectionItem::full()).collect();
        selection[axis] = SelectionItem::Slice {
            start: Some(i64::try_from(old_len).unwrap_or(i64::MAX)),
            stop: None,
            step: None,
        };
        self.store(&selection, WriteValue::Array { shape, bytes })
    }

    /// Delete the descriptor, attributes, and every chunk under this array's path.
    ///
    /// # Errors
    /// Returns [`ZarrError::ReadOnly`] if this handle is read-only, or a storage error.
    pub fn erase(&self) -> ZarrResult<()> {
        if self.read_only {
            return Err(ZarrError::ReadOnly);
        }
        let prefix = if self.path.is_empty() { String::new() } else { format!("{}/", self.path) };
        self.store.erase_prefix(&prefix)?;
        Ok(())
    }
}

fn parse_chunk_key(key: &str, ndim: usize) -> Option<Vec<u64>> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() != ndim {
        return None;
    }
    parts.iter().map(|p| p.parse::<u64>().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array_subset::Order;
    use crate::metadata::array::ZARR_FORMAT;
    use crate::metadata::data_type::SimpleDType;
    use crate::metadata::{CodecMetadata, DataType, FillValueMetadata};
    use crate::storage::store::MemoryStore;

    fn int64_metadata(shape: Vec<u64>, chunks: Vec<u64>) -> ArrayMetadata {
        ArrayMetadata {
            zarr_format: ZARR_FORMAT,
            shape,
            chunks,
            dtype: DataType::Simple(SimpleDType::from_dtype_string("<i8").unwrap()),
            order: Order::C,
            compressor: None,
            fill_value: None,
            filters: None,
        }
    }

    #[test]
    fn scenario_1d_range_assign_and_slice() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let array = Array::create(store.clone(), "", int64_metadata(vec![100], vec![10]), ZarrConfig::default()).unwrap();
        let values: Vec<u8> = (0i64..100).flat_map(i64::to_le_bytes).collect();
        array
            .store(
                &vec![SelectionItem::full()],
                WriteValue::Array { shape: &[100], bytes: &values },
            )
            .unwrap();

        let Retrieved::Scalar(bytes) = array.retrieve(&vec![SelectionItem::Int(5)]).unwrap() else {
            panic!("expected scalar");
        };
        assert_eq!(i64::from_le_bytes(bytes.try_into().unwrap()), 5);

        let Retrieved::Array { shape, bytes } = array
            .retrieve(&vec![SelectionItem::Slice { start: Some(5), stop: Some(10), step: None }])
            .unwrap()
        else {
            panic!("expected array");
        };
        assert_eq!(shape, vec![5]);
        let got: Vec<i64> = bytes.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().unwrap())).collect();
        assert_eq!(got, vec![5, 6, 7, 8, 9]);

        let Retrieved::Array { bytes, .. } = array
            .retrieve(&vec![SelectionItem::Slice { start: Some(-5), stop: None, step: None }])
            .unwrap()
        else {
            panic!("expected array");
        };
        let got: Vec<i64> = bytes.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().unwrap())).collect();
        assert_eq!(got, vec![95, 96, 97, 98, 99]);

        let chunk_keys: Vec<_> = store.iter_keys("").unwrap().into_iter().filter(|k| k.as_str() != ".zarray" && k.as_str() != ".zattrs").collect();
        assert_eq!(chunk_keys.len(), 10);
    }

    #[test]
    fn scenario_2d_fill_value_single_chunk_populated() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut metadata = ArrayMetadata {
            zarr_format: ZARR_FORMAT,
            shape: vec![4, 4],
            chunks: vec![2, 2],
            dtype: DataType::Simple(SimpleDType::from_dtype_string("|u1").unwrap()),
            order: Order::C,
            compressor: None,
            fill_value: Some(FillValueMetadata::UInt(7)),
            filters: None,
        };
        metadata.fill_value = Some(FillValueMetadata::UInt(7));
        let array = Array::create(store.clone(), "", metadata, ZarrConfig::default()).unwrap();
        array
            .store(
                &vec![SelectionItem::Int(1), SelectionItem::Int(1)],
                WriteValue::Scalar(&[3]),
            )
            .unwrap();

        let Retrieved::Array { shape, bytes } = array.retrieve(&vec![SelectionItem::full(), SelectionItem::full()]).unwrap() else {
            panic!("expected array");
        };
        assert_eq!(shape, vec![4, 4]);
        let expected: Vec<u8> = vec![
            7, 7, 7, 7,
            7, 3, 7, 7,
            7, 7, 7, 7,
            7, 7, 7, 7,
        ];
        assert_eq!(bytes, expected);

        let chunk_keys: Vec<_> = store
            .iter_keys("")
            .unwrap()
            .into_iter()
            .filter(|k| k.as_str() != ".zarray" && k.as_str() != ".zattrs")
            .collect();
        assert_eq!(chunk_keys.len(), 1);
        assert_eq!(chunk_keys[0].as_str(), "0.0");
    }

    #[test]
    fn resize_shrinks_chunk_key_set() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut array = Array::create(store.clone(), "", int64_metadata(vec![10], vec![3]), ZarrConfig::default()).unwrap();
        let values: Vec<u8> = (0i64..10).flat_map(i64::to_le_bytes).collect();
        array
            .store(&vec![SelectionItem::full()], WriteValue::Array { shape: &[10], bytes: &values })
            .unwrap();
        let chunk_keys = |store: &Arc<dyn Store>| -> Vec<String> {
            store
                .iter_keys("")
                .unwrap()
                .into_iter()
                .map(|k| k.as_str().to_string())
                .filter(|k| k != ".zarray" && k != ".zattrs")
                .collect()
        };
        let mut keys = chunk_keys(&store);
        keys.sort();
        assert_eq!(keys, vec!["0", "1", "2", "3"]);

        array.resize(vec![5]).unwrap();
        let mut keys = chunk_keys(&store);
        keys.sort();
        assert_eq!(keys, vec!["0", "1"]);
    }

    #[test]
    fn read_only_array_rejects_writes() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Array::create(store.clone(), "", int64_metadata(vec![10], vec![3]), ZarrConfig::default()).unwrap();
        let array = Array::open(store, "", OpenMode::ReadOnly, None, ZarrConfig::default()).unwrap();
        let result = array.store(&vec![SelectionItem::Int(0)], WriteValue::Scalar(&0i64.to_le_bytes()));
        assert!(matches!(result, Err(ZarrError::ReadOnly)));
    }

    #[test]
    fn create_exclusive_rejects_existing() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let metadata = int64_metadata(vec![10], vec![3]);
        Array::create(store.clone(), "", metadata.clone(), ZarrConfig::default()).unwrap();
        let result = Array::open(store, "", OpenMode::CreateExclusive, Some(metadata), ZarrConfig::default());
        assert!(matches!(result, Err(ZarrError::ContainerExists(_))));
    }

    #[test]
    fn boolean_selection_touches_expected_chunks() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let array = Array::create(
            store,
            "",
            ArrayMetadata {
                zarr_format: ZARR_FORMAT,
                shape: vec![8],
                chunks: vec![3],
                dtype: DataType::Simple(SimpleDType::from_dtype_string("<i4").unwrap()),
                order: Order::C,
                compressor: None,
                fill_value: None,
                filters: None,
            },
            ZarrConfig::default(),
        )
        .unwrap();
        let values: Vec<u8> = (0i32..8).flat_map(i32::to_le_bytes).collect();
        array
            .store(&vec![SelectionItem::full()], WriteValue::Array { shape: &[8], bytes: &values })
            .unwrap();

        let mask = vec![true, false, false, true, true, false, false, true];
        let Retrieved::Array { shape, bytes } = array.retrieve(&vec![SelectionItem::BoolArray(mask)]).unwrap() else {
            panic!("expected array");
        };
        assert_eq!(shape, vec![4]);
        let got: Vec<i32> = bytes.chunks_exact(4).map(|c| i32::from_le_bytes(c.try_into().unwrap())).collect();
        assert_eq!(got, vec![0, 3, 4, 7]);
    }

    #[test]
    fn attributes_accessor_round_trips_through_array_path() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let array = Array::create(store, "arr", int64_metadata(vec![10], vec![5]), ZarrConfig::default()).unwrap();
        array.attributes().set("unit", serde_json::Value::from("K")).unwrap();
        assert_eq!(array.attributes().get("unit").unwrap(), Some(serde_json::Value::from("K")));
    }

    #[test]
    fn compressed_chunk_round_trips_with_gzip() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut metadata = int64_metadata(vec![20], vec![5]);
        metadata.compressor = Some(CodecMetadata::new("gzip"));
        let array = Array::create(store, "", metadata, ZarrConfig::default()).unwrap();
        let values: Vec<u8> = (0i64..20).flat_map(i64::to_le_bytes).collect();
        array
            .store(&vec![SelectionItem::full()], WriteValue::Array { shape: &[20], bytes: &values })
            .unwrap();
        let Retrieved::Array { bytes, .. } = array.retrieve(&vec![SelectionItem::full()]).unwrap() else {
            panic!("expected array");
        };
        assert_eq!(bytes, values);
    }
}
