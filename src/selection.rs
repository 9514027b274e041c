//! The selection engine: normalising user indexing expressions and decomposing them into
//! per-chunk sub-selections.
//!
//! See spec §4.4. This module owns the hardest algorithm in the crate: turning a
//! [`Selection`] (one [`SelectionItem`] per axis, possibly with an `Ellipsis`) into the
//! output buffer's shape plus a lazy sequence of [`ChunkProjection`]s, each describing the
//! three-way mapping between a chunk coordinate, the region touched within that chunk, and
//! the region of the output buffer it corresponds to.

use crate::error::{ZarrError, ZarrResult};

/// One axis of a user-supplied, not-yet-normalised selection.
#[derive(Clone, Debug)]
pub enum SelectionItem {
    /// A placeholder that expands to as many full-axis [`SelectionItem::Slice`]s as needed
    /// to pad the selection out to the array's dimensionality. At most one may appear.
    Ellipsis,
    /// A single integer index. Negative values wrap relative to the axis length.
    Int(i64),
    /// A slice with optional bounds and an optional step (only `1`/`None` is supported).
    Slice {
        /// Inclusive-exclusive start, or `None` for the beginning of the axis.
        start: Option<i64>,
        /// Inclusive-exclusive stop, or `None` for the end of the axis.
        stop: Option<i64>,
        /// The step. Only `Some(1)` and `None` are supported.
        step: Option<i64>,
    },
    /// A boolean mask, one entry per element of the axis.
    BoolArray(Vec<bool>),
    /// An array of (possibly negative, possibly out-of-order) integer indices.
    IntArray(Vec<i64>),
}

impl SelectionItem {
    /// A full-axis slice, i.e. the normalisation of a bare `:`.
    #[must_use]
    pub fn full() -> Self {
        Self::Slice {
            start: None,
            stop: None,
            step: None,
        }
    }
}

/// A user-supplied selection: one [`SelectionItem`] per axis (or fewer, implicitly padded).
pub type Selection = Vec<SelectionItem>;

/// Convenience: a selection over a single axis, e.g. `sel![3..10]` style callers.
#[must_use]
pub fn selection_of(items: impl IntoIterator<Item = SelectionItem>) -> Selection {
    items.into_iter().collect()
}

/// A single axis of a *normalised* selection (spec §4.4 "Normalisation").
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizedAxis {
    /// A single in-bounds index; this axis is dropped from the output shape.
    Int(u64),
    /// A half-open `[start, stop)` range, `start <= stop <= length`.
    Range(u64, u64),
    /// A boolean mask, one entry per element of the axis.
    BoolMask(Vec<bool>),
    /// An ordered (possibly repeating, possibly out-of-order) list of in-bounds indices.
    IntArray(Vec<u64>),
}

impl NormalizedAxis {
    /// The length this axis contributes to the output shape, or `None` if it is dropped.
    #[must_use]
    pub fn output_len(&self) -> Option<u64> {
        match self {
            Self::Int(_) => None,
            Self::Range(start, stop) => Some(stop - start),
            Self::BoolMask(mask) => Some(mask.iter().filter(|b| **b).count() as u64),
            Self::IntArray(a) => Some(a.len() as u64),
        }
    }
}

fn wrap_index(index: i64, length: u64) -> Option<u64> {
    let length_i = i64::try_from(length).ok()?;
    let wrapped = if index < 0 { index + length_i } else { index };
    if wrapped >= 0 && wrapped < length_i {
        Some(wrapped as u64)
    } else {
        None
    }
}

/// Resolve a slice's possibly-negative, possibly-absent bounds against an axis `length`.
fn resolve_slice_bounds(
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
    length: u64,
) -> ZarrResult<(u64, u64)> {
    if !matches!(step, None | Some(1)) {
        return Err(ZarrError::UnsupportedSlicing(format!(
            "step {step:?} is not supported; only 1 or None"
        )));
    }
    let length_i = i64::try_from(length).unwrap_or(i64::MAX);
    let clamp_start = |v: i64| v.clamp(0, length_i) as u64;
    let start = match start {
        None => 0,
        Some(s) => clamp_start(if s < 0 { (s + length_i).max(0) } else { s }),
    };
    let stop = match stop {
        None => length,
        Some(e) => clamp_start(if e < 0 { (e + length_i).max(0) } else { e }),
    };
    let stop = stop.max(start);
    Ok((start, stop))
}

/// Normalise a user [`Selection`] against an array `shape` (spec §4.4 "Normalisation").
///
/// # Errors
/// Returns [`ZarrError::IndexOutOfBounds`] for an out-of-range `Int`/`IntArray` entry,
/// [`ZarrError::UnsupportedSlicing`] for a step other than `1`/`None`, or a generic
/// shape-mismatch flavoured [`ZarrError::ShapeMismatch`] if the selection has more items
/// than the array has axes.
pub fn normalize(selection: &[SelectionItem], shape: &[u64]) -> ZarrResult<Vec<NormalizedAxis>> {
    let ndim = shape.len();

    let ellipsis_count = selection
        .iter()
        .filter(|item| matches!(item, SelectionItem::Ellipsis))
        .count();
    if ellipsis_count > 1 {
        return Err(ZarrError::UnsupportedSlicing(
            "a selection may contain at most one Ellipsis".to_string(),
        ));
    }

    let non_ellipsis_len = selection.len() - ellipsis_count;
    if non_ellipsis_len > ndim {
        return Err(ZarrError::ShapeMismatch {
            value_shape: vec![selection.len() as u64],
            selection_shape: vec![ndim as u64],
        });
    }

    let mut expanded: Vec<SelectionItem> = Vec::with_capacity(ndim);
    for item in selection {
        match item {
            SelectionItem::Ellipsis => {
                if non_ellipsis_len < ndim {
                    let fill = ndim - non_ellipsis_len;
                    for _ in 0..fill {
                        expanded.push(SelectionItem::full());
                    }
                }
                // if non_ellipsis_len >= ndim the Ellipsis expands to nothing and is dropped
            }
            other => expanded.push(other.clone()),
        }
    }
    while expanded.len() < ndim {
        expanded.push(SelectionItem::full());
    }

    expanded
        .into_iter()
        .zip(shape.iter())
        .map(|(item, &length)| normalize_axis(item, length))
        .collect()
}

fn normalize_axis(item: SelectionItem, length: u64) -> ZarrResult<NormalizedAxis> {
    match item {
        SelectionItem::Ellipsis => unreachable!("Ellipsis is expanded before this point"),
        SelectionItem::Int(k) => wrap_index(k, length)
            .map(NormalizedAxis::Int)
            .ok_or(ZarrError::IndexOutOfBounds { index: k, length }),
        SelectionItem::Slice { start, stop, step } => {
            let (s, e) = resolve_slice_bounds(start, stop, step, length)?;
            Ok(NormalizedAxis::Range(s, e))
        }
        SelectionItem::BoolArray(mask) => {
            if mask.len() as u64 != length {
                return Err(ZarrError::ShapeMismatch {
                    value_shape: vec![mask.len() as u64],
                    selection_shape: vec![length],
                });
            }
            Ok(NormalizedAxis::BoolMask(mask))
        }
        SelectionItem::IntArray(indices) => {
            let resolved = indices
                .iter()
                .map(|&i| wrap_index(i, length).ok_or(ZarrError::IndexOutOfBounds { index: i, length }))
                .collect::<ZarrResult<Vec<u64>>>()?;
            Ok(NormalizedAxis::IntArray(resolved))
        }
    }
}

/// The output shape implied by a normalised selection (spec §4.4 "Output shape").
///
/// `None` when every axis is `Int`, meaning the selection denotes a single scalar element.
#[must_use]
pub fn output_shape(axes: &[NormalizedAxis]) -> Option<Vec<u64>> {
    let shape: Vec<u64> = axes.iter().filter_map(NormalizedAxis::output_len).collect();
    if axes.iter().all(|a| matches!(a, NormalizedAxis::Int(_))) {
        None
    } else {
        Some(shape)
    }
}

/// The region of a single axis touched within one chunk, and where that maps locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalAxisSel {
    /// A contiguous `[start, start+len)` run of chunk-local positions.
    Dense {
        /// First chunk-local position.
        start: u64,
        /// Number of positions.
        len: u64,
    },
    /// An explicit, possibly non-contiguous, ordered list of chunk-local positions.
    Sparse(Vec<u64>),
}

impl LocalAxisSel {
    /// Expand to an explicit ordered list of chunk-local positions.
    #[must_use]
    pub fn to_positions(&self) -> Vec<u64> {
        match self {
            Self::Dense { start, len } => (*start..*start + *len).collect(),
            Self::Sparse(positions) => positions.clone(),
        }
    }

    /// The number of positions this selection touches.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Dense { len, .. } => *len,
            Self::Sparse(positions) => positions.len() as u64,
        }
    }

    /// Returns true if this selection touches no positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The region of the output buffer a chunk's contribution along one axis maps to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputAxisSel {
    /// The axis was an `Int` selection; it does not appear in the output shape.
    Dropped,
    /// A contiguous `[start, start+len)` run of output positions.
    Dense {
        /// First output position.
        start: u64,
        /// Number of positions.
        len: u64,
    },
    /// An explicit, possibly non-contiguous, ordered list of output positions.
    Sparse(Vec<u64>),
}

impl OutputAxisSel {
    /// Expand to an explicit ordered list of output positions, or `None` if dropped.
    #[must_use]
    pub fn to_positions(&self) -> Option<Vec<u64>> {
        match self {
            Self::Dropped => None,
            Self::Dense { start, len } => Some((*start..*start + *len).collect()),
            Self::Sparse(positions) => Some(positions.clone()),
        }
    }
}

/// One axis's worth of the `(chunk_index, chunk_sub_selection, output_sub_selection)` table
/// in spec §4.4, fully expanded across every chunk that axis touches.
fn axis_chunk_table(
    axis: &NormalizedAxis,
    chunk_size: u64,
) -> Vec<(u64, LocalAxisSel, OutputAxisSel)> {
    match axis {
        NormalizedAxis::Int(k) => {
            let chunk_idx = k / chunk_size;
            let local = k % chunk_size;
            vec![(
                chunk_idx,
                LocalAxisSel::Dense { start: local, len: 1 },
                OutputAxisSel::Dropped,
            )]
        }
        NormalizedAxis::Range(s, e) => {
            if s >= e {
                return Vec::new();
            }
            let first_chunk = s / chunk_size;
            let last_chunk = (e - 1) / chunk_size;
            let mut out = Vec::new();
            for chunk_idx in first_chunk..=last_chunk {
                let off = chunk_idx * chunk_size;
                let local_start = s.max(off) - off;
                let local_end = e.min(off + chunk_size) - off;
                let out_start = s.max(off) - s;
                let out_end = e.min(off + chunk_size) - s;
                out.push((
                    chunk_idx,
                    LocalAxisSel::Dense {
                        start: local_start,
                        len: local_end - local_start,
                    },
                    OutputAxisSel::Dense {
                        start: out_start,
                        len: out_end - out_start,
                    },
                ));
            }
            out
        }
        NormalizedAxis::BoolMask(mask) => {
            let length = mask.len() as u64;
            let num_chunks = length.div_ceil(chunk_size);
            let mut out = Vec::new();
            let mut running_count = 0u64;
            for chunk_idx in 0..num_chunks {
                let off = chunk_idx * chunk_size;
                let chunk_len = chunk_size.min(length - off);
                let positions: Vec<u64> = (0..chunk_len)
                    .filter(|&p| mask[(off + p) as usize])
                    .collect();
                if !positions.is_empty() {
                    let count = positions.len() as u64;
                    out.push((
                        chunk_idx,
                        LocalAxisSel::Sparse(positions),
                        OutputAxisSel::Dense {
                            start: running_count,
                            len: count,
                        },
                    ));
                    running_count += count;
                }
            }
            out
        }
        NormalizedAxis::IntArray(indices) => {
            use std::collections::BTreeMap;
            let mut grouped: BTreeMap<u64, (Vec<u64>, Vec<u64>)> = BTreeMap::new();
            for (original_pos, &value) in indices.iter().enumerate() {
                let chunk_idx = value / chunk_size;
                let local = value % chunk_size;
                let entry = grouped.entry(chunk_idx).or_default();
                entry.0.push(local);
                entry.1.push(original_pos as u64);
            }
            grouped
                .into_iter()
                .map(|(chunk_idx, (locals, outputs))| {
                    (
                        chunk_idx,
                        LocalAxisSel::Sparse(locals),
                        OutputAxisSel::Sparse(outputs),
                    )
                })
                .collect()
        }
    }
}

/// One chunk touched by a selection, with the full per-axis local/output projection.
#[derive(Clone, Debug)]
pub struct ChunkProjection {
    /// This chunk's coordinates in the chunk grid.
    pub chunk_coords: Vec<u64>,
    /// Per-axis region touched within the chunk.
    pub local: Vec<LocalAxisSel>,
    /// Per-axis region of the output buffer this chunk's contribution maps to.
    pub output: Vec<OutputAxisSel>,
}

impl ChunkProjection {
    /// The dot-joined chunk key, e.g. `"3.0.12"`.
    #[must_use]
    pub fn chunk_key(&self) -> String {
        self.chunk_coords
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A lazy cartesian product over the per-axis chunk tables, yielding one [`ChunkProjection`]
/// per chunk touched by the selection (spec §4.4 "Chunk enumeration").
pub struct ChunkProjectionIter {
    per_axis: Vec<Vec<(u64, LocalAxisSel, OutputAxisSel)>>,
    cursor: Option<Vec<usize>>,
}

impl ChunkProjectionIter {
    fn new(per_axis: Vec<Vec<(u64, LocalAxisSel, OutputAxisSel)>>) -> Self {
        let empty = per_axis.iter().any(Vec::is_empty);
        let cursor = if empty || per_axis.is_empty() {
            None
        } else {
            Some(vec![0; per_axis.len()])
        };
        Self { per_axis, cursor }
    }

    fn advance(&mut self) {
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        for axis in (0..cursor.len()).rev() {
            cursor[axis] += 1;
            if cursor[axis] < self.per_axis[axis].len() {
                return;
            }
            cursor[axis] = 0;
        }
        self.cursor = None;
    }
}

impl Iterator for ChunkProjectionIter {
    type Item = ChunkProjection;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.clone()?;
        let mut chunk_coords = Vec::with_capacity(cursor.len());
        let mut local = Vec::with_capacity(cursor.len());
        let mut output = Vec::with_capacity(cursor.len());
        for (axis, &pos) in cursor.iter().enumerate() {
            let (chunk_idx, local_sel, output_sel) = &self.per_axis[axis][pos];
            chunk_coords.push(*chunk_idx);
            local.push(local_sel.clone());
            output.push(output_sel.clone());
        }
        self.advance();
        Some(ChunkProjection {
            chunk_coords,
            local,
            output,
        })
    }
}

/// Build the lazy chunk-enumeration iterator for a normalised selection.
///
/// `chunk_shape` must have the same length as `axes`.
#[must_use]
pub fn enumerate_chunks(axes: &[NormalizedAxis], chunk_shape: &[u64]) -> ChunkProjectionIter {
    let per_axis = axes
        .iter()
        .zip(chunk_shape.iter())
        .map(|(axis, &size)| axis_chunk_table(axis, size))
        .collect();
    ChunkProjectionIter::new(per_axis)
}
