//! Chunk-local gather/scatter: copying bytes between a decoded chunk buffer and the
//! caller's output/input buffer along the three-way mapping a [`ChunkProjection`]
//! describes (spec §4.5 step 6, §4.6 step 2 "Scatter").
//!
//! The mapping is decomposed into maximal contiguous *runs* along the chunk's fastest
//! axis (stride 1 under `order`); every other axis is walked position by position, since
//! consecutive positions along a non-fastest axis are not adjacent in memory. This keeps
//! the common case — a dense range or a whole chunk — down to one `copy_from_slice` per
//! outer-axis combination instead of one per element.

use crate::array_subset::Order;
use crate::selection::{ChunkProjection, LocalAxisSel, OutputAxisSel};

/// A maximal run of chunk-local positions whose corresponding output positions (if any)
/// are also consecutive.
#[derive(Clone, Copy, Debug)]
struct AxisRun {
    local_start: u64,
    output_start: Option<u64>,
    len: u64,
}

fn axis_runs(local: &LocalAxisSel, output: &OutputAxisSel) -> Vec<AxisRun> {
    let local_positions = local.to_positions();
    let outputs: Vec<Option<u64>> = match output {
        OutputAxisSel::Dropped => vec![None; local_positions.len()],
        OutputAxisSel::Dense { start, .. } => {
            (0..local_positions.len() as u64).map(|k| Some(start + k)).collect()
        }
        OutputAxisSel::Sparse(positions) => positions.iter().map(|&o| Some(o)).collect(),
    };
    let mut runs = Vec::new();
    let mut i = 0;
    while i < local_positions.len() {
        let mut j = i + 1;
        while j < local_positions.len()
            && local_positions[j] == local_positions[j - 1] + 1
            && match (outputs[j], outputs[j - 1]) {
                (Some(a), Some(b)) => a == b + 1,
                (None, None) => true,
                _ => false,
            }
        {
            j += 1;
        }
        runs.push(AxisRun {
            local_start: local_positions[i],
            output_start: outputs[i],
            len: (j - i) as u64,
        });
        i = j;
    }
    runs
}

fn axis_positions(local: &LocalAxisSel, output: &OutputAxisSel) -> Vec<(u64, Option<u64>)> {
    let local_positions = local.to_positions();
    match output {
        OutputAxisSel::Dropped => local_positions.into_iter().map(|l| (l, None)).collect(),
        OutputAxisSel::Dense { start, .. } => local_positions
            .into_iter()
            .enumerate()
            .map(|(k, l)| (l, Some(start + k as u64)))
            .collect(),
        OutputAxisSel::Sparse(positions) => local_positions
            .into_iter()
            .zip(positions.iter().copied())
            .map(|(l, o)| (l, Some(o)))
            .collect(),
    }
}

fn fastest_axis(order: Order, ndim: usize) -> usize {
    match order {
        Order::C => ndim.saturating_sub(1),
        Order::F => 0,
    }
}

/// Walk every `(chunk_local_element_offset, output_element_offset, run_len)` run a chunk
/// projection touches, in units of elements (not bytes).
///
/// `output_element_offset` is `None` for a run whose output coordinate involves a dropped
/// (`Int`-selected) axis elsewhere that happens to desynchronise... in practice this is
/// always `Some` for every run actually touched by a read/write, since every axis of the
/// projection that isn't itself dropped always has a defined output coordinate. The
/// `Option` exists so callers (e.g. a pure fill-with-scalar write) can choose to ignore it.
pub fn for_each_run(
    chunk: &ChunkProjection,
    order: Order,
    chunk_shape: &[u64],
    output_shape: &[u64],
    mut f: impl FnMut(u64, Option<u64>, u64),
) {
    let ndim = chunk_shape.len();
    if ndim == 0 {
        f(0, Some(0), 1);
        return;
    }
    let fastest = fastest_axis(order, ndim);
    let fastest_runs = axis_runs(&chunk.local[fastest], &chunk.output[fastest]);
    if fastest_runs.is_empty() {
        return;
    }
    let outer_axes: Vec<usize> = (0..ndim).filter(|&a| a != fastest).collect();
    let outer_positions: Vec<Vec<(u64, Option<u64>)>> = outer_axes
        .iter()
        .map(|&a| axis_positions(&chunk.local[a], &chunk.output[a]))
        .collect();
    if outer_positions.iter().any(Vec::is_empty) {
        return;
    }
    let mut cursor = vec![0usize; outer_axes.len()];
    loop {
        let mut local_coords = vec![0u64; ndim];
        let mut output_coords: Vec<Option<u64>> = vec![None; ndim];
        for (idx, &axis) in outer_axes.iter().enumerate() {
            let (l, o) = outer_positions[idx][cursor[idx]];
            local_coords[axis] = l;
            output_coords[axis] = o;
        }
        for run in &fastest_runs {
            local_coords[fastest] = run.local_start;
            output_coords[fastest] = run.output_start;
            let local_offset = order.linear_offset(&local_coords, chunk_shape);
            let output_offset = if output_shape.is_empty() {
                Some(0)
            } else if output_coords.iter().all(Option::is_some) {
                let oc: Vec<u64> = output_coords.iter().map(|o| o.unwrap()).collect();
                Some(order.linear_offset(&oc, output_shape))
            } else {
                None
            };
            f(local_offset, output_offset, run.len);
        }
        if outer_axes.is_empty() {
            return;
        }
        let mut i = outer_axes.len();
        let mut done = true;
        while i > 0 {
            i -= 1;
            cursor[i] += 1;
            if cursor[i] < outer_positions[i].len() {
                done = false;
                break;
            }
            cursor[i] = 0;
        }
        if done {
            return;
        }
    }
}

/// Like [`for_each_run`] but ignores the output mapping entirely, walking only the
/// chunk-local positions the projection touches. Used for scalar-value writes, where every
/// touched position receives the same bytes regardless of its output coordinate.
pub fn for_each_local_run(
    chunk: &ChunkProjection,
    order: Order,
    chunk_shape: &[u64],
    mut f: impl FnMut(u64, u64),
) {
    let ndim = chunk_shape.len();
    if ndim == 0 {
        f(0, 1);
        return;
    }
    let fastest = fastest_axis(order, ndim);
    let fastest_runs: Vec<(u64, u64)> = match &chunk.local[fastest] {
        LocalAxisSel::Dense { start, len } => vec![(*start, *len)],
        LocalAxisSel::Sparse(positions) => {
            let mut runs = Vec::new();
            let mut i = 0;
            while i < positions.len() {
                let mut j = i + 1;
                while j < positions.len() && positions[j] == positions[j - 1] + 1 {
                    j += 1;
                }
                runs.push((positions[i], (j - i) as u64));
                i = j;
            }
            runs
        }
    };
    if fastest_runs.is_empty() {
        return;
    }
    let outer_axes: Vec<usize> = (0..ndim).filter(|&a| a != fastest).collect();
    let outer_positions: Vec<Vec<u64>> =
        outer_axes.iter().map(|&a| chunk.local[a].to_positions()).collect();
    if outer_positions.iter().any(Vec::is_empty) {
        return;
    }
    let mut cursor = vec![0usize; outer_axes.len()];
    loop {
        let mut coords = vec![0u64; ndim];
        for (idx, &axis) in outer_axes.iter().enumerate() {
            coords[axis] = outer_positions[idx][cursor[idx]];
        }
        for &(start, len) in &fastest_runs {
            coords[fastest] = start;
            let offset = order.linear_offset(&coords, chunk_shape);
            f(offset, len);
        }
        if outer_axes.is_empty() {
            return;
        }
        let mut i = outer_axes.len();
        let mut done = true;
        while i > 0 {
            i -= 1;
            cursor[i] += 1;
            if cursor[i] < outer_positions[i].len() {
                done = false;
                break;
            }
            cursor[i] = 0;
        }
        if done {
            return;
        }
    }
}

/// Whether decoding (or scattering into) this chunk can bypass the gather/scatter path
/// entirely: the chunk is covered in full on every axis, and the region it maps to in
/// `output` starts at the origin with the same extents, so the chunk's decoded bytes and
/// `output`'s bytes are the same length and laid out in the same order (spec §4.5 step 5,
/// §4.6 step 1's "whole chunk" fast path).
///
/// A dropped (`Int`-selected) axis only qualifies when the chunk is itself size 1 along
/// that axis, since a dropped axis always contributes a single chunk-local position
/// regardless of the chunk's declared size there.
#[must_use]
pub fn is_whole_chunk_contiguous(
    chunk: &ChunkProjection,
    chunk_shape: &[u64],
    output_shape: &[u64],
) -> bool {
    let mut expected_output_shape = Vec::with_capacity(chunk_shape.len());
    for (axis, &chunk_len) in chunk_shape.iter().enumerate() {
        let LocalAxisSel::Dense { start: local_start, len: local_len } = &chunk.local[axis] else {
            return false;
        };
        if *local_start != 0 || *local_len != chunk_len {
            return false;
        }
        match &chunk.output[axis] {
            OutputAxisSel::Dropped => {
                if chunk_len != 1 {
                    return false;
                }
            }
            OutputAxisSel::Dense { start: out_start, len: out_len } => {
                if *out_start != 0 || out_len != local_len {
                    return false;
                }
                expected_output_shape.push(*out_len);
            }
            OutputAxisSel::Sparse(_) => return false,
        }
    }
    expected_output_shape == output_shape
}

/// Copy `chunk_bytes[local]` into `output[output]` for every run the projection touches
/// (spec §4.5 step 6 "gather").
pub fn gather(
    chunk_bytes: &[u8],
    output: &mut [u8],
    chunk: &ChunkProjection,
    order: Order,
    chunk_shape: &[u64],
    output_shape: &[u64],
    itemsize: usize,
) {
    for_each_run(chunk, order, chunk_shape, output_shape, |local_off, output_off, len| {
        if let Some(output_off) = output_off {
            let lo = local_off as usize * itemsize;
            let oo = output_off as usize * itemsize;
            let n = len as usize * itemsize;
            output[oo..oo + n].copy_from_slice(&chunk_bytes[lo..lo + n]);
        }
    });
}

/// Copy `input[output]` into `chunk_bytes[local]` for every run the projection touches
/// (spec §4.6 step 2 "scatter").
pub fn scatter(
    input: &[u8],
    chunk_bytes: &mut [u8],
    chunk: &ChunkProjection,
    order: Order,
    chunk_shape: &[u64],
    output_shape: &[u64],
    itemsize: usize,
) {
    for_each_run(chunk, order, chunk_shape, output_shape, |local_off, output_off, len| {
        if let Some(output_off) = output_off {
            let lo = local_off as usize * itemsize;
            let oo = output_off as usize * itemsize;
            let n = len as usize * itemsize;
            chunk_bytes[lo..lo + n].copy_from_slice(&input[oo..oo + n]);
        }
    });
}

/// Fill every output position the projection touches with `fill_bytes` (one element's
/// worth of bytes), used on a chunk miss when `fill_value` is not null (spec §4.5 step 3).
pub fn fill_output_region(
    output: &mut [u8],
    chunk: &ChunkProjection,
    order: Order,
    chunk_shape: &[u64],
    output_shape: &[u64],
    itemsize: usize,
    fill_bytes: &[u8],
) {
    for_each_run(chunk, order, chunk_shape, output_shape, |_local_off, output_off, len| {
        if let Some(output_off) = output_off {
            let oo = output_off as usize * itemsize;
            for k in 0..len as usize {
                output[oo + k * itemsize..oo + (k + 1) * itemsize].copy_from_slice(fill_bytes);
            }
        }
    });
}

/// Fill every chunk-local position the projection touches with `fill_bytes`, ignoring the
/// output mapping (a scalar-value write's whole-chunk / partial-chunk path, spec §4.6).
pub fn scatter_scalar(
    chunk_bytes: &mut [u8],
    chunk: &ChunkProjection,
    order: Order,
    chunk_shape: &[u64],
    itemsize: usize,
    fill_bytes: &[u8],
) {
    for_each_local_run(chunk, order, chunk_shape, |local_off, len| {
        let lo = local_off as usize * itemsize;
        for k in 0..len as usize {
            chunk_bytes[lo + k * itemsize..lo + (k + 1) * itemsize].copy_from_slice(fill_bytes);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{enumerate_chunks, NormalizedAxis};

    #[test]
    fn whole_chunk_fast_path_applies_when_selection_covers_one_full_chunk() {
        // shape=20, chunks=5: selecting exactly chunk 1 (positions 5..10) covers that
        // chunk in full and maps onto an output buffer the same size as the chunk.
        let axes = vec![NormalizedAxis::Range(5, 10)];
        let chunk_shape = [5u64];
        let output_shape = [5u64];
        let projection = enumerate_chunks(&axes, &chunk_shape).next().unwrap();
        assert!(is_whole_chunk_contiguous(&projection, &chunk_shape, &output_shape));
    }

    #[test]
    fn whole_chunk_fast_path_does_not_apply_to_a_partial_chunk() {
        // shape=20, chunks=5: selecting 6..10 only touches the back half of chunk 1.
        let axes = vec![NormalizedAxis::Range(6, 10)];
        let chunk_shape = [5u64];
        let output_shape = [4u64];
        let projection = enumerate_chunks(&axes, &chunk_shape).next().unwrap();
        assert!(!is_whole_chunk_contiguous(&projection, &chunk_shape, &output_shape));
    }

    #[test]
    fn whole_chunk_fast_path_does_not_apply_when_selection_spans_multiple_chunks() {
        // shape=20, chunks=5: selecting the whole array touches every chunk fully, but
        // each individual chunk's decoded bytes are not the same length as the full
        // output buffer, so the fast path must not fire per-chunk.
        let axes = vec![NormalizedAxis::Range(0, 20)];
        let chunk_shape = [5u64];
        let output_shape = [20u64];
        let projection = enumerate_chunks(&axes, &chunk_shape).next().unwrap();
        assert!(!is_whole_chunk_contiguous(&projection, &chunk_shape, &output_shape));
    }

    #[test]
    fn gather_2d_dense_range_matches_manual_indexing() {
        // shape (4,4), chunk (2,2): read rows 1..3, cols 0..4 (i.e. A[1:3, :])
        let axes = vec![NormalizedAxis::Range(1, 3), NormalizedAxis::Range(0, 4)];
        let chunk_shape = [2u64, 2];
        let output_shape = [2u64, 4];
        let itemsize = 4;
        let mut output = vec![0u8; 2 * 4 * itemsize];
        for projection in enumerate_chunks(&axes, &chunk_shape) {
            // fabricate chunk bytes: element value = row*10+col within the *array*,
            // encoded at its local chunk position for this chunk's coordinates.
            let mut chunk_bytes = vec![0u8; 4 * itemsize];
            for local_row in 0..2u64 {
                for local_col in 0..2u64 {
                    let array_row = projection.chunk_coords[0] * 2 + local_row;
                    let array_col = projection.chunk_coords[1] * 2 + local_col;
                    let value = (array_row * 10 + array_col) as u32;
                    let off = Order::C.linear_offset(&[local_row, local_col], &chunk_shape) as usize * itemsize;
                    chunk_bytes[off..off + itemsize].copy_from_slice(&value.to_le_bytes());
                }
            }
            gather(
                &chunk_bytes,
                &mut output,
                &projection,
                Order::C,
                &chunk_shape,
                &output_shape,
                itemsize,
            );
        }
        for out_row in 0..2u64 {
            for out_col in 0..4u64 {
                let array_row = out_row + 1;
                let array_col = out_col;
                let expected = (array_row * 10 + array_col) as u32;
                let off = Order::C.linear_offset(&[out_row, out_col], &output_shape) as usize * itemsize;
                let actual = u32::from_le_bytes(output[off..off + itemsize].try_into().unwrap());
                assert_eq!(actual, expected, "mismatch at output ({out_row},{out_col})");
            }
        }
    }

    #[test]
    fn scatter_scalar_fills_every_touched_position() {
        let axes = vec![NormalizedAxis::Range(0, 4)];
        let chunk_shape = [4u64];
        let itemsize = 1;
        let mut chunk_bytes = vec![0u8; 4];
        for projection in enumerate_chunks(&axes, &chunk_shape) {
            scatter_scalar(&mut chunk_bytes, &projection, Order::C, &chunk_shape, itemsize, &[9]);
        }
        assert_eq!(chunk_bytes, vec![9, 9, 9, 9]);
    }

    #[test]
    fn fill_output_region_bool_mask_preserves_order() {
        let mask = vec![true, false, true, true];
        let axes = vec![NormalizedAxis::BoolMask(mask)];
        let chunk_shape = [2u64];
        let output_shape = [3u64];
        let itemsize = 1;
        let mut output = vec![0u8; 3];
        for projection in enumerate_chunks(&axes, &chunk_shape) {
            fill_output_region(&mut output, &projection, Order::C, &chunk_shape, &output_shape, itemsize, &[7]);
        }
        assert_eq!(output, vec![7, 7, 7]);
    }
}
