//! Physical reordering of weight elements.
//!
//! [`transpose_weights`] copies a weight buffer into a destination whose
//! shape is the permuted source shape. Elements are moved by raw bit
//! pattern: `F16` values are never decoded, so downstream consumers see
//! exactly the encoded bits that were imported.

use crate::arena::WeightArena;
use crate::diagnostics::{DiagnosticSink, Severity};
use crate::dims::Dims;
use crate::error::{CoreError, Result};
use crate::permutation::Permutation;
use crate::weights::ShapedWeights;
use tracing::debug;

/// Highest rank the weight gather accepts.
pub const MAX_TRANSPOSE_RANK: usize = 4;

/// Check that the gather can transpose `weights` by `perm`.
///
/// Covers the permutation rank, the rank limit and the element type, so
/// callers can reject weights before allocating a destination.
pub fn check_transposable(weights: &ShapedWeights, perm: &Permutation) -> Result<()> {
    let rank = weights.shape.rank();
    if perm.rank() != rank {
        return Err(CoreError::InvalidPermutation(format!(
            "permutation {perm} does not match weights '{}' of rank {rank}",
            weights.display_name()
        )));
    }
    if rank > MAX_TRANSPOSE_RANK {
        return Err(CoreError::UnsupportedRank {
            rank,
            max: MAX_TRANSPOSE_RANK,
        });
    }
    if !weights.dtype.is_transposable() {
        return Err(CoreError::UnsupportedDataType(weights.dtype));
    }
    Ok(())
}

/// Transpose `src` into the pre-shaped, pre-allocated `dst`.
///
/// `dst.shape` must already equal `src.shape` permuted by `perm`. On
/// success `dst` holds every element of `src` at its permuted position and
/// inherits the source name, and a warning is sent to `sink`. On failure
/// `dst` is left untouched.
///
/// # Errors
///
/// * [`CoreError::UnsupportedRank`] for ranks above [`MAX_TRANSPOSE_RANK`]
/// * [`CoreError::UnsupportedDataType`] for anything but `F32` and `F16`
/// * [`CoreError::InvalidPermutation`], [`CoreError::ShapeMismatch`],
///   [`CoreError::DataTypeMismatch`], [`CoreError::MissingValues`] and
///   [`CoreError::SizeMismatch`] when the arguments disagree
pub fn transpose_weights(
    arena: &mut WeightArena,
    src: &ShapedWeights,
    perm: &Permutation,
    dst: &mut ShapedWeights,
    sink: &dyn DiagnosticSink,
) -> Result<()> {
    check_transposable(src, perm)?;
    if dst.dtype != src.dtype {
        return Err(CoreError::DataTypeMismatch {
            expected: src.dtype,
            actual: dst.dtype,
        });
    }

    let expected_shape = src.shape.permuted(perm)?;
    if dst.shape != expected_shape {
        return Err(CoreError::ShapeMismatch {
            expected: expected_shape.to_string(),
            actual: dst.shape.to_string(),
        });
    }

    let src_handle = src
        .values
        .ok_or_else(|| CoreError::MissingValues(src.display_name().to_string()))?;
    let dst_handle = dst
        .values
        .ok_or_else(|| CoreError::MissingValues(dst.display_name().to_string()))?;

    let src_shape = src.shape.padded_to(MAX_TRANSPOSE_RANK)?;
    let padded_perm = perm.padded_to(MAX_TRANSPOSE_RANK)?;
    let elem_size = src.dtype.size_in_bytes();
    let len = src.shape.byte_len(elem_size)?;

    let (src_bytes, dst_bytes) = arena.split(src_handle, dst_handle)?;
    let src_bytes = src_bytes.get(..len).ok_or(CoreError::SizeMismatch {
        expected: len,
        actual: src_bytes.len(),
    })?;
    let dst_len = dst_bytes.len();
    let dst_bytes = dst_bytes.get_mut(..len).ok_or(CoreError::SizeMismatch {
        expected: len,
        actual: dst_len,
    })?;

    permute_elements(src_bytes, &src_shape, &padded_perm, dst_bytes, elem_size)?;

    match src.name() {
        Some(name) => dst.set_name(name),
        None => dst.clear_name(),
    }
    debug!(
        name = src.display_name(),
        from = %src.shape,
        to = %dst.shape,
        dtype = %src.dtype,
        "transposed weights"
    );
    sink.log(
        Severity::Warning,
        &format!(
            "Weights {} has been transposed with permutation of {perm}! If you plan on \
             overwriting the weights with the refit API, the new weights must be pre-transposed.",
            src.display_name()
        ),
    );
    Ok(())
}

/// Gather the elements of `src` (shape `src_shape`) into `dst` so that the
/// destination coordinate `perm.apply(c)` holds the source element at `c`.
///
/// Source coordinates are visited in row-major order, last axis fastest.
/// Each element is `elem_size` bytes and is copied verbatim. Works for any
/// rank up to the shape capacity; nothing is written unless both buffers
/// have exactly the required length.
pub fn permute_elements(
    src: &[u8],
    src_shape: &Dims,
    perm: &Permutation,
    dst: &mut [u8],
    elem_size: usize,
) -> Result<()> {
    let dst_shape = src_shape.permuted(perm)?;
    let extents = src_shape.to_static()?;
    let dst_strides = dst_shape.strides()?;
    let count = src_shape.checked_volume()?;
    let expected = src_shape.byte_len(elem_size)?;

    for actual in [src.len(), dst.len()] {
        if actual != expected {
            return Err(CoreError::SizeMismatch { expected, actual });
        }
    }
    if count == 0 {
        return Ok(());
    }

    // Destination stride seen from each source axis.
    let mut step = vec![0usize; extents.len()];
    for (dst_axis, &src_axis) in perm.order().iter().enumerate() {
        step[src_axis] = dst_strides[dst_axis];
    }

    let mut coord = vec![0usize; extents.len()];
    let mut dst_index = 0usize;
    for (src_index, element) in src.chunks_exact(elem_size).enumerate() {
        let offset = dst_index * elem_size;
        dst[offset..offset + elem_size].copy_from_slice(element);

        if src_index + 1 == count {
            break;
        }
        for axis in (0..extents.len()).rev() {
            coord[axis] += 1;
            dst_index += step[axis];
            if coord[axis] < extents[axis] {
                break;
            }
            dst_index -= coord[axis] * step[axis];
            coord[axis] = 0;
        }
    }
    Ok(())
}
