//! Integration tests for the weight permutation engine.

use onnxt_core::{
    transpose_weights, CollectingSink, CoreError, DataType, Dims, Permutation, Severity,
    ShapedWeights, TracingSink, WeightArena,
};

fn import_f32(
    arena: &mut WeightArena,
    values: &[f32],
    shape: &[i64],
    name: &str,
) -> ShapedWeights {
    let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let handle = arena.alloc_from(bytes).unwrap();
    ShapedWeights::new(DataType::F32, Some(handle), Dims::new(shape).unwrap()).with_name(name)
}

fn permuted_target(
    arena: &mut WeightArena,
    src: &ShapedWeights,
    perm: &Permutation,
) -> ShapedWeights {
    let shape = src.shape.permuted(perm).unwrap();
    let handle = arena.alloc(src.size_bytes()).unwrap();
    ShapedWeights::new(src.dtype, Some(handle), shape)
}

#[test]
fn test_two_by_three_transpose() -> anyhow::Result<()> {
    let mut arena = WeightArena::new();
    let src = import_f32(&mut arena, &[0., 1., 2., 3., 4., 5.], &[2, 3], "fc.weight");
    let perm = Permutation::new(&[1, 0])?;
    let mut dst = permuted_target(&mut arena, &src, &perm);

    transpose_weights(&mut arena, &src, &perm, &mut dst, &TracingSink::default())?;

    assert_eq!(dst.shape, Dims::new(&[3, 2])?);
    assert_eq!(dst.to_f32_vec(&arena)?, vec![0., 3., 1., 4., 2., 5.]);
    assert_eq!(dst.name(), Some("fc.weight"));
    // The source is superseded, not modified.
    assert_eq!(src.to_f32_vec(&arena)?, vec![0., 1., 2., 3., 4., 5.]);
    Ok(())
}

#[test]
fn test_identity_permutation_is_byte_identical() {
    let mut arena = WeightArena::new();
    let values: Vec<f32> = (0..48).map(|v| v as f32 * 0.25 - 3.0).collect();
    let src = import_f32(&mut arena, &values, &[1, 3, 4, 4], "conv.weight");
    let perm = Permutation::identity(4).unwrap();
    let mut dst = permuted_target(&mut arena, &src, &perm);

    transpose_weights(&mut arena, &src, &perm, &mut dst, &CollectingSink::new()).unwrap();

    assert_eq!(
        dst.bytes(&arena).unwrap(),
        src.bytes(&arena).unwrap()
    );
}

#[test]
fn test_half_bits_are_moved_verbatim() {
    let mut arena = WeightArena::new();
    // NaN payloads and signed zero would not survive a decode/encode cycle.
    let bits: [u16; 6] = [0x7E01, 0x8000, 0x3C00, 0xFC00, 0x0001, 0x7BFF];
    let bytes = bits.iter().flat_map(|b| b.to_le_bytes()).collect();
    let handle = arena.alloc_from(bytes).unwrap();
    let src = ShapedWeights::new(DataType::F16, Some(handle), Dims::new(&[3, 2]).unwrap());
    let perm = Permutation::new(&[1, 0]).unwrap();
    let mut dst = permuted_target(&mut arena, &src, &perm);

    transpose_weights(&mut arena, &src, &perm, &mut dst, &CollectingSink::new()).unwrap();

    assert_eq!(
        dst.to_u16_vec(&arena).unwrap(),
        vec![0x7E01, 0x3C00, 0x0001, 0x8000, 0xFC00, 0x7BFF]
    );
}

#[test]
fn test_rank_one_is_a_copy() {
    let mut arena = WeightArena::new();
    let src = import_f32(&mut arena, &[9., 8., 7.], &[3], "bias");
    let perm = Permutation::new(&[0]).unwrap();
    let mut dst = permuted_target(&mut arena, &src, &perm);

    transpose_weights(&mut arena, &src, &perm, &mut dst, &CollectingSink::new()).unwrap();
    assert_eq!(dst.to_f32_vec(&arena).unwrap(), vec![9., 8., 7.]);
}

#[test]
fn test_nchw_to_nhwc() {
    let mut arena = WeightArena::new();
    let (n, c, h, w) = (2usize, 3usize, 2usize, 2usize);
    let values: Vec<f32> = (0..n * c * h * w).map(|v| v as f32).collect();
    let src = import_f32(&mut arena, &values, &[2, 3, 2, 2], "x");
    let perm = Permutation::new(&[0, 2, 3, 1]).unwrap();
    let mut dst = permuted_target(&mut arena, &src, &perm);

    transpose_weights(&mut arena, &src, &perm, &mut dst, &CollectingSink::new()).unwrap();

    assert_eq!(dst.shape.as_slice(), &[2, 2, 2, 3]);
    let out = dst.to_f32_vec(&arena).unwrap();
    for ni in 0..n {
        for ci in 0..c {
            for hi in 0..h {
                for wi in 0..w {
                    let src_idx = ((ni * c + ci) * h + hi) * w + wi;
                    let dst_idx = ((ni * h + hi) * w + wi) * c + ci;
                    assert_eq!(out[dst_idx], values[src_idx]);
                }
            }
        }
    }
}

#[test]
fn test_rank_six_rejected() {
    let mut arena = WeightArena::new();
    let src = import_f32(&mut arena, &[1.0; 64], &[2, 2, 2, 2, 2, 2], "big");
    let perm = Permutation::reversed(6).unwrap();
    let mut dst = permuted_target(&mut arena, &src, &perm);
    let dst_handle = dst.values.unwrap();
    arena.bytes_mut(dst_handle).unwrap().fill(0xEE);

    let sink = CollectingSink::new();
    let err = transpose_weights(&mut arena, &src, &perm, &mut dst, &sink).unwrap_err();

    assert_eq!(err, CoreError::UnsupportedRank { rank: 6, max: 4 });
    assert!(arena.bytes(dst_handle).unwrap().iter().all(|&b| b == 0xEE));
    assert!(sink.messages(Severity::Warning).is_empty());
}

#[test]
fn test_non_transposable_types_rejected() {
    for dtype in [DataType::BF16, DataType::I8, DataType::I64, DataType::F64, DataType::Bool] {
        let mut arena = WeightArena::new();
        let bytes = dtype.size_in_bytes() * 4;
        let src = ShapedWeights::new(
            dtype,
            Some(arena.alloc(bytes).unwrap()),
            Dims::new(&[2, 2]).unwrap(),
        );
        let perm = Permutation::new(&[1, 0]).unwrap();
        let mut dst = permuted_target(&mut arena, &src, &perm);

        let err = transpose_weights(&mut arena, &src, &perm, &mut dst, &CollectingSink::new())
            .unwrap_err();
        assert_eq!(err, CoreError::UnsupportedDataType(dtype));
    }
}

#[test]
fn test_missing_source_values() {
    let mut arena = WeightArena::new();
    let src = ShapedWeights::new(DataType::F32, None, Dims::new(&[2, 2]).unwrap()).with_name("ghost");
    let perm = Permutation::new(&[1, 0]).unwrap();
    let mut dst = permuted_target(&mut arena, &src, &perm);

    let err = transpose_weights(&mut arena, &src, &perm, &mut dst, &CollectingSink::new())
        .unwrap_err();
    assert_eq!(err, CoreError::MissingValues("ghost".to_string()));
}
