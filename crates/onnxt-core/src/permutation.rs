//! Axis permutations.

use crate::dims::{Dims, MAX_DIMS};
use crate::error::{CoreError, Result};
use std::fmt;

/// A bijective reordering of tensor axes.
///
/// Destination axis `i` takes its extent from source axis `order[i]`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Permutation {
    order: [usize; MAX_DIMS],
    rank: usize,
}

impl Permutation {
    /// Build a permutation, checking that every index in `[0, order.len())`
    /// appears exactly once.
    pub fn new(order: &[usize]) -> Result<Self> {
        if order.len() > MAX_DIMS {
            return Err(CoreError::RankOverflow {
                rank: order.len(),
                max: MAX_DIMS,
            });
        }
        let mut seen = [false; MAX_DIMS];
        for &axis in order {
            if axis >= order.len() || seen[axis] {
                return Err(CoreError::InvalidPermutation(format!(
                    "{order:?} is not a permutation of 0..{}",
                    order.len()
                )));
            }
            seen[axis] = true;
        }
        let mut perm = Self::identity_unchecked(order.len());
        perm.order[..order.len()].copy_from_slice(order);
        Ok(perm)
    }

    /// Build a permutation from signed axes, as stored in ONNX attributes.
    pub fn from_i64(order: &[i64]) -> Result<Self> {
        let axes = order
            .iter()
            .map(|&axis| {
                usize::try_from(axis).map_err(|_| {
                    CoreError::InvalidPermutation(format!("negative axis {axis} in {order:?}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(&axes)
    }

    /// The permutation that leaves every axis in place.
    pub fn identity(rank: usize) -> Result<Self> {
        if rank > MAX_DIMS {
            return Err(CoreError::RankOverflow {
                rank,
                max: MAX_DIMS,
            });
        }
        Ok(Self::identity_unchecked(rank))
    }

    /// The permutation that reverses all axes.
    pub fn reversed(rank: usize) -> Result<Self> {
        let mut perm = Self::identity(rank)?;
        perm.order[..rank].reverse();
        Ok(perm)
    }

    fn identity_unchecked(rank: usize) -> Self {
        let mut order = [0usize; MAX_DIMS];
        for (i, slot) in order.iter_mut().enumerate() {
            *slot = i;
        }
        Self { order, rank }
    }

    /// Number of axes.
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Source axis for each destination axis.
    pub fn order(&self) -> &[usize] {
        &self.order[..self.rank]
    }

    /// True when every axis maps to itself.
    pub fn is_identity(&self) -> bool {
        self.order().iter().enumerate().all(|(i, &axis)| i == axis)
    }

    /// The permutation that undoes this one.
    pub fn inverse(&self) -> Self {
        let mut inv = Self::identity_unchecked(self.rank);
        for (i, &axis) in self.order().iter().enumerate() {
            inv.order[axis] = i;
        }
        inv
    }

    /// Prepend identity axes up to `rank`, shifting every existing index by
    /// the pad width so the original axis 0 becomes padded axis `pad`.
    pub fn padded_to(&self, rank: usize) -> Result<Self> {
        if rank > MAX_DIMS {
            return Err(CoreError::RankOverflow {
                rank,
                max: MAX_DIMS,
            });
        }
        if self.rank >= rank {
            return Ok(*self);
        }
        let pad = rank - self.rank;
        let mut padded = Self::identity_unchecked(rank);
        for (i, &axis) in self.order().iter().enumerate() {
            padded.order[pad + i] = axis + pad;
        }
        Ok(padded)
    }

    /// Map a source coordinate to its destination coordinate.
    pub fn apply<T: Copy>(&self, coord: &[T]) -> Vec<T> {
        self.order().iter().map(|&axis| coord[axis]).collect()
    }
}

impl fmt::Debug for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Permutation").field(&self.order()).finish()
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, axis) in self.order().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{axis}")?;
        }
        f.write_str(")")
    }
}

/// Whether applying `perm` to a tensor of shape `dims` changes the physical
/// element order.
///
/// Moving only size-1 axes keeps the flat layout intact, so such a
/// transpose can be expressed as a reshape. Dynamic extents are treated as
/// significant.
pub fn is_transpose_required(dims: &Dims, perm: &Permutation) -> bool {
    let mut prev_significant = 0usize;
    for &src_axis in perm.order() {
        let extent = dims.get(src_axis).unwrap_or(1);
        if extent == 1 {
            continue;
        }
        if extent < 0 || src_axis < prev_significant {
            return true;
        }
        prev_significant = src_axis;
    }
    false
}
