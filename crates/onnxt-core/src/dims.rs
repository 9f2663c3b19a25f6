//! Fixed-capacity shape descriptor with row-major stride derivation.
//!
//! A [`Dims`] keeps its extents inline in an array of [`MAX_DIMS`] slots and
//! tracks the logical rank separately, so padding a shape to a wider rank
//! never allocates.

use crate::error::{CoreError, Result};
use crate::permutation::Permutation;
use std::fmt;

/// Physical capacity of a shape.
pub const MAX_DIMS: usize = 8;

/// Sentinel extent for a dimension whose size is unknown until runtime.
pub const DYNAMIC_DIM: i64 = -1;

/// Ordered dimension sizes of a tensor.
#[derive(Clone, Copy)]
pub struct Dims {
    extents: [i64; MAX_DIMS],
    rank: usize,
}

impl Dims {
    /// Build a shape from its extents.
    pub fn new(extents: &[i64]) -> Result<Self> {
        if extents.len() > MAX_DIMS {
            return Err(CoreError::RankOverflow {
                rank: extents.len(),
                max: MAX_DIMS,
            });
        }
        let mut dims = Self::scalar();
        dims.extents[..extents.len()].copy_from_slice(extents);
        dims.rank = extents.len();
        Ok(dims)
    }

    /// Build a shape from unsigned extents.
    pub fn from_usize(extents: &[usize]) -> Result<Self> {
        let signed: Vec<i64> = extents.iter().map(|&d| d as i64).collect();
        Self::new(&signed)
    }

    /// The rank-0 shape.
    pub const fn scalar() -> Self {
        Self {
            extents: [0; MAX_DIMS],
            rank: 0,
        }
    }

    /// Logical rank.
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Extents of the logical axes.
    pub fn as_slice(&self) -> &[i64] {
        &self.extents[..self.rank]
    }

    /// Extent of `axis`, if the axis exists.
    pub fn get(&self, axis: usize) -> Option<i64> {
        self.as_slice().get(axis).copied()
    }

    /// True when no dimension is dynamic.
    pub fn is_static(&self) -> bool {
        self.as_slice().iter().all(|&d| d >= 0)
    }

    /// Number of elements, or `None` if any dimension is dynamic or the
    /// product overflows `usize`.
    ///
    /// A rank-0 shape has volume 1.
    pub fn volume(&self) -> Option<usize> {
        self.as_slice().iter().try_fold(1usize, |acc, &d| {
            usize::try_from(d).ok().and_then(|d| acc.checked_mul(d))
        })
    }

    /// Number of elements of a static shape.
    pub fn checked_volume(&self) -> Result<usize> {
        self.to_static()?
            .into_iter()
            .try_fold(1usize, usize::checked_mul)
            .ok_or_else(|| CoreError::SizeOverflow(self.to_string()))
    }

    /// Bytes spanned by a static shape of `elem_size`-byte elements.
    pub fn byte_len(&self, elem_size: usize) -> Result<usize> {
        self.checked_volume()?
            .checked_mul(elem_size)
            .ok_or_else(|| CoreError::SizeOverflow(self.to_string()))
    }

    /// Extents as `usize`, failing on the first dynamic dimension.
    pub fn to_static(&self) -> Result<Vec<usize>> {
        self.as_slice()
            .iter()
            .enumerate()
            .map(|(axis, &d)| {
                usize::try_from(d).map_err(|_| CoreError::DynamicShape {
                    axis,
                    shape: self.to_string(),
                })
            })
            .collect()
    }

    /// Row-major element strides; the last axis has stride 1.
    pub fn strides(&self) -> Result<Vec<usize>> {
        let extents = self.to_static()?;
        let mut strides = vec![1usize; extents.len()];
        for i in (0..extents.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1]
                .checked_mul(extents[i + 1])
                .ok_or_else(|| CoreError::SizeOverflow(self.to_string()))?;
        }
        Ok(strides)
    }

    /// Left-pad with size-1 axes up to `rank`.
    ///
    /// Shapes already at or above `rank` are returned unchanged.
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
        let mut padded = Self::scalar();
        padded.rank = rank;
        padded.extents[..pad].fill(1);
        padded.extents[pad..rank].copy_from_slice(self.as_slice());
        Ok(padded)
    }

    /// Shape after reordering axes: `new[i] = self[perm[i]]`.
    pub fn permuted(&self, perm: &Permutation) -> Result<Self> {
        if perm.rank() != self.rank {
            return Err(CoreError::InvalidPermutation(format!(
                "permutation {perm} has rank {} but shape {self} has rank {}",
                perm.rank(),
                self.rank
            )));
        }
        let mut out = Self::scalar();
        out.rank = self.rank;
        for (i, &src_axis) in perm.order().iter().enumerate() {
            out.extents[i] = self.extents[src_axis];
        }
        Ok(out)
    }
}

impl Default for Dims {
    fn default() -> Self {
        Self::scalar()
    }
}

impl PartialEq for Dims {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Dims {}

impl fmt::Debug for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dims").field(&self.as_slice()).finish()
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, d) in self.as_slice().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if *d == DYNAMIC_DIM {
                f.write_str("?")?;
            } else {
                write!(f, "{d}")?;
            }
        }
        f.write_str(")")
    }
}
