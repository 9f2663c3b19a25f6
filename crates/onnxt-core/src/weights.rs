//! Shaped, typed views over arena buffers.

use crate::arena::{BufferHandle, WeightArena};
use crate::dims::Dims;
use crate::error::{CoreError, Result};
use crate::types::DataType;

/// A named block of weights: datatype, shape and a handle to its bytes.
///
/// The bytes live in a [`WeightArena`]; a `ShapedWeights` never owns them.
/// Cloning a view is cheap and both clones refer to the same buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedWeights {
    /// Element datatype.
    pub dtype: DataType,
    /// Backing buffer, absent for empty weights.
    pub values: Option<BufferHandle>,
    /// Tensor extents.
    pub shape: Dims,
    name: Option<String>,
}

impl ShapedWeights {
    /// Create a view over `values` with the given shape.
    pub fn new(dtype: DataType, values: Option<BufferHandle>, shape: Dims) -> Self {
        Self {
            dtype,
            values,
            shape,
            name: None,
        }
    }

    /// Weights with no backing buffer and rank 0.
    pub fn empty(dtype: DataType) -> Self {
        Self::new(dtype, None, Dims::scalar())
    }

    /// Number of elements.
    ///
    /// Absent values with a rank-0 shape count as 0. A present rank-0 buffer
    /// is a scalar and counts as 1. Dynamic or unaddressable extents count
    /// as 0.
    pub fn count(&self) -> usize {
        if self.values.is_none() && self.shape.rank() == 0 {
            return 0;
        }
        self.shape.volume().unwrap_or(0)
    }

    /// Bytes spanned by the elements.
    pub fn size_bytes(&self) -> usize {
        self.count().saturating_mul(self.dtype.size_in_bytes())
    }

    /// True when a backing buffer is attached.
    pub fn is_present(&self) -> bool {
        self.values.is_some()
    }

    /// Diagnostic name, if one was set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the diagnostic name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Remove the diagnostic name.
    pub fn clear_name(&mut self) {
        self.name = None;
    }

    /// Builder form of [`set_name`](Self::set_name).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    /// Name for messages, falling back to a placeholder.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or("<unnamed>")
    }

    /// The element bytes, checked against [`size_bytes`](Self::size_bytes).
    pub fn bytes<'a>(&self, arena: &'a WeightArena) -> Result<&'a [u8]> {
        let handle = self
            .values
            .ok_or_else(|| CoreError::MissingValues(self.display_name().to_string()))?;
        let bytes = arena.bytes(handle)?;
        let expected = self.size_bytes();
        if bytes.len() < expected {
            return Err(CoreError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(&bytes[..expected])
    }

    /// Decode the elements as `f32`.
    ///
    /// `F16` and `BF16` are widened; other types are rejected.
    pub fn to_f32_vec(&self, arena: &WeightArena) -> Result<Vec<f32>> {
        let bytes = self.bytes(arena)?;
        let values = match self.dtype {
            DataType::F32 => bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            DataType::F16 => bytes
                .chunks_exact(2)
                .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
            DataType::BF16 => bytes
                .chunks_exact(2)
                .map(|c| half::bf16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
            other => return Err(CoreError::UnsupportedDataType(other)),
        };
        Ok(values)
    }

    /// Raw 16-bit patterns of a 2-byte datatype.
    pub fn to_u16_vec(&self, arena: &WeightArena) -> Result<Vec<u16>> {
        if self.dtype.size_in_bytes() != 2 {
            return Err(CoreError::UnsupportedDataType(self.dtype));
        }
        Ok(self
            .bytes(arena)?
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Decode `I32`/`I64` elements as `i64`.
    pub fn to_i64_vec(&self, arena: &WeightArena) -> Result<Vec<i64>> {
        let bytes = self.bytes(arena)?;
        match self.dtype {
            DataType::I32 => Ok(bytes
                .chunks_exact(4)
                .map(|c| i64::from(i32::from_le_bytes([c[0], c[1], c[2], c[3]])))
                .collect()),
            DataType::I64 => Ok(bytes
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect()),
            other => Err(CoreError::UnsupportedDataType(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_absent_vs_scalar() {
        let mut arena = WeightArena::new();
        let absent = ShapedWeights::empty(DataType::F32);
        assert_eq!(absent.count(), 0);
        assert_eq!(absent.size_bytes(), 0);
        assert!(!absent.is_present());

        let handle = arena.alloc(4).unwrap();
        let scalar = ShapedWeights::new(DataType::F32, Some(handle), Dims::scalar());
        assert_eq!(scalar.count(), 1);
        assert_eq!(scalar.size_bytes(), 4);
        assert!(scalar.is_present());
    }

    #[test]
    fn test_count_product() {
        let w = ShapedWeights::new(DataType::F16, None, Dims::new(&[2, 3, 4]).unwrap());
        assert_eq!(w.count(), 24);
        assert_eq!(w.size_bytes(), 48);
    }

    #[test]
    fn test_name_is_independent_of_bytes() {
        let mut arena = WeightArena::new();
        let handle = arena.alloc_from(vec![0, 0, 128, 63]).unwrap();
        let mut w = ShapedWeights::new(DataType::F32, Some(handle), Dims::new(&[1]).unwrap());
        assert_eq!(w.name(), None);
        assert_eq!(w.display_name(), "<unnamed>");
        w.set_name("conv1.weight");
        assert_eq!(w.name(), Some("conv1.weight"));
        assert_eq!(w.to_f32_vec(&arena).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_bytes_requires_values() {
        let arena = WeightArena::new();
        let w = ShapedWeights::empty(DataType::F32).with_name("missing");
        assert_eq!(
            w.bytes(&arena),
            Err(CoreError::MissingValues("missing".to_string()))
        );
    }

    #[test]
    fn test_bytes_size_mismatch() {
        let mut arena = WeightArena::new();
        let handle = arena.alloc(4).unwrap();
        let w = ShapedWeights::new(DataType::F32, Some(handle), Dims::new(&[2]).unwrap());
        assert_eq!(
            w.bytes(&arena),
            Err(CoreError::SizeMismatch {
                expected: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_decode_half() {
        let mut arena = WeightArena::new();
        let bits = half::f16::from_f32(1.5).to_bits();
        let handle = arena.alloc_from(bits.to_le_bytes().to_vec()).unwrap();
        let w = ShapedWeights::new(DataType::F16, Some(handle), Dims::new(&[1]).unwrap());
        assert_eq!(w.to_u16_vec(&arena).unwrap(), vec![bits]);
        assert_eq!(w.to_f32_vec(&arena).unwrap(), vec![1.5]);
    }
}
