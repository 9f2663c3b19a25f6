//! Error types for core weight operations.

use crate::types::DataType;
use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by shape, arena and transposition primitives.
///
/// Every variant is a deterministic, input-dependent failure. Callers are
/// expected to report the affected node and carry on with the import.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A shape or permutation exceeded the fixed dimension capacity.
    #[error("rank {rank} exceeds the maximum supported rank {max}")]
    RankOverflow {
        /// Requested rank.
        rank: usize,
        /// Physical capacity.
        max: usize,
    },

    /// The permutation is not a bijection on `[0, rank)` or its rank is wrong.
    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),

    /// The transposition gather does not handle tensors of this rank.
    #[error("unsupported rank {rank} for weight transpose (max {max})")]
    UnsupportedRank {
        /// Rank of the source weights.
        rank: usize,
        /// Highest rank the gather handles.
        max: usize,
    },

    /// The element type has no copy rule for transposition.
    #[error("unsupported weight type for transpose: {0}")]
    UnsupportedDataType(DataType),

    /// Source and destination weights disagree on their element type.
    #[error("datatype mismatch: expected {expected}, got {actual}")]
    DataTypeMismatch {
        /// Datatype of the source weights.
        expected: DataType,
        /// Datatype of the destination weights.
        actual: DataType,
    },

    /// Two shapes that must agree do not.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Shape required by the operation.
        expected: String,
        /// Shape that was supplied.
        actual: String,
    },

    /// A dimension is dynamic where a static extent is required.
    #[error("dimension {axis} of shape {shape} is dynamic")]
    DynamicShape {
        /// Offending axis.
        axis: usize,
        /// Full shape, formatted.
        shape: String,
    },

    /// The element count or byte length of a shape does not fit in `usize`.
    #[error("shape {0} is too large to address")]
    SizeOverflow(String),

    /// The weights carry no backing buffer.
    #[error("weights '{0}' have no values")]
    MissingValues(String),

    /// A buffer's byte length does not match its shape and datatype.
    #[error("buffer holds {actual} bytes but {expected} are required")]
    SizeMismatch {
        /// Bytes implied by shape and datatype.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// A buffer handle does not belong to this arena.
    #[error("invalid buffer handle {0}")]
    InvalidHandle(usize),

    /// The arena byte budget would be exceeded.
    #[error("arena exhausted: requested {requested} bytes with {available} available")]
    ArenaExhausted {
        /// Bytes requested by the allocation.
        requested: usize,
        /// Bytes left under the configured budget.
        available: usize,
    },
}
