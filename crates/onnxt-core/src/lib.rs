//! onnxt core primitives
//!
//! Building blocks for importing neural-network weights and adapting their
//! memory layout to a compute engine:
//!
//! - **Dims / Permutation**: fixed-capacity shape and axis-order descriptors
//! - **Arena**: import-scoped owner of every weight buffer
//! - **Weights**: typed, named views into arena buffers
//! - **Transpose**: the element gather that reorders a weight buffer
//! - **Diagnostics**: severity-tagged sinks for user-facing messages
//!
//! ## Example
//!
//! ```rust
//! use onnxt_core::{
//!     transpose_weights, CollectingSink, DataType, Dims, Permutation, ShapedWeights, WeightArena,
//! };
//!
//! let mut arena = WeightArena::new();
//! let bytes: Vec<u8> = [0f32, 1., 2., 3., 4., 5.]
//!     .iter()
//!     .flat_map(|v| v.to_le_bytes())
//!     .collect();
//! let src = ShapedWeights::new(DataType::F32, Some(arena.alloc_from(bytes)?), Dims::new(&[2, 3])?);
//!
//! let perm = Permutation::new(&[1, 0])?;
//! let dst_shape = src.shape.permuted(&perm)?;
//! let mut dst = ShapedWeights::new(DataType::F32, Some(arena.alloc(src.size_bytes())?), dst_shape);
//!
//! transpose_weights(&mut arena, &src, &perm, &mut dst, &CollectingSink::new())?;
//! assert_eq!(dst.to_f32_vec(&arena)?, vec![0., 3., 1., 4., 2., 5.]);
//! # Ok::<(), onnxt_core::CoreError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod arena;
pub mod diagnostics;
pub mod dims;
/// Error types for core operations
pub mod error;
pub mod logging;
pub mod permutation;
pub mod transpose;
pub mod types;
pub mod weights;

pub use arena::{ArenaConfig, ArenaStats, BufferHandle, WeightArena};
pub use diagnostics::{CollectingSink, DiagnosticSink, Severity, TracingSink};
pub use dims::{Dims, DYNAMIC_DIM, MAX_DIMS};
pub use error::{CoreError, Result};
pub use permutation::{is_transpose_required, Permutation};
pub use transpose::{
    check_transposable, permute_elements, transpose_weights, MAX_TRANSPOSE_RANK,
};
pub use types::DataType;
pub use weights::ShapedWeights;
