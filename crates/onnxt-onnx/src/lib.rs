//! ONNX model import for onnxt
//!
//! Decodes ONNX models with `prost`, imports every initializer into a
//! [`WeightArena`](onnxt_core::WeightArena) and folds `Transpose` nodes that
//! act on constant weights into pre-transposed initializers.
//!
//! ## Example
//!
//! ```no_run
//! use onnxt_onnx::{ImportConfig, Importer};
//!
//! let model = Importer::new(ImportConfig::default()).import_file("model.onnx")?;
//! println!("{}", model.info());
//! for fold in model.folded_nodes() {
//!     println!("folded {} with perm {}", fold.name, fold.perm);
//! }
//! # Ok::<(), onnxt_onnx::OnnxError>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod summary;
pub mod types;
pub mod weights;

/// Generated ONNX protobuf types
#[allow(missing_docs, clippy::all, clippy::pedantic)]
pub mod generated {
    include!(concat!(env!("OUT_DIR"), "/onnx.rs"));
}

pub use generated as onnx_proto;

pub use config::{ImportConfig, MIN_IR_VERSION};
pub use context::{ImportContext, UnsupportedNode};
pub use error::{OnnxError, Result};
pub use loader::{
    FoldedNode, Importer, LoadedModel, ModelLoader, NodeAttribute, NodeInfo, TensorInfo,
    IR_VERSION,
};
pub use summary::{layer_listing, ModelInfo};
pub use types::{dims_from_shape_proto, ir_version_string, shape_proto_from_dims, DataTypeMapper};
pub use weights::{convert_onnx_weights, weights_to_tensor_proto};
