//! Import-scoped state shared by every conversion step.

use crate::config::ImportConfig;
use onnxt_core::{
    check_transposable, is_transpose_required, transpose_weights, ArenaConfig, ArenaStats,
    CoreError, DataType, DiagnosticSink, Dims, Permutation, Severity, ShapedWeights, TracingSink,
    WeightArena,
};
use std::collections::HashMap;
use std::fmt;

/// A node the importer could not convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedNode {
    /// Node name
    pub node: String,
    /// ONNX operator type
    pub op_type: String,
    /// Why conversion failed
    pub reason: String,
}

/// Owner of the weight arena, the named weight table and the diagnostic
/// sink for one import pass.
pub struct ImportContext {
    arena: WeightArena,
    sink: Box<dyn DiagnosticSink>,
    config: ImportConfig,
    weights: HashMap<String, ShapedWeights>,
    order: Vec<String>,
    unsupported: Vec<UnsupportedNode>,
}

impl ImportContext {
    /// Context that reports diagnostics through `tracing`.
    pub fn new(config: ImportConfig) -> Self {
        Self::with_sink(config, Box::new(TracingSink::default()))
    }

    /// Context with a caller-provided diagnostic sink.
    pub fn with_sink(config: ImportConfig, sink: Box<dyn DiagnosticSink>) -> Self {
        let arena = WeightArena::with_config(ArenaConfig {
            max_total_bytes: config.max_arena_bytes,
        });
        Self {
            arena,
            sink,
            config,
            weights: HashMap::new(),
            order: Vec::new(),
            unsupported: Vec::new(),
        }
    }

    /// Import configuration.
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// The arena holding every buffer of this import.
    pub fn arena(&self) -> &WeightArena {
        &self.arena
    }

    /// Mutable access to the arena.
    pub fn arena_mut(&mut self) -> &mut WeightArena {
        &mut self.arena
    }

    /// Arena allocation counters.
    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    /// Send a message to the diagnostic sink.
    pub fn log(&self, severity: Severity, message: &str) {
        self.sink.log(severity, message);
    }

    /// Allocate zeroed weights of `dtype` and `shape` scoped to this import.
    pub fn create_temp_weights(
        &mut self,
        dtype: DataType,
        shape: Dims,
    ) -> onnxt_core::Result<ShapedWeights> {
        let handle = self.arena.alloc(shape.byte_len(dtype.size_in_bytes())?)?;
        Ok(ShapedWeights::new(dtype, Some(handle), shape))
    }

    /// Adopt already-decoded little-endian bytes as weights.
    pub fn import_bytes(
        &mut self,
        dtype: DataType,
        shape: Dims,
        bytes: Vec<u8>,
    ) -> onnxt_core::Result<ShapedWeights> {
        let expected = shape.byte_len(dtype.size_in_bytes())?;
        if bytes.len() != expected {
            return Err(CoreError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let handle = self.arena.alloc_from(bytes)?;
        Ok(ShapedWeights::new(dtype, Some(handle), shape))
    }

    /// Element bytes of `weights`.
    pub fn values(&self, weights: &ShapedWeights) -> onnxt_core::Result<&[u8]> {
        weights.bytes(&self.arena)
    }

    /// Reorder `weights` into a fresh buffer laid out for `perm`.
    ///
    /// The source is left as it was. When the permutation only moves unit
    /// axes the result shares the source buffer under the permuted shape and
    /// nothing is copied.
    pub fn transpose_weights(
        &mut self,
        weights: &ShapedWeights,
        perm: &Permutation,
    ) -> onnxt_core::Result<ShapedWeights> {
        let shape = weights.shape.permuted(perm)?;
        if !is_transpose_required(&weights.shape, perm) {
            let mut view = ShapedWeights::new(weights.dtype, weights.values, shape);
            if let Some(name) = weights.name() {
                view.set_name(name);
            }
            return Ok(view);
        }

        check_transposable(weights, perm)?;
        let mut result = self.create_temp_weights(weights.dtype, shape)?;
        transpose_weights(
            &mut self.arena,
            weights,
            perm,
            &mut result,
            self.sink.as_ref(),
        )?;
        Ok(result)
    }

    /// Register `weights` under `name`, replacing any previous entry.
    pub fn register_weights(&mut self, name: impl Into<String>, weights: ShapedWeights) {
        let name = name.into();
        if self.weights.insert(name.clone(), weights).is_none() {
            self.order.push(name);
        }
    }

    /// Weights registered under `name`.
    pub fn weights(&self, name: &str) -> Option<&ShapedWeights> {
        self.weights.get(name)
    }

    /// True if `name` refers to registered weights.
    pub fn has_weights(&self, name: &str) -> bool {
        self.weights.contains_key(name)
    }

    /// Drop the entry for `name`. The bytes stay in the arena.
    pub fn remove_weights(&mut self, name: &str) -> Option<ShapedWeights> {
        let removed = self.weights.remove(name);
        if removed.is_some() {
            self.order.retain(|n| n != name);
        }
        removed
    }

    /// Registered names in registration order.
    pub fn weight_names(&self) -> &[String] {
        &self.order
    }

    /// Record a node that could not be converted and report it as a warning.
    pub fn mark_unsupported(
        &mut self,
        node: impl Into<String>,
        op_type: impl Into<String>,
        reason: impl Into<String>,
    ) {
        let entry = UnsupportedNode {
            node: node.into(),
            op_type: op_type.into(),
            reason: reason.into(),
        };
        self.sink.log(
            Severity::Warning,
            &format!(
                "Node {} ({}) is not supported: {}",
                entry.node, entry.op_type, entry.reason
            ),
        );
        self.unsupported.push(entry);
    }

    /// Nodes recorded by [`mark_unsupported`](Self::mark_unsupported).
    pub fn unsupported_nodes(&self) -> &[UnsupportedNode] {
        &self.unsupported
    }
}

impl fmt::Debug for ImportContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportContext")
            .field("config", &self.config)
            .field("weights", &self.order)
            .field("arena", &self.arena.stats())
            .field("unsupported", &self.unsupported)
            .finish_non_exhaustive()
    }
}
