//! Import-scoped arena for weight buffers.
//!
//! Every buffer created while importing a model lives here until the import
//! finishes. Weights refer to their bytes through a [`BufferHandle`] instead
//! of holding the memory themselves, so many weight views can share a buffer
//! and none of them has to track ownership.
//!
//! # Example
//!
//! ```
//! use onnxt_core::arena::WeightArena;
//!
//! let mut arena = WeightArena::new();
//! let handle = arena.alloc(16)?;
//! arena.bytes_mut(handle)?[0] = 7;
//! assert_eq!(arena.bytes(handle)?[0], 7);
//! assert_eq!(arena.stats().live_bytes, 16);
//! # Ok::<(), onnxt_core::CoreError>(())
//! ```

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Index of a buffer inside a [`WeightArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(usize);

impl BufferHandle {
    /// Position of the buffer in its arena.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Configuration for a weight arena.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Upper bound on the bytes held at once; unbounded when `None`
    pub max_total_bytes: Option<usize>,
}

/// Allocation counters for an arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Buffers handed out since the last reset
    pub allocations: usize,
    /// Bytes currently held
    pub live_bytes: usize,
    /// Largest `live_bytes` observed
    pub peak_bytes: usize,
}

/// Owner of all buffers allocated during one import pass.
#[derive(Debug, Default)]
pub struct WeightArena {
    buffers: Vec<Vec<u8>>,
    stats: ArenaStats,
    config: ArenaConfig,
}

impl WeightArena {
    /// Create an unbounded arena.
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Create an arena with a custom configuration.
    pub fn with_config(config: ArenaConfig) -> Self {
        Self {
            buffers: Vec::new(),
            stats: ArenaStats::default(),
            config,
        }
    }

    /// Allocate a zero-filled buffer of `len` bytes.
    pub fn alloc(&mut self, len: usize) -> Result<BufferHandle> {
        self.alloc_from(vec![0u8; len])
    }

    /// Adopt an existing byte vector into the arena.
    pub fn alloc_from(&mut self, bytes: Vec<u8>) -> Result<BufferHandle> {
        let len = bytes.len();
        if let Some(max) = self.config.max_total_bytes {
            let available = max.saturating_sub(self.stats.live_bytes);
            if len > available {
                return Err(CoreError::ArenaExhausted {
                    requested: len,
                    available,
                });
            }
        }

        let handle = BufferHandle(self.buffers.len());
        self.buffers.push(bytes);
        self.stats.allocations += 1;
        self.stats.live_bytes += len;
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.stats.live_bytes);
        trace!(handle = handle.0, bytes = len, "arena allocation");
        Ok(handle)
    }

    /// Read access to a buffer.
    pub fn bytes(&self, handle: BufferHandle) -> Result<&[u8]> {
        self.buffers
            .get(handle.0)
            .map(Vec::as_slice)
            .ok_or(CoreError::InvalidHandle(handle.0))
    }

    /// Write access to a buffer.
    pub fn bytes_mut(&mut self, handle: BufferHandle) -> Result<&mut [u8]> {
        self.buffers
            .get_mut(handle.0)
            .map(Vec::as_mut_slice)
            .ok_or(CoreError::InvalidHandle(handle.0))
    }

    /// Borrow `src` for reading and `dst` for writing at the same time.
    ///
    /// The two handles must name different buffers.
    pub fn split(&mut self, src: BufferHandle, dst: BufferHandle) -> Result<(&[u8], &mut [u8])> {
        let len = self.buffers.len();
        for handle in [src, dst] {
            if handle.0 >= len {
                return Err(CoreError::InvalidHandle(handle.0));
            }
        }
        if src == dst {
            return Err(CoreError::InvalidHandle(dst.0));
        }

        if src.0 < dst.0 {
            let (head, tail) = self.buffers.split_at_mut(dst.0);
            Ok((head[src.0].as_slice(), tail[0].as_mut_slice()))
        } else {
            let (head, tail) = self.buffers.split_at_mut(src.0);
            Ok((tail[0].as_slice(), head[dst.0].as_mut_slice()))
        }
    }

    /// Number of buffers held.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// True if nothing has been allocated since the last reset.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    /// Release every buffer. Handles issued before the reset become invalid.
    pub fn reset(&mut self) {
        self.buffers.clear();
        self.stats = ArenaStats::default();
    }
}
