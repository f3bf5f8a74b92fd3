#![forbid(unsafe_code)]

//! Image supply: a fixed pool partitioned across stacks.
//!
//! Stack `i` owns the contiguous slice
//! `[i * per_stack, (i + 1) * per_stack)` of the pool, where
//! `per_stack = pool_len / stack_count`, and cycles through it
//! independently of every other stack.
//!
//! # Failure Modes
//!
//! - Empty pool: rejected at construction with [`SupplyError::EmptyPool`].
//! - Pool smaller than the stack count: `per_stack` is zero and every stack
//!   keeps drawing the first image of the pool. This degenerate layout is
//!   accepted as-is rather than corrected.
//! - Stack index out of range: the index wraps onto the pool like any
//!   other, so drawing never fails.

use std::fmt;
use std::sync::Arc;

/// Shared, cheaply clonable reference to one image (a path or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageRef(Arc<str>);

impl ImageRef {
    #[must_use]
    pub fn new(src: impl AsRef<str>) -> Self {
        Self(Arc::from(src.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(src: &str) -> Self {
        Self::new(src)
    }
}

impl From<String> for ImageRef {
    fn from(src: String) -> Self {
        Self(Arc::from(src))
    }
}

/// Error building an [`ImageSupply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupplyError {
    /// The pool holds no images at all.
    EmptyPool,
}

impl fmt::Display for SupplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPool => write!(f, "image pool is empty"),
        }
    }
}

impl std::error::Error for SupplyError {}

/// Round-robin image source with one cursor per stack.
#[derive(Debug, Clone)]
pub struct ImageSupply {
    pool: Vec<ImageRef>,
    per_stack: usize,
    cursors: Vec<usize>,
}

impl ImageSupply {
    /// Partition `pool` across `stack_count` stacks.
    pub fn new(pool: Vec<ImageRef>, stack_count: usize) -> Result<Self, SupplyError> {
        if pool.is_empty() {
            return Err(SupplyError::EmptyPool);
        }
        let per_stack = if stack_count == 0 {
            0
        } else {
            pool.len() / stack_count
        };
        Ok(Self {
            pool,
            per_stack,
            cursors: vec![0; stack_count],
        })
    }

    /// Next image for `stack_index`, advancing that stack's cursor.
    pub fn next_image(&mut self, stack_index: usize) -> ImageRef {
        if stack_index >= self.cursors.len() {
            self.cursors.resize(stack_index + 1, 0);
        }
        let local = self.cursors[stack_index];
        let base = stack_index * self.per_stack;
        let actual = (base + local) % self.pool.len();
        self.cursors[stack_index] = if self.per_stack == 0 {
            0
        } else {
            (local + 1) % self.per_stack
        };
        self.pool[actual].clone()
    }

    /// Images in each stack's slice.
    #[must_use]
    pub fn per_stack(&self) -> usize {
        self.per_stack
    }

    /// Total pool size.
    #[must_use]
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }
}
