//! Identifier newtypes.
//!
//! Functions and abstractions are addressed by ids that carry the
//! [`ModuleId`] of the module that allocated them, so passing an id to the
//! wrong module is detected instead of silently aliasing another entity.
//! Blocks are addressed by [`BlockId`] relative to one abstraction's CFG.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_MODULE: AtomicU32 = AtomicU32::new(0);

/// Identity of one [`Module`](crate::Module).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Allocate an id distinct from every other module in this process.
    pub(crate) fn fresh() -> Self {
        Self(NEXT_MODULE.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A function within a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionId {
    module: ModuleId,
    index: u32,
}

impl FunctionId {
    #[inline]
    pub(crate) fn new(module: ModuleId, index: u32) -> Self {
        Self { module, index }
    }

    /// The module that owns this function.
    #[inline]
    pub fn module(self) -> ModuleId {
        self.module
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// One version (abstraction) of a function within a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbstractionId {
    module: ModuleId,
    index: u32,
}

impl AbstractionId {
    #[inline]
    pub(crate) fn new(module: ModuleId, index: u32) -> Self {
        Self { module, index }
    }

    /// The module that owns this abstraction.
    #[inline]
    pub fn module(self) -> ModuleId {
        self.module
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Basic block ID within one abstraction's CFG.
///
/// IDs are allocated sequentially and never reused after removal, so a
/// stale id cannot resolve to an unrelated block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a new block ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}.{}", self.module.0, self.index)
    }
}

impl fmt::Display for AbstractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "abs#{}.{}", self.module.0, self.index)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^{}", self.0)
    }
}
