//! CFG traversal.
//!
//! Two orders are offered: depth-first over successors and reverse
//! depth-first over predecessors. Both share one lazy walker: the
//! neighbours of the block just yielded are enqueued only when the walker
//! is advanced again, and only if that block still exists. That makes it
//! coherent to edit the CFG between two steps, as long as the edit touches
//! already-visited or not-yet-enqueued blocks.
//!
//! [`Blocks`] is the read-only iterator form. [`Cursor`] drives the same
//! walker against a [`Module`] and supports removing the block it has
//! just yielded; the removal is deferred to the next advance.

use rustc_hash::FxHashSet;

use crate::{AbstractionId, BlockId, Cfg, IrError, Module, MutationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Follow successor edges.
    Forward,
    /// Follow predecessor edges.
    Backward,
}

/// Lazy depth-first walker state, independent of how the CFG is borrowed.
#[derive(Clone, Debug)]
struct Walk {
    direction: Direction,
    stack: Vec<BlockId>,
    visited: FxHashSet<BlockId>,
    current: Option<BlockId>,
}

impl Walk {
    fn new(direction: Direction, seeds: impl IntoIterator<Item = BlockId>) -> Self {
        let mut stack: Vec<BlockId> = seeds.into_iter().collect();
        stack.reverse();
        Self {
            direction,
            stack,
            visited: FxHashSet::default(),
            current: None,
        }
    }

    fn advance(&mut self, cfg: &Cfg) -> Option<BlockId> {
        if let Some(current) = self.current.take() {
            if cfg.contains(current) {
                let neighbours: Vec<BlockId> = match self.direction {
                    Direction::Forward => cfg.successors(current).into_vec(),
                    Direction::Backward => cfg.predecessors(current),
                };
                self.stack.extend(neighbours.into_iter().rev());
            }
        }
        while let Some(next) = self.stack.pop() {
            if cfg.contains(next) && self.visited.insert(next) {
                self.current = Some(next);
                return Some(next);
            }
        }
        None
    }
}

// ── Read-only iteration ─────────────────────────────────────────────

/// Read-only depth-first iterator over block ids.
pub struct Blocks<'a> {
    cfg: &'a Cfg,
    walk: Walk,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(
        cfg: &'a Cfg,
        direction: Direction,
        seeds: impl IntoIterator<Item = BlockId>,
    ) -> Self {
        Self {
            cfg,
            walk: Walk::new(direction, seeds),
        }
    }
}

impl Iterator for Blocks<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        self.walk.advance(self.cfg)
    }
}

// ── Mutation-aware cursor ───────────────────────────────────────────

/// Depth-first cursor over one abstraction that tolerates edits between
/// steps.
///
/// ```text
/// let mut cursor = Cursor::depth_first(&module, version)?;
/// while let Some(block) = cursor.advance(&mut module)? {
///     if is_dead(&module, block) {
///         cursor.remove_current();
///     }
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Cursor {
    version: AbstractionId,
    walk: Walk,
    remove_pending: bool,
}

impl Cursor {
    /// Successor order from the entry block.
    pub fn depth_first(module: &Module, version: AbstractionId) -> Result<Self, IrError> {
        let entry = module.require_abstraction(version)?.cfg().entry();
        Ok(Self::new(version, Direction::Forward, [entry]))
    }

    /// Predecessor order, seeded with every exit block.
    pub fn reverse_depth_first(module: &Module, version: AbstractionId) -> Result<Self, IrError> {
        let exits = module.require_abstraction(version)?.cfg().exits();
        Ok(Self::new(version, Direction::Backward, exits))
    }

    /// Predecessor order, starting at `block`.
    pub fn reverse_depth_first_from(
        module: &Module,
        version: AbstractionId,
        block: BlockId,
    ) -> Result<Self, IrError> {
        module.require_abstraction(version)?.cfg().require(block)?;
        Ok(Self::new(version, Direction::Backward, [block]))
    }

    fn new(
        version: AbstractionId,
        direction: Direction,
        seeds: impl IntoIterator<Item = BlockId>,
    ) -> Self {
        Self {
            version,
            walk: Walk::new(direction, seeds),
            remove_pending: false,
        }
    }

    /// The block most recently yielded, if any.
    pub fn current(&self) -> Option<BlockId> {
        self.walk.current
    }

    /// Schedule the current block for removal on the next advance.
    pub fn remove_current(&mut self) {
        if self.walk.current.is_some() {
            self.remove_pending = true;
        }
    }

    /// Apply any pending removal, then yield the next unvisited block.
    ///
    /// A pending removal goes through [`Module::remove_block`], so it is
    /// recorded and observed like any other mutation.
    pub fn advance(&mut self, module: &mut Module) -> Result<Option<BlockId>, MutationError> {
        if std::mem::take(&mut self.remove_pending) {
            if let Some(current) = self.walk.current {
                module.remove_block(self.version, current)?;
            }
        }
        let Some(abstraction) = module.abstraction(self.version) else {
            return Ok(None);
        };
        Ok(self.walk.advance(abstraction.cfg()))
    }
}
