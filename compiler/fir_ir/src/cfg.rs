//! Control-flow graph of one abstraction.
//!
//! Blocks live in a slot vector indexed by [`BlockId`]. Removed blocks
//! leave a `None` slot so ids are never reused. Successor edges are read
//! off each block's [`Jump`]; predecessor edges are derived by scanning,
//! so the two views can never disagree.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::traverse::{Blocks, Direction};
use crate::{BasicBlock, BlockId, IrError, Jump, Target};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cfg {
    blocks: Vec<Option<BasicBlock>>,
    entry: BlockId,
}

impl Cfg {
    /// A CFG with one parameterless entry block that ends in `unreachable`.
    pub(crate) fn single_entry(label: &str) -> Self {
        Self {
            blocks: vec![Some(BasicBlock::new(
                label.to_owned(),
                Vec::new(),
                Vec::new(),
                Jump::Unreachable,
            ))],
            entry: BlockId::new(0),
        }
    }

    /// Assemble from already-validated slots.
    pub(crate) fn from_slots(blocks: Vec<Option<BasicBlock>>, entry: BlockId) -> Self {
        Self { blocks, entry }
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index()).and_then(Option::as_ref)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.block(id).is_some()
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live blocks in id order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|b| (block_id(i), b)))
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks().map(|(id, _)| id)
    }

    pub fn block_by_label(&self, label: &str) -> Option<BlockId> {
        self.blocks()
            .find(|(_, b)| b.label() == label)
            .map(|(id, _)| id)
    }

    /// Successors of `id` in target order, without duplicates.
    pub fn successors(&self, id: BlockId) -> SmallVec<[BlockId; 2]> {
        let mut out: SmallVec<[BlockId; 2]> = SmallVec::new();
        if let Some(block) = self.block(id) {
            for succ in block.jump().successors() {
                if !out.contains(&succ) {
                    out.push(succ);
                }
            }
        }
        out
    }

    /// Predecessors of `id` in id order, without duplicates.
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks()
            .filter(|(_, b)| b.jump().successors().contains(&id))
            .map(|(pred, _)| pred)
            .collect()
    }

    /// Blocks whose jump leaves the CFG.
    pub fn exits(&self) -> Vec<BlockId> {
        self.blocks()
            .filter(|(_, b)| b.jump().is_exit())
            .map(|(id, _)| id)
            .collect()
    }

    /// Depth-first preorder over successors, starting at the entry.
    pub fn depth_first(&self) -> Blocks<'_> {
        Blocks::new(self, Direction::Forward, [self.entry])
    }

    /// Depth-first preorder over predecessors, seeded with every exit.
    pub fn reverse_depth_first(&self) -> Blocks<'_> {
        Blocks::new(self, Direction::Backward, self.exits())
    }

    /// Depth-first preorder over predecessors, starting at `block`.
    pub fn reverse_depth_first_from(&self, block: BlockId) -> Blocks<'_> {
        Blocks::new(self, Direction::Backward, [block])
    }

    pub fn reachable(&self) -> FxHashSet<BlockId> {
        self.depth_first().collect()
    }

    /// A label not used by any block: `base` itself, or `base_1`, `base_2`, ...
    pub fn fresh_label(&self, base: &str) -> String {
        let taken: FxHashSet<&str> = self.blocks().map(|(_, b)| b.label()).collect();
        if !taken.contains(base) {
            return base.to_owned();
        }
        (1..)
            .map(|k| format!("{base}_{k}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| base.to_owned())
    }

    // ── Validation helpers ──────────────────────────────────────────

    pub(crate) fn require(&self, id: BlockId) -> Result<&BasicBlock, IrError> {
        self.block(id).ok_or(IrError::UnknownBlock(id))
    }

    /// Check that `target` names a live block with matching phi arity.
    pub(crate) fn check_target(&self, target: &Target) -> Result<(), IrError> {
        let dest = self.require(target.block)?;
        if dest.params().len() == target.phi_args.len() {
            Ok(())
        } else {
            Err(IrError::PhiArity {
                block: target.block,
                expected: dest.params().len(),
                found: target.phi_args.len(),
            })
        }
    }

    pub(crate) fn check_jump(&self, jump: &Jump) -> Result<(), IrError> {
        jump.targets()
            .into_iter()
            .try_for_each(|target| self.check_target(target))
    }

    // ── Crate-internal mutation ─────────────────────────────────────

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub(crate) fn push_block(&mut self, block: BasicBlock) -> BlockId {
        let id = block_id(self.blocks.len());
        self.blocks.push(Some(block));
        id
    }

    pub(crate) fn take_block(&mut self, id: BlockId) -> Option<BasicBlock> {
        self.blocks.get_mut(id.index()).and_then(Option::take)
    }

    /// Remove every block no longer reachable from the entry; returns the
    /// removed ids in ascending order.
    pub(crate) fn remove_unreachable(&mut self) -> Vec<BlockId> {
        let reachable = self.reachable();
        let dead: Vec<BlockId> = self
            .block_ids()
            .filter(|id| !reachable.contains(id))
            .collect();
        for &id in &dead {
            self.take_block(id);
        }
        dead
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "block counts never approach u32::MAX"
)]
fn block_id(index: usize) -> BlockId {
    BlockId::new(index as u32)
}
