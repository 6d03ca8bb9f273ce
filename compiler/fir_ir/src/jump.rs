//! Block terminators.

use fir_types::Effects;
use smallvec::{smallvec, SmallVec};

use crate::{BlockId, Expression, Instruction};

/// A control transfer to `block`, supplying one argument per block
/// parameter (phi) of the destination.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Target {
    pub block: BlockId,
    pub phi_args: Vec<Expression>,
}

impl Target {
    pub fn new(block: BlockId, phi_args: Vec<Expression>) -> Self {
        Self { block, phi_args }
    }

    /// A target whose destination has no parameters.
    pub fn plain(block: BlockId) -> Self {
        Self {
            block,
            phi_args: Vec::new(),
        }
    }
}

/// Block terminator: how control leaves a basic block.
///
/// Every block ends with exactly one jump. Successors are derived from
/// the jump's targets and never stored elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Jump {
    /// Unconditional transfer.
    Goto(Target),
    /// Two-way conditional transfer.
    Branch {
        cond: Expression,
        if_true: Target,
        if_false: Target,
    },
    /// Leave the abstraction with a value.
    Return(Expression),
    /// Control never reaches the end of this block.
    Unreachable,
}

impl Jump {
    /// Successor targets, in order.
    pub fn targets(&self) -> SmallVec<[&Target; 2]> {
        match self {
            Jump::Goto(target) => smallvec![target],
            Jump::Branch {
                if_true, if_false, ..
            } => smallvec![if_true, if_false],
            Jump::Return(_) | Jump::Unreachable => SmallVec::new(),
        }
    }

    pub fn targets_mut(&mut self) -> SmallVec<[&mut Target; 2]> {
        match self {
            Jump::Goto(target) => smallvec![target],
            Jump::Branch {
                if_true, if_false, ..
            } => smallvec![if_true, if_false],
            Jump::Return(_) | Jump::Unreachable => SmallVec::new(),
        }
    }

    /// Successor block ids, in target order (duplicates possible for a
    /// branch whose arms share a destination).
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        self.targets().into_iter().map(|t| t.block).collect()
    }

    /// Returns `true` for jumps that leave the CFG.
    pub fn is_exit(&self) -> bool {
        matches!(self, Jump::Return(_) | Jump::Unreachable)
    }

    /// Replace every target pointing at `from` with one pointing at `to`,
    /// keeping the phi arguments. Returns how many targets changed.
    pub fn retarget(&mut self, from: BlockId, to: BlockId) -> usize {
        let mut changed = 0;
        for target in self.targets_mut() {
            if target.block == from {
                target.block = to;
                changed += 1;
            }
        }
        changed
    }
}

impl Instruction for Jump {
    fn children(&self) -> SmallVec<[&Expression; 4]> {
        match self {
            Jump::Goto(target) => target.phi_args.iter().collect(),
            Jump::Branch {
                cond,
                if_true,
                if_false,
            } => {
                let mut children =
                    SmallVec::with_capacity(1 + if_true.phi_args.len() + if_false.phi_args.len());
                children.push(cond);
                children.extend(if_true.phi_args.iter());
                children.extend(if_false.phi_args.iter());
                children
            }
            Jump::Return(value) => smallvec![value],
            Jump::Unreachable => SmallVec::new(),
        }
    }

    fn own_effects(&self) -> Effects {
        Effects::NONE
    }
}
