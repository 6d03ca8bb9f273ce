//! Offline CFG construction.
//!
//! Front-ends and the textual parser assemble a whole CFG here and install
//! it with one recorded [`Module::set_body`](crate::Module::set_body), so a
//! multi-block construction is observed as a single mutation.
//!
//! Misuse (an id from another builder, a second jump) is remembered and
//! reported by [`CfgBuilder::finish`] instead of panicking mid-build.

use rustc_hash::FxHashSet;

use crate::{BasicBlock, BlockId, Cfg, IrError, Jump, Parameter, Statement};

#[derive(Debug)]
struct PendingBlock {
    label: String,
    params: Vec<Parameter>,
    statements: Vec<Statement>,
    jump: Option<Jump>,
}

#[derive(Debug)]
pub struct CfgBuilder {
    blocks: Vec<PendingBlock>,
    error: Option<IrError>,
}

impl CfgBuilder {
    /// Start a CFG whose entry block is labelled `entry_label`.
    pub fn new(entry_label: &str) -> Self {
        Self {
            blocks: vec![PendingBlock {
                label: entry_label.to_owned(),
                params: Vec::new(),
                statements: Vec::new(),
                jump: None,
            }],
            error: None,
        }
    }

    pub fn entry(&self) -> BlockId {
        BlockId::new(0)
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "block counts never approach u32::MAX"
    )]
    pub fn add_block(&mut self, label: &str, params: Vec<Parameter>) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(PendingBlock {
            label: label.to_owned(),
            params,
            statements: Vec::new(),
            jump: None,
        });
        id
    }

    pub fn push(&mut self, block: BlockId, statement: Statement) -> &mut Self {
        if let Some(pending) = self.pending(block) {
            pending.statements.push(statement);
        }
        self
    }

    pub fn set_jump(&mut self, block: BlockId, jump: Jump) -> &mut Self {
        if let Some(pending) = self.pending(block) {
            pending.jump = Some(jump);
        }
        self
    }

    fn pending(&mut self, block: BlockId) -> Option<&mut PendingBlock> {
        let found = self.blocks.get_mut(block.index());
        if found.is_none() && self.error.is_none() {
            self.error = Some(IrError::UnknownBlock(block));
        }
        found
    }

    /// Validate and produce the CFG.
    ///
    /// Checks, in order: labels unique, every block has a jump, every
    /// target exists with matching phi arity, the entry takes no
    /// parameters, every block is reachable from the entry.
    pub fn finish(self) -> Result<Cfg, IrError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut labels = FxHashSet::default();
        for block in &self.blocks {
            if !labels.insert(block.label.as_str()) {
                return Err(IrError::DuplicateLabel(block.label.clone()));
            }
        }

        let mut slots = Vec::with_capacity(self.blocks.len());
        for block in self.blocks {
            let Some(jump) = block.jump else {
                return Err(IrError::MissingJump(block.label));
            };
            slots.push(Some(BasicBlock::new(
                block.label,
                block.params,
                block.statements,
                jump,
            )));
        }

        let cfg = Cfg::from_slots(slots, BlockId::new(0));
        for (_, block) in cfg.blocks() {
            cfg.check_jump(block.jump())?;
        }
        if cfg
            .block(cfg.entry())
            .is_some_and(|entry| !entry.params().is_empty())
        {
            return Err(IrError::EntryHasParameters);
        }
        let reachable = cfg.reachable();
        if let Some(dead) = cfg.block_ids().find(|id| !reachable.contains(id)) {
            return Err(IrError::UnreachableBlock(dead));
        }

        tracing::trace!(blocks = cfg.len(), "built cfg");
        Ok(cfg)
    }
}
