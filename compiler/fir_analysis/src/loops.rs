//! Natural-loop discovery.
//!
//! A back edge is an edge `P -> H` where `H` dominates `P`; `H` is then a
//! loop header. The body of the loop headed by `H` is every block that
//! reaches a back-edge source without passing through `H`, plus `H`
//! itself. Back edges sharing a header form a single loop.
//!
//! Only reducible control flow is supported: if a depth-first walk finds a
//! retreating edge whose target does not dominate its source, [`Loops::compute`]
//! panics instead of producing a wrong loop forest.
//!
//! Preheaders are materialized on demand by [`Loops::preheader`], which may
//! edit the CFG through [`Module::insert_preheader`] and keeps the loop
//! forest in sync with the edit.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use fir_ir::{Abstraction, AbstractionId, BlockId, Cfg, Module, MutationError};

use crate::dominators::DominatorTree;

/// Index of a loop inside its [`Loops`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId(u32);

impl LoopId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A natural loop.
#[derive(Clone, Debug)]
pub struct Loop {
    header: BlockId,
    body: FxHashSet<BlockId>,
    /// Sources of the back edges into `header`.
    latches: SmallVec<[BlockId; 2]>,
    outer: Option<LoopId>,
    innermost: bool,
    preheader: Option<BlockId>,
}

impl Loop {
    pub fn header(&self) -> BlockId {
        self.header
    }

    /// Blocks of the loop, header included.
    pub fn body(&self) -> &FxHashSet<BlockId> {
        &self.body
    }

    pub fn contains(&self, block: BlockId) -> bool {
        self.body.contains(&block)
    }

    pub fn latches(&self) -> &[BlockId] {
        &self.latches
    }

    /// The immediately enclosing loop.
    pub fn outer(&self) -> Option<LoopId> {
        self.outer
    }

    /// No other loop names this one as its `outer`.
    pub fn is_innermost(&self) -> bool {
        self.innermost
    }

    /// The preheader, if [`Loops::preheader`] already determined it.
    pub fn known_preheader(&self) -> Option<BlockId> {
        self.preheader
    }
}

/// Loop forest of one abstraction, ordered innermost first (by body size,
/// ties broken by header position in reverse postorder).
#[derive(Clone, Debug)]
pub struct Loops {
    version: AbstractionId,
    loops: Vec<Loop>,
}

impl Loops {
    #[tracing::instrument(level = "trace", skip_all, fields(version = %abstraction.id()))]
    pub fn compute(abstraction: &Abstraction) -> Self {
        let cfg = abstraction.cfg();
        let dom = DominatorTree::build(cfg);

        // Headers in reverse postorder, each with its latches.
        let mut headers: Vec<(BlockId, SmallVec<[BlockId; 2]>)> = Vec::new();
        let mut slot: FxHashMap<BlockId, usize> = FxHashMap::default();
        for &block in dom.reverse_postorder() {
            let Some(pos) = dom.rpo_position(block) else {
                continue;
            };
            for succ in cfg.successors(block) {
                let Some(succ_pos) = dom.rpo_position(succ) else {
                    continue;
                };
                if succ_pos > pos {
                    continue;
                }
                assert!(
                    dom.dominates(succ, block),
                    "irreducible control flow in {}: edge {block} -> {succ} enters a cycle \
                     that {succ} does not dominate",
                    abstraction.id(),
                );
                let index = *slot.entry(succ).or_insert_with(|| {
                    headers.push((succ, SmallVec::new()));
                    headers.len() - 1
                });
                headers[index].1.push(block);
            }
        }

        let mut loops: Vec<Loop> = headers
            .into_iter()
            .map(|(header, latches)| Loop {
                body: natural_loop(cfg, &dom, header, &latches),
                header,
                latches,
                outer: None,
                innermost: true,
                preheader: None,
            })
            .collect();
        loops.sort_by_key(|l| (l.body.len(), dom.rpo_position(l.header)));

        // The first larger loop holding a header is its closest enclosing loop.
        for inner in 0..loops.len() {
            let header = loops[inner].header;
            let Some(outer) = (inner + 1..loops.len()).find(|&j| loops[j].contains(header)) else {
                continue;
            };
            loops[inner].outer = Some(loop_id(outer));
            loops[outer].innermost = false;
        }

        tracing::trace!(loops = loops.len(), "loop forest computed");
        Self {
            version: abstraction.id(),
            loops,
        }
    }

    pub fn version(&self) -> AbstractionId {
        self.version
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn get(&self, id: LoopId) -> Option<&Loop> {
        self.loops.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (LoopId, &Loop)> {
        self.loops
            .iter()
            .enumerate()
            .map(|(i, l)| (loop_id(i), l))
    }

    /// The smallest loop containing `block`.
    pub fn innermost_containing(&self, block: BlockId) -> Option<LoopId> {
        self.loops
            .iter()
            .position(|l| l.contains(block))
            .map(loop_id)
    }

    /// The block through which control enters loop `id` from outside.
    ///
    /// When the header has exactly one predecessor outside the loop, that
    /// predecessor is the preheader. Otherwise one is inserted with
    /// [`Module::insert_preheader`]: the old header block becomes the
    /// preheader and a new block takes over as header, so this loop's
    /// header, body and latches and the bodies of enclosing loops are
    /// updated to match. The answer is cached.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this forest.
    pub fn preheader(&mut self, module: &mut Module, id: LoopId) -> Result<BlockId, MutationError> {
        let this = &self.loops[id.index()];
        if let Some(preheader) = this.preheader {
            return Ok(preheader);
        }
        let header = this.header;

        let outside: SmallVec<[BlockId; 2]> = module
            .abstraction(self.version)
            .map(|abs| {
                abs.cfg()
                    .predecessors(header)
                    .into_iter()
                    .filter(|p| !this.contains(*p))
                    .collect()
            })
            .unwrap_or_default();
        if let [single] = outside[..] {
            self.loops[id.index()].preheader = Some(single);
            return Ok(single);
        }

        let latches = this.latches.clone();
        let new_header = module.insert_preheader(self.version, header, &latches)?;
        tracing::debug!(
            version = %self.version,
            preheader = %header,
            header = %new_header,
            "inserted loop preheader"
        );

        let this = &mut self.loops[id.index()];
        this.header = new_header;
        this.body.remove(&header);
        this.body.insert(new_header);
        for latch in &mut this.latches {
            if *latch == header {
                *latch = new_header;
            }
        }
        this.preheader = Some(header);

        let mut outer = this.outer;
        while let Some(enclosing) = outer {
            let enclosing = &mut self.loops[enclosing.index()];
            enclosing.body.insert(new_header);
            outer = enclosing.outer;
        }
        Ok(header)
    }
}

/// Walk predecessors back from the latches until the header.
fn natural_loop(
    cfg: &Cfg,
    dom: &DominatorTree,
    header: BlockId,
    latches: &[BlockId],
) -> FxHashSet<BlockId> {
    let mut body = FxHashSet::default();
    body.insert(header);
    let mut worklist: Vec<BlockId> = latches
        .iter()
        .copied()
        .filter(|&latch| body.insert(latch))
        .collect();
    while let Some(block) = worklist.pop() {
        for pred in cfg.predecessors(block) {
            if dom.rpo_position(pred).is_some() && body.insert(pred) {
                worklist.push(pred);
            }
        }
    }
    body
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "a CFG never holds u32::MAX loops"
)]
fn loop_id(index: usize) -> LoopId {
    LoopId(index as u32)
}
