//! Dominator tree.
//!
//! Uses the Cooper-Harvey-Kennedy iterative algorithm on reverse
//! postorder, which converges in a couple of passes for the CFG sizes a
//! single function version produces.
//!
//! Reference: Cooper, Harvey, Kennedy, "A Simple, Fast Dominance Algorithm" (2001)

use fir_ir::{BlockId, Cfg};

/// Immediate dominators of every block reachable from the entry.
///
/// Indexed by [`BlockId::index`]; slots of removed or unreachable blocks
/// stay `None`.
#[derive(Clone, Debug)]
pub struct DominatorTree {
    idom: Vec<Option<usize>>,
    entry: usize,
    /// Reachable blocks in reverse postorder.
    rpo: Vec<BlockId>,
    /// Block index to position in `rpo`.
    rpo_pos: Vec<Option<usize>>,
}

impl DominatorTree {
    pub fn build(cfg: &Cfg) -> Self {
        let n = slot_count(cfg);
        let entry = cfg.entry().index();
        let rpo = reverse_postorder(cfg, n);

        let mut rpo_pos = vec![None; n];
        for (pos, block) in rpo.iter().enumerate() {
            rpo_pos[block.index()] = Some(pos);
        }
        let preds: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                cfg.predecessors(block_id(i))
                    .into_iter()
                    .map(BlockId::index)
                    .filter(|&p| rpo_pos[p].is_some())
                    .collect()
            })
            .collect();

        let mut idom: Vec<Option<usize>> = vec![None; n];
        idom[entry] = Some(entry);

        let mut changed = true;
        while changed {
            changed = false;
            for block in rpo.iter().skip(1) {
                let b = block.index();
                let Some(mut new_idom) = preds[b].iter().copied().find(|&p| idom[p].is_some())
                else {
                    continue;
                };
                for &pred in &preds[b] {
                    if pred != new_idom && idom[pred].is_some() {
                        new_idom = intersect(pred, new_idom, &idom, &rpo_pos);
                    }
                }
                if idom[b] != Some(new_idom) {
                    idom[b] = Some(new_idom);
                    changed = true;
                }
            }
        }

        Self {
            idom,
            entry,
            rpo,
            rpo_pos,
        }
    }

    /// Does `a` dominate `b`? Every block dominates itself; nothing
    /// dominates an unreachable block.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        let target = a.index();
        let mut current = b.index();
        if self.idom.get(current).copied().flatten().is_none() {
            return false;
        }
        loop {
            if current == target {
                return true;
            }
            match self.idom[current] {
                Some(dom) if dom != current => current = dom,
                _ => return false,
            }
        }
    }

    /// `None` for the entry and for unreachable blocks.
    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        let b = block.index();
        if b == self.entry {
            return None;
        }
        self.idom.get(b).copied().flatten().map(block_id)
    }

    /// Blocks dominated by `root` (including `root`), in dominator-tree
    /// preorder.
    pub fn dominated_preorder(&self, root: BlockId) -> Vec<BlockId> {
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); self.idom.len()];
        for &block in &self.rpo {
            let b = block.index();
            if let Some(dom) = self.idom[b] {
                if dom != b {
                    children[dom].push(b);
                }
            }
        }

        let mut result = Vec::new();
        if self.rpo_position(root).is_none() {
            return result;
        }
        let mut stack = vec![root.index()];
        while let Some(b) = stack.pop() {
            result.push(block_id(b));
            stack.extend(children[b].iter().rev());
        }
        result
    }

    /// Reachable blocks in reverse postorder of a depth-first walk from the
    /// entry.
    pub fn reverse_postorder(&self) -> &[BlockId] {
        &self.rpo
    }

    pub fn rpo_position(&self, block: BlockId) -> Option<usize> {
        self.rpo_pos.get(block.index()).copied().flatten()
    }
}

/// One past the highest live block index.
fn slot_count(cfg: &Cfg) -> usize {
    cfg.block_ids().map(|b| b.index() + 1).max().unwrap_or(0)
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "block indices come from u32 ids"
)]
fn block_id(index: usize) -> BlockId {
    BlockId::new(index as u32)
}

/// Iterative postorder with an explicit stack, then reversed.
fn reverse_postorder(cfg: &Cfg, n: usize) -> Vec<BlockId> {
    let mut visited = vec![false; n];
    let mut postorder = Vec::with_capacity(n);
    let mut stack: Vec<(BlockId, bool)> = vec![(cfg.entry(), false)];

    while let Some(&mut (block, ref mut children_done)) = stack.last_mut() {
        if *children_done {
            postorder.push(block);
            stack.pop();
            continue;
        }
        *children_done = true;

        let b = block.index();
        if b >= n || visited[b] {
            stack.pop();
            continue;
        }
        visited[b] = true;

        // Reversed so the first successor is explored first.
        for succ in cfg.successors(block).into_iter().rev() {
            if succ.index() < n && !visited[succ.index()] {
                stack.push((succ, false));
            }
        }
    }

    postorder.reverse();
    postorder
}

/// Walk two fingers up the tree until they meet.
fn intersect(
    mut a: usize,
    mut b: usize,
    idom: &[Option<usize>],
    rpo_pos: &[Option<usize>],
) -> usize {
    let pos = |x: usize| rpo_pos[x].unwrap_or(usize::MAX);
    while a != b {
        while pos(a) > pos(b) {
            let Some(next) = idom[a] else {
                debug_assert!(false, "intersect: broken idom chain at {a}");
                return a;
            };
            a = next;
        }
        while pos(b) > pos(a) {
            let Some(next) = idom[b] else {
                debug_assert!(false, "intersect: broken idom chain at {b}");
                return b;
            };
            b = next;
        }
    }
    a
}
