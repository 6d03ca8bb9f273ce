//! Abstract interpretation of environments.
//!
//! Functions manipulate first-class environments: each closure call creates
//! one, named variables live in them, and an environment can be reached
//! reflectively once its identity escapes. The lattice here summarizes, per
//! statically tracked environment, which named bindings are known, which
//! other environments it can reach, and whether it leaked (identity escaped)
//! or was tainted (contents may have changed behind the analysis' back).
//!
//! Every merge is monotone: it only ever loses precision. The
//! [`AbstractResult`] it returns tells the enclosing fixed-point iteration
//! whether anything changed, and how badly.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use fir_ir::{NamedVariable, Register};
use fir_types::{Ownership, Type};

/// An environment known by identity rather than created by this function.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StaticEnv {
    Global,
    Base,
    Namespace(String),
}

/// A node of the environment graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnvNode {
    /// Created in this function and held in a register.
    Local(Register),
    /// Whatever reading the caller's enclosing environment produced.
    Enclosing,
    Static(StaticEnv),
    /// Parent not statically known.
    UnknownParent,
}

impl EnvNode {
    /// Nodes past which environment contents cannot be tracked.
    fn is_opaque(&self) -> bool {
        !matches!(self, EnvNode::Local(_))
    }
}

impl fmt::Display for EnvNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvNode::Local(r) => write!(f, "{r}"),
            EnvNode::Enclosing => f.write_str("<enclosing>"),
            EnvNode::Static(StaticEnv::Global) => f.write_str("<global>"),
            EnvNode::Static(StaticEnv::Base) => f.write_str("<base>"),
            EnvNode::Static(StaticEnv::Namespace(ns)) => write!(f, "<namespace:{ns}>"),
            EnvNode::UnknownParent => f.write_str("<unknown>"),
        }
    }
}

/// Outcome of a lattice operation, ordered by severity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AbstractResult {
    #[default]
    None,
    Updated,
    LostPrecision,
    Tainted,
}

impl AbstractResult {
    /// The more severe of the two.
    #[must_use]
    pub fn join(self, other: AbstractResult) -> AbstractResult {
        self.max(other)
    }

    pub fn update(&mut self, other: AbstractResult) {
        *self = self.join(other);
    }

    pub fn changed(self) -> bool {
        self != AbstractResult::None
    }
}

/// What a named binding may hold: the registers whose values may have been
/// stored into it and the join of their types, or nothing known at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbstractValue {
    sources: BTreeSet<Register>,
    ty: Type,
    unknown: bool,
}

impl AbstractValue {
    pub fn known(source: Register, ty: Type) -> Self {
        Self {
            sources: BTreeSet::from([source]),
            ty,
            unknown: false,
        }
    }

    pub fn unknown() -> Self {
        Self {
            sources: BTreeSet::new(),
            ty: Type::any(),
            unknown: true,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.unknown
    }

    /// Empty when unknown.
    pub fn sources(&self) -> &BTreeSet<Register> {
        &self.sources
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn taint(&mut self) {
        *self = Self::unknown();
    }

    /// Join `other` into `self`.
    ///
    /// Joining two distinct owned values reports lost precision and degrades
    /// the result to shared, even when both have the same type. Values are
    /// distinct when their source sets differ.
    pub fn merge(&mut self, other: &AbstractValue) -> AbstractResult {
        if self.unknown {
            return AbstractResult::None;
        }
        if other.unknown {
            self.taint();
            return AbstractResult::LostPrecision;
        }

        let mut result = AbstractResult::None;
        let distinct_owned = self.sources != other.sources
            && self.ty.ownership == Ownership::Owned
            && other.ty.ownership == Ownership::Owned;
        let before = self.sources.len();
        self.sources.extend(other.sources.iter().cloned());
        if self.sources.len() != before {
            result.update(AbstractResult::Updated);
        }

        let mut mismatch = false;
        let mut ty = self.ty.union(&other.ty, || mismatch = true);
        if distinct_owned && !mismatch {
            mismatch = true;
            ty.ownership = Ownership::Shared;
        }
        if ty != self.ty {
            self.ty = ty;
            result.update(AbstractResult::Updated);
        }
        if mismatch {
            result.update(AbstractResult::LostPrecision);
        }
        result
    }
}

/// Abstract state of one environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbstractEnv {
    entries: FxHashMap<NamedVariable, AbstractValue>,
    /// Environments this one may reach.
    reachable: FxHashSet<EnvNode>,
    parent: EnvNode,
    leaked: bool,
    tainted: bool,
}

impl Default for AbstractEnv {
    fn default() -> Self {
        Self::new(EnvNode::UnknownParent)
    }
}

impl AbstractEnv {
    pub fn new(parent: EnvNode) -> Self {
        Self {
            entries: FxHashMap::default(),
            reachable: FxHashSet::default(),
            parent,
            leaked: false,
            tainted: false,
        }
    }

    pub fn parent(&self) -> &EnvNode {
        &self.parent
    }

    pub fn get(&self, name: &NamedVariable) -> Option<&AbstractValue> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&NamedVariable, &AbstractValue)> {
        self.entries.iter()
    }

    /// Strong update of a binding.
    pub fn set(&mut self, name: NamedVariable, value: AbstractValue) {
        self.entries.insert(name, value);
    }

    pub fn reachable(&self) -> &FxHashSet<EnvNode> {
        &self.reachable
    }

    pub fn is_leaked(&self) -> bool {
        self.leaked
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    /// Forget everything about the contents.
    pub fn taint(&mut self) {
        self.tainted = true;
        for value in self.entries.values_mut() {
            value.taint();
        }
    }

    /// Join `other` into `self`. A binding present on one side only becomes
    /// unknown.
    pub fn merge(&mut self, other: &AbstractEnv) -> AbstractResult {
        let mut result = AbstractResult::None;

        if other.leaked && !self.leaked {
            self.leaked = true;
            result.update(AbstractResult::LostPrecision);
        }
        if other.tainted && !self.tainted {
            self.taint();
            result.update(AbstractResult::Tainted);
        }
        if self.parent != other.parent && self.parent != EnvNode::UnknownParent {
            self.parent = EnvNode::UnknownParent;
            result.update(AbstractResult::LostPrecision);
        }

        for (name, theirs) in &other.entries {
            match self.entries.get_mut(name) {
                Some(mine) => result.update(mine.merge(theirs)),
                None => {
                    self.entries.insert(name.clone(), AbstractValue::unknown());
                    result.update(AbstractResult::LostPrecision);
                }
            }
        }
        for (name, mine) in &mut self.entries {
            if !other.entries.contains_key(name) && !mine.is_unknown() {
                mine.taint();
                result.update(AbstractResult::LostPrecision);
            }
        }

        let before = self.reachable.len();
        self.reachable.extend(other.reachable.iter().cloned());
        if self.reachable.len() != before {
            result.update(AbstractResult::Updated);
        }
        result
    }
}

/// Where a name lookup ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Bound in a tracked environment.
    Found { env: EnvNode, value: AbstractValue },
    /// The walk reached an environment known by identity without finding
    /// the name in what is tracked of it.
    Static(StaticEnv),
    /// The walk left the tracked part of the graph: the binding may live in
    /// any of `candidates` (sorted) or outside all of them.
    Unknown { candidates: Vec<EnvNode> },
}

/// The abstract state of every tracked environment at one program point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AbstractEnvHierarchy {
    envs: FxHashMap<EnvNode, AbstractEnv>,
    /// Registers known to hold the same environment as another node.
    aliases: FxHashMap<Register, EnvNode>,
}

impl AbstractEnvHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `env`, replacing what was known about it.
    pub fn declare(&mut self, env: EnvNode, parent: EnvNode) -> &mut AbstractEnv {
        let env = self.resolve(&env);
        let slot = self.envs.entry(env).or_default();
        *slot = AbstractEnv::new(parent);
        slot
    }

    pub fn env(&self, env: &EnvNode) -> Option<&AbstractEnv> {
        self.envs.get(&self.resolve(env))
    }

    pub fn env_mut(&mut self, env: &EnvNode) -> Option<&mut AbstractEnv> {
        let env = self.resolve(env);
        self.envs.get_mut(&env)
    }

    /// Tracked nodes, sorted.
    pub fn tracked(&self) -> Vec<EnvNode> {
        let mut nodes: Vec<EnvNode> = self.envs.keys().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Record that `register` holds the environment `env`.
    pub fn add_alias(&mut self, register: Register, env: EnvNode) {
        let env = self.resolve(&env);
        self.aliases.insert(register, env);
    }

    /// The node an environment-valued register stands for.
    pub fn resolve(&self, env: &EnvNode) -> EnvNode {
        match env {
            EnvNode::Local(r) => self.aliases.get(r).cloned().unwrap_or_else(|| env.clone()),
            _ => env.clone(),
        }
    }

    /// Resolve `name` starting at `env`.
    pub fn lookup(&self, env: &EnvNode, name: &NamedVariable) -> Resolution {
        self.walk(self.resolve(env), name, |_| true)
    }

    /// Resolve `name` starting at the parent of `env`, as `<<-` does.
    pub fn lookup_super(&self, env: &EnvNode, name: &NamedVariable) -> Resolution {
        let env = self.resolve(env);
        match self.envs.get(&env) {
            Some(tracked) => self.walk(tracked.parent.clone(), name, |_| true),
            None => self.opaque(&env),
        }
    }

    /// Resolve `name` in function position: bindings that provably hold a
    /// non-closure value are skipped.
    pub fn lookup_fun(&self, env: &EnvNode, name: &NamedVariable) -> Resolution {
        self.walk(self.resolve(env), name, |value| {
            value.is_unknown() || value.ty().may_be_closure()
        })
    }

    /// The parent chain of `env`, ending with the first node that is not
    /// tracked or not local.
    pub fn potential_parents(&self, env: &EnvNode) -> Vec<EnvNode> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = self.resolve(env);
        while let Some(tracked) = self.envs.get(&current) {
            if current.is_opaque() || !seen.insert(current.clone()) {
                break;
            }
            current = self.resolve(&tracked.parent);
            chain.push(current.clone());
        }
        chain
    }

    /// Record that `from` may reach `to`. An edge to an environment the
    /// analysis cannot follow leaks `from` instead.
    pub fn with_dependency(&mut self, from: &EnvNode, to: &EnvNode) -> AbstractResult {
        let from = self.resolve(from);
        let to = self.resolve(to);
        if to.is_opaque() {
            return self.leaking(&from);
        }
        let Some(env) = self.envs.get_mut(&from) else {
            return AbstractResult::None;
        };
        if env.reachable.insert(to) {
            AbstractResult::Updated
        } else {
            AbstractResult::None
        }
    }

    /// Mark `env` and everything it can reach, parents included, as leaked.
    pub fn leaking(&mut self, env: &EnvNode) -> AbstractResult {
        let mut result = AbstractResult::None;
        let mut worklist = vec![self.resolve(env)];
        while let Some(node) = worklist.pop() {
            let node = self.resolve(&node);
            let Some(tracked) = self.envs.get_mut(&node) else {
                continue;
            };
            if tracked.leaked {
                continue;
            }
            tracked.leaked = true;
            result.update(AbstractResult::LostPrecision);
            worklist.push(tracked.parent.clone());
            worklist.extend(tracked.reachable.iter().cloned());
        }
        if result.changed() {
            tracing::trace!(env = %env, "environment leaked");
        }
        result
    }

    /// Forget the contents of every leaked environment and of the global
    /// environment. Returns whether anything changed.
    pub fn tainting_leaked(&mut self) -> bool {
        let global = EnvNode::Static(StaticEnv::Global);
        self.envs.entry(global.clone()).or_default();
        let mut changed = false;
        for (node, env) in &mut self.envs {
            if (env.leaked || *node == global) && !env.tainted {
                env.taint();
                changed = true;
            }
        }
        changed
    }

    /// Join the state reaching a control-flow merge point from another
    /// predecessor.
    ///
    /// # Panics
    ///
    /// Panics if both sides alias the same register to different
    /// environments.
    pub fn merge(&mut self, other: &AbstractEnvHierarchy) -> AbstractResult {
        let mut result = AbstractResult::None;

        for (node, theirs) in &other.envs {
            match self.envs.get_mut(node) {
                Some(mine) => result.update(mine.merge(theirs)),
                None => {
                    let mut fresh = AbstractEnv::new(theirs.parent.clone());
                    result.update(fresh.merge(theirs).join(AbstractResult::Updated));
                    self.envs.insert(node.clone(), fresh);
                }
            }
        }
        for (node, mine) in &mut self.envs {
            if !other.envs.contains_key(node) {
                let empty = AbstractEnv::new(mine.parent.clone());
                result.update(mine.merge(&empty));
            }
        }

        for (register, theirs) in &other.aliases {
            match self.aliases.get(register) {
                Some(mine) => assert!(
                    mine == theirs,
                    "alias of {register} differs between branches: {mine} vs {theirs}"
                ),
                None => {
                    self.aliases.insert(register.clone(), theirs.clone());
                    result.update(AbstractResult::Updated);
                }
            }
        }
        result
    }

    fn walk(
        &self,
        start: EnvNode,
        name: &NamedVariable,
        accept: impl Fn(&AbstractValue) -> bool,
    ) -> Resolution {
        let mut seen = FxHashSet::default();
        let mut current = start;
        loop {
            if !seen.insert(current.clone()) {
                return self.opaque(&EnvNode::UnknownParent);
            }
            let Some(env) = self.envs.get(&current) else {
                return self.opaque(&current);
            };
            if env.tainted {
                return self.opaque(&current);
            }
            if let Some(value) = env.get(name).filter(|v| accept(v)) {
                return Resolution::Found {
                    env: current,
                    value: value.clone(),
                };
            }
            if let EnvNode::Static(stat) = current {
                return Resolution::Static(stat);
            }
            current = self.resolve(&env.parent);
        }
    }

    /// Result of a lookup that reached `node` without finding the name.
    fn opaque(&self, node: &EnvNode) -> Resolution {
        match node {
            EnvNode::Static(stat) => Resolution::Static(stat.clone()),
            _ => Resolution::Unknown {
                candidates: self.tracked(),
            },
        }
    }
}

#[cfg(test)]
mod tests;
