//! Modules and the recorded mutation protocol.
//!
//! A [`Module`] owns its functions and their abstractions and is the only
//! path through which any of them change. Each public mutating method
//! builds a [`Mutation`] describing itself and runs through
//! [`Module::record`], which brackets the edit with observer callbacks.
//!
//! Every operation validates all of its preconditions before touching any
//! state, so a failed mutation leaves the module exactly as it was.

use std::collections::BTreeMap;
use std::fmt;

use fir_types::{cmp_specificity, Effects, Type};
use rustc_hash::FxHashSet;

use crate::visitor::{walk_cfg, Visitor};
use crate::{
    Abstraction, AbstractionId, BasicBlock, BlockId, Cfg, Expression, Function, FunctionId,
    IrError, Jump, Local, ModuleId, Mutation, MutationError, NamedVariable, Observer, Parameter,
    Register, Returned, Statement, Target, Variable,
};

pub struct Module {
    id: ModuleId,
    functions: Vec<Option<Function>>,
    /// Live functions by name; iteration order is the printing order.
    names: BTreeMap<String, FunctionId>,
    abstractions: Vec<Option<Abstraction>>,
    observers: Vec<Box<dyn Observer>>,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("functions", &self.names.keys().collect::<Vec<_>>())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Module {
    pub fn new() -> Self {
        Self {
            id: ModuleId::fresh(),
            functions: Vec::new(),
            names: BTreeMap::new(),
            abstractions: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Register an observer. Observers run in registration order.
    pub fn add_observer(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.require_function(id).ok()
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.names.get(name).and_then(|&id| self.function(id))
    }

    /// Live functions, sorted by name.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.names
            .values()
            .filter_map(move |&id| self.function(id))
    }

    pub fn abstraction(&self, id: AbstractionId) -> Option<&Abstraction> {
        self.require_abstraction(id).ok()
    }

    /// Versions of `function` in dispatch order.
    pub fn versions(&self, function: FunctionId) -> impl Iterator<Item = &Abstraction> {
        self.function(function)
            .map(Function::versions)
            .unwrap_or_default()
            .iter()
            .filter_map(move |&id| self.abstraction(id))
    }

    /// Every live abstraction, in creation order.
    pub fn abstractions(&self) -> impl Iterator<Item = &Abstraction> {
        self.abstractions.iter().flatten()
    }

    /// Next unused synthetic register of `version`. Not a structural
    /// edit, so not recorded; the caller declares the register itself.
    pub fn fresh_register(&self, version: AbstractionId) -> Result<Register, IrError> {
        Ok(self.require_abstraction(version)?.fresh_register())
    }

    fn check_owner(&self, owner: ModuleId, id: &dyn fmt::Display) -> Result<(), IrError> {
        if owner == self.id {
            Ok(())
        } else {
            Err(IrError::ForeignId {
                id: id.to_string(),
                owner,
                module: self.id,
            })
        }
    }

    pub(crate) fn require_function(&self, id: FunctionId) -> Result<&Function, IrError> {
        self.check_owner(id.module(), &id)?;
        self.functions
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| IrError::UnknownFunction(id.to_string()))
    }

    fn require_function_mut(&mut self, id: FunctionId) -> Result<&mut Function, IrError> {
        self.require_function(id)?;
        self.functions
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| IrError::UnknownFunction(id.to_string()))
    }

    pub(crate) fn require_abstraction(&self, id: AbstractionId) -> Result<&Abstraction, IrError> {
        self.check_owner(id.module(), &id)?;
        self.abstractions
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| IrError::UnknownVersion(id.to_string()))
    }

    fn require_abstraction_mut(&mut self, id: AbstractionId) -> Result<&mut Abstraction, IrError> {
        self.require_abstraction(id)?;
        self.abstractions
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| IrError::UnknownVersion(id.to_string()))
    }

    fn require_cfg_mut(&mut self, id: AbstractionId) -> Result<&mut Cfg, IrError> {
        Ok(self.require_abstraction_mut(id)?.cfg_mut())
    }

    // ── Recorder ────────────────────────────────────────────────────

    /// Run `op` as the recorded mutation `mutation`.
    ///
    /// Observers are detached for the duration so they can be handed a
    /// shared borrow of the module; `after` runs whether `op` succeeded
    /// or not.
    fn record<R>(
        &mut self,
        mutation: Mutation,
        op: impl FnOnce(&mut Self) -> Result<R, IrError>,
    ) -> Result<R, MutationError>
    where
        R: Clone + Into<Returned>,
    {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            observer.before(self, &mutation);
        }
        let result = op(self);
        let returned: Result<Returned, &IrError> = result.as_ref().map(|r| r.clone().into());
        for observer in &mut observers {
            observer.after(self, &mutation, returned.as_ref().map_err(|error| *error));
        }
        self.observers = observers;
        result.map_err(|error| MutationError {
            mutation: Box::new(mutation),
            error,
        })
    }

    // ── Functions and versions ──────────────────────────────────────

    pub fn add_function(&mut self, name: &str) -> Result<FunctionId, MutationError> {
        let mutation = Mutation::AddFunction {
            name: name.to_owned(),
        };
        self.record(mutation, |m| {
            if m.names.contains_key(name) {
                return Err(IrError::DuplicateFunction(name.to_owned()));
            }
            let id = FunctionId::new(m.id, index_u32(m.functions.len()));
            m.functions.push(Some(Function::new(id, name.to_owned())));
            m.names.insert(name.to_owned(), id);
            Ok(id)
        })
    }

    /// Remove a function and every one of its versions.
    pub fn remove_function(&mut self, function: FunctionId) -> Result<(), MutationError> {
        self.record(Mutation::RemoveFunction { function }, |m| {
            m.require_function(function)?;
            let Some(removed) = m.functions.get_mut(function.index()).and_then(Option::take)
            else {
                return Err(IrError::UnknownFunction(function.to_string()));
            };
            for version in removed.versions() {
                if let Some(slot) = m.abstractions.get_mut(version.index()) {
                    *slot = None;
                }
            }
            m.names.remove(removed.name());
            Ok(())
        })
    }

    /// Add an empty version (one `entry` block ending in `unreachable`).
    ///
    /// The version is placed in dispatch order: before the first existing
    /// version that is less specific.
    pub fn add_version(
        &mut self,
        function: FunctionId,
        params: Vec<Parameter>,
        return_type: Type,
        effects: Effects,
    ) -> Result<AbstractionId, MutationError> {
        let mutation = Mutation::AddVersion {
            function,
            params: params.clone(),
            return_type: return_type.clone(),
            effects,
        };
        self.record(mutation, |m| {
            let target = m.require_function(function)?;
            let mut seen = FxHashSet::default();
            for param in &params {
                if !seen.insert(param.variable.name()) {
                    return Err(IrError::DuplicateLocal(param.variable.name().to_owned()));
                }
            }
            let types: Vec<Type> = params.iter().map(|p| p.ty.clone()).collect();
            let mut position = target.versions().len();
            for (i, &existing) in target.versions().iter().enumerate() {
                let existing_types = m.require_abstraction(existing)?.param_types();
                match cmp_specificity(&types, &existing_types) {
                    std::cmp::Ordering::Equal => {
                        return Err(IrError::DuplicateVersion {
                            function: target.name().to_owned(),
                            params: types
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join(", "),
                        });
                    }
                    std::cmp::Ordering::Less if position == target.versions().len() => {
                        position = i;
                    }
                    _ => {}
                }
            }

            let id = AbstractionId::new(m.id, index_u32(m.abstractions.len()));
            m.abstractions.push(Some(Abstraction::new(
                id,
                function,
                params,
                return_type,
                effects,
            )));
            m.require_function_mut(function)?.insert_version(position, id);
            Ok(id)
        })
    }

    pub fn remove_version(&mut self, version: AbstractionId) -> Result<(), MutationError> {
        self.record(Mutation::RemoveVersion { version }, |m| {
            let function = m.require_abstraction(version)?.function();
            m.require_function_mut(function)?.remove_version(version);
            if let Some(slot) = m.abstractions.get_mut(version.index()) {
                *slot = None;
            }
            Ok(())
        })
    }

    // ── Bindings and signature ──────────────────────────────────────

    /// Declare a local. Registers must not already be declared anywhere in
    /// the version; no register and named variable may share a name.
    pub fn add_local(&mut self, version: AbstractionId, local: Local) -> Result<(), MutationError> {
        let mutation = Mutation::AddLocal {
            version,
            local: local.clone(),
        };
        self.record(mutation, |m| {
            let abstraction = m.require_abstraction(version)?;
            let name = local.variable.name();
            let registers = abstraction.declared_registers();
            let named_clash = abstraction
                .local(&Variable::Named(NamedVariable::new(name)))
                .is_some();
            match &local.variable {
                Variable::Register(_) if registers.contains(name) => {
                    return Err(IrError::DuplicateLocal(name.to_owned()));
                }
                Variable::Register(_) if named_clash => {
                    return Err(IrError::NamespaceClash(name.to_owned()));
                }
                Variable::Named(_) if named_clash => {
                    return Err(IrError::DuplicateLocal(name.to_owned()));
                }
                Variable::Named(_) if registers.contains(name) => {
                    return Err(IrError::NamespaceClash(name.to_owned()));
                }
                _ => {}
            }
            m.require_abstraction_mut(version)?.locals_mut().push(local);
            Ok(())
        })
    }

    /// Remove a local that nothing reads, writes or assigns any more.
    pub fn remove_local(
        &mut self,
        version: AbstractionId,
        variable: &Variable,
    ) -> Result<(), MutationError> {
        let mutation = Mutation::RemoveLocal {
            version,
            variable: variable.clone(),
        };
        self.record(mutation, |m| {
            let abstraction = m.require_abstraction(version)?;
            if abstraction.local(variable).is_none() {
                return Err(IrError::UnknownLocal(variable.to_string()));
            }
            let mut finder = UseFinder {
                variable,
                found: false,
            };
            walk_cfg(&mut finder, abstraction.cfg());
            if finder.found {
                return Err(IrError::LocalInUse(variable.to_string()));
            }
            m.require_abstraction_mut(version)?
                .locals_mut()
                .retain(|l| &l.variable != variable);
            Ok(())
        })
    }

    pub fn set_return_type(&mut self, version: AbstractionId, ty: Type) -> Result<(), MutationError> {
        let mutation = Mutation::SetReturnType {
            version,
            ty: ty.clone(),
        };
        self.record(mutation, |m| {
            m.require_abstraction_mut(version)?.set_return_type(ty);
            Ok(())
        })
    }

    pub fn set_return_effects(
        &mut self,
        version: AbstractionId,
        effects: Effects,
    ) -> Result<(), MutationError> {
        self.record(Mutation::SetReturnEffects { version, effects }, |m| {
            m.require_abstraction_mut(version)?.set_effects(effects);
            Ok(())
        })
    }

    // ── CFG edits ───────────────────────────────────────────────────

    /// Replace the whole body with `cfg`, typically built by
    /// [`CfgBuilder`](crate::CfgBuilder).
    pub fn set_body(&mut self, version: AbstractionId, cfg: Cfg) -> Result<(), MutationError> {
        let mutation = Mutation::SetBody {
            version,
            cfg: cfg.clone(),
        };
        self.record(mutation, |m| {
            m.require_abstraction_mut(version)?.set_cfg(cfg);
            Ok(())
        })
    }

    /// Insert `statement` before position `index` (`index == len` appends).
    pub fn insert_statement(
        &mut self,
        version: AbstractionId,
        block: BlockId,
        index: usize,
        statement: Statement,
    ) -> Result<(), MutationError> {
        let mutation = Mutation::InsertStatement {
            version,
            block,
            index,
            statement: statement.clone(),
        };
        self.record(mutation, |m| {
            let cfg = m.require_cfg_mut(version)?;
            let target = cfg.block_mut(block).ok_or(IrError::UnknownBlock(block))?;
            let len = target.statements().len();
            if index > len {
                return Err(IrError::IndexOutOfRange { index, len });
            }
            target.statements_mut().insert(index, statement);
            Ok(())
        })
    }

    pub fn remove_statement(
        &mut self,
        version: AbstractionId,
        block: BlockId,
        index: usize,
    ) -> Result<Statement, MutationError> {
        let mutation = Mutation::RemoveStatement {
            version,
            block,
            index,
        };
        self.record(mutation, |m| {
            let cfg = m.require_cfg_mut(version)?;
            let target = cfg.block_mut(block).ok_or(IrError::UnknownBlock(block))?;
            let len = target.statements().len();
            if index >= len {
                return Err(IrError::IndexOutOfRange { index, len });
            }
            Ok(target.statements_mut().remove(index))
        })
    }

    /// Replace the jump of `block`. Blocks that are no longer reachable
    /// from the entry afterwards are removed; their ids are returned.
    pub fn set_jump(
        &mut self,
        version: AbstractionId,
        block: BlockId,
        jump: Jump,
    ) -> Result<Vec<BlockId>, MutationError> {
        let mutation = Mutation::SetJump {
            version,
            block,
            jump: jump.clone(),
        };
        self.record(mutation, |m| {
            let cfg = m.require_cfg_mut(version)?;
            cfg.require(block)?;
            cfg.check_jump(&jump)?;
            if let Some(target) = cfg.block_mut(block) {
                target.set_jump(jump);
            }
            Ok(cfg.remove_unreachable())
        })
    }

    /// Move the statements of `block` from `index` on, plus its jump, into
    /// a new successor block; `block` then ends in `goto` the new block.
    pub fn split_new_successor(
        &mut self,
        version: AbstractionId,
        block: BlockId,
        index: usize,
    ) -> Result<BlockId, MutationError> {
        let mutation = Mutation::SplitNewSuccessor {
            version,
            block,
            index,
        };
        self.record(mutation, |m| split(m.require_cfg_mut(version)?, block, index))
    }

    /// Absorb the single successor of `block`, which must be reached by a
    /// `goto` and have `block` as its only predecessor. The successor's
    /// block parameters become register locals assigned from the goto's
    /// phi arguments. Returns the id of the absorbed block.
    pub fn merge_with_successor(
        &mut self,
        version: AbstractionId,
        block: BlockId,
    ) -> Result<BlockId, MutationError> {
        self.record(Mutation::MergeWithSuccessor { version, block }, |m| {
            let abstraction = m.require_abstraction_mut(version)?;
            let cfg = abstraction.cfg();
            let Jump::Goto(target) = cfg.require(block)?.jump() else {
                return Err(IrError::NotMergeable(block));
            };
            let succ = target.block;
            if succ == block || succ == cfg.entry() || cfg.predecessors(succ) != [block] {
                return Err(IrError::NotMergeable(block));
            }
            let phi_args = target.phi_args.clone();

            let Some(absorbed) = abstraction.cfg_mut().take_block(succ) else {
                return Err(IrError::UnknownBlock(succ));
            };
            abstraction
                .locals_mut()
                .extend(absorbed.params().iter().map(Parameter::to_local));
            let copies = absorbed
                .params()
                .iter()
                .zip(phi_args)
                .map(|(p, arg)| Statement::assign(p.variable.clone(), arg));
            let Some(target) = abstraction.cfg_mut().block_mut(block) else {
                return Err(IrError::UnknownBlock(block));
            };
            target.statements_mut().extend(copies);
            target
                .statements_mut()
                .extend(absorbed.statements().iter().cloned());
            target.set_jump(absorbed.jump().clone());
            Ok(succ)
        })
    }

    /// Remove a non-entry block. Every jump into it from another block
    /// becomes `unreachable`, and blocks left unreachable from the entry
    /// are removed too. Returns every removed id in ascending order.
    pub fn remove_block(
        &mut self,
        version: AbstractionId,
        block: BlockId,
    ) -> Result<Vec<BlockId>, MutationError> {
        self.record(Mutation::RemoveBlock { version, block }, |m| {
            let cfg = m.require_cfg_mut(version)?;
            cfg.require(block)?;
            if block == cfg.entry() {
                return Err(IrError::EntryBlock(block));
            }
            for pred in cfg.predecessors(block) {
                if let Some(pred) = cfg.block_mut(pred) {
                    pred.set_jump(Jump::Unreachable);
                }
            }
            cfg.take_block(block);
            let mut removed = cfg.remove_unreachable();
            removed.push(block);
            removed.sort_unstable();
            Ok(removed)
        })
    }

    /// Give the loop headed by `header` a dedicated preheader.
    ///
    /// `header` is split at index 0: the new successor takes over the
    /// header's statements, jump and block parameters and becomes the loop
    /// header, while `header` keeps its incoming edges from outside the
    /// loop, receives fresh parameters, and forwards them with a `goto`.
    /// Each latch's back edge is redirected to the new header. Returns the
    /// new header.
    pub fn insert_preheader(
        &mut self,
        version: AbstractionId,
        header: BlockId,
        latches: &[BlockId],
    ) -> Result<BlockId, MutationError> {
        let mutation = Mutation::InsertPreheader {
            version,
            header,
            latches: latches.to_vec(),
        };
        self.record(mutation, |m| {
            let abstraction = m.require_abstraction_mut(version)?;
            let cfg = abstraction.cfg();
            cfg.require(header)?;
            for &latch in latches {
                if !cfg.successors(latch).contains(&header) {
                    cfg.require(latch)?;
                    return Err(IrError::NotALatch { latch, header });
                }
            }

            let fresh: Vec<Parameter> = cfg
                .require(header)?
                .params()
                .iter()
                .map(|p| Parameter::new(abstraction.fresh_register(), p.ty.clone()))
                .collect();
            let forwarded: Vec<Expression> = fresh
                .iter()
                .map(|p| Expression::Read(Variable::Register(p.variable.clone())))
                .collect();

            let cfg = abstraction.cfg_mut();
            let new_header = split(cfg, header, 0)?;
            let Some(old) = cfg.block_mut(header) else {
                return Err(IrError::UnknownBlock(header));
            };
            let phis = std::mem::replace(old.params_mut(), fresh);
            old.set_jump(Jump::Goto(Target::new(new_header, forwarded)));
            if let Some(new) = cfg.block_mut(new_header) {
                *new.params_mut() = phis;
            }
            for &latch in latches {
                let source = if latch == header { new_header } else { latch };
                if let Some(block) = cfg.block_mut(source) {
                    block.jump_mut().retarget(header, new_header);
                }
            }
            Ok(new_header)
        })
    }
}

/// Split primitive shared by [`Module::split_new_successor`] and
/// [`Module::insert_preheader`].
fn split(cfg: &mut Cfg, block: BlockId, index: usize) -> Result<BlockId, IrError> {
    let source = cfg.require(block)?;
    let len = source.statements().len();
    if index > len {
        return Err(IrError::IndexOutOfRange { index, len });
    }
    let label = cfg.fresh_label(source.label());
    let Some(source) = cfg.block_mut(block) else {
        return Err(IrError::UnknownBlock(block));
    };
    let tail = source.statements_mut().split_off(index);
    let jump = source.set_jump(Jump::Unreachable);
    let successor = cfg.push_block(BasicBlock::new(label, Vec::new(), tail, jump));
    if let Some(source) = cfg.block_mut(block) {
        source.set_jump(Jump::Goto(Target::plain(successor)));
    }
    Ok(successor)
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "entity counts never approach u32::MAX"
)]
fn index_u32(index: usize) -> u32 {
    index as u32
}

/// Looks for any read, write, or assignment of one variable.
struct UseFinder<'a> {
    variable: &'a Variable,
    found: bool,
}

impl Visitor for UseFinder<'_> {
    fn visit_statement(&mut self, statement: &Statement) {
        if let (Some(dest), Variable::Register(r)) = (&statement.dest, self.variable) {
            self.found |= dest == r;
        }
        crate::visitor::walk_statement(self, statement);
    }

    fn visit_register(&mut self, register: &Register) {
        self.found |= self.variable.as_register() == Some(register);
    }

    fn visit_named(&mut self, variable: &NamedVariable) {
        self.found |= self.variable.as_named() == Some(variable);
    }
}

#[cfg(test)]
mod tests;
