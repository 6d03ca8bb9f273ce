//! Abstractions: one compiled version of a function body.

use std::cell::Cell;

use fir_types::{Effects, Signature, Type};
use rustc_hash::FxHashSet;

use crate::{AbstractionId, Cfg, FunctionId, Local, Parameter, Register, Variable};

/// Label of the entry block of a freshly created abstraction.
pub const ENTRY_LABEL: &str = "entry";

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Abstraction {
    id: AbstractionId,
    function: FunctionId,
    params: Vec<Parameter>,
    locals: Vec<Local>,
    return_type: Type,
    effects: Effects,
    cfg: Cfg,
    /// Lower bound for the next synthetic register suffix.
    next_register: Cell<u32>,
}

impl Abstraction {
    pub(crate) fn new(
        id: AbstractionId,
        function: FunctionId,
        params: Vec<Parameter>,
        return_type: Type,
        effects: Effects,
    ) -> Self {
        Self {
            id,
            function,
            params,
            locals: Vec::new(),
            return_type,
            effects,
            cfg: Cfg::single_entry(ENTRY_LABEL),
            next_register: Cell::new(0),
        }
    }

    pub fn id(&self) -> AbstractionId {
        self.id
    }

    /// The function this version belongs to. Never changes.
    pub fn function(&self) -> FunctionId {
        self.function
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Declared locals, in declaration order.
    pub fn locals(&self) -> &[Local] {
        &self.locals
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    pub fn effects(&self) -> Effects {
        self.effects
    }

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    pub fn param_types(&self) -> Vec<Type> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn signature(&self) -> Signature {
        Signature::new(self.param_types(), self.return_type.clone(), self.effects)
    }

    pub fn local(&self, variable: &Variable) -> Option<&Local> {
        self.locals.iter().find(|l| &l.variable == variable)
    }

    /// Every register name declared anywhere: parameters, register locals,
    /// and block parameters.
    pub fn declared_registers(&self) -> FxHashSet<&str> {
        let params = self.params.iter().map(|p| p.variable.name());
        let locals = self
            .locals
            .iter()
            .filter_map(|l| l.variable.as_register())
            .map(Register::name);
        let phis = self
            .cfg
            .blocks()
            .flat_map(|(_, b)| b.params().iter().map(|p| p.variable.name()));
        params.chain(locals).chain(phis).collect()
    }

    /// Declared type of `register`, looked up in parameters, register
    /// locals, and block parameters.
    pub fn register_type(&self, register: &Register) -> Option<&Type> {
        self.params
            .iter()
            .chain(self.cfg.blocks().flat_map(|(_, b)| b.params().iter()))
            .find(|p| &p.variable == register)
            .map(|p| &p.ty)
            .or_else(|| {
                self.locals
                    .iter()
                    .find(|l| l.variable.as_register() == Some(register))
                    .map(|l| &l.ty)
            })
    }

    /// Next unused synthetic register name (`r0`, `r1`, ...). The cached
    /// counter only moves forward, so two calls never return the same
    /// name even if neither result is declared in between.
    pub(crate) fn fresh_register(&self) -> Register {
        let declared = self.declared_registers();
        let mut k = self.next_register.get();
        loop {
            let candidate = format!("r{k}");
            k += 1;
            if !declared.contains(candidate.as_str()) {
                self.next_register.set(k);
                return Register::new(candidate);
            }
        }
    }

    // ── Crate-internal mutation ─────────────────────────────────────

    pub(crate) fn locals_mut(&mut self) -> &mut Vec<Local> {
        &mut self.locals
    }

    pub(crate) fn set_return_type(&mut self, ty: Type) {
        self.return_type = ty;
    }

    pub(crate) fn set_effects(&mut self, effects: Effects) {
        self.effects = effects;
    }

    pub(crate) fn cfg_mut(&mut self) -> &mut Cfg {
        &mut self.cfg
    }

    pub(crate) fn set_cfg(&mut self, cfg: Cfg) {
        self.cfg = cfg;
    }
}
