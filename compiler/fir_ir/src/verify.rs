//! Well-formedness checks.
//!
//! [`verify_abstraction`] checks one version; [`Verifier`] runs it over
//! the whole module after every successful mutation and collects what it
//! finds, tagged with the mutation that introduced it.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::visitor::{walk_cfg, walk_expression, Visitor};
use crate::{
    Abstraction, AbstractionId, BuiltinRegistry, Expression, IrError, Module, Mutation, Observer,
    Register, Returned, Statement, Variable,
};

/// Every well-formedness violation in `abstraction`, in a deterministic
/// order. Empty means well-formed.
pub fn verify_abstraction(
    abstraction: &Abstraction,
    builtins: Option<&BuiltinRegistry>,
) -> Vec<IrError> {
    let mut errors = Vec::new();
    let cfg = abstraction.cfg();

    // Structure.
    let reachable = cfg.reachable();
    for (id, block) in cfg.blocks() {
        if !reachable.contains(&id) {
            errors.push(IrError::UnreachableBlock(id));
        }
        if let Err(error) = cfg.check_jump(block.jump()) {
            errors.push(error);
        }
    }
    if cfg
        .block(cfg.entry())
        .is_some_and(|entry| !entry.params().is_empty())
    {
        errors.push(IrError::EntryHasParameters);
    }

    // Declarations: each register declared exactly once.
    let mut declared: FxHashSet<&str> = FxHashSet::default();
    let mut register_locals: FxHashSet<&str> = FxHashSet::default();
    let params = abstraction.params().iter().map(|p| &p.variable);
    let phis = cfg
        .blocks()
        .flat_map(|(_, b)| b.params().iter().map(|p| &p.variable));
    for register in params.chain(phis) {
        if !declared.insert(register.name()) {
            errors.push(IrError::RegisterRedefined(register.name().to_owned()));
        }
    }
    let mut named: FxHashSet<&str> = FxHashSet::default();
    for local in abstraction.locals() {
        match &local.variable {
            Variable::Register(r) => {
                if !declared.insert(r.name()) {
                    errors.push(IrError::RegisterRedefined(r.name().to_owned()));
                }
                register_locals.insert(r.name());
            }
            Variable::Named(n) => {
                named.insert(n.name());
            }
        }
    }
    let mut clashes: Vec<&str> = declared.intersection(&named).copied().collect();
    clashes.sort_unstable();
    errors.extend(
        clashes
            .into_iter()
            .map(|name| IrError::NamespaceClash(name.to_owned())),
    );

    // Uses and assignments.
    let mut checker = UseChecker {
        declared: &declared,
        register_locals: &register_locals,
        assigned: FxHashMap::default(),
        builtins,
        errors: &mut errors,
    };
    walk_cfg(&mut checker, cfg);

    errors
}

struct UseChecker<'a, 'e> {
    declared: &'a FxHashSet<&'a str>,
    register_locals: &'a FxHashSet<&'a str>,
    assigned: FxHashMap<String, usize>,
    builtins: Option<&'a BuiltinRegistry>,
    errors: &'e mut Vec<IrError>,
}

impl Visitor for UseChecker<'_, '_> {
    fn visit_statement(&mut self, statement: &Statement) {
        if let Some(dest) = &statement.dest {
            let name = dest.name();
            if !self.register_locals.contains(name) {
                self.errors.push(IrError::InvalidDestination(name.to_owned()));
            }
            let count = self.assigned.entry(name.to_owned()).or_insert(0);
            *count += 1;
            if *count == 2 {
                self.errors.push(IrError::RegisterRedefined(name.to_owned()));
            }
        }
        self.visit_expression(&statement.expr);
    }

    fn visit_expression(&mut self, expr: &Expression) {
        if let (Some(builtins), Expression::CallBuiltin { name, args }) = (self.builtins, expr) {
            if let Err(error) = builtins.check_call(name, args.len()) {
                self.errors.push(error);
            }
        }
        walk_expression(self, expr);
    }

    fn visit_register(&mut self, register: &Register) {
        if !self.declared.contains(register.name()) {
            self.errors
                .push(IrError::UndeclaredRegister(register.name().to_owned()));
        }
    }
}

// ── Observer ────────────────────────────────────────────────────────

/// A violation found after a mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// The mutation after which the module was found ill-formed, rendered.
    pub after: String,
    pub version: AbstractionId,
    pub error: IrError,
}

/// Observer that re-verifies the whole module after every successful
/// mutation.
///
/// Construction sites that build a body piecewise (add the locals after
/// the body, say) pass through transiently ill-formed states; only
/// inspect [`violations`](Self::violations) at points where the module is
/// meant to be complete, or [`clear`](Self::clear) before them.
#[derive(Clone, Debug, Default)]
pub struct Verifier {
    builtins: Option<Rc<BuiltinRegistry>>,
    violations: Rc<RefCell<Vec<Violation>>>,
}

impl Verifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also check builtin names and call arities.
    #[must_use]
    pub fn with_builtins(mut self, registry: Rc<BuiltinRegistry>) -> Self {
        self.builtins = Some(registry);
        self
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.violations.borrow().clone()
    }

    pub fn is_clean(&self) -> bool {
        self.violations.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.violations.borrow_mut().clear();
    }

    /// Verify every abstraction of `module` now.
    pub fn check(&self, module: &Module) -> Vec<(AbstractionId, IrError)> {
        let builtins = self.builtins.as_deref();
        module
            .abstractions()
            .flat_map(|abs| {
                verify_abstraction(abs, builtins)
                    .into_iter()
                    .map(move |error| (abs.id(), error))
            })
            .collect()
    }
}

impl Observer for Verifier {
    fn after(&mut self, module: &Module, mutation: &Mutation, outcome: Result<&Returned, &IrError>) {
        if outcome.is_err() {
            return;
        }
        let found = self.check(module);
        if found.is_empty() {
            return;
        }
        tracing::debug!(op = mutation.name(), violations = found.len(), "ill-formed after mutation");
        let after = mutation.to_string();
        self.violations
            .borrow_mut()
            .extend(found.into_iter().map(|(version, error)| Violation {
                after: after.clone(),
                version,
                error,
            }));
    }
}
