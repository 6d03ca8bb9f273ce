#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::rc::Rc;

use fir_types::{Effects, PrimitiveKind, Type};
use pretty_assertions::assert_eq;

use crate::{
    AbstractionId, BlockId, CfgBuilder, Constant, Cursor, EventLog, Expression, FunctionId,
    IrError, Jump, Local, Module, Mutation, NamedVariable, Observer, Outcome, Parameter, Register,
    Returned, Statement, Target, Variable, Verifier,
};

fn param(name: &str, ty: Type) -> Parameter {
    Parameter::new(Register::new(name), ty)
}

fn int() -> Type {
    Type::scalar(PrimitiveKind::Integer)
}

fn reg_local(name: &str) -> Local {
    Local::new(Variable::Register(Register::new(name)), Type::any())
}

fn named_local(name: &str) -> Local {
    Local::new(Variable::Named(NamedVariable::new(name)), Type::any())
}

/// `f` with one version `(x: *) --> *` and an empty body.
fn module_with_version() -> (Module, FunctionId, AbstractionId) {
    let mut module = Module::new();
    let f = module.add_function("f").unwrap();
    let v = module
        .add_version(f, vec![param("x", Type::any())], Type::any(), Effects::NONE)
        .unwrap();
    (module, f, v)
}

/// Install `entry -> a -> b`, where `b` returns.
fn install_chain(module: &mut Module, v: AbstractionId) -> (BlockId, BlockId, BlockId) {
    let mut b = CfgBuilder::new("entry");
    let entry = b.entry();
    let a = b.add_block("a", Vec::new());
    let c = b.add_block("b", Vec::new());
    b.set_jump(entry, Jump::Goto(Target::plain(a)));
    b.set_jump(a, Jump::Goto(Target::plain(c)));
    b.set_jump(c, Jump::Return(Expression::register("x")));
    module.set_body(v, b.finish().unwrap()).unwrap();
    (entry, a, c)
}

fn labels(module: &Module, v: AbstractionId) -> Vec<String> {
    let cfg = module.abstraction(v).unwrap().cfg();
    cfg.depth_first()
        .map(|id| cfg.block(id).unwrap().label().to_owned())
        .collect()
}

// ── Functions and versions ──────────────────────────────────────────

#[test]
fn new_version_has_single_entry_block() {
    let (module, f, v) = module_with_version();
    let abs = module.abstraction(v).unwrap();
    assert_eq!(abs.function(), f);
    assert_eq!(abs.cfg().len(), 1);
    assert_eq!(abs.cfg().block(abs.cfg().entry()).unwrap().jump(), &Jump::Unreachable);
    assert_eq!(module.function(f).unwrap().versions(), &[v]);
}

#[test]
fn duplicate_function_names_are_rejected() {
    let (mut module, _, _) = module_with_version();
    let err = module.add_function("f").unwrap_err();
    assert_eq!(err.error, IrError::DuplicateFunction("f".into()));
    assert_eq!(
        err.to_string(),
        "add_function(\"f\") failed: function `f` already exists"
    );
}

#[test]
fn versions_are_kept_in_dispatch_order() {
    let mut module = Module::new();
    let f = module.add_function("g").unwrap();
    let mut add = |params: Vec<Type>| {
        let params = params
            .into_iter()
            .enumerate()
            .map(|(i, ty)| param(&format!("p{i}"), ty))
            .collect();
        module.add_version(f, params, Type::any(), Effects::ANY).unwrap()
    };
    let top = add(vec![Type::any()]);
    let narrow = add(vec![int()]);
    let pair = add(vec![int(), int()]);
    let nullary = add(Vec::new());

    assert_eq!(
        module.function(f).unwrap().versions(),
        &[nullary, narrow, pair, top]
    );
    let arities: Vec<usize> = module.versions(f).map(|a| a.params().len()).collect();
    assert_eq!(arities, vec![0, 1, 2, 1]);
}

#[test]
fn duplicate_versions_are_rejected() {
    let (mut module, f, _) = module_with_version();
    let err = module
        .add_version(f, vec![param("y", Type::any())], int(), Effects::ANY)
        .unwrap_err();
    assert_eq!(
        err.error,
        IrError::DuplicateVersion {
            function: "f".into(),
            params: "*".into(),
        }
    );
}

#[test]
fn duplicate_parameter_names_are_rejected() {
    let mut module = Module::new();
    let f = module.add_function("f").unwrap();
    let err = module
        .add_version(
            f,
            vec![param("x", Type::any()), param("x", int())],
            Type::any(),
            Effects::NONE,
        )
        .unwrap_err();
    assert_eq!(err.error, IrError::DuplicateLocal("x".into()));
}

#[test]
fn ids_from_another_module_are_foreign() {
    let (mut module, _, v) = module_with_version();
    let (_, other_f, _) = module_with_version();

    let err = module
        .add_version(other_f, Vec::new(), Type::any(), Effects::NONE)
        .unwrap_err();
    assert!(matches!(err.error, IrError::ForeignId { .. }));
    assert!(module.function(other_f).is_none());
    assert!(module.abstraction(v).is_some());
}

#[test]
fn removing_a_function_removes_its_versions() {
    let (mut module, f, v) = module_with_version();
    module.remove_function(f).unwrap();
    assert!(module.function(f).is_none());
    assert!(module.abstraction(v).is_none());
    assert!(module.function_by_name("f").is_none());
    assert!(module.add_function("f").is_ok());
}

#[test]
fn removing_a_version_detaches_it() {
    let (mut module, f, v) = module_with_version();
    module.remove_version(v).unwrap();
    assert!(module.function(f).unwrap().versions().is_empty());
    let err = module.remove_version(v).unwrap_err();
    assert!(matches!(err.error, IrError::UnknownVersion(_)));
}

// ── Bindings ────────────────────────────────────────────────────────

#[test]
fn locals_respect_both_namespaces() {
    let (mut module, _, v) = module_with_version();
    module.add_local(v, reg_local("r0")).unwrap();
    module.add_local(v, named_local("y")).unwrap();

    let dup = module.add_local(v, reg_local("x")).unwrap_err();
    assert_eq!(dup.error, IrError::DuplicateLocal("x".into()));
    let clash = module.add_local(v, named_local("x")).unwrap_err();
    assert_eq!(clash.error, IrError::NamespaceClash("x".into()));
    let clash = module.add_local(v, reg_local("y")).unwrap_err();
    assert_eq!(clash.error, IrError::NamespaceClash("y".into()));
    let dup = module.add_local(v, named_local("y")).unwrap_err();
    assert_eq!(dup.error, IrError::DuplicateLocal("y".into()));

    assert_eq!(module.abstraction(v).unwrap().locals().len(), 2);
}

#[test]
fn locals_in_use_cannot_be_removed() {
    let (mut module, _, v) = module_with_version();
    module.add_local(v, reg_local("r0")).unwrap();
    module.add_local(v, named_local("y")).unwrap();
    let entry = module.abstraction(v).unwrap().cfg().entry();
    module
        .insert_statement(
            v,
            entry,
            0,
            Statement::assign(Register::new("r0"), Expression::Use(Register::new("x"))),
        )
        .unwrap();

    let r0 = Variable::Register(Register::new("r0"));
    let err = module.remove_local(v, &r0).unwrap_err();
    assert_eq!(err.error, IrError::LocalInUse("r0".into()));

    let y = Variable::Named(NamedVariable::new("y"));
    module.remove_local(v, &y).unwrap();
    let err = module.remove_local(v, &y).unwrap_err();
    assert_eq!(err.error, IrError::UnknownLocal("$y".into()));

    module.remove_statement(v, entry, 0).unwrap();
    module.remove_local(v, &r0).unwrap();
    assert!(module.abstraction(v).unwrap().locals().is_empty());
}

#[test]
fn return_type_and_effects_are_recorded() {
    let (mut module, _, v) = module_with_version();
    module.set_return_type(v, int()).unwrap();
    module.set_return_effects(v, Effects::ANY).unwrap();
    let sig = module.abstraction(v).unwrap().signature();
    assert_eq!(sig.to_string(), "(*) -+> int");
}

#[test]
fn fresh_registers_skip_declared_names() {
    let (mut module, _, v) = module_with_version();
    module.add_local(v, reg_local("r0")).unwrap();
    let first = module.fresh_register(v).unwrap();
    let second = module.fresh_register(v).unwrap();
    assert_eq!(first, Register::new("r1"));
    assert_eq!(second, Register::new("r2"));
}

// ── CFG edits ───────────────────────────────────────────────────────

#[test]
fn statement_indices_are_checked() {
    let (mut module, _, v) = module_with_version();
    let entry = module.abstraction(v).unwrap().cfg().entry();
    let stmt = Statement::effect(Expression::named("y"));
    let err = module.insert_statement(v, entry, 1, stmt.clone()).unwrap_err();
    assert_eq!(err.error, IrError::IndexOutOfRange { index: 1, len: 0 });
    module.insert_statement(v, entry, 0, stmt.clone()).unwrap();
    assert_eq!(module.remove_statement(v, entry, 0).unwrap(), stmt);
    let err = module.remove_statement(v, entry, 0).unwrap_err();
    assert_eq!(err.error, IrError::IndexOutOfRange { index: 0, len: 0 });
}

#[test]
fn set_jump_removes_orphaned_blocks() {
    let (mut module, _, v) = module_with_version();
    let (entry, a, b) = install_chain(&mut module, v);

    let removed = module
        .set_jump(v, entry, Jump::Return(Expression::constant(Constant::Null)))
        .unwrap();
    assert_eq!(removed, vec![a, b]);
    assert_eq!(labels(&module, v), vec!["entry"]);
}

#[test]
fn set_jump_validates_targets() {
    let (mut module, _, v) = module_with_version();
    let (entry, a, _) = install_chain(&mut module, v);

    let err = module
        .set_jump(v, entry, Jump::Goto(Target::plain(BlockId::new(42))))
        .unwrap_err();
    assert_eq!(err.error, IrError::UnknownBlock(BlockId::new(42)));

    let err = module
        .set_jump(
            v,
            entry,
            Jump::Goto(Target::new(a, vec![Expression::register("x")])),
        )
        .unwrap_err();
    assert_eq!(
        err.error,
        IrError::PhiArity {
            block: a,
            expected: 0,
            found: 1,
        }
    );
    assert_eq!(labels(&module, v), vec!["entry", "a", "b"]);
}

#[test]
fn split_moves_tail_and_jump() {
    let (mut module, _, v) = module_with_version();
    let (_, _, b) = install_chain(&mut module, v);
    for (i, name) in ["p", "q", "s"].into_iter().enumerate() {
        module
            .insert_statement(v, b, i, Statement::effect(Expression::named(name)))
            .unwrap();
    }

    let new = module.split_new_successor(v, b, 1).unwrap();
    let cfg = module.abstraction(v).unwrap().cfg();
    assert_eq!(cfg.block(b).unwrap().statements().len(), 1);
    assert_eq!(cfg.block(b).unwrap().jump(), &Jump::Goto(Target::plain(new)));
    let tail = cfg.block(new).unwrap();
    assert_eq!(tail.label(), "b_1");
    assert_eq!(tail.statements().len(), 2);
    assert_eq!(tail.jump(), &Jump::Return(Expression::register("x")));

    let err = module.split_new_successor(v, b, 2).unwrap_err();
    assert_eq!(err.error, IrError::IndexOutOfRange { index: 2, len: 1 });
}

#[test]
fn split_at_end_leaves_empty_successor() {
    let (mut module, _, v) = module_with_version();
    let (entry, _, _) = install_chain(&mut module, v);
    let new = module.split_new_successor(v, entry, 0).unwrap();
    assert_eq!(labels(&module, v), vec!["entry", "entry_1", "a", "b"]);
    let cfg = module.abstraction(v).unwrap().cfg();
    assert!(cfg.block(new).unwrap().statements().is_empty());
}

#[test]
fn merge_with_successor_turns_phis_into_locals() {
    let (mut module, _, v) = module_with_version();
    let mut b = CfgBuilder::new("entry");
    let entry = b.entry();
    let next = b.add_block("next", vec![param("p", Type::any())]);
    b.push(entry, Statement::effect(Expression::named("y")));
    b.set_jump(
        entry,
        Jump::Goto(Target::new(next, vec![Expression::register("x")])),
    );
    b.push(next, Statement::effect(Expression::register("p")));
    b.set_jump(next, Jump::Return(Expression::register("p")));
    module.set_body(v, b.finish().unwrap()).unwrap();

    assert_eq!(module.merge_with_successor(v, entry).unwrap(), next);
    let abs = module.abstraction(v).unwrap();
    assert_eq!(abs.cfg().len(), 1);
    assert_eq!(abs.locals(), &[reg_local("p")]);
    let block = abs.cfg().block(entry).unwrap();
    assert_eq!(
        block.statements(),
        &[
            Statement::effect(Expression::named("y")),
            Statement::assign(Register::new("p"), Expression::register("x")),
            Statement::effect(Expression::register("p")),
        ]
    );
    assert_eq!(block.jump(), &Jump::Return(Expression::register("p")));
    assert!(crate::verify_abstraction(abs, None).is_empty());
}

#[test]
fn merge_requires_a_private_goto_successor() {
    let (mut module, _, v) = module_with_version();
    let (_, _, b) = install_chain(&mut module, v);
    let err = module.merge_with_successor(v, b).unwrap_err();
    assert_eq!(err.error, IrError::NotMergeable(b));
}

#[test]
fn remove_block_cuts_incoming_edges() {
    let (mut module, _, v) = module_with_version();
    let (entry, a, b) = install_chain(&mut module, v);

    let err = module.remove_block(v, entry).unwrap_err();
    assert_eq!(err.error, IrError::EntryBlock(entry));

    assert_eq!(module.remove_block(v, a).unwrap(), vec![a, b]);
    let cfg = module.abstraction(v).unwrap().cfg();
    assert_eq!(cfg.block(entry).unwrap().jump(), &Jump::Unreachable);
    assert_eq!(cfg.len(), 1);
}

#[test]
fn insert_preheader_splits_the_header() {
    // entry -> loop(i) ; loop -> (loop(j) | done)
    let (mut module, _, v) = module_with_version();
    module.add_local(v, reg_local("j")).unwrap();
    let mut b = CfgBuilder::new("entry");
    let entry = b.entry();
    let header = b.add_block("loop", vec![param("i", Type::any())]);
    let done = b.add_block("done", Vec::new());
    b.set_jump(
        entry,
        Jump::Goto(Target::new(header, vec![Expression::register("x")])),
    );
    b.push(
        header,
        Statement::assign(Register::new("j"), Expression::register("i")),
    );
    b.set_jump(
        header,
        Jump::Branch {
            cond: Expression::register("j"),
            if_true: Target::new(header, vec![Expression::register("j")]),
            if_false: Target::plain(done),
        },
    );
    b.set_jump(done, Jump::Return(Expression::register("j")));
    module.set_body(v, b.finish().unwrap()).unwrap();

    let new_header = module.insert_preheader(v, header, &[header]).unwrap();
    let abs = module.abstraction(v).unwrap();
    let cfg = abs.cfg();

    let pre = cfg.block(header).unwrap();
    assert_eq!(pre.params(), &[param("r0", Type::any())]);
    assert!(pre.statements().is_empty());
    assert_eq!(
        pre.jump(),
        &Jump::Goto(Target::new(new_header, vec![Expression::register("r0")]))
    );

    let body = cfg.block(new_header).unwrap();
    assert_eq!(body.label(), "loop_1");
    assert_eq!(body.params(), &[param("i", Type::any())]);
    assert_eq!(body.statements().len(), 1);
    assert_eq!(cfg.predecessors(new_header), vec![header, new_header]);
    assert_eq!(cfg.predecessors(header), vec![entry]);
    assert!(crate::verify_abstraction(abs, None).is_empty());
}

#[test]
fn insert_preheader_checks_latches() {
    let (mut module, _, v) = module_with_version();
    let (entry, a, b) = install_chain(&mut module, v);
    let err = module.insert_preheader(v, a, &[b]).unwrap_err();
    assert_eq!(err.error, IrError::NotALatch { latch: b, header: a });
    assert_eq!(labels(&module, v), vec!["entry", "a", "b"]);
    assert!(module.insert_preheader(v, a, &[entry]).is_ok());
}

// ── Observers ───────────────────────────────────────────────────────

struct Tagged {
    tag: &'static str,
    calls: Rc<RefCell<Vec<String>>>,
}

impl Observer for Tagged {
    fn before(&mut self, _module: &Module, mutation: &Mutation) {
        self.calls
            .borrow_mut()
            .push(format!("{} before {}", self.tag, mutation.name()));
    }

    fn after(
        &mut self,
        _module: &Module,
        mutation: &Mutation,
        outcome: Result<&Returned, &IrError>,
    ) {
        let status = if outcome.is_ok() { "ok" } else { "failed" };
        self.calls
            .borrow_mut()
            .push(format!("{} after {} {status}", self.tag, mutation.name()));
    }
}

#[test]
fn observers_bracket_every_call_in_registration_order() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut module = Module::new();
    for tag in ["first", "second"] {
        module.add_observer(Tagged {
            tag,
            calls: Rc::clone(&calls),
        });
    }

    module.add_function("f").unwrap();
    assert!(module.add_function("f").is_err());

    assert_eq!(
        *calls.borrow(),
        vec![
            "first before add_function",
            "second before add_function",
            "first after add_function ok",
            "second after add_function ok",
            "first before add_function",
            "second before add_function",
            "first after add_function failed",
            "second after add_function failed",
        ]
    );
}

#[test]
fn event_log_renders_a_trace() {
    let log = EventLog::new();
    let mut module = Module::new();
    module.add_observer(log.clone());

    let f = module.add_function("f").unwrap();
    module
        .add_version(f, vec![param("x", int())], Type::any(), Effects::ANY)
        .unwrap();
    let _ = module.add_function("f");

    let events = log.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].outcome, Some(Outcome::Ok(Returned::Function(f))));
    assert!(matches!(events[2].outcome, Some(Outcome::Failed(_))));

    let trace = log.trace();
    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(lines[0], format!("add_function(\"f\") -> {f}"));
    assert!(lines[1].starts_with(&format!("add_version({f}, [x: int], *, +) -> abs#")));
    assert!(lines[2].ends_with("FAILED: function `f` already exists"));
}

#[test]
fn failed_mutations_change_nothing() {
    let (mut module, _, v) = module_with_version();
    let (_, a, _) = install_chain(&mut module, v);
    let before = module.abstraction(v).unwrap().clone();

    assert!(module.split_new_successor(v, a, 5).is_err());
    assert!(module.remove_block(v, BlockId::new(99)).is_err());
    assert!(module.add_local(v, reg_local("x")).is_err());
    assert!(module.merge_with_successor(v, BlockId::new(2)).is_err());

    assert_eq!(module.abstraction(v).unwrap(), &before);
}

#[test]
fn verifier_reports_ill_formed_states() {
    let verifier = Verifier::new();
    let (mut module, _, v) = module_with_version();
    module.add_observer(verifier.clone());
    let entry = module.abstraction(v).unwrap().cfg().entry();

    module
        .insert_statement(
            v,
            entry,
            0,
            Statement::assign(Register::new("r0"), Expression::Use(Register::new("x"))),
        )
        .unwrap();
    let violations = verifier.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].error, IrError::InvalidDestination("r0".into()));
    assert!(violations[0].after.starts_with("insert_statement("));

    verifier.clear();
    module.add_local(v, reg_local("r0")).unwrap();
    module
        .set_jump(v, entry, Jump::Return(Expression::register("r0")))
        .unwrap();
    assert!(verifier.is_clean());
}

// ── Cursors ─────────────────────────────────────────────────────────

#[test]
fn cursor_defers_removal_to_the_next_step() {
    let (mut module, _, v) = module_with_version();
    let (entry, a, b) = install_chain(&mut module, v);

    let mut cursor = Cursor::depth_first(&module, v).unwrap();
    assert_eq!(cursor.advance(&mut module).unwrap(), Some(entry));
    assert_eq!(cursor.advance(&mut module).unwrap(), Some(a));
    cursor.remove_current();
    assert!(module.abstraction(v).unwrap().cfg().contains(a));

    assert_eq!(cursor.advance(&mut module).unwrap(), None);
    let cfg = module.abstraction(v).unwrap().cfg();
    assert!(!cfg.contains(a));
    assert!(!cfg.contains(b));
}

#[test]
fn cursor_sees_blocks_added_ahead_of_it() {
    let (mut module, _, v) = module_with_version();
    let (entry, a, b) = install_chain(&mut module, v);

    let mut cursor = Cursor::depth_first(&module, v).unwrap();
    assert_eq!(cursor.advance(&mut module).unwrap(), Some(entry));
    let new = module.split_new_successor(v, entry, 0).unwrap();

    let mut rest = Vec::new();
    while let Some(block) = cursor.advance(&mut module).unwrap() {
        rest.push(block);
    }
    assert_eq!(rest, vec![new, a, b]);
}

#[test]
fn reverse_cursor_starts_at_exits() {
    let (mut module, _, v) = module_with_version();
    let (entry, a, b) = install_chain(&mut module, v);

    let mut cursor = Cursor::reverse_depth_first(&module, v).unwrap();
    let mut seen = Vec::new();
    while let Some(block) = cursor.advance(&mut module).unwrap() {
        seen.push(block);
    }
    assert_eq!(seen, vec![b, a, entry]);
}
