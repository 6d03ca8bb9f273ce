#![allow(clippy::unwrap_used, clippy::expect_used)]

use fir_ir::{NamedVariable, Register};
use fir_types::{Kind, Ownership, PrimitiveKind, Type};
use pretty_assertions::assert_eq;

use super::{
    AbstractEnv, AbstractEnvHierarchy, AbstractResult, AbstractValue, EnvNode, Resolution,
    StaticEnv,
};

fn local(name: &str) -> EnvNode {
    EnvNode::Local(Register::new(name))
}

fn global() -> EnvNode {
    EnvNode::Static(StaticEnv::Global)
}

fn var(name: &str) -> NamedVariable {
    NamedVariable::new(name)
}

fn int(source: &str) -> AbstractValue {
    AbstractValue::known(Register::new(source), Type::scalar(PrimitiveKind::Integer))
}

fn closure(source: &str) -> AbstractValue {
    AbstractValue::known(Register::new(source), Type::closure())
}

/// `e1 -> e0 -> <global>`, plus `e2` with an unknown parent.
///
/// `e0` binds `x` and `f` (a closure); `e1` binds `y` and `f` (an integer).
fn hierarchy() -> AbstractEnvHierarchy {
    let mut h = AbstractEnvHierarchy::new();
    let e0 = h.declare(local("e0"), global());
    e0.set(var("x"), int("r1"));
    e0.set(var("f"), closure("r2"));
    let e1 = h.declare(local("e1"), local("e0"));
    e1.set(var("y"), int("r3"));
    e1.set(var("f"), int("r4"));
    h.declare(local("e2"), EnvNode::UnknownParent);
    h
}

fn found_in(resolution: &Resolution) -> Option<&EnvNode> {
    match resolution {
        Resolution::Found { env, .. } => Some(env),
        _ => None,
    }
}

fn all_tracked() -> Resolution {
    Resolution::Unknown {
        candidates: vec![local("e0"), local("e1"), local("e2")],
    }
}

// ── Lookup ──────────────────────────────────────────────────────────

#[test]
fn lookup_walks_the_parent_chain() {
    let h = hierarchy();
    assert_eq!(found_in(&h.lookup(&local("e1"), &var("y"))), Some(&local("e1")));
    assert_eq!(found_in(&h.lookup(&local("e1"), &var("x"))), Some(&local("e0")));
    assert_eq!(
        h.lookup(&local("e1"), &var("z")),
        Resolution::Static(StaticEnv::Global)
    );
    let Resolution::Found { value, .. } = h.lookup(&local("e1"), &var("x")) else {
        panic!("x should resolve");
    };
    assert_eq!(value, int("r1"));
}

#[test]
fn lookup_super_starts_at_the_parent() {
    let h = hierarchy();
    assert_eq!(
        found_in(&h.lookup_super(&local("e1"), &var("x"))),
        Some(&local("e0"))
    );
    assert_eq!(
        h.lookup_super(&local("e1"), &var("y")),
        Resolution::Static(StaticEnv::Global)
    );
    assert_eq!(h.lookup_super(&local("nope"), &var("y")), all_tracked());
}

#[test]
fn lookup_fun_skips_non_closures() {
    let h = hierarchy();
    assert_eq!(found_in(&h.lookup(&local("e1"), &var("f"))), Some(&local("e1")));
    assert_eq!(
        found_in(&h.lookup_fun(&local("e1"), &var("f"))),
        Some(&local("e0"))
    );
}

#[test]
fn leaving_the_tracked_graph_returns_every_candidate() {
    let h = hierarchy();
    assert_eq!(h.lookup(&local("e2"), &var("x")), all_tracked());
    assert_eq!(h.lookup(&local("untracked"), &var("x")), all_tracked());

    let mut h = hierarchy();
    h.declare(local("e3"), EnvNode::Enclosing);
    let Resolution::Unknown { candidates } = h.lookup(&local("e3"), &var("x")) else {
        panic!("enclosing parent is opaque");
    };
    assert_eq!(candidates.len(), 4);
}

#[test]
fn aliases_resolve_to_their_environment() {
    let mut h = hierarchy();
    h.add_alias(Register::new("r9"), local("e1"));
    assert_eq!(h.resolve(&local("r9")), local("e1"));
    assert_eq!(found_in(&h.lookup(&local("r9"), &var("y"))), Some(&local("e1")));
    assert_eq!(h.resolve(&global()), global());
}

#[test]
fn potential_parents() {
    let h = hierarchy();
    assert_eq!(h.potential_parents(&local("e1")), [local("e0"), global()]);
    assert_eq!(h.potential_parents(&local("e2")), [EnvNode::UnknownParent]);
    assert!(h.potential_parents(&local("untracked")).is_empty());
}

// ── Dependencies, leaks and taint ───────────────────────────────────

#[test]
fn dependencies_on_opaque_environments_leak() {
    let mut h = hierarchy();
    assert_eq!(
        h.with_dependency(&local("e1"), &local("e2")),
        AbstractResult::Updated
    );
    assert_eq!(h.with_dependency(&local("e1"), &local("e2")), AbstractResult::None);
    assert!(h.env(&local("e1")).unwrap().reachable().contains(&local("e2")));
    assert!(!h.env(&local("e1")).unwrap().is_leaked());

    for opaque in [EnvNode::Enclosing, EnvNode::UnknownParent, global()] {
        let mut h = hierarchy();
        assert_eq!(
            h.with_dependency(&local("e2"), &opaque),
            AbstractResult::LostPrecision
        );
        assert!(h.env(&local("e2")).unwrap().is_leaked());
    }
}

#[test]
fn leaking_is_transitive_and_idempotent() {
    let mut h = hierarchy();
    h.with_dependency(&local("e1"), &local("e2"));

    assert_eq!(h.leaking(&local("e1")), AbstractResult::LostPrecision);
    for env in ["e0", "e1", "e2"] {
        assert!(h.env(&local(env)).unwrap().is_leaked(), "{env}");
    }
    let snapshot = h.clone();
    assert_eq!(h.leaking(&local("e1")), AbstractResult::None);
    assert_eq!(h, snapshot);
}

#[test]
fn tainting_leaked_forgets_contents() {
    let mut h = hierarchy();
    h.declare(global(), EnvNode::UnknownParent)
        .set(var("g"), int("r5"));
    h.leaking(&local("e0"));

    assert!(h.tainting_leaked());
    let e0 = h.env(&local("e0")).unwrap();
    assert!(e0.is_tainted());
    assert!(e0.get(&var("x")).unwrap().is_unknown());
    assert!(h.env(&global()).unwrap().is_tainted());
    assert!(!h.env(&local("e1")).unwrap().is_tainted());
    assert!(!h.tainting_leaked());

    // A tainted environment no longer answers lookups that reach it.
    assert_eq!(
        h.lookup(&local("e1"), &var("x")),
        Resolution::Unknown {
            candidates: vec![local("e0"), local("e1"), local("e2"), global()],
        }
    );
}

#[test]
fn global_is_always_tainted() {
    let mut h = AbstractEnvHierarchy::new();
    h.declare(global(), EnvNode::UnknownParent);
    assert!(h.tainting_leaked());
    assert!(h.env(&global()).unwrap().is_tainted());
}

#[test]
fn global_is_tainted_even_when_never_declared() {
    let mut h = hierarchy();
    assert!(h.env(&global()).is_none());
    assert!(h.tainting_leaked());
    assert!(h.env(&global()).unwrap().is_tainted());
    assert!(!h.env(&local("e0")).unwrap().is_tainted());
    assert!(!h.tainting_leaked());
    assert_eq!(
        h.lookup(&local("e1"), &var("zz")),
        Resolution::Static(StaticEnv::Global)
    );
}

// ── Merge ───────────────────────────────────────────────────────────

#[test]
fn merge_with_itself_changes_nothing() {
    let mut h = hierarchy();
    h.with_dependency(&local("e1"), &local("e2"));
    h.add_alias(Register::new("r9"), local("e1"));
    let copy = h.clone();
    assert_eq!(h.merge(&copy), AbstractResult::None);
    assert_eq!(h, copy);
}

#[test]
fn merge_joins_values_and_degrades_one_sided_bindings() {
    let mut left = AbstractEnvHierarchy::new();
    left.declare(local("e0"), global()).set(var("x"), int("r1"));

    let mut right = AbstractEnvHierarchy::new();
    let e0 = right.declare(local("e0"), global());
    e0.set(var("x"), int("r2"));
    e0.set(var("y"), int("r3"));

    assert_eq!(left.merge(&right), AbstractResult::LostPrecision);
    let e0 = left.env(&local("e0")).unwrap();
    let x = e0.get(&var("x")).unwrap();
    assert_eq!(
        x.sources().iter().map(Register::name).collect::<Vec<_>>(),
        ["r1", "r2"]
    );
    assert!(e0.get(&var("y")).unwrap().is_unknown());
    assert_eq!(e0.parent(), &global());
}

#[test]
fn environments_missing_on_one_side_merge_against_an_empty_one() {
    let mut left = hierarchy();
    let mut right = AbstractEnvHierarchy::new();
    right.declare(local("e5"), local("e0")).set(var("z"), int("r7"));

    let result = left.merge(&right);
    assert!(result >= AbstractResult::Updated);

    let e5 = left.env(&local("e5")).unwrap();
    assert!(e5.get(&var("z")).unwrap().is_unknown());
    assert_eq!(e5.parent(), &local("e0"));
    let e1 = left.env(&local("e1")).unwrap();
    assert!(e1.entries().all(|(_, value)| value.is_unknown()));
}

#[test]
fn merge_reports_the_most_severe_change() {
    let mut left = hierarchy();
    let mut right = hierarchy();
    right.env_mut(&local("e2")).unwrap().taint();
    assert_eq!(left.merge(&right), AbstractResult::Tainted);
    assert!(left.env(&local("e2")).unwrap().is_tainted());

    let mut left = hierarchy();
    left.declare(local("e2"), global());
    assert_eq!(left.merge(&hierarchy()), AbstractResult::LostPrecision);
    assert_eq!(
        left.env(&local("e2")).unwrap().parent(),
        &EnvNode::UnknownParent
    );
}

#[test]
fn one_sided_aliases_are_kept() {
    let mut left = hierarchy();
    let mut right = hierarchy();
    right.add_alias(Register::new("r9"), local("e1"));
    assert_eq!(left.merge(&right), AbstractResult::Updated);
    assert_eq!(left.resolve(&local("r9")), local("e1"));
}

#[test]
#[should_panic(expected = "differs between branches")]
fn disagreeing_aliases_are_a_bug() {
    let mut left = hierarchy();
    left.add_alias(Register::new("r9"), local("e0"));
    let mut right = hierarchy();
    right.add_alias(Register::new("r9"), local("e1"));
    left.merge(&right);
}

// ── Values ──────────────────────────────────────────────────────────

#[test]
fn value_merge() {
    let mut value = int("r1");
    let real = AbstractValue::known(Register::new("r2"), Type::scalar(PrimitiveKind::Real));
    assert_eq!(value.merge(&real), AbstractResult::Updated);
    assert_eq!(value.ty().kind, Kind::AnyValue);
    assert_eq!(value.merge(&real), AbstractResult::None);

    assert_eq!(value.merge(&AbstractValue::unknown()), AbstractResult::LostPrecision);
    assert!(value.is_unknown());
    assert!(value.sources().is_empty());
    assert_eq!(value.merge(&int("r3")), AbstractResult::None);
}

#[test]
fn joining_two_owned_values_loses_precision() {
    let owned = Type::scalar(PrimitiveKind::Integer).with_ownership(Ownership::Owned);
    let mut value = AbstractValue::known(Register::new("a"), owned.clone());
    let other = AbstractValue::known(
        Register::new("b"),
        Type::vector(PrimitiveKind::Integer).with_ownership(Ownership::Owned),
    );
    assert_eq!(value.merge(&other), AbstractResult::LostPrecision);
    assert_eq!(value.ty().ownership, Ownership::Shared);

    // Two owned resources of the same type are still two resources.
    let mut into = AbstractValue::known(Register::new("a"), owned.clone());
    assert_eq!(
        into.merge(&AbstractValue::known(Register::new("b"), owned.clone())),
        AbstractResult::LostPrecision
    );
    assert_eq!(into.ty().ownership, Ownership::Shared);
    assert_eq!(into.sources().len(), 2);
    assert_eq!(
        into.merge(&AbstractValue::known(Register::new("b"), owned.clone())),
        AbstractResult::None
    );

    // The same owned value on both paths is not a mismatch.
    let mut same = AbstractValue::known(Register::new("a"), owned.clone());
    assert_eq!(
        same.merge(&AbstractValue::known(Register::new("a"), owned)),
        AbstractResult::None
    );
    assert_eq!(same.ty().ownership, Ownership::Owned);
}

#[test]
fn results_are_ordered_by_severity() {
    use AbstractResult::{LostPrecision, Tainted, Updated};
    assert!(AbstractResult::None < Updated);
    assert!(Updated < LostPrecision);
    assert!(LostPrecision < Tainted);
    assert_eq!(Updated.join(Tainted), Tainted);

    let mut result = AbstractResult::default();
    assert!(!result.changed());
    result.update(LostPrecision);
    result.update(Updated);
    assert_eq!(result, LostPrecision);
}

#[test]
fn empty_env_has_unknown_parent() {
    let env = AbstractEnv::default();
    assert_eq!(env.parent(), &EnvNode::UnknownParent);
    assert!(!env.is_leaked());
}
