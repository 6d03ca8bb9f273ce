//! Property-based tests for the abstract environment lattice.
//!
//! Merging must be monotone so that fixed-point iteration over a CFG
//! terminates: a merge never makes a hierarchy more precise, and merging
//! the same state twice reports no change the second time.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use fir_analysis::{AbstractEnvHierarchy, AbstractResult, AbstractValue, EnvNode, StaticEnv};
use fir_ir::{NamedVariable, Register};
use fir_types::{Ownership, PrimitiveKind, Type};
use proptest::collection::vec;
use proptest::prelude::*;

// -- Strategies --

const ENVS: usize = 3;
const NAMES: [&str; 3] = ["x", "y", "f"];

fn env(index: usize) -> EnvNode {
    EnvNode::Local(Register::new(format!("e{index}")))
}

fn type_strategy() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::any()),
        Just(Type::closure()),
        Just(Type::scalar(PrimitiveKind::Integer)),
        Just(Type::scalar(PrimitiveKind::Real)),
        Just(Type::scalar(PrimitiveKind::Integer).with_ownership(Ownership::Owned)),
        Just(Type::vector(PrimitiveKind::Integer).with_ownership(Ownership::Owned)),
    ]
}

fn parent_strategy() -> impl Strategy<Value = EnvNode> {
    prop_oneof![
        Just(EnvNode::UnknownParent),
        Just(EnvNode::Enclosing),
        Just(EnvNode::Static(StaticEnv::Global)),
        (0..ENVS).prop_map(env),
    ]
}

/// One step building up a hierarchy.
#[derive(Clone, Debug)]
enum Op {
    Declare(usize, EnvNode),
    Set(usize, usize, u8, Type),
    Depend(usize, EnvNode),
    Leak(usize),
    Taint,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ENVS, parent_strategy()).prop_map(|(e, p)| Op::Declare(e, p)),
        (0..ENVS, 0..NAMES.len(), 0..4u8, type_strategy())
            .prop_map(|(e, n, r, t)| Op::Set(e, n, r, t)),
        (0..ENVS, parent_strategy()).prop_map(|(e, to)| Op::Depend(e, to)),
        (0..ENVS).prop_map(Op::Leak),
        Just(Op::Taint),
    ]
}

fn build(ops: &[Op]) -> AbstractEnvHierarchy {
    let mut h = AbstractEnvHierarchy::new();
    for op in ops {
        match op {
            Op::Declare(e, parent) => {
                h.declare(env(*e), parent.clone());
            }
            Op::Set(e, name, source, ty) => {
                if let Some(tracked) = h.env_mut(&env(*e)) {
                    tracked.set(
                        NamedVariable::new(NAMES[*name]),
                        AbstractValue::known(Register::new(format!("r{source}")), ty.clone()),
                    );
                }
            }
            Op::Depend(e, to) => {
                h.with_dependency(&env(*e), to);
            }
            Op::Leak(e) => {
                h.leaking(&env(*e));
            }
            Op::Taint => {
                h.tainting_leaked();
            }
        }
    }
    h
}

fn hierarchy_strategy() -> impl Strategy<Value = AbstractEnvHierarchy> {
    vec(op_strategy(), 0..12).prop_map(|ops| build(&ops))
}

/// `merged` knows nothing about a binding that `before` did not know.
fn no_precision_gained(before: &AbstractEnvHierarchy, merged: &AbstractEnvHierarchy) -> bool {
    merged.tracked().iter().all(|node| {
        let Some(env) = merged.env(node) else {
            return false;
        };
        env.entries().all(|(name, value)| {
            if value.is_unknown() {
                return true;
            }
            let Some(old) = before.env(node).and_then(|e| e.get(name)) else {
                return false;
            };
            !old.is_unknown()
                && old.sources().is_subset(value.sources())
                && old.ty().is_subtype_of(value.ty())
        })
    })
}

proptest! {
    #[test]
    fn merging_with_itself_is_a_no_op(h in hierarchy_strategy()) {
        let mut merged = h.clone();
        prop_assert_eq!(merged.merge(&h), AbstractResult::None);
        prop_assert_eq!(merged, h);
    }

    #[test]
    fn merging_twice_reports_no_change(a in hierarchy_strategy(), b in hierarchy_strategy()) {
        let mut merged = a.clone();
        merged.merge(&b);
        let settled = merged.clone();
        prop_assert_eq!(merged.merge(&b), AbstractResult::None);
        prop_assert_eq!(merged, settled);
    }

    #[test]
    fn merge_never_gains_precision(a in hierarchy_strategy(), b in hierarchy_strategy()) {
        let mut merged = a.clone();
        merged.merge(&b);
        prop_assert!(no_precision_gained(&a, &merged));
        prop_assert!(no_precision_gained(&b, &merged));
    }

    #[test]
    fn leaking_is_idempotent(a in hierarchy_strategy(), e in 0..ENVS) {
        let mut h = a.clone();
        h.leaking(&env(e));
        let once = h.clone();
        prop_assert_eq!(h.leaking(&env(e)), AbstractResult::None);
        prop_assert_eq!(h, once);
    }
}
