//! Function signatures and version-specificity ordering.

use std::cmp::Ordering;
use std::fmt;

use crate::{Concreteness, Effects, Kind, Ownership, Type};

/// Parameter types, return type and effects of a callable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature {
    pub params: Vec<Type>,
    pub return_type: Type,
    pub effects: Effects,
}

impl Signature {
    pub fn new(params: Vec<Type>, return_type: Type, effects: Effects) -> Signature {
        Signature {
            params,
            return_type,
            effects,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// A callable with this signature can stand in for one with `other`:
    /// same arity, contravariant parameters, covariant return and effects.
    pub fn is_subtype_of(&self, other: &Signature) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(mine, theirs)| theirs.is_subtype_of(mine))
            && self.return_type.is_subtype_of(&other.return_type)
            && self.effects.is_subset_of(other.effects)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -{}> {}", self.effects, self.return_type)
    }
}

/// Dispatch order between two parameter lists.
///
/// Lists with fewer parameters come first. Lists of equal length are then
/// compared by the generality of their parameters, taken as a multiset:
/// both lists' parameter ranks are sorted from most to least general and
/// compared lexicographically. Ranks never decrease along subtyping, so a
/// list that is pointwise below another always sorts before it. Remaining
/// ties fall back to the canonical type order.
///
/// This is a total order. Returns `Equal` only for identical lists.
pub fn cmp_specificity(a: &[Type], b: &[Type]) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| ranks(a).cmp(&ranks(b)))
        .then_with(|| a.cmp(b))
}

fn ranks(params: &[Type]) -> Vec<Generality> {
    let mut ranks: Vec<Generality> = params.iter().map(Generality::of).collect();
    ranks.sort_unstable_by(|x, y| y.cmp(x));
    ranks
}

/// How high a type sits in the lattice.
///
/// Compared field by field: every field is monotone in its component of
/// the subtype relation, so a strict subtype always has a strictly smaller
/// rank. Incomparable types get an arbitrary but fixed relative order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Generality {
    /// 0 for concrete value kinds, 1 for `V` and promises, 2 for `*`.
    tier: u8,
    ownership: u8,
    concreteness: u8,
    /// Promise value rank and effect count.
    promise: Option<(Box<Generality>, u32)>,
}

impl Generality {
    fn of(ty: &Type) -> Generality {
        let (tier, promise) = match &ty.kind {
            Kind::Scalar(_) | Kind::Vector(_) | Kind::Closure => (0, None),
            Kind::AnyValue => (1, None),
            Kind::Promise { value, effects } => (
                1,
                Some((Box::new(Generality::of(value)), effects.bits().count_ones())),
            ),
            Kind::Any => (2, None),
        };
        let ownership = match ty.ownership {
            Ownership::Fresh => 0,
            Ownership::Owned | Ownership::Borrowed => 1,
            Ownership::Shared => 2,
        };
        let concreteness = match ty.concreteness {
            Concreteness::Definite => 0,
            Concreteness::Maybe => 1,
        };
        Generality {
            tier,
            ownership,
            concreteness,
            promise,
        }
    }
}
