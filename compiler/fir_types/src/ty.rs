//! The composed static type.

use std::fmt;

use crate::{Concreteness, Effects, Kind, Ownership, PrimitiveKind};

/// A static type: `(Kind, Ownership, Concreteness)`.
///
/// The derived `Ord` compares the three components in that order and is
/// the canonical total order used for sorting and as a map key. It is
/// unrelated to subtyping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Type {
    pub kind: Kind,
    pub ownership: Ownership,
    pub concreteness: Concreteness,
}

impl Type {
    /// A shared type of `kind` with the kind's default concreteness.
    pub fn new(kind: Kind) -> Type {
        let concreteness = kind.default_concreteness();
        Type {
            kind,
            ownership: Ownership::Shared,
            concreteness,
        }
    }

    /// `*`: the top type.
    pub fn any() -> Type {
        Type::new(Kind::Any)
    }

    /// `V`: any forced value.
    pub fn any_value() -> Type {
        Type::new(Kind::AnyValue)
    }

    pub fn scalar(primitive: PrimitiveKind) -> Type {
        Type::new(Kind::Scalar(primitive))
    }

    pub fn vector(primitive: PrimitiveKind) -> Type {
        Type::new(Kind::Vector(primitive))
    }

    pub fn closure() -> Type {
        Type::new(Kind::Closure)
    }

    pub fn promise(value: Type, effects: Effects) -> Type {
        Type::new(Kind::Promise {
            value: Box::new(value),
            effects,
        })
    }

    #[must_use]
    pub fn with_ownership(mut self, ownership: Ownership) -> Type {
        self.ownership = ownership;
        self
    }

    #[must_use]
    pub fn with_concreteness(mut self, concreteness: Concreteness) -> Type {
        self.concreteness = concreteness;
        self
    }

    /// Componentwise subtyping.
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        self.kind.is_subtype_of(&other.kind)
            && self.ownership.is_subtype_of(other.ownership)
            && self.concreteness.is_subtype_of(other.concreteness)
    }

    /// Least upper bound of two types.
    ///
    /// `on_owned_mismatch` is invoked when two distinct *owned* values are
    /// joined (at the top level or inside promise value types). The result
    /// then degrades to `shared`, and any optimization relying on exclusive
    /// ownership past the join point is unsound.
    ///
    /// Joining a type with itself returns it unchanged and never signals.
    #[must_use]
    pub fn union(&self, other: &Type, mut on_owned_mismatch: impl FnMut()) -> Type {
        self.union_with(other, &mut on_owned_mismatch)
    }

    pub(crate) fn union_with(&self, other: &Type, on_owned_mismatch: &mut dyn FnMut()) -> Type {
        if self == other {
            return self.clone();
        }
        let kind = self.kind.union_with(&other.kind, on_owned_mismatch);
        let ownership =
            if self.ownership == Ownership::Owned && other.ownership == Ownership::Owned {
                on_owned_mismatch();
                Ownership::Shared
            } else {
                self.ownership.union(other.ownership)
            };
        Type {
            kind,
            ownership,
            concreteness: self.concreteness.union(other.concreteness),
        }
    }

    /// Returns `true` if a value of this type may be a closure.
    ///
    /// Used by function lookup, which skips bindings that provably hold a
    /// non-function value.
    pub fn may_be_closure(&self) -> bool {
        match &self.kind {
            Kind::Any | Kind::AnyValue | Kind::Closure => true,
            Kind::Promise { value, .. } => value.may_be_closure(),
            Kind::Scalar(_) | Kind::Vector(_) => false,
        }
    }
}

impl fmt::Display for Type {
    /// `<kind><ownership?><concreteness?>`; defaults are elided.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.ownership.suffix())?;
        if self.concreteness != self.kind.default_concreteness() {
            write!(f, "{}", self.concreteness.suffix())?;
        }
        Ok(())
    }
}
