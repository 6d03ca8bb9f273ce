//! Value kinds.
//!
//! The kind hierarchy is closed: every consumer matches exhaustively, so a
//! new variant is a compile error everywhere it is not yet handled.
//!
//! ```text
//!                    Any
//!                  /     \
//!            AnyValue    Promise(T, e)
//!          /    |    \
//!   scalar(p) vector(p) closure
//! ```

use std::fmt;

use crate::{Concreteness, Effects, Type};

/// Primitive element type of scalars and vectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveKind {
    Logical,
    Integer,
    Real,
    Complex,
    String,
    Raw,
}

impl PrimitiveKind {
    /// All primitive kinds, in canonical order.
    pub const ALL: [PrimitiveKind; 6] = [
        PrimitiveKind::Logical,
        PrimitiveKind::Integer,
        PrimitiveKind::Real,
        PrimitiveKind::Complex,
        PrimitiveKind::String,
        PrimitiveKind::Raw,
    ];

    /// Three-letter textual code.
    pub fn code(self) -> &'static str {
        match self {
            PrimitiveKind::Logical => "lgl",
            PrimitiveKind::Integer => "int",
            PrimitiveKind::Real => "dbl",
            PrimitiveKind::Complex => "cpx",
            PrimitiveKind::String => "str",
            PrimitiveKind::Raw => "raw",
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: &str) -> Option<PrimitiveKind> {
        PrimitiveKind::ALL.into_iter().find(|p| p.code() == code)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Structural shape of a value's type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// Top: any value or promise.
    Any,
    /// Any forced value (everything except promises).
    AnyValue,
    /// Length-one primitive.
    Scalar(PrimitiveKind),
    /// Primitive vector of any length.
    Vector(PrimitiveKind),
    /// Function value.
    Closure,
    /// Suspended computation producing `value` with `effects` when forced.
    Promise { value: Box<Type>, effects: Effects },
}

impl Kind {
    /// Returns `true` for forced values (subtypes of [`AnyValue`](Kind::AnyValue)).
    pub fn is_value(&self) -> bool {
        !matches!(self, Kind::Any | Kind::Promise { .. })
    }

    /// Concreteness a type of this kind has unless stated otherwise.
    ///
    /// The top is an over-approximation by nature; everything else is
    /// assumed exact.
    pub fn default_concreteness(&self) -> Concreteness {
        match self {
            Kind::Any => Concreteness::Maybe,
            _ => Concreteness::Definite,
        }
    }

    /// Structural subtyping.
    ///
    /// Everything is below `Any`; everything except promises is below
    /// `AnyValue`; promises are covariant in both value type and effects.
    pub fn is_subtype_of(&self, other: &Kind) -> bool {
        match (self, other) {
            (_, Kind::Any) => true,
            (Kind::Any, _) => false,
            (_, Kind::AnyValue) => self.is_value(),
            (
                Kind::Promise {
                    value: a,
                    effects: ea,
                },
                Kind::Promise {
                    value: b,
                    effects: eb,
                },
            ) => a.is_subtype_of(b) && ea.is_subset_of(*eb),
            _ => self == other,
        }
    }

    /// Least upper bound, threading the ownership-mismatch callback into
    /// promise value types.
    pub(crate) fn union_with(&self, other: &Kind, on_owned_mismatch: &mut dyn FnMut()) -> Kind {
        if self.is_subtype_of(other) {
            return other.clone();
        }
        if other.is_subtype_of(self) {
            return self.clone();
        }
        match (self, other) {
            (
                Kind::Promise {
                    value: a,
                    effects: ea,
                },
                Kind::Promise {
                    value: b,
                    effects: eb,
                },
            ) => Kind::Promise {
                value: Box::new(a.union_with(b, on_owned_mismatch)),
                effects: ea.join(*eb),
            },
            _ if self.is_value() && other.is_value() => Kind::AnyValue,
            _ => Kind::Any,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Any => f.write_str("*"),
            Kind::AnyValue => f.write_str("V"),
            Kind::Scalar(p) => f.write_str(p.code()),
            Kind::Vector(p) => write!(f, "v({p})"),
            Kind::Closure => f.write_str("cls"),
            Kind::Promise { value, effects } => write!(f, "p({value} {effects})"),
        }
    }
}
