//! Ownership and concreteness lattices.
//!
//! Both refine a [`Kind`](crate::Kind) independently of the value shape.
//!
//! ```text
//!          Shared              Maybe
//!         /      \               |
//!      Owned   Borrowed       Definite
//!        |
//!      Fresh
//! ```

use std::fmt;

/// Whether a value is exclusively held, used to decide when in-place
/// mutation is safe.
///
/// Declaration order is the canonical total order used for sorting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ownership {
    /// Freshly allocated; nobody else can hold a reference yet.
    Fresh,
    /// Exclusively owned by the holder.
    Owned,
    /// Lent by an owner that outlives the holder; must not be mutated.
    Borrowed,
    /// May be aliased arbitrarily. Top of the lattice and the default.
    Shared,
}

impl Ownership {
    /// All ownership states, in canonical order.
    pub const ALL: [Ownership; 4] = [
        Ownership::Fresh,
        Ownership::Owned,
        Ownership::Borrowed,
        Ownership::Shared,
    ];

    /// Lattice order.
    pub fn is_subtype_of(self, other: Ownership) -> bool {
        self == other
            || other == Ownership::Shared
            || (self == Ownership::Fresh && other == Ownership::Owned)
    }

    /// Least upper bound.
    ///
    /// This is the plain lattice join; the owned/owned mismatch signal is
    /// raised one level up by [`Type::union`](crate::Type::union), which
    /// knows whether the two operands are distinct values.
    #[must_use]
    pub fn union(self, other: Ownership) -> Ownership {
        if self.is_subtype_of(other) {
            other
        } else if other.is_subtype_of(self) {
            self
        } else {
            Ownership::Shared
        }
    }

    /// Returns `true` for states that grant exclusive access.
    pub fn is_exclusive(self) -> bool {
        matches!(self, Ownership::Fresh | Ownership::Owned)
    }

    /// Textual suffix. `Shared` is the default and prints as nothing.
    pub fn suffix(self) -> &'static str {
        match self {
            Ownership::Fresh => "f",
            Ownership::Owned => "o",
            Ownership::Borrowed => "b",
            Ownership::Shared => "",
        }
    }

    /// Parses an explicit suffix character (`f`, `o`, `b`, `s`).
    pub fn from_suffix(c: char) -> Option<Ownership> {
        match c {
            'f' => Some(Ownership::Fresh),
            'o' => Some(Ownership::Owned),
            'b' => Some(Ownership::Borrowed),
            's' => Some(Ownership::Shared),
            _ => None,
        }
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ownership::Fresh => "fresh",
            Ownership::Owned => "owned",
            Ownership::Borrowed => "borrowed",
            Ownership::Shared => "shared",
        })
    }
}

/// Whether a static type is exact or an over-approximation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Concreteness {
    /// The runtime value has exactly this type.
    Definite,
    /// The runtime value has this type or a subtype of it.
    Maybe,
}

impl Concreteness {
    /// Lattice order: `Definite ⊑ Maybe`.
    pub fn is_subtype_of(self, other: Concreteness) -> bool {
        self == other || other == Concreteness::Maybe
    }

    /// `Maybe` if either operand is `Maybe`.
    #[must_use]
    pub fn union(self, other: Concreteness) -> Concreteness {
        if self == Concreteness::Maybe || other == Concreteness::Maybe {
            Concreteness::Maybe
        } else {
            Concreteness::Definite
        }
    }

    /// Textual suffix (`!` or `?`).
    pub fn suffix(self) -> char {
        match self {
            Concreteness::Definite => '!',
            Concreteness::Maybe => '?',
        }
    }

    /// Inverse of [`suffix`](Self::suffix).
    pub fn from_suffix(c: char) -> Option<Concreteness> {
        match c {
            '!' => Some(Concreteness::Definite),
            '?' => Some(Concreteness::Maybe),
            _ => None,
        }
    }
}
