//! Side-effect summaries.
//!
//! Effects are currently a single flag (may the code perform arbitrary
//! reflection?) and form the two-element lattice `NONE ⊑ ANY`. They are
//! kept as bitflags so further effect kinds can be added without changing
//! the subset/union algebra.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Summary of what a computation may do besides producing its value.
    ///
    /// Ordered by inclusion: `a.is_subset_of(b)` is the lattice order.
    #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Effects: u8 {
        /// May read or write arbitrary bindings reflectively.
        const REFLECT = 1 << 0;
    }
}

impl Effects {
    /// Pure: no effect beyond producing a value.
    pub const NONE: Effects = Effects::empty();

    /// Top of the lattice: anything may happen.
    pub const ANY: Effects = Effects::all();

    /// Lattice order.
    #[inline]
    pub fn is_subset_of(self, other: Effects) -> bool {
        other.contains(self)
    }

    /// Lattice join.
    #[inline]
    #[must_use]
    pub fn join(self, other: Effects) -> Effects {
        self | other
    }

    /// Returns `true` if arbitrary reflection may occur.
    #[inline]
    pub fn may_reflect(self) -> bool {
        self.contains(Effects::REFLECT)
    }

    /// Textual code: `+` when reflection may occur, `-` when pure.
    pub fn code(self) -> char {
        if self.may_reflect() {
            '+'
        } else {
            '-'
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: char) -> Option<Effects> {
        match code {
            '+' => Some(Effects::ANY),
            '-' => Some(Effects::NONE),
            _ => None,
        }
    }
}

impl fmt::Display for Effects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
