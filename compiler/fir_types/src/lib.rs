//! Static type lattice for the FIR compiler.
//!
//! This crate provides:
//!
//! - **Kinds** ([`Kind`]): the structural shape of a value. Below the tops
//!   [`Any`](Kind::Any) and [`AnyValue`](Kind::AnyValue) sit primitive
//!   scalars and vectors, closures, and promises (suspended computations).
//!
//! - **Ownership** ([`Ownership`]) and **concreteness** ([`Concreteness`]):
//!   two small independent lattices refining a kind.
//!
//! - **Types** ([`Type`]): `(Kind, Ownership, Concreteness)` with subtyping,
//!   union (join) and a total order for canonical sorting and map keys.
//!
//! - **Effects** ([`Effects`]) and **signatures** ([`Signature`]).
//!
//! # Design
//!
//! Every component forms a finite-height lattice so that fixed-point
//! analyses built on top of it terminate. Joining two *owned* values is not
//! an error: [`Type::union`] degrades the result and reports the event
//! through a callback, leaving the caller to decide which ownership-based
//! assumptions no longer hold.
//!
//! `Display` on every type here is the printer half of the textual IR
//! syntax; the parser half lives in `fir_syntax`.

mod effects;
mod kind;
mod ownership;
mod signature;
mod ty;

pub use effects::Effects;
pub use kind::{Kind, PrimitiveKind};
pub use ownership::{Concreteness, Ownership};
pub use signature::{cmp_specificity, Signature};
pub use ty::Type;
