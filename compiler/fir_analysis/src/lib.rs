//! FIR - Analyses
//!
//! Flow analyses over the IR:
//! - [`DominatorTree`]: immediate dominators over a CFG
//! - [`Loops`]: natural loops, their nesting, and on-demand preheaders
//! - [`AbstractEnvHierarchy`]: the environment lattice used by abstract
//!   interpretation of named-variable accesses
//!
//! Analyses read the IR and never edit it, with one exception:
//! [`Loops::preheader`] may insert a block, and does so through the
//! module's recorded mutation API.

mod dominators;
mod env;
mod loops;

pub use dominators::DominatorTree;
pub use env::{
    AbstractEnv, AbstractEnvHierarchy, AbstractResult, AbstractValue, EnvNode, Resolution,
    StaticEnv,
};
pub use loops::{Loop, LoopId, Loops};
