//! FIR - Intermediate Representation
//!
//! This crate contains the IR data model and the protocol through which it
//! changes:
//! - Identifiers carrying their owning module (`FunctionId`, `AbstractionId`)
//! - Variables in two namespaces: registers and named variables
//! - Expressions, statements and jumps
//! - Basic blocks and CFGs, with derived successor/predecessor edges
//! - Abstractions (function versions), functions and modules
//! - Recorded mutations and their observers
//!
//! # Mutation Protocol
//!
//! IR objects expose read-only accessors. Every structural edit is a method
//! on [`Module`] that describes itself as a [`Mutation`], notifies every
//! registered [`Observer`] before and after running, and reports failure as
//! a [`MutationError`] naming the operation and its arguments. Operations
//! validate fully before mutating, so a failure changes nothing.
//!
//! # Design Philosophy
//!
//! - **Derived edges**: predecessors are computed from jumps, never stored
//! - **Stable ids**: removed blocks, functions and versions leave empty
//!   slots; ids are never reused
//! - **Explicit registries**: builtin tables are values passed around, not
//!   global state
//!
//! Reals are stored as `u64` bits so every IR type is `Eq + Hash`.

mod abstraction;
mod block;
mod builder;
mod builtins;
mod cfg;
pub mod display;
mod error;
mod expr;
mod function;
mod ids;
mod interfaces;
mod jump;
mod module;
mod mutation;
mod observer;
pub mod traverse;
mod variable;
pub mod verify;
pub mod visitor;

pub use abstraction::{Abstraction, ENTRY_LABEL};
pub use block::BasicBlock;
pub use builder::CfgBuilder;
pub use builtins::{BuiltinKind, BuiltinRegistry, BuiltinRegistryBuilder};
pub use cfg::Cfg;
pub use error::IrError;
pub use expr::{Constant, Expression, Instruction, Statement};
pub use function::Function;
pub use ids::{AbstractionId, BlockId, FunctionId, ModuleId};
pub use interfaces::{CodeGenerator, FeedbackStore, FrontEnd, LowerError, Unsupported};
pub use jump::{Jump, Target};
pub use module::Module;
pub use mutation::{Mutation, MutationError, Returned};
pub use observer::{Event, EventLog, Observer, Outcome, TracingObserver};
pub use traverse::{Blocks, Cursor};
pub use variable::{Binding, Local, NamedVariable, Parameter, Register, Variable};
pub use verify::{verify_abstraction, Verifier, Violation};
