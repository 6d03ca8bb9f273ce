//! Boundaries to collaborators outside the IR core.
//!
//! Front-ends populate a [`Module`] through its mutation API, code
//! generators read it, and specialization passes consult a feedback store.
//! None of them are implemented here.

use crate::{AbstractionId, Module, MutationError, Register};

/// Source construct the front-end has no IR encoding for.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported: {what}")]
pub struct Unsupported {
    pub what: String,
}

impl Unsupported {
    pub fn new(what: impl Into<String>) -> Self {
        Self { what: what.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    /// Skip or report; not a bug.
    #[error(transparent)]
    Unsupported(#[from] Unsupported),
    /// The front-end misused the mutation API.
    #[error(transparent)]
    Ir(#[from] MutationError),
}

/// Lowers some source representation into a module.
pub trait FrontEnd {
    type Source: ?Sized;

    /// Populate `module` using only its mutation methods.
    fn lower(&mut self, source: &Self::Source, module: &mut Module) -> Result<(), LowerError>;
}

/// Read-only consumer of a finished module.
pub trait CodeGenerator {
    type Output;
    type Error;

    fn generate(&mut self, module: &Module, version: AbstractionId) -> Result<Self::Output, Self::Error>;
}

/// Profiling summaries keyed by register, consulted by specialization.
pub trait FeedbackStore {
    type Summary;

    fn get(&self, version: AbstractionId, register: &Register) -> Option<&Self::Summary>;

    fn record(&mut self, version: AbstractionId, register: Register, summary: Self::Summary);
}
