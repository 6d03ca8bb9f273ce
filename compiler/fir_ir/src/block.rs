//! Basic blocks.

use crate::{Jump, Parameter, Statement};

/// A straight-line statement list ending in exactly one jump.
///
/// Fields are read-only outside the crate; structural edits go through
/// the module's recorded mutations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasicBlock {
    label: String,
    params: Vec<Parameter>,
    statements: Vec<Statement>,
    jump: Jump,
}

impl BasicBlock {
    pub(crate) fn new(
        label: String,
        params: Vec<Parameter>,
        statements: Vec<Statement>,
        jump: Jump,
    ) -> Self {
        Self {
            label,
            params,
            statements,
            jump,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Block parameters (phis), one per argument of every incoming target.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn jump(&self) -> &Jump {
        &self.jump
    }

    pub(crate) fn params_mut(&mut self) -> &mut Vec<Parameter> {
        &mut self.params
    }

    pub(crate) fn statements_mut(&mut self) -> &mut Vec<Statement> {
        &mut self.statements
    }

    pub(crate) fn jump_mut(&mut self) -> &mut Jump {
        &mut self.jump
    }

    pub(crate) fn set_jump(&mut self, jump: Jump) -> Jump {
        std::mem::replace(&mut self.jump, jump)
    }
}
