//! Parse errors.

use crate::Span;

/// What the parser was working on when an error occurred.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorContext {
    // === Top-level ===
    Module,
    Function,
    Version,
    Locals,

    // === Blocks ===
    Block,
    Statement,
    Jump,
    Target,

    // === Leaves ===
    Expression,
    Type,
    Effects,
    StringLiteral,
    Number,
}

impl ErrorContext {
    /// Noun phrase for "while parsing ...".
    pub fn description(self) -> &'static str {
        match self {
            Self::Module => "a module",
            Self::Function => "a function",
            Self::Version => "a function version",
            Self::Locals => "local declarations",
            Self::Block => "a basic block",
            Self::Statement => "a statement",
            Self::Jump => "a jump",
            Self::Target => "a jump target",
            Self::Expression => "an expression",
            Self::Type => "a type",
            Self::Effects => "an effect set",
            Self::StringLiteral => "a string literal",
            Self::Number => "a number",
        }
    }
}

/// Textual input did not match the grammar, or described an ill-formed
/// module. Parsing is atomic: on error nothing is returned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{column}: {message}{}", while_parsing(*.context))]
pub struct ParseError {
    pub span: Span,
    /// One-based.
    pub line: u32,
    /// One-based, in characters.
    pub column: u32,
    pub message: String,
    /// Innermost entity being parsed.
    pub context: Option<ErrorContext>,
}

fn while_parsing(context: Option<ErrorContext>) -> String {
    context
        .map(|c| format!(" (while parsing {})", c.description()))
        .unwrap_or_default()
}
