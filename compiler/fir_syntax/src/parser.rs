//! Recursive descent parser for the textual IR.
//!
//! Each entity has its own entry point. Module and abstraction parsing
//! construct IR through the [`Module`] mutation API, so everything the
//! parser builds has passed the same validation as a compiler pass would.
//! Parsing is atomic: a failed parse returns an error and leaves no
//! partially built entity behind.

mod body;
mod expr;
mod item;
mod ty;

use fir_ir::{AbstractionId, Expression, FunctionId, Module, MutationError, Statement};
use fir_types::{Effects, Type};

use crate::cursor::{Cursor, ParseResult};
use crate::{ErrorContext, ParseError, Span};

/// Parser state.
pub(crate) struct Parser<'a> {
    c: Cursor<'a>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            c: Cursor::new(source),
        }
    }

    /// Run `f` with `context` as the innermost entity being parsed.
    fn within<T>(
        &mut self,
        context: ErrorContext,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.c.push_context(context);
        let result = f(self);
        self.c.pop_context();
        result
    }

    /// Report a rejected mutation at the text that requested it.
    fn mutation_error(&self, span: Span, error: &MutationError) -> ParseError {
        self.c.error_span(span, &error.error.to_string())
    }

    /// Parse one complete entity and require the input to end after it.
    fn complete<T>(mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let value = f(&mut self)?;
        self.c.expect_end()?;
        Ok(value)
    }
}

/// Parse a type such as `int`, `v(dbl)o`, `p(* +)` or `*!`.
pub fn parse_type(text: &str) -> Result<Type, ParseError> {
    Parser::new(text).complete(Parser::ty)
}

/// Parse an effect set code (`+` or `-`).
pub fn parse_effects(text: &str) -> Result<Effects, ParseError> {
    Parser::new(text).complete(Parser::effects)
}

/// Parse a single expression.
pub fn parse_expression(text: &str) -> Result<Expression, ParseError> {
    Parser::new(text).complete(Parser::expr)
}

/// Parse a single statement, including its terminating `;`.
pub fn parse_statement(text: &str) -> Result<Statement, ParseError> {
    Parser::new(text).complete(Parser::statement)
}

/// Parse one version and add it to `function` in `module`.
///
/// On error the module is left as it was.
pub fn parse_abstraction(
    module: &mut Module,
    function: FunctionId,
    text: &str,
) -> Result<AbstractionId, ParseError> {
    let mut parser = Parser::new(text);
    let version = parser.version()?;
    parser.c.expect_end()?;
    parser.install(module, function, version)
}

/// Parse a whole module.
pub fn parse_module(text: &str) -> Result<Module, ParseError> {
    let mut parser = Parser::new(text);
    let mut module = Module::new();
    parser.within(ErrorContext::Module, |p| {
        while !p.c.at_end() {
            p.function(&mut module)?;
        }
        Ok(())
    })?;
    tracing::debug!(
        module = %module.id(),
        functions = module.functions().count(),
        versions = module.abstractions().count(),
        "parsed module"
    );
    Ok(module)
}
