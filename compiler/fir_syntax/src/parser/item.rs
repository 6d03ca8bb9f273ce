//! Functions and versions.

use fir_ir::{
    AbstractionId, Cfg, FunctionId, Local, Module, NamedVariable, Parameter, Register, Variable,
};
use fir_types::{Effects, Type};

use super::Parser;
use crate::cursor::ParseResult;
use crate::{ErrorContext, ParseError, Span};

/// A parsed version not yet added to a module.
pub(super) struct VersionAst {
    span: Span,
    params: Vec<Parameter>,
    effects: Effects,
    return_type: Type,
    locals: Vec<(Local, Span)>,
    cfg: Cfg,
}

impl Parser<'_> {
    /// `fun name { version* }`
    pub(super) fn function(&mut self, module: &mut Module) -> ParseResult<()> {
        self.within(ErrorContext::Function, |p| {
            if !p.c.eat_keyword("fun") {
                return Err(p.c.unexpected("`fun`"));
            }
            p.c.skip_trivia();
            let start = p.c.pos();
            let name = p.c.ident()?;
            let span = p.c.span_from(start);
            let function = module
                .add_function(&name)
                .map_err(|e| p.mutation_error(span, &e))?;
            p.c.expect("{")?;
            while !p.c.eat("}") {
                let version = p.version()?;
                p.install(module, function, version)?;
            }
            Ok(())
        })
    }

    /// `(params) -effects> type { locals | blocks }`
    pub(super) fn version(&mut self) -> ParseResult<VersionAst> {
        self.within(ErrorContext::Version, |p| {
            p.c.skip_trivia();
            let start = p.c.pos();
            let params = p.params()?;
            p.c.expect("-")?;
            let effects = p.effects()?;
            p.c.expect(">")?;
            let return_type = p.ty()?;
            let span = p.c.span_from(start);

            p.c.expect("{")?;
            let locals = p.locals()?;
            p.c.expect("|")?;
            let cfg = p.body()?;
            p.c.expect("}")?;

            Ok(VersionAst {
                span,
                params,
                effects,
                return_type,
                locals,
                cfg,
            })
        })
    }

    /// `variable: type, ...` up to the `|`.
    fn locals(&mut self) -> ParseResult<Vec<(Local, Span)>> {
        self.within(ErrorContext::Locals, |p| {
            let mut locals = Vec::new();
            if p.c.at("|") {
                return Ok(locals);
            }
            loop {
                p.c.skip_trivia();
                let start = p.c.pos();
                let variable = if p.c.eat("$") {
                    Variable::Named(NamedVariable::new(p.c.ident()?))
                } else {
                    Variable::Register(Register::new(p.c.ident()?))
                };
                let span = p.c.span_from(start);
                p.c.expect(":")?;
                locals.push((Local::new(variable, p.ty()?), span));
                if !p.c.eat(",") {
                    return Ok(locals);
                }
            }
        })
    }

    /// Add a parsed version to `function`. If a local is rejected the
    /// version is removed again, leaving the module as it was.
    pub(super) fn install(
        &self,
        module: &mut Module,
        function: FunctionId,
        version: VersionAst,
    ) -> ParseResult<AbstractionId> {
        let VersionAst {
            span,
            params,
            effects,
            return_type,
            locals,
            cfg,
        } = version;
        let id = module
            .add_version(function, params, return_type, effects)
            .map_err(|e| self.mutation_error(span, &e))?;

        let installed = locals
            .into_iter()
            .try_for_each(|(local, at)| {
                module
                    .add_local(id, local)
                    .map_err(|e| self.mutation_error(at, &e))
            })
            .and_then(|()| {
                module
                    .set_body(id, cfg)
                    .map_err(|e| self.mutation_error(span, &e))
            });

        match installed {
            Ok(()) => Ok(id),
            Err(error) => Err(self.roll_back(module, id, span, error)),
        }
    }

    fn roll_back(
        &self,
        module: &mut Module,
        id: AbstractionId,
        span: Span,
        error: ParseError,
    ) -> ParseError {
        match module.remove_version(id) {
            Ok(()) => error,
            Err(e) => self.mutation_error(span, &e),
        }
    }
}
