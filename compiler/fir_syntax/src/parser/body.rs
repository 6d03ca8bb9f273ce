//! Basic blocks, jumps and whole CFGs.
//!
//! Jump targets may name blocks defined further down, so blocks are parsed
//! into [`BlockAst`]s whose jumps still carry labels. Once every block of
//! the body is known the labels are resolved in one pass and the CFG is
//! assembled through [`CfgBuilder`].

use fir_ir::{
    BlockId, Cfg, CfgBuilder, Expression, IrError, Jump, Parameter, Register, Statement, Target,
};
use rustc_hash::FxHashMap;

use super::Parser;
use crate::cursor::ParseResult;
use crate::{ErrorContext, Span};

/// A jump target whose block is still a label.
struct TargetAst {
    label: String,
    span: Span,
    phi_args: Vec<Expression>,
}

enum JumpAst {
    Goto(TargetAst),
    Branch {
        cond: Expression,
        if_true: TargetAst,
        if_false: TargetAst,
    },
    Return(Expression),
    Unreachable,
}

struct BlockAst {
    label: String,
    span: Span,
    params: Vec<Parameter>,
    statements: Vec<Statement>,
    jump: JumpAst,
}

impl Parser<'_> {
    /// Blocks up to the closing `}` of the version. The first block is the
    /// entry.
    pub(super) fn body(&mut self) -> ParseResult<Cfg> {
        self.c.skip_trivia();
        let start = self.c.pos();
        let mut blocks = Vec::new();
        while !self.c.at("}") && !self.c.at_end() {
            blocks.push(self.block()?);
        }
        let span = self.c.span_from(start);
        self.assemble(blocks, span)
    }

    fn block(&mut self) -> ParseResult<BlockAst> {
        self.within(ErrorContext::Block, |p| {
            p.c.skip_trivia();
            let start = p.c.pos();
            let label = p.c.ident()?;
            let span = p.c.span_from(start);
            let params = if p.c.at("(") {
                p.params()?
            } else {
                Vec::new()
            };
            p.c.expect(":")?;

            let mut statements = Vec::new();
            loop {
                if let Some(jump) = p.jump()? {
                    p.c.expect(";")?;
                    return Ok(BlockAst {
                        label,
                        span,
                        params,
                        statements,
                        jump,
                    });
                }
                if p.c.at("}") || p.c.at_end() {
                    return Err(p.c.error_span(span, &IrError::MissingJump(label).to_string()));
                }
                statements.push(p.statement()?);
            }
        })
    }

    /// `(reg: type, ...)`
    pub(super) fn params(&mut self) -> ParseResult<Vec<Parameter>> {
        self.c.expect("(")?;
        let mut params = Vec::new();
        if self.c.eat(")") {
            return Ok(params);
        }
        loop {
            let name = self.c.ident()?;
            self.c.expect(":")?;
            params.push(Parameter::new(Register::new(name), self.ty()?));
            if !self.c.eat(",") {
                break;
            }
        }
        self.c.expect(")")?;
        Ok(params)
    }

    fn jump(&mut self) -> ParseResult<Option<JumpAst>> {
        self.within(ErrorContext::Jump, |p| {
            let jump = if p.c.eat_keyword("goto") {
                JumpAst::Goto(p.target()?)
            } else if p.c.eat_keyword("branch") {
                let cond = p.expr()?;
                p.c.expect(",")?;
                let if_true = p.target()?;
                p.c.expect(",")?;
                let if_false = p.target()?;
                JumpAst::Branch {
                    cond,
                    if_true,
                    if_false,
                }
            } else if p.c.eat_keyword("return") {
                JumpAst::Return(p.expr()?)
            } else if p.c.eat_keyword("unreachable") {
                JumpAst::Unreachable
            } else {
                return Ok(None);
            };
            Ok(Some(jump))
        })
    }

    /// `label` or `label(args)`.
    fn target(&mut self) -> ParseResult<TargetAst> {
        self.within(ErrorContext::Target, |p| {
            p.c.skip_trivia();
            let start = p.c.pos();
            let label = p.c.ident()?;
            let span = p.c.span_from(start);
            let phi_args = if p.c.at("(") {
                p.list("(", ")")?
            } else {
                Vec::new()
            };
            Ok(TargetAst {
                label,
                span,
                phi_args,
            })
        })
    }

    // ── Assembly ────────────────────────────────────────────────────

    fn assemble(&self, blocks: Vec<BlockAst>, span: Span) -> ParseResult<Cfg> {
        let Some(entry) = blocks.first() else {
            return Err(self.c.error_span(span, "a version needs at least an entry block"));
        };
        if !entry.params.is_empty() {
            return Err(self
                .c
                .error_span(entry.span, &IrError::EntryHasParameters.to_string()));
        }

        let mut builder = CfgBuilder::new(&entry.label);
        let mut ids = vec![builder.entry()];
        let mut labels: FxHashMap<String, BlockId> = FxHashMap::default();
        labels.insert(entry.label.clone(), builder.entry());
        for block in &blocks[1..] {
            let id = builder.add_block(&block.label, block.params.clone());
            if labels.insert(block.label.clone(), id).is_some() {
                let error = IrError::DuplicateLabel(block.label.clone());
                return Err(self.c.error_span(block.span, &error.to_string()));
            }
            ids.push(id);
        }

        let spans: Vec<Span> = blocks.iter().map(|b| b.span).collect();
        for (block, &id) in blocks.into_iter().zip(&ids) {
            for statement in block.statements {
                builder.push(id, statement);
            }
            let jump = self.resolve(block.jump, &labels)?;
            builder.set_jump(id, jump);
        }

        builder.finish().map_err(|error| {
            let at = match &error {
                IrError::UnreachableBlock(id) => spans.get(id.index()).copied().unwrap_or(span),
                _ => span,
            };
            self.c.error_span(at, &error.to_string())
        })
    }

    fn resolve(&self, jump: JumpAst, labels: &FxHashMap<String, BlockId>) -> ParseResult<Jump> {
        Ok(match jump {
            JumpAst::Goto(target) => Jump::Goto(self.resolve_target(target, labels)?),
            JumpAst::Branch {
                cond,
                if_true,
                if_false,
            } => Jump::Branch {
                cond,
                if_true: self.resolve_target(if_true, labels)?,
                if_false: self.resolve_target(if_false, labels)?,
            },
            JumpAst::Return(value) => Jump::Return(value),
            JumpAst::Unreachable => Jump::Unreachable,
        })
    }

    fn resolve_target(
        &self,
        target: TargetAst,
        labels: &FxHashMap<String, BlockId>,
    ) -> ParseResult<Target> {
        let block = labels.get(target.label.as_str()).copied().ok_or_else(|| {
            self.c
                .error_span(target.span, &format!("no block labelled `{}`", target.label))
        })?;
        Ok(Target::new(block, target.phi_args))
    }
}
