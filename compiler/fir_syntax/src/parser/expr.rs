//! Expressions and statements.
//!
//! Precedence, loosest first:
//!
//! ```text
//! assign  := prefix ("<-" assign | "<<-" assign)?
//! prefix  := "use" reg | "reflect" $var | "dup" prefix
//!          | "call" postfix "(" args ")" | postfix
//! postfix := atom ("[" expr "]")*
//! atom    := literal | reg | $var | "[" args "]" | "@" name "(" args ")"
//!          | "(" expr ")"
//! ```

use fir_ir::display::{is_ident_start, KEYWORDS};
use fir_ir::{Constant, Expression, NamedVariable, Register, Statement, Variable};

use super::Parser;
use crate::cursor::ParseResult;
use crate::ErrorContext;

impl Parser<'_> {
    pub(super) fn expr(&mut self) -> ParseResult<Expression> {
        self.within(ErrorContext::Expression, Parser::assign)
    }

    fn assign(&mut self) -> ParseResult<Expression> {
        self.c.skip_trivia();
        let start = self.c.pos();
        let lhs = self.prefix()?;
        if self.c.eat("<<-") {
            let value = Box::new(self.assign()?);
            return match lhs {
                Expression::Read(Variable::Named(variable)) => {
                    Ok(Expression::SuperWrite { variable, value })
                }
                _ => Err(self
                    .c
                    .error_at(start, "only a named variable can be assigned with `<<-`")),
            };
        }
        if self.c.eat("<-") {
            let value = Box::new(self.assign()?);
            return match lhs {
                Expression::Read(Variable::Named(variable)) => {
                    Ok(Expression::Write { variable, value })
                }
                Expression::SubscriptRead { target, index } => Ok(Expression::SubscriptWrite {
                    target,
                    index,
                    value,
                }),
                _ => Err(self.c.error_at(
                    start,
                    "only a named variable or a subscript can be assigned with `<-`",
                )),
            };
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> ParseResult<Expression> {
        if self.c.eat_keyword("use") {
            return Ok(Expression::Use(Register::new(self.c.ident()?)));
        }
        if self.c.eat_keyword("reflect") {
            self.c.expect("$")?;
            return Ok(Expression::ReflectiveRead(NamedVariable::new(self.c.ident()?)));
        }
        if self.c.eat_keyword("dup") {
            return Ok(Expression::Dup(Box::new(self.prefix()?)));
        }
        if self.c.eat_keyword("call") {
            let callee = Box::new(self.postfix()?);
            let args = self.list("(", ")")?;
            return Ok(Expression::Call { callee, args });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.atom()?;
        while self.c.eat("[") {
            let index = self.expr()?;
            self.c.expect("]")?;
            expr = Expression::SubscriptRead {
                target: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn atom(&mut self) -> ParseResult<Expression> {
        match self.c.peek() {
            Some('(') => {
                self.c.expect("(")?;
                let inner = self.expr()?;
                self.c.expect(")")?;
                Ok(inner)
            }
            Some('[') => self.list("[", "]").map(Expression::MkVector),
            Some('@') => {
                self.c.expect("@")?;
                let name = self.c.ident()?;
                let args = self.list("(", ")")?;
                Ok(Expression::CallBuiltin { name, args })
            }
            Some('$') => {
                self.c.expect("$")?;
                Ok(Expression::named(&self.c.ident()?))
            }
            Some('"') => self.within(ErrorContext::StringLiteral, |p| {
                p.c.expect("\"")?;
                Ok(Expression::Constant(Constant::Str(p.c.string_body()?)))
            }),
            Some('`') => Ok(Expression::register(&self.c.ident()?)),
            Some(c) if c.is_ascii_digit() || c == '-' => self.number(),
            Some(c) if is_ident_start(c) => self.word_atom(),
            _ => Err(self.c.unexpected("an expression")),
        }
    }

    /// Constant keyword or register name.
    fn word_atom(&mut self) -> ParseResult<Expression> {
        let start = self.c.pos();
        let constant = match self.c.word() {
            Some("NULL") => Constant::Null,
            Some("TRUE") => Constant::Logical(Some(true)),
            Some("FALSE") => Constant::Logical(Some(false)),
            Some("NA") => Constant::Logical(None),
            Some("NaN") => Constant::real(f64::NAN),
            Some("Inf") => Constant::real(f64::INFINITY),
            Some(word) if !KEYWORDS.contains(&word) => return Ok(Expression::register(word)),
            _ => {
                self.c.reset(start);
                return Err(self.c.unexpected("an expression"));
            }
        };
        Ok(Expression::Constant(constant))
    }

    /// Integer (`-12`) or real (`1.5`, `2e-3`, `-Inf`) literal.
    fn number(&mut self) -> ParseResult<Expression> {
        self.within(ErrorContext::Number, |p| {
            p.c.skip_trivia();
            let start = p.c.pos();
            let negative = p.c.eat_raw_if(|c| c == '-').is_some();
            if negative && p.c.eat_keyword("Inf") {
                return Ok(Expression::Constant(Constant::real(f64::NEG_INFINITY)));
            }
            if p.c.take_while(|c| c.is_ascii_digit()).is_empty() {
                return Err(p.c.unexpected("a digit"));
            }
            let mut real = false;
            if p.c.eat_raw_if(|c| c == '.').is_some() {
                real = true;
                if p.c.take_while(|c| c.is_ascii_digit()).is_empty() {
                    return Err(p.c.unexpected("a digit after `.`"));
                }
            }
            if p.c.eat_raw_if(|c| c == 'e' || c == 'E').is_some() {
                real = true;
                p.c.eat_raw_if(|c| c == '+' || c == '-');
                if p.c.take_while(|c| c.is_ascii_digit()).is_empty() {
                    return Err(p.c.unexpected("an exponent"));
                }
            }

            let text = p.c.slice(start);
            let constant = if real {
                text.parse::<f64>().ok().map(Constant::real)
            } else {
                text.parse::<i64>().ok().map(Constant::Integer)
            };
            constant
                .map(Expression::Constant)
                .ok_or_else(|| p.c.error_at(start, &format!("number `{text}` is out of range")))
        })
    }

    /// `open expr, ... close`, possibly empty.
    pub(super) fn list(&mut self, open: &str, close: &str) -> ParseResult<Vec<Expression>> {
        self.c.expect(open)?;
        let mut items = Vec::new();
        if self.c.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expr()?);
            if !self.c.eat(",") {
                break;
            }
        }
        self.c.expect(close)?;
        Ok(items)
    }

    /// `[reg =] expr;`
    pub(super) fn statement(&mut self) -> ParseResult<Statement> {
        self.within(ErrorContext::Statement, |p| {
            let dest = p.statement_dest();
            let expr = p.expr()?;
            p.c.expect(";")?;
            Ok(Statement { dest, expr })
        })
    }

    /// Consume `reg =` if the statement starts with one.
    fn statement_dest(&mut self) -> Option<Register> {
        let start = self.c.pos();
        if let Ok(name) = self.c.ident() {
            if self.c.eat("=") {
                return Some(Register::new(name));
            }
        }
        self.c.reset(start);
        None
    }
}
