//! Textual rendering of IR entities.
//!
//! These impls define the printed normal form that `fir_syntax` parses
//! back. Jumps need block labels, which only the owning CFG knows, so
//! [`fmt_jump`] takes a label lookup; the plain `Display` for [`Jump`]
//! falls back to raw block ids.

use std::fmt::{self, Display, Write as _};

use crate::{
    Binding, BlockId, Constant, Expression, Jump, NamedVariable, Register, Statement, Target,
    Variable,
};

/// Words that cannot appear unquoted as register, variable, or label names.
pub const KEYWORDS: &[&str] = &[
    "NULL",
    "TRUE",
    "FALSE",
    "NA",
    "NaN",
    "Inf",
    "use",
    "reflect",
    "dup",
    "call",
    "goto",
    "branch",
    "return",
    "unreachable",
    "fun",
];

// ── Identifiers ─────────────────────────────────────────────────────

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Whether `name` can be printed without backticks.
pub fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start)
        && chars.all(is_ident_continue)
        && !KEYWORDS.contains(&name)
}

/// Write `name` bare when possible, otherwise backtick-quoted with `` ` ``
/// and `\` escaped.
pub fn write_ident(f: &mut impl fmt::Write, name: &str) -> fmt::Result {
    if is_plain_ident(name) {
        return f.write_str(name);
    }
    f.write_char('`')?;
    for c in name.chars() {
        if c == '`' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('`')
}

impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ident(f, self.name())
    }
}

impl Display for NamedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('$')?;
        write_ident(f, self.name())
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Register(r) => r.fmt(f),
            Variable::Named(n) => n.fmt(f),
        }
    }
}

impl<V: Display> Display for Binding<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.variable, self.ty)
    }
}

// ── Constants ───────────────────────────────────────────────────────

impl Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => f.write_str("NULL"),
            Constant::Logical(Some(true)) => f.write_str("TRUE"),
            Constant::Logical(Some(false)) => f.write_str("FALSE"),
            Constant::Logical(None) => f.write_str("NA"),
            Constant::Integer(n) => write!(f, "{n}"),
            Constant::Real(bits) => {
                let value = f64::from_bits(*bits);
                if value.is_nan() {
                    f.write_str("NaN")
                } else if value.is_infinite() {
                    f.write_str(if value > 0.0 { "Inf" } else { "-Inf" })
                } else {
                    // `{:?}` always keeps a `.` or exponent, so the text
                    // reparses as a real rather than an integer.
                    write!(f, "{value:?}")
                }
            }
            Constant::Str(s) => {
                f.write_char('"')?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_char('"')
            }
        }
    }
}

// ── Expressions ─────────────────────────────────────────────────────

/// Binding strength, loosest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Assign,
    Prefix,
    Postfix,
}

fn level(expr: &Expression) -> Level {
    match expr {
        Expression::Write { .. }
        | Expression::SuperWrite { .. }
        | Expression::SubscriptWrite { .. } => Level::Assign,
        Expression::Use(_)
        | Expression::ReflectiveRead(_)
        | Expression::Dup(_)
        | Expression::Call { .. } => Level::Prefix,
        Expression::Constant(_)
        | Expression::Read(_)
        | Expression::SubscriptRead { .. }
        | Expression::MkVector(_)
        | Expression::CallBuiltin { .. } => Level::Postfix,
    }
}

fn fmt_at(f: &mut fmt::Formatter<'_>, expr: &Expression, min: Level) -> fmt::Result {
    if level(expr) < min {
        write!(f, "({expr})")
    } else {
        expr.fmt(f)
    }
}

fn fmt_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt(f)?;
    }
    Ok(())
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(c) => c.fmt(f),
            Expression::Read(v) => v.fmt(f),
            Expression::Use(r) => write!(f, "use {r}"),
            Expression::ReflectiveRead(n) => write!(f, "reflect {n}"),
            Expression::Write { variable, value } => write!(f, "{variable} <- {value}"),
            Expression::SuperWrite { variable, value } => write!(f, "{variable} <<- {value}"),
            Expression::SubscriptRead { target, index } => {
                fmt_at(f, target, Level::Postfix)?;
                write!(f, "[{index}]")
            }
            Expression::SubscriptWrite {
                target,
                index,
                value,
            } => {
                fmt_at(f, target, Level::Postfix)?;
                write!(f, "[{index}] <- {value}")
            }
            Expression::MkVector(elements) => {
                f.write_char('[')?;
                fmt_list(f, elements)?;
                f.write_char(']')
            }
            Expression::Dup(inner) => {
                f.write_str("dup ")?;
                fmt_at(f, inner, Level::Prefix)
            }
            Expression::Call { callee, args } => {
                f.write_str("call ")?;
                fmt_at(f, callee, Level::Postfix)?;
                f.write_char('(')?;
                fmt_list(f, args)?;
                f.write_char(')')
            }
            Expression::CallBuiltin { name, args } => {
                f.write_char('@')?;
                write_ident(f, name)?;
                f.write_char('(')?;
                fmt_list(f, args)?;
                f.write_char(')')
            }
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dest) = &self.dest {
            write!(f, "{dest} = ")?;
        }
        self.expr.fmt(f)
    }
}

// ── Jumps ───────────────────────────────────────────────────────────

fn fmt_target(
    f: &mut fmt::Formatter<'_>,
    target: &Target,
    label_of: &dyn Fn(BlockId) -> String,
) -> fmt::Result {
    f.write_str(&label_of(target.block))?;
    if !target.phi_args.is_empty() {
        f.write_char('(')?;
        fmt_list(f, &target.phi_args)?;
        f.write_char(')')?;
    }
    Ok(())
}

/// Render `jump`, naming each target block with `label_of`.
pub fn fmt_jump(
    f: &mut fmt::Formatter<'_>,
    jump: &Jump,
    label_of: &dyn Fn(BlockId) -> String,
) -> fmt::Result {
    match jump {
        Jump::Goto(target) => {
            f.write_str("goto ")?;
            fmt_target(f, target, label_of)
        }
        Jump::Branch {
            cond,
            if_true,
            if_false,
        } => {
            write!(f, "branch {cond}, ")?;
            fmt_target(f, if_true, label_of)?;
            f.write_str(", ")?;
            fmt_target(f, if_false, label_of)
        }
        Jump::Return(value) => write!(f, "return {value}"),
        Jump::Unreachable => f.write_str("unreachable"),
    }
}

impl Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_jump(f, self, &|id| id.to_string())
    }
}
