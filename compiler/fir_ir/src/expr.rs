//! Expressions and statements.
//!
//! Expressions nest: any expression can be the immediate operand of
//! another, so value numbering and common-subexpression passes work on
//! the tree directly without an extra indirection through registers.

use fir_types::{Effects, PrimitiveKind, Type};
use smallvec::{smallvec, SmallVec};

use crate::{NamedVariable, Register, Variable};

// ── Constants ───────────────────────────────────────────────────────

/// Literal constant.
///
/// Reals are stored as raw bits so the type stays `Eq + Hash`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Constant {
    Null,
    /// `None` is the logical `NA`.
    Logical(Option<bool>),
    Integer(i64),
    Real(u64),
    Str(String),
}

impl Constant {
    pub fn real(value: f64) -> Self {
        Constant::Real(value.to_bits())
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Constant::Real(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    /// Static type of the constant.
    pub fn ty(&self) -> Type {
        match self {
            Constant::Null => Type::any_value(),
            Constant::Logical(_) => Type::scalar(PrimitiveKind::Logical),
            Constant::Integer(_) => Type::scalar(PrimitiveKind::Integer),
            Constant::Real(_) => Type::scalar(PrimitiveKind::Real),
            Constant::Str(_) => Type::scalar(PrimitiveKind::String),
        }
    }
}

// ── Expressions ─────────────────────────────────────────────────────

/// A value-producing operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expression {
    /// Literal: `42`, `"s"`, `TRUE`, `NULL`.
    Constant(Constant),
    /// Load a register or named variable: `r`, `$x`.
    Read(Variable),
    /// Last use of a register; ownership moves to the consumer: `use r`.
    Use(Register),
    /// Load a named variable that may have been modified reflectively:
    /// `reflect $x`.
    ReflectiveRead(NamedVariable),
    /// Store into the current environment: `$x <- e`.
    Write {
        variable: NamedVariable,
        value: Box<Expression>,
    },
    /// Store into an enclosing environment: `$x <<- e`.
    SuperWrite {
        variable: NamedVariable,
        value: Box<Expression>,
    },
    /// `target[index]`.
    SubscriptRead {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    /// `target[index] <- value`.
    SubscriptWrite {
        target: Box<Expression>,
        index: Box<Expression>,
        value: Box<Expression>,
    },
    /// Vector construction: `[e, ...]`.
    MkVector(Vec<Expression>),
    /// Copy a value so the copy can be mutated independently: `dup e`.
    Dup(Box<Expression>),
    /// Closure call: `call f(args)`.
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
    /// Call of a registered builtin or intrinsic: `@name(args)`.
    CallBuiltin { name: String, args: Vec<Expression> },
}

impl Expression {
    /// Shorthand for a register read.
    pub fn register(name: &str) -> Self {
        Expression::Read(Variable::Register(Register::new(name)))
    }

    /// Shorthand for a named-variable read.
    pub fn named(name: &str) -> Self {
        Expression::Read(Variable::Named(NamedVariable::new(name)))
    }

    pub fn constant(constant: Constant) -> Self {
        Expression::Constant(constant)
    }

    /// Mutable access to the immediate operands, in evaluation order.
    pub fn children_mut(&mut self) -> SmallVec<[&mut Expression; 4]> {
        match self {
            Expression::Constant(_)
            | Expression::Read(_)
            | Expression::Use(_)
            | Expression::ReflectiveRead(_) => SmallVec::new(),
            Expression::Write { value, .. } | Expression::SuperWrite { value, .. } => {
                smallvec![value.as_mut()]
            }
            Expression::Dup(inner) => smallvec![inner.as_mut()],
            Expression::SubscriptRead { target, index } => {
                smallvec![target.as_mut(), index.as_mut()]
            }
            Expression::SubscriptWrite {
                target,
                index,
                value,
            } => smallvec![target.as_mut(), index.as_mut(), value.as_mut()],
            Expression::MkVector(elements) => elements.iter_mut().collect(),
            Expression::Call { callee, args } => {
                let mut children = SmallVec::with_capacity(1 + args.len());
                children.push(callee.as_mut());
                children.extend(args.iter_mut());
                children
            }
            Expression::CallBuiltin { args, .. } => args.iter_mut().collect(),
        }
    }

    /// Register mentioned directly by this node (not its operands), if any.
    pub fn register_operand(&self) -> Option<&Register> {
        match self {
            Expression::Read(Variable::Register(r)) | Expression::Use(r) => Some(r),
            _ => None,
        }
    }

    /// Every register read anywhere in this expression tree, in evaluation
    /// order (duplicates included).
    pub fn registers(&self) -> Vec<&Register> {
        let mut out = Vec::new();
        collect_registers(self, &mut out);
        out
    }
}

fn collect_registers<'a>(expr: &'a Expression, out: &mut Vec<&'a Register>) {
    if let Some(r) = expr.register_operand() {
        out.push(r);
    }
    for child in expr.children() {
        collect_registers(child, out);
    }
}

// ── Statements ──────────────────────────────────────────────────────

/// One entry of a block's statement list: `[dest =] expr`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statement {
    /// Register defined by this statement, if its value is kept.
    pub dest: Option<Register>,
    pub expr: Expression,
}

impl Statement {
    /// A statement whose value is bound to `dest`.
    pub fn assign(dest: Register, expr: Expression) -> Self {
        Self {
            dest: Some(dest),
            expr,
        }
    }

    /// A statement evaluated only for its effect.
    pub fn effect(expr: Expression) -> Self {
        Self { dest: None, expr }
    }
}

// ── Instruction ─────────────────────────────────────────────────────

/// Common interface of the two instruction families, expressions and
/// jumps, for generic tree-walking passes.
pub trait Instruction {
    /// Immediate operand expressions, in evaluation order.
    fn children(&self) -> SmallVec<[&Expression; 4]>;

    /// Effects of this node alone.
    fn own_effects(&self) -> Effects;

    /// Effects of this node and every operand.
    fn effects(&self) -> Effects {
        self.children()
            .into_iter()
            .fold(self.own_effects(), |acc, child| acc.join(child.effects()))
    }
}

impl Instruction for Expression {
    fn children(&self) -> SmallVec<[&Expression; 4]> {
        match self {
            Expression::Constant(_)
            | Expression::Read(_)
            | Expression::Use(_)
            | Expression::ReflectiveRead(_) => SmallVec::new(),
            Expression::Write { value, .. } | Expression::SuperWrite { value, .. } => {
                smallvec![value.as_ref()]
            }
            Expression::Dup(inner) => smallvec![inner.as_ref()],
            Expression::SubscriptRead { target, index } => {
                smallvec![target.as_ref(), index.as_ref()]
            }
            Expression::SubscriptWrite {
                target,
                index,
                value,
            } => smallvec![target.as_ref(), index.as_ref(), value.as_ref()],
            Expression::MkVector(elements) => elements.iter().collect(),
            Expression::Call { callee, args } => {
                let mut children = SmallVec::with_capacity(1 + args.len());
                children.push(callee.as_ref());
                children.extend(args.iter());
                children
            }
            Expression::CallBuiltin { args, .. } => args.iter().collect(),
        }
    }

    fn own_effects(&self) -> Effects {
        match self {
            Expression::ReflectiveRead(_)
            | Expression::SuperWrite { .. }
            | Expression::Call { .. }
            | Expression::CallBuiltin { .. } => Effects::ANY,
            Expression::Constant(_)
            | Expression::Read(_)
            | Expression::Use(_)
            | Expression::Write { .. }
            | Expression::SubscriptRead { .. }
            | Expression::SubscriptWrite { .. }
            | Expression::MkVector(_)
            | Expression::Dup(_) => Effects::NONE,
        }
    }
}
