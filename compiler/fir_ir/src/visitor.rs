//! CFG visitor.
//!
//! Default `visit_*` methods call the matching `walk_*` function, which
//! recurses into children. Override a `visit_*` method to act at a node
//! and call `walk_*` from it to keep descending. The IR is read-only
//! during a visit; the visitor may mutate its own state.
//!
//! # Example
//!
//! ```text
//! struct CountCalls(usize);
//!
//! impl Visitor for CountCalls {
//!     fn visit_expression(&mut self, expr: &Expression) {
//!         if matches!(expr, Expression::Call { .. }) {
//!             self.0 += 1;
//!         }
//!         walk_expression(self, expr);
//!     }
//! }
//! ```

use crate::{
    BasicBlock, BlockId, Cfg, Expression, Jump, NamedVariable, Register, Statement, Target,
    Variable,
};

pub trait Visitor {
    fn visit_block(&mut self, id: BlockId, block: &BasicBlock) {
        walk_block(self, id, block);
    }

    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr);
    }

    fn visit_jump(&mut self, jump: &Jump) {
        walk_jump(self, jump);
    }

    fn visit_target(&mut self, target: &Target) {
        walk_target(self, target);
    }

    /// A register read (`r` or `use r`).
    fn visit_register(&mut self, register: &Register) {
        let _ = register;
    }

    /// A named-variable read or write.
    fn visit_named(&mut self, variable: &NamedVariable) {
        let _ = variable;
    }
}

/// Visit every live block in id order.
pub fn walk_cfg<V: Visitor + ?Sized>(visitor: &mut V, cfg: &Cfg) {
    for (id, block) in cfg.blocks() {
        visitor.visit_block(id, block);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, _id: BlockId, block: &BasicBlock) {
    for statement in block.statements() {
        visitor.visit_statement(statement);
    }
    visitor.visit_jump(block.jump());
}

/// Walks the expression only; the destination is a definition, not a use.
pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, statement: &Statement) {
    visitor.visit_expression(&statement.expr);
}

pub fn walk_expression<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expression) {
    match expr {
        Expression::Constant(_) => {}
        Expression::Read(Variable::Register(r)) | Expression::Use(r) => visitor.visit_register(r),
        Expression::Read(Variable::Named(n)) | Expression::ReflectiveRead(n) => {
            visitor.visit_named(n);
        }
        Expression::Write { variable, value } | Expression::SuperWrite { variable, value } => {
            visitor.visit_named(variable);
            visitor.visit_expression(value);
        }
        Expression::SubscriptRead { target, index } => {
            visitor.visit_expression(target);
            visitor.visit_expression(index);
        }
        Expression::SubscriptWrite {
            target,
            index,
            value,
        } => {
            visitor.visit_expression(target);
            visitor.visit_expression(index);
            visitor.visit_expression(value);
        }
        Expression::MkVector(elements) => {
            for element in elements {
                visitor.visit_expression(element);
            }
        }
        Expression::Dup(inner) => visitor.visit_expression(inner),
        Expression::Call { callee, args } => {
            visitor.visit_expression(callee);
            for arg in args {
                visitor.visit_expression(arg);
            }
        }
        Expression::CallBuiltin { args, .. } => {
            for arg in args {
                visitor.visit_expression(arg);
            }
        }
    }
}

pub fn walk_jump<V: Visitor + ?Sized>(visitor: &mut V, jump: &Jump) {
    match jump {
        Jump::Goto(target) => visitor.visit_target(target),
        Jump::Branch {
            cond,
            if_true,
            if_false,
        } => {
            visitor.visit_expression(cond);
            visitor.visit_target(if_true);
            visitor.visit_target(if_false);
        }
        Jump::Return(value) => visitor.visit_expression(value),
        Jump::Unreachable => {}
    }
}

pub fn walk_target<V: Visitor + ?Sized>(visitor: &mut V, target: &Target) {
    for arg in &target.phi_args {
        visitor.visit_expression(arg);
    }
}
