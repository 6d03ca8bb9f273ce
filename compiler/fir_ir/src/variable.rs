//! Variables and bindings.
//!
//! There are two disjoint namespaces:
//!
//! - **Registers**: SSA-like temporaries local to one abstraction. A
//!   register is defined once, either as a parameter, a block parameter
//!   (phi), or by a single statement.
//! - **Named variables**: environment-visible, dynamically scoped, and
//!   possibly defined in an enclosing scope or modified reflectively.
//!
//! Within one abstraction's declarations a register and a named variable
//! never share a name.

use fir_types::Type;

/// A function-local SSA-like temporary.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register(String);

impl Register {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// A dynamically scoped, environment-visible variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedVariable(String);

impl NamedVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Either kind of variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variable {
    Register(Register),
    Named(NamedVariable),
}

impl Variable {
    /// The bare name, without namespace.
    pub fn name(&self) -> &str {
        match self {
            Variable::Register(r) => r.name(),
            Variable::Named(n) => n.name(),
        }
    }

    pub fn as_register(&self) -> Option<&Register> {
        match self {
            Variable::Register(r) => Some(r),
            Variable::Named(_) => None,
        }
    }

    pub fn as_named(&self) -> Option<&NamedVariable> {
        match self {
            Variable::Named(n) => Some(n),
            Variable::Register(_) => None,
        }
    }
}

impl From<Register> for Variable {
    fn from(r: Register) -> Self {
        Variable::Register(r)
    }
}

impl From<NamedVariable> for Variable {
    fn from(n: NamedVariable) -> Self {
        Variable::Named(n)
    }
}

/// A variable paired with its declared type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Binding<V> {
    pub variable: V,
    pub ty: Type,
}

impl<V> Binding<V> {
    pub fn new(variable: V, ty: Type) -> Self {
        Self { variable, ty }
    }
}

/// Function or block parameter. Always a register.
pub type Parameter = Binding<Register>;

/// Local declaration. Either namespace.
pub type Local = Binding<Variable>;

impl Parameter {
    /// View this parameter as a local declaration.
    pub fn to_local(&self) -> Local {
        Binding::new(Variable::Register(self.variable.clone()), self.ty.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_are_distinct() {
        let reg: Variable = Register::new("x").into();
        let var: Variable = NamedVariable::new("x").into();
        assert_ne!(reg, var);
        assert_eq!(reg.name(), var.name());
        assert!(reg.as_register().is_some());
        assert!(var.as_named().is_some());
        assert!(reg.as_named().is_none());
    }

    #[test]
    fn parameter_as_local() {
        let p = Parameter::new(Register::new("a"), Type::any());
        let local = p.to_local();
        assert_eq!(local.variable, Variable::Register(Register::new("a")));
        assert_eq!(local.ty, Type::any());
    }
}
