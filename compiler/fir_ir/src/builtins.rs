//! Built-in and intrinsic function tables.
//!
//! A [`BuiltinRegistry`] is built once during process setup and then
//! shared immutably with whatever needs it (the verifier, lowering,
//! code generation). Builtins and intrinsics live in separate tables that
//! must be disjoint.

use fir_types::Signature;
use rustc_hash::FxHashMap;

use crate::IrError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinKind {
    /// Callable from source code.
    Builtin,
    /// Compiler-internal operation.
    Intrinsic,
}

#[derive(Clone, Debug, Default)]
pub struct BuiltinRegistry {
    entries: FxHashMap<String, (BuiltinKind, Signature)>,
}

impl BuiltinRegistry {
    pub fn builder() -> BuiltinRegistryBuilder {
        BuiltinRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.entries.get(name).map(|(_, sig)| sig)
    }

    pub fn kind(&self, name: &str) -> Option<BuiltinKind> {
        self.entries.get(name).map(|(kind, _)| *kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check a call of `name` with `arity` arguments.
    pub fn check_call(&self, name: &str, arity: usize) -> Result<&Signature, IrError> {
        let signature = self
            .get(name)
            .ok_or_else(|| IrError::UnknownBuiltin(name.to_owned()))?;
        if signature.arity() == arity {
            Ok(signature)
        } else {
            Err(IrError::BuiltinArity {
                name: name.to_owned(),
                expected: signature.arity(),
                found: arity,
            })
        }
    }
}

#[derive(Debug, Default)]
pub struct BuiltinRegistryBuilder {
    builtins: Vec<(String, Signature)>,
    intrinsics: Vec<(String, Signature)>,
}

impl BuiltinRegistryBuilder {
    #[must_use]
    pub fn builtin(mut self, name: &str, signature: Signature) -> Self {
        self.builtins.push((name.to_owned(), signature));
        self
    }

    #[must_use]
    pub fn intrinsic(mut self, name: &str, signature: Signature) -> Self {
        self.intrinsics.push((name.to_owned(), signature));
        self
    }

    /// Fails on the first name registered twice, in either table.
    pub fn build(self) -> Result<BuiltinRegistry, IrError> {
        let mut entries = FxHashMap::default();
        let tagged = self
            .builtins
            .into_iter()
            .map(|(name, sig)| (name, BuiltinKind::Builtin, sig))
            .chain(
                self.intrinsics
                    .into_iter()
                    .map(|(name, sig)| (name, BuiltinKind::Intrinsic, sig)),
            );
        for (name, kind, signature) in tagged {
            if entries.contains_key(&name) {
                return Err(IrError::DuplicateBuiltin(name));
            }
            entries.insert(name, (kind, signature));
        }
        tracing::debug!(entries = entries.len(), "built builtin registry");
        Ok(BuiltinRegistry { entries })
    }
}
