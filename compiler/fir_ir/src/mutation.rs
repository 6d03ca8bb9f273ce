//! Recorded mutations.
//!
//! Every structural edit is first described as a [`Mutation`] value, the
//! operation name plus its arguments, and only then executed. Observers
//! see the description before and after execution, and a failure carries
//! it in [`MutationError`]. A sequence of mutations is therefore a
//! complete, replayable event log.

use std::fmt;

use fir_types::{Effects, Type};

use crate::{
    AbstractionId, BlockId, Cfg, FunctionId, IrError, Jump, Local, Parameter, Statement, Variable,
};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mutation {
    AddFunction {
        name: String,
    },
    RemoveFunction {
        function: FunctionId,
    },
    AddVersion {
        function: FunctionId,
        params: Vec<Parameter>,
        return_type: Type,
        effects: Effects,
    },
    RemoveVersion {
        version: AbstractionId,
    },
    AddLocal {
        version: AbstractionId,
        local: Local,
    },
    RemoveLocal {
        version: AbstractionId,
        variable: Variable,
    },
    SetReturnType {
        version: AbstractionId,
        ty: Type,
    },
    SetReturnEffects {
        version: AbstractionId,
        effects: Effects,
    },
    SetBody {
        version: AbstractionId,
        cfg: Cfg,
    },
    InsertStatement {
        version: AbstractionId,
        block: BlockId,
        index: usize,
        statement: Statement,
    },
    RemoveStatement {
        version: AbstractionId,
        block: BlockId,
        index: usize,
    },
    SetJump {
        version: AbstractionId,
        block: BlockId,
        jump: Jump,
    },
    SplitNewSuccessor {
        version: AbstractionId,
        block: BlockId,
        index: usize,
    },
    MergeWithSuccessor {
        version: AbstractionId,
        block: BlockId,
    },
    RemoveBlock {
        version: AbstractionId,
        block: BlockId,
    },
    InsertPreheader {
        version: AbstractionId,
        header: BlockId,
        latches: Vec<BlockId>,
    },
}

impl Mutation {
    /// Operation name, as shown in traces.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::AddFunction { .. } => "add_function",
            Mutation::RemoveFunction { .. } => "remove_function",
            Mutation::AddVersion { .. } => "add_version",
            Mutation::RemoveVersion { .. } => "remove_version",
            Mutation::AddLocal { .. } => "add_local",
            Mutation::RemoveLocal { .. } => "remove_local",
            Mutation::SetReturnType { .. } => "set_return_type",
            Mutation::SetReturnEffects { .. } => "set_return_effects",
            Mutation::SetBody { .. } => "set_body",
            Mutation::InsertStatement { .. } => "insert_statement",
            Mutation::RemoveStatement { .. } => "remove_statement",
            Mutation::SetJump { .. } => "set_jump",
            Mutation::SplitNewSuccessor { .. } => "split_new_successor",
            Mutation::MergeWithSuccessor { .. } => "merge_with_successor",
            Mutation::RemoveBlock { .. } => "remove_block",
            Mutation::InsertPreheader { .. } => "insert_preheader",
        }
    }

    /// The abstraction this mutation edits, if it edits one.
    pub fn version(&self) -> Option<AbstractionId> {
        match self {
            Mutation::AddFunction { .. }
            | Mutation::RemoveFunction { .. }
            | Mutation::AddVersion { .. } => None,
            Mutation::RemoveVersion { version }
            | Mutation::AddLocal { version, .. }
            | Mutation::RemoveLocal { version, .. }
            | Mutation::SetReturnType { version, .. }
            | Mutation::SetReturnEffects { version, .. }
            | Mutation::SetBody { version, .. }
            | Mutation::InsertStatement { version, .. }
            | Mutation::RemoveStatement { version, .. }
            | Mutation::SetJump { version, .. }
            | Mutation::SplitNewSuccessor { version, .. }
            | Mutation::MergeWithSuccessor { version, .. }
            | Mutation::RemoveBlock { version, .. }
            | Mutation::InsertPreheader { version, .. } => Some(*version),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders as `name(arg, ...)`.
impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        match self {
            Mutation::AddFunction { name } => write!(f, "{name:?}")?,
            Mutation::RemoveFunction { function } => write!(f, "{function}")?,
            Mutation::AddVersion {
                function,
                params,
                return_type,
                effects,
            } => write!(
                f,
                "{function}, [{}], {return_type}, {}",
                join(params),
                effects.code()
            )?,
            Mutation::RemoveVersion { version } => write!(f, "{version}")?,
            Mutation::AddLocal { version, local } => write!(f, "{version}, {local}")?,
            Mutation::RemoveLocal { version, variable } => write!(f, "{version}, {variable}")?,
            Mutation::SetReturnType { version, ty } => write!(f, "{version}, {ty}")?,
            Mutation::SetReturnEffects { version, effects } => {
                write!(f, "{version}, {}", effects.code())?;
            }
            Mutation::SetBody { version, cfg } => {
                write!(f, "{version}, <{} blocks>", cfg.len())?;
            }
            Mutation::InsertStatement {
                version,
                block,
                index,
                statement,
            } => write!(f, "{version}, {block}, {index}, {statement}")?,
            Mutation::RemoveStatement {
                version,
                block,
                index,
            }
            | Mutation::SplitNewSuccessor {
                version,
                block,
                index,
            } => write!(f, "{version}, {block}, {index}")?,
            Mutation::SetJump {
                version,
                block,
                jump,
            } => write!(f, "{version}, {block}, {jump}")?,
            Mutation::MergeWithSuccessor { version, block }
            | Mutation::RemoveBlock { version, block } => write!(f, "{version}, {block}")?,
            Mutation::InsertPreheader {
                version,
                header,
                latches,
            } => write!(f, "{version}, {header}, [{}]", join(latches))?,
        }
        f.write_str(")")
    }
}

/// What a successful mutation produced.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Returned {
    Unit,
    Function(FunctionId),
    Abstraction(AbstractionId),
    Block(BlockId),
    Statement(Statement),
    /// Blocks removed, in ascending id order.
    Removed(Vec<BlockId>),
}

impl fmt::Display for Returned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Returned::Unit => f.write_str("()"),
            Returned::Function(id) => id.fmt(f),
            Returned::Abstraction(id) => id.fmt(f),
            Returned::Block(id) => id.fmt(f),
            Returned::Statement(stmt) => stmt.fmt(f),
            Returned::Removed(ids) => write!(f, "removed [{}]", join(ids)),
        }
    }
}

impl From<()> for Returned {
    fn from((): ()) -> Self {
        Returned::Unit
    }
}

impl From<FunctionId> for Returned {
    fn from(id: FunctionId) -> Self {
        Returned::Function(id)
    }
}

impl From<AbstractionId> for Returned {
    fn from(id: AbstractionId) -> Self {
        Returned::Abstraction(id)
    }
}

impl From<BlockId> for Returned {
    fn from(id: BlockId) -> Self {
        Returned::Block(id)
    }
}

impl From<Statement> for Returned {
    fn from(stmt: Statement) -> Self {
        Returned::Statement(stmt)
    }
}

impl From<Vec<BlockId>> for Returned {
    fn from(ids: Vec<BlockId>) -> Self {
        Returned::Removed(ids)
    }
}

/// A structural error, tagged with the mutation that raised it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{mutation} failed: {error}")]
pub struct MutationError {
    pub mutation: Box<Mutation>,
    pub error: IrError,
}
