//! Structural-invariant errors.
//!
//! Every variant is a programming error in a pass, never a recoverable
//! runtime condition. Mutations report them wrapped in a
//! [`MutationError`](crate::MutationError) so the failing operation and
//! its arguments travel with the error.

use crate::{BlockId, ModuleId};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    // ── Module / function level ─────────────────────────────────────
    #[error("function `{0}` already exists")]
    DuplicateFunction(String),

    #[error("unknown function {0}")]
    UnknownFunction(String),

    #[error("unknown version {0}")]
    UnknownVersion(String),

    #[error("{id} belongs to {owner}, not to {module}")]
    ForeignId {
        id: String,
        owner: ModuleId,
        module: ModuleId,
    },

    #[error("function `{function}` already has a version taking ({params})")]
    DuplicateVersion { function: String, params: String },

    // ── Bindings ────────────────────────────────────────────────────
    #[error("`{0}` is already declared")]
    DuplicateLocal(String),

    #[error("register and named variable both called `{0}`")]
    NamespaceClash(String),

    #[error("`{0}` is not declared")]
    UnknownLocal(String),

    #[error("`{0}` is still in use")]
    LocalInUse(String),

    // ── CFG structure ───────────────────────────────────────────────
    #[error("duplicate block label `{0}`")]
    DuplicateLabel(String),

    #[error("unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("jump to {block} passes {found} phi arguments, block takes {expected}")]
    PhiArity {
        block: BlockId,
        expected: usize,
        found: usize,
    },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("operation not permitted on the entry block {0}")]
    EntryBlock(BlockId),

    #[error("the entry block cannot take parameters")]
    EntryHasParameters,

    #[error("block `{0}` has no jump")]
    MissingJump(String),

    #[error("block {0} is unreachable from the entry")]
    UnreachableBlock(BlockId),

    #[error("block {0} cannot be merged with its successor")]
    NotMergeable(BlockId),

    #[error("{latch} does not jump to loop header {header}")]
    NotALatch { latch: BlockId, header: BlockId },

    // ── Registers ───────────────────────────────────────────────────
    #[error("register `{0}` is used but never declared")]
    UndeclaredRegister(String),

    #[error("register `{0}` is defined more than once")]
    RegisterRedefined(String),

    #[error("`{0}` is assigned but is not a register local")]
    InvalidDestination(String),

    // ── Built-ins ───────────────────────────────────────────────────
    #[error("builtin `{0}` is registered twice")]
    DuplicateBuiltin(String),

    #[error("unknown builtin `{0}`")]
    UnknownBuiltin(String),

    #[error("builtin `{name}` takes {expected} arguments, found {found}")]
    BuiltinArity {
        name: String,
        expected: usize,
        found: usize,
    },
}
