//! IR generation errors.
//!
//! These are internal invariant violations, not user-facing diagnostics:
//! generation runs on a type-annotated AST that already passed semantic
//! analysis, so any failure here is a compiler bug surfaced loudly
//! rather than silently ignored.

use thiserror::Error;
use ucc_core::ExprId;

/// Errors raised while lowering the AST to uCIR.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// An expression reached the generator without a recorded type.
    #[error("internal error: expression {id} has no type annotation")]
    MissingType { id: ExprId },

    /// A global declaration whose initializer is not a literal constant.
    #[error("internal error: global initializer for '{name}' must be a constant")]
    NonConstantGlobal { name: String },

    /// An array whose dimension could not be resolved to a length.
    #[error("internal error: unresolved dimension for array '{name}'")]
    UnresolvedDimension { name: String },

    /// A construct the generator cannot lower.
    #[error("internal error: unsupported construct: {what}")]
    Unsupported { what: String },

    /// A malformed CFG (a block chain that revisits a block).
    #[error("internal error: block {label} appears twice in the layout chain")]
    InvalidLayout { label: String },
}
