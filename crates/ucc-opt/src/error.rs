//! Optimizer errors.
//!
//! Like generation errors, these are internal invariant violations: the
//! optimizer runs on well-formed IR, so a dangling label or malformed
//! layout is a compiler bug and aborts loudly.

use thiserror::Error;
use ucc_codegen::CodegenError;

/// Errors raised by the dataflow engine and optimization passes.
#[derive(Debug, Error)]
pub enum OptError {
    /// A `jump`/`cbranch` target with no matching label in the function.
    #[error("internal error: unresolved label %{label}")]
    UnknownLabel { label: String },

    /// The function's CFG could not be linearized.
    #[error(transparent)]
    Layout(#[from] CodegenError),
}
