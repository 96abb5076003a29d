//! Semantic analysis for uC programs.
//!
//! The entry point is [`analyze`]: it numbers the AST's expressions,
//! resolves every identifier through a scoped symbol table, records the
//! resolved [`ucc_core::UcType`] of each expression, and enforces the
//! 25-rule diagnostic catalog in [`SemanticError`].

pub mod analyzer;
pub mod diagnostics;

pub use analyzer::analyze;
pub use diagnostics::SemanticError;
