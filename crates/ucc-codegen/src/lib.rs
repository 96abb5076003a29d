//! uCIR: the three-address intermediate representation and its
//! generator.
//!
//! [`generate`] lowers a type-annotated AST into a [`GeneratedProgram`]:
//! a text prelude of `global_*` tuples plus one [`FunctionIr`] per
//! function, each holding a basic-block CFG. The flat listing printed by
//! `--ir` comes from [`GeneratedProgram::code`].

pub mod block;
pub mod error;
pub mod generator;
pub mod ir;

pub use block::{Block, BlockId, BlockKind, Cfg};
pub use error::CodegenError;
pub use generator::{generate, FunctionIr, GeneratedProgram, Phase};
pub use ir::{format_listing, BinOpcode, Dims, GlobalValue, Instr, LiteralValue};
