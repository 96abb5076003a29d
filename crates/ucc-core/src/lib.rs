pub mod ast;
pub mod coord;
pub mod symtab;
pub mod types;
pub mod visit;

// Re-export commonly used types
pub use ast::{assign_expr_ids, ExprId, Program};
pub use coord::Coord;
pub use symtab::SymbolTable;
pub use types::{PrimType, TypeMap, UcType};
pub use visit::Visitor;
