//! The uC type system.
//!
//! Provides the complete set of types used in uC programs: the five
//! primitives (int, char, string, bool, void), fixed-size arrays, and
//! function signatures. Every type exposes the operator token sets it
//! supports; the semantic analyzer consults these when checking binary,
//! relational, assignment, and unary expressions.
//!
//! Equality on types is structural.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::ExprId;

/// The five primitive uC types.
///
/// Also used by the IR layer as the `<T>` suffix of every typed opcode
/// (`alloc_int`, `load_char`, ...), which is why `Display` renders the
/// lowercase keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimType {
    Int,
    Char,
    String,
    Bool,
    Void,
}

impl PrimType {
    /// The lowercase uC keyword for this type.
    pub fn name(self) -> &'static str {
        match self {
            PrimType::Int => "int",
            PrimType::Char => "char",
            PrimType::String => "string",
            PrimType::Bool => "bool",
            PrimType::Void => "void",
        }
    }
}

impl fmt::Display for PrimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A uC type: primitive, array, or function signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UcType {
    /// One of the five primitive types.
    Primitive(PrimType),

    /// Fixed-size array. `len` is `None` until the dimension is known
    /// (e.g. inferred from an initializer during analysis).
    Array {
        elem: Box<UcType>,
        len: Option<usize>,
    },

    /// Function signature: return type plus the ordered parameter map.
    /// Parameter insertion order is declaration order.
    Func {
        ret: Box<UcType>,
        params: IndexMap<String, UcType>,
    },
}

impl UcType {
    pub const INT: UcType = UcType::Primitive(PrimType::Int);
    pub const CHAR: UcType = UcType::Primitive(PrimType::Char);
    pub const STRING: UcType = UcType::Primitive(PrimType::String);
    pub const BOOL: UcType = UcType::Primitive(PrimType::Bool);
    pub const VOID: UcType = UcType::Primitive(PrimType::Void);

    /// The type name used in diagnostics and opcode suffixes.
    ///
    /// Arrays report their element type and functions their return type,
    /// matching how the IR names `elem_int` / `call_int` instructions.
    pub fn typename(&self) -> &'static str {
        match self {
            UcType::Primitive(p) => p.name(),
            UcType::Array { elem, .. } => elem.typename(),
            UcType::Func { ret, .. } => ret.typename(),
        }
    }

    /// The primitive underlying this type, if any (element type for
    /// arrays, return type for functions).
    pub fn primitive(&self) -> PrimType {
        match self {
            UcType::Primitive(p) => *p,
            UcType::Array { elem, .. } => elem.primitive(),
            UcType::Func { ret, .. } => ret.primitive(),
        }
    }

    /// A basic type can be the operand of `print` and the subject of a
    /// scalar initializer: any primitive except `void`.
    pub fn is_basic(&self) -> bool {
        matches!(
            self,
            UcType::Primitive(PrimType::Int)
                | UcType::Primitive(PrimType::Char)
                | UcType::Primitive(PrimType::String)
                | UcType::Primitive(PrimType::Bool)
        )
    }

    /// Binary arithmetic operator tokens supported by this type.
    pub fn binary_ops(&self) -> &'static [&'static str] {
        match self {
            UcType::Primitive(PrimType::Int) => &["+", "-", "*", "/", "%"],
            UcType::Primitive(PrimType::String) => &["+"],
            UcType::Primitive(PrimType::Bool) => &["&&", "||"],
            UcType::Primitive(_) | UcType::Array { .. } => &[],
            UcType::Func { ret, .. } => ret.binary_ops(),
        }
    }

    /// Relational operator tokens supported by this type.
    pub fn rel_ops(&self) -> &'static [&'static str] {
        match self {
            UcType::Primitive(PrimType::Int) => &["==", "!=", "<", ">", "<=", ">="],
            UcType::Primitive(PrimType::Char)
            | UcType::Primitive(PrimType::String)
            | UcType::Primitive(PrimType::Bool) => &["==", "!="],
            UcType::Primitive(PrimType::Void) | UcType::Array { .. } => &[],
            UcType::Func { ret, .. } => ret.rel_ops(),
        }
    }

    /// Assignment operator tokens supported by this type.
    pub fn assign_ops(&self) -> &'static [&'static str] {
        match self {
            UcType::Primitive(PrimType::Void) => &[],
            UcType::Primitive(_) | UcType::Array { .. } => &["="],
            UcType::Func { ret, .. } => ret.assign_ops(),
        }
    }

    /// Unary operator tokens supported by this type.
    pub fn unary_ops(&self) -> &'static [&'static str] {
        match self {
            UcType::Primitive(PrimType::Int) => &["-", "+"],
            UcType::Primitive(PrimType::Bool) => &["!"],
            UcType::Primitive(_) | UcType::Array { .. } => &[],
            UcType::Func { ret, .. } => ret.unary_ops(),
        }
    }
}

impl fmt::Display for UcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UcType::Primitive(p) => write!(f, "{p}"),
            UcType::Array { elem, len } => match len {
                Some(n) => write!(f, "{elem}[{n}]"),
                None => write!(f, "{elem}[]"),
            },
            UcType::Func { ret, params } => {
                write!(f, "{ret}(")?;
                for (i, ty) in params.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Resolved type annotations, keyed by expression id.
///
/// The analyzer fills this map as it walks the AST; the IR generator
/// reads it to pick opcode suffixes. The AST itself stays immutable
/// after expression numbering.
pub type TypeMap = IndexMap<ExprId, UcType>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names() {
        assert_eq!(PrimType::Int.name(), "int");
        assert_eq!(PrimType::Void.name(), "void");
        assert_eq!(format!("{}", PrimType::Char), "char");
    }

    #[test]
    fn structural_equality() {
        let a = UcType::Array {
            elem: Box::new(UcType::INT),
            len: Some(3),
        };
        let b = UcType::Array {
            elem: Box::new(UcType::INT),
            len: Some(3),
        };
        assert_eq!(a, b);

        let c = UcType::Array {
            elem: Box::new(UcType::INT),
            len: Some(4),
        };
        assert_ne!(a, c);
        assert_ne!(a, UcType::INT);
    }

    #[test]
    fn int_operator_sets() {
        assert!(UcType::INT.binary_ops().contains(&"%"));
        assert!(UcType::INT.rel_ops().contains(&"<="));
        assert!(UcType::INT.assign_ops().contains(&"="));
        assert!(UcType::INT.unary_ops().contains(&"-"));
        assert!(!UcType::INT.binary_ops().contains(&"&&"));
    }

    #[test]
    fn bool_operator_sets() {
        assert!(UcType::BOOL.binary_ops().contains(&"&&"));
        assert!(UcType::BOOL.unary_ops().contains(&"!"));
        assert!(!UcType::BOOL.binary_ops().contains(&"+"));
        assert!(!UcType::BOOL.rel_ops().contains(&"<"));
    }

    #[test]
    fn void_supports_nothing() {
        assert!(UcType::VOID.binary_ops().is_empty());
        assert!(UcType::VOID.rel_ops().is_empty());
        assert!(UcType::VOID.assign_ops().is_empty());
        assert!(UcType::VOID.unary_ops().is_empty());
        assert!(!UcType::VOID.is_basic());
    }

    #[test]
    fn array_typename_is_element_typename() {
        let a = UcType::Array {
            elem: Box::new(UcType::CHAR),
            len: Some(8),
        };
        assert_eq!(a.typename(), "char");
        assert!(!a.is_basic());
        assert_eq!(a.assign_ops(), &["="]);
    }

    #[test]
    fn func_type_delegates_to_return_type() {
        let f = UcType::Func {
            ret: Box::new(UcType::INT),
            params: IndexMap::from([("x".to_string(), UcType::INT)]),
        };
        assert_eq!(f.typename(), "int");
        assert!(f.binary_ops().contains(&"+"));
    }

    #[test]
    fn display_forms() {
        let arr = UcType::Array {
            elem: Box::new(UcType::INT),
            len: Some(3),
        };
        assert_eq!(format!("{arr}"), "int[3]");

        let f = UcType::Func {
            ret: Box::new(UcType::VOID),
            params: IndexMap::from([
                ("a".to_string(), UcType::INT),
                ("b".to_string(), UcType::CHAR),
            ]),
        };
        assert_eq!(format!("{f}"), "void(int, char)");
    }

    #[test]
    fn serde_roundtrip() {
        let f = UcType::Func {
            ret: Box::new(UcType::INT),
            params: IndexMap::from([
                ("n".to_string(), UcType::INT),
                ("flag".to_string(), UcType::BOOL),
            ]),
        };
        let json = serde_json::to_string(&f).unwrap();
        let back: UcType = serde_json::from_str(&json).unwrap();
        assert_eq!(f, back);
    }

    #[test]
    fn func_params_preserve_declaration_order() {
        let f = UcType::Func {
            ret: Box::new(UcType::VOID),
            params: IndexMap::from([
                ("z".to_string(), UcType::INT),
                ("a".to_string(), UcType::INT),
            ]),
        };
        if let UcType::Func { params, .. } = &f {
            let names: Vec<&str> = params.keys().map(|s| s.as_str()).collect();
            assert_eq!(names, vec!["z", "a"]);
        } else {
            unreachable!();
        }
    }
}
