//! The semantic diagnostic catalog.
//!
//! [`SemanticError`] has one variant per diagnostic in the fixed catalog
//! of 25 rules the analyzer enforces. Diagnostics are terminal: the
//! analyzer returns the first one it hits and compilation stops.
//!
//! The rendered form is `SemanticError: <message> <coord>`; [`report`]
//! produces that full line, `Display` the bare message.
//!
//! [`report`]: SemanticError::report

use serde::{Deserialize, Serialize};
use ucc_core::Coord;

/// A semantic error detected while checking the AST.
///
/// Every variant carries the source coordinate the diagnostic points at;
/// `code()` returns the rule number (1-25) for tests and tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum SemanticError {
    /// Rule 1: an identifier was used without a visible declaration.
    #[error("{name} is not defined")]
    UndefinedName { name: String, coord: Coord },

    /// Rule 2: an array subscript whose type is not `int`.
    #[error("subscript must be of type(int), not type({found})")]
    NonIntSubscript { found: String, coord: Coord },

    /// Rule 3: an `assert` whose expression is not `bool`.
    #[error("Expression must be of type(bool)")]
    AssertNotBool { coord: Coord },

    /// Rule 4: assignment between incompatible types.
    #[error("Cannot assign type({rtype}) to type({ltype})")]
    AssignTypeMismatch {
        ltype: String,
        rtype: String,
        coord: Coord,
    },

    /// Rule 5: binary (or assignment) operator applied to operands of
    /// differing types, or an assignment operator the LHS type rejects.
    #[error("Binary operator {op} does not have matching LHS/RHS types")]
    OperandTypeMismatch { op: String, coord: Coord },

    /// Rule 6: a binary operator the operand type does not support.
    #[error("Binary operator {op} is not supported by type({ty})")]
    UnsupportedBinaryOp { op: String, ty: String, coord: Coord },

    /// Rule 7: `break` outside any loop.
    #[error("Break statement must be inside a loop")]
    BreakOutsideLoop { coord: Coord },

    /// Rule 8: missing or non-positive array dimension.
    #[error("Array dimension mismatch")]
    ArrayDimMismatch { coord: Coord },

    /// Rule 9: string initializer length differs from the declared dim.
    #[error("Size mismatch on {name} initialization")]
    StringSizeMismatch { name: String, coord: Coord },

    /// Rule 10: scalar initializer of the wrong type.
    #[error("{name} initialization type mismatch")]
    InitTypeMismatch { name: String, coord: Coord },

    /// Rule 11: a scalar declared with a list initializer.
    #[error("{name} initialization must be a single element")]
    ScalarInitList { name: String, coord: Coord },

    /// Rule 12: sibling sub-lists of an initializer have different lengths.
    #[error("Lists have different sizes")]
    RaggedInitList { coord: Coord },

    /// Rule 13: initializer list size differs from the declared dims.
    #[error("List & variable have different sizes")]
    InitListSizeMismatch { coord: Coord },

    /// Rule 14: a `while`/`for` condition that is not `bool`.
    #[error("conditional expression is type({found}), not type(bool)")]
    LoopCondNotBool { found: String, coord: Coord },

    /// Rule 15: calling a name that is not bound to a function.
    #[error("{name} is not a function")]
    NotAFunction { name: String, coord: Coord },

    /// Rule 16: wrong number of call arguments.
    #[error("no. arguments to call {name} function mismatch")]
    ArgCountMismatch { name: String, coord: Coord },

    /// Rule 17: a call argument whose type differs from the parameter's.
    #[error("Type mismatch with parameter {name}")]
    ParamTypeMismatch { name: String, coord: Coord },

    /// Rule 18: an `if` condition that is not `bool`.
    #[error("The condition expression must be of type(bool)")]
    IfCondNotBool { coord: Coord },

    /// Rule 19: a non-constant element in an initializer list.
    #[error("Expression must be a constant")]
    NonConstantInit { coord: Coord },

    /// Rule 20: printing a value that has no basic type.
    #[error("Expression is not of basic type")]
    NonBasicPrint { coord: Coord },

    /// Rule 21: printing a whole array.
    #[error("{name} does not reference a variable of basic type")]
    PrintArray { name: String, coord: Coord },

    /// Rule 22: a `read` target that does not name a variable or element.
    #[error("{name} is not a variable")]
    ReadTargetNotVariable { name: String, coord: Coord },

    /// Rule 23: return type incompatible with the function definition.
    #[error("Return of type({ltype}) is incompatible with type({rtype}) function definition")]
    ReturnTypeMismatch {
        ltype: String,
        rtype: String,
        coord: Coord,
    },

    /// Rule 24: redeclaration of a name within the same scope.
    #[error("Name {name} is already defined in this scope")]
    Redeclaration { name: String, coord: Coord },

    /// Rule 25: a unary operator the operand type does not support.
    #[error("Unary operator {op} is not supported")]
    UnsupportedUnaryOp { op: String, coord: Coord },
}

impl SemanticError {
    /// The diagnostic rule number (1-25).
    pub fn code(&self) -> u8 {
        match self {
            SemanticError::UndefinedName { .. } => 1,
            SemanticError::NonIntSubscript { .. } => 2,
            SemanticError::AssertNotBool { .. } => 3,
            SemanticError::AssignTypeMismatch { .. } => 4,
            SemanticError::OperandTypeMismatch { .. } => 5,
            SemanticError::UnsupportedBinaryOp { .. } => 6,
            SemanticError::BreakOutsideLoop { .. } => 7,
            SemanticError::ArrayDimMismatch { .. } => 8,
            SemanticError::StringSizeMismatch { .. } => 9,
            SemanticError::InitTypeMismatch { .. } => 10,
            SemanticError::ScalarInitList { .. } => 11,
            SemanticError::RaggedInitList { .. } => 12,
            SemanticError::InitListSizeMismatch { .. } => 13,
            SemanticError::LoopCondNotBool { .. } => 14,
            SemanticError::NotAFunction { .. } => 15,
            SemanticError::ArgCountMismatch { .. } => 16,
            SemanticError::ParamTypeMismatch { .. } => 17,
            SemanticError::IfCondNotBool { .. } => 18,
            SemanticError::NonConstantInit { .. } => 19,
            SemanticError::NonBasicPrint { .. } => 20,
            SemanticError::PrintArray { .. } => 21,
            SemanticError::ReadTargetNotVariable { .. } => 22,
            SemanticError::ReturnTypeMismatch { .. } => 23,
            SemanticError::Redeclaration { .. } => 24,
            SemanticError::UnsupportedUnaryOp { .. } => 25,
        }
    }

    /// The source coordinate this diagnostic points at.
    pub fn coord(&self) -> Coord {
        match self {
            SemanticError::UndefinedName { coord, .. }
            | SemanticError::NonIntSubscript { coord, .. }
            | SemanticError::AssertNotBool { coord }
            | SemanticError::AssignTypeMismatch { coord, .. }
            | SemanticError::OperandTypeMismatch { coord, .. }
            | SemanticError::UnsupportedBinaryOp { coord, .. }
            | SemanticError::BreakOutsideLoop { coord }
            | SemanticError::ArrayDimMismatch { coord }
            | SemanticError::StringSizeMismatch { coord, .. }
            | SemanticError::InitTypeMismatch { coord, .. }
            | SemanticError::ScalarInitList { coord, .. }
            | SemanticError::RaggedInitList { coord }
            | SemanticError::InitListSizeMismatch { coord }
            | SemanticError::LoopCondNotBool { coord, .. }
            | SemanticError::NotAFunction { coord, .. }
            | SemanticError::ArgCountMismatch { coord, .. }
            | SemanticError::ParamTypeMismatch { coord, .. }
            | SemanticError::IfCondNotBool { coord }
            | SemanticError::NonConstantInit { coord }
            | SemanticError::NonBasicPrint { coord }
            | SemanticError::PrintArray { coord, .. }
            | SemanticError::ReadTargetNotVariable { coord, .. }
            | SemanticError::ReturnTypeMismatch { coord, .. }
            | SemanticError::Redeclaration { coord, .. }
            | SemanticError::UnsupportedUnaryOp { coord, .. } => *coord,
        }
    }

    /// The full diagnostic line as printed to stderr.
    pub fn report(&self) -> String {
        format!("SemanticError: {} {}", self, self.coord())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_format_matches_catalog() {
        let err = SemanticError::Redeclaration {
            name: "x".to_string(),
            coord: Coord::new(2, 9),
        };
        insta::assert_snapshot!(
            err.report(),
            @"SemanticError: Name x is already defined in this scope @ 2:9"
        );
        assert_eq!(err.code(), 24);
    }

    #[test]
    fn message_interpolation() {
        let err = SemanticError::AssignTypeMismatch {
            ltype: "int".to_string(),
            rtype: "char".to_string(),
            coord: Coord::new(4, 3),
        };
        assert_eq!(err.to_string(), "Cannot assign type(char) to type(int)");
        assert_eq!(err.code(), 4);
    }

    #[test]
    fn serde_roundtrip() {
        let err = SemanticError::ParamTypeMismatch {
            name: "n".to_string(),
            coord: Coord::new(3, 12),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: SemanticError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn codes_cover_full_catalog() {
        let c = Coord::default();
        let all = vec![
            SemanticError::UndefinedName {
                name: String::new(),
                coord: c,
            },
            SemanticError::NonIntSubscript {
                found: String::new(),
                coord: c,
            },
            SemanticError::AssertNotBool { coord: c },
            SemanticError::AssignTypeMismatch {
                ltype: String::new(),
                rtype: String::new(),
                coord: c,
            },
            SemanticError::OperandTypeMismatch {
                op: String::new(),
                coord: c,
            },
            SemanticError::UnsupportedBinaryOp {
                op: String::new(),
                ty: String::new(),
                coord: c,
            },
            SemanticError::BreakOutsideLoop { coord: c },
            SemanticError::ArrayDimMismatch { coord: c },
            SemanticError::StringSizeMismatch {
                name: String::new(),
                coord: c,
            },
            SemanticError::InitTypeMismatch {
                name: String::new(),
                coord: c,
            },
            SemanticError::ScalarInitList {
                name: String::new(),
                coord: c,
            },
            SemanticError::RaggedInitList { coord: c },
            SemanticError::InitListSizeMismatch { coord: c },
            SemanticError::LoopCondNotBool {
                found: String::new(),
                coord: c,
            },
            SemanticError::NotAFunction {
                name: String::new(),
                coord: c,
            },
            SemanticError::ArgCountMismatch {
                name: String::new(),
                coord: c,
            },
            SemanticError::ParamTypeMismatch {
                name: String::new(),
                coord: c,
            },
            SemanticError::IfCondNotBool { coord: c },
            SemanticError::NonConstantInit { coord: c },
            SemanticError::NonBasicPrint { coord: c },
            SemanticError::PrintArray {
                name: String::new(),
                coord: c,
            },
            SemanticError::ReadTargetNotVariable {
                name: String::new(),
                coord: c,
            },
            SemanticError::ReturnTypeMismatch {
                ltype: String::new(),
                rtype: String::new(),
                coord: c,
            },
            SemanticError::Redeclaration {
                name: String::new(),
                coord: c,
            },
            SemanticError::UnsupportedUnaryOp {
                op: String::new(),
                coord: c,
            },
        ];
        let codes: Vec<u8> = all.iter().map(|e| e.code()).collect();
        assert_eq!(codes, (1..=25).collect::<Vec<u8>>());
    }
}
