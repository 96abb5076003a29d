//! The uCIR instruction set.
//!
//! Three-address instructions as a closed enum; `Display` renders the
//! normative line format (`store_int %2 %a`, `cbranch %4 %if.then %if.end`,
//! ...). Operand strings carry their sigil: registers `%k` / `%name[.N]`,
//! globals and text constants `@name` / `@.str.N`. Label operands are
//! stored bare -- `Jump { target: "exit" }` prints as `jump %exit` and the
//! matching block entry is `Label("exit")`, printed `exit:`.
//!
//! Opcodes are a verb plus a type suffix; the dataflow engine matches on
//! the accessor methods (`stored_var`, `loaded_var`, `label_name`,
//! `jump_targets`) instead of string prefixes.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use ucc_core::ast::BinOpKind;
use ucc_core::PrimType;

/// Array dimensions attached to `alloc_*` / `global_*` opcodes.
pub type Dims = SmallVec<[usize; 2]>;

/// Binary opcode mnemonics (`add_int`, `lt_int`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOpcode {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOpcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOpcode::Add => "add",
            BinOpcode::Sub => "sub",
            BinOpcode::Mul => "mul",
            BinOpcode::Div => "div",
            BinOpcode::Mod => "mod",
            BinOpcode::And => "and",
            BinOpcode::Or => "or",
            BinOpcode::Eq => "eq",
            BinOpcode::Ne => "ne",
            BinOpcode::Lt => "lt",
            BinOpcode::Le => "le",
            BinOpcode::Gt => "gt",
            BinOpcode::Ge => "ge",
        }
    }
}

impl From<BinOpKind> for BinOpcode {
    fn from(op: BinOpKind) -> Self {
        match op {
            BinOpKind::Add => BinOpcode::Add,
            BinOpKind::Sub => BinOpcode::Sub,
            BinOpKind::Mul => BinOpcode::Mul,
            BinOpKind::Div => BinOpcode::Div,
            BinOpKind::Mod => BinOpcode::Mod,
            BinOpKind::And => BinOpcode::And,
            BinOpKind::Or => BinOpcode::Or,
            BinOpKind::Eq => BinOpcode::Eq,
            BinOpKind::Ne => BinOpcode::Ne,
            BinOpKind::Lt => BinOpcode::Lt,
            BinOpKind::Le => BinOpcode::Le,
            BinOpKind::Gt => BinOpcode::Gt,
            BinOpKind::Ge => BinOpcode::Ge,
        }
    }
}

/// An immediate operand of a `literal_*` instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Int(i64),
    Char(char),
    Bool(bool),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Int(v) => write!(f, "{v}"),
            LiteralValue::Char(c) => write!(f, "'{c}'"),
            LiteralValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// The initializer payload of a `global_*` instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GlobalValue {
    Int(i64),
    Char(char),
    Bool(bool),
    List(Vec<GlobalValue>),
}

impl fmt::Display for GlobalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalValue::Int(v) => write!(f, "{v}"),
            GlobalValue::Char(c) => write!(f, "'{c}'"),
            GlobalValue::Bool(b) => write!(f, "{b}"),
            GlobalValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// One three-address uCIR instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    /// Block entry: `name:`.
    Label(String),

    /// `define_<T> @fname [(<T>, %reg), ...]`.
    Define {
        ty: PrimType,
        name: String,
        params: Vec<(PrimType, String)>,
    },

    /// `global_<T>[_d...] @name <value>`.
    Global {
        ty: PrimType,
        dims: Dims,
        name: String,
        value: Option<GlobalValue>,
    },

    /// `global_string @name "literal"`.
    GlobalString { name: String, value: String },

    /// `alloc_<T>[_d...] %dst`.
    Alloc {
        ty: PrimType,
        dims: Dims,
        dst: String,
    },

    /// `load_<T> %src %dst`, or `load_<T>_* %ptr %dst` when `deref`.
    Load {
        ty: PrimType,
        deref: bool,
        src: String,
        dst: String,
    },

    /// `store_<T> %src %dst`, or `store_<T>_* %src %ptr` when `deref`.
    Store {
        ty: PrimType,
        deref: bool,
        src: String,
        dst: String,
    },

    /// `literal_<T> <imm> %dst`.
    Literal {
        ty: PrimType,
        value: LiteralValue,
        dst: String,
    },

    /// `<bop>_<T> %left %right %dst`.
    Binary {
        op: BinOpcode,
        ty: PrimType,
        left: String,
        right: String,
        dst: String,
    },

    /// `not_bool %src %dst`.
    Not { src: String, dst: String },

    /// `elem_<T> %base %idx %dst` -- element address computation.
    Elem {
        ty: PrimType,
        base: String,
        index: String,
        dst: String,
    },

    /// `param_<T> %src`.
    Param { ty: PrimType, src: String },

    /// `call_<T> @fname %dst`.
    Call {
        ty: PrimType,
        func: String,
        dst: String,
    },

    /// `return_<T> %src`.
    Return { ty: PrimType, src: String },

    /// `return_void`.
    ReturnVoid,

    /// `jump %target`.
    Jump { target: String },

    /// `cbranch %cond %true %false`.
    CBranch {
        cond: String,
        true_target: String,
        false_target: String,
    },

    /// `print_<T> %src`.
    Print { ty: PrimType, src: String },

    /// `print_string @name`.
    PrintString { name: String },

    /// `print_void`.
    PrintVoid,

    /// `read_<T> %dst`.
    Read { ty: PrimType, dst: String },
}

fn dims_suffix(dims: &Dims) -> String {
    dims.iter().map(|d| format!("_{d}")).collect()
}

impl Instr {
    /// The full opcode string, e.g. `load_int_*` or `global_int_2_3`.
    /// Labels report `name:`.
    pub fn opcode(&self) -> String {
        match self {
            Instr::Label(name) => format!("{name}:"),
            Instr::Define { ty, .. } => format!("define_{ty}"),
            Instr::Global { ty, dims, .. } => format!("global_{ty}{}", dims_suffix(dims)),
            Instr::GlobalString { .. } => "global_string".to_string(),
            Instr::Alloc { ty, dims, .. } => format!("alloc_{ty}{}", dims_suffix(dims)),
            Instr::Load { ty, deref, .. } => {
                if *deref {
                    format!("load_{ty}_*")
                } else {
                    format!("load_{ty}")
                }
            }
            Instr::Store { ty, deref, .. } => {
                if *deref {
                    format!("store_{ty}_*")
                } else {
                    format!("store_{ty}")
                }
            }
            Instr::Literal { ty, .. } => format!("literal_{ty}"),
            Instr::Binary { op, ty, .. } => format!("{}_{ty}", op.mnemonic()),
            Instr::Not { .. } => "not_bool".to_string(),
            Instr::Elem { ty, .. } => format!("elem_{ty}"),
            Instr::Param { ty, .. } => format!("param_{ty}"),
            Instr::Call { ty, .. } => format!("call_{ty}"),
            Instr::Return { ty, .. } => format!("return_{ty}"),
            Instr::ReturnVoid => "return_void".to_string(),
            Instr::Jump { .. } => "jump".to_string(),
            Instr::CBranch { .. } => "cbranch".to_string(),
            Instr::Print { ty, .. } => format!("print_{ty}"),
            Instr::PrintString { .. } => "print_string".to_string(),
            Instr::PrintVoid => "print_void".to_string(),
            Instr::Read { ty, .. } => format!("read_{ty}"),
        }
    }

    /// The block-entry label defined by this instruction, if any.
    pub fn label_name(&self) -> Option<&str> {
        match self {
            Instr::Label(name) => Some(name),
            _ => None,
        }
    }

    /// The variable written by a plain (non-deref) store: the definition
    /// key for reaching-definitions analysis.
    pub fn stored_var(&self) -> Option<&str> {
        match self {
            Instr::Store {
                deref: false, dst, ..
            } => Some(dst),
            _ => None,
        }
    }

    /// The variable read by a load (the pointer temporary for deref
    /// loads): the use key for liveness analysis.
    pub fn loaded_var(&self) -> Option<&str> {
        match self {
            Instr::Load { src, .. } => Some(src),
            _ => None,
        }
    }

    /// Branch targets of a `jump` or `cbranch` (bare label names).
    pub fn jump_targets(&self) -> SmallVec<[&str; 2]> {
        match self {
            Instr::Jump { target } => SmallVec::from_slice(&[target.as_str()]),
            Instr::CBranch {
                true_target,
                false_target,
                ..
            } => SmallVec::from_slice(&[true_target.as_str(), false_target.as_str()]),
            _ => SmallVec::new(),
        }
    }

    /// True for control-transfer instructions that end a block.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Instr::Jump { .. } | Instr::CBranch { .. })
    }

    /// The register this instruction defines, if it produces a value.
    pub fn defined_register(&self) -> Option<&str> {
        match self {
            Instr::Load { dst, .. }
            | Instr::Literal { dst, .. }
            | Instr::Binary { dst, .. }
            | Instr::Not { dst, .. }
            | Instr::Elem { dst, .. }
            | Instr::Call { dst, .. } => Some(dst),
            _ => None,
        }
    }

    /// Mutable references to every value operand (registers, globals,
    /// text constants). Used by copy propagation to rewrite uses of a
    /// removed load's destination. Label operands are excluded.
    pub fn operands_mut(&mut self) -> SmallVec<[&mut String; 4]> {
        let mut out: SmallVec<[&mut String; 4]> = SmallVec::new();
        match self {
            Instr::Load { src, dst, .. } | Instr::Store { src, dst, .. } => {
                out.push(src);
                out.push(dst);
            }
            Instr::Literal { dst, .. } => out.push(dst),
            Instr::Binary {
                left, right, dst, ..
            } => {
                out.push(left);
                out.push(right);
                out.push(dst);
            }
            Instr::Not { src, dst } => {
                out.push(src);
                out.push(dst);
            }
            Instr::Elem {
                base, index, dst, ..
            } => {
                out.push(base);
                out.push(index);
                out.push(dst);
            }
            Instr::Param { src, .. } => out.push(src),
            Instr::Call { dst, .. } => out.push(dst),
            Instr::Return { src, .. } => out.push(src),
            Instr::CBranch { cond, .. } => out.push(cond),
            Instr::Print { src, .. } => out.push(src),
            Instr::Read { dst, .. } => out.push(dst),
            Instr::Label(_)
            | Instr::Define { .. }
            | Instr::Global { .. }
            | Instr::GlobalString { .. }
            | Instr::Alloc { .. }
            | Instr::ReturnVoid
            | Instr::Jump { .. }
            | Instr::PrintString { .. }
            | Instr::PrintVoid => {}
        }
        out
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label(name) => write!(f, "{name}:"),
            Instr::Define { name, params, .. } => {
                write!(f, "{} {name} [", self.opcode())?;
                for (i, (pty, reg)) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "({pty}, {reg})")?;
                }
                write!(f, "]")
            }
            Instr::Global { name, value, .. } => match value {
                Some(v) => write!(f, "{} {name} {v}", self.opcode()),
                None => write!(f, "{} {name}", self.opcode()),
            },
            Instr::GlobalString { name, value } => {
                write!(f, "global_string {name} \"{value}\"")
            }
            Instr::Alloc { dst, .. } => write!(f, "{} {dst}", self.opcode()),
            Instr::Load { src, dst, .. } | Instr::Store { src, dst, .. } => {
                write!(f, "{} {src} {dst}", self.opcode())
            }
            Instr::Literal { value, dst, .. } => write!(f, "{} {value} {dst}", self.opcode()),
            Instr::Binary {
                left, right, dst, ..
            } => write!(f, "{} {left} {right} {dst}", self.opcode()),
            Instr::Not { src, dst } => write!(f, "not_bool {src} {dst}"),
            Instr::Elem {
                base, index, dst, ..
            } => write!(f, "{} {base} {index} {dst}", self.opcode()),
            Instr::Param { src, .. } => write!(f, "{} {src}", self.opcode()),
            Instr::Call { func, dst, .. } => write!(f, "{} {func} {dst}", self.opcode()),
            Instr::Return { src, .. } => write!(f, "{} {src}", self.opcode()),
            Instr::ReturnVoid => write!(f, "return_void"),
            Instr::Jump { target } => write!(f, "jump %{target}"),
            Instr::CBranch {
                cond,
                true_target,
                false_target,
            } => write!(f, "cbranch {cond} %{true_target} %{false_target}"),
            Instr::Print { src, .. } => write!(f, "{} {src}", self.opcode()),
            Instr::PrintString { name } => write!(f, "print_string {name}"),
            Instr::PrintVoid => write!(f, "print_void"),
            Instr::Read { dst, .. } => write!(f, "{} {dst}", self.opcode()),
        }
    }
}

/// Render an instruction listing the way `--ir`/`--opt` print it:
/// labels and `define_*` flush left, everything else indented.
pub fn format_listing(code: &[Instr]) -> String {
    let mut out = String::new();
    for instr in code {
        match instr {
            Instr::Label(_) | Instr::Define { .. } => {}
            _ => out.push_str("  "),
        }
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn opcode_type_suffixes() {
        let load = Instr::Load {
            ty: PrimType::Int,
            deref: false,
            src: "%a".to_string(),
            dst: "%2".to_string(),
        };
        assert_eq!(load.opcode(), "load_int");

        let deref = Instr::Load {
            ty: PrimType::Char,
            deref: true,
            src: "%5".to_string(),
            dst: "%6".to_string(),
        };
        assert_eq!(deref.opcode(), "load_char_*");

        let global = Instr::Global {
            ty: PrimType::Int,
            dims: smallvec![2, 3],
            name: "@m".to_string(),
            value: None,
        };
        assert_eq!(global.opcode(), "global_int_2_3");
    }

    #[test]
    fn display_matches_grammar() {
        let store = Instr::Store {
            ty: PrimType::Int,
            deref: false,
            src: "%2".to_string(),
            dst: "%a".to_string(),
        };
        insta::assert_snapshot!(store.to_string(), @"store_int %2 %a");

        let branch = Instr::CBranch {
            cond: "%4".to_string(),
            true_target: "if.then".to_string(),
            false_target: "if.end".to_string(),
        };
        insta::assert_snapshot!(branch.to_string(), @"cbranch %4 %if.then %if.end");

        let jump = Instr::Jump {
            target: "exit".to_string(),
        };
        insta::assert_snapshot!(jump.to_string(), @"jump %exit");

        let text = Instr::GlobalString {
            name: "@.str.0".to_string(),
            value: "assertion_fail on @ 1:8".to_string(),
        };
        insta::assert_snapshot!(
            text.to_string(),
            @r#"global_string @.str.0 "assertion_fail on @ 1:8""#
        );
    }

    #[test]
    fn define_display_lists_params() {
        let define = Instr::Define {
            ty: PrimType::Int,
            name: "@add".to_string(),
            params: vec![
                (PrimType::Int, "%1".to_string()),
                (PrimType::Int, "%2".to_string()),
            ],
        };
        assert_eq!(define.to_string(), "define_int @add [(int, %1), (int, %2)]");
    }

    #[test]
    fn stored_var_is_definition_key() {
        let store = Instr::Store {
            ty: PrimType::Int,
            deref: false,
            src: "%2".to_string(),
            dst: "%a".to_string(),
        };
        assert_eq!(store.stored_var(), Some("%a"));

        let deref = Instr::Store {
            ty: PrimType::Int,
            deref: true,
            src: "%2".to_string(),
            dst: "%7".to_string(),
        };
        assert_eq!(deref.stored_var(), None);
    }

    #[test]
    fn jump_targets_of_branches() {
        let jump = Instr::Jump {
            target: "while.cond".to_string(),
        };
        assert_eq!(jump.jump_targets().as_slice(), &["while.cond"]);

        let branch = Instr::CBranch {
            cond: "%1".to_string(),
            true_target: "while.body".to_string(),
            false_target: "while.end".to_string(),
        };
        assert_eq!(
            branch.jump_targets().as_slice(),
            &["while.body", "while.end"]
        );
        assert!(branch.is_terminator());
    }

    #[test]
    fn operands_mut_rewrites_uses() {
        let mut print = Instr::Print {
            ty: PrimType::Int,
            src: "%3".to_string(),
        };
        for op in print.operands_mut() {
            if op == "%3" {
                *op = "%2".to_string();
            }
        }
        assert_eq!(
            print,
            Instr::Print {
                ty: PrimType::Int,
                src: "%2".to_string(),
            }
        );
    }

    #[test]
    fn listing_indents_body_instructions() {
        let code = vec![
            Instr::Define {
                ty: PrimType::Int,
                name: "@main".to_string(),
                params: vec![],
            },
            Instr::Label("entry".to_string()),
            Instr::Alloc {
                ty: PrimType::Int,
                dims: Dims::new(),
                dst: "%1".to_string(),
            },
        ];
        let listing = format_listing(&code);
        assert_eq!(listing, "define_int @main []\nentry:\n  alloc_int %1\n");
    }

    #[test]
    fn serde_roundtrip() {
        let instr = Instr::Binary {
            op: BinOpcode::Lt,
            ty: PrimType::Int,
            left: "%2".to_string(),
            right: "%3".to_string(),
            dst: "%4".to_string(),
        };
        let json = serde_json::to_string(&instr).unwrap();
        let back: Instr = serde_json::from_str(&json).unwrap();
        assert_eq!(instr, back);
    }
}
