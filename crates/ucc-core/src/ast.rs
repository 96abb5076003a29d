//! The uC abstract syntax tree.
//!
//! A closed sum over the node catalog produced by the (out-of-scope)
//! parser: declarations, statements, and expressions, each carrying a
//! source [`Coord`]. The tree derives serde so a serialized AST can be
//! consumed directly by the CLI.
//!
//! Expression nodes carry an [`ExprId`] assigned by [`assign_expr_ids`]
//! before analysis; the analyzer records resolved types in a side map
//! keyed by that id rather than mutating the tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::Coord;
use crate::types::PrimType;

/// Stable identity of an expression node within one program.
///
/// Assigned in preorder by [`assign_expr_ids`]; `0` means "not yet
/// numbered".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ExprId(pub u32);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Binary operator kinds, serialized as their uC token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOpKind {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl BinOpKind {
    /// The uC source token, as it appears in operator-support sets and
    /// diagnostics.
    pub fn token(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Mod => "%",
            BinOpKind::Lt => "<",
            BinOpKind::Le => "<=",
            BinOpKind::Gt => ">",
            BinOpKind::Ge => ">=",
            BinOpKind::Eq => "==",
            BinOpKind::Ne => "!=",
            BinOpKind::And => "&&",
            BinOpKind::Or => "||",
        }
    }

    /// Relational operators produce `bool` regardless of operand type.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinOpKind::Lt
                | BinOpKind::Le
                | BinOpKind::Gt
                | BinOpKind::Ge
                | BinOpKind::Eq
                | BinOpKind::Ne
        )
    }
}

impl fmt::Display for BinOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Unary operator kinds, serialized as their uC token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOpKind {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
}

impl UnaryOpKind {
    pub fn token(self) -> &'static str {
        match self {
            UnaryOpKind::Neg => "-",
            UnaryOpKind::Plus => "+",
            UnaryOpKind::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Assignment operator kinds. The uC type tables only admit plain `=`;
/// compound tokens still parse and are rejected by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOpKind {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "%=")]
    ModAssign,
}

impl AssignOpKind {
    pub fn token(self) -> &'static str {
        match self {
            AssignOpKind::Assign => "=",
            AssignOpKind::AddAssign => "+=",
            AssignOpKind::SubAssign => "-=",
            AssignOpKind::MulAssign => "*=",
            AssignOpKind::DivAssign => "/=",
            AssignOpKind::ModAssign => "%=",
        }
    }
}

impl fmt::Display for AssignOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ---------------------------------------------------------------------------
// Program and declarations
// ---------------------------------------------------------------------------

/// A whole translation unit: the ordered list of file-scope items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub gdecls: Vec<GlobalItem>,
}

/// A file-scope item: a declaration group or a function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GlobalItem {
    Decl(GlobalDecl),
    Func(FuncDef),
}

/// A file-scope declaration group (one `int x, y;` line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalDecl {
    pub decls: Vec<Decl>,
}

/// A function definition: the declarator (carrying name and parameters)
/// plus the body compound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    pub return_type: TypeSpec,
    pub decl: Decl,
    pub body: Compound,
    pub coord: Coord,
}

impl FuncDef {
    /// The declared function name.
    pub fn name(&self) -> &str {
        &self.decl.name.name
    }
}

/// A type keyword as written in the source (`int`, `char`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: PrimType,
    pub coord: Coord,
}

/// One declared name with its declarator shape and optional initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub name: Id,
    pub kind: DeclKind,
    pub init: Option<Expr>,
    pub coord: Coord,
}

/// The shape of a declaration: scalar, array, or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclKind {
    Var(VarDecl),
    Array(ArrayDecl),
    Func(FuncDecl),
}

/// Scalar variable declarator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub type_spec: TypeSpec,
}

/// Array declarator. Multi-dimensional arrays nest: `int a[2][3]` is an
/// `ArrayDecl(dim: 2)` whose `inner` is `ArrayDecl(dim: 3)` around the
/// scalar declarator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDecl {
    pub inner: Box<DeclKind>,
    pub dim: Option<Expr>,
    pub coord: Coord,
}

/// Function declarator: return type plus the parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub type_spec: TypeSpec,
    pub params: Option<ParamList>,
}

/// Ordered function parameters; each is a scalar `Decl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamList {
    pub params: Vec<Decl>,
}

/// Declarations appearing in a `for` initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclList {
    pub decls: Vec<Decl>,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// A uC statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Decl(Decl),
    If(Box<If>),
    While(Box<While>),
    For(Box<For>),
    Compound(Compound),
    Assign(Assignment),
    Assert(Assert),
    Break(Break),
    Print(Print),
    Read(Read),
    Return(Return),
    /// A function call in statement position.
    Call(FuncCall),
    Empty(EmptyStatement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct If {
    pub cond: Expr,
    pub then_branch: Stmt,
    pub else_branch: Option<Stmt>,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct While {
    pub cond: Expr,
    pub body: Stmt,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct For {
    pub init: Option<ForInit>,
    pub cond: Option<Expr>,
    pub step: Option<Box<Stmt>>,
    pub body: Box<Stmt>,
    pub coord: Coord,
}

/// The initializer slot of a `for` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    Decls(DeclList),
    Assign(Assignment),
}

/// A braced block of declarations and statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    pub items: Vec<Stmt>,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub op: AssignOpKind,
    pub lvalue: Expr,
    pub rvalue: Expr,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assert {
    pub expr: Expr,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Break {
    pub coord: Coord,
}

/// `print(expr, ...)`; `expr` is `None` for a bare `print()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Print {
    pub expr: Option<Expr>,
    pub coord: Coord,
}

/// `read(target, ...)`; targets must name variables or array elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Read {
    pub targets: Expr,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub expr: Option<Expr>,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyStatement {
    pub coord: Coord,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A uC expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Constant(Constant),
    Id(Id),
    Binary(Box<BinaryOp>),
    Unary(Box<UnaryOp>),
    Call(Box<FuncCall>),
    ArrayRef(Box<ArrayRef>),
    InitList(InitList),
    List(ExprList),
}

impl Expr {
    /// The expression id assigned by [`assign_expr_ids`].
    pub fn id(&self) -> ExprId {
        match self {
            Expr::Constant(c) => c.id,
            Expr::Id(i) => i.id,
            Expr::Binary(b) => b.id,
            Expr::Unary(u) => u.id,
            Expr::Call(c) => c.id,
            Expr::ArrayRef(a) => a.id,
            Expr::InitList(l) => l.id,
            Expr::List(l) => l.id,
        }
    }

    /// The source coordinate of this expression.
    pub fn coord(&self) -> Coord {
        match self {
            Expr::Constant(c) => c.coord,
            Expr::Id(i) => i.coord,
            Expr::Binary(b) => b.coord,
            Expr::Unary(u) => u.coord,
            Expr::Call(c) => c.coord,
            Expr::ArrayRef(a) => a.coord,
            Expr::InitList(l) => l.coord,
            Expr::List(l) => l.coord,
        }
    }

    /// A short kind name for diagnostics that name the offending node
    /// (e.g. "Constant is not a variable").
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Constant(_) => "Constant",
            Expr::Id(_) => "ID",
            Expr::Binary(_) => "BinaryOp",
            Expr::Unary(_) => "UnaryOp",
            Expr::Call(_) => "FuncCall",
            Expr::ArrayRef(_) => "ArrayRef",
            Expr::InitList(_) => "InitList",
            Expr::List(_) => "ExprList",
        }
    }
}

/// A literal constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Int(i64),
    Char(char),
    Str(String),
    Bool(bool),
}

impl ConstValue {
    /// The primitive type of this literal.
    pub fn prim_type(&self) -> PrimType {
        match self {
            ConstValue::Int(_) => PrimType::Int,
            ConstValue::Char(_) => PrimType::Char,
            ConstValue::Str(_) => PrimType::String,
            ConstValue::Bool(_) => PrimType::Bool,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    #[serde(default, skip)]
    pub id: ExprId,
    pub value: ConstValue,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Id {
    #[serde(default, skip)]
    pub id: ExprId,
    pub name: String,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOp {
    #[serde(default, skip)]
    pub id: ExprId,
    pub op: BinOpKind,
    pub left: Expr,
    pub right: Expr,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOp {
    #[serde(default, skip)]
    pub id: ExprId,
    pub op: UnaryOpKind,
    pub expr: Expr,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncCall {
    #[serde(default, skip)]
    pub id: ExprId,
    pub name: Id,
    pub args: Option<ExprList>,
    pub coord: Coord,
}

impl FuncCall {
    /// The argument expressions, empty for a no-argument call.
    pub fn arg_exprs(&self) -> &[Expr] {
        self.args.as_ref().map_or(&[], |list| &list.exprs)
    }
}

/// `name[subscript]`; `name` is an [`Id`] or, for multi-dimensional
/// arrays, a nested `ArrayRef`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayRef {
    #[serde(default, skip)]
    pub id: ExprId,
    pub name: Expr,
    pub subscript: Expr,
    pub coord: Coord,
}

impl ArrayRef {
    /// The identifier at the root of a (possibly nested) reference.
    pub fn base_id(&self) -> Option<&Id> {
        match &self.name {
            Expr::Id(id) => Some(id),
            Expr::ArrayRef(inner) => inner.base_id(),
            _ => None,
        }
    }

    /// Subscripts from the outermost array dimension inward.
    /// For `m[i][j]` this yields `[i, j]`.
    pub fn subscripts(&self) -> Vec<&Expr> {
        let mut subs = match &self.name {
            Expr::ArrayRef(inner) => inner.subscripts(),
            _ => Vec::new(),
        };
        subs.push(&self.subscript);
        subs
    }
}

/// A braced initializer list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitList {
    #[serde(default, skip)]
    pub id: ExprId,
    pub exprs: Vec<Expr>,
    pub coord: Coord,
}

/// A comma-separated expression list (call arguments, print/read lists).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprList {
    #[serde(default, skip)]
    pub id: ExprId,
    pub exprs: Vec<Expr>,
    pub coord: Coord,
}

// ---------------------------------------------------------------------------
// Expression numbering
// ---------------------------------------------------------------------------

/// Assign a fresh [`ExprId`] to every expression node, in preorder.
/// Returns the number of expressions numbered. Must run before analysis
/// so the type side-map has stable keys.
pub fn assign_expr_ids(program: &mut Program) -> u32 {
    let mut next = 1u32;
    for item in &mut program.gdecls {
        match item {
            GlobalItem::Decl(g) => {
                for d in &mut g.decls {
                    number_decl(d, &mut next);
                }
            }
            GlobalItem::Func(f) => {
                number_decl(&mut f.decl, &mut next);
                number_compound(&mut f.body, &mut next);
            }
        }
    }
    next - 1
}

fn fresh(next: &mut u32) -> ExprId {
    let id = ExprId(*next);
    *next += 1;
    id
}

fn number_decl(decl: &mut Decl, next: &mut u32) {
    number_decl_kind(&mut decl.kind, next);
    if let Some(init) = &mut decl.init {
        number_expr(init, next);
    }
}

fn number_decl_kind(kind: &mut DeclKind, next: &mut u32) {
    match kind {
        DeclKind::Var(_) => {}
        DeclKind::Array(a) => {
            if let Some(dim) = &mut a.dim {
                number_expr(dim, next);
            }
            number_decl_kind(&mut a.inner, next);
        }
        DeclKind::Func(f) => {
            if let Some(params) = &mut f.params {
                for p in &mut params.params {
                    number_decl(p, next);
                }
            }
        }
    }
}

fn number_compound(c: &mut Compound, next: &mut u32) {
    for item in &mut c.items {
        number_stmt(item, next);
    }
}

fn number_stmt(stmt: &mut Stmt, next: &mut u32) {
    match stmt {
        Stmt::Decl(d) => number_decl(d, next),
        Stmt::If(i) => {
            number_expr(&mut i.cond, next);
            number_stmt(&mut i.then_branch, next);
            if let Some(e) = &mut i.else_branch {
                number_stmt(e, next);
            }
        }
        Stmt::While(w) => {
            number_expr(&mut w.cond, next);
            number_stmt(&mut w.body, next);
        }
        Stmt::For(f) => {
            match &mut f.init {
                Some(ForInit::Decls(list)) => {
                    for d in &mut list.decls {
                        number_decl(d, next);
                    }
                }
                Some(ForInit::Assign(a)) => number_assignment(a, next),
                None => {}
            }
            if let Some(c) = &mut f.cond {
                number_expr(c, next);
            }
            if let Some(s) = &mut f.step {
                number_stmt(s, next);
            }
            number_stmt(&mut f.body, next);
        }
        Stmt::Compound(c) => number_compound(c, next),
        Stmt::Assign(a) => number_assignment(a, next),
        Stmt::Assert(a) => number_expr(&mut a.expr, next),
        Stmt::Break(_) | Stmt::Empty(_) => {}
        Stmt::Print(p) => {
            if let Some(e) = &mut p.expr {
                number_expr(e, next);
            }
        }
        Stmt::Read(r) => number_expr(&mut r.targets, next),
        Stmt::Return(r) => {
            if let Some(e) = &mut r.expr {
                number_expr(e, next);
            }
        }
        Stmt::Call(c) => number_call(c, next),
    }
}

fn number_assignment(a: &mut Assignment, next: &mut u32) {
    number_expr(&mut a.lvalue, next);
    number_expr(&mut a.rvalue, next);
}

fn number_call(call: &mut FuncCall, next: &mut u32) {
    call.id = fresh(next);
    call.name.id = fresh(next);
    if let Some(args) = &mut call.args {
        args.id = fresh(next);
        for e in &mut args.exprs {
            number_expr(e, next);
        }
    }
}

fn number_expr(expr: &mut Expr, next: &mut u32) {
    match expr {
        Expr::Constant(c) => c.id = fresh(next),
        Expr::Id(i) => i.id = fresh(next),
        Expr::Binary(b) => {
            b.id = fresh(next);
            number_expr(&mut b.left, next);
            number_expr(&mut b.right, next);
        }
        Expr::Unary(u) => {
            u.id = fresh(next);
            number_expr(&mut u.expr, next);
        }
        Expr::Call(c) => number_call(c, next),
        Expr::ArrayRef(a) => {
            a.id = fresh(next);
            number_expr(&mut a.name, next);
            number_expr(&mut a.subscript, next);
        }
        Expr::InitList(l) => {
            l.id = fresh(next);
            for e in &mut l.exprs {
                number_expr(e, next);
            }
        }
        Expr::List(l) => {
            l.id = fresh(next);
            for e in &mut l.exprs {
                number_expr(e, next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_const(v: i64) -> Expr {
        Expr::Constant(Constant {
            id: ExprId::default(),
            value: ConstValue::Int(v),
            coord: Coord::new(1, 1),
        })
    }

    fn id(name: &str) -> Expr {
        Expr::Id(Id {
            id: ExprId::default(),
            name: name.to_string(),
            coord: Coord::new(1, 1),
        })
    }

    #[test]
    fn expr_ids_are_unique_and_dense() {
        let mut program = Program {
            gdecls: vec![GlobalItem::Func(FuncDef {
                return_type: TypeSpec {
                    name: PrimType::Int,
                    coord: Coord::new(1, 1),
                },
                decl: Decl {
                    name: Id {
                        id: ExprId::default(),
                        name: "main".to_string(),
                        coord: Coord::new(1, 5),
                    },
                    kind: DeclKind::Func(FuncDecl {
                        type_spec: TypeSpec {
                            name: PrimType::Int,
                            coord: Coord::new(1, 1),
                        },
                        params: None,
                    }),
                    init: None,
                    coord: Coord::new(1, 5),
                },
                body: Compound {
                    items: vec![Stmt::Assign(Assignment {
                        op: AssignOpKind::Assign,
                        lvalue: id("a"),
                        rvalue: Expr::Binary(Box::new(BinaryOp {
                            id: ExprId::default(),
                            op: BinOpKind::Add,
                            left: int_const(1),
                            right: int_const(2),
                            coord: Coord::new(2, 7),
                        })),
                        coord: Coord::new(2, 3),
                    })],
                    coord: Coord::new(1, 12),
                },
                coord: Coord::new(1, 1),
            })],
        };

        let count = assign_expr_ids(&mut program);
        assert_eq!(count, 4); // a, (1+2), 1, 2

        if let GlobalItem::Func(f) = &program.gdecls[0] {
            if let Stmt::Assign(a) = &f.body.items[0] {
                let lid = a.lvalue.id();
                let rid = a.rvalue.id();
                assert_ne!(lid, ExprId(0));
                assert_ne!(rid, ExprId(0));
                assert_ne!(lid, rid);
                if let Expr::Binary(b) = &a.rvalue {
                    assert_ne!(b.left.id(), b.right.id());
                }
            } else {
                unreachable!();
            }
        } else {
            unreachable!();
        }
    }

    #[test]
    fn array_ref_base_and_subscripts() {
        let inner = ArrayRef {
            id: ExprId(0),
            name: id("m"),
            subscript: int_const(1),
            coord: Coord::new(1, 1),
        };
        let outer = ArrayRef {
            id: ExprId(0),
            name: Expr::ArrayRef(Box::new(inner)),
            subscript: int_const(2),
            coord: Coord::new(1, 1),
        };
        assert_eq!(outer.base_id().unwrap().name, "m");
        let subs = outer.subscripts();
        assert_eq!(subs.len(), 2);
        assert!(matches!(
            subs[0],
            Expr::Constant(Constant {
                value: ConstValue::Int(1),
                ..
            })
        ));
    }

    #[test]
    fn binop_serializes_as_token() {
        let json = serde_json::to_string(&BinOpKind::Le).unwrap();
        assert_eq!(json, "\"<=\"");
        let back: BinOpKind = serde_json::from_str("\"%\"").unwrap();
        assert_eq!(back, BinOpKind::Mod);
    }

    #[test]
    fn ast_serde_roundtrip() {
        let expr = Expr::Binary(Box::new(BinaryOp {
            id: ExprId::default(),
            op: BinOpKind::Lt,
            left: id("i"),
            right: int_const(10),
            coord: Coord::new(4, 10),
        }));
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(expr, back);
    }

    #[test]
    fn call_with_no_args_has_empty_arg_slice() {
        let call = FuncCall {
            id: ExprId(0),
            name: Id {
                id: ExprId(0),
                name: "f".to_string(),
                coord: Coord::new(1, 1),
            },
            args: None,
            coord: Coord::new(1, 1),
        };
        assert!(call.arg_exprs().is_empty());
    }
}
