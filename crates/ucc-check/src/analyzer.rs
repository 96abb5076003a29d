//! The semantic analyzer.
//!
//! Walks the AST in preorder through the [`Visitor`] framework, resolving
//! identifiers against a scoped [`SymbolTable`], recording a [`UcType`]
//! for every expression in a side map, and enforcing the 25-rule
//! diagnostic catalog. Analysis stops at the first diagnostic.
//!
//! Scoping: one scope per function (parameters and body share it -- the
//! body compound's scope push is suppressed exactly once), one per inner
//! compound, one per `for` statement. Function names are registered in
//! the outermost scope before their bodies are checked so recursion and
//! forward calls resolve.

use ucc_core::ast::*;
use ucc_core::types::{PrimType, TypeMap, UcType};
use ucc_core::visit::{self, Visitor};
use ucc_core::{Coord, SymbolTable};

use crate::diagnostics::SemanticError;

/// Run semantic analysis over a whole program.
///
/// Numbers every expression node, then checks the tree. On success the
/// returned [`TypeMap`] holds the resolved type of every expression the
/// IR generator will need.
pub fn analyze(program: &mut Program) -> Result<TypeMap, SemanticError> {
    assign_expr_ids(program);
    let mut analyzer = Analyzer::new();
    analyzer.visit_program(program)?;
    Ok(analyzer.types)
}

struct Analyzer {
    symtab: SymbolTable<UcType>,
    types: TypeMap,
    return_type: Option<UcType>,
    has_return: bool,
    loop_depth: u32,
    /// Set by `visit_func_def` so the body compound does not push a
    /// second scope on top of the function scope. Consumed exactly once.
    suppress_next_scope: bool,
}

impl Analyzer {
    fn new() -> Self {
        Analyzer {
            symtab: SymbolTable::new(),
            types: TypeMap::new(),
            return_type: None,
            has_return: false,
            loop_depth: 0,
            suppress_next_scope: false,
        }
    }

    fn record(&mut self, id: ExprId, ty: UcType) {
        self.types.insert(id, ty);
    }

    /// Insert `name` into the innermost scope, rejecting redeclarations.
    fn declare(&mut self, name: &Id, ty: UcType) -> Result<(), SemanticError> {
        if self.symtab.lookup_in_current_scope(&name.name).is_some() {
            return Err(SemanticError::Redeclaration {
                name: name.name.clone(),
                coord: name.coord,
            });
        }
        self.symtab.add(name.name.clone(), ty);
        Ok(())
    }

    // -- declarations -------------------------------------------------------

    fn check_var_decl(&mut self, decl: &Decl, var: &VarDecl) -> Result<(), SemanticError> {
        let ty = UcType::Primitive(var.type_spec.name);

        match &decl.init {
            Some(Expr::InitList(_)) => {
                return Err(SemanticError::ScalarInitList {
                    name: decl.name.name.clone(),
                    coord: decl.name.coord,
                });
            }
            Some(init) => {
                let init_ty = self.check_expr(init)?;
                if ty != init_ty {
                    return Err(SemanticError::InitTypeMismatch {
                        name: decl.name.name.clone(),
                        coord: decl.name.coord,
                    });
                }
            }
            None => {}
        }

        self.declare(&decl.name, ty)
    }

    fn check_array_decl(&mut self, decl: &Decl, array: &ArrayDecl) -> Result<(), SemanticError> {
        // Walk the declarator chain collecting one dimension per level.
        let mut dims: Vec<Option<usize>> = Vec::new();
        let dim = array.dim.as_ref().ok_or(SemanticError::ArrayDimMismatch {
            coord: decl.name.coord,
        })?;
        dims.push(self.check_dim(dim, decl.name.coord)?);

        let mut kind: &DeclKind = &array.inner;
        let elem_prim;
        loop {
            match kind {
                DeclKind::Array(level) => {
                    let dim = level.dim.as_ref().ok_or(SemanticError::ArrayDimMismatch {
                        coord: decl.name.coord,
                    })?;
                    dims.push(self.check_dim(dim, decl.name.coord)?);
                    kind = &level.inner;
                }
                DeclKind::Var(v) => {
                    elem_prim = v.type_spec.name;
                    break;
                }
                DeclKind::Func(_) => {
                    // Array-of-function declarators are not part of uC.
                    elem_prim = PrimType::Void;
                    break;
                }
            }
        }

        match &decl.init {
            Some(Expr::InitList(list)) => {
                let found = self.check_init_list(list, decl.name.coord)?;
                if found.len() != dims.len() {
                    return Err(SemanticError::InitListSizeMismatch {
                        coord: decl.name.coord,
                    });
                }
                for (declared, actual) in dims.iter_mut().zip(found.iter()) {
                    match declared {
                        Some(n) if *n != *actual => {
                            return Err(SemanticError::InitListSizeMismatch {
                                coord: decl.name.coord,
                            });
                        }
                        Some(_) => {}
                        None => *declared = Some(*actual),
                    }
                }
            }
            Some(Expr::Constant(c)) => {
                self.record(c.id, UcType::Primitive(c.value.prim_type()));
                if let ConstValue::Str(s) = &c.value {
                    if dims.first().copied().flatten() != Some(s.chars().count()) {
                        return Err(SemanticError::StringSizeMismatch {
                            name: decl.name.name.clone(),
                            coord: decl.name.coord,
                        });
                    }
                }
            }
            Some(other) => {
                // An array initialized from a scalar expression.
                self.check_expr(other)?;
                return Err(SemanticError::InitTypeMismatch {
                    name: decl.name.name.clone(),
                    coord: decl.name.coord,
                });
            }
            None => {}
        }

        // Build the nested array type, innermost dimension first.
        let mut ty = UcType::Primitive(elem_prim);
        for len in dims.iter().rev() {
            ty = UcType::Array {
                elem: Box::new(ty),
                len: *len,
            };
        }

        self.declare(&decl.name, ty)
    }

    /// Check one declared dimension: the expression must be present
    /// (caller) and, if a constant, strictly positive.
    fn check_dim(&mut self, dim: &Expr, coord: Coord) -> Result<Option<usize>, SemanticError> {
        self.check_expr(dim)?;
        match dim {
            Expr::Constant(c) => match &c.value {
                ConstValue::Int(v) if *v > 0 => Ok(Some(*v as usize)),
                ConstValue::Int(_) => Err(SemanticError::ArrayDimMismatch { coord }),
                _ => Err(SemanticError::ArrayDimMismatch { coord }),
            },
            _ => Ok(None),
        }
    }

    /// Validate an initializer list: every leaf a constant (rule 19),
    /// sibling sub-lists of equal length (rule 12). Returns the per-axis
    /// sizes, outermost first.
    fn check_init_list(
        &mut self,
        list: &InitList,
        coord: Coord,
    ) -> Result<Vec<usize>, SemanticError> {
        if list.exprs.is_empty() {
            return Ok(vec![0]);
        }

        if matches!(list.exprs.first(), Some(Expr::InitList(_))) {
            let mut inner_dims: Option<Vec<usize>> = None;
            for child in &list.exprs {
                let Expr::InitList(sub) = child else {
                    return Err(SemanticError::RaggedInitList { coord });
                };
                let dims = self.check_init_list(sub, coord)?;
                match &inner_dims {
                    Some(seen) if *seen != dims => {
                        return Err(SemanticError::RaggedInitList { coord });
                    }
                    Some(_) => {}
                    None => inner_dims = Some(dims),
                }
            }
            let mut result = vec![list.exprs.len()];
            result.extend(inner_dims.unwrap_or_default());
            Ok(result)
        } else {
            for child in &list.exprs {
                match child {
                    Expr::Constant(c) => {
                        let ty = UcType::Primitive(c.value.prim_type());
                        self.record(c.id, ty);
                    }
                    other => {
                        return Err(SemanticError::NonConstantInit {
                            coord: other.coord(),
                        });
                    }
                }
            }
            Ok(vec![list.exprs.len()])
        }
    }

    /// Build the `Func` type of a function declarator, along with the
    /// parameter declarations for scope registration.
    fn func_type_of<'a>(
        &mut self,
        func: &'a FuncDecl,
    ) -> Result<(UcType, Vec<(&'a Id, UcType)>), SemanticError> {
        let ret = UcType::Primitive(func.type_spec.name);
        let mut params = indexmap::IndexMap::new();
        let mut bindings = Vec::new();
        if let Some(list) = &func.params {
            for p in &list.params {
                let pty = match &p.kind {
                    DeclKind::Var(v) => UcType::Primitive(v.type_spec.name),
                    DeclKind::Array(_) | DeclKind::Func(_) => {
                        // uC passes only scalars; reject the rest at the
                        // parameter's own coordinate.
                        return Err(SemanticError::ArrayDimMismatch {
                            coord: p.name.coord,
                        });
                    }
                };
                params.insert(p.name.name.clone(), pty.clone());
                bindings.push((&p.name, pty));
            }
        }
        Ok((
            UcType::Func {
                ret: Box::new(ret),
                params,
            },
            bindings,
        ))
    }

    // -- expressions --------------------------------------------------------

    fn check_expr(&mut self, expr: &Expr) -> Result<UcType, SemanticError> {
        match expr {
            Expr::Constant(c) => {
                let ty = UcType::Primitive(c.value.prim_type());
                self.record(c.id, ty.clone());
                Ok(ty)
            }
            Expr::Id(id) => {
                let ty = self
                    .symtab
                    .lookup(&id.name)
                    .cloned()
                    .ok_or(SemanticError::UndefinedName {
                        name: id.name.clone(),
                        coord: id.coord,
                    })?;
                self.record(id.id, ty.clone());
                Ok(ty)
            }
            Expr::Binary(b) => self.check_binary(b),
            Expr::Unary(u) => self.check_unary(u),
            Expr::Call(c) => self.check_call(c),
            Expr::ArrayRef(a) => self.check_array_ref(a),
            Expr::InitList(l) => {
                // Only meaningful in a declaration; standalone lists are
                // still validated for constant-ness.
                self.check_init_list(l, l.coord)?;
                Ok(UcType::VOID)
            }
            Expr::List(l) => {
                let mut last = UcType::VOID;
                for e in &l.exprs {
                    last = self.check_expr(e)?;
                }
                self.record(l.id, last.clone());
                Ok(last)
            }
        }
    }

    fn check_binary(&mut self, b: &BinaryOp) -> Result<UcType, SemanticError> {
        let ltype = self.check_expr(&b.left)?;
        let rtype = self.check_expr(&b.right)?;

        if ltype != rtype {
            return Err(SemanticError::OperandTypeMismatch {
                op: b.op.token().to_string(),
                coord: b.coord,
            });
        }

        let token = b.op.token();
        let result = if b.op.is_relational() {
            if !ltype.rel_ops().contains(&token) {
                return Err(SemanticError::UnsupportedBinaryOp {
                    op: token.to_string(),
                    ty: ltype.typename().to_string(),
                    coord: b.coord,
                });
            }
            UcType::BOOL
        } else {
            if !ltype.binary_ops().contains(&token) {
                return Err(SemanticError::UnsupportedBinaryOp {
                    op: token.to_string(),
                    ty: ltype.typename().to_string(),
                    coord: b.coord,
                });
            }
            ltype
        };

        self.record(b.id, result.clone());
        Ok(result)
    }

    fn check_unary(&mut self, u: &UnaryOp) -> Result<UcType, SemanticError> {
        let ty = self.check_expr(&u.expr)?;
        let token = u.op.token();
        if !ty.unary_ops().contains(&token) {
            return Err(SemanticError::UnsupportedUnaryOp {
                op: token.to_string(),
                coord: u.coord,
            });
        }
        self.record(u.id, ty.clone());
        Ok(ty)
    }

    fn check_call(&mut self, call: &FuncCall) -> Result<UcType, SemanticError> {
        let fty = self
            .symtab
            .lookup(&call.name.name)
            .cloned()
            .ok_or(SemanticError::UndefinedName {
                name: call.name.name.clone(),
                coord: call.coord,
            })?;

        let UcType::Func { ret, params } = &fty else {
            return Err(SemanticError::NotAFunction {
                name: call.name.name.clone(),
                coord: call.coord,
            });
        };

        let args = call.arg_exprs();
        let mut arg_types = Vec::with_capacity(args.len());
        for arg in args {
            arg_types.push(self.check_expr(arg)?);
        }

        if args.len() != params.len() {
            return Err(SemanticError::ArgCountMismatch {
                name: call.name.name.clone(),
                coord: call.coord,
            });
        }

        for (i, (pname, pty)) in params.iter().enumerate() {
            if arg_types[i] != *pty {
                return Err(SemanticError::ParamTypeMismatch {
                    name: pname.clone(),
                    coord: args[i].coord(),
                });
            }
        }

        let result = (**ret).clone();
        self.record(call.name.id, fty.clone());
        self.record(call.id, result.clone());
        Ok(result)
    }

    fn check_array_ref(&mut self, a: &ArrayRef) -> Result<UcType, SemanticError> {
        let base = self.check_expr(&a.name)?;
        let sub = self.check_expr(&a.subscript)?;
        if sub != UcType::INT {
            return Err(SemanticError::NonIntSubscript {
                found: sub.typename().to_string(),
                coord: a.subscript.coord(),
            });
        }
        let result = match base {
            UcType::Array { elem, .. } => *elem,
            other => other,
        };
        self.record(a.id, result.clone());
        Ok(result)
    }

    fn check_print_operand(&mut self, expr: &Expr) -> Result<(), SemanticError> {
        let ty = self.check_expr(expr)?;
        if ty == UcType::VOID {
            return Err(SemanticError::NonBasicPrint {
                coord: expr.coord(),
            });
        }
        if let UcType::Array { .. } = ty {
            let name = match expr {
                Expr::Id(id) => id.name.clone(),
                Expr::ArrayRef(a) => a
                    .base_id()
                    .map(|id| id.name.clone())
                    .unwrap_or_else(|| expr.kind_name().to_string()),
                _ => expr.kind_name().to_string(),
            };
            return Err(SemanticError::PrintArray {
                name,
                coord: expr.coord(),
            });
        }
        Ok(())
    }

    fn check_read_target(&mut self, expr: &Expr) -> Result<(), SemanticError> {
        match expr {
            Expr::Id(_) | Expr::ArrayRef(_) => {
                self.check_expr(expr)?;
                Ok(())
            }
            other => Err(SemanticError::ReadTargetNotVariable {
                name: other.kind_name().to_string(),
                coord: other.coord(),
            }),
        }
    }
}

impl Visitor for Analyzer {
    type Error = SemanticError;

    fn visit_func_def(&mut self, node: &FuncDef) -> Result<(), SemanticError> {
        let DeclKind::Func(func_decl) = &node.decl.kind else {
            return Err(SemanticError::NotAFunction {
                name: node.decl.name.name.clone(),
                coord: node.decl.name.coord,
            });
        };

        // The function's own scope holds its parameters and body.
        self.symtab.create();
        let (fty, params) = self.func_type_of(func_decl)?;

        // Reject a second definition of the same global name, then
        // register the function in the outermost scope so the body can
        // call it recursively.
        if self.symtab.lookup(&node.decl.name.name).is_some() {
            self.symtab.pop();
            return Err(SemanticError::Redeclaration {
                name: node.decl.name.name.clone(),
                coord: node.decl.name.coord,
            });
        }
        self.symtab
            .add_at_depth(node.decl.name.name.clone(), fty, 0);

        let ret = UcType::Primitive(node.return_type.name);
        self.return_type = Some(ret.clone());
        self.has_return = false;

        for (name, pty) in params {
            self.declare(name, pty)?;
        }

        self.suppress_next_scope = true;
        let body_result = self.visit_compound(&node.body);
        self.symtab.pop();
        self.return_type = None;
        body_result?;

        if ret != UcType::VOID && !self.has_return {
            return Err(SemanticError::ReturnTypeMismatch {
                ltype: "void".to_string(),
                rtype: ret.typename().to_string(),
                coord: node.body.coord,
            });
        }
        Ok(())
    }

    fn visit_decl(&mut self, node: &Decl) -> Result<(), SemanticError> {
        match &node.kind {
            DeclKind::Var(v) => self.check_var_decl(node, v),
            DeclKind::Array(a) => self.check_array_decl(node, a),
            DeclKind::Func(f) => {
                // A file-scope prototype: register the signature.
                let (fty, _) = self.func_type_of(f)?;
                self.declare(&node.name, fty)
            }
        }
    }

    fn visit_compound(&mut self, node: &Compound) -> Result<(), SemanticError> {
        let creates_scope = !self.suppress_next_scope;
        self.suppress_next_scope = false;
        if creates_scope {
            self.symtab.create();
        }
        let result = visit::walk_compound(self, node);
        if creates_scope {
            self.symtab.pop();
        }
        result
    }

    fn visit_if(&mut self, node: &If) -> Result<(), SemanticError> {
        let cond = self.check_expr(&node.cond)?;
        if cond != UcType::BOOL {
            return Err(SemanticError::IfCondNotBool {
                coord: node.cond.coord(),
            });
        }
        self.visit_stmt(&node.then_branch)?;
        if let Some(e) = &node.else_branch {
            self.visit_stmt(e)?;
        }
        Ok(())
    }

    fn visit_while(&mut self, node: &While) -> Result<(), SemanticError> {
        let cond = self.check_expr(&node.cond)?;
        if cond != UcType::BOOL {
            return Err(SemanticError::LoopCondNotBool {
                found: cond.typename().to_string(),
                coord: node.coord,
            });
        }
        self.loop_depth += 1;
        let result = self.visit_stmt(&node.body);
        self.loop_depth -= 1;
        result
    }

    fn visit_for(&mut self, node: &For) -> Result<(), SemanticError> {
        self.symtab.create();
        let result = (|| {
            match &node.init {
                Some(ForInit::Decls(list)) => {
                    for d in &list.decls {
                        self.visit_decl(d)?;
                    }
                }
                Some(ForInit::Assign(a)) => self.visit_assignment(a)?,
                None => {}
            }
            if let Some(cond) = &node.cond {
                let ty = self.check_expr(cond)?;
                if ty != UcType::BOOL {
                    return Err(SemanticError::LoopCondNotBool {
                        found: ty.typename().to_string(),
                        coord: node.coord,
                    });
                }
            }
            if let Some(step) = &node.step {
                self.visit_stmt(step)?;
            }
            self.loop_depth += 1;
            let body = self.visit_stmt(&node.body);
            self.loop_depth -= 1;
            body
        })();
        self.symtab.pop();
        result
    }

    fn visit_assignment(&mut self, node: &Assignment) -> Result<(), SemanticError> {
        let rtype = self.check_expr(&node.rvalue)?;
        let ltype = self.check_expr(&node.lvalue)?;

        if ltype != rtype {
            return Err(SemanticError::AssignTypeMismatch {
                ltype: ltype.typename().to_string(),
                rtype: rtype.typename().to_string(),
                coord: node.coord,
            });
        }

        let token = node.op.token();
        if !ltype.assign_ops().contains(&token) {
            return Err(SemanticError::OperandTypeMismatch {
                op: token.to_string(),
                coord: node.coord,
            });
        }
        Ok(())
    }

    fn visit_assert(&mut self, node: &Assert) -> Result<(), SemanticError> {
        let ty = self.check_expr(&node.expr)?;
        if ty != UcType::BOOL {
            return Err(SemanticError::AssertNotBool {
                coord: node.expr.coord(),
            });
        }
        Ok(())
    }

    fn visit_break(&mut self, node: &Break) -> Result<(), SemanticError> {
        if self.loop_depth == 0 {
            return Err(SemanticError::BreakOutsideLoop { coord: node.coord });
        }
        Ok(())
    }

    fn visit_print(&mut self, node: &Print) -> Result<(), SemanticError> {
        match &node.expr {
            None => Ok(()),
            Some(Expr::List(list)) => {
                for e in &list.exprs {
                    self.check_print_operand(e)?;
                }
                Ok(())
            }
            Some(e) => self.check_print_operand(e),
        }
    }

    fn visit_read(&mut self, node: &Read) -> Result<(), SemanticError> {
        match &node.targets {
            Expr::List(list) => {
                for e in &list.exprs {
                    self.check_read_target(e)?;
                }
                Ok(())
            }
            single => self.check_read_target(single),
        }
    }

    fn visit_return(&mut self, node: &Return) -> Result<(), SemanticError> {
        let expected = self.return_type.clone().unwrap_or(UcType::VOID);
        match &node.expr {
            Some(e) => {
                let ty = self.check_expr(e)?;
                if ty != expected {
                    return Err(SemanticError::ReturnTypeMismatch {
                        ltype: ty.typename().to_string(),
                        rtype: expected.typename().to_string(),
                        coord: node.coord,
                    });
                }
            }
            None => {
                if expected != UcType::VOID {
                    return Err(SemanticError::ReturnTypeMismatch {
                        ltype: "void".to_string(),
                        rtype: expected.typename().to_string(),
                        coord: node.coord,
                    });
                }
            }
        }
        self.has_return = true;
        Ok(())
    }

    fn visit_expr(&mut self, node: &Expr) -> Result<(), SemanticError> {
        self.check_expr(node).map(|_| ())
    }

    fn visit_func_call(&mut self, node: &FuncCall) -> Result<(), SemanticError> {
        self.check_call(node).map(|_| ())
    }
}
