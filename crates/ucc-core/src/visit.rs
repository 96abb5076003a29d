//! AST visitor framework.
//!
//! A [`Visitor`] trait with one method per node kind, each defaulting to
//! the matching `walk_*` free function that performs preorder traversal
//! of the node's children. Implementors override only the methods they
//! care about; everything else falls through to the default walk.
//!
//! Traversal is fallible: every method returns `Result<(), V::Error>` so
//! a visitor can abort on its first diagnostic.

use crate::ast::*;

/// A fallible preorder AST visitor.
pub trait Visitor {
    type Error;

    fn visit_program(&mut self, node: &Program) -> Result<(), Self::Error> {
        walk_program(self, node)
    }

    fn visit_global_decl(&mut self, node: &GlobalDecl) -> Result<(), Self::Error> {
        walk_global_decl(self, node)
    }

    fn visit_func_def(&mut self, node: &FuncDef) -> Result<(), Self::Error> {
        walk_func_def(self, node)
    }

    fn visit_decl(&mut self, node: &Decl) -> Result<(), Self::Error> {
        walk_decl(self, node)
    }

    fn visit_stmt(&mut self, node: &Stmt) -> Result<(), Self::Error> {
        walk_stmt(self, node)
    }

    fn visit_if(&mut self, node: &If) -> Result<(), Self::Error> {
        walk_if(self, node)
    }

    fn visit_while(&mut self, node: &While) -> Result<(), Self::Error> {
        walk_while(self, node)
    }

    fn visit_for(&mut self, node: &For) -> Result<(), Self::Error> {
        walk_for(self, node)
    }

    fn visit_compound(&mut self, node: &Compound) -> Result<(), Self::Error> {
        walk_compound(self, node)
    }

    fn visit_assignment(&mut self, node: &Assignment) -> Result<(), Self::Error> {
        walk_assignment(self, node)
    }

    fn visit_assert(&mut self, node: &Assert) -> Result<(), Self::Error> {
        self.visit_expr(&node.expr)
    }

    fn visit_break(&mut self, _node: &Break) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_print(&mut self, node: &Print) -> Result<(), Self::Error> {
        match &node.expr {
            Some(e) => self.visit_expr(e),
            None => Ok(()),
        }
    }

    fn visit_read(&mut self, node: &Read) -> Result<(), Self::Error> {
        self.visit_expr(&node.targets)
    }

    fn visit_return(&mut self, node: &Return) -> Result<(), Self::Error> {
        match &node.expr {
            Some(e) => self.visit_expr(e),
            None => Ok(()),
        }
    }

    fn visit_empty_statement(&mut self, _node: &EmptyStatement) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_expr(&mut self, node: &Expr) -> Result<(), Self::Error> {
        walk_expr(self, node)
    }

    fn visit_func_call(&mut self, node: &FuncCall) -> Result<(), Self::Error> {
        walk_func_call(self, node)
    }
}

pub fn walk_program<V: Visitor + ?Sized>(v: &mut V, node: &Program) -> Result<(), V::Error> {
    for item in &node.gdecls {
        match item {
            GlobalItem::Decl(g) => v.visit_global_decl(g)?,
            GlobalItem::Func(f) => v.visit_func_def(f)?,
        }
    }
    Ok(())
}

pub fn walk_global_decl<V: Visitor + ?Sized>(v: &mut V, node: &GlobalDecl) -> Result<(), V::Error> {
    for d in &node.decls {
        v.visit_decl(d)?;
    }
    Ok(())
}

pub fn walk_func_def<V: Visitor + ?Sized>(v: &mut V, node: &FuncDef) -> Result<(), V::Error> {
    v.visit_decl(&node.decl)?;
    v.visit_compound(&node.body)
}

pub fn walk_decl<V: Visitor + ?Sized>(v: &mut V, node: &Decl) -> Result<(), V::Error> {
    if let DeclKind::Func(f) = &node.kind {
        if let Some(params) = &f.params {
            for p in &params.params {
                v.visit_decl(p)?;
            }
        }
    }
    if let Some(init) = &node.init {
        v.visit_expr(init)?;
    }
    Ok(())
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, node: &Stmt) -> Result<(), V::Error> {
    match node {
        Stmt::Decl(d) => v.visit_decl(d),
        Stmt::If(i) => v.visit_if(i),
        Stmt::While(w) => v.visit_while(w),
        Stmt::For(f) => v.visit_for(f),
        Stmt::Compound(c) => v.visit_compound(c),
        Stmt::Assign(a) => v.visit_assignment(a),
        Stmt::Assert(a) => v.visit_assert(a),
        Stmt::Break(b) => v.visit_break(b),
        Stmt::Print(p) => v.visit_print(p),
        Stmt::Read(r) => v.visit_read(r),
        Stmt::Return(r) => v.visit_return(r),
        Stmt::Call(c) => v.visit_func_call(c),
        Stmt::Empty(e) => v.visit_empty_statement(e),
    }
}

pub fn walk_if<V: Visitor + ?Sized>(v: &mut V, node: &If) -> Result<(), V::Error> {
    v.visit_expr(&node.cond)?;
    v.visit_stmt(&node.then_branch)?;
    if let Some(e) = &node.else_branch {
        v.visit_stmt(e)?;
    }
    Ok(())
}

pub fn walk_while<V: Visitor + ?Sized>(v: &mut V, node: &While) -> Result<(), V::Error> {
    v.visit_expr(&node.cond)?;
    v.visit_stmt(&node.body)
}

pub fn walk_for<V: Visitor + ?Sized>(v: &mut V, node: &For) -> Result<(), V::Error> {
    match &node.init {
        Some(ForInit::Decls(list)) => {
            for d in &list.decls {
                v.visit_decl(d)?;
            }
        }
        Some(ForInit::Assign(a)) => v.visit_assignment(a)?,
        None => {}
    }
    if let Some(c) = &node.cond {
        v.visit_expr(c)?;
    }
    if let Some(s) = &node.step {
        v.visit_stmt(s)?;
    }
    v.visit_stmt(&node.body)
}

pub fn walk_compound<V: Visitor + ?Sized>(v: &mut V, node: &Compound) -> Result<(), V::Error> {
    for item in &node.items {
        v.visit_stmt(item)?;
    }
    Ok(())
}

pub fn walk_assignment<V: Visitor + ?Sized>(v: &mut V, node: &Assignment) -> Result<(), V::Error> {
    v.visit_expr(&node.rvalue)?;
    v.visit_expr(&node.lvalue)
}

pub fn walk_func_call<V: Visitor + ?Sized>(v: &mut V, node: &FuncCall) -> Result<(), V::Error> {
    for arg in node.arg_exprs() {
        v.visit_expr(arg)?;
    }
    Ok(())
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, node: &Expr) -> Result<(), V::Error> {
    match node {
        Expr::Constant(_) | Expr::Id(_) => Ok(()),
        Expr::Binary(b) => {
            v.visit_expr(&b.left)?;
            v.visit_expr(&b.right)
        }
        Expr::Unary(u) => v.visit_expr(&u.expr),
        Expr::Call(c) => v.visit_func_call(c),
        Expr::ArrayRef(a) => {
            v.visit_expr(&a.name)?;
            v.visit_expr(&a.subscript)
        }
        Expr::InitList(l) => {
            for e in &l.exprs {
                v.visit_expr(e)?;
            }
            Ok(())
        }
        Expr::List(l) => {
            for e in &l.exprs {
                v.visit_expr(e)?;
            }
            Ok(())
        }
    }
}
