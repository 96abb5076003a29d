//! Lowering of the type-annotated AST into uCIR.
//!
//! Generation runs in three ordered phases, encoded in the explicit
//! [`Phase`] enum consulted at every emission site:
//!
//! 1. `GlobalVariables` -- file-scope declarations become `global_*`
//!    tuples in the text prelude.
//! 2. `Allocate` -- each function is traversed once to emit its
//!    `define_*` header, `entry:` label, parameter and return-slot
//!    allocations, and an `alloc_*` for every local. No value code is
//!    emitted in this phase.
//! 3. `CodeGeneration` -- a second traversal emits the executable body,
//!    sharing the function's temporary counter with the allocate pass.
//!
//! Loop statements allocate their own declarations at the loop site by
//! flipping the phase back to `Allocate` for the declaration walk, so
//! the function-level allocate pass skips `while`/`for` bodies.
//!
//! Per function: temporaries come from a monotonically increasing
//! counter (`%1`, `%2`, ...); labels from per-category counters (first
//! occurrence bare, then `.N`); local variables are emitted as `%name`,
//! shadowed generations as `%name.N`. Globals are `@name` and tracked in
//! an ordered set. Parameter registers and the return slot are recorded
//! on the emitted [`FunctionIr`] for the optimizer's blacklist.

use indexmap::IndexSet;
use std::collections::HashMap;
use tracing::debug;

use ucc_core::ast::*;
use ucc_core::types::{PrimType, TypeMap, UcType};

use crate::block::{BlockId, Cfg};
use crate::error::CodegenError;
use crate::ir::{BinOpcode, Dims, GlobalValue, Instr, LiteralValue};

/// The generation phase currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    GlobalVariables,
    Allocate,
    CodeGeneration,
}

/// Per-category label supply: `if.then`, `if.then.1`, `if.then.2`, ...
#[derive(Debug, Default)]
struct LabelAllocator {
    counts: HashMap<String, u32>,
}

impl LabelAllocator {
    fn make(&mut self, category: &str) -> String {
        let count = self.counts.entry(category.to_string()).or_insert(0);
        let label = if *count == 0 {
            category.to_string()
        } else {
            format!("{category}.{count}")
        };
        *count += 1;
        label
    }
}

/// Per-function register supply: `%1`, `%2`, ...
#[derive(Debug)]
struct TempAllocator {
    next: u32,
}

impl TempAllocator {
    fn new() -> Self {
        TempAllocator { next: 1 }
    }

    fn fresh(&mut self) -> String {
        let reg = format!("%{}", self.next);
        self.next += 1;
        reg
    }
}

/// Shadow-aware local variable names: the outermost declaration of
/// `name` emits as `%name`, the N-th shadowing generation as `%name.N`.
/// A scope stack records introductions so popping restores the previous
/// generation.
#[derive(Debug, Default)]
struct LocalNames {
    generations: HashMap<String, u32>,
    scopes: Vec<Vec<String>>,
}

impl LocalNames {
    fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn pop_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for name in scope {
                if let Some(generation) = self.generations.get_mut(&name) {
                    *generation -= 1;
                    if *generation == 0 {
                        self.generations.remove(&name);
                    }
                }
            }
        }
    }

    fn declare(&mut self, name: &str) -> String {
        let generation = self.generations.entry(name.to_string()).or_insert(0);
        *generation += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(name.to_string());
        }
        Self::spelled(name, *generation)
    }

    fn resolve(&self, name: &str) -> String {
        Self::spelled(name, self.generations.get(name).copied().unwrap_or(1))
    }

    fn spelled(name: &str, generation: u32) -> String {
        if generation > 1 {
            format!("{name}.{generation}")
        } else {
            name.to_string()
        }
    }
}

/// The emitted IR of one function: its CFG plus the registers the
/// optimizer must never propagate away (parameters and return slot).
#[derive(Debug, Clone)]
pub struct FunctionIr {
    pub name: String,
    pub cfg: Cfg,
    pub param_regs: Vec<String>,
    pub return_slot: Option<String>,
}

impl FunctionIr {
    /// The function's instructions in layout order.
    pub fn code(&self) -> Vec<Instr> {
        self.cfg.linearize()
    }
}

/// The full generation result: the text prelude followed by each
/// function's CFG in declaration order.
#[derive(Debug, Clone)]
pub struct GeneratedProgram {
    pub text: Vec<Instr>,
    pub functions: Vec<FunctionIr>,
}

impl GeneratedProgram {
    /// The flat instruction listing: globals first, then each function.
    pub fn code(&self) -> Vec<Instr> {
        let mut code = self.text.clone();
        for func in &self.functions {
            code.extend(func.code());
        }
        code
    }
}

/// Lower a type-annotated program to uCIR.
pub fn generate(program: &Program, types: &TypeMap) -> Result<GeneratedProgram, CodegenError> {
    let mut gen = CodeGenerator::new(types);
    let mut functions = Vec::new();

    for item in &program.gdecls {
        match item {
            GlobalItem::Decl(g) => gen.lower_global_decl(g)?,
            GlobalItem::Func(f) => functions.push(gen.lower_function(f)?),
        }
    }

    Ok(GeneratedProgram {
        text: gen.text,
        functions,
    })
}

struct CodeGenerator<'a> {
    types: &'a TypeMap,
    phase: Phase,
    text: Vec<Instr>,
    globals: IndexSet<String>,
    text_counter: u32,

    // Per-function state, reset by `lower_function`.
    cfg: Cfg,
    current: BlockId,
    temps: TempAllocator,
    locals: LocalNames,
    labels: LabelAllocator,
    loop_ends: Vec<String>,
    return_slot: Option<String>,
    param_regs: Vec<String>,
}

impl<'a> CodeGenerator<'a> {
    fn new(types: &'a TypeMap) -> Self {
        let cfg = Cfg::new("_glob_");
        let entry = cfg.entry;
        CodeGenerator {
            types,
            phase: Phase::GlobalVariables,
            text: Vec::new(),
            globals: IndexSet::new(),
            text_counter: 0,
            cfg,
            current: entry,
            temps: TempAllocator::new(),
            locals: LocalNames::default(),
            labels: LabelAllocator::default(),
            loop_ends: Vec::new(),
            return_slot: None,
            param_regs: Vec::new(),
        }
    }

    // -- shared helpers -----------------------------------------------------

    fn ty_of(&self, id: ExprId) -> Result<&UcType, CodegenError> {
        self.types.get(&id).ok_or(CodegenError::MissingType { id })
    }

    fn prim_of(&self, id: ExprId) -> Result<PrimType, CodegenError> {
        Ok(self.ty_of(id)?.primitive())
    }

    /// A fresh text-constant name in the global section: `@.str.N` or
    /// `@.const_<var>.N`.
    fn new_text(&mut self, tag: &str) -> String {
        let name = format!("@.{tag}.{}", self.text_counter);
        self.text_counter += 1;
        name
    }

    /// The address of a named variable or function: `@name` for globals,
    /// `%name[.N]` for locals.
    fn address_of(&self, name: &str) -> String {
        if self.globals.contains(name) {
            format!("@{name}")
        } else {
            format!("%{}", self.locals.resolve(name))
        }
    }

    fn push(&mut self, instr: Instr) {
        self.cfg.push(self.current, instr);
    }

    /// Link `block` after the current one, move into it, and emit its
    /// entry label.
    fn connect(&mut self, block: BlockId, label: &str) {
        self.cfg.link(self.current, block);
        self.current = block;
        self.push(Instr::Label(label.to_string()));
    }

    fn current_ends_in_terminator(&self) -> bool {
        self.cfg
            .block(self.current)
            .instrs
            .last()
            .is_some_and(Instr::is_terminator)
    }

    // -- global declarations ------------------------------------------------

    fn lower_global_decl(&mut self, gdecl: &GlobalDecl) -> Result<(), CodegenError> {
        for decl in &gdecl.decls {
            let name = decl.name.name.clone();
            match &decl.kind {
                DeclKind::Var(var) => {
                    self.globals.insert(name.clone());
                    match &decl.init {
                        Some(Expr::Constant(c)) => {
                            if let ConstValue::Str(s) = &c.value {
                                self.text.push(Instr::GlobalString {
                                    name: format!("@{name}"),
                                    value: s.clone(),
                                });
                            } else {
                                self.text.push(Instr::Global {
                                    ty: var.type_spec.name,
                                    dims: Dims::new(),
                                    name: format!("@{name}"),
                                    value: Some(scalar_value(&c.value, &name)?),
                                });
                            }
                        }
                        Some(_) => {
                            return Err(CodegenError::NonConstantGlobal { name });
                        }
                        None => self.text.push(Instr::Global {
                            ty: var.type_spec.name,
                            dims: Dims::new(),
                            name: format!("@{name}"),
                            value: None,
                        }),
                    }
                }
                DeclKind::Array(array) => {
                    self.globals.insert(name.clone());
                    let (prim, dims) = array_info(&name, array, decl.init.as_ref())?;
                    match &decl.init {
                        Some(Expr::InitList(list)) => {
                            let value = list_value(list, &name)?;
                            self.text.push(Instr::Global {
                                ty: prim,
                                dims,
                                name: format!("@{name}"),
                                value: Some(value),
                            });
                        }
                        Some(Expr::Constant(c)) => {
                            if let ConstValue::Str(s) = &c.value {
                                self.text.push(Instr::GlobalString {
                                    name: format!("@{name}"),
                                    value: s.clone(),
                                });
                            } else {
                                return Err(CodegenError::NonConstantGlobal { name });
                            }
                        }
                        Some(_) => return Err(CodegenError::NonConstantGlobal { name }),
                        None => self.text.push(Instr::Global {
                            ty: prim,
                            dims,
                            name: format!("@{name}"),
                            value: None,
                        }),
                    }
                }
                // A file-scope prototype only makes the name addressable.
                DeclKind::Func(_) => {
                    self.globals.insert(name);
                }
            }
        }
        Ok(())
    }

    // -- functions ----------------------------------------------------------

    fn lower_function(&mut self, func: &FuncDef) -> Result<FunctionIr, CodegenError> {
        let name = func.name().to_string();
        debug!(function = %name, "lowering function");

        self.globals.insert(name.clone());
        self.phase = Phase::Allocate;
        self.cfg = Cfg::new(name.clone());
        self.current = self.cfg.entry;
        self.temps = TempAllocator::new();
        self.locals = LocalNames::default();
        self.labels = LabelAllocator::default();
        self.loop_ends.clear();
        self.return_slot = None;
        self.param_regs.clear();
        self.locals.push_scope();

        let ret = func.return_type.name;
        let params = param_decls(&func.decl)?;

        // Stack slots for parameters, then their value registers.
        let mut slots = Vec::with_capacity(params.len());
        for (pty, pname) in &params {
            let slot = format!("%{}", self.locals.declare(pname));
            slots.push((*pty, slot));
        }
        for _ in &params {
            let reg = self.temps.fresh();
            self.param_regs.push(reg);
        }

        let define_params: Vec<(PrimType, String)> = params
            .iter()
            .zip(&self.param_regs)
            .map(|((pty, _), reg)| (*pty, reg.clone()))
            .collect();
        self.push(Instr::Define {
            ty: ret,
            name: format!("@{name}"),
            params: define_params,
        });
        self.push(Instr::Label("entry".to_string()));

        for (pty, slot) in &slots {
            self.push(Instr::Alloc {
                ty: *pty,
                dims: Dims::new(),
                dst: slot.clone(),
            });
        }

        if ret != PrimType::Void {
            let slot = self.temps.fresh();
            self.push(Instr::Alloc {
                ty: ret,
                dims: Dims::new(),
                dst: slot.clone(),
            });
            self.return_slot = Some(slot);
        }

        // Allocate pass over the body: declarations only.
        for item in &func.body.items {
            self.allocate_stmt(item)?;
        }

        // Code generation pass: spill parameters, then emit the body.
        self.phase = Phase::CodeGeneration;
        let param_regs = self.param_regs.clone();
        for ((pty, pname), reg) in params.iter().zip(param_regs) {
            let dst = self.address_of(pname);
            self.push(Instr::Store {
                ty: *pty,
                deref: false,
                src: reg,
                dst,
            });
        }
        self.emit_compound(&func.body)?;

        // Epilogue: the dedicated exit block loads the return slot.
        if !self.current_ends_in_terminator() {
            self.push(Instr::Jump {
                target: "exit".to_string(),
            });
        }
        let exit_block = self.cfg.add_basic("exit");
        self.connect(exit_block, "exit");
        match self.return_slot.clone() {
            Some(slot) => {
                let value = self.temps.fresh();
                self.push(Instr::Load {
                    ty: ret,
                    deref: false,
                    src: slot,
                    dst: value.clone(),
                });
                self.push(Instr::Return {
                    ty: ret,
                    src: value,
                });
            }
            None => self.push(Instr::ReturnVoid),
        }

        self.locals.pop_scope();
        self.phase = Phase::GlobalVariables;

        let cfg = std::mem::replace(&mut self.cfg, Cfg::new("_glob_"));
        Ok(FunctionIr {
            name,
            cfg,
            param_regs: self.param_regs.clone(),
            return_slot: self.return_slot.clone(),
        })
    }

    /// The function-level allocate walk: descend compounds and `if`
    /// branches collecting declarations. Loop statements are skipped --
    /// they allocate their own declarations at the loop site.
    fn allocate_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Decl(d) => self.emit_decl(d),
            Stmt::Compound(c) => {
                for item in &c.items {
                    self.allocate_stmt(item)?;
                }
                Ok(())
            }
            Stmt::If(i) => {
                self.allocate_stmt(&i.then_branch)?;
                if let Some(e) = &i.else_branch {
                    self.allocate_stmt(e)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // -- declarations -------------------------------------------------------

    fn emit_decl(&mut self, decl: &Decl) -> Result<(), CodegenError> {
        match self.phase {
            Phase::Allocate => match &decl.kind {
                DeclKind::Var(var) => {
                    let dst = format!("%{}", self.locals.declare(&decl.name.name));
                    self.push(Instr::Alloc {
                        ty: var.type_spec.name,
                        dims: Dims::new(),
                        dst,
                    });
                    Ok(())
                }
                DeclKind::Array(array) => {
                    let name = &decl.name.name;
                    let (prim, dims) = array_info(name, array, decl.init.as_ref())?;
                    match &decl.init {
                        Some(Expr::InitList(list)) => {
                            let value = list_value(list, name)?;
                            let text_name = self.new_text(&format!("const_{name}"));
                            self.text.push(Instr::Global {
                                ty: prim,
                                dims: dims.clone(),
                                name: text_name,
                                value: Some(value),
                            });
                        }
                        Some(Expr::Constant(c)) => {
                            if let ConstValue::Str(s) = &c.value {
                                let text_name = self.new_text(&format!("const_{name}"));
                                self.text.push(Instr::GlobalString {
                                    name: text_name,
                                    value: s.clone(),
                                });
                            }
                        }
                        _ => {}
                    }
                    let dst = format!("%{}", self.locals.declare(name));
                    self.push(Instr::Alloc {
                        ty: prim,
                        dims,
                        dst,
                    });
                    Ok(())
                }
                DeclKind::Func(_) => Ok(()),
            },
            Phase::CodeGeneration => {
                // Only scalar initializers produce code; array data lives
                // in the text constant emitted during allocation.
                if let DeclKind::Var(var) = &decl.kind {
                    match &decl.init {
                        Some(Expr::InitList(_)) | None => {}
                        Some(init) => {
                            let value = self.emit_expr(init)?;
                            let dst = self.address_of(&decl.name.name);
                            self.push(Instr::Store {
                                ty: var.type_spec.name,
                                deref: false,
                                src: value,
                                dst,
                            });
                        }
                    }
                }
                Ok(())
            }
            Phase::GlobalVariables => Err(CodegenError::Unsupported {
                what: "declaration emitted outside a function".to_string(),
            }),
        }
    }

    // -- statements ---------------------------------------------------------

    fn emit_compound(&mut self, compound: &Compound) -> Result<(), CodegenError> {
        for item in &compound.items {
            self.emit_stmt(item)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Decl(d) => self.emit_decl(d),
            Stmt::If(i) => self.emit_if(i),
            Stmt::While(w) => self.emit_while(w),
            Stmt::For(f) => self.emit_for(f),
            Stmt::Compound(c) => self.emit_compound(c),
            Stmt::Assign(a) => self.emit_assignment(a),
            Stmt::Assert(a) => self.emit_assert(a),
            Stmt::Break(_) => self.emit_break(),
            Stmt::Print(p) => self.emit_print(p),
            Stmt::Read(r) => self.emit_read(r),
            Stmt::Return(r) => self.emit_return(r),
            Stmt::Call(c) => self.emit_call(c).map(|_| ()),
            Stmt::Empty(_) => Ok(()),
        }
    }

    fn emit_if(&mut self, stmt: &If) -> Result<(), CodegenError> {
        let cond = self.emit_expr(&stmt.cond)?;

        let then_label = self.labels.make("if.then");
        let end_label = self.labels.make("if.end");
        let exit_label = self.labels.make("if.exit");

        self.push(Instr::CBranch {
            cond,
            true_target: then_label.clone(),
            false_target: end_label.clone(),
        });

        let then_block = self.cfg.add_basic(&then_label);
        let end_block = self.cfg.add_basic(&end_label);
        let exit_block = self.cfg.add_basic(&exit_label);

        self.connect(then_block, &then_label);
        self.emit_stmt(&stmt.then_branch)?;
        self.push(Instr::Jump {
            target: exit_label.clone(),
        });

        self.connect(end_block, &end_label);
        if let Some(else_branch) = &stmt.else_branch {
            self.emit_stmt(else_branch)?;
        }
        self.push(Instr::Jump {
            target: exit_label.clone(),
        });

        self.connect(exit_block, &exit_label);
        Ok(())
    }

    fn emit_while(&mut self, stmt: &While) -> Result<(), CodegenError> {
        self.locals.push_scope();

        // Loop-site allocation of the body's declarations.
        self.phase = Phase::Allocate;
        self.allocate_stmt(&stmt.body)?;
        self.phase = Phase::CodeGeneration;

        let cond_label = self.labels.make("while.cond");
        let body_label = self.labels.make("while.body");
        let end_label = self.labels.make("while.end");

        self.push(Instr::Jump {
            target: cond_label.clone(),
        });

        let cond_block = self.cfg.add_condition(&cond_label);
        let body_block = self.cfg.add_basic(&body_label);
        let end_block = self.cfg.add_basic(&end_label);
        self.cfg.set_branches(cond_block, body_block, end_block);

        self.connect(cond_block, &cond_label);
        let cond = self.emit_expr(&stmt.cond)?;
        self.push(Instr::CBranch {
            cond,
            true_target: body_label.clone(),
            false_target: end_label.clone(),
        });

        self.connect(body_block, &body_label);
        self.loop_ends.push(end_label.clone());
        self.emit_stmt(&stmt.body)?;
        self.loop_ends.pop();
        self.push(Instr::Jump {
            target: cond_label,
        });

        self.connect(end_block, &end_label);
        self.locals.pop_scope();
        Ok(())
    }

    fn emit_for(&mut self, stmt: &For) -> Result<(), CodegenError> {
        self.locals.push_scope();

        // Loop-site allocation: the initializer's declarations plus any
        // declared inside the body.
        self.phase = Phase::Allocate;
        if let Some(ForInit::Decls(list)) = &stmt.init {
            for d in &list.decls {
                self.emit_decl(d)?;
            }
        }
        self.allocate_stmt(&stmt.body)?;
        self.phase = Phase::CodeGeneration;

        match &stmt.init {
            Some(ForInit::Decls(list)) => {
                for d in &list.decls {
                    self.emit_decl(d)?;
                }
            }
            Some(ForInit::Assign(a)) => self.emit_assignment(a)?,
            None => {}
        }

        let cond_label = self.labels.make("for.cond");
        let body_label = self.labels.make("for.body");
        let end_label = self.labels.make("for.end");
        let inc_label = self.labels.make("for.inc");

        self.push(Instr::Jump {
            target: cond_label.clone(),
        });

        let cond_block = self.cfg.add_condition(&cond_label);
        let body_block = self.cfg.add_basic(&body_label);
        let end_block = self.cfg.add_basic(&end_label);
        let inc_block = self.cfg.add_basic(&inc_label);
        self.cfg.set_branches(cond_block, body_block, end_block);

        self.connect(cond_block, &cond_label);
        let cond = match &stmt.cond {
            Some(expr) => self.emit_expr(expr)?,
            None => {
                let reg = self.temps.fresh();
                self.push(Instr::Literal {
                    ty: PrimType::Bool,
                    value: LiteralValue::Bool(true),
                    dst: reg.clone(),
                });
                reg
            }
        };
        self.push(Instr::CBranch {
            cond,
            true_target: body_label.clone(),
            false_target: end_label.clone(),
        });

        self.connect(body_block, &body_label);
        self.loop_ends.push(end_label.clone());
        self.emit_stmt(&stmt.body)?;
        self.loop_ends.pop();
        self.push(Instr::Jump {
            target: inc_label.clone(),
        });

        self.connect(inc_block, &inc_label);
        if let Some(step) = &stmt.step {
            self.emit_stmt(step)?;
        }
        self.push(Instr::Jump {
            target: cond_label,
        });

        self.connect(end_block, &end_label);
        self.locals.pop_scope();
        Ok(())
    }

    fn emit_assignment(&mut self, stmt: &Assignment) -> Result<(), CodegenError> {
        let value = self.emit_expr(&stmt.rvalue)?;
        match &stmt.lvalue {
            Expr::Id(id) => {
                let ty = self.prim_of(id.id)?;
                let dst = self.address_of(&id.name);
                self.push(Instr::Store {
                    ty,
                    deref: false,
                    src: value,
                    dst,
                });
                Ok(())
            }
            Expr::ArrayRef(array_ref) => {
                let addr = self.emit_elem_addr(array_ref)?;
                let ty = self.prim_of(array_ref.id)?;
                self.push(Instr::Store {
                    ty,
                    deref: true,
                    src: value,
                    dst: addr,
                });
                Ok(())
            }
            other => Err(CodegenError::Unsupported {
                what: format!("assignment to {}", other.kind_name()),
            }),
        }
    }

    fn emit_assert(&mut self, stmt: &Assert) -> Result<(), CodegenError> {
        let cond = self.emit_expr(&stmt.expr)?;

        // The failure message lives in the text section.
        let message = self.new_text("str");
        self.text.push(Instr::GlobalString {
            name: message.clone(),
            value: format!("assertion_fail on {}", stmt.expr.coord()),
        });

        let cond_label = self.labels.make("assert");
        let false_label = self.labels.make("assert.false");
        let true_label = self.labels.make("assert.true");

        let cond_block = self.cfg.add_condition(&cond_label);
        let false_block = self.cfg.add_basic(&false_label);
        let true_block = self.cfg.add_basic(&true_label);
        self.cfg.set_branches(cond_block, true_block, false_block);

        // The condition block holds only the branch; it carries no label
        // instruction of its own.
        self.cfg.link(self.current, cond_block);
        self.current = cond_block;
        self.push(Instr::CBranch {
            cond,
            true_target: true_label.clone(),
            false_target: false_label.clone(),
        });

        self.connect(false_block, &false_label);
        self.push(Instr::PrintString { name: message });
        self.push(Instr::Jump {
            target: "exit".to_string(),
        });

        self.connect(true_block, &true_label);
        Ok(())
    }

    fn emit_break(&mut self) -> Result<(), CodegenError> {
        let target = self
            .loop_ends
            .last()
            .cloned()
            .ok_or_else(|| CodegenError::Unsupported {
                what: "break outside of a loop".to_string(),
            })?;
        self.push(Instr::Jump { target });
        Ok(())
    }

    fn emit_print(&mut self, stmt: &Print) -> Result<(), CodegenError> {
        match &stmt.expr {
            None => {
                self.push(Instr::PrintVoid);
                Ok(())
            }
            Some(Expr::List(list)) => {
                for expr in &list.exprs {
                    self.emit_print_operand(expr)?;
                }
                Ok(())
            }
            Some(expr) => self.emit_print_operand(expr),
        }
    }

    fn emit_print_operand(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        let value = self.emit_expr(expr)?;
        let ty = self.prim_of(expr.id())?;
        if ty == PrimType::String {
            self.push(Instr::PrintString { name: value });
        } else {
            self.push(Instr::Print { ty, src: value });
        }
        Ok(())
    }

    fn emit_read(&mut self, stmt: &Read) -> Result<(), CodegenError> {
        match &stmt.targets {
            Expr::List(list) => {
                for expr in &list.exprs {
                    self.emit_read_target(expr)?;
                }
                Ok(())
            }
            single => self.emit_read_target(single),
        }
    }

    fn emit_read_target(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        match expr {
            Expr::Id(id) => {
                let ty = self.prim_of(id.id)?;
                let dst = self.address_of(&id.name);
                self.push(Instr::Read { ty, dst });
                Ok(())
            }
            Expr::ArrayRef(array_ref) => {
                let addr = self.emit_elem_addr(array_ref)?;
                let ty = self.prim_of(array_ref.id)?;
                self.push(Instr::Read { ty, dst: addr });
                Ok(())
            }
            other => Err(CodegenError::Unsupported {
                what: format!("read into {}", other.kind_name()),
            }),
        }
    }

    fn emit_return(&mut self, stmt: &Return) -> Result<(), CodegenError> {
        if let Some(expr) = &stmt.expr {
            let value = self.emit_expr(expr)?;
            let ty = self.prim_of(expr.id())?;
            let slot = self
                .return_slot
                .clone()
                .ok_or_else(|| CodegenError::Unsupported {
                    what: "value return in a void function".to_string(),
                })?;
            self.push(Instr::Store {
                ty,
                deref: false,
                src: value,
                dst: slot,
            });
        }
        self.push(Instr::Jump {
            target: "exit".to_string(),
        });
        Ok(())
    }

    // -- expressions --------------------------------------------------------

    fn emit_expr(&mut self, expr: &Expr) -> Result<String, CodegenError> {
        match expr {
            Expr::Constant(c) => self.emit_constant(c),
            Expr::Id(id) => {
                let ty = self.prim_of(id.id)?;
                let src = self.address_of(&id.name);
                let dst = self.temps.fresh();
                self.push(Instr::Load {
                    ty,
                    deref: false,
                    src,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
            Expr::Binary(b) => {
                let left = self.emit_expr(&b.left)?;
                let right = self.emit_expr(&b.right)?;
                let ty = self.prim_of(b.left.id())?;
                let dst = self.temps.fresh();
                self.push(Instr::Binary {
                    op: BinOpcode::from(b.op),
                    ty,
                    left,
                    right,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
            Expr::Unary(u) => self.emit_unary(u),
            Expr::Call(c) => self.emit_call(c),
            Expr::ArrayRef(a) => {
                let addr = self.emit_elem_addr(a)?;
                let ty = self.prim_of(a.id)?;
                let dst = self.temps.fresh();
                self.push(Instr::Load {
                    ty,
                    deref: true,
                    src: addr,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
            Expr::InitList(_) | Expr::List(_) => Err(CodegenError::Unsupported {
                what: format!("{} in value position", expr.kind_name()),
            }),
        }
    }

    fn emit_constant(&mut self, constant: &Constant) -> Result<String, CodegenError> {
        match &constant.value {
            ConstValue::Str(s) => {
                let name = self.new_text("str");
                self.text.push(Instr::GlobalString {
                    name: name.clone(),
                    value: s.clone(),
                });
                Ok(name)
            }
            other => {
                let (ty, value) = match other {
                    ConstValue::Int(v) => (PrimType::Int, LiteralValue::Int(*v)),
                    ConstValue::Char(c) => (PrimType::Char, LiteralValue::Char(*c)),
                    ConstValue::Bool(b) => (PrimType::Bool, LiteralValue::Bool(*b)),
                    ConstValue::Str(_) => unreachable!("handled above"),
                };
                let dst = self.temps.fresh();
                self.push(Instr::Literal {
                    ty,
                    value,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
        }
    }

    fn emit_unary(&mut self, unary: &UnaryOp) -> Result<String, CodegenError> {
        match unary.op {
            UnaryOpKind::Plus => self.emit_expr(&unary.expr),
            UnaryOpKind::Not => {
                let src = self.emit_expr(&unary.expr)?;
                let dst = self.temps.fresh();
                self.push(Instr::Not {
                    src,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
            UnaryOpKind::Neg => {
                let operand = self.emit_expr(&unary.expr)?;
                let ty = self.prim_of(unary.expr.id())?;
                let zero = self.temps.fresh();
                self.push(Instr::Literal {
                    ty,
                    value: LiteralValue::Int(0),
                    dst: zero.clone(),
                });
                let dst = self.temps.fresh();
                self.push(Instr::Binary {
                    op: BinOpcode::Sub,
                    ty,
                    left: zero,
                    right: operand,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
        }
    }

    fn emit_call(&mut self, call: &FuncCall) -> Result<String, CodegenError> {
        // The result register is allocated before argument evaluation.
        let dst = self.temps.fresh();
        let ret = self.prim_of(call.id)?;

        for arg in call.arg_exprs() {
            let value = self.emit_expr(arg)?;
            let ty = self.prim_of(arg.id())?;
            self.push(Instr::Param { ty, src: value });
        }

        self.push(Instr::Call {
            ty: ret,
            func: format!("@{}", call.name.name),
            dst: dst.clone(),
        });
        Ok(dst)
    }

    /// Compute the address of an array element: the subscripts are
    /// flattened into a row-major linear index, then a single `elem_<T>`
    /// yields the address.
    fn emit_elem_addr(&mut self, array_ref: &ArrayRef) -> Result<String, CodegenError> {
        let base = array_ref
            .base_id()
            .ok_or_else(|| CodegenError::Unsupported {
                what: "array reference without an identifier base".to_string(),
            })?;
        let base_ty = self.ty_of(base.id)?.clone();
        let lens = array_lens(&base_ty);
        let subs = array_ref.subscripts();

        let mut index = self.emit_expr(subs[0])?;
        for (k, sub) in subs.iter().enumerate().skip(1) {
            let dim = lens
                .get(k)
                .copied()
                .flatten()
                .ok_or_else(|| CodegenError::UnresolvedDimension {
                    name: base.name.clone(),
                })?;
            let dim_reg = self.temps.fresh();
            self.push(Instr::Literal {
                ty: PrimType::Int,
                value: LiteralValue::Int(dim as i64),
                dst: dim_reg.clone(),
            });
            let scaled = self.temps.fresh();
            self.push(Instr::Binary {
                op: BinOpcode::Mul,
                ty: PrimType::Int,
                left: index,
                right: dim_reg,
                dst: scaled.clone(),
            });
            let sub_reg = self.emit_expr(sub)?;
            let summed = self.temps.fresh();
            self.push(Instr::Binary {
                op: BinOpcode::Add,
                ty: PrimType::Int,
                left: scaled,
                right: sub_reg,
                dst: summed.clone(),
            });
            index = summed;
        }

        let ty = self.prim_of(array_ref.id)?;
        let base_addr = self.address_of(&base.name);
        let dst = self.temps.fresh();
        self.push(Instr::Elem {
            ty,
            base: base_addr,
            index,
            dst: dst.clone(),
        });
        Ok(dst)
    }
}

// -- free helpers -----------------------------------------------------------

/// Parameter declarations of a function definition, in order.
fn param_decls(decl: &Decl) -> Result<Vec<(PrimType, String)>, CodegenError> {
    let DeclKind::Func(func) = &decl.kind else {
        return Err(CodegenError::Unsupported {
            what: format!("function definition without a function declarator: {}", decl.name.name),
        });
    };
    let mut params = Vec::new();
    if let Some(list) = &func.params {
        for p in &list.params {
            match &p.kind {
                DeclKind::Var(v) => params.push((v.type_spec.name, p.name.name.clone())),
                _ => {
                    return Err(CodegenError::Unsupported {
                        what: format!("non-scalar parameter '{}'", p.name.name),
                    })
                }
            }
        }
    }
    Ok(params)
}

/// Element type and per-axis lengths of an array declarator, inferring
/// missing dimensions from the initializer list where possible.
fn array_info(
    name: &str,
    array: &ArrayDecl,
    init: Option<&Expr>,
) -> Result<(PrimType, Dims), CodegenError> {
    let mut declared: Vec<Option<usize>> = Vec::new();
    let mut level = array;
    let prim;
    loop {
        declared.push(const_dim(level.dim.as_ref()));
        match level.inner.as_ref() {
            DeclKind::Array(inner) => level = inner,
            DeclKind::Var(v) => {
                prim = v.type_spec.name;
                break;
            }
            DeclKind::Func(_) => {
                return Err(CodegenError::Unsupported {
                    what: format!("array of functions '{name}'"),
                })
            }
        }
    }

    let inferred = match init {
        Some(Expr::InitList(list)) => init_list_dims(list),
        Some(Expr::Constant(c)) => match &c.value {
            ConstValue::Str(s) => vec![s.chars().count()],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let mut dims = Dims::new();
    for (i, slot) in declared.iter().enumerate() {
        match slot.or_else(|| inferred.get(i).copied()) {
            Some(d) => dims.push(d),
            None => {
                return Err(CodegenError::UnresolvedDimension {
                    name: name.to_string(),
                })
            }
        }
    }
    Ok((prim, dims))
}

fn const_dim(dim: Option<&Expr>) -> Option<usize> {
    match dim {
        Some(Expr::Constant(c)) => match c.value {
            ConstValue::Int(v) if v > 0 => Some(v as usize),
            _ => None,
        },
        _ => None,
    }
}

/// Per-axis sizes of a (well-formed) initializer list.
fn init_list_dims(list: &InitList) -> Vec<usize> {
    let mut dims = vec![list.exprs.len()];
    if let Some(Expr::InitList(inner)) = list.exprs.first() {
        dims.extend(init_list_dims(inner));
    }
    dims
}

/// Per-axis lengths recorded on an array type.
fn array_lens(ty: &UcType) -> Vec<Option<usize>> {
    let mut lens = Vec::new();
    let mut cursor = ty;
    while let UcType::Array { elem, len } = cursor {
        lens.push(*len);
        cursor = elem;
    }
    lens
}

fn scalar_value(value: &ConstValue, name: &str) -> Result<GlobalValue, CodegenError> {
    match value {
        ConstValue::Int(v) => Ok(GlobalValue::Int(*v)),
        ConstValue::Char(c) => Ok(GlobalValue::Char(*c)),
        ConstValue::Bool(b) => Ok(GlobalValue::Bool(*b)),
        ConstValue::Str(_) => Err(CodegenError::NonConstantGlobal {
            name: name.to_string(),
        }),
    }
}

fn list_value(list: &InitList, name: &str) -> Result<GlobalValue, CodegenError> {
    let mut items = Vec::with_capacity(list.exprs.len());
    for expr in &list.exprs {
        match expr {
            Expr::Constant(c) => items.push(scalar_value(&c.value, name)?),
            Expr::InitList(inner) => items.push(list_value(inner, name)?),
            _ => {
                return Err(CodegenError::NonConstantGlobal {
                    name: name.to_string(),
                })
            }
        }
    }
    Ok(GlobalValue::List(items))
}
