//! End-to-end generation tests: build an AST, run semantic analysis,
//! lower to uCIR, and check the emitted instruction stream and the CFG
//! invariants (register single-assignment, one entry/exit per function,
//! resolvable branch targets).

use std::collections::HashSet;

use ucc_check::analyze;
use ucc_codegen::{generate, GeneratedProgram, Instr};
use ucc_core::ast::*;
use ucc_core::types::PrimType;
use ucc_core::Coord;

// ---------------------------------------------------------------------------
// AST builders
// ---------------------------------------------------------------------------

fn at(line: u32, column: u32) -> Coord {
    Coord::new(line, column)
}

fn spec(prim: PrimType, line: u32) -> TypeSpec {
    TypeSpec {
        name: prim,
        coord: at(line, 1),
    }
}

fn ident(text: &str, line: u32, column: u32) -> Id {
    Id {
        id: ExprId::default(),
        name: text.to_string(),
        coord: at(line, column),
    }
}

fn id_expr(text: &str, line: u32, column: u32) -> Expr {
    Expr::Id(ident(text, line, column))
}

fn int(v: i64, line: u32, column: u32) -> Expr {
    Expr::Constant(Constant {
        id: ExprId::default(),
        value: ConstValue::Int(v),
        coord: at(line, column),
    })
}

fn bin(op: BinOpKind, left: Expr, right: Expr, line: u32, column: u32) -> Expr {
    Expr::Binary(Box::new(BinaryOp {
        id: ExprId::default(),
        op,
        left,
        right,
        coord: at(line, column),
    }))
}

fn var_decl(prim: PrimType, name: &str, init: Option<Expr>, line: u32) -> Decl {
    Decl {
        name: ident(name, line, 7),
        kind: DeclKind::Var(VarDecl {
            type_spec: spec(prim, line),
        }),
        init,
        coord: at(line, 7),
    }
}

fn assign(name: &str, rvalue: Expr, line: u32) -> Stmt {
    Stmt::Assign(Assignment {
        op: AssignOpKind::Assign,
        lvalue: id_expr(name, line, 3),
        rvalue,
        coord: at(line, 3),
    })
}

fn print_stmt(expr: Expr, line: u32) -> Stmt {
    Stmt::Print(Print {
        expr: Some(expr),
        coord: at(line, 3),
    })
}

fn ret(expr: Expr, line: u32) -> Stmt {
    Stmt::Return(Return {
        expr: Some(expr),
        coord: at(line, 3),
    })
}

fn func(fname: &str, ret_ty: PrimType, params: Vec<(PrimType, &str)>, items: Vec<Stmt>) -> GlobalItem {
    let param_list = if params.is_empty() {
        None
    } else {
        Some(ParamList {
            params: params
                .into_iter()
                .map(|(p, n)| var_decl(p, n, None, 1))
                .collect(),
        })
    };
    GlobalItem::Func(FuncDef {
        return_type: spec(ret_ty, 1),
        decl: Decl {
            name: ident(fname, 1, 5),
            kind: DeclKind::Func(FuncDecl {
                type_spec: spec(ret_ty, 1),
                params: param_list,
            }),
            init: None,
            coord: at(1, 5),
        },
        body: Compound {
            items,
            coord: at(1, 12),
        },
        coord: at(1, 1),
    })
}

fn main_with(items: Vec<Stmt>) -> Program {
    Program {
        gdecls: vec![func("main", PrimType::Int, vec![], items)],
    }
}

fn lower(mut program: Program) -> GeneratedProgram {
    let types = analyze(&mut program).expect("semantic analysis should pass");
    generate(&program, &types).expect("generation should succeed")
}

fn opcodes(code: &[Instr]) -> Vec<String> {
    code.iter().map(Instr::opcode).collect()
}

fn lines(code: &[Instr]) -> Vec<String> {
    code.iter().map(Instr::to_string).collect()
}

// ---------------------------------------------------------------------------
// Invariant checks
// ---------------------------------------------------------------------------

/// Every numeric register is the destination of at most one instruction.
fn assert_single_assignment(code: &[Instr]) {
    let mut seen = HashSet::new();
    for instr in code {
        if let Some(dst) = instr.defined_register() {
            if dst.starts_with('%') && dst[1..].chars().all(|c| c.is_ascii_digit()) {
                assert!(seen.insert(dst.to_string()), "register {dst} defined twice");
            }
        }
    }
}

/// One define, one entry:, one exit:, one terminal return per function;
/// every branch target resolves to a label in the same function.
fn assert_function_shape(code: &[Instr]) {
    let defines = code
        .iter()
        .filter(|i| i.opcode().starts_with("define_"))
        .count();
    assert_eq!(defines, 1, "expected exactly one define");

    let entries = code.iter().filter(|i| i.label_name() == Some("entry")).count();
    let exits = code.iter().filter(|i| i.label_name() == Some("exit")).count();
    assert_eq!(entries, 1, "expected exactly one entry:");
    assert_eq!(exits, 1, "expected exactly one exit:");

    let returns = code
        .iter()
        .filter(|i| i.opcode().starts_with("return"))
        .count();
    assert_eq!(returns, 1, "expected exactly one return");

    let labels: HashSet<&str> = code.iter().filter_map(Instr::label_name).collect();
    for instr in code {
        for target in instr.jump_targets() {
            assert!(labels.contains(target), "unresolved branch target {target}");
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn straight_line_main() {
    // int main() { int a; a = 5; print(a); return 0; }
    let program = main_with(vec![
        Stmt::Decl(var_decl(PrimType::Int, "a", None, 2)),
        assign("a", int(5, 3, 7), 3),
        print_stmt(id_expr("a", 4, 9), 4),
        ret(int(0, 5, 10), 5),
    ]);
    let generated = lower(program);

    assert!(generated.text.is_empty());
    assert_eq!(generated.functions.len(), 1);
    let func = &generated.functions[0];
    assert_eq!(func.name, "main");
    assert!(func.param_regs.is_empty());
    assert_eq!(func.return_slot.as_deref(), Some("%1"));

    let code = func.code();
    assert_eq!(
        lines(&code),
        vec![
            "define_int @main []",
            "entry:",
            "alloc_int %1",
            "alloc_int %a",
            "literal_int 5 %2",
            "store_int %2 %a",
            "load_int %a %3",
            "print_int %3",
            "literal_int 0 %4",
            "store_int %4 %1",
            "jump %exit",
            "exit:",
            "load_int %1 %5",
            "return_int %5",
        ]
    );
    assert_single_assignment(&code);
    assert_function_shape(&code);
}

#[test]
fn parameters_spill_into_slots() {
    // int add(int x, int y) { return x + y; }
    let program = Program {
        gdecls: vec![func(
            "add",
            PrimType::Int,
            vec![(PrimType::Int, "x"), (PrimType::Int, "y")],
            vec![ret(
                bin(BinOpKind::Add, id_expr("x", 2, 10), id_expr("y", 2, 14), 2, 12),
                2,
            )],
        )],
    };
    let generated = lower(program);
    let func = &generated.functions[0];
    assert_eq!(func.param_regs, vec!["%1", "%2"]);
    assert_eq!(func.return_slot.as_deref(), Some("%3"));

    let code = func.code();
    assert_eq!(
        lines(&code),
        vec![
            "define_int @add [(int, %1), (int, %2)]",
            "entry:",
            "alloc_int %x",
            "alloc_int %y",
            "alloc_int %3",
            "store_int %1 %x",
            "store_int %2 %y",
            "load_int %x %4",
            "load_int %y %5",
            "add_int %4 %5 %6",
            "store_int %6 %3",
            "jump %exit",
            "exit:",
            "load_int %3 %7",
            "return_int %7",
        ]
    );
    assert_single_assignment(&code);
    assert_function_shape(&code);
}

#[test]
fn assert_lowering_emits_message_and_paths() {
    // int main() { assert 1 == 1; return 0; }  (scenario S2)
    let program = main_with(vec![
        Stmt::Assert(Assert {
            expr: bin(BinOpKind::Eq, int(1, 1, 21), int(1, 1, 26), 1, 23),
            coord: at(1, 14),
        }),
        ret(int(0, 1, 36), 1),
    ]);
    let generated = lower(program);

    assert_eq!(
        generated.text,
        vec![Instr::GlobalString {
            name: "@.str.0".to_string(),
            value: "assertion_fail on @ 1:23".to_string(),
        }]
    );

    let code = generated.functions[0].code();
    let rendered = lines(&code);
    assert!(rendered.contains(&"cbranch %4 %assert.true %assert.false".to_string()));
    assert!(rendered.contains(&"assert.false:".to_string()));
    assert!(rendered.contains(&"print_string @.str.0".to_string()));
    assert!(rendered.contains(&"assert.true:".to_string()));

    // The false path jumps straight to the function exit.
    let false_at = rendered
        .iter()
        .position(|l| l == "assert.false:")
        .expect("false block label");
    assert_eq!(rendered[false_at + 1], "print_string @.str.0");
    assert_eq!(rendered[false_at + 2], "jump %exit");

    assert_single_assignment(&code);
    assert_function_shape(&code);
}

#[test]
fn sequential_for_loops_number_labels() {
    // Two sequential for loops (scenario S3): the second gets `.1`.
    let for_loop = |line: u32| {
        Stmt::For(Box::new(For {
            init: Some(ForInit::Decls(DeclList {
                decls: vec![var_decl(PrimType::Int, "i", Some(int(0, line, 14)), line)],
            })),
            cond: Some(bin(
                BinOpKind::Lt,
                id_expr("i", line, 17),
                int(3, line, 21),
                line,
                19,
            )),
            step: Some(Box::new(assign(
                "i",
                bin(BinOpKind::Add, id_expr("i", line, 28), int(1, line, 32), line, 30),
                line,
            ))),
            body: Box::new(Stmt::Compound(Compound {
                items: vec![],
                coord: at(line, 36),
            })),
            coord: at(line, 3),
        }))
    };
    let program = main_with(vec![for_loop(2), for_loop(3), ret(int(0, 4, 10), 4)]);
    let generated = lower(program);
    let code = generated.functions[0].code();

    let labels: Vec<&str> = code.iter().filter_map(Instr::label_name).collect();
    for expected in [
        "for.cond",
        "for.body",
        "for.end",
        "for.inc",
        "for.cond.1",
        "for.body.1",
        "for.end.1",
        "for.inc.1",
    ] {
        assert!(labels.contains(&expected), "missing label {expected}");
    }
    assert_function_shape(&code);
    assert_single_assignment(&code);
}

#[test]
fn while_lowering_branches_and_loops_back() {
    // int main() { int i; i = 0; while (i < 3) { i = i + 1; } return 0; }
    let program = main_with(vec![
        Stmt::Decl(var_decl(PrimType::Int, "i", None, 2)),
        assign("i", int(0, 3, 7), 3),
        Stmt::While(Box::new(While {
            cond: bin(BinOpKind::Lt, id_expr("i", 4, 10), int(3, 4, 14), 4, 12),
            body: Stmt::Compound(Compound {
                items: vec![assign(
                    "i",
                    bin(BinOpKind::Add, id_expr("i", 5, 9), int(1, 5, 13), 5, 11),
                    5,
                )],
                coord: at(4, 18),
            }),
            coord: at(4, 3),
        })),
        ret(int(0, 6, 10), 6),
    ]);
    let generated = lower(program);
    let code = generated.functions[0].code();
    let rendered = lines(&code);

    assert!(rendered.contains(&"cbranch %5 %while.body %while.end".to_string()));
    // The body jumps back to the condition; the pre-header jumps in.
    let back_edges = rendered
        .iter()
        .filter(|l| *l == "jump %while.cond")
        .count();
    assert_eq!(back_edges, 2);
    assert_function_shape(&code);
    assert_single_assignment(&code);
}

#[test]
fn break_targets_innermost_loop_end() {
    let program = main_with(vec![
        Stmt::While(Box::new(While {
            cond: Expr::Constant(Constant {
                id: ExprId::default(),
                value: ConstValue::Bool(true),
                coord: at(2, 10),
            }),
            body: Stmt::Compound(Compound {
                items: vec![Stmt::Break(Break { coord: at(3, 5) })],
                coord: at(2, 16),
            }),
            coord: at(2, 3),
        })),
        ret(int(0, 4, 10), 4),
    ]);
    let generated = lower(program);
    let rendered = lines(&generated.functions[0].code());
    assert!(rendered.contains(&"jump %while.end".to_string()));
}

#[test]
fn shadowed_locals_get_generation_suffix() {
    // int main() { int x; { int x; x = 1; } return 0; }
    let program = main_with(vec![
        Stmt::Decl(var_decl(PrimType::Int, "x", None, 2)),
        Stmt::Compound(Compound {
            items: vec![
                Stmt::Decl(var_decl(PrimType::Int, "x", None, 3)),
                assign("x", int(1, 4, 9), 4),
            ],
            coord: at(3, 1),
        }),
        ret(int(0, 5, 10), 5),
    ]);
    let generated = lower(program);
    let rendered = lines(&generated.functions[0].code());
    assert!(rendered.contains(&"alloc_int %x".to_string()));
    assert!(rendered.contains(&"alloc_int %x.2".to_string()));
    assert!(rendered.contains(&"store_int %2 %x.2".to_string()));
}

#[test]
fn globals_emit_prelude_and_at_addresses() {
    // int g = 5; int main() { print(g); return 0; }
    let program = Program {
        gdecls: vec![
            GlobalItem::Decl(GlobalDecl {
                decls: vec![var_decl(PrimType::Int, "g", Some(int(5, 1, 9)), 1)],
            }),
            func(
                "main",
                PrimType::Int,
                vec![],
                vec![print_stmt(id_expr("g", 2, 9), 2), ret(int(0, 3, 10), 3)],
            ),
        ],
    };
    let generated = lower(program);

    assert_eq!(
        lines(&generated.text),
        vec!["global_int @g 5".to_string()]
    );
    let rendered = lines(&generated.functions[0].code());
    assert!(rendered.contains(&"load_int @g %2".to_string()));
    assert!(rendered.contains(&"print_int %2".to_string()));

    // The flat listing places the prelude first.
    let all = generated.code();
    assert_eq!(all[0].opcode(), "global_int");
}

#[test]
fn array_element_access_uses_elem_and_deref_load() {
    // int main() { int a[3] = {1, 2, 3}; print(a[1]); return 0; }
    let list = Expr::InitList(InitList {
        id: ExprId::default(),
        exprs: vec![int(1, 2, 14), int(2, 2, 17), int(3, 2, 20)],
        coord: at(2, 13),
    });
    let array = Decl {
        name: ident("a", 2, 7),
        kind: DeclKind::Array(ArrayDecl {
            inner: Box::new(DeclKind::Var(VarDecl {
                type_spec: spec(PrimType::Int, 2),
            })),
            dim: Some(int(3, 2, 9)),
            coord: at(2, 7),
        }),
        init: Some(list),
        coord: at(2, 7),
    };
    let program = main_with(vec![
        Stmt::Decl(array),
        print_stmt(
            Expr::ArrayRef(Box::new(ArrayRef {
                id: ExprId::default(),
                name: id_expr("a", 3, 9),
                subscript: int(1, 3, 11),
                coord: at(3, 9),
            })),
            3,
        ),
        ret(int(0, 4, 10), 4),
    ]);
    let generated = lower(program);

    assert_eq!(
        lines(&generated.text),
        vec!["global_int_3 @.const_a.0 [1, 2, 3]".to_string()]
    );
    let code = generated.functions[0].code();
    let ops = opcodes(&code);
    assert!(ops.contains(&"alloc_int_3".to_string()));
    assert!(ops.contains(&"elem_int".to_string()));
    assert!(ops.contains(&"load_int_*".to_string()));
    assert_single_assignment(&code);
}

#[test]
fn call_evaluates_params_then_calls() {
    // int f(int n) { return n; }  int main() { print(f(7)); return 0; }
    let call = Expr::Call(Box::new(FuncCall {
        id: ExprId::default(),
        name: ident("f", 3, 9),
        args: Some(ExprList {
            id: ExprId::default(),
            exprs: vec![int(7, 3, 11)],
            coord: at(3, 11),
        }),
        coord: at(3, 9),
    }));
    let program = Program {
        gdecls: vec![
            func(
                "f",
                PrimType::Int,
                vec![(PrimType::Int, "n")],
                vec![ret(id_expr("n", 1, 20), 1)],
            ),
            func(
                "main",
                PrimType::Int,
                vec![],
                vec![print_stmt(call, 3), ret(int(0, 4, 10), 4)],
            ),
        ],
    };
    let generated = lower(program);
    let rendered = lines(&generated.functions[1].code());

    // %2 is reserved for the call result before the argument literal %3.
    assert!(rendered.contains(&"literal_int 7 %3".to_string()));
    assert!(rendered.contains(&"param_int %3".to_string()));
    assert!(rendered.contains(&"call_int @f %2".to_string()));
    assert!(rendered.contains(&"print_int %2".to_string()));

    for func_ir in &generated.functions {
        assert_function_shape(&func_ir.code());
    }
}

#[test]
fn if_else_lowering_meets_at_exit_label() {
    // int main() { int a; a = 1; if (a < 2) { a = 2; } else { a = 3; } return 0; }
    let program = main_with(vec![
        Stmt::Decl(var_decl(PrimType::Int, "a", None, 2)),
        assign("a", int(1, 3, 7), 3),
        Stmt::If(Box::new(If {
            cond: bin(BinOpKind::Lt, id_expr("a", 4, 7), int(2, 4, 11), 4, 9),
            then_branch: Stmt::Compound(Compound {
                items: vec![assign("a", int(2, 4, 18), 4)],
                coord: at(4, 14),
            }),
            else_branch: Some(Stmt::Compound(Compound {
                items: vec![assign("a", int(3, 4, 32), 4)],
                coord: at(4, 28),
            })),
            coord: at(4, 3),
        })),
        ret(int(0, 5, 10), 5),
    ]);
    let generated = lower(program);
    let code = generated.functions[0].code();
    let rendered = lines(&code);

    assert!(rendered.contains(&"cbranch %5 %if.then %if.end".to_string()));
    let exit_jumps = rendered.iter().filter(|l| *l == "jump %if.exit").count();
    assert_eq!(exit_jumps, 2);
    assert_function_shape(&code);
    assert_single_assignment(&code);
}
