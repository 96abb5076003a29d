//! Optimization passes over the linearized instruction vector.
//!
//! Order matters: global-load coalescing runs before reaching
//! definitions, constant/copy propagation iterates with RD recomputed
//! after every rewrite, and dead-code elimination runs last over the
//! liveness solution. `short_circuit_jumps`, `merge_blocks`, and
//! `discard_unused_allocs` are declared extension points that currently
//! perform no transformation.

use tracing::debug;
use ucc_codegen::Instr;

use crate::analysis::{def_key, Liveness, ReachingDefs};
use crate::error::OptError;
use crate::flow::build_flow;

/// Replace every occurrence of `from` among the value operands of
/// `code` with `to`.
fn replace_uses(code: &mut [Instr], from: &str, to: &str) {
    for instr in code {
        for operand in instr.operands_mut() {
            if operand == from {
                *operand = to.to_string();
            }
        }
    }
}

fn remove_indices(code: &mut Vec<Instr>, mut indices: Vec<usize>) {
    indices.sort_unstable();
    indices.dedup();
    for index in indices.into_iter().rev() {
        code.remove(index);
    }
}

// ---------------------------------------------------------------------------
// Global-int load coalescing
// ---------------------------------------------------------------------------

/// Remove repeated `load_int` of the same global: after the first load
/// of `@g`, every later load of `@g` not separated by a store to it is
/// dropped and its uses rewritten to the first load's register. Every
/// distinct global is processed.
pub fn coalesce_global_loads(code: &mut Vec<Instr>) {
    let is_global_int_load = |instr: &Instr| match instr {
        Instr::Load {
            ty: ucc_core::PrimType::Int,
            deref: false,
            src,
            ..
        } => src.starts_with('@'),
        _ => false,
    };

    // Distinct globals in order of first load.
    let mut globals: Vec<String> = Vec::new();
    for instr in code.iter() {
        if is_global_int_load(instr) {
            if let Some(src) = instr.loaded_var() {
                if !globals.iter().any(|g| g == src) {
                    globals.push(src.to_string());
                }
            }
        }
    }

    for global in globals {
        let Some(first) = code
            .iter()
            .position(|i| is_global_int_load(i) && i.loaded_var() == Some(global.as_str()))
        else {
            continue;
        };
        let keep_reg = match &code[first] {
            Instr::Load { dst, .. } => dst.clone(),
            _ => continue,
        };

        let mut removals = Vec::new();
        let mut cursor = first + 1;
        while cursor < code.len() {
            if code[cursor].stored_var() == Some(global.as_str()) {
                break;
            }
            if is_global_int_load(&code[cursor])
                && code[cursor].loaded_var() == Some(global.as_str())
            {
                let dst = match &code[cursor] {
                    Instr::Load { dst, .. } => dst.clone(),
                    _ => unreachable!("load matched above"),
                };
                removals.push(cursor);
                replace_uses(&mut code[cursor + 1..], &dst, &keep_reg);
            }
            cursor += 1;
        }

        if !removals.is_empty() {
            debug!(global = %global, removed = removals.len(), "coalesced global loads");
            remove_indices(code, removals);
        }
    }
}

// ---------------------------------------------------------------------------
// Constant/copy propagation
// ---------------------------------------------------------------------------

/// Forward the stored value through load instructions: a load of a
/// non-global variable with exactly one reaching store is replaced by
/// that store's source register; the load (and, when no blocking load
/// remains, the store itself) is removed. Registers in `protected` --
/// parameter registers and the return slot -- are never rewritten.
///
/// After every rewrite the reaching-definitions solution is recomputed
/// and scanning resumes from the removed store's index. The pass
/// terminates because each rewrite removes at least one instruction.
pub fn constant_propagation(
    code: &mut Vec<Instr>,
    protected: &[String],
) -> Result<(), OptError> {
    let mut resume = 0usize;
    loop {
        let flow = build_flow(code)?;
        let rd = ReachingDefs::compute(code, &flow);

        let mut transformed = false;
        let mut i = resume.min(code.len());
        'scan: while i < code.len() {
            let Some(var) = code[i].loaded_var().map(str::to_string) else {
                i += 1;
                continue;
            };
            if var.starts_with('@') {
                i += 1;
                continue;
            }
            if rd.reaching_defs_of(&var, i).len() > 1 {
                i += 1;
                continue;
            }

            // The single reaching store, at an earlier index.
            let mut store_idx = None;
            for &d in &rd.in_sets[i] {
                if d < i && code[d].stored_var() == Some(var.as_str()) {
                    store_idx = Some(d);
                }
            }
            let Some(s) = store_idx else {
                i += 1;
                continue;
            };
            let (src, stored_to) = match &code[s] {
                Instr::Store { src, dst, .. } => (src.clone(), dst.clone()),
                _ => {
                    i += 1;
                    continue;
                }
            };

            // Parameter spills and the return slot stay untouched.
            if protected.contains(&src) || protected.contains(&stored_to) {
                i += 1;
                continue;
            }

            let load_dst = match &code[i] {
                Instr::Load { dst, .. } => dst.clone(),
                _ => {
                    i += 1;
                    continue;
                }
            };

            debug!(var = %var, store = s, load = i, "propagating store");
            replace_uses(&mut code[i..], &load_dst, &src);

            let (mut removals, can_remove_store) =
                rewrite_similar_loads(code, i + 1, &var, &src, &rd);
            removals.push(i);
            if can_remove_store {
                removals.push(s);
            }
            remove_indices(code, removals);

            resume = s.min(code.len());
            transformed = true;
            break 'scan;
        }

        if transformed {
            continue;
        }
        if resume > 0 {
            // One full pass from the top before declaring a fixed point.
            resume = 0;
            continue;
        }
        return Ok(());
    }
}

/// Look ahead from `start` for further loads of `var`, rewriting each
/// one's uses to `replacement` and marking it for removal, until a
/// store (or read) of `var` blocks the scan. Returns the marked indices
/// and whether the originating store may itself be removed.
fn rewrite_similar_loads(
    code: &mut [Instr],
    start: usize,
    var: &str,
    replacement: &str,
    rd: &ReachingDefs,
) -> (Vec<usize>, bool) {
    let mut marks = Vec::new();
    let mut can_remove_store = true;

    let mut cursor = start;
    while cursor < code.len() {
        if code[cursor].loaded_var() == Some(var) {
            if rd.reaching_defs_of(var, cursor).len() > 1 {
                // Another definition path joins here: the originating
                // store still feeds this load and must stay.
                can_remove_store = false;
                break;
            }
            let dst = match &code[cursor] {
                Instr::Load { dst, .. } => dst.clone(),
                _ => unreachable!("loaded_var implies a load"),
            };
            marks.push(cursor);
            replace_uses(&mut code[cursor + 1..], &dst, replacement);
        } else if def_key(&code[cursor]) == Some(var) {
            break;
        }
        cursor += 1;
    }

    (marks, can_remove_store)
}

// ---------------------------------------------------------------------------
// Dead-code elimination
// ---------------------------------------------------------------------------

/// Drop every store whose written variable is not live immediately
/// after it.
pub fn dead_code_elimination(code: &mut Vec<Instr>) -> Result<(), OptError> {
    let flow = build_flow(code)?;
    let lv = Liveness::compute(code, &flow);

    let mut removals = Vec::new();
    for (i, instr) in code.iter().enumerate() {
        if let Some(var) = instr.stored_var() {
            if !lv.out_sets[i].iter().any(|v| v == var) {
                removals.push(i);
            }
        }
    }
    if !removals.is_empty() {
        debug!(removed = removals.len(), "dead stores eliminated");
        remove_indices(code, removals);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Declared extension points (no transformation yet)
// ---------------------------------------------------------------------------

/// Extension point: collapse jump-to-jump chains.
pub fn short_circuit_jumps(_code: &mut Vec<Instr>) {}

/// Extension point: merge single-predecessor blocks.
pub fn merge_blocks(_code: &mut Vec<Instr>) {}

/// Extension point: drop allocations with no remaining loads or stores.
pub fn discard_unused_allocs(_code: &mut Vec<Instr>) {}
