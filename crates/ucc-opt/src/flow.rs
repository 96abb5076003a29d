//! Instruction-level flow graph over the linearized vector.
//!
//! The optimizer does not consult block structure: labels and branches
//! carry all control-flow information, so predecessors and successors
//! are computed directly on instruction indices. Index 0 has no
//! predecessor; every other index has its fall-through neighbor; each
//! `jump`/`cbranch` additionally links to the instruction carrying its
//! target label.

use std::collections::HashMap;

use ucc_codegen::Instr;

use crate::error::OptError;

/// Per-index predecessor and successor lists.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    pub preds: Vec<Vec<usize>>,
    pub succs: Vec<Vec<usize>>,
}

fn push_unique(set: &mut Vec<usize>, value: usize) {
    if !set.contains(&value) {
        set.push(value);
    }
}

/// Build the flow graph of one function's linearized code.
///
/// Every branch target must resolve to a label in the same vector; a
/// dangling target is an internal error.
pub fn build_flow(code: &[Instr]) -> Result<FlowGraph, OptError> {
    let n = code.len();
    let mut labels: HashMap<&str, usize> = HashMap::new();
    for (i, instr) in code.iter().enumerate() {
        if let Some(name) = instr.label_name() {
            labels.insert(name, i);
        }
    }

    let mut preds = vec![Vec::new(); n];
    let mut succs = vec![Vec::new(); n];

    for i in 1..n {
        push_unique(&mut preds[i], i - 1);
    }
    for i in 0..n.saturating_sub(1) {
        push_unique(&mut succs[i], i + 1);
    }

    for (i, instr) in code.iter().enumerate() {
        for target in instr.jump_targets() {
            let t = *labels.get(target).ok_or_else(|| OptError::UnknownLabel {
                label: target.to_string(),
            })?;
            push_unique(&mut preds[t], i);
            push_unique(&mut succs[i], t);
        }
    }

    Ok(FlowGraph { preds, succs })
}
