//! Reaching-definitions and live-variable analyses.
//!
//! Both iterate their `in`/`out` sets to fixed point over the
//! instruction-level [`FlowGraph`]. Convergence is guaranteed: the sets
//! draw from the finite powerset of definition indices (RD) or variable
//! names (LV) and only ever grow. Sets are deduplicated,
//! insertion-ordered vectors, small enough that linear membership tests
//! beat hashing.
//!
//! A *definition* is a plain store (its key is the stored-to variable)
//! or a `read_*` (which also writes its target and must block
//! propagation across it). A *use* is a load's source; a deref store
//! additionally uses both of its operands.

use indexmap::IndexMap;
use ucc_codegen::Instr;

use crate::flow::FlowGraph;

/// The variable written by this instruction, as a reaching-definitions
/// key. Plain stores and reads define; everything else does not.
pub fn def_key(instr: &Instr) -> Option<&str> {
    match instr {
        Instr::Store {
            deref: false, dst, ..
        } => Some(dst),
        Instr::Read { dst, .. } => Some(dst),
        _ => None,
    }
}

fn extend_unique<T: PartialEq + Clone>(set: &mut Vec<T>, items: &[T]) {
    for item in items {
        if !set.contains(item) {
            set.push(item.clone());
        }
    }
}

/// Reaching definitions over one function's linearized code.
#[derive(Debug, Clone)]
pub struct ReachingDefs {
    pub gen_sets: Vec<Vec<usize>>,
    pub kill_sets: Vec<Vec<usize>>,
    pub in_sets: Vec<Vec<usize>>,
    pub out_sets: Vec<Vec<usize>>,
    /// All definition indices per variable.
    pub defs: IndexMap<String, Vec<usize>>,
}

impl ReachingDefs {
    /// Compute gen/kill and iterate in/out to fixed point.
    pub fn compute(code: &[Instr], flow: &FlowGraph) -> Self {
        let n = code.len();

        let mut defs: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (i, instr) in code.iter().enumerate() {
            if let Some(var) = def_key(instr) {
                defs.entry(var.to_string()).or_default().push(i);
            }
        }

        let mut gen_sets = vec![Vec::new(); n];
        let mut kill_sets = vec![Vec::new(); n];
        for (i, instr) in code.iter().enumerate() {
            if let Some(var) = def_key(instr) {
                gen_sets[i].push(i);
                if let Some(sites) = defs.get(var) {
                    kill_sets[i] = sites.iter().copied().filter(|&d| d != i).collect();
                }
            }
        }

        let mut in_sets = vec![Vec::new(); n];
        let mut out_sets = vec![Vec::new(); n];
        loop {
            let old_in = in_sets.clone();
            let old_out = out_sets.clone();

            for i in 0..n {
                let mut incoming = Vec::new();
                for &p in &flow.preds[i] {
                    extend_unique(&mut incoming, &out_sets[p]);
                }
                in_sets[i] = incoming;
            }

            for i in 0..n {
                let mut out = gen_sets[i].clone();
                let survivors: Vec<usize> = in_sets[i]
                    .iter()
                    .copied()
                    .filter(|d| !kill_sets[i].contains(d))
                    .collect();
                extend_unique(&mut out, &survivors);
                out_sets[i] = out;
            }

            if in_sets == old_in && out_sets == old_out {
                break;
            }
        }

        ReachingDefs {
            gen_sets,
            kill_sets,
            in_sets,
            out_sets,
            defs,
        }
    }

    /// Definition sites of `var` that reach instruction `at`.
    pub fn reaching_defs_of(&self, var: &str, at: usize) -> Vec<usize> {
        match self.defs.get(var) {
            Some(sites) => sites
                .iter()
                .copied()
                .filter(|d| self.in_sets[at].contains(d))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Live variables over one function's linearized code.
#[derive(Debug, Clone)]
pub struct Liveness {
    pub use_sets: Vec<Vec<String>>,
    pub def_sets: Vec<Vec<String>>,
    pub in_sets: Vec<Vec<String>>,
    pub out_sets: Vec<Vec<String>>,
}

impl Liveness {
    /// Compute use/def and iterate in/out to fixed point, bottom-up.
    pub fn compute(code: &[Instr], flow: &FlowGraph) -> Self {
        let n = code.len();

        let mut use_sets = vec![Vec::new(); n];
        let mut def_sets = vec![Vec::new(); n];
        for (i, instr) in code.iter().enumerate() {
            if let Some(var) = instr.loaded_var() {
                use_sets[i].push(var.to_string());
            }
            if let Instr::Store {
                deref: true,
                src,
                dst,
                ..
            } = instr
            {
                extend_unique(&mut use_sets[i], &[src.clone(), dst.clone()]);
            }
            if let Some(var) = instr.stored_var() {
                def_sets[i].push(var.to_string());
            }
        }

        let mut in_sets: Vec<Vec<String>> = vec![Vec::new(); n];
        let mut out_sets: Vec<Vec<String>> = vec![Vec::new(); n];
        loop {
            let old_in = in_sets.clone();
            let old_out = out_sets.clone();

            for i in (0..n).rev() {
                let mut out = Vec::new();
                for &s in &flow.succs[i] {
                    extend_unique(&mut out, &in_sets[s]);
                }
                out_sets[i] = out;

                let mut live = use_sets[i].clone();
                let survivors: Vec<String> = out_sets[i]
                    .iter()
                    .filter(|v| !def_sets[i].contains(v))
                    .cloned()
                    .collect();
                extend_unique(&mut live, &survivors);
                in_sets[i] = live;
            }

            if in_sets == old_in && out_sets == old_out {
                break;
            }
        }

        Liveness {
            use_sets,
            def_sets,
            in_sets,
            out_sets,
        }
    }
}
