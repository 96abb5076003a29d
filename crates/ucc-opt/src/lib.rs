//! Intra-procedural dataflow optimization of uCIR.
//!
//! [`optimize`] linearizes each function's CFG, runs global-load
//! coalescing, reaching-definitions-driven constant/copy propagation,
//! and liveness-driven dead-code elimination, then reassembles the flat
//! program listing (text prelude first, then each optimized function).
//!
//! The phase order -- RD, propagation, LV, DCE -- is a hard invariant:
//! each pass reads the solution computed for the code the previous pass
//! produced.

pub mod analysis;
pub mod error;
pub mod flow;
pub mod passes;

use tracing::debug;
use ucc_codegen::{GeneratedProgram, Instr};

pub use analysis::{Liveness, ReachingDefs};
pub use error::OptError;
pub use flow::{build_flow, FlowGraph};

/// The optimized program listing plus the pre-optimization length used
/// for the speedup report.
#[derive(Debug, Clone)]
pub struct OptimizedProgram {
    pub code: Vec<Instr>,
    pub original_len: usize,
}

impl OptimizedProgram {
    /// Instruction-count ratio of the original listing over the
    /// optimized one.
    pub fn speedup(&self) -> f64 {
        if self.code.is_empty() {
            return 1.0;
        }
        self.original_len as f64 / self.code.len() as f64
    }

    /// The line printed to stderr by `--speedup`.
    pub fn speedup_line(&self) -> String {
        format!(
            "[SPEEDUP] Default: {} Optimized: {} Speedup: {:.2}",
            self.original_len,
            self.code.len(),
            self.speedup()
        )
    }
}

/// Optimize every function of a generated program.
pub fn optimize(program: &GeneratedProgram) -> Result<OptimizedProgram, OptError> {
    let original_len = program.code().len();
    let mut code = program.text.clone();

    for func in &program.functions {
        let mut vector = func.cfg.try_linearize()?;
        debug!(function = %func.name, len = vector.len(), "optimizing");

        passes::coalesce_global_loads(&mut vector);

        let mut protected = func.param_regs.clone();
        if let Some(slot) = &func.return_slot {
            protected.push(slot.clone());
        }
        passes::constant_propagation(&mut vector, &protected)?;
        passes::dead_code_elimination(&mut vector)?;

        passes::short_circuit_jumps(&mut vector);
        passes::merge_blocks(&mut vector);
        passes::discard_unused_allocs(&mut vector);

        code.extend(vector);
    }

    Ok(OptimizedProgram { code, original_len })
}
