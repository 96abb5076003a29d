//! The `ucc` binary: uC semantic analysis, uCIR generation, and
//! dataflow optimization.
//!
//! The lexer/parser live outside this pipeline, so the input file is a
//! serialized AST (JSON, the `ucc_core::ast` serde format). The stages
//! then run in order: semantic analysis, IR generation, optimization.
//!
//! Output contract: IR dumps (`--ir`, `--opt`, `--cfg`) go to stdout;
//! semantic errors and the `--speedup` line go to stderr. Exit code 0 on
//! success, 1 on any file or semantic error.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ucc_check::analyze;
use ucc_codegen::{format_listing, generate};
use ucc_core::Program;
use ucc_opt::optimize;

/// uC compiler front-end and optimizer.
#[derive(Parser)]
#[command(name = "ucc", about = "uC compiler front-end and optimizer")]
struct Cli {
    /// Path to the serialized AST to compile.
    input_file: PathBuf,

    /// Print the generated uCIR.
    #[arg(long)]
    ir: bool,

    /// Print the optimized uCIR.
    #[arg(long)]
    opt: bool,

    /// Render each function's CFG in DOT format.
    #[arg(long)]
    cfg: bool,

    /// Enable debug logging of the pipeline stages.
    #[arg(long)]
    debug: bool,

    /// Print the original/optimized instruction-count ratio to stderr.
    #[arg(long)]
    speedup: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    if !cli.input_file.exists() {
        eprintln!("Input {} not found", cli.input_file.display());
        return 1;
    }

    let source = match std::fs::read_to_string(&cli.input_file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Input {} not readable: {e}", cli.input_file.display());
            return 1;
        }
    };

    let mut program: Program = match serde_json::from_str(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Input {} is not a valid AST: {e}", cli.input_file.display());
            return 1;
        }
    };

    // Semantic analysis: the first diagnostic aborts compilation.
    let types = match analyze(&mut program) {
        Ok(types) => types,
        Err(err) => {
            eprintln!("{}", err.report());
            return 1;
        }
    };
    tracing::debug!(expressions = types.len(), "semantic analysis passed");

    let generated = match generate(&program, &types) {
        Ok(g) => g,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    if cli.ir {
        print!("{}", format_listing(&generated.code()));
    }

    if cli.cfg {
        for func in &generated.functions {
            println!("// {}", func.name);
            println!("{}", func.cfg.to_dot());
        }
    }

    let optimized = match optimize(&generated) {
        Ok(o) => o,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    if cli.opt {
        print!("{}", format_listing(&optimized.code));
    }

    if cli.speedup {
        eprintln!("{}", optimized.speedup_line());
    }

    0
}
