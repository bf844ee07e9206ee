//! `graphc`: reads a graph IR document, runs it through the compiler
//! pipeline, and compiles/runs the emitted C++ locally or via a sandbox.

mod runner;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use graphc_core::{diagnostics, emit, ir::Catalog, normalize, validate, Ir};
use log::{error, info, warn};
use runner::{LocalRunner, RunOutcome, Runner, SandboxRunner};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "graphc", about = "Compiles a dataflow graph IR to C++ and runs it")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize, validate, emit, and run a graph IR document.
    Compile {
        /// Path to the IR JSON document.
        ir_path: PathBuf,
        /// Path to the node-definitions catalog JSON document.
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Directory to exchange request/response files with an external
        /// sandbox. Without this, compiles and runs with the host compiler.
        #[arg(long)]
        sandbox_dir: Option<PathBuf>,
        /// Wall-clock seconds allowed for the run phase.
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn main() {
    env_logger::init();
    let code = run();
    std::process::exit(code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    match cli.command {
        Command::Compile {
            ir_path,
            catalog,
            sandbox_dir,
            timeout,
        } => match compile(&ir_path, catalog.as_deref(), sandbox_dir, timeout) {
            Ok(code) => code,
            Err(err) => {
                error!("{err:#}");
                1
            }
        },
    }
}

fn compile(ir_path: &Path, catalog_path: Option<&Path>, sandbox_dir: Option<PathBuf>, timeout: Option<u64>) -> Result<i32> {
    let raw_ir = fs::read_to_string(ir_path).with_context(|| format!("reading IR document {}", ir_path.display()))?;
    let mut ir: Ir = serde_json::from_str(&raw_ir).with_context(|| format!("parsing IR document {}", ir_path.display()))?;

    let catalog: Catalog = match catalog_path {
        Some(p) => {
            let raw = fs::read_to_string(p).with_context(|| format!("reading catalog {}", p.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing catalog {}", p.display()))?
        }
        None => Catalog::new(),
    };

    normalize(&mut ir);

    if let Err(err) = validate(&ir.nodes, &ir.edges, &catalog) {
        error!("validation failed: {err}");
        return Ok(2);
    }
    for f in &ir.functions {
        if let Err(err) = validate(&f.graph.nodes, &f.graph.edges, &catalog) {
            error!("validation failed in function {:?}: {err}", f.name);
            return Ok(2);
        }
    }
    info!("validated {} top-level node(s), {} function(s)", ir.nodes.len(), ir.functions.len());

    let emitted = emit(&ir, &catalog).with_context(|| "emitting C++")?;

    let stem = ir_path.with_extension("");
    let cpp_path = stem.with_extension("cpp");
    let map_path = append_suffix(&stem, ".map.json");
    let errors_path = append_suffix(&stem, ".errors.json");

    fs::write(&cpp_path, &emitted.cpp).with_context(|| format!("writing {}", cpp_path.display()))?;
    write_json(&map_path, &serde_json::json!({ "mappings": emitted.mapping }))?;
    info!("emitted {}", cpp_path.display());

    let timeout = Duration::from_secs(timeout.unwrap_or_else(default_timeout_secs));

    let outcome = match sandbox_dir {
        Some(dir) => SandboxRunner::new(dir).run(&ir, &catalog, &cpp_path, timeout),
        None => LocalRunner::default().run(&ir, &catalog, &cpp_path, timeout),
    }
    .with_context(|| "running compile+execute phase")?;

    match outcome {
        RunOutcome::Success { stdout, stderr } => {
            if !stdout.is_empty() {
                print!("{stdout}");
            }
            if !stderr.is_empty() {
                warn!("{stderr}");
            }
            Ok(0)
        }
        RunOutcome::CompileFailure { stderr } => {
            let diags = diagnostics::parse_diagnostics(&stderr);
            let mapped = diagnostics::map_diagnostics(&diags, &emitted.mapping);
            write_json(
                &errors_path,
                &serde_json::json!({ "mapped_errors": mapped, "raw_stderr": stderr }),
            )?;
            error!("compile failed; diagnostics written to {}", errors_path.display());
            Ok(3)
        }
        RunOutcome::Timeout => {
            write_json(&errors_path, &serde_json::json!({ "error": "timeout", "timeout_secs": timeout.as_secs() }))?;
            error!("run exceeded {:?}; see {}", timeout, errors_path.display());
            Ok(4)
        }
    }
}

fn default_timeout_secs() -> u64 {
    std::env::var("EXEC_TIMEOUT").ok().and_then(|v| v.parse().ok()).unwrap_or(5)
}

fn append_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    stem.with_file_name(name)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_vec_pretty(value)?;
    fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
}
