//! kievc - Kiev joint compilation from the command line
//!
//! Reads `kiev.toml` from a project directory and drives the Kiev compiler
//! the same way the build plugin does.
//!
//! ## Commands
//!
//! - `compile`: Compile the configured source set
//! - `spec`: Print the compile spec the task would run with
//! - `infer-classpath`: Show the Kiev classpath inferred from a set of jars

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kiev_compile::metrics::METRICS;
use kiev_compile::telemetry::init_tracing;
use kiev_compile::{
    load_config, CompileError, ConfigError, ErrorKind, JvmToolLoader, KievCompileTask, KievRuntime,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "kievc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Kiev joint compilation for JVM projects", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the source set configured in kiev.toml
    Compile {
        /// Project directory containing kiev.toml
        #[arg(short, long, default_value = ".", env = "KIEVC_PROJECT_DIR")]
        project_dir: PathBuf,
    },

    /// Print the compile spec as JSON without running the compiler
    Spec {
        /// Project directory containing kiev.toml
        #[arg(short, long, default_value = ".", env = "KIEVC_PROJECT_DIR")]
        project_dir: PathBuf,
    },

    /// Infer the Kiev classpath from candidate jars
    InferClasspath {
        /// Candidate classpath entries
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Compile { project_dir } => cmd_compile(&project_dir).await,
        Commands::Spec { project_dir } => cmd_spec(&project_dir).await,
        Commands::InferClasspath { files } => cmd_infer_classpath(files),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

/// Process exit status for a failed command.
///
/// 1 for compilation failures, 2 for configuration errors, 3 for environment
/// faults and anything else.
fn exit_status(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<CompileError>().map(CompileError::kind) {
        Some(ErrorKind::Compilation) => 1,
        Some(ErrorKind::Configuration) => 2,
        Some(ErrorKind::Environment) | None => 3,
    }
}

async fn load_task(project_dir: &Path) -> Result<KievCompileTask<JvmToolLoader>> {
    let project_dir = std::fs::canonicalize(project_dir)
        .with_context(|| format!("project {} not found", project_dir.display()))?;
    let config = load_config(&project_dir)?;
    let toolchain = config.resolve_toolchain().await?;
    let loader = JvmToolLoader::for_toolchain(&toolchain);
    Ok(config.into_task(&project_dir, toolchain, loader))
}

/// Compile the configured source set
async fn cmd_compile(project_dir: &Path) -> Result<()> {
    let task = load_task(project_dir).await?;
    let outcome = task.execute().await;
    METRICS.flush();
    let outcome = outcome?;

    if outcome.did_work {
        let classes: usize = outcome.source_mapping.values().map(|c| c.len()).sum();
        println!(
            "{}: compiled {} source file(s) into {} class(es) in {}",
            task.name,
            outcome.source_mapping.len(),
            classes,
            task.destination_dir.display()
        );
    } else {
        println!("{}: up to date", task.name);
    }
    Ok(())
}

#[derive(Serialize)]
struct SpecReport<'a> {
    task: &'a str,
    cache_key: String,
    spec: &'a kiev_compile::CompileSpec,
}

/// Print the compile spec as JSON
async fn cmd_spec(project_dir: &Path) -> Result<()> {
    let task = load_task(project_dir).await?;
    let spec = task.create_spec()?;
    let report = SpecReport {
        task: &task.name,
        cache_key: spec.cache_key()?,
        spec: &spec,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Infer the Kiev classpath from candidate jars
fn cmd_infer_classpath(files: Vec<PathBuf>) -> Result<()> {
    let inferred = inferred_classpath(files)?;
    info!(entries = inferred.len(), "Inferred Kiev classpath");
    for entry in inferred {
        println!("{}", entry.display());
    }
    Ok(())
}

fn inferred_classpath(files: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let classpath = KievRuntime::infer_classpath_from(files);
    Ok(classpath.files()?.to_vec())
}
