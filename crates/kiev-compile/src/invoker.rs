//! Isolated invocation of the Kiev compiler.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::compiler::{Compiler, WorkOutcome};
use crate::error::{CompilationFailure, EnvironmentFault, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::sandbox::{EntryPointLoader, IsolatedContext, RunStatus, SourceMapping, ENTRY_POINT};
use crate::spec::{dedup_paths, CompileSpec};

/// Source manifest written to the temp directory, referenced as `@<path>`.
pub const MANIFEST_FILE: &str = "files.txt";

/// Bytecode level passed to `-target`.
pub const TARGET_BYTECODE: &str = "8";

#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_SEPARATOR: &str = ":";

/// What a successful run reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub source_to_output: SourceMapping,
    pub error_count: u32,
    pub exit_code: i32,
}

/// Runs the compiler entry point in a fresh [`IsolatedContext`] per call.
#[derive(Debug, Clone)]
pub struct IsolatedCompiler<L> {
    loader: L,
}

impl<L: EntryPointLoader> IsolatedCompiler<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Runs one compilation of a non-empty source set.
    ///
    /// The context is torn down on every path. A teardown failure after a
    /// successful run is an environment fault; after a failed run it is
    /// logged and the run's own error is returned.
    pub async fn invoke(&self, spec: &CompileSpec) -> Result<InvocationResult> {
        let context = IsolatedContext::open(&spec.tool_classpath)?;
        let outcome = self.run_in_context(&context, spec).await;
        let teardown = context.close();

        match (outcome, teardown) {
            (Ok(result), Ok(())) => Ok(result),
            (Ok(_), Err(fault)) => Err(fault.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(fault)) => {
                warn!(error = %fault, "Isolated context teardown failed after compile error");
                Err(err)
            }
        }
    }

    async fn run_in_context(
        &self,
        context: &IsolatedContext,
        spec: &CompileSpec,
    ) -> Result<InvocationResult> {
        let mut entry_point = self.loader.load(context, ENTRY_POINT).await?;

        let manifest = write_manifest(spec).await?;
        let args = build_arguments(spec, &manifest);
        info!(
            source_files = spec.source_files.len(),
            destination_dir = %spec.destination_dir.display(),
            "Compiling {} source file(s)",
            spec.source_files.len()
        );
        METRICS.add_source_files(spec.source_files.len() as u64);

        let exit_code = match entry_point.run(&args).await? {
            RunStatus::Exited(code) => code,
            RunStatus::Faulted(fault) if fault.is_compilation_abort() => {
                debug!(fault = %fault.class_name, "Compilation aborted by the compiler");
                0
            }
            RunStatus::Faulted(fault) => {
                error!(
                    entry_point = ENTRY_POINT,
                    fault = %fault.class_name,
                    message = %fault.message,
                    "Unexpected error during compiler run"
                );
                return Err(CompilationFailure::ToolFault {
                    class_name: fault.class_name,
                    message: fault.message,
                }
                .into());
            }
        };

        let error_count = entry_point.read_error_count();
        let mapping = entry_point.read_output_mapping();

        if exit_code != 0 {
            return Err(CompilationFailure::ExitCode(exit_code).into());
        }
        let error_count = error_count.ok_or(CompilationFailure::MissingErrorCount)?;
        if error_count > 0 {
            error!(error_count, "Got errors during compilation");
            return Err(CompilationFailure::Errors { count: error_count }.into());
        }
        let source_to_output = mapping.ok_or(CompilationFailure::MissingOutputMapping)?;
        info!(files = source_to_output.len(), "Successfully compiled");

        Ok(InvocationResult {
            source_to_output,
            error_count,
            exit_code,
        })
    }
}

#[async_trait]
impl<L: EntryPointLoader> Compiler for IsolatedCompiler<L> {
    async fn execute(&self, spec: &CompileSpec) -> Result<WorkOutcome> {
        if spec.source_files.is_empty() {
            obs::emit_no_source(&spec.destination_dir);
            METRICS.inc_short_circuits();
            return Ok(WorkOutcome::no_work());
        }
        let result = self.invoke(spec).await?;
        Ok(WorkOutcome::compiled(result.source_to_output))
    }
}

/// Location of the source manifest for `spec`.
pub fn manifest_path(spec: &CompileSpec) -> PathBuf {
    absolute(&spec.working_dir, &spec.temp_dir.join(MANIFEST_FILE))
}

/// Argument vector for `kiev.Compiler.run`.
///
/// The class path is the tool classpath followed by the compile classpath,
/// absolute and deduplicated across both. `-classpath` is omitted when it is
/// empty.
pub fn build_arguments(spec: &CompileSpec, manifest: &Path) -> Vec<String> {
    let classpath = dedup_paths(
        spec.tool_classpath
            .iter()
            .chain(&spec.compile_classpath)
            .map(|path| absolute(&spec.working_dir, path)),
    );

    let mut args = vec!["-ide".to_string()];
    if !classpath.is_empty() {
        let joined = classpath
            .iter()
            .map(|path| path.to_string_lossy())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR);
        args.push("-classpath".to_string());
        args.push(joined);
    }
    args.push("-javacerrors".to_string());
    args.push("-no-btd".to_string());
    args.push("-d".to_string());
    let destination = absolute(&spec.working_dir, &spec.destination_dir);
    args.push(destination.to_string_lossy().into_owned());
    args.push("-target".to_string());
    args.push(TARGET_BYTECODE.to_string());
    args.extend(spec.compiler_args.iter().cloned());
    args.push(format!("@{}", manifest.display()));
    args
}

async fn write_manifest(spec: &CompileSpec) -> Result<PathBuf> {
    let path = manifest_path(spec);
    let manifest_error = |source: std::io::Error| EnvironmentFault::Manifest {
        path: path.clone(),
        source,
    };

    let mut contents = String::new();
    for file in &spec.source_files {
        contents.push_str(&absolute(&spec.working_dir, file).to_string_lossy());
        contents.push('\n');
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(manifest_error)?;
    }
    tokio::fs::write(&path, contents).await.map_err(manifest_error)?;
    Ok(path)
}

fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
