//! Host-facing compile task.
//!
//! [`KievCompileTask`] wires the pipeline together: spec building (with
//! classpath inference and incremental validation), stale output cleaning,
//! isolated invocation and failure normalization.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::cleaning::CleaningCompiler;
use crate::compiler::{Compiler, WorkOutcome};
use crate::error::Result;
use crate::invoker::IsolatedCompiler;
use crate::metrics::METRICS;
use crate::normalizer::NormalizingCompiler;
use crate::obs::{self, InvocationSpan};
use crate::options::{CompileOptions, KievCompileOptions};
use crate::runtime::{KievRuntime, LazyClasspath};
use crate::sandbox::EntryPointLoader;
use crate::source::SourceTree;
use crate::spec::{CompileSpec, CompileSpecBuilder};
use crate::toolchain::Toolchain;

/// Name of the default source set.
pub const MAIN_SOURCE_SET: &str = "main";

/// `compileKiev` for `main`, `compile<Set>Kiev` otherwise.
pub fn compile_task_name(source_set: &str) -> String {
    if source_set == MAIN_SOURCE_SET {
        return "compileKiev".to_string();
    }
    let mut chars = source_set.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("compile{capitalized}Kiev")
}

/// Directory layout of a source set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSetLayout {
    pub task_name: String,
    pub src_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl SourceSetLayout {
    pub fn conventional(project_dir: &Path, source_set: &str) -> Self {
        let task_name = compile_task_name(source_set);
        Self {
            src_dir: project_dir.join("src").join(source_set).join("kiev"),
            destination_dir: project_dir
                .join("build")
                .join("classes")
                .join("kiev")
                .join(source_set),
            temp_dir: project_dir.join("build").join("tmp").join(&task_name),
            task_name,
        }
    }
}

type Pipeline<L> = NormalizingCompiler<CleaningCompiler<IsolatedCompiler<L>>>;

/// One Kiev compile task.
///
/// Configuration is public and may be edited until [`KievCompileTask::execute`];
/// each execution snapshots it into a fresh [`CompileSpec`].
pub struct KievCompileTask<L> {
    pub name: String,
    pub sources: SourceTree,
    pub destination_dir: PathBuf,
    pub working_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub compile_classpath: Vec<PathBuf>,
    /// Classpath of the compiler itself; `None` means not configured.
    pub tool_classpath: Option<Arc<LazyClasspath>>,
    pub options: CompileOptions,
    pub kiev_options: KievCompileOptions,
    pub toolchain: Toolchain,
    compiler: Pipeline<L>,
}

impl<L: EntryPointLoader> KievCompileTask<L> {
    /// A task with nothing configured.
    pub fn new(name: impl Into<String>, toolchain: Toolchain, loader: L) -> Self {
        let invoker = IsolatedCompiler::new(loader);
        let compiler = NormalizingCompiler::new(CleaningCompiler::new(invoker));
        Self {
            name: name.into(),
            sources: SourceTree::default(),
            destination_dir: PathBuf::new(),
            working_dir: PathBuf::new(),
            temp_dir: PathBuf::new(),
            compile_classpath: Vec::new(),
            tool_classpath: None,
            options: CompileOptions::default(),
            kiev_options: KievCompileOptions::default(),
            toolchain,
            compiler,
        }
    }

    /// A task following the source set conventions, with the tool classpath
    /// inferred from `compile_classpath` on first use.
    pub fn for_source_set(
        project_dir: &Path,
        source_set: &str,
        compile_classpath: Vec<PathBuf>,
        toolchain: Toolchain,
        loader: L,
    ) -> Self {
        let layout = SourceSetLayout::conventional(project_dir, source_set);
        let mut task = Self::new(layout.task_name, toolchain, loader);
        task.sources = SourceTree::new(task.kiev_options.file_extensions.iter().cloned())
            .src_dir(layout.src_dir);
        task.destination_dir = layout.destination_dir;
        task.working_dir = project_dir.to_path_buf();
        task.temp_dir = layout.temp_dir;
        task.tool_classpath = Some(Arc::new(KievRuntime::infer_classpath_from(
            compile_classpath.clone(),
        )));
        task.compile_classpath = compile_classpath;
        task
    }

    pub fn loader(&self) -> &L {
        self.compiler.delegate().delegate().loader()
    }

    /// Builds the spec the next execution would run with.
    pub fn create_spec(&self) -> Result<CompileSpec> {
        let sources = self
            .sources
            .clone()
            .with_extensions(self.kiev_options.file_extensions.iter().cloned());
        let mut builder = CompileSpecBuilder::new(&self.name, self.toolchain.clone())
            .sources(sources)
            .destination_dir(&self.destination_dir)
            .working_dir(&self.working_dir)
            .temp_dir(&self.temp_dir)
            .compile_classpath(self.compile_classpath.iter().cloned())
            .options(self.options.clone())
            .kiev_options(self.kiev_options.clone());
        if let Some(classpath) = &self.tool_classpath {
            builder = builder.tool_classpath(classpath.clone());
        }
        builder.build()
    }

    /// Runs the task. Configuration errors, environment faults and, under
    /// the fail-on-error policy, compilation failures are returned as errors.
    pub async fn execute(&self) -> Result<WorkOutcome> {
        let span = InvocationSpan::new(&self.name);
        self.run().instrument(span.span()).await
    }

    /// Like [`KievCompileTask::execute`], with a propagated error folded into
    /// [`WorkOutcome::failure_cause`].
    pub async fn execute_to_outcome(&self) -> WorkOutcome {
        match self.execute().await {
            Ok(outcome) => outcome,
            Err(err) => WorkOutcome::failed(err),
        }
    }

    async fn run(&self) -> Result<WorkOutcome> {
        METRICS.inc_invocations();
        let started = Instant::now();

        let spec = self.create_spec()?;
        obs::emit_compile_started(&self.name, spec.source_files.len(), &spec.destination_dir);

        let result = self.compiler.execute(&spec).await;
        let did_work = result.as_ref().is_ok_and(|outcome| outcome.did_work);
        obs::emit_compile_finished(
            &self.name,
            started.elapsed().as_millis() as u64,
            did_work,
            result.is_ok(),
        );
        result
    }
}
