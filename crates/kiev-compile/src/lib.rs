//! Kiev compile engine.
//!
//! Locates the Kiev compiler distribution on a classpath, builds an immutable
//! compile spec, validates incremental-compilation preconditions, runs the
//! compiler in an isolated context and normalizes the result.
//!
//! ```text
//! KievRuntime::infer_classpath ─▶ CompileSpecBuilder ─▶ validate_incremental
//!        ─▶ CleaningCompiler ─▶ IsolatedCompiler ─▶ NormalizingCompiler ─▶ WorkOutcome
//! ```

pub mod artifact;
pub mod cleaning;
pub mod compiler;
pub mod config;
pub mod error;
pub mod fakes;
pub mod incremental;
pub mod invoker;
pub mod metrics;
pub mod normalizer;
pub mod obs;
pub mod options;
pub mod pipeline;
pub mod runtime;
pub mod sandbox;
pub mod source;
pub mod spec;
pub mod telemetry;
pub mod toolchain;
pub mod version;

pub use artifact::ToolArtifact;
pub use cleaning::CleaningCompiler;
pub use compiler::{Compiler, WorkOutcome};
pub use config::{load_config, load_config_from_str, BuildConfig};
pub use error::{CompilationFailure, CompileError, ConfigError, EnvironmentFault, ErrorKind, Result};
pub use incremental::validate_incremental;
pub use invoker::{build_arguments, InvocationResult, IsolatedCompiler};
pub use normalizer::NormalizingCompiler;
pub use options::{CompileOptions, KievCompileOptions, ToolOptions};
pub use pipeline::{compile_task_name, KievCompileTask, SourceSetLayout};
pub use runtime::{KievRuntime, LazyClasspath};
pub use sandbox::{
    CompilerEntryPoint, EntryPointLoader, IsolatedContext, JvmToolLoader, RunStatus, SourceMapping,
    ToolFault,
};
pub use source::SourceTree;
pub use spec::{dedup_paths, CompileSpec, CompileSpecBuilder};
pub use toolchain::Toolchain;
pub use version::{ToolVersion, VersionNumber, VersionParseError};
