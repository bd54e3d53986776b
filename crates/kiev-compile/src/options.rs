//! Compile options.
//!
//! [`KievCompileOptions`] is the live, mutable configuration a build script
//! edits. [`ToolOptions`] is the immutable snapshot taken when a compile spec
//! is built, so an invocation never observes later edits.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default extensions of files handed to the Kiev compiler.
pub const DEFAULT_FILE_EXTENSIONS: &[&str] = &["java", "kiev"];

/// Kiev-specific compile options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct KievCompileOptions {
    /// Fail the build when compilation fails. Defaults to true.
    pub fail_on_error: bool,
    pub verbose: bool,
    /// Log the source files handed to the compiler.
    pub list_files: bool,
    pub encoding: String,
    pub file_extensions: Vec<String>,
    pub optimization_options: BTreeMap<String, bool>,
    pub stub_dir: Option<PathBuf>,
    /// Emit parameter metadata for reflection.
    pub parameters: bool,
    pub disabled_global_ast_transformations: BTreeSet<String>,
}

impl Default for KievCompileOptions {
    fn default() -> Self {
        Self {
            fail_on_error: true,
            verbose: false,
            list_files: false,
            encoding: "UTF-8".to_string(),
            file_extensions: DEFAULT_FILE_EXTENSIONS
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
            optimization_options: BTreeMap::new(),
            stub_dir: None,
            parameters: false,
            disabled_global_ast_transformations: BTreeSet::new(),
        }
    }
}

/// Snapshot of [`KievCompileOptions`] carried by a compile spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOptions {
    pub fail_on_error: bool,
    pub verbose: bool,
    pub list_files: bool,
    pub encoding: String,
    pub file_extensions: Vec<String>,
    pub optimization_flags: BTreeMap<String, bool>,
    pub stub_dir: Option<PathBuf>,
    pub emit_parameter_metadata: bool,
    pub disabled_transforms: BTreeSet<String>,
}

impl ToolOptions {
    /// Copies the live options by value.
    pub fn snapshot(options: &KievCompileOptions) -> Self {
        Self {
            fail_on_error: options.fail_on_error,
            verbose: options.verbose,
            list_files: options.list_files,
            encoding: options.encoding.clone(),
            file_extensions: options.file_extensions.clone(),
            optimization_flags: options.optimization_options.clone(),
            stub_dir: options.stub_dir.clone(),
            emit_parameter_metadata: options.parameters,
            disabled_transforms: options.disabled_global_ast_transformations.clone(),
        }
    }
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self::snapshot(&KievCompileOptions::default())
    }
}

/// Build-level compile options shared with the nested Java compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CompileOptions {
    pub fail_on_error: bool,
    /// Extra arguments appended to the compiler's argument vector.
    pub compiler_args: Vec<String>,
    pub incremental: bool,
    pub source_compatibility: Option<String>,
    pub target_compatibility: Option<String>,
    pub annotation_processor_path: Vec<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fail_on_error: true,
            compiler_args: Vec::new(),
            incremental: false,
            source_compatibility: None,
            target_compatibility: None,
            annotation_processor_path: Vec::new(),
        }
    }
}
