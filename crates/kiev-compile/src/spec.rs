//! Immutable description of one Kiev compile invocation.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ConfigError, EnvironmentFault, Result};
use crate::incremental::{validate_incremental, INCREMENTAL_DATA_FILE};
use crate::options::{CompileOptions, KievCompileOptions, ToolOptions};
use crate::runtime::LazyClasspath;
use crate::source::SourceTree;
use crate::toolchain::Toolchain;

/// Everything the invoker needs for one compilation.
///
/// Built once by [`CompileSpecBuilder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileSpec {
    pub source_roots: Vec<PathBuf>,
    pub source_files: BTreeSet<PathBuf>,
    pub destination_dir: PathBuf,
    pub working_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub compile_classpath: Vec<PathBuf>,
    pub tool_classpath: Vec<PathBuf>,
    pub source_compatibility: String,
    pub target_compatibility: String,
    pub tool_options: ToolOptions,
    pub compiler_args: Vec<String>,
    pub annotation_processor_path: Vec<PathBuf>,
    pub incremental_data_file: Option<PathBuf>,
    pub launcher: PathBuf,
    /// Build-level fail-on-error flag.
    pub fail_on_error: bool,
}

impl CompileSpec {
    /// Whether a compilation failure propagates: both the build-level and the
    /// Kiev-level flag must be set.
    pub fn fails_on_error(&self) -> bool {
        self.fail_on_error && self.tool_options.fail_on_error
    }

    pub fn annotation_processing_configured(&self) -> bool {
        !self.annotation_processor_path.is_empty()
    }

    /// SHA-256 hex digest of the spec's JSON form.
    pub fn cache_key(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self).map_err(|e| {
            ConfigError::Invalid(format!("compile spec is not serializable: {e}"))
        })?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}

/// Removes repeated paths, keeping the first occurrence of each.
pub fn dedup_paths<I>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Assembles a [`CompileSpec`] from raw task configuration.
#[derive(Debug)]
pub struct CompileSpecBuilder {
    task_name: String,
    sources: SourceTree,
    destination_dir: PathBuf,
    working_dir: PathBuf,
    temp_dir: PathBuf,
    compile_classpath: Vec<PathBuf>,
    tool_classpath: Option<Arc<LazyClasspath>>,
    options: CompileOptions,
    kiev_options: KievCompileOptions,
    toolchain: Toolchain,
}

impl CompileSpecBuilder {
    pub fn new(task_name: impl Into<String>, toolchain: Toolchain) -> Self {
        Self {
            task_name: task_name.into(),
            sources: SourceTree::default(),
            destination_dir: PathBuf::new(),
            working_dir: PathBuf::new(),
            temp_dir: PathBuf::new(),
            compile_classpath: Vec::new(),
            tool_classpath: None,
            options: CompileOptions::default(),
            kiev_options: KievCompileOptions::default(),
            toolchain,
        }
    }

    pub fn sources(mut self, sources: SourceTree) -> Self {
        self.sources = sources;
        self
    }

    pub fn destination_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination_dir = dir.into();
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn compile_classpath<I>(mut self, classpath: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.compile_classpath = classpath.into_iter().collect();
        self
    }

    pub fn tool_classpath(mut self, classpath: Arc<LazyClasspath>) -> Self {
        self.tool_classpath = Some(classpath);
        self
    }

    pub fn options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn kiev_options(mut self, options: KievCompileOptions) -> Self {
        self.kiev_options = options;
        self
    }

    pub fn build(&self) -> Result<CompileSpec> {
        let tool_classpath = self.resolve_tool_classpath()?;
        info!(
            task = %self.task_name,
            entries = tool_classpath.len(),
            "Resolved Kiev classpath"
        );

        let source_files = self.sources.source_files().map_err(EnvironmentFault::Io)?;
        let source_roots = self.sources.infer_source_roots();
        debug!(task = %self.task_name, roots = ?source_roots, "Inferred source roots");

        let source_compatibility = self
            .options
            .source_compatibility
            .clone()
            .unwrap_or_else(|| self.toolchain.compatibility());
        let target_compatibility = self
            .options
            .target_compatibility
            .clone()
            .unwrap_or_else(|| source_compatibility.clone());

        let incremental_data_file = if self.options.incremental {
            validate_incremental(
                &source_roots,
                !self.options.annotation_processor_path.is_empty(),
            )?;
            Some(self.temp_dir.join(INCREMENTAL_DATA_FILE))
        } else {
            None
        };

        Ok(CompileSpec {
            source_roots,
            source_files,
            destination_dir: self.destination_dir.clone(),
            working_dir: self.working_dir.clone(),
            temp_dir: self.temp_dir.clone(),
            compile_classpath: dedup_paths(self.compile_classpath.iter().cloned()),
            tool_classpath,
            source_compatibility,
            target_compatibility,
            tool_options: ToolOptions::snapshot(&self.kiev_options),
            compiler_args: self.options.compiler_args.clone(),
            annotation_processor_path: self.options.annotation_processor_path.clone(),
            incremental_data_file,
            launcher: self.toolchain.launcher.clone(),
            fail_on_error: self.options.fail_on_error,
        })
    }

    fn resolve_tool_classpath(&self) -> Result<Vec<PathBuf>> {
        let Some(classpath) = &self.tool_classpath else {
            return Err(ConfigError::ToolClasspathNotConfigured {
                task: self.task_name.clone(),
            }
            .into());
        };
        let files = dedup_paths(classpath.files()?.iter().cloned());
        if files.is_empty() {
            return Err(ConfigError::EmptyToolClasspath {
                task: self.task_name.clone(),
            }
            .into());
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CompileError, ErrorKind};
    use crate::runtime::KievRuntime;
    use std::fs;

    fn p(path: &str) -> PathBuf {
        PathBuf::from(path)
    }

    fn builder(dir: &std::path::Path) -> CompileSpecBuilder {
        let src = dir.join("src/main/kiev");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("Hello.kiev"), "class Hello {}").unwrap();
        CompileSpecBuilder::new("compileKiev", Toolchain::new("java", 17))
            .sources(SourceTree::new(["kiev", "java"]).src_dir(&src))
            .destination_dir(dir.join("build/classes/kiev/main"))
            .working_dir(dir)
            .temp_dir(dir.join("build/tmp/compileKiev"))
            .tool_classpath(Arc::new(LazyClasspath::resolved(
                "kievClasspath",
                vec![p("libs/symade-all-0.7.2.jar")],
            )))
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let paths = vec![p("b.jar"), p("a.jar"), p("b.jar"), p("c.jar"), p("a.jar")];
        let deduped = dedup_paths(paths);
        assert_eq!(deduped, vec![p("b.jar"), p("a.jar"), p("c.jar")]);
        assert_eq!(dedup_paths(deduped.clone()), deduped);
    }

    #[test]
    fn test_build_populates_spec() {
        let dir = tempfile::tempdir().unwrap();
        let spec = builder(dir.path())
            .compile_classpath(vec![p("lib/x.jar"), p("lib/y.jar"), p("lib/x.jar")])
            .build()
            .unwrap();

        assert_eq!(spec.tool_classpath, vec![p("libs/symade-all-0.7.2.jar")]);
        assert_eq!(spec.compile_classpath, vec![p("lib/x.jar"), p("lib/y.jar")]);
        assert_eq!(spec.source_files.len(), 1);
        assert_eq!(spec.source_roots, vec![dir.path().join("src/main/kiev")]);
        assert!(spec.incremental_data_file.is_none());
        assert!(spec.fails_on_error());
    }

    #[test]
    fn test_compatibility_defaults_to_toolchain() {
        let dir = tempfile::tempdir().unwrap();
        let spec = builder(dir.path()).build().unwrap();
        assert_eq!(spec.source_compatibility, "17");
        assert_eq!(spec.target_compatibility, "17");
    }

    #[test]
    fn test_target_follows_explicit_source() {
        let dir = tempfile::tempdir().unwrap();
        let options = CompileOptions {
            source_compatibility: Some("1.8".to_string()),
            ..CompileOptions::default()
        };
        let spec = builder(dir.path()).options(options).build().unwrap();
        assert_eq!(spec.source_compatibility, "1.8");
        assert_eq!(spec.target_compatibility, "1.8");
    }

    #[test]
    fn test_unconfigured_tool_classpath() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = builder(dir.path());
        builder.tool_classpath = None;
        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            CompileError::Config(ConfigError::ToolClasspathNotConfigured { .. })
        ));
    }

    #[test]
    fn test_empty_tool_classpath() {
        let dir = tempfile::tempdir().unwrap();
        let empty = Arc::new(LazyClasspath::resolved("kievClasspath", Vec::new()));
        let err = builder(dir.path())
            .tool_classpath(empty)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Config(ConfigError::EmptyToolClasspath { .. })
        ));
    }

    #[test]
    fn test_inference_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let classpath = Arc::new(KievRuntime::infer_classpath_from(vec![p("a.jar")]));
        let err = builder(dir.path())
            .tool_classpath(classpath)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Config(ConfigError::NoToolArtifact { .. })
        ));
    }

    #[test]
    fn test_incremental_sets_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let options = CompileOptions {
            incremental: true,
            ..CompileOptions::default()
        };
        let spec = builder(dir.path()).options(options).build().unwrap();
        let expected = dir.path().join("build/tmp/compileKiev/previous-compilation-data.bin");
        assert_eq!(spec.incremental_data_file, Some(expected));
    }

    #[test]
    fn test_incremental_with_processors_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = CompileOptions {
            incremental: true,
            annotation_processor_path: vec![p("processors/lombok.jar")],
            ..CompileOptions::default()
        };
        let err = builder(dir.path()).options(options).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(
            err,
            CompileError::Config(ConfigError::IncrementalWithAnnotationProcessing)
        ));
    }

    #[test]
    fn test_cache_key_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let first = builder(dir.path()).build().unwrap();
        let second = builder(dir.path()).build().unwrap();
        assert_eq!(first.cache_key().unwrap(), second.cache_key().unwrap());
        assert_eq!(first.cache_key().unwrap().len(), 64);

        let mut changed = first.clone();
        changed.compiler_args.push("-verbose".to_string());
        assert_ne!(first.cache_key().unwrap(), changed.cache_key().unwrap());
    }
}
