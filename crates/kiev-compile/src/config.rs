//! `kiev.toml` project configuration.
//!
//! ```toml
//! [source_set]
//! name = "main"
//! src_dirs = ["src/main/kiev", "src/main/java"]
//!
//! [classpath]
//! compile = ["libs/symade-all-0.7.2.jar", "libs/guava-33.0.jar"]
//!
//! [options]
//! incremental = false
//!
//! [kiev]
//! list_files = true
//!
//! [toolchain]
//! language_version = 17
//! ```
//!
//! Omitted values follow the source set conventions. Relative paths are
//! resolved against the project directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::options::{CompileOptions, KievCompileOptions};
use crate::pipeline::{KievCompileTask, SourceSetLayout, MAIN_SOURCE_SET};
use crate::runtime::LazyClasspath;
use crate::sandbox::EntryPointLoader;
use crate::source::SourceTree;
use crate::toolchain::Toolchain;

/// Name of the configuration file in a project directory.
pub const CONFIG_FILE: &str = "kiev.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub source_set: SourceSetConfig,
    pub classpath: ClasspathConfig,
    pub options: CompileOptions,
    pub kiev: KievCompileOptions,
    pub toolchain: ToolchainConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSetConfig {
    pub name: String,
    /// Empty means `src/<name>/kiev`.
    pub src_dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
    pub destination_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
}

impl Default for SourceSetConfig {
    fn default() -> Self {
        Self {
            name: MAIN_SOURCE_SET.to_string(),
            src_dirs: Vec::new(),
            files: Vec::new(),
            destination_dir: None,
            temp_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClasspathConfig {
    pub compile: Vec<PathBuf>,
    /// Explicit Kiev classpath. Inferred from `compile` when absent.
    pub kiev: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub launcher: Option<PathBuf>,
    /// Detected from the launcher when absent.
    pub language_version: Option<u32>,
}

/// Loads and validates `<project_dir>/kiev.toml`.
pub fn load_config(project_dir: &Path) -> std::result::Result<BuildConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        ConfigError::Invalid(format!("cannot read {}: {e}", config_path.display()))
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration string.
pub fn load_config_from_str(content: &str) -> std::result::Result<BuildConfig, ConfigError> {
    let config: BuildConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &BuildConfig) -> std::result::Result<(), ConfigError> {
    if config.source_set.name.is_empty() {
        return Err(ConfigError::Invalid(
            "source_set.name must not be empty".to_string(),
        ));
    }
    if config.classpath.kiev.as_ref().is_some_and(Vec::is_empty) {
        return Err(ConfigError::Invalid(
            "classpath.kiev must not be empty; remove it to infer the Kiev classpath".to_string(),
        ));
    }
    Ok(())
}

impl BuildConfig {
    /// The configured toolchain, detecting the language version if needed.
    pub async fn resolve_toolchain(&self) -> Result<Toolchain> {
        let launcher = self
            .toolchain
            .launcher
            .clone()
            .unwrap_or_else(Toolchain::default_launcher);
        match self.toolchain.language_version {
            Some(version) => Ok(Toolchain::new(launcher, version)),
            None => Toolchain::detect(launcher).await,
        }
    }

    /// Builds the compile task for `project_dir`.
    pub fn into_task<L: EntryPointLoader>(
        self,
        project_dir: &Path,
        toolchain: Toolchain,
        loader: L,
    ) -> KievCompileTask<L> {
        let resolve = |path: &PathBuf| {
            if path.is_absolute() {
                path.clone()
            } else {
                project_dir.join(path)
            }
        };

        let compile_classpath: Vec<PathBuf> = self.classpath.compile.iter().map(resolve).collect();
        let mut task = KievCompileTask::for_source_set(
            project_dir,
            &self.source_set.name,
            compile_classpath,
            toolchain,
            loader,
        );

        let mut sources = SourceTree::new(self.kiev.file_extensions.iter().cloned());
        if self.source_set.src_dirs.is_empty() {
            let layout = SourceSetLayout::conventional(project_dir, &self.source_set.name);
            sources = sources.src_dir(layout.src_dir);
        }
        for dir in &self.source_set.src_dirs {
            sources = sources.src_dir(resolve(dir));
        }
        for file in &self.source_set.files {
            sources = sources.file(resolve(file));
        }
        task.sources = sources;

        if let Some(dir) = &self.source_set.destination_dir {
            task.destination_dir = resolve(dir);
        }
        if let Some(dir) = &self.source_set.temp_dir {
            task.temp_dir = resolve(dir);
        }
        if let Some(kiev) = &self.classpath.kiev {
            task.tool_classpath = Some(Arc::new(LazyClasspath::resolved(
                "kievClasspath",
                kiev.iter().map(resolve).collect(),
            )));
        }
        task.options = self.options;
        task.kiev_options = self.kiev;
        task
    }
}
