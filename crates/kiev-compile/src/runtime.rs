//! Kiev runtime classpath inference.
//!
//! [`KievRuntime::infer_classpath`] searches a candidate classpath for a Kiev
//! distribution jar and returns a [`LazyClasspath`] for invoking the compiler.
//! Nothing is walked until the classpath is first requested, and a failure to
//! resolve the candidates surfaces at that point instead of at construction.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::{info, warn};

use crate::artifact::ToolArtifact;
use crate::error::ConfigError;
use crate::version::ToolVersion;

/// Modules assembled for a non-bundled distribution, `<module>-<version>.jar`.
pub const COMPANION_MODULES: &[&str] = &["symade"];

const DISPLAY_NAME: &str = "Kiev runtime classpath";

type CandidateSupplier = Box<dyn FnOnce() -> Result<Vec<PathBuf>, ConfigError> + Send>;

/// A memoized, single-evaluation classpath.
///
/// The first call to [`LazyClasspath::files`] runs the inference and caches
/// either the classpath or the failure; later calls return the cached outcome.
pub struct LazyClasspath {
    display_name: String,
    supplier: Mutex<Option<CandidateSupplier>>,
    value: OnceLock<Result<Vec<PathBuf>, ConfigError>>,
}

impl LazyClasspath {
    fn new(display_name: impl Into<String>, supplier: CandidateSupplier) -> Self {
        Self {
            display_name: display_name.into(),
            supplier: Mutex::new(Some(supplier)),
            value: OnceLock::new(),
        }
    }

    /// A classpath that is already known; no inference runs.
    pub fn resolved(display_name: impl Into<String>, files: Vec<PathBuf>) -> Self {
        let classpath = Self::new(display_name, Box::new(|| Ok(Vec::new())));
        let _ = classpath.value.set(Ok(files));
        classpath
    }

    /// Whether the delegate has been evaluated yet.
    pub fn is_evaluated(&self) -> bool {
        self.value.get().is_some()
    }

    /// Evaluates the classpath on first access.
    pub fn files(&self) -> Result<&[PathBuf], ConfigError> {
        self.value
            .get_or_init(|| {
                let supplier = self
                    .supplier
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .take();
                match supplier {
                    Some(supplier) => supplier(),
                    None => Err(ConfigError::CandidateResolution {
                        display_name: self.display_name.clone(),
                        reason: "classpath supplier already consumed".to_string(),
                    }),
                }
            })
            .as_ref()
            .map(Vec::as_slice)
            .map_err(Clone::clone)
    }
}

impl fmt::Debug for LazyClasspath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyClasspath")
            .field("display_name", &self.display_name)
            .field("value", &self.value.get())
            .finish()
    }
}

/// Information about the Kiev runtime used in a build.
pub struct KievRuntime;

impl KievRuntime {
    /// Infers the classpath for running the Kiev compiler from `candidates`.
    ///
    /// `candidates` is evaluated lazily; its error, or the absence of a Kiev jar,
    /// becomes the classpath's failure on first access.
    pub fn infer_classpath<F, I>(candidates: F) -> LazyClasspath
    where
        F: FnOnce() -> anyhow::Result<I> + Send + 'static,
        I: IntoIterator<Item = PathBuf>,
    {
        LazyClasspath::new(
            DISPLAY_NAME,
            Box::new(move || {
                let candidates: Vec<PathBuf> = candidates()
                    .map_err(|e| ConfigError::CandidateResolution {
                        display_name: DISPLAY_NAME.to_string(),
                        reason: format!("{e:#}"),
                    })?
                    .into_iter()
                    .collect();
                Self::resolve(&candidates)
            }),
        )
    }

    /// Infers the classpath from an already materialized candidate list.
    pub fn infer_classpath_from(candidates: Vec<PathBuf>) -> LazyClasspath {
        Self::infer_classpath(move || Ok(candidates))
    }

    /// Eagerly resolves the tool classpath from `candidates`.
    pub fn resolve(candidates: &[PathBuf]) -> Result<Vec<PathBuf>, ConfigError> {
        let Some(artifact) = find_tool_artifact(candidates) else {
            let err = ConfigError::NoToolArtifact {
                classpath: display_paths(candidates),
            };
            warn!(event = "classpath.inference_failed", error = %err);
            return Err(err);
        };

        if artifact.bundled {
            return Ok(vec![artifact.location]);
        }

        let companions = companion_jar_names(&artifact.version);
        let assembled = collect_jars_from_classpath(candidates, &companions);
        if assembled.is_empty() {
            warn!(
                artifact = %artifact.location.display(),
                version = %artifact.version,
                "No companion modules found for Kiev distribution, using the distribution jar alone"
            );
            return Ok(vec![artifact.location]);
        }
        Ok(assembled)
    }
}

/// Returns the first candidate that parses as a Kiev distribution jar.
///
/// Candidates with malformed versions are logged and skipped.
pub fn find_tool_artifact(candidates: &[PathBuf]) -> Option<ToolArtifact> {
    for candidate in candidates {
        match ToolArtifact::parse(candidate) {
            Ok(Some(artifact)) => {
                info!(
                    event = "classpath.inferred",
                    artifact = %artifact.location.display(),
                    version = %artifact.version,
                    "Found Kiev jar"
                );
                return Some(artifact);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    candidate = %candidate.display(),
                    error = %e,
                    "Skipping Kiev jar with malformed version"
                );
            }
        }
    }
    None
}

/// File names of the companion modules for `version`.
pub fn companion_jar_names(version: &ToolVersion) -> Vec<String> {
    COMPANION_MODULES
        .iter()
        .map(|module| format!("{module}-{version}.jar"))
        .collect()
}

fn collect_jars_from_classpath(classpath: &[PathBuf], jar_names: &[String]) -> Vec<PathBuf> {
    classpath
        .iter()
        .filter(|file| {
            file.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| jar_names.iter().any(|jar| jar == name))
        })
        .cloned()
        .collect()
}

fn display_paths(paths: &[PathBuf]) -> String {
    let rendered: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", rendered.join(", "))
}
