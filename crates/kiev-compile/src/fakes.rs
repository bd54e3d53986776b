//! Scripted in-memory entry point loader (testing only).
//!
//! [`FakeToolLoader`] satisfies the [`EntryPointLoader`] contract without a
//! JVM. Each loaded entry point replays one [`ScriptedRun`] and the loader
//! records what it was asked to do.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{ConfigError, EnvironmentFault, Result};
use crate::sandbox::{
    CompilerEntryPoint, EntryPointLoader, IsolatedContext, RunStatus, SourceMapping, ToolFault,
};

/// What a fake entry point reports for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedRun {
    pub status: RunStatus,
    pub error_count: Option<u32>,
    pub mapping: Option<SourceMapping>,
}

impl ScriptedRun {
    pub fn success(mapping: SourceMapping) -> Self {
        Self {
            status: RunStatus::Exited(0),
            error_count: Some(0),
            mapping: Some(mapping),
        }
    }

    pub fn errors(count: u32) -> Self {
        Self {
            status: RunStatus::Exited(0),
            error_count: Some(count),
            mapping: Some(SourceMapping::new()),
        }
    }

    pub fn exit(code: i32) -> Self {
        Self {
            status: RunStatus::Exited(code),
            error_count: Some(0),
            mapping: Some(SourceMapping::new()),
        }
    }

    pub fn fault(class_name: &str, message: &str) -> Self {
        Self {
            status: RunStatus::Faulted(ToolFault::new(class_name, message)),
            error_count: Some(0),
            mapping: Some(SourceMapping::new()),
        }
    }

    pub fn with_error_count(mut self, error_count: Option<u32>) -> Self {
        self.error_count = error_count;
        self
    }

    pub fn with_mapping(mut self, mapping: Option<SourceMapping>) -> Self {
        self.mapping = mapping;
        self
    }
}

/// One recorded `run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    pub args: Vec<String>,
    /// Lines of the `@` manifest as they were on disk during the run.
    pub manifest: Vec<String>,
    /// Scratch directory of the context the run happened in.
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Default)]
struct Recorder {
    instantiations: AtomicU32,
    contexts: Mutex<Vec<Vec<PathBuf>>>,
    runs: Mutex<Vec<RecordedRun>>,
}

/// Cloneable handle: clones share the same recordings.
#[derive(Debug, Clone)]
pub struct FakeToolLoader {
    script: ScriptedRun,
    load_error: Option<ConfigError>,
    recorder: Arc<Recorder>,
}

impl FakeToolLoader {
    pub fn new(script: ScriptedRun) -> Self {
        Self {
            script,
            load_error: None,
            recorder: Arc::default(),
        }
    }

    /// A loader whose entry point cannot be found.
    pub fn missing_entry_point() -> Self {
        let mut loader = Self::new(ScriptedRun::exit(0));
        loader.load_error = Some(ConfigError::MissingEntryPoint {
            entry_point: crate::sandbox::ENTRY_POINT.to_string(),
            reason: "java.lang.ClassNotFoundException".to_string(),
        });
        loader
    }

    /// Number of entry points instantiated so far.
    pub fn instantiations(&self) -> u32 {
        self.recorder.instantiations.load(Ordering::SeqCst)
    }

    /// Resolvable locations of every context a load happened in.
    pub fn contexts(&self) -> Vec<Vec<PathBuf>> {
        self.recorder.contexts.lock().unwrap().clone()
    }

    pub fn runs(&self) -> Vec<RecordedRun> {
        self.recorder.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntryPointLoader for FakeToolLoader {
    async fn load(
        &self,
        context: &IsolatedContext,
        _entry_point: &str,
    ) -> Result<Box<dyn CompilerEntryPoint>> {
        self.recorder
            .contexts
            .lock()
            .unwrap()
            .push(context.locations().to_vec());
        if let Some(err) = &self.load_error {
            return Err(err.clone().into());
        }
        self.recorder.instantiations.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeEntryPoint {
            script: self.script.clone(),
            scratch_dir: context.scratch_dir().to_path_buf(),
            recorder: self.recorder.clone(),
            ran: false,
        }))
    }
}

struct FakeEntryPoint {
    script: ScriptedRun,
    scratch_dir: PathBuf,
    recorder: Arc<Recorder>,
    ran: bool,
}

#[async_trait]
impl CompilerEntryPoint for FakeEntryPoint {
    async fn run(&mut self, args: &[String]) -> Result<RunStatus> {
        let manifest = match args.iter().rev().find_map(|a| a.strip_prefix('@')) {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(EnvironmentFault::Io)?
                .lines()
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };
        self.recorder.runs.lock().unwrap().push(RecordedRun {
            args: args.to_vec(),
            manifest,
            scratch_dir: self.scratch_dir.clone(),
        });
        self.ran = true;
        Ok(self.script.status.clone())
    }

    fn read_output_mapping(&self) -> Option<SourceMapping> {
        self.ran.then(|| self.script.mapping.clone()).flatten()
    }

    fn read_error_count(&self) -> Option<u32> {
        self.ran.then_some(self.script.error_count).flatten()
    }
}
