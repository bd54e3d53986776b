//! Capability interface over the external compiler's entry point.
//!
//! The engine never looks up tool members itself. A loader resolves the
//! entry point once inside an [`IsolatedContext`] and fails with a named
//! configuration error when a capability is missing; everything downstream
//! talks to [`CompilerEntryPoint`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::context::IsolatedContext;
use crate::error::Result;

/// Fully qualified name of the Kiev compiler's entry point.
pub const ENTRY_POINT: &str = "kiev.Compiler";

/// Marker in the class name of the fault the tool raises to end a run early.
pub const ABORT_SIGNAL: &str = "CompilationAbortError";

/// Source path to the class identifiers produced from it.
pub type SourceMapping = BTreeMap<PathBuf, BTreeSet<String>>;

/// A fault thrown from inside the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFault {
    pub class_name: String,
    pub message: String,
}

impl ToolFault {
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
        }
    }

    /// The tool's "compilation aborted" signal, which counts as normal completion.
    pub fn is_compilation_abort(&self) -> bool {
        self.class_name.contains(ABORT_SIGNAL)
    }
}

/// How a `run` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Exited(i32),
    Faulted(ToolFault),
}

/// A loaded compiler entry point.
///
/// Results are read after `run` returns, never while it runs.
#[async_trait]
pub trait CompilerEntryPoint: Send {
    async fn run(&mut self, args: &[String]) -> Result<RunStatus>;

    /// Source to output mapping of the last run, if the tool published one.
    fn read_output_mapping(&self) -> Option<SourceMapping>;

    /// Error count of the last run, if the tool published one.
    fn read_error_count(&self) -> Option<u32>;
}

/// Instantiates an entry point within an isolated context.
#[async_trait]
pub trait EntryPointLoader: Send + Sync {
    async fn load(
        &self,
        context: &IsolatedContext,
        entry_point: &str,
    ) -> Result<Box<dyn CompilerEntryPoint>>;
}
