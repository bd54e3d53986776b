//! Structured observability hooks for Kiev compile invocations.
//!
//! Lifecycle events are emitted with an `event` field so they can be filtered
//! (`KIEVC_LOG=kiev_compile=info`) or shipped as JSON.

use std::fmt;
use std::path::Path;

use tracing::{info, warn, Span};
use uuid::Uuid;

/// A `kiev.compile` span tagged with the task name and a fresh invocation id.
///
/// Async work is instrumented with [`InvocationSpan::span`].
#[derive(Debug)]
pub struct InvocationSpan {
    invocation_id: Uuid,
    span: Span,
}

impl InvocationSpan {
    pub fn new(task: &str) -> Self {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "kiev.compile",
            task = %task,
            invocation_id = %invocation_id
        );
        Self {
            invocation_id,
            span,
        }
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }
}

pub fn emit_compile_started(task: &str, source_files: usize, destination_dir: &Path) {
    info!(
        event = "compile.started",
        task = %task,
        source_files = source_files,
        destination_dir = %destination_dir.display(),
    );
}

pub fn emit_compile_finished(task: &str, duration_ms: u64, did_work: bool, success: bool) {
    info!(
        event = "compile.finished",
        task = %task,
        duration_ms = duration_ms,
        did_work = did_work,
        success = success,
    );
}

/// No source files: the compiler is not started.
pub fn emit_no_source(destination_dir: &Path) {
    info!(event = "compile.no_source", destination_dir = %destination_dir.display());
}

pub fn emit_failure_ignored(error: &dyn fmt::Display) {
    warn!(event = "compile.failure_ignored", error = %error, "Ignoring compilation failure");
}

pub fn emit_outputs_cleaned(destination_dir: &Path, removed: usize) {
    info!(
        event = "compile.outputs_cleaned",
        destination_dir = %destination_dir.display(),
        removed = removed,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_ids_are_unique() {
        let a = InvocationSpan::new("compileKiev");
        let b = InvocationSpan::new("compileKiev");
        assert_ne!(a.invocation_id(), b.invocation_id());
    }
}
