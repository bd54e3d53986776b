//! Failure policy around the compile pipeline.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::compiler::{Compiler, WorkOutcome};
use crate::error::{ErrorKind, Result};
use crate::invoker::{build_arguments, manifest_path};
use crate::metrics::METRICS;
use crate::obs;
use crate::spec::CompileSpec;

/// Logs what is about to be compiled and applies the fail-on-error policy.
///
/// A compilation failure propagates only when both the build-level and the
/// Kiev-level `fail_on_error` flags are set; otherwise it is logged and the
/// outcome is "no work done". Configuration errors and environment faults
/// always propagate.
#[derive(Debug, Clone)]
pub struct NormalizingCompiler<C> {
    delegate: C,
}

impl<C: Compiler> NormalizingCompiler<C> {
    pub fn new(delegate: C) -> Self {
        Self { delegate }
    }

    pub fn delegate(&self) -> &C {
        &self.delegate
    }
}

#[async_trait]
impl<C: Compiler> Compiler for NormalizingCompiler<C> {
    async fn execute(&self, spec: &CompileSpec) -> Result<WorkOutcome> {
        log_source_files(spec);
        log_compiler_arguments(spec);

        match self.delegate.execute(spec).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.kind() == ErrorKind::Compilation && !spec.fails_on_error() => {
                obs::emit_failure_ignored(&err);
                METRICS.inc_failures_ignored();
                Ok(WorkOutcome::no_work())
            }
            Err(err) => Err(err),
        }
    }
}

fn log_source_files(spec: &CompileSpec) {
    if !spec.tool_options.list_files {
        return;
    }
    let mut listing = String::from("Source files to be compiled:");
    for file in &spec.source_files {
        listing.push('\n');
        listing.push_str(&file.to_string_lossy());
    }
    info!("{listing}");
}

fn log_compiler_arguments(spec: &CompileSpec) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let args = build_arguments(spec, &manifest_path(spec));
    debug!(args = %args.join(" "), "Kiev compiler arguments");
}
