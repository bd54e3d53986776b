//! The compiler seam and its outcome type.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CompileError, Result};
use crate::sandbox::SourceMapping;
use crate::spec::CompileSpec;

/// Externally visible result of one compile.
#[derive(Debug, Clone, Default)]
pub struct WorkOutcome {
    pub did_work: bool,
    /// Set only by [`crate::KievCompileTask::execute_to_outcome`], which folds
    /// a propagated error into the outcome.
    pub failure_cause: Option<Arc<CompileError>>,
    pub source_mapping: SourceMapping,
}

impl WorkOutcome {
    pub fn no_work() -> Self {
        Self::default()
    }

    /// Successful compile; work was done when any output was produced.
    pub fn compiled(source_mapping: SourceMapping) -> Self {
        Self {
            did_work: !source_mapping.is_empty(),
            failure_cause: None,
            source_mapping,
        }
    }

    pub fn failed(error: CompileError) -> Self {
        Self {
            did_work: false,
            failure_cause: Some(Arc::new(error)),
            source_mapping: SourceMapping::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure_cause.is_none()
    }
}

/// One stage of the compile pipeline.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn execute(&self, spec: &CompileSpec) -> Result<WorkOutcome>;
}
