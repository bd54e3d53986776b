//! Preconditions for incremental Kiev compilation.

use std::path::PathBuf;

use crate::error::ConfigError;

/// File in the task's temp directory holding the previous compilation's analysis.
pub const INCREMENTAL_DATA_FILE: &str = "previous-compilation-data.bin";

/// Checks that incremental compilation can be applied.
///
/// Incremental mode needs at least one inferred source root and is mutually
/// exclusive with annotation processing. Roots are checked first.
pub fn validate_incremental(
    source_roots: &[PathBuf],
    annotation_processing_configured: bool,
) -> Result<(), ConfigError> {
    if source_roots.is_empty() {
        return Err(ConfigError::CannotInferSourceRoots);
    }
    if annotation_processing_configured {
        return Err(ConfigError::IncrementalWithAnnotationProcessing);
    }
    Ok(())
}
