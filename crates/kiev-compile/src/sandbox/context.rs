//! Single-use execution context scoped to the tool classpath.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::EnvironmentFault;

/// The resolvable locations and scratch space of one compiler invocation.
///
/// Only `locations` (the tool classpath) are visible to code loaded in the
/// context. The scratch directory holds support files and is deleted by
/// [`IsolatedContext::close`], or on drop when the invocation is abandoned.
#[derive(Debug)]
pub struct IsolatedContext {
    id: Uuid,
    locations: Vec<PathBuf>,
    scratch_path: PathBuf,
    scratch: Option<TempDir>,
}

impl IsolatedContext {
    pub fn open(locations: &[PathBuf]) -> Result<Self, EnvironmentFault> {
        let id = Uuid::new_v4();
        let scratch = tempfile::Builder::new()
            .prefix("kiev-sandbox-")
            .tempdir()
            .map_err(EnvironmentFault::ContextSetup)?;
        let scratch_path = scratch.path().to_path_buf();
        debug!(context = %id, scratch = %scratch_path.display(), "Opened isolated context");

        Ok(Self {
            id,
            locations: locations.to_vec(),
            scratch_path,
            scratch: Some(scratch),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_path
    }

    /// Platform class path string: the locations followed by `extra`.
    pub fn class_path(&self, extra: &[&Path]) -> Result<OsString, EnvironmentFault> {
        let entries = self
            .locations
            .iter()
            .map(PathBuf::as_path)
            .chain(extra.iter().copied());
        std::env::join_paths(entries).map_err(|e| {
            EnvironmentFault::ContextSetup(io::Error::new(io::ErrorKind::InvalidInput, e))
        })
    }

    /// Releases the context.
    pub fn close(mut self) -> Result<(), EnvironmentFault> {
        if let Some(scratch) = self.scratch.take() {
            scratch.close().map_err(EnvironmentFault::Teardown)?;
        }
        debug!(context = %self.id, "Closed isolated context");
        Ok(())
    }
}

impl Drop for IsolatedContext {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            if let Err(e) = scratch.close() {
                warn!(
                    context = %self.id,
                    error = %e,
                    "Failed to remove abandoned isolated context"
                );
            }
        }
    }
}
