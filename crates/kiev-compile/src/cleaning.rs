//! Stale output removal ahead of full recompilation.

use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::compiler::{Compiler, WorkOutcome};
use crate::error::{EnvironmentFault, Result};
use crate::obs;
use crate::spec::CompileSpec;

/// Empties the destination directory before a non-incremental compile.
///
/// Incremental compiles keep their outputs. Removing anything counts as work
/// even when the delegate produces nothing.
#[derive(Debug, Clone)]
pub struct CleaningCompiler<C> {
    delegate: C,
}

impl<C: Compiler> CleaningCompiler<C> {
    pub fn new(delegate: C) -> Self {
        Self { delegate }
    }

    pub fn delegate(&self) -> &C {
        &self.delegate
    }
}

#[async_trait]
impl<C: Compiler> Compiler for CleaningCompiler<C> {
    async fn execute(&self, spec: &CompileSpec) -> Result<WorkOutcome> {
        let mut removed = 0;
        if spec.incremental_data_file.is_none() {
            removed = clean_directory(&spec.destination_dir)
                .await
                .map_err(EnvironmentFault::Io)?;
            if removed > 0 {
                obs::emit_outputs_cleaned(&spec.destination_dir, removed);
            }
        }

        let mut outcome = self.delegate.execute(spec).await?;
        outcome.did_work |= removed > 0;
        Ok(outcome)
    }
}

/// Removes the contents of `dir`, keeping `dir` itself. Returns the number of
/// top-level entries removed.
async fn clean_directory(dir: &Path) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ToolOptions;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct NoopCompiler {
        saw_clean_dir: AtomicBool,
    }

    #[async_trait]
    impl Compiler for NoopCompiler {
        async fn execute(&self, spec: &CompileSpec) -> Result<WorkOutcome> {
            let empty = std::fs::read_dir(&spec.destination_dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(true);
            self.saw_clean_dir.store(empty, Ordering::SeqCst);
            Ok(WorkOutcome::no_work())
        }
    }

    fn spec(destination_dir: PathBuf, incremental: bool) -> CompileSpec {
        let incremental_data_file =
            incremental.then(|| PathBuf::from("tmp/previous-compilation-data.bin"));
        CompileSpec {
            source_roots: Vec::new(),
            source_files: BTreeSet::new(),
            destination_dir,
            working_dir: PathBuf::from("."),
            temp_dir: PathBuf::from("tmp"),
            compile_classpath: Vec::new(),
            tool_classpath: vec![PathBuf::from("symade-all-0.7.2.jar")],
            source_compatibility: "17".to_string(),
            target_compatibility: "17".to_string(),
            tool_options: ToolOptions::default(),
            compiler_args: Vec::new(),
            annotation_processor_path: Vec::new(),
            incremental_data_file,
            launcher: PathBuf::from("java"),
            fail_on_error: true,
        }
    }

    fn stale_outputs(dir: &Path) {
        std::fs::create_dir_all(dir.join("pkg")).unwrap();
        std::fs::write(dir.join("pkg/Old.class"), b"cafebabe").unwrap();
        std::fs::write(dir.join("Top.class"), b"cafebabe").unwrap();
    }

    #[tokio::test]
    async fn test_removes_stale_outputs_before_compiling() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("classes");
        stale_outputs(&dest);

        let compiler = CleaningCompiler::new(NoopCompiler {
            saw_clean_dir: AtomicBool::new(false),
        });
        let outcome = compiler.execute(&spec(dest.clone(), false)).await.unwrap();

        assert!(outcome.did_work);
        assert!(compiler.delegate().saw_clean_dir.load(Ordering::SeqCst));
        assert!(dest.is_dir());
    }

    #[tokio::test]
    async fn test_incremental_keeps_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("classes");
        stale_outputs(&dest);

        let compiler = CleaningCompiler::new(NoopCompiler {
            saw_clean_dir: AtomicBool::new(true),
        });
        let outcome = compiler.execute(&spec(dest.clone(), true)).await.unwrap();

        assert!(!outcome.did_work);
        assert!(dest.join("Top.class").exists());
    }

    #[tokio::test]
    async fn test_missing_destination_is_not_work() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = CleaningCompiler::new(NoopCompiler {
            saw_clean_dir: AtomicBool::new(false),
        });
        let outcome = compiler
            .execute(&spec(dir.path().join("absent"), false))
            .await
            .unwrap();
        assert!(!outcome.did_work);
    }
}
