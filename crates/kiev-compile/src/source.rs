//! Source trees and source root inference.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The sources of one compile task: directory trees plus loose files.
///
/// Only files whose extension is listed in `extensions` are compiled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTree {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl SourceTree {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dirs: Vec::new(),
            files: Vec::new(),
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a source directory.
    pub fn src_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    /// Adds a single file that is not part of any source directory.
    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    /// Replaces the compilable extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Infers the source roots of this tree.
    ///
    /// Every existing source directory is a root, except directories nested in
    /// another root. A loose file outside every root makes the roots
    /// uninferable and yields an empty list. Order follows declaration order.
    pub fn infer_source_roots(&self) -> Vec<PathBuf> {
        let existing: Vec<&PathBuf> = self.dirs.iter().filter(|dir| dir.is_dir()).collect();

        let mut roots: Vec<PathBuf> = Vec::new();
        for dir in &existing {
            let nested = existing
                .iter()
                .any(|other| other != dir && dir.starts_with(other));
            if !nested && !roots.contains(*dir) {
                roots.push((*dir).clone());
            }
        }

        let all_rooted = self
            .files
            .iter()
            .all(|file| roots.iter().any(|root| file.starts_with(root)));
        if !all_rooted {
            return Vec::new();
        }
        roots
    }

    /// Collects every compilable file of the tree.
    pub fn source_files(&self) -> io::Result<BTreeSet<PathBuf>> {
        let mut files = BTreeSet::new();
        for dir in &self.dirs {
            if dir.is_dir() {
                walk_sources(dir, &self.extensions, &mut files)?;
            }
        }
        for file in &self.files {
            if has_extension(file, &self.extensions) {
                files.insert(file.clone());
            }
        }
        Ok(files)
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}

fn walk_sources(
    dir: &Path,
    extensions: &[String],
    files: &mut BTreeSet<PathBuf>,
) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk_sources(&path, extensions, files)?;
        } else if has_extension(&path, extensions) {
            files.insert(path);
        }
    }
    Ok(())
}
