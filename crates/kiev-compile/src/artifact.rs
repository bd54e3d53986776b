//! Kiev distribution jar matching.
//!
//! A candidate file is a tool artifact when its name matches
//! `<base>(-all)?-(<version>|core).jar` for a known base name.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::version::{ToolVersion, VersionParseError};

/// Known distribution base names.
pub const DISTRIBUTION_NAMES: &[&str] = &["symade"];

/// Suffix of the bundled distribution's base name.
pub const BUNDLED_SUFFIX: &str = "-all";

fn file_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let names = DISTRIBUTION_NAMES
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"^({names})(-all)?-(\d.*|core)\.jar$"))
            .expect("distribution name pattern is valid")
    })
}

/// A parsed Kiev distribution jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolArtifact {
    /// Resolved location (symbolic links followed when possible).
    pub location: PathBuf,
    /// Base name without the bundled suffix, e.g. `symade`.
    pub base_name: String,
    /// Whether this is the bundled `-all` distribution.
    pub bundled: bool,
    pub version: ToolVersion,
}

impl ToolArtifact {
    /// Parses a candidate path.
    ///
    /// Returns `Ok(None)` when the file name does not match the naming grammar
    /// and `Err` when it matches but carries a malformed version.
    pub fn parse(path: &Path) -> Result<Option<Self>, VersionParseError> {
        let location = resolve_link(path);
        let Some(file_name) = location.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        let Some(captures) = file_name_pattern().captures(file_name) else {
            return Ok(None);
        };

        let base_name = captures[1].to_string();
        let bundled = captures.get(2).is_some();
        let version = ToolVersion::from_token(&captures[3])?;

        Ok(Some(Self {
            location,
            base_name,
            bundled,
            version,
        }))
    }

    /// Full base name as it appears in the file name, e.g. `symade-all`.
    pub fn full_base_name(&self) -> String {
        if self.bundled {
            format!("{}{BUNDLED_SUFFIX}", self.base_name)
        } else {
            self.base_name.clone()
        }
    }
}

/// Follows a symbolic link to its real location; the link target decides
/// identity. Falls back to the original path when resolution fails.
fn resolve_link(path: &Path) -> PathBuf {
    let is_link = fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false);
    if !is_link {
        return path.to_path_buf();
    }
    match fs::canonicalize(path) {
        Ok(real) => real,
        Err(e) => {
            tracing::debug!(
                path = %path.display(),
                error = %e,
                "Cannot resolve link, using original path"
            );
            path.to_path_buf()
        }
    }
}
