//! Java toolchain used to run the Kiev compiler.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{ConfigError, EnvironmentFault, Result};

/// A Java launcher and the language version it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub launcher: PathBuf,
    pub language_version: u32,
}

impl Toolchain {
    pub fn new(launcher: impl Into<PathBuf>, language_version: u32) -> Self {
        Self {
            launcher: launcher.into(),
            language_version,
        }
    }

    /// `$JAVA_HOME/bin/java` when `JAVA_HOME` is set, otherwise `java` from `PATH`.
    pub fn default_launcher() -> PathBuf {
        match std::env::var_os("JAVA_HOME") {
            Some(home) => Path::new(&home).join("bin").join("java"),
            None => PathBuf::from("java"),
        }
    }

    /// Runs `<launcher> -version` and reads the language version it reports.
    pub async fn detect(launcher: impl Into<PathBuf>) -> Result<Self> {
        let launcher = launcher.into();
        let output = Command::new(&launcher)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EnvironmentFault::Launch {
                launcher: launcher.clone(),
                source,
            })?;

        // `java -version` reports on stderr
        let report = String::from_utf8_lossy(&output.stderr);
        let language_version = parse_version_report(&report).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "cannot determine Java version from '{} -version': {}",
                launcher.display(),
                report.trim()
            ))
        })?;
        debug!(launcher = %launcher.display(), language_version, "Detected Java toolchain");

        Ok(Self {
            launcher,
            language_version,
        })
    }

    /// Compatibility string for this toolchain's language version.
    pub fn compatibility(&self) -> String {
        java_version_string(self.language_version)
    }
}

/// Renders a language version the way compatibility options spell it:
/// `1.8` for 8 and below, the bare number from 9 on.
pub fn java_version_string(language_version: u32) -> String {
    if language_version <= 8 {
        format!("1.{language_version}")
    } else {
        language_version.to_string()
    }
}

/// Extracts the language version from `java -version` output.
pub fn parse_version_report(report: &str) -> Option<u32> {
    let start = report.find('"')? + 1;
    let end = start + report[start..].find('"')?;
    let version = &report[start..end];

    let mut parts = version.split(|c: char| c == '.' || c == '_' || c == '-' || c == '+');
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        parts.next()?.parse().ok()
    } else {
        Some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_version_report() {
        let report =
            "java version \"1.8.0_392\"\nJava(TM) SE Runtime Environment (build 1.8.0_392-b08)";
        assert_eq!(parse_version_report(report), Some(8));
    }

    #[test]
    fn test_parse_modern_version_report() {
        let report = "openjdk version \"17.0.2\" 2022-01-18\nOpenJDK Runtime Environment";
        assert_eq!(parse_version_report(report), Some(17));
        let report = "openjdk version \"21\" 2023-09-19";
        assert_eq!(parse_version_report(report), Some(21));
        assert_eq!(parse_version_report("openjdk version \"22-ea\""), Some(22));
    }

    #[test]
    fn test_parse_garbage_report() {
        assert_eq!(parse_version_report("command not found"), None);
        assert_eq!(parse_version_report("version \"abc\""), None);
    }

    #[test]
    fn test_java_version_string() {
        assert_eq!(java_version_string(8), "1.8");
        assert_eq!(java_version_string(11), "11");
        assert_eq!(Toolchain::new("java", 17).compatibility(), "17");
    }

    #[tokio::test]
    async fn test_detect_missing_launcher_is_environment_fault() {
        let err = Toolchain::detect("/nonexistent/java").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Environment);
    }
}
