//! Child-JVM adapter for the Kiev compiler.
//!
//! Each context gets its own JVM whose class path is exactly the tool
//! classpath plus `KievBridge.java`, run in single-file source mode. The
//! bridge answers a `probe` with the first missing capability and reports a
//! `run` as tab-separated lines:
//!
//! ```text
//! exit    <code>              | fault <class> <message>
//! errors  <count>
//! mapping present
//! map     <source> <class>...
//! ```

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::context::IsolatedContext;
use super::entry_point::{CompilerEntryPoint, EntryPointLoader, RunStatus, SourceMapping, ToolFault};
use crate::error::{ConfigError, EnvironmentFault, Result};
use crate::toolchain::Toolchain;

/// Oldest Java release that runs single-file source programs.
pub const MIN_BRIDGE_LANGUAGE_VERSION: u32 = 11;

const BRIDGE_SOURCE: &str = include_str!("../../resources/KievBridge.java");
const BRIDGE_FILE: &str = "KievBridge.java";
const REPORT_FILE: &str = "report.tsv";

/// Loads entry points into a child JVM started with `launcher`.
#[derive(Debug, Clone)]
pub struct JvmToolLoader {
    launcher: PathBuf,
    language_version: Option<u32>,
}

impl JvmToolLoader {
    /// A loader for a launcher of unknown version.
    pub fn new(launcher: impl Into<PathBuf>) -> Self {
        Self {
            launcher: launcher.into(),
            language_version: None,
        }
    }

    pub fn for_toolchain(toolchain: &Toolchain) -> Self {
        Self {
            launcher: toolchain.launcher.clone(),
            language_version: Some(toolchain.language_version),
        }
    }

    pub fn launcher(&self) -> &Path {
        &self.launcher
    }

    fn check_language_version(&self) -> std::result::Result<(), ConfigError> {
        match self.language_version {
            Some(version) if version < MIN_BRIDGE_LANGUAGE_VERSION => {
                Err(ConfigError::UnsupportedToolchain {
                    launcher: self.launcher.display().to_string(),
                    language_version: version,
                    minimum: MIN_BRIDGE_LANGUAGE_VERSION,
                })
            }
            _ => Ok(()),
        }
    }

    fn command(&self, class_path: &OsString, bridge: &Path) -> Command {
        let mut cmd = Command::new(&self.launcher);
        cmd.arg("-cp")
            .arg(class_path)
            .arg(bridge)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn launch_error(&self, source: io::Error) -> EnvironmentFault {
        EnvironmentFault::Launch {
            launcher: self.launcher.clone(),
            source,
        }
    }
}

#[async_trait]
impl EntryPointLoader for JvmToolLoader {
    async fn load(
        &self,
        context: &IsolatedContext,
        entry_point: &str,
    ) -> Result<Box<dyn CompilerEntryPoint>> {
        self.check_language_version()?;

        let bridge = context.scratch_dir().join(BRIDGE_FILE);
        tokio::fs::write(&bridge, BRIDGE_SOURCE)
            .await
            .map_err(EnvironmentFault::ContextSetup)?;
        let class_path = context.class_path(&[])?;

        let output = self
            .command(&class_path, &bridge)
            .arg("probe")
            .arg(entry_point)
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(EnvironmentFault::BridgeReport(format!(
                "probe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
            .into());
        }
        parse_probe(entry_point, &stdout)?;
        debug!(context = %context.id(), entry_point, "Loaded compiler entry point");

        Ok(Box::new(JvmEntryPoint {
            loader: self.clone(),
            class_path,
            bridge,
            report: context.scratch_dir().join(REPORT_FILE),
            entry_point: entry_point.to_string(),
            last_run: None,
        }))
    }
}

struct JvmEntryPoint {
    loader: JvmToolLoader,
    class_path: OsString,
    bridge: PathBuf,
    report: PathBuf,
    entry_point: String,
    last_run: Option<BridgeReport>,
}

#[async_trait]
impl CompilerEntryPoint for JvmEntryPoint {
    async fn run(&mut self, args: &[String]) -> Result<RunStatus> {
        self.last_run = None;
        match tokio::fs::remove_file(&self.report).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(EnvironmentFault::Io(e).into()),
        }

        let output = self
            .loader
            .command(&self.class_path, &self.bridge)
            .arg("run")
            .arg(&self.entry_point)
            .arg(&self.report)
            .args(args)
            .output()
            .await
            .map_err(|e| self.loader.launch_error(e))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!(target: "kiev::compiler", "{line}");
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(target: "kiev::compiler", "{line}");
        }

        let text = match tokio::fs::read_to_string(&self.report).await {
            Ok(text) => text,
            // The tool ended the JVM itself before the bridge could report.
            Err(e) if e.kind() == io::ErrorKind::NotFound && !output.status.success() => {
                warn!(status = %output.status, "Compiler JVM exited without a report");
                return Ok(RunStatus::Exited(output.status.code().unwrap_or(-1)));
            }
            Err(e) => {
                return Err(EnvironmentFault::BridgeReport(format!(
                    "compiler JVM exited with {} without a report: {e}",
                    output.status
                ))
                .into())
            }
        };
        let report = parse_report(&text)?;
        let status = report.status.clone();
        self.last_run = Some(report);
        Ok(status)
    }

    fn read_output_mapping(&self) -> Option<SourceMapping> {
        self.last_run.as_ref().and_then(|r| r.mapping.clone())
    }

    fn read_error_count(&self) -> Option<u32> {
        self.last_run.as_ref().and_then(|r| r.error_count)
    }
}

fn parse_probe(entry_point: &str, stdout: &str) -> Result<()> {
    let line = stdout.lines().next().unwrap_or_default().trim_end();
    let (verdict, detail) = line.split_once('\t').unwrap_or((line, ""));
    let err = match verdict {
        "ok" => return Ok(()),
        "missing-class" | "not-instantiable" => ConfigError::MissingEntryPoint {
            entry_point: entry_point.to_string(),
            reason: detail.to_string(),
        },
        "missing-member" => ConfigError::MissingEntryPointMember {
            entry_point: entry_point.to_string(),
            member: detail.to_string(),
        },
        other => {
            let answer = format!("unexpected probe answer '{other}'");
            return Err(EnvironmentFault::BridgeReport(answer).into());
        }
    };
    Err(err.into())
}

/// Parsed `run` report.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BridgeReport {
    status: RunStatus,
    error_count: Option<u32>,
    mapping: Option<SourceMapping>,
}

fn malformed(line: &str) -> EnvironmentFault {
    EnvironmentFault::BridgeReport(format!("unexpected line '{line}'"))
}

fn parse_report(text: &str) -> std::result::Result<BridgeReport, EnvironmentFault> {
    let mut status = None;
    let mut error_count = None;
    let mut mapping: Option<SourceMapping> = None;

    for line in text.lines().filter(|l| !l.is_empty()) {
        let mut fields = line.split('\t');
        match fields.next() {
            Some("exit") => {
                let code: i32 = fields
                    .next()
                    .and_then(|c| c.parse().ok())
                    .ok_or_else(|| malformed(line))?;
                status = Some(RunStatus::Exited(code));
            }
            Some("fault") => {
                let class_name = fields.next().ok_or_else(|| malformed(line))?;
                let message = fields.next().unwrap_or_default();
                status = Some(RunStatus::Faulted(ToolFault::new(class_name, message)));
            }
            Some("errors") => {
                let count: u32 = fields
                    .next()
                    .and_then(|c| c.parse().ok())
                    .ok_or_else(|| malformed(line))?;
                error_count = Some(count);
            }
            Some("mapping") => {
                mapping.get_or_insert_with(SourceMapping::new);
            }
            Some("map") => {
                let source = fields.next().ok_or_else(|| malformed(line))?;
                let entries = mapping.as_mut().ok_or_else(|| malformed(line))?;
                entries
                    .entry(PathBuf::from(source))
                    .or_default()
                    .extend(fields.map(str::to_string));
            }
            _ => return Err(malformed(line)),
        }
    }

    let Some(status) = status else {
        return Err(EnvironmentFault::BridgeReport(
            "report has no outcome".to_string(),
        ));
    };
    Ok(BridgeReport {
        status,
        error_count,
        mapping,
    })
}
