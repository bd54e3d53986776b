//! The JVM adapter driven by stand-in launcher scripts.
#![cfg(unix)]

use std::collections::BTreeSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use kiev_compile::{
    CompilationFailure, CompileError, CompileSpec, CompileSpecBuilder, ConfigError,
    EntryPointLoader, IsolatedCompiler, IsolatedContext, JvmToolLoader, LazyClasspath, RunStatus,
    SourceTree, Toolchain,
};

const PROBE_OK: &str = "echo ok";

const HELLO_REPORT: &str =
    r"exit\t0\nerrors\t0\nmapping\tpresent\nmap\t/src/Hello.kiev\tHello\tHello$Inner\n";

/// Writes a launcher that answers `-cp <cp> <bridge> <mode> <entry> [<report> args...]`.
fn install_launcher(dir: &Path, probe: &str, run: &str) -> PathBuf {
    let script = format!(
        "#!/bin/sh\n[ -f \"$3\" ] || exit 1\n\
         case \"$4\" in\n  probe) {probe} ;;\n  run) {run} ;;\nesac\n"
    );
    let launcher = dir.join("java");
    std::fs::write(&launcher, script).unwrap();
    let mut permissions = std::fs::metadata(&launcher).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&launcher, permissions).unwrap();
    launcher
}

fn hello_run() -> String {
    format!(
        "echo \"compiling with $1 $2\"; printf '{HELLO_REPORT}' > \"$6\""
    )
}

fn spec_for(project: &Path, launcher: &Path) -> CompileSpec {
    let src = project.join("src/main/kiev");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("Hello.kiev"), "class Hello {}").unwrap();

    let tool_classpath = LazyClasspath::resolved(
        "kievClasspath",
        vec![project.join("libs/symade-all-0.7.2.jar")],
    );
    CompileSpecBuilder::new("compileKiev", Toolchain::new(launcher, 17))
        .sources(SourceTree::new(["kiev"]).src_dir(&src))
        .destination_dir(project.join("build/classes/kiev/main"))
        .working_dir(project)
        .temp_dir(project.join("build/tmp/compileKiev"))
        .tool_classpath(Arc::new(tool_classpath))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_child_jvm_protocol() {
    let project = tempfile::tempdir().unwrap();
    let launcher = install_launcher(project.path(), PROBE_OK, &hello_run());
    let spec = spec_for(project.path(), &launcher);

    let compiler = IsolatedCompiler::new(JvmToolLoader::new(&launcher));
    let result = compiler.invoke(&spec).await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.error_count, 0);
    assert_eq!(
        result.source_to_output[&PathBuf::from("/src/Hello.kiev")],
        BTreeSet::from(["Hello".to_string(), "Hello$Inner".to_string()])
    );
    let manifest = project.path().join("build/tmp/compileKiev/files.txt");
    let manifest = std::fs::read_to_string(manifest).unwrap();
    assert_eq!(manifest.lines().count(), 1);
}

#[tokio::test]
async fn test_missing_member_is_reported_at_load() {
    let project = tempfile::tempdir().unwrap();
    let probe = r"printf 'missing-member\terrorCount\n'";
    let launcher = install_launcher(project.path(), probe, &hello_run());
    let spec = spec_for(project.path(), &launcher);

    let compiler = IsolatedCompiler::new(JvmToolLoader::new(&launcher));
    match compiler.invoke(&spec).await.unwrap_err() {
        CompileError::Config(ConfigError::MissingEntryPointMember {
            entry_point,
            member,
        }) => {
            assert_eq!(entry_point, "kiev.Compiler");
            assert_eq!(member, "errorCount");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_exit_without_report_is_compilation_failure() {
    let project = tempfile::tempdir().unwrap();
    let launcher = install_launcher(project.path(), PROBE_OK, "exit 3");
    let spec = spec_for(project.path(), &launcher);

    let compiler = IsolatedCompiler::new(JvmToolLoader::new(&launcher));
    let err = compiler.invoke(&spec).await.unwrap_err();
    assert_eq!(
        err.as_compilation_failure(),
        Some(&CompilationFailure::ExitCode(3))
    );
}

#[tokio::test]
async fn test_rerun_does_not_read_previous_report() {
    let project = tempfile::tempdir().unwrap();
    let run = format!(
        "[ \"$7\" = die ] && exit 3; printf '{HELLO_REPORT}' > \"$6\""
    );
    let launcher = install_launcher(project.path(), PROBE_OK, &run);

    let context = IsolatedContext::open(&[]).unwrap();
    let loader = JvmToolLoader::new(&launcher);
    let mut entry_point = loader.load(&context, "kiev.Compiler").await.unwrap();

    let status = entry_point.run(&["ok".to_string()]).await.unwrap();
    assert_eq!(status, RunStatus::Exited(0));
    assert_eq!(entry_point.read_error_count(), Some(0));

    let status = entry_point.run(&["die".to_string()]).await.unwrap();
    assert_eq!(status, RunStatus::Exited(3));
    assert_eq!(entry_point.read_error_count(), None);
    assert!(entry_point.read_output_mapping().is_none());
    context.close().unwrap();
}

#[tokio::test]
async fn test_dropped_invocation_cleans_up() {
    let project = tempfile::tempdir().unwrap();
    let run = "echo $$ > \"$(dirname \"$0\")/run.pid\"; \
               dirname \"$3\" > \"$(dirname \"$0\")/scratch.path\"; \
               exec sleep 60";
    let launcher = install_launcher(project.path(), PROBE_OK, run);
    let spec = spec_for(project.path(), &launcher);

    let compiler = IsolatedCompiler::new(JvmToolLoader::new(&launcher));
    let invocation = compiler.invoke(&spec);
    let elapsed = tokio::time::timeout(Duration::from_secs(3), invocation).await;
    assert!(elapsed.is_err(), "compiler run should still be sleeping");

    let scratch = std::fs::read_to_string(project.path().join("scratch.path")).unwrap();
    let scratch = PathBuf::from(scratch.trim());
    assert!(scratch.starts_with(std::env::temp_dir()));
    assert!(
        !scratch.exists(),
        "scratch dir {} survived",
        scratch.display()
    );

    if cfg!(target_os = "linux") {
        let pid = std::fs::read_to_string(project.path().join("run.pid")).unwrap();
        let proc_entry = PathBuf::from(format!("/proc/{}", pid.trim()));
        let mut reaped = false;
        for _ in 0..50 {
            if !proc_entry.exists() {
                reaped = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(reaped, "compiler JVM {} was not reaped", pid.trim());
    }
}
