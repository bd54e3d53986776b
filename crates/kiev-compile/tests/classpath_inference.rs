//! Distribution matching, versions and classpath inference.

use std::path::{Path, PathBuf};

use kiev_compile::{dedup_paths, ConfigError, KievRuntime, ToolArtifact, ToolVersion, VersionNumber};

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn test_single_match_is_found_wherever_it_sits() {
    let noise = ["a.jar", "guava-33.0.jar", "notes.txt", "symade.jar"];
    for position in 0..=noise.len() {
        let mut candidates = paths(&noise);
        candidates.insert(position, PathBuf::from("lib/symade-all-0.8.1.jar"));
        let resolved = KievRuntime::resolve(&candidates).unwrap();
        assert_eq!(
            resolved,
            paths(&["lib/symade-all-0.8.1.jar"]),
            "position {position}"
        );
    }
}

#[test]
fn test_zero_matches_name_the_full_input() {
    let candidates = paths(&["x/a.jar", "y/b.jar", "z/c.zip"]);
    let err = KievRuntime::resolve(&candidates).unwrap_err();
    assert!(matches!(err, ConfigError::NoToolArtifact { .. }));
    for candidate in &candidates {
        assert!(err.to_string().contains(&candidate.display().to_string()));
    }
}

#[test]
fn test_core_jar_parses_to_sentinel() {
    let artifact = ToolArtifact::parse(Path::new("symade-core.jar"))
        .expect("core is not a parse error")
        .expect("core matches");
    assert_eq!(artifact.version, ToolVersion::Core);
    assert_eq!(artifact.version.to_string(), "0.6.0-SNAPSHOT");
}

#[test]
fn test_core_orders_below_every_release() {
    for token in [
        "0",
        "0.0.1",
        "0.6.0-SNAPSHOT",
        "0.6.0",
        "1.0-rc1",
        "2.3.4.5",
        "10",
    ] {
        let release = ToolVersion::Release(VersionNumber::parse(token).unwrap());
        assert!(ToolVersion::Core < release, "core should be below {token}");
    }
}

#[test]
fn test_release_versions_order_numerically() {
    let parse = |token: &str| VersionNumber::parse(token).unwrap();
    assert!(parse("0.7.10") > parse("0.7.9"));
    assert!(parse("1.0") > parse("1.0-rc1"));
    assert_eq!(parse("1.2"), parse("1.2.0"));
}

#[test]
fn test_dedup_is_idempotent() {
    let inputs = [
        paths(&[]),
        paths(&["a", "a", "a"]),
        paths(&["b", "a", "b", "c", "a", "d", "c"]),
        paths(&["x", "y", "z"]),
    ];
    for input in inputs {
        let once = dedup_paths(input.clone());
        let twice = dedup_paths(once.clone());
        assert_eq!(once, twice);
        let mut unique = once.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), once.len());
    }
}

#[test]
fn test_lazy_classpath_defers_supplier_failure() {
    let classpath = KievRuntime::infer_classpath(|| -> anyhow::Result<Vec<PathBuf>> {
        anyhow::bail!("configuration 'kiev' could not be resolved")
    });
    assert!(!classpath.is_evaluated());
    let err = classpath.files().unwrap_err();
    assert!(matches!(err, ConfigError::CandidateResolution { .. }));
    assert!(err.to_string().contains("could not be resolved"));
}
