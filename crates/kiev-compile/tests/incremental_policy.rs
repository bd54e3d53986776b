//! Incremental compilation preconditions, through the spec builder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiev_compile::{
    validate_incremental, CompileError, CompileOptions, CompileSpecBuilder, ConfigError,
    LazyClasspath, SourceTree, Toolchain,
};

fn builder(project: &Path, sources: SourceTree, options: CompileOptions) -> CompileSpecBuilder {
    CompileSpecBuilder::new("compileKiev", Toolchain::new("java", 11))
        .sources(sources)
        .destination_dir(project.join("build/classes/kiev/main"))
        .working_dir(project)
        .temp_dir(project.join("build/tmp/compileKiev"))
        .tool_classpath(Arc::new(LazyClasspath::resolved(
            "kievClasspath",
            vec![PathBuf::from("symade-all-0.7.2.jar")],
        )))
        .options(options)
}

fn incremental(processors: &[&str]) -> CompileOptions {
    CompileOptions {
        incremental: true,
        annotation_processor_path: processors.iter().map(PathBuf::from).collect(),
        ..CompileOptions::default()
    }
}

#[test]
fn test_validation_matrix() {
    let root_sets: [Vec<PathBuf>; 3] = [
        vec![],
        vec![PathBuf::from("src/main/kiev")],
        vec![
            PathBuf::from("src/main/kiev"),
            PathBuf::from("src/main/java"),
        ],
    ];
    for roots in &root_sets {
        for processing in [false, true] {
            let expected = match (roots.is_empty(), processing) {
                (true, _) => Err(ConfigError::CannotInferSourceRoots),
                (false, true) => Err(ConfigError::IncrementalWithAnnotationProcessing),
                (false, false) => Ok(()),
            };
            assert_eq!(validate_incremental(roots, processing), expected);
        }
    }
}

#[test]
fn test_uninferable_roots_reject_incremental() {
    let project = tempfile::tempdir().unwrap();
    let src = project.path().join("src/main/kiev");
    std::fs::create_dir_all(&src).unwrap();
    let loose = project.path().join("Generated.kiev");
    std::fs::write(&loose, "class Generated {}").unwrap();

    let sources = SourceTree::new(["kiev"]).src_dir(&src).file(&loose);
    let err = builder(project.path(), sources, incremental(&[]))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Config(ConfigError::CannotInferSourceRoots)
    ));
}

#[test]
fn test_annotation_processing_rejects_incremental() {
    let project = tempfile::tempdir().unwrap();
    let src = project.path().join("src/main/kiev");
    std::fs::create_dir_all(&src).unwrap();

    let err = builder(
        project.path(),
        SourceTree::new(["kiev"]).src_dir(&src),
        incremental(&["processors/auto-value.jar"]),
    )
    .build()
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Config(ConfigError::IncrementalWithAnnotationProcessing)
    ));
}

#[test]
fn test_same_configuration_is_fine_without_incremental() {
    let project = tempfile::tempdir().unwrap();
    let loose = project.path().join("Generated.kiev");
    std::fs::write(&loose, "class Generated {}").unwrap();

    let options = CompileOptions {
        annotation_processor_path: vec![PathBuf::from("processors/auto-value.jar")],
        ..CompileOptions::default()
    };
    let sources = SourceTree::new(["kiev"]).file(&loose);
    let spec = builder(project.path(), sources, options).build().unwrap();
    assert!(spec.source_roots.is_empty());
    assert!(spec.incremental_data_file.is_none());
    assert!(spec.annotation_processing_configured());
}
