//! Error taxonomy for the Kiev compile engine.
//!
//! Three kinds of failure reach the caller:
//!
//! - [`ConfigError`]: user-fixable configuration problems, never retried.
//! - [`CompilationFailure`]: the compiler ran and reported problems, subject to
//!   the `failOnError` policy.
//! - [`EnvironmentFault`]: the invocation's preconditions were not met (I/O,
//!   process launch, teardown). Always fatal.

use std::path::PathBuf;

/// User-fixable configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Cannot infer Kiev class path because no Kiev Jar was found on class path: {classpath}"
    )]
    NoToolArtifact { classpath: String },

    #[error(
        "'{task}.kievClasspath' is not configured. Provide a Kiev compile dependency so the \
         classpath can be inferred, or configure 'kievClasspath' explicitly."
    )]
    ToolClasspathNotConfigured { task: String },

    #[error(
        "'{task}.kievClasspath' must not be empty. If a Kiev compile dependency is provided, \
         'kievClasspath' is inferred from it. Alternatively, configure 'kievClasspath' explicitly."
    )]
    EmptyToolClasspath { task: String },

    #[error("failed to resolve {display_name}: {reason}")]
    CandidateResolution {
        display_name: String,
        reason: String,
    },

    #[error(
        "Unable to infer source roots. Incremental Kiev compilation requires the source roots. \
         Change the configuration of your sources or disable incremental Kiev compilation."
    )]
    CannotInferSourceRoots,

    #[error(
        "Enabling incremental compilation and configuring Java annotation processors for Kiev \
         compilation is not allowed. Disable incremental Kiev compilation or remove the Java \
         annotation processor configuration."
    )]
    IncrementalWithAnnotationProcessing,

    #[error("{entry_point} not on classpath: {reason}")]
    MissingEntryPoint { entry_point: String, reason: String },

    #[error("cannot resolve {entry_point}.{member} on the Kiev classpath")]
    MissingEntryPointMember { entry_point: String, member: String },

    #[error(
        "{launcher} runs Java {language_version}, but running the Kiev compiler needs Java \
         {minimum} or newer. Configure a newer toolchain."
    )]
    UnsupportedToolchain {
        launcher: String,
        language_version: u32,
        minimum: u32,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// The compiler ran but the run must be reported as failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompilationFailure {
    #[error("Kiev compiler exited with code {0}")]
    ExitCode(i32),

    #[error("Kiev compilation failed with {count} error(s)")]
    Errors { count: u32 },

    #[error("Kiev compiler did not report a source to class mapping")]
    MissingOutputMapping,

    #[error("Kiev compiler did not report an error count")]
    MissingErrorCount,

    #[error("unexpected error during kiev.Compiler.run(String[] args): {class_name}: {message}")]
    ToolFault { class_name: String, message: String },
}

/// Failures of the engine's own environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentFault {
    #[error("failed to write source manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare isolated execution context: {0}")]
    ContextSetup(#[source] std::io::Error),

    #[error("failed to tear down isolated execution context: {0}")]
    Teardown(#[source] std::io::Error),

    #[error("failed to launch {launcher}: {source}")]
    Launch {
        launcher: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed compiler bridge report: {0}")]
    BridgeReport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Compilation,
    Environment,
}

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Compilation(#[from] CompilationFailure),

    #[error(transparent)]
    Environment(#[from] EnvironmentFault),
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Compilation(_) => ErrorKind::Compilation,
            Self::Environment(_) => ErrorKind::Environment,
        }
    }

    /// Returns the compilation failure, if this is one.
    pub fn as_compilation_failure(&self) -> Option<&CompilationFailure> {
        match self {
            Self::Compilation(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::Environment(EnvironmentFault::Io(err))
    }
}

/// Result type for compile engine operations.
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tool_artifact_names_classpath() {
        let err = ConfigError::NoToolArtifact {
            classpath: "[a.jar, b.jar]".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("no Kiev Jar was found"));
        assert!(msg.contains("a.jar"));
        assert!(msg.contains("b.jar"));
    }

    #[test]
    fn test_empty_and_unconfigured_classpath_are_distinct() {
        let empty = ConfigError::EmptyToolClasspath {
            task: "compileKiev".to_string(),
        };
        let missing = ConfigError::ToolClasspathNotConfigured {
            task: "compileKiev".to_string(),
        };
        assert_ne!(empty.to_string(), missing.to_string());
        assert!(empty.to_string().contains("must not be empty"));
        assert!(missing.to_string().contains("is not configured"));
    }

    #[test]
    fn test_error_kind_classification() {
        let err: CompileError = ConfigError::CannotInferSourceRoots.into();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err: CompileError = CompilationFailure::Errors { count: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::Compilation);
        assert_eq!(
            err.as_compilation_failure(),
            Some(&CompilationFailure::Errors { count: 3 })
        );

        let err: CompileError = std::io::Error::other("disk full").into();
        assert_eq!(err.kind(), ErrorKind::Environment);
        assert!(err.as_compilation_failure().is_none());
    }

    #[test]
    fn test_errors_count_in_message() {
        let err = CompilationFailure::Errors { count: 3 };
        assert!(err.to_string().contains("3 error(s)"));
    }
}
