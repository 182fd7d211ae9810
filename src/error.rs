//! Error types for product builds.
//!
//! This module defines [`BuildError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `BuildError` for failures that need distinct handling (chain
//!   compilation, subprocesses, configuration)
//! - Use `anyhow::Error` (via `BuildError::Other`) for unexpected errors
//! - Failures inside a step are wrapped once in [`BuildError::StepFailed`] so
//!   the top-level handler can name the step that broke

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for product builds.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A chain references a step name missing from the registry.
    #[error("invalid step: {name}")]
    InvalidStep { name: String },

    /// A step expands into itself, directly or transitively.
    #[error("Circular step definition detected: {cycle}")]
    CircularStep { cycle: String },

    /// A registry step failed while the chain was running.
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<BuildError>,
    },

    /// The chain trigger was dropped without being started.
    #[error("Chain was dropped before it was started")]
    ChainNotStarted,

    /// Subprocess exited unsuccessfully or could not be spawned.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// Required input file is missing.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Input file could not be parsed.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Input values are structurally valid but unusable.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// A product descriptor names a type that cannot be built.
    #[error("unknown product type: {kind}")]
    UnknownProductType { kind: String },

    /// Downloading a data package failed.
    #[error("Download of {url} failed: {message}")]
    DownloadFailed { url: String, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    /// Attribute this error to a registry step.
    ///
    /// Errors already attributed to a (more specific) step are returned
    /// unchanged.
    pub fn in_step(self, step: &str) -> Self {
        match self {
            err @ BuildError::StepFailed { .. } => err,
            other => BuildError::StepFailed {
                step: step.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Name of the step this error is attributed to, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            BuildError::StepFailed { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_step_displays_name() {
        let err = BuildError::InvalidStep {
            name: "bogus".into(),
        };
        assert_eq!(err.to_string(), "invalid step: bogus");
    }

    #[test]
    fn circular_step_displays_cycle() {
        let err = BuildError::CircularStep {
            cycle: "a -> b -> a".into(),
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn command_failed_displays_command_and_code() {
        let err = BuildError::CommandFailed {
            command: "npm install".into(),
            code: Some(1),
        };
        let msg = err.to_string();
        assert!(msg.contains("npm install"));
        assert!(msg.contains("1"));
    }

    #[test]
    fn in_step_wraps_once() {
        let err = BuildError::CommandFailed {
            command: "docker build .".into(),
            code: Some(2),
        }
        .in_step("image:app")
        .in_step("product:app");

        assert_eq!(err.step(), Some("image:app"));
        let msg = err.to_string();
        assert!(msg.contains("image:app"));
        assert!(msg.contains("docker build ."));
        assert!(!msg.contains("product:app"));
    }

    #[test]
    fn step_is_none_for_unattributed_errors() {
        assert!(BuildError::ChainNotStarted.step().is_none());
    }

    #[test]
    fn config_not_found_displays_path() {
        let err = BuildError::ConfigNotFound {
            path: PathBuf::from("/foo/phovea_product.json"),
        };
        assert!(err.to_string().contains("/foo/phovea_product.json"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: BuildError = io_err.into();
        assert!(matches!(err, BuildError::Io(_)));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(BuildError::ConfigValidationError {
                message: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
