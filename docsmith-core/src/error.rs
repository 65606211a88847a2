//! Error types for docsmith-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ProjectName;

/// All errors that can arise from project store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse project record at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A project record points at a README blob that does not exist.
    #[error("README for {project} revision {revision} missing at {path}")]
    MissingReadme {
        project: ProjectName,
        revision: u32,
        path: PathBuf,
    },

    /// A commit did not advance the stored revision by exactly one.
    #[error("stale commit for {project}: stored revision {stored:?}, attempted {attempted}")]
    StaleCommit {
        project: ProjectName,
        stored: Option<u32>,
        attempted: u32,
    },
}

/// Errors loading or saving `config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// Failure in the shared atomic-write path.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Inbound request validation failures. Surfaced to callers as bad requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("task name {task:?} does not yield a usable project name")]
    InvalidTask { task: String },

    #[error("{project:?} is not a valid project name")]
    InvalidProject { project: String },

    #[error("brief is {len} characters; at least {min} required")]
    BriefTooShort { len: usize, min: usize },

    #[error("checklist must contain at least one criterion")]
    EmptyChecklist,

    #[error("checklist criterion #{index} is blank")]
    BlankCriterion { index: usize },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
