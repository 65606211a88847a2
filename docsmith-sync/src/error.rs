//! Error types for docsmith-sync.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use docsmith_core::{ProjectName, RequestError, StoreError};
use docsmith_renderer::RenderError;

use crate::orchestrator::ConflictReport;

/// One failed call to a text-generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("attempt timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("transport error: {message}")]
    Transport { message: String },

    /// Credentials were refused. Never retried.
    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {message}")]
    Malformed { message: String },

    #[error("API key variable {var} is not set")]
    MissingApiKey { var: String },
}

impl GenerateError {
    /// Whether reissuing the same prompt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerateError::Timeout { .. }
            | GenerateError::Transport { .. }
            | GenerateError::Malformed { .. } => true,
            GenerateError::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            GenerateError::Auth { .. } | GenerateError::MissingApiKey { .. } => false,
        }
    }
}

/// The generation client gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("generation unavailable after {attempts} attempt(s): {last}")]
pub struct GenerationUnavailable {
    pub attempts: u32,
    pub last: GenerateError,
}

/// Why a project is not in a state that accepts the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidState {
    NotScaffolded,
    AlreadyScaffolded,
}

/// Errors surfaced by [`RevisionOrchestrator`](crate::RevisionOrchestrator).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),

    #[error("project {project} is not scaffolded")]
    NotScaffolded { project: ProjectName },

    #[error("project {project} is already scaffolded")]
    AlreadyScaffolded { project: ProjectName },

    /// Retry later; the project is unchanged.
    #[error("{project}: {source}")]
    GenerationUnavailable {
        project: ProjectName,
        #[source]
        source: GenerationUnavailable,
    },

    /// A protected section kept changing; both versions are attached.
    #[error("{}", .0.summary())]
    SectionDrift(Box<ConflictReport>),

    /// The candidate kept failing structural validation.
    #[error("{}", .0.summary())]
    Rejected(Box<ConflictReport>),

    /// Template/context mismatch. A bug, never a runtime condition.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("background task failed: {0}")]
    Join(String),
}

impl OrchestratorError {
    /// The invalid-state classification, if this is one.
    pub fn invalid_state(&self) -> Option<InvalidState> {
        match self {
            OrchestratorError::NotScaffolded { .. } => Some(InvalidState::NotScaffolded),
            OrchestratorError::AlreadyScaffolded { .. } => Some(InvalidState::AlreadyScaffolded),
            _ => None,
        }
    }

    pub fn conflict(&self) -> Option<&ConflictReport> {
        match self {
            OrchestratorError::SectionDrift(report) | OrchestratorError::Rejected(report) => {
                Some(report)
            }
            _ => None,
        }
    }
}

/// Errors from export and revision diffing.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("project {project} not found")]
    ProjectNotFound { project: ProjectName },

    #[error("project {project} has no revision {revision}")]
    RevisionNotFound { project: ProjectName, revision: u32 },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
