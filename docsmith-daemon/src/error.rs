use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::FailureKind;

/// Error surface for the daemon runtime and its socket client.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] docsmith_core::ConfigError),

    #[error("store error: {0}")]
    Store(#[from] docsmith_core::StoreError),

    #[error("template error: {0}")]
    Render(#[from] docsmith_renderer::RenderError),

    #[error("generation backend error: {0}")]
    Generate(#[from] docsmith_sync::GenerateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("daemon protocol error: {0}")]
    Protocol(String),

    /// The daemon answered, but refused or failed the request.
    #[error("{message} ({kind})")]
    Remote { kind: FailureKind, message: String },

    #[error("daemon is not running (socket missing: {socket})")]
    DaemonNotRunning { socket: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
