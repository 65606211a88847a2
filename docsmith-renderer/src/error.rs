//! Error types for docsmith-renderer.

use std::path::PathBuf;

use thiserror::Error;

use docsmith_core::ProjectName;

use crate::engine::TemplateId;

/// All errors that can arise from prompt assembly and rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A required slot was absent from the context. Always a programmer error.
    #[error("template `{template}` requires slot `{slot}`, which is missing")]
    MissingSlot {
        template: TemplateId,
        slot: &'static str,
    },

    /// An update context was requested for a project with no README.
    #[error("project {project} has no README to update")]
    NoReadme { project: ProjectName },

    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}
