//! # docsmith-sync
//!
//! README synchronization: the document model and reconciler, the retrying
//! generation client with its HTTP backend, the per-project revision
//! orchestrator, revision diffs and export to the deployment sink.
//!
//! Call [`RevisionOrchestrator::scaffold`] to create a project's first README
//! and [`RevisionOrchestrator::revise`] to update it for a revision brief.

pub mod chat;
pub mod diff;
pub mod error;
pub mod generation;
pub mod locks;
pub mod orchestrator;
pub mod readme;
pub mod reconciler;
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;
pub mod writer;

pub use chat::ChatBackend;
pub use diff::{diff_revisions, RevisionDiff};
pub use error::{GenerateError, GenerationUnavailable, InvalidState, OrchestratorError, SyncError};
pub use generation::{GenerationClient, GenerationRequest, RetryPolicy, TextGenerator};
pub use locks::ProjectLocks;
pub use orchestrator::{ConflictReport, OrchestratorSettings, RevisionOrchestrator};
pub use readme::{ReadmeDocument, SectionKind};
pub use reconciler::{reconcile, ReconcileMode, Rejection};
#[cfg(any(test, feature = "test-support"))]
pub use scripted::{ScriptedGenerator, ScriptedReply};
pub use writer::{commit_message, export_project, ExportResult, WriteResult};
