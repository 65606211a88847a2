//! # docsmith-renderer
//!
//! Tera-based prompt template registry and the context assembler that feeds
//! it from persisted project state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docsmith_core::Project;
//! use docsmith_renderer::{build_context, TemplateEngine};
//!
//! fn update_prompt(project: &Project) -> Option<String> {
//!     let engine = TemplateEngine::embedded().ok()?;
//!     let ctx = build_context(project, Some("add dark mode toggle")).ok()?;
//!     engine.render(ctx.template(), &ctx).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{build_context, PromptContext};
pub use engine::{user_template_dir_at, TemplateEngine, TemplateId};
pub use error::RenderError;
