//! Tera prompt template registry: [`TemplateId`] and [`TemplateEngine`].
//!
//! | Template   | Required slots                          | Purpose                    |
//! |------------|-----------------------------------------|----------------------------|
//! | `scaffold` | `task_name`, `task_brief`, `checklist`  | first README of a project  |
//! | `update`   | `existing_readme`, `revision_brief`     | README after a revision    |
//!
//! A third, non-prompt template renders the `LICENSE` file for export.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tera::Tera;

use crate::context::PromptContext;
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const SCAFFOLD_TPL: &str = "scaffold.md.tera";
const UPDATE_TPL: &str = "update.md.tera";
const LICENSE_TPL: &str = "license.tera";

const TPLS: &[(&str, &str)] = &[
    (SCAFFOLD_TPL, include_str!("templates/scaffold.md.tera")),
    (UPDATE_TPL, include_str!("templates/update.md.tera")),
    (LICENSE_TPL, include_str!("templates/license.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut templates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

fn normalize_newlines(text: String) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n")
    } else {
        text
    }
}

/// `<home>/.docsmith/templates/`: user overrides of the embedded templates.
pub fn user_template_dir_at(home: &Path) -> PathBuf {
    docsmith_core::store::docsmith_root(home).join("templates")
}

// ---------------------------------------------------------------------------
// TemplateId
// ---------------------------------------------------------------------------

/// The two prompt templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateId {
    Scaffold,
    Update,
}

impl TemplateId {
    pub fn all() -> &'static [TemplateId] {
        &[TemplateId::Scaffold, TemplateId::Update]
    }

    pub fn required_slots(&self) -> &'static [&'static str] {
        match self {
            TemplateId::Scaffold => &["task_name", "task_brief", "checklist"],
            TemplateId::Update => &["existing_readme", "revision_brief"],
        }
    }

    fn template_name(&self) -> &'static str {
        match self {
            TemplateId::Scaffold => SCAFFOLD_TPL,
            TemplateId::Update => UPDATE_TPL,
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateId::Scaffold => write!(f, "scaffold"),
            TemplateId::Update => write!(f, "update"),
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based prompt registry with optional user overrides.
///
/// `user_template_dir` may contain `scaffold.md.tera`, `update.md.tera` or
/// `license.tera`, each replacing the embedded default of the same name.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Embedded templates only.
    pub fn embedded() -> Result<Self, RenderError> {
        Self::new(None)
    }

    /// Render the prompt for `template`.
    ///
    /// Fails with [`RenderError::MissingSlot`] before touching Tera if any
    /// required slot is absent.
    pub fn render(&self, template: TemplateId, ctx: &PromptContext) -> Result<String, RenderError> {
        if let Some(slot) = template
            .required_slots()
            .iter()
            .find(|slot| !ctx.has_slot(slot))
        {
            return Err(RenderError::MissingSlot { template, slot });
        }
        let tera_ctx = ctx.to_tera_context()?;
        let text = self.tera.render(template.template_name(), &tera_ctx)?;
        Ok(normalize_newlines(text))
    }

    /// Render the `LICENSE` file for the current year.
    pub fn render_license(&self, author: &str) -> Result<String, RenderError> {
        self.render_license_for_year(author, Utc::now().year())
    }

    pub fn render_license_for_year(&self, author: &str, year: i32) -> Result<String, RenderError> {
        let mut ctx = tera::Context::new();
        ctx.insert("author", author);
        ctx.insert("year", &year);
        let text = self.tera.render(LICENSE_TPL, &ctx)?;
        Ok(normalize_newlines(text))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
