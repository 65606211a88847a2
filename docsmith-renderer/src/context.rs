//! Prompt context: the immutable variable snapshot for one generation attempt.

use serde::{Deserialize, Serialize};

use docsmith_core::{Project, ScaffoldRequest};

use crate::engine::TemplateId;
use crate::error::RenderError;

/// Variables available to the prompt templates.
///
/// Every slot is optional at the type level; [`TemplateId::required_slots`]
/// decides which ones a given template cannot do without.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptContext {
    pub task_name: Option<String>,
    pub task_brief: Option<String>,
    pub checklist: Option<Vec<String>>,
    pub existing_readme: Option<String>,
    pub revision_brief: Option<String>,
    /// Author credited in the README, from config.
    pub author: Option<String>,
    /// License name stated in the README, from config.
    pub license: Option<String>,
}

impl PromptContext {
    /// Context for a project that has no README yet.
    pub fn scaffold(task: &str, brief: &str, checklist: &[String]) -> Self {
        PromptContext {
            task_name: Some(task.to_string()),
            task_brief: Some(brief.to_string()),
            checklist: Some(checklist.to_vec()),
            ..Default::default()
        }
    }

    /// Scaffold context taken straight from an inbound request.
    pub fn from_request(request: &ScaffoldRequest) -> Self {
        Self::scaffold(&request.task, &request.brief, &request.checklist)
    }

    /// Attach the config-derived optional slots.
    pub fn with_attribution(mut self, author: Option<&str>, license: Option<&str>) -> Self {
        self.author = author.filter(|s| !s.is_empty()).map(str::to_string);
        self.license = license.filter(|s| !s.is_empty()).map(str::to_string);
        self
    }

    /// The template this context is meant for.
    pub fn template(&self) -> TemplateId {
        if self.revision_brief.is_some() {
            TemplateId::Update
        } else {
            TemplateId::Scaffold
        }
    }

    /// Whether `slot` holds a usable value.
    pub fn has_slot(&self, slot: &str) -> bool {
        let present = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        match slot {
            "task_name" => present(&self.task_name),
            "task_brief" => present(&self.task_brief),
            "checklist" => self.checklist.as_ref().is_some_and(|c| !c.is_empty()),
            "existing_readme" => present(&self.existing_readme),
            "revision_brief" => present(&self.revision_brief),
            "author" => present(&self.author),
            "license" => present(&self.license),
            _ => false,
        }
    }

    /// Task name with `-`/`_` turned into spaces and each word capitalized.
    pub fn task_title(&self) -> Option<String> {
        self.task_name.as_deref().map(title_case)
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        let slots = Slots {
            task_name: self.task_name.as_deref(),
            task_title: self.task_title(),
            task_brief: self.task_brief.as_deref(),
            checks_text: self.checklist.as_deref().map(checks_text),
            checklist: self.checklist.as_deref(),
            existing_readme: self.existing_readme.as_deref(),
            revision_brief: self.revision_brief.as_deref(),
            author: self.author.as_deref(),
            license: self.license.as_deref().unwrap_or("MIT"),
        };
        tera::Context::from_serialize(slots).map_err(RenderError::from)
    }
}

/// Assemble the context for the next generation against `project`.
///
/// `None` yields a scaffold context from the project's task metadata;
/// `Some(brief)` yields an update context over the current README.
pub fn build_context(
    project: &Project,
    revision_brief: Option<&str>,
) -> Result<PromptContext, RenderError> {
    match revision_brief {
        None => Ok(PromptContext::scaffold(
            &project.task,
            &project.brief,
            &project.checklist,
        )),
        Some(brief) => {
            if project.readme.trim().is_empty() {
                return Err(RenderError::NoReadme {
                    project: project.name.clone(),
                });
            }
            Ok(PromptContext {
                task_name: Some(project.task.clone()),
                existing_readme: Some(project.readme.clone()),
                revision_brief: Some(brief.to_string()),
                ..Default::default()
            })
        }
    }
}

#[derive(Serialize)]
struct Slots<'a> {
    task_name: Option<&'a str>,
    task_title: Option<String>,
    task_brief: Option<&'a str>,
    checks_text: Option<String>,
    checklist: Option<&'a [String]>,
    existing_readme: Option<&'a str>,
    revision_brief: Option<&'a str>,
    author: Option<&'a str>,
    license: &'a str,
}

fn checks_text(checklist: &[String]) -> String {
    checklist
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn title_case(task: &str) -> String {
    task.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsmith_core::ProjectName;

    fn project(readme: &str) -> Project {
        let request = ScaffoldRequest {
            task: "color-picker".into(),
            brief: "A colour picker with hex input".into(),
            checklist: vec!["must support hex input".into(), "must show live preview".into()],
        };
        Project::scaffolded(&request, ProjectName::from("color-picker"), readme.into())
    }

    #[test]
    fn scaffold_context_from_project() {
        let ctx = build_context(&project(""), None).expect("scaffold ctx");
        assert_eq!(ctx.template(), TemplateId::Scaffold);
        assert_eq!(ctx.task_name.as_deref(), Some("color-picker"));
        assert_eq!(ctx.checklist.as_ref().map(Vec::len), Some(2));
        assert!(ctx.existing_readme.is_none());
        assert!(ctx.revision_brief.is_none());
    }

    #[test]
    fn update_context_carries_readme_and_brief() {
        let ctx = build_context(&project("# Color Picker\n"), Some("add dark mode toggle")).unwrap();
        assert_eq!(ctx.template(), TemplateId::Update);
        assert_eq!(ctx.existing_readme.as_deref(), Some("# Color Picker\n"));
        assert_eq!(ctx.revision_brief.as_deref(), Some("add dark mode toggle"));
    }

    #[test]
    fn update_without_readme_is_invalid() {
        let err = build_context(&project("   \n"), Some("add dark mode toggle")).unwrap_err();
        assert!(matches!(err, RenderError::NoReadme { .. }), "got: {err}");
    }

    #[test]
    fn task_title_is_title_cased() {
        let ctx = PromptContext::scaffold("captcha-solver_v2", "brief text here", &[]);
        assert_eq!(ctx.task_title().as_deref(), Some("Captcha Solver V2"));
    }

    #[test]
    fn checks_render_one_per_line() {
        let text = checks_text(&["a".to_string(), "b".to_string()]);
        assert_eq!(text, "- a\n- b");
    }

    #[test]
    fn blank_slots_count_as_missing() {
        let ctx = PromptContext::scaffold("  ", "brief text here", &[]);
        assert!(!ctx.has_slot("task_name"));
        assert!(!ctx.has_slot("checklist"));
        assert!(ctx.has_slot("task_brief"));
    }
}
