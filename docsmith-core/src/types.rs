//! Domain types for docsmith projects.
//!
//! A [`Project`] is the persisted state of one generated application's
//! documentation: identity, task metadata, the accepted README, and the
//! revision history that produced it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Maximum length of a project slug.
pub const MAX_PROJECT_NAME_LEN: usize = 100;

/// Minimum length of a task or revision brief.
pub const MIN_BRIEF_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Project identity: the sanitized slug of a task name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectName(pub String);

impl ProjectName {
    /// Derive a project identity from a free-form task name.
    ///
    /// Lowercases, maps every character outside `[a-z0-9-]` to `-`, collapses
    /// runs of `-`, trims leading/trailing `-` and truncates to
    /// [`MAX_PROJECT_NAME_LEN`]. Returns `None` when nothing usable remains.
    pub fn from_task(task: &str) -> Option<Self> {
        let mut slug = String::with_capacity(task.len());
        for c in task.to_lowercase().chars() {
            let c = if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' };
            if c == '-' && slug.ends_with('-') {
                continue;
            }
            slug.push(c);
        }
        let mut slug = slug.trim_matches('-').to_string();
        slug.truncate(MAX_PROJECT_NAME_LEN);
        let slug = slug.trim_end_matches('-').to_string();
        if slug.is_empty() {
            None
        } else {
            Some(Self(slug))
        }
    }

    /// Accept an existing project identity only if it is already a slug.
    /// Anything `from_task` would rewrite (path separators, dots, uppercase)
    /// is refused, so a name can never address a path outside the store.
    pub fn parse(name: &str) -> Result<Self, RequestError> {
        match Self::from_task(name) {
            Some(slug) if slug.0 == name => Ok(slug),
            _ => Err(RequestError::InvalidProject {
                project: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Observable lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectState {
    /// No accepted README yet.
    Empty,
    /// Scaffold accepted, revision 0.
    Scaffolded,
    /// `n` revisions accepted on top of the scaffold.
    Revised(u32),
}

impl ProjectState {
    pub fn of(project: Option<&Project>) -> Self {
        match project {
            None => ProjectState::Empty,
            Some(p) if p.revision == 0 => ProjectState::Scaffolded,
            Some(p) => ProjectState::Revised(p.revision),
        }
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectState::Empty => write!(f, "empty"),
            ProjectState::Scaffolded => write!(f, "scaffolded"),
            ProjectState::Revised(n) => write!(f, "revised({n})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A revision brief accepted into a project's history. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionBrief {
    /// The revision number this brief produced.
    pub revision: u32,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
}

/// A documented project.
///
/// The README text is not part of the YAML record; stores keep it as a
/// separate blob per revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: ProjectName,
    /// Task name as originally submitted.
    pub task: String,
    pub brief: String,
    /// Evaluation checklist currently in force.
    #[serde(default)]
    pub checklist: Vec<String>,
    /// Checklist the project was scaffolded against.
    #[serde(default)]
    pub original_checklist: Vec<String>,
    pub revision: u32,
    #[serde(default)]
    pub revisions: Vec<RevisionBrief>,
    #[serde(skip)]
    pub readme: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Build the revision-0 project from a validated scaffold request and the
    /// accepted README.
    pub fn scaffolded(request: &ScaffoldRequest, name: ProjectName, readme: String) -> Self {
        let now = Utc::now();
        Project {
            name,
            task: request.task.clone(),
            brief: request.brief.clone(),
            checklist: request.checklist.clone(),
            original_checklist: request.checklist.clone(),
            revision: 0,
            revisions: vec![],
            readme,
            created_at: now,
            updated_at: now,
        }
    }

    /// Return the successor of `self` after accepting `brief` with `readme`.
    ///
    /// `self` is left untouched so callers can discard the successor if
    /// persisting it fails.
    pub fn revised(&self, brief: &str, checklist: Option<&[String]>, readme: String) -> Self {
        let now = Utc::now();
        let revision = self.revision + 1;
        let mut next = self.clone();
        next.revision = revision;
        next.revisions.push(RevisionBrief {
            revision,
            text: brief.to_string(),
            submitted_at: now,
        });
        if let Some(checklist) = checklist {
            next.checklist = checklist.to_vec();
        }
        next.readme = readme;
        next.updated_at = now;
        next
    }

    pub fn state(&self) -> ProjectState {
        ProjectState::of(Some(self))
    }
}

// ---------------------------------------------------------------------------
// Inbound requests
// ---------------------------------------------------------------------------

/// Inbound request to create a project and generate its first README.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldRequest {
    pub task: String,
    pub brief: String,
    pub checklist: Vec<String>,
}

impl ScaffoldRequest {
    /// Validate and return the project identity this request targets.
    pub fn validate(&self) -> Result<ProjectName, RequestError> {
        let name = ProjectName::from_task(&self.task).ok_or_else(|| RequestError::InvalidTask {
            task: self.task.clone(),
        })?;
        check_brief(&self.brief)?;
        check_checklist(&self.checklist)?;
        Ok(name)
    }
}

/// Inbound request to revise an existing project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRequest {
    pub project: ProjectName,
    pub brief: String,
    /// Replacement checklist; `None` keeps the current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<String>>,
}

impl RevisionRequest {
    pub fn validate(&self) -> Result<(), RequestError> {
        ProjectName::parse(&self.project.0)?;
        check_brief(&self.brief)?;
        if let Some(checklist) = &self.checklist {
            check_checklist(checklist)?;
        }
        Ok(())
    }
}

fn check_brief(brief: &str) -> Result<(), RequestError> {
    let len = brief.trim().chars().count();
    if len < MIN_BRIEF_LEN {
        return Err(RequestError::BriefTooShort {
            len,
            min: MIN_BRIEF_LEN,
        });
    }
    Ok(())
}

fn check_checklist(checklist: &[String]) -> Result<(), RequestError> {
    if checklist.is_empty() {
        return Err(RequestError::EmptyChecklist);
    }
    if let Some(index) = checklist.iter().position(|c| c.trim().is_empty()) {
        return Err(RequestError::BlankCriterion { index });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
