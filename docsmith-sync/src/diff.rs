//! Unified diffs between README revisions, for `docsmith diff` and conflict
//! reports.

use similar::TextDiff;

use docsmith_core::{ProjectName, ProjectStore};

use crate::SyncError;

/// Diff between two stored revisions of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionDiff {
    pub project: ProjectName,
    pub from: u32,
    pub to: u32,
    pub unified_diff: String,
}

impl RevisionDiff {
    pub fn is_empty(&self) -> bool {
        self.unified_diff.is_empty()
    }
}

/// Unified diff of `old` → `new` with three lines of context. Empty when the
/// texts are equal after line-ending normalization.
pub fn unified_diff(old: &str, new: &str, old_header: &str, new_header: &str) -> String {
    let old = normalize_line_endings(old);
    let new = normalize_line_endings(new);
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header(old_header, new_header)
        .context_radius(3)
        .to_string()
}

/// Diff the README accepted at revision `from` against revision `to`.
pub fn diff_revisions(
    store: &dyn ProjectStore,
    project: &ProjectName,
    from: u32,
    to: u32,
) -> Result<RevisionDiff, SyncError> {
    let load = |revision: u32| -> Result<String, SyncError> {
        store
            .load_revision(project, revision)?
            .ok_or_else(|| SyncError::RevisionNotFound {
                project: project.clone(),
                revision,
            })
    };
    if store.load(project)?.is_none() {
        return Err(SyncError::ProjectNotFound { project: project.clone() });
    }
    let old = load(from)?;
    let new = load(to)?;
    Ok(RevisionDiff {
        project: project.clone(),
        from,
        to,
        unified_diff: unified_diff(
            &old,
            &new,
            &format!("a/README.md@r{from}"),
            &format!("b/README.md@r{to}"),
        ),
    })
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}
