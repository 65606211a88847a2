//! Export to the deployment sink: `README.md` + `LICENSE` in a target directory.
//!
//! ## `atomic_write` protocol
//!
//! 1. Normalize line endings to LF.
//! 2. SHA-256 the content and the current file, if any.
//! 3. Skip when the digests match.
//! 4. Write to `<path>.docsmith.tmp`, then rename over the target.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use docsmith_core::{Project, ProjectName, ProjectStore};
use docsmith_renderer::TemplateEngine;

use crate::error::{io_err, SyncError};

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File already holds exactly this content.
    Unchanged { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }
}

/// Outcome of exporting one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub project: ProjectName,
    pub revision: u32,
    /// Commit message for the deployment that carries these files.
    pub commit_message: String,
    pub writes: Vec<WriteResult>,
}

/// Commit message for the deployment of `project` at its current revision.
///
/// Rounds count deployments, so revision 1 is round 2.
pub fn commit_message(project: &Project) -> String {
    if project.revision == 0 {
        format!("Initial deployment for {}", project.task)
    } else {
        format!(
            "Revision update for {} (Round {})",
            project.task,
            project.revision + 1
        )
    }
}

fn sha256_hex(content: &str) -> String {
    let mut h = Sha256::new();
    h.update(content.as_bytes());
    hex::encode(h.finalize())
}

/// Atomically write `content` to `path` unless it already holds it.
pub fn atomic_write(path: &Path, content: &str, dry_run: bool) -> Result<WriteResult, SyncError> {
    let normalized = content.replace("\r\n", "\n");
    let digest = sha256_hex(&normalized);

    match std::fs::read_to_string(path) {
        Ok(existing) if sha256_hex(&existing.replace("\r\n", "\n")) == digest => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged { path: path.to_path_buf() });
        }
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite { path: path.to_path_buf() });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.docsmith.tmp", path.display()));
    std::fs::write(&tmp, &normalized).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written { path: path.to_path_buf() })
}

/// Hand the committed state of `name` to the deployment sink at `dest`.
///
/// Only committed state is ever exported; an in-flight transition is invisible
/// here until its commit lands.
pub fn export_project(
    store: &dyn ProjectStore,
    engine: &TemplateEngine,
    name: &ProjectName,
    dest: &Path,
    author: &str,
    dry_run: bool,
) -> Result<ExportResult, SyncError> {
    let project = store
        .load(name)?
        .ok_or_else(|| SyncError::ProjectNotFound { project: name.clone() })?;

    let license = engine.render_license(author)?;
    let writes = vec![
        atomic_write(&dest.join("README.md"), &project.readme, dry_run)?,
        atomic_write(&dest.join("LICENSE"), &license, dry_run)?,
    ];

    let commit_message = commit_message(&project);
    tracing::info!(project = %name, revision = project.revision, "exported: {commit_message}");
    Ok(ExportResult {
        project: name.clone(),
        revision: project.revision,
        commit_message,
        writes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsmith_core::{MemoryProjectStore, ScaffoldRequest};
    use tempfile::TempDir;

    fn store_with_project() -> (MemoryProjectStore, ProjectName) {
        let store = MemoryProjectStore::new();
        let request = ScaffoldRequest {
            task: "ColorPicker".into(),
            brief: "A colour picker with hex input".into(),
            checklist: vec!["must support hex input".into()],
        };
        let name = request.validate().unwrap();
        store
            .commit(&Project::scaffolded(&request, name.clone(), "# ColorPicker\n".into()))
            .unwrap();
        (store, name)
    }

    #[test]
    fn first_write_then_unchanged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("README.md");
        assert!(matches!(atomic_write(&path, "hello", false).unwrap(), WriteResult::Written { .. }));
        assert!(matches!(atomic_write(&path, "hello", false).unwrap(), WriteResult::Unchanged { .. }));
        assert!(matches!(atomic_write(&path, "hello!", false).unwrap(), WriteResult::Written { .. }));
    }

    #[test]
    fn crlf_and_lf_content_are_equivalent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("README.md");
        atomic_write(&path, "a\r\nb\r\n", false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
        assert!(matches!(atomic_write(&path, "a\nb\n", false).unwrap(), WriteResult::Unchanged { .. }));
    }

    #[test]
    fn dry_run_does_not_write_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.md");
        assert!(matches!(atomic_write(&path, "x", true).unwrap(), WriteResult::WouldWrite { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("README.md");
        atomic_write(&path, "data", false).unwrap();
        assert!(!tmp.path().join("README.md.docsmith.tmp").exists());
    }

    #[test]
    fn commit_messages_count_rounds() {
        let (store, name) = store_with_project();
        let r0 = store.load(&name).unwrap().unwrap();
        assert_eq!(commit_message(&r0), "Initial deployment for ColorPicker");
        let r1 = r0.revised("add dark mode toggle", None, "# v1\n".into());
        assert_eq!(commit_message(&r1), "Revision update for ColorPicker (Round 2)");
    }

    #[test]
    fn export_writes_readme_and_license() {
        let (store, name) = store_with_project();
        let dest = TempDir::new().unwrap();
        let engine = TemplateEngine::embedded().unwrap();
        let result = export_project(&store, &engine, &name, dest.path(), "Ada Lovelace", false).unwrap();
        assert_eq!(result.commit_message, "Initial deployment for ColorPicker");
        assert_eq!(result.writes.len(), 2);
        assert_eq!(std::fs::read_to_string(dest.path().join("README.md")).unwrap(), "# ColorPicker\n");
        let license = std::fs::read_to_string(dest.path().join("LICENSE")).unwrap();
        assert!(license.contains("Ada Lovelace"));
    }

    #[test]
    fn export_of_unknown_project_fails() {
        let store = MemoryProjectStore::new();
        let dest = TempDir::new().unwrap();
        let engine = TemplateEngine::embedded().unwrap();
        let err = export_project(&store, &engine, &ProjectName::from("ghost"), dest.path(), "x", false)
            .unwrap_err();
        assert!(matches!(err, SyncError::ProjectNotFound { .. }));
        assert!(std::fs::read_dir(dest.path()).unwrap().next().is_none());
    }
}
