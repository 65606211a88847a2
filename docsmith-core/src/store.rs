//! Project store: one YAML record plus versioned README blobs per project.
//!
//! # Storage layout
//!
//! ```text
//! ~/.docsmith/
//!   projects/
//!     <project>/
//!       project.yaml        (record: mode 0600, the commit point)
//!       readmes/
//!         r0000.md          (accepted README per revision, immutable)
//!         r0001.md
//! ```
//!
//! # Commit protocol
//!
//! [`ProjectStore::commit`] writes the README blob for the new revision first
//! and `project.yaml` last, each through a `.tmp` sibling + `rename`. Until the
//! record rename lands, readers keep seeing the previous revision; a blob left
//! behind by an interrupted commit is simply overwritten by the next one.
//!
//! # API pattern
//!
//! Path helpers come in two forms, as everywhere in docsmith:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{io_err, StoreError};
use crate::types::{Project, ProjectName};

/// Persistence boundary for projects.
///
/// Implementations must make [`commit`](ProjectStore::commit) all-or-nothing:
/// after an error, [`load`](ProjectStore::load) returns the previous state.
pub trait ProjectStore: Send + Sync {
    /// Load the committed state of a project, README included.
    fn load(&self, name: &ProjectName) -> Result<Option<Project>, StoreError>;

    /// Atomically replace the committed state of a project.
    ///
    /// `project.revision` must be exactly one past the stored revision, or `0`
    /// when nothing is stored yet.
    fn commit(&self, project: &Project) -> Result<(), StoreError>;

    /// All committed projects, sorted by name.
    fn list(&self) -> Result<Vec<Project>, StoreError>;

    /// README text accepted at a given revision, if any.
    fn load_revision(
        &self,
        name: &ProjectName,
        revision: u32,
    ) -> Result<Option<String>, StoreError>;
}

fn check_successor(
    stored: Option<&Project>,
    project: &Project,
) -> Result<(), StoreError> {
    let expected = stored.map(|p| p.revision + 1).unwrap_or(0);
    if project.revision != expected {
        return Err(StoreError::StaleCommit {
            project: project.name.clone(),
            stored: stored.map(|p| p.revision),
            attempted: project.revision,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.docsmith/`
pub fn docsmith_root(home: &Path) -> PathBuf {
    home.join(".docsmith")
}

/// `<home>/.docsmith/projects/`
pub fn projects_root(home: &Path) -> PathBuf {
    docsmith_root(home).join("projects")
}

/// `<home>/.docsmith/projects/<project>/`: pure, no I/O.
pub fn project_dir_at(home: &Path, project: &ProjectName) -> PathBuf {
    projects_root(home).join(&project.0)
}

/// `<home>/.docsmith/projects/<project>/project.yaml`: pure, no I/O.
pub fn record_path_at(home: &Path, project: &ProjectName) -> PathBuf {
    project_dir_at(home, project).join("project.yaml")
}

/// `<home>/.docsmith/projects/<project>/readmes/r<revision>.md`: pure, no I/O.
pub fn readme_path_at(home: &Path, project: &ProjectName, revision: u32) -> PathBuf {
    project_dir_at(home, project)
        .join("readmes")
        .join(format!("r{revision:04}.md"))
}

/// Resolve the current user's home directory.
pub fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// 2. Filesystem store
// ---------------------------------------------------------------------------

/// [`ProjectStore`] rooted at `<home>/.docsmith/projects/`.
#[derive(Debug, Clone)]
pub struct FsProjectStore {
    home: PathBuf,
}

impl FsProjectStore {
    /// Store rooted at an explicit home directory.
    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Store rooted at the current user's home directory.
    pub fn open() -> Result<Self, StoreError> {
        Ok(Self::at(home()?))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    fn load_record(&self, name: &ProjectName) -> Result<Option<Project>, StoreError> {
        let path = record_path_at(&self.home, name);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&path, err)),
        };
        let project: Project = serde_yaml::from_str(&contents)
            .map_err(|e| StoreError::Parse { path, source: e })?;
        Ok(Some(project))
    }
}

impl ProjectStore for FsProjectStore {
    fn load(&self, name: &ProjectName) -> Result<Option<Project>, StoreError> {
        let Some(mut project) = self.load_record(name)? else {
            return Ok(None);
        };
        let path = readme_path_at(&self.home, name, project.revision);
        project.readme = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::MissingReadme {
                    project: name.clone(),
                    revision: project.revision,
                    path,
                });
            }
            Err(err) => return Err(io_err(&path, err)),
        };
        Ok(Some(project))
    }

    fn commit(&self, project: &Project) -> Result<(), StoreError> {
        let stored = self.load_record(&project.name)?;
        check_successor(stored.as_ref(), project)?;

        let dir = project_dir_at(&self.home, &project.name);
        ensure_dir(&dir)?;
        let readme_path = readme_path_at(&self.home, &project.name, project.revision);
        if let Some(parent) = readme_path.parent() {
            ensure_dir(parent)?;
        }
        write_atomic(&readme_path, project.readme.as_bytes())?;

        // The record rename is the commit point.
        let yaml = serde_yaml::to_string(project)?;
        write_atomic(&record_path_at(&self.home, &project.name), yaml.as_bytes())?;

        tracing::debug!(
            project = %project.name,
            revision = project.revision,
            "committed project record",
        );
        Ok(())
    }

    fn list(&self) -> Result<Vec<Project>, StoreError> {
        let root = projects_root(&self.home);
        if !root.exists() {
            return Ok(vec![]);
        }
        let mut entries: Vec<_> = std::fs::read_dir(&root)
            .map_err(|e| io_err(&root, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .collect();
        entries.sort_by_key(|e| e.file_name());

        let mut projects = Vec::new();
        for entry in entries {
            let name = ProjectName::from(entry.file_name().to_string_lossy().into_owned());
            // Directories without a committed record are leftovers of an
            // interrupted first scaffold.
            if let Some(project) = self.load(&name)? {
                projects.push(project);
            }
        }
        Ok(projects)
    }

    fn load_revision(
        &self,
        name: &ProjectName,
        revision: u32,
    ) -> Result<Option<String>, StoreError> {
        let Some(record) = self.load_record(name)? else {
            return Ok(None);
        };
        if revision > record.revision {
            return Ok(None);
        }
        let path = readme_path_at(&self.home, name, revision);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(&path, err)),
        }
    }
}

// ---------------------------------------------------------------------------
// 3. In-memory store
// ---------------------------------------------------------------------------

/// Process-local [`ProjectStore`]; used for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    projects: HashMap<ProjectName, Project>,
    readmes: HashMap<(ProjectName, u32), String>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn load(&self, name: &ProjectName) -> Result<Option<Project>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.projects.get(name).cloned())
    }

    fn commit(&self, project: &Project) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        check_successor(inner.projects.get(&project.name), project)?;
        inner.readmes.insert(
            (project.name.clone(), project.revision),
            project.readme.clone(),
        );
        inner.projects.insert(project.name.clone(), project.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Project>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut projects: Vec<Project> = inner.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    fn load_revision(
        &self,
        name: &ProjectName,
        revision: u32,
    ) -> Result<Option<String>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.readmes.get(&(name.clone(), revision)).cloned())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Write `bytes` to `<path>.tmp`, chmod 0600, then rename over `path`.
///
/// `.tmp` is always a sibling of the target (same filesystem, no EXDEV).
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let Some(file_name) = path.file_name() else {
        return Err(io_err(path, std::io::Error::other("path has no file name")));
    };
    let tmp = path.with_file_name(format!("{}.tmp", file_name.to_string_lossy()));
    std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, err));
    }
    Ok(())
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        set_dir_permissions(dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
