//! Project store error-message, commit-protocol and listing tests.
//! Layout: ~/.docsmith/projects/<project>/{project.yaml,readmes/rNNNN.md}

use assert_fs::prelude::*;
use docsmith_core::{
    store::{self, FsProjectStore, ProjectStore},
    Project, ProjectName, ScaffoldRequest, StoreError,
};
use predicates::prelude::predicate;
use rstest::rstest;
use std::fs;

fn request(task: &str) -> ScaffoldRequest {
    ScaffoldRequest {
        task: task.to_string(),
        brief: "A small single-page utility".to_string(),
        checklist: vec!["must load without errors".to_string()],
    }
}

fn scaffold(store: &FsProjectStore, task: &str, readme: &str) -> Project {
    let req = request(task);
    let name = req.validate().expect("valid request");
    let project = Project::scaffolded(&req, name, readme.to_string());
    store.commit(&project).expect("commit");
    project
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_record_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".docsmith/projects/colorpicker/project.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let store = FsProjectStore::at(home.path());
    let err = store.load(&ProjectName::from("colorpicker")).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("project.yaml"), "got: {err}");
}

#[test]
fn record_without_readme_blob_is_reported() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = FsProjectStore::at(home.path());
    let project = scaffold(&store, "ColorPicker", "# ColorPicker\n");
    fs::remove_file(store::readme_path_at(home.path(), &project.name, 0)).expect("rm");

    let err = store.load(&project.name).unwrap_err();
    assert!(matches!(err, StoreError::MissingReadme { revision: 0, .. }), "got: {err}");
    assert!(err.to_string().contains("r0000.md"));
}

// ---------------------------------------------------------------------------
// 2. Commit protocol
// ---------------------------------------------------------------------------

#[test]
fn every_revision_keeps_its_own_readme() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = FsProjectStore::at(home.path());
    let r0 = scaffold(&store, "ColorPicker", "# v0\n");
    let r1 = r0.revised("add dark mode toggle", None, "# v1\n".into());
    store.commit(&r1).expect("commit r1");
    let r2 = r1.revised("add palette export", None, "# v2\n".into());
    store.commit(&r2).expect("commit r2");

    home.child(".docsmith/projects/colorpicker/readmes/r0000.md")
        .assert(predicate::str::contains("# v0"));
    home.child(".docsmith/projects/colorpicker/readmes/r0002.md")
        .assert(predicate::str::contains("# v2"));
    home.child(".docsmith/projects/colorpicker/project.yaml")
        .assert(predicate::str::contains("revision: 2"))
        .assert(predicate::str::contains("add palette export"));

    assert_eq!(store.load_revision(&r0.name, 1).unwrap().as_deref(), Some("# v1\n"));
    assert!(store.load_revision(&r0.name, 3).unwrap().is_none());
}

#[test]
fn stale_commit_leaves_state_untouched() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = FsProjectStore::at(home.path());
    let r0 = scaffold(&store, "ColorPicker", "# v0\n");
    let r1 = r0.revised("add dark mode toggle", None, "# v1\n".into());
    store.commit(&r1).expect("commit r1");

    // A second writer that started from r0 loses.
    let racing = r0.revised("add palette export", None, "# racing\n".into());
    let err = store.commit(&racing).unwrap_err();
    assert!(matches!(err, StoreError::StaleCommit { stored: Some(1), attempted: 1, .. }));

    let loaded = store.load(&r0.name).unwrap().unwrap();
    assert_eq!(loaded.readme, "# v1\n");
    assert_eq!(loaded.revisions.len(), 1);
}

#[test]
fn first_commit_must_be_revision_zero() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = FsProjectStore::at(home.path());
    let req = request("ColorPicker");
    let mut project = Project::scaffolded(&req, req.validate().unwrap(), "# x\n".into());
    project.revision = 1;
    assert!(matches!(
        store.commit(&project),
        Err(StoreError::StaleCommit { stored: None, attempted: 1, .. })
    ));
    home.child(".docsmith/projects/colorpicker/project.yaml")
        .assert(predicate::path::missing());
}

// ---------------------------------------------------------------------------
// 3. Listing
// ---------------------------------------------------------------------------

#[test]
fn list_is_sorted_and_skips_uncommitted_dirs() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = FsProjectStore::at(home.path());
    scaffold(&store, "Weather Widget", "# w\n");
    scaffold(&store, "ColorPicker", "# c\n");
    home.child(".docsmith/projects/half-done/readmes/r0000.md")
        .write_str("# orphan\n")
        .expect("write");

    let names: Vec<String> = store
        .list()
        .expect("list")
        .into_iter()
        .map(|p| p.name.0)
        .collect();
    assert_eq!(names, vec!["colorpicker", "weather-widget"]);
}

#[test]
fn list_on_fresh_home_is_empty() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    assert!(FsProjectStore::at(home.path()).list().unwrap().is_empty());
}

#[rstest]
#[case("ColorPicker", "colorpicker")]
#[case("Captcha Solver", "captcha-solver")]
#[case("  markdown--to--html  ", "markdown-to-html")]
fn record_lives_under_slug(#[case] task: &str, #[case] slug: &str) {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = FsProjectStore::at(home.path());
    scaffold(&store, task, "# x\n");
    home.child(format!(".docsmith/projects/{slug}/project.yaml"))
        .assert(predicate::path::exists());
}
