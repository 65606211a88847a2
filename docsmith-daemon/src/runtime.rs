use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use docsmith_core::config::{self, Config};
use docsmith_core::store::{docsmith_root, projects_root};
use docsmith_core::{
    FsProjectStore, Project, ProjectName, ProjectStore, RevisionRequest, ScaffoldRequest,
};
use docsmith_renderer::{user_template_dir_at, TemplateEngine};
use docsmith_sync::{
    ChatBackend, GenerationClient, OrchestratorError, OrchestratorSettings, RetryPolicy,
    RevisionOrchestrator,
};

use crate::error::{io_err, DaemonError};
use crate::paths::{socket_path, LOG_FORMAT_ENV};
use crate::protocol::{DaemonRequest, DaemonResponse, FailureKind};

/// Shared by every connection the daemon serves.
pub struct DaemonState {
    home: PathBuf,
    orchestrator: Arc<RevisionOrchestrator>,
    secret_digest: Option<[u8; 32]>,
    started_at_unix: u64,
}

impl DaemonState {
    /// `secret`, when set, must accompany every mutating request.
    pub fn new(home: PathBuf, orchestrator: Arc<RevisionOrchestrator>, secret: Option<&str>) -> Self {
        Self {
            home,
            orchestrator,
            secret_digest: secret.map(secret_digest),
            started_at_unix: unix_seconds_now(),
        }
    }

    pub fn orchestrator(&self) -> &RevisionOrchestrator {
        &self.orchestrator
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Wire the production orchestrator: filesystem store, user templates over the
/// embedded set, and the HTTP chat backend.
pub fn build_orchestrator(home: &Path, config: &Config) -> Result<RevisionOrchestrator, DaemonError> {
    let store: Arc<dyn ProjectStore> = Arc::new(FsProjectStore::at(home));
    let engine = TemplateEngine::new(Some(&user_template_dir_at(home)))?;
    let backend = ChatBackend::from_config(&config.generation)?;
    let client = GenerationClient::new(
        Arc::new(backend),
        RetryPolicy::from_config(&config.generation),
    );
    Ok(RevisionOrchestrator::new(
        store,
        Arc::new(engine),
        client,
        OrchestratorSettings::from_config(config),
    ))
}

/// Run the daemon runtime.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let config = config::load_at(&home)?;
    let orchestrator = Arc::new(build_orchestrator(&home, &config)?);
    let secret = config.daemon.shared_secret();
    if secret.is_none() {
        tracing::warn!("no shared secret configured; mutating requests are unauthenticated");
    }
    let state = Arc::new(DaemonState::new(home, orchestrator, secret.as_deref()));

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let result = serve(state, shutdown.clone()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (socket_result, signal_result) = tokio::join!(socket_handle, signal_handle);
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("daemon stopped");
    Ok(())
}

/// Accept connections on `<home>/.docsmith/daemon.sock` until shutdown.
///
/// Each connection gets its own task, so a slow generation on one project
/// never holds up requests for another.
pub async fn serve(
    state: Arc<DaemonState>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let mut shutdown_rx = shutdown_tx.subscribe();
    let root = docsmith_root(&state.home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }

    let socket = socket_path(&state.home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "daemon listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let state = Arc::clone(&state);
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, state, shutdown_tx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    state: Arc<DaemonState>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(
                        FailureKind::BadRequest,
                        format!("invalid request JSON: {err}"),
                    ),
                )
                .await?;
                continue;
            }
        };

        let stopping = request.cmd == "stop";
        let response = dispatch(&state, request, &shutdown_tx).await;
        write_response(&mut writer, &response).await?;
        if stopping && response.ok {
            break;
        }
    }

    Ok(())
}

/// Execute one request against the shared orchestrator.
pub async fn dispatch(
    state: &DaemonState,
    request: DaemonRequest,
    shutdown_tx: &broadcast::Sender<()>,
) -> DaemonResponse {
    let mutating = matches!(request.cmd.as_str(), "scaffold" | "revise" | "stop");
    if mutating {
        if let Some(expected) = &state.secret_digest {
            if !validate_secret(expected, request.secret.as_deref()) {
                tracing::warn!(cmd = %request.cmd, "rejected request with bad shared secret");
                return DaemonResponse::error(FailureKind::Unauthorized, "invalid shared secret");
            }
        }
    }

    match request.cmd.as_str() {
        "status" => status(state).await,
        "scaffold" => {
            let (Some(task), Some(brief)) = (request.task, request.brief) else {
                return missing_field("scaffold", "task and brief");
            };
            let scaffold = ScaffoldRequest {
                task,
                brief,
                checklist: request.checklist.unwrap_or_default(),
            };
            match state.orchestrator.scaffold(scaffold).await {
                Ok(project) => DaemonResponse::ok(project_payload(&project)),
                Err(err) => failure_response(&err),
            }
        }
        "revise" => {
            let (Some(project), Some(brief)) = (request.project, request.brief) else {
                return missing_field("revise", "project and brief");
            };
            let revision = RevisionRequest {
                project: ProjectName::from(project),
                brief,
                checklist: request.checklist,
            };
            match state.orchestrator.revise(revision).await {
                Ok(project) => DaemonResponse::ok(project_payload(&project)),
                Err(err) => failure_response(&err),
            }
        }
        "show" => {
            let Some(project) = request.project else {
                return missing_field("show", "project");
            };
            let name = match ProjectName::parse(&project) {
                Ok(name) => name,
                Err(err) => return DaemonResponse::error(FailureKind::BadRequest, err.to_string()),
            };
            match state.orchestrator.project(&name).await {
                Ok(Some(project)) => DaemonResponse::ok(project_payload(&project)),
                Ok(None) => DaemonResponse::error(
                    FailureKind::BadRequest,
                    format!("project {name} not found"),
                ),
                Err(err) => failure_response(&err),
            }
        }
        "stop" => {
            let _ = shutdown_tx.send(());
            DaemonResponse::ok(json!({ "stopping": true }))
        }
        other => DaemonResponse::error(FailureKind::BadRequest, format!("unknown command '{other}'")),
    }
}

async fn status(state: &DaemonState) -> DaemonResponse {
    let projects = match state.orchestrator.projects().await {
        Ok(projects) => projects,
        Err(err) => return failure_response(&err),
    };
    let projects: Vec<Value> = projects
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "state": p.state().to_string(),
                "revision": p.revision,
                "updated_at": p.updated_at,
            })
        })
        .collect();

    DaemonResponse::ok(json!({
        "running": true,
        "started_at_unix": state.started_at_unix,
        "authenticated": state.secret_digest.is_some(),
        "projects": projects,
        "socket": socket_path(&state.home).display().to_string(),
        "projects_root": projects_root(&state.home).display().to_string(),
    }))
}

fn project_payload(project: &Project) -> Value {
    json!({
        "name": project.name,
        "task": project.task,
        "state": project.state().to_string(),
        "revision": project.revision,
        "checklist": project.checklist,
        "revisions": project.revisions,
        "readme": project.readme,
        "created_at": project.created_at,
        "updated_at": project.updated_at,
    })
}

fn missing_field(cmd: &str, fields: &str) -> DaemonResponse {
    DaemonResponse::error(FailureKind::BadRequest, format!("{cmd} requires {fields}"))
}

fn failure_kind(err: &OrchestratorError) -> FailureKind {
    match err {
        OrchestratorError::Request(_)
        | OrchestratorError::NotScaffolded { .. }
        | OrchestratorError::AlreadyScaffolded { .. } => FailureKind::BadRequest,
        OrchestratorError::GenerationUnavailable { .. } => FailureKind::Unavailable,
        OrchestratorError::SectionDrift(_) | OrchestratorError::Rejected(_) => FailureKind::Conflict,
        OrchestratorError::Render(_) | OrchestratorError::Store(_) | OrchestratorError::Join(_) => {
            FailureKind::Internal
        }
    }
}

/// Conflicts carry the full report so the caller can show both versions.
fn failure_response(err: &OrchestratorError) -> DaemonResponse {
    let response = DaemonResponse::error(failure_kind(err), err.to_string());
    match err.conflict().map(serde_json::to_value) {
        Some(Ok(report)) => response.with_data(report),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "could not serialize conflict report");
            response
        }
        None => response,
    }
}

fn secret_digest(secret: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(secret.as_bytes()));
    out
}

/// Compare digests so the comparison time does not depend on the secret.
fn validate_secret(expected: &[u8; 32], provided: Option<&str>) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    let provided = secret_digest(provided);
    expected
        .iter()
        .zip(provided.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let _ = if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init()
    };
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use docsmith_core::MemoryProjectStore;
    use docsmith_sync::{GenerateError, ScriptedGenerator, ScriptedReply};
    use tempfile::TempDir;

    const README: &str = "# Color Picker\n\nPick colours.\n\n\
        ## Overview\n\nA picker.\n\n## Features\n\n- Hex input\n\n\
        ## Live Demo\n\nhttps://example.github.io/colorpicker/\n\n\
        ## Setup & Installation\n\nOpen index.html.\n\n## Usage\n\nPick.\n\n\
        ## Technical Details\n\nJS.\n\n## Code Structure\n\n- index.html\n\n\
        ## Development\n\nEdit.\n\n## License\n\nMIT License\n\n## Author\n\nAda\n";

    fn state(replies: Vec<ScriptedReply>, secret: Option<&str>) -> DaemonState {
        let orchestrator = RevisionOrchestrator::new(
            Arc::new(MemoryProjectStore::new()),
            Arc::new(TemplateEngine::embedded().unwrap()),
            GenerationClient::new(
                Arc::new(ScriptedGenerator::new(replies)),
                RetryPolicy {
                    max_attempts: 2,
                    attempt_timeout: Duration::from_secs(5),
                    backoff: Duration::from_millis(1),
                },
            ),
            OrchestratorSettings::default(),
        );
        DaemonState::new(PathBuf::from("/nonexistent"), Arc::new(orchestrator), secret)
    }

    fn scaffold_request(secret: Option<&str>) -> DaemonRequest {
        DaemonRequest::scaffold(&ScaffoldRequest {
            task: "ColorPicker".into(),
            brief: "A colour picker with hex input".into(),
            checklist: vec!["must support hex input".into()],
        })
        .with_secret(secret.map(str::to_string))
    }

    #[test]
    fn secret_comparison() {
        let expected = secret_digest("s3cret");
        assert!(validate_secret(&expected, Some("s3cret")));
        assert!(!validate_secret(&expected, Some("s3cre")));
        assert!(!validate_secret(&expected, None));
    }

    #[tokio::test]
    async fn scaffold_then_show() {
        let state = state(vec![ScriptedReply::Text(README.into())], None);
        let (tx, _) = broadcast::channel(1);

        let response = dispatch(&state, scaffold_request(None), &tx).await;
        assert!(response.ok, "{response:?}");
        let data = response.data.unwrap();
        assert_eq!(data["name"], "colorpicker");
        assert_eq!(data["state"], "scaffolded");

        let response = dispatch(&state, DaemonRequest::show(&ProjectName::from("colorpicker")), &tx).await;
        assert!(response.ok);
        assert!(response.data.unwrap()["readme"]
            .as_str()
            .unwrap()
            .contains("## Features"));
    }

    #[tokio::test]
    async fn mutating_request_without_secret_is_unauthorized() {
        let state = state(vec![ScriptedReply::Text(README.into())], Some("s3cret"));
        let (tx, _) = broadcast::channel(1);

        let response = dispatch(&state, scaffold_request(None), &tx).await;
        assert_eq!(response.kind, Some(FailureKind::Unauthorized));

        let response = dispatch(&state, scaffold_request(Some("s3cret")), &tx).await;
        assert!(response.ok, "{response:?}");
    }

    #[tokio::test]
    async fn status_does_not_need_secret() {
        let state = state(vec![], Some("s3cret"));
        let (tx, _) = broadcast::channel(1);
        let response = dispatch(&state, DaemonRequest::new("status"), &tx).await;
        assert!(response.ok);
        assert_eq!(response.data.unwrap()["projects"], json!([]));
    }

    #[tokio::test]
    async fn revise_of_unknown_project_is_bad_request() {
        let state = state(vec![], None);
        let (tx, _) = broadcast::channel(1);
        let request = DaemonRequest::revise(&RevisionRequest {
            project: ProjectName::from("ghost"),
            brief: "add dark mode toggle".into(),
            checklist: None,
        });
        let response = dispatch(&state, request, &tx).await;
        assert_eq!(response.kind, Some(FailureKind::BadRequest));
    }

    #[tokio::test]
    async fn path_like_project_names_are_bad_requests() {
        let state = state(vec![], None);
        let (tx, _) = broadcast::channel(1);

        let response = dispatch(&state, DaemonRequest::show(&ProjectName::from("../../../outside")), &tx).await;
        assert_eq!(response.kind, Some(FailureKind::BadRequest));
        assert!(response.error.unwrap().contains("not a valid project name"));

        let request = DaemonRequest::revise(&RevisionRequest {
            project: ProjectName::from("../../../outside"),
            brief: "add dark mode toggle".into(),
            checklist: None,
        });
        let response = dispatch(&state, request, &tx).await;
        assert_eq!(response.kind, Some(FailureKind::BadRequest));
        assert!(response.error.unwrap().contains("not a valid project name"));
    }

    #[tokio::test]
    async fn exhausted_backend_is_unavailable() {
        let fail = ScriptedReply::Fail(GenerateError::Transport {
            message: "connection reset".into(),
        });
        let state = state(vec![fail.clone(), fail], None);
        let (tx, _) = broadcast::channel(1);
        let response = dispatch(&state, scaffold_request(None), &tx).await;
        assert_eq!(response.kind, Some(FailureKind::Unavailable));
    }

    #[tokio::test]
    async fn missing_fields_and_unknown_commands() {
        let state = state(vec![], None);
        let (tx, _) = broadcast::channel(1);
        let response = dispatch(&state, DaemonRequest::new("scaffold"), &tx).await;
        assert_eq!(response.kind, Some(FailureKind::BadRequest));
        let response = dispatch(&state, DaemonRequest::new("sync"), &tx).await;
        assert_eq!(response.error.as_deref(), Some("unknown command 'sync'"));
    }

    #[tokio::test]
    async fn stop_signals_shutdown() {
        let state = state(vec![], None);
        let (tx, mut rx) = broadcast::channel(1);
        let response = dispatch(&state, DaemonRequest::new("stop"), &tx).await;
        assert!(response.ok);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn stale_socket_is_removed() {
        let tmp = TempDir::new().unwrap();
        let socket = tmp.path().join("daemon.sock");
        fs::write(&socket, "").unwrap();
        prepare_socket_for_bind(&socket).unwrap();
        assert!(!socket.exists());
    }
}
