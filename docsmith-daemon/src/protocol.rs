use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use docsmith_core::{ProjectName, RevisionRequest, ScaffoldRequest};

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;

/// JSON newline-delimited request.
///
/// `cmd` selects the operation; the other fields are read only by the
/// commands that need them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl DaemonRequest {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Self::default()
        }
    }

    pub fn scaffold(request: &ScaffoldRequest) -> Self {
        Self {
            task: Some(request.task.clone()),
            brief: Some(request.brief.clone()),
            checklist: Some(request.checklist.clone()),
            ..Self::new("scaffold")
        }
    }

    pub fn revise(request: &RevisionRequest) -> Self {
        Self {
            project: Some(request.project.0.clone()),
            brief: Some(request.brief.clone()),
            checklist: request.checklist.clone(),
            ..Self::new("revise")
        }
    }

    pub fn show(project: &ProjectName) -> Self {
        Self {
            project: Some(project.0.clone()),
            ..Self::new("show")
        }
    }

    pub fn with_secret(mut self, secret: Option<String>) -> Self {
        self.secret = secret;
        self
    }
}

/// Failure classification carried on error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed request or a project in the wrong state. Do not retry as-is.
    BadRequest,
    Unauthorized,
    /// Generation backend gave up; retry later.
    Unavailable,
    /// The candidate README was rejected; `data` holds the conflict report.
    Conflict,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::BadRequest => "bad_request",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Unavailable => "unavailable",
            FailureKind::Conflict => "conflict",
            FailureKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// JSON newline-delimited response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

impl DaemonResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn error(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
            kind: Some(kind),
        }
    }

    /// Attach a payload to an error response.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Send one JSON request to the daemon socket and return one response.
pub fn send_request(home: &Path, request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    let socket = socket_path(home);
    if !socket.exists() {
        return Err(DaemonError::DaemonNotRunning { socket });
    }

    let mut stream = UnixStream::connect(&socket).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
        ) {
            DaemonError::DaemonNotRunning {
                socket: socket.clone(),
            }
        } else {
            io_err(&socket, err)
        }
    })?;

    let payload = serde_json::to_string(request)?;
    stream
        .write_all(payload.as_bytes())
        .map_err(|e| io_err(&socket, e))?;
    stream.write_all(b"\n").map_err(|e| io_err(&socket, e))?;
    stream.flush().map_err(|e| io_err(&socket, e))?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| io_err(&socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(
            "daemon closed connection before responding".to_string(),
        ));
    }

    let response: DaemonResponse = serde_json::from_str(line.trim_end())?;
    Ok(response)
}

/// Ask for daemon status, tolerating a socket that is still coming up.
pub fn request_status(home: &Path) -> Result<Value, DaemonError> {
    let request = DaemonRequest::new("status");

    let mut last_not_running: Option<DaemonError> = None;
    for attempt in 0..5 {
        match send_request(home, &request) {
            Ok(response) => return response_into_data(response),
            Err(err @ DaemonError::DaemonNotRunning { .. }) => {
                last_not_running = Some(err);
                if attempt < 4 {
                    sleep(Duration::from_millis(100));
                    continue;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_not_running.unwrap_or_else(|| {
        DaemonError::Protocol("daemon status retry loop exited unexpectedly".to_string())
    }))
}

pub fn request_stop(home: &Path, secret: Option<String>) -> Result<(), DaemonError> {
    let response = send_request(home, &DaemonRequest::new("stop").with_secret(secret))?;
    response_into_data(response).map(|_| ())
}

pub fn request_scaffold(
    home: &Path,
    request: &ScaffoldRequest,
    secret: Option<String>,
) -> Result<Value, DaemonError> {
    let response = send_request(home, &DaemonRequest::scaffold(request).with_secret(secret))?;
    response_into_data(response)
}

pub fn request_revise(
    home: &Path,
    request: &RevisionRequest,
    secret: Option<String>,
) -> Result<Value, DaemonError> {
    let response = send_request(home, &DaemonRequest::revise(request).with_secret(secret))?;
    response_into_data(response)
}

pub fn request_show(home: &Path, project: &ProjectName) -> Result<Value, DaemonError> {
    let response = send_request(home, &DaemonRequest::show(project))?;
    response_into_data(response)
}

fn response_into_data(response: DaemonResponse) -> Result<Value, DaemonError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(DaemonError::Remote {
            kind: response.kind.unwrap_or(FailureKind::Internal),
            message: response
                .error
                .unwrap_or_else(|| "unknown daemon error".to_string()),
        })
    }
}
