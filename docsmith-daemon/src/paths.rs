use std::path::{Path, PathBuf};

use docsmith_core::store::docsmith_root;

pub const DAEMON_SOCKET: &str = "daemon.sock";

/// Env var selecting the log format; `json` switches to JSON lines.
pub const LOG_FORMAT_ENV: &str = "DOCSMITH_LOG_FORMAT";

pub fn socket_path(home: &Path) -> PathBuf {
    docsmith_root(home).join(DAEMON_SOCKET)
}
