//! Long-running docsmith service: a unix-socket JSON-lines front end over a
//! shared [`RevisionOrchestrator`](docsmith_sync::RevisionOrchestrator).

mod error;
pub mod paths;
pub mod protocol;
mod runtime;

pub use error::DaemonError;
pub use protocol::{
    request_revise, request_scaffold, request_show, request_status, request_stop, send_request,
    DaemonRequest, DaemonResponse, FailureKind,
};
pub use runtime::{build_orchestrator, dispatch, run, serve, start_blocking, DaemonState};
