//! docsmith core library: domain types, project store, configuration, errors.
//!
//! - [`types`]: newtypes, [`Project`] and inbound requests
//! - [`error`]: [`StoreError`], [`ConfigError`], [`RequestError`]
//! - [`store`]: [`ProjectStore`] trait with filesystem and in-memory backends
//! - [`config`]: `config.yaml` load / save

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{ChecklistPolicy, Config};
pub use error::{ConfigError, RequestError, StoreError};
pub use store::{FsProjectStore, MemoryProjectStore, ProjectStore};
pub use types::{
    Project, ProjectName, ProjectState, RevisionBrief, RevisionRequest, ScaffoldRequest,
};
