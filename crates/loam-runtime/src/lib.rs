//! Platform adapters for loam components.
//!
//! This crate implements the execution layer: the `ComponentAdapter` trait
//! with one implementation per `PlatformContext` variant (a Kubernetes
//! cluster driven through `kubectl`, a local container engine driven through
//! `docker`), the factory that selects between them, source packing and
//! digests for sync, log display, and prerequisite checks.

pub mod adapter;
pub mod cluster;
pub mod component;
pub mod local_engine;
pub mod log;
pub mod mock;
pub mod platform;
pub mod prereq;
pub mod process;
pub mod sync;

pub use adapter::{
    component_labels, AdapterFactory, ClusterAdapter, ComponentAdapter, LocalEngineAdapter,
    PlatformAdapterFactory, PushParameters, APPLICATION_LABEL, COMPONENT_LABEL,
};
pub use log::display_log;
pub use mock::{AdapterCall, MockAdapter, MockBehavior, MockFactory};
pub use platform::{select_platform, ComponentIdentity, PlatformContext};
pub use prereq::{check_prereqs, format_missing, MissingPrereq};
pub use process::LogStream;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to set up the {platform} adapter: {reason}")]
    AdapterConstruction { platform: String, reason: String },
    #[error(transparent)]
    Resolve(#[from] loam_schema::ResolveError),
    #[error("runtime execution failed: {0}")]
    ExecFailed(String),
    #[error("'{command}' exited with status {}{}", exit_code(.code), stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("command '{command}' failed: {source}")]
    CommandExecution {
        command: String,
        #[source]
        source: Box<RuntimeError>,
    },
    #[error("component '{0}' not found in devfile")]
    ComponentNotFound(String),
    #[error(transparent)]
    Store(#[from] loam_store::StoreError),
}

fn exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_owned(), |c| c.to_string())
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Serializes tests that point platform binaries at missing programs.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
