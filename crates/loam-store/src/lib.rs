//! Environment-specific component state for loam.
//!
//! This crate provides the persistence layer: the per-component `EnvInfo`
//! record kept under `<context>/.loam/env/` (name, application, namespace,
//! URLs, debug port, last run mode), the `EnvSpecificInfo` accessor trait the
//! lifecycle core consumes, `ContextLayout` for the on-disk structure, an
//! advisory `EnvLock`, and the user-level `Preferences` holding the global
//! push target.

pub mod env_info;
pub mod layout;
pub mod lock;
pub mod preference;

pub use env_info::{EnvInfo, EnvInfoFile, EnvSpecificInfo, LocalUrl, RunMode, UrlKind};
pub use layout::ContextLayout;
pub use lock::EnvLock;
pub use preference::{Preferences, PushTarget, PUSH_TARGET_ENV};

use std::path::Path;
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to parse preferences: {0}")]
    Preferences(#[from] toml::de::Error),
    #[error("integrity check failed for '{path}': expected {expected}, got {actual}")]
    IntegrityFailure {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("environment info not found at {0} (run 'loam push' from the component directory)")]
    EnvNotFound(String),
    #[error("lock acquisition failed: {0}")]
    LockFailed(String),
    #[error("invalid push target '{0}', expected 'cluster' or 'local-engine'")]
    InvalidPushTarget(String),
}
