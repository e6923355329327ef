//! Lifecycle orchestration for loam components.
//!
//! This crate ties together devfile parsing, environment-specific state and
//! platform adapters into the `Lifecycle` orchestrator, the single entry
//! point for the push, log, delete, exec and test verbs. It also owns the
//! run-mode tracker, the URL consistency check, ignore-rule merging, and the
//! failure reporter that keeps structured output free of free-form errors.

pub mod context;
pub mod ignore;
pub mod lifecycle;
pub mod report;
pub mod run_mode;
pub mod urls;

pub use context::{open_env_info, seed_env_info, DEFAULT_APPLICATION, DEFAULT_NAMESPACE};
pub use ignore::{merge_ignores, ALWAYS_IGNORED};
pub use lifecycle::{
    load_devfile, DeleteOptions, ExecOptions, Lifecycle, LogOptions, PushOptions, TestOptions,
};
pub use report::{
    event_line, timestamp_now, ConsoleEventSink, ConsoleReporter, EventSink, FailureReporter,
};
pub use run_mode::RunModeTracker;
pub use urls::warn_if_urls_invalid;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    ManifestParse(#[from] loam_schema::ManifestError),
    #[error("devfile validation failed: {0}")]
    ManifestValidation(#[from] loam_schema::ValidationError),
    #[error(transparent)]
    Resolve(#[from] loam_schema::ResolveError),
    #[error(transparent)]
    AdapterConstruction(loam_runtime::RuntimeError),
    #[error("Failed to {action} component with name {component}. Error: {source}")]
    AdapterExecution {
        action: &'static str,
        component: String,
        #[source]
        source: loam_runtime::RuntimeError,
    },
    #[error(transparent)]
    Runtime(#[from] loam_runtime::RuntimeError),
    #[error("failed to persist environment state: {0}")]
    Persistence(#[from] loam_store::StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the failure came from reading or validating the devfile.
    pub fn is_manifest_error(&self) -> bool {
        matches!(
            self,
            CoreError::ManifestParse(_) | CoreError::ManifestValidation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_runtime::RuntimeError;

    #[test]
    fn adapter_execution_names_the_component() {
        let err = CoreError::AdapterExecution {
            action: "start",
            component: "nodejs".to_owned(),
            source: RuntimeError::ExecFailed("boom".to_owned()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to start component with name nodejs. Error: runtime execution failed: boom"
        );
    }

    #[test]
    fn construction_error_is_transparent() {
        let err = CoreError::AdapterConstruction(RuntimeError::AdapterConstruction {
            platform: "cluster".to_owned(),
            reason: "no kubectl".to_owned(),
        });
        assert_eq!(err.to_string(), "unable to set up the cluster adapter: no kubectl");
    }

    #[test]
    fn resolve_error_keeps_non_debug_hint() {
        let err = CoreError::from(loam_schema::ResolveError::NoDebugCommand {
            hint: loam_schema::NON_DEBUG_HINT.to_owned(),
        });
        assert!(err.to_string().contains("loam log"));
        assert!(!err.is_manifest_error());
    }
}
