use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Execution platform backing one invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "platform", rename_all = "kebab-case")]
pub enum PlatformContext {
    Cluster { namespace: String },
    LocalEngine,
}

impl PlatformContext {
    pub fn name(&self) -> &'static str {
        match self {
            PlatformContext::Cluster { .. } => "cluster",
            PlatformContext::LocalEngine => "local-engine",
        }
    }

    pub fn is_local_engine(&self) -> bool {
        matches!(self, PlatformContext::LocalEngine)
    }
}

/// Pick the platform for this invocation from the global push-target flag.
///
/// Pure: the namespace is only carried into the cluster variant.
pub fn select_platform(push_target_is_local_engine: bool, namespace: &str) -> PlatformContext {
    if push_target_is_local_engine {
        PlatformContext::LocalEngine
    } else {
        PlatformContext::Cluster {
            namespace: namespace.to_owned(),
        }
    }
}

/// Component an invocation targets; never mutated once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentIdentity {
    pub name: String,
    pub application: String,
    pub context: PathBuf,
}

impl ComponentIdentity {
    pub fn new(name: &str, application: &str, context: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_owned(),
            application: application.to_owned(),
            context: context.into(),
        }
    }
}
