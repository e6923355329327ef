use crate::cluster::KubectlClient;
use crate::component::DevfileAdapter;
use crate::local_engine::DockerClient;
use crate::platform::{ComponentIdentity, PlatformContext};
use crate::process::LogStream;
use crate::RuntimeError;
use loam_schema::{Command, Devfile};
use loam_store::EnvInfo;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Label key every platform resource of a component carries.
pub const COMPONENT_LABEL: &str = "component";
/// Label key carrying the application a component belongs to.
pub const APPLICATION_LABEL: &str = "app";

/// Everything an adapter needs for one push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushParameters {
    pub path: PathBuf,
    pub ignored_files: Vec<String>,
    pub force_build: bool,
    pub show: bool,
    pub env_specific_info: EnvInfo,
    /// Lower-cased command names; empty means "use the default of that kind".
    pub devfile_build_cmd: String,
    pub devfile_run_cmd: String,
    pub devfile_debug_cmd: String,
    pub debug: bool,
    pub debug_port: u16,
}

/// Platform-specific implementation of the five lifecycle verbs.
pub trait ComponentAdapter {
    /// Create or update the component and run its build and run (or debug) commands.
    fn push(&self, params: &PushParameters) -> Result<(), RuntimeError>;

    /// Open the output of the container running `command`.
    fn log(&self, follow: bool, command: &Command) -> Result<LogStream, RuntimeError>;

    fn delete(&self, labels: &BTreeMap<String, String>, show: bool) -> Result<(), RuntimeError>;

    /// Run an argument vector verbatim in the component's source container.
    fn exec(&self, command: &[String]) -> Result<(), RuntimeError>;

    /// Run a test command; an empty name selects the default test command.
    fn test(&self, command_name: &str, show: bool) -> Result<(), RuntimeError>;
}

/// Adapter for a Kubernetes namespace.
pub type ClusterAdapter = DevfileAdapter<KubectlClient>;
/// Adapter for the local container engine.
pub type LocalEngineAdapter = DevfileAdapter<DockerClient>;

/// Builds the adapter for an invocation.
pub trait AdapterFactory {
    fn new_adapter(
        &self,
        identity: &ComponentIdentity,
        devfile: &Devfile,
        platform: &PlatformContext,
    ) -> Result<Box<dyn ComponentAdapter>, RuntimeError>;
}

/// Factory mapping each [`PlatformContext`] variant to its adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformAdapterFactory;

impl AdapterFactory for PlatformAdapterFactory {
    fn new_adapter(
        &self,
        identity: &ComponentIdentity,
        devfile: &Devfile,
        platform: &PlatformContext,
    ) -> Result<Box<dyn ComponentAdapter>, RuntimeError> {
        match platform {
            PlatformContext::Cluster { namespace } => Ok(Box::new(ClusterAdapter::new(
                identity.clone(),
                devfile.clone(),
                KubectlClient::connect(namespace)?,
            ))),
            PlatformContext::LocalEngine => Ok(Box::new(LocalEngineAdapter::new(
                identity.clone(),
                devfile.clone(),
                DockerClient::connect()?,
            ))),
        }
    }
}

/// Labels selecting every resource that belongs to `component`.
pub fn component_labels(component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(COMPONENT_LABEL.to_owned(), component.to_owned())])
}
