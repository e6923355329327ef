//! The verb orchestrator.
//!
//! Every verb follows the same path: parse and validate the devfile, work
//! out the platform context, build an adapter through the factory, invoke
//! it, and finalize. The verbs differ in where command resolution happens
//! and in how failures leave the invocation:
//!
//! - push only normalizes command names and lets the adapter resolve them;
//!   its failures go through the [`FailureReporter`];
//! - log resolves its command before any adapter exists; adapter failures
//!   are fatal and go through the reporter as well;
//! - delete, exec and test propagate failures unchanged.
//!
//! Delete and exec always target the cluster.

use crate::ignore::merge_ignores;
use crate::report::FailureReporter;
use crate::run_mode::RunModeTracker;
use crate::urls::warn_if_urls_invalid;
use crate::CoreError;
use loam_runtime::{
    component_labels, display_log, select_platform, AdapterFactory, ComponentAdapter,
    ComponentIdentity, PlatformContext, PushParameters,
};
use loam_schema::{
    parse_and_validate, resolve_command, validate_devfile_data, CommandKind, Devfile,
};
use loam_store::EnvSpecificInfo;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parse a devfile and run the independent validation pass over it.
pub fn load_devfile(path: &Path) -> Result<Devfile, CoreError> {
    let devfile = parse_and_validate(path)?;
    validate_devfile_data(&devfile)?;
    Ok(devfile)
}

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub devfile_path: PathBuf,
    /// Directory whose contents are synced; made absolute before use.
    pub source_path: PathBuf,
    pub namespace: String,
    pub ignores: Vec<String>,
    pub force_build: bool,
    pub debug: bool,
    pub show: bool,
    pub build_command: String,
    pub run_command: String,
    pub debug_command: String,
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub devfile_path: PathBuf,
    pub context: PathBuf,
    pub namespace: String,
    pub follow: bool,
    pub debug: bool,
    /// Lines kept when not following; `None` shows everything.
    pub max_lines: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub devfile_path: PathBuf,
    pub context: PathBuf,
    pub namespace: String,
    pub show: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub devfile_path: PathBuf,
    pub context: PathBuf,
    pub namespace: String,
    /// Passed to the adapter verbatim.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    pub context: PathBuf,
    pub namespace: String,
    /// Empty selects the default test command.
    pub test_command: String,
    pub show: bool,
}

/// Drives the lifecycle verbs for one invocation.
pub struct Lifecycle<F, R> {
    factory: F,
    reporter: R,
    push_target_is_local_engine: bool,
}

impl<F: AdapterFactory, R: FailureReporter> Lifecycle<F, R> {
    /// `push_target_is_local_engine` is the global push target, read once by the caller.
    pub fn new(factory: F, reporter: R, push_target_is_local_engine: bool) -> Self {
        Self {
            factory,
            reporter,
            push_target_is_local_engine,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    fn adapter(
        &self,
        env: &dyn EnvSpecificInfo,
        context: &Path,
        devfile: &Devfile,
        platform: &PlatformContext,
    ) -> Result<Box<dyn ComponentAdapter>, CoreError> {
        let identity =
            ComponentIdentity::new(&env.get_name(), &env.get_application(), context);
        debug!(
            "constructing {} adapter for {}",
            platform.name(),
            identity.name
        );
        self.factory
            .new_adapter(&identity, devfile, platform)
            .map_err(CoreError::AdapterConstruction)
    }

    /// Create or update the component and run its build and run (or debug) commands.
    ///
    /// On success the run mode is persisted; a storage failure at that point
    /// is returned to the caller.
    pub fn push(&self, opts: &PushOptions, env: &dyn EnvSpecificInfo) -> Result<(), CoreError> {
        if let Err(e) = self.push_inner(opts, env) {
            return self.reporter.push_failed(e);
        }
        RunModeTracker::new(env).record(opts.debug)?;
        Ok(())
    }

    fn push_inner(&self, opts: &PushOptions, env: &dyn EnvSpecificInfo) -> Result<(), CoreError> {
        let devfile = load_devfile(&opts.devfile_path)?;
        let source_path = std::path::absolute(&opts.source_path)?;
        let ignores = merge_ignores(&opts.ignores, &devfile.metadata.ignore, &source_path)?;

        let platform = select_platform(self.push_target_is_local_engine, &opts.namespace);
        let urls = env.list_urls()?;
        warn_if_urls_invalid(&urls, platform.is_local_engine());
        let adapter = self.adapter(env, &source_path, &devfile, &platform)?;

        let params = PushParameters {
            path: source_path,
            ignored_files: ignores,
            force_build: opts.force_build,
            show: opts.show,
            env_specific_info: env.snapshot(),
            devfile_build_cmd: normalize_command_name(&devfile, CommandKind::Build, &opts.build_command),
            devfile_run_cmd: normalize_command_name(&devfile, CommandKind::Run, &opts.run_command),
            devfile_debug_cmd: normalize_command_name(&devfile, CommandKind::Debug, &opts.debug_command),
            debug: opts.debug,
            debug_port: env.get_debug_port(),
        };

        info!("Pushing devfile component {}", env.get_name());
        adapter
            .push(&params)
            .map_err(|source| CoreError::AdapterExecution {
                action: "start",
                component: env.get_name(),
                source,
            })?;
        info!("Changes successfully pushed to component {}", env.get_name());
        Ok(())
    }

    /// Stream the output of the component's run (or debug) command to `out`.
    pub fn log(
        &self,
        opts: &LogOptions,
        env: &dyn EnvSpecificInfo,
        out: impl Write,
    ) -> Result<(), CoreError> {
        let devfile = load_devfile(&opts.devfile_path)?;
        let kind = if opts.debug {
            CommandKind::Debug
        } else {
            CommandKind::Run
        };
        let command = resolve_command(&devfile.commands, kind, "")?;

        let platform = select_platform(self.push_target_is_local_engine, &opts.namespace);
        let adapter = self.adapter(env, &opts.context, &devfile, &platform)?;
        let stream = match adapter.log(opts.follow, command) {
            Ok(stream) => stream,
            Err(source) => {
                return self.reporter.log_failed(CoreError::AdapterExecution {
                    action: "log",
                    component: env.get_name(),
                    source,
                })
            }
        };
        // The platform may only report failure once its stream has ended.
        if let Err(source) = display_log(opts.follow, stream, out, &env.get_name(), opts.max_lines)
        {
            return self.reporter.log_failed(CoreError::AdapterExecution {
                action: "log",
                component: env.get_name(),
                source,
            });
        }
        Ok(())
    }

    /// Remove every platform resource labelled with the component name.
    pub fn delete(&self, opts: &DeleteOptions, env: &dyn EnvSpecificInfo) -> Result<(), CoreError> {
        let devfile = load_devfile(&opts.devfile_path)?;
        let platform = PlatformContext::Cluster {
            namespace: opts.namespace.clone(),
        };
        let adapter = self.adapter(env, &opts.context, &devfile, &platform)?;
        adapter.delete(&component_labels(&env.get_name()), opts.show)?;
        Ok(())
    }

    /// Run an argument vector in the component without consulting its commands.
    pub fn exec(&self, opts: &ExecOptions, env: &dyn EnvSpecificInfo) -> Result<(), CoreError> {
        let devfile = load_devfile(&opts.devfile_path)?;
        let platform = PlatformContext::Cluster {
            namespace: opts.namespace.clone(),
        };
        let adapter = self.adapter(env, &opts.context, &devfile, &platform)?;
        adapter.exec(&opts.command)?;
        Ok(())
    }

    /// Run a test command against an already parsed devfile.
    pub fn test(
        &self,
        devfile: &Devfile,
        opts: &TestOptions,
        env: &dyn EnvSpecificInfo,
    ) -> Result<(), CoreError> {
        let platform = select_platform(self.push_target_is_local_engine, &opts.namespace);
        let adapter = self.adapter(env, &opts.context, devfile, &platform)?;
        adapter.test(&opts.test_command, opts.show)?;
        Ok(())
    }
}

/// Lower-case an explicit command name, or name the devfile's marked default.
///
/// Never fails: a name that does not resolve is left for the adapter to
/// reject, and an empty result asks the adapter for its own default.
fn normalize_command_name(devfile: &Devfile, kind: CommandKind, explicit: &str) -> String {
    if !explicit.is_empty() {
        return explicit.to_lowercase();
    }
    let mut defaults = devfile.commands_of_kind(kind).filter(|c| c.default);
    match (defaults.next(), defaults.next()) {
        (Some(only), None) => only.id.normalized(),
        _ => String::new(),
    }
}
