//! Verb logic shared by every platform.
//!
//! `DevfileAdapter` owns the devfile-side decisions (which commands run,
//! in which container, whether sources changed) and delegates the
//! platform mechanics to a [`PlatformClient`].

use crate::adapter::{ComponentAdapter, PushParameters};
use crate::platform::ComponentIdentity;
use crate::process::{shell_quote, LogStream};
use crate::sync::{pack_sources, source_digest};
use crate::RuntimeError;
use loam_schema::{resolve_command, Command, CommandKind, Component, Devfile};
use loam_store::{ContextLayout, RunMode};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::{debug, info, warn};

/// Environment variable exported to debug commands.
pub const DEBUG_PORT_ENV: &str = "DEBUG_PORT";
/// Pid of the long-running run or debug command inside its container.
const RUN_PID_FILE: &str = "/tmp/.loam-run.pid";

/// Platform mechanics a [`DevfileAdapter`] drives.
pub trait PlatformClient {
    fn name(&self) -> &'static str;

    /// Create the component's containers if needed, recreating them when a
    /// requested debug port is not exposed. Returns `true` when created.
    fn ensure_component(
        &self,
        identity: &ComponentIdentity,
        devfile: &Devfile,
        debug_port: Option<u16>,
    ) -> Result<bool, RuntimeError>;

    /// Extract a tar archive into `target_dir` of `container`.
    fn sync(
        &self,
        identity: &ComponentIdentity,
        container: &str,
        target_dir: &str,
        archive: &[u8],
    ) -> Result<(), RuntimeError>;

    /// Run a shell script inside `container`.
    fn exec(
        &self,
        identity: &ComponentIdentity,
        container: &str,
        script: &str,
        show: bool,
    ) -> Result<(), RuntimeError>;

    fn logs(
        &self,
        identity: &ComponentIdentity,
        container: &str,
        follow: bool,
    ) -> Result<LogStream, RuntimeError>;

    /// Remove every resource matching `labels`. Returns `false` when nothing matched.
    fn delete(&self, labels: &BTreeMap<String, String>, show: bool) -> Result<bool, RuntimeError>;
}

pub struct DevfileAdapter<C> {
    identity: ComponentIdentity,
    devfile: Devfile,
    client: C,
}

impl<C: PlatformClient> DevfileAdapter<C> {
    pub fn new(identity: ComponentIdentity, devfile: Devfile, client: C) -> Self {
        Self {
            identity,
            devfile,
            client,
        }
    }

    /// Container that receives project sources.
    fn source_component(&self) -> Result<&Component, RuntimeError> {
        self.devfile
            .components
            .iter()
            .find(|c| c.mount_sources)
            .or_else(|| self.devfile.components.first())
            .ok_or_else(|| RuntimeError::ComponentNotFound(self.identity.name.clone()))
    }

    fn container_for(&self, command: &Command) -> Result<String, RuntimeError> {
        match command.component.as_deref() {
            Some(name) if self.devfile.component(name).is_some() => Ok(name.to_owned()),
            Some(name) => Err(RuntimeError::ComponentNotFound(name.to_owned())),
            None => Ok(self.source_component()?.name.to_string()),
        }
    }

    fn script_for(&self, command: &Command, extra_env: &[(&str, String)], background: bool) -> String {
        let mut script = String::new();
        let workdir = command.working_dir.clone().unwrap_or_else(|| {
            self.devfile
                .component(command.component.as_deref().unwrap_or_default())
                .map_or_else(|| loam_schema::DEFAULT_SOURCE_MAPPING.to_owned(), |c| {
                    c.source_mapping.clone()
                })
        });
        let _ = write!(script, "cd {} && ", shell_quote(&workdir));
        for (key, value) in &command.env {
            let _ = write!(script, "export {key}={}; ", shell_quote(value));
        }
        for (key, value) in extra_env {
            let _ = write!(script, "export {key}={}; ", shell_quote(value));
        }
        let line = command.command_line.as_deref().unwrap_or_default();
        if background {
            // Long-running commands write to the container's main process so
            // that platform log commands pick their output up.
            let _ = write!(
                script,
                "if [ -f {RUN_PID_FILE} ]; then kill $(cat {RUN_PID_FILE}) 2>/dev/null; fi; \
                 nohup sh -c {} > /proc/1/fd/1 2>&1 & echo $! > {RUN_PID_FILE}",
                shell_quote(line)
            );
        } else {
            script.push_str(line);
        }
        script
    }

    fn execute(
        &self,
        command: &Command,
        extra_env: &[(&str, String)],
        background: bool,
        show: bool,
    ) -> Result<(), RuntimeError> {
        for step in self.devfile.flatten(command) {
            let container = self.container_for(step)?;
            let script = self.script_for(step, extra_env, background);
            info!("executing {} command '{}' in {container}", step.kind, step.id);
            self.client
                .exec(&self.identity, &container, &script, show)
                .map_err(|e| RuntimeError::CommandExecution {
                    command: step.id.to_string(),
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    fn resolve_build(&self, name: &str) -> Result<Option<&Command>, RuntimeError> {
        // Build is optional: a devfile without build commands only runs.
        if name.is_empty()
            && self
                .devfile
                .commands_of_kind(CommandKind::Build)
                .next()
                .is_none()
        {
            return Ok(None);
        }
        Ok(Some(resolve_command(
            &self.devfile.commands,
            CommandKind::Build,
            name,
        )?))
    }

    fn sources_changed(&self, layout: &ContextLayout, digest: &str) -> bool {
        std::fs::read_to_string(layout.last_push_file())
            .map(|previous| previous.trim() != digest)
            .unwrap_or(true)
    }
}

impl<C: PlatformClient> ComponentAdapter for DevfileAdapter<C> {
    fn push(&self, params: &PushParameters) -> Result<(), RuntimeError> {
        let build = self.resolve_build(&params.devfile_build_cmd)?;
        let run = if params.debug {
            resolve_command(
                &self.devfile.commands,
                CommandKind::Debug,
                &params.devfile_debug_cmd,
            )?
        } else {
            resolve_command(
                &self.devfile.commands,
                CommandKind::Run,
                &params.devfile_run_cmd,
            )?
        };

        let debug_port = params.debug.then_some(params.debug_port);
        let created = self
            .client
            .ensure_component(&self.identity, &self.devfile, debug_port)?;

        let archive = pack_sources(&params.path, &params.ignored_files)?;
        let digest = source_digest(&archive);
        let layout = ContextLayout::new(&self.identity.context);
        let requested_mode = if params.debug {
            RunMode::Debug
        } else {
            RunMode::Run
        };
        let mode_changed = params.env_specific_info.run_mode != Some(requested_mode);
        let changed = created
            || mode_changed
            || params.force_build
            || self.sources_changed(&layout, &digest);
        if !changed {
            info!("no source changes detected for {}", self.identity.name);
            return Ok(());
        }

        for component in self.devfile.components.iter().filter(|c| c.mount_sources) {
            debug!(
                "syncing {} bytes to {}:{}",
                archive.len(),
                component.name,
                component.source_mapping
            );
            self.client
                .sync(&self.identity, &component.name, &component.source_mapping, &archive)?;
        }

        if let Some(build) = build {
            self.execute(build, &[], false, params.show)?;
        }
        let extra_env = if params.debug {
            vec![(DEBUG_PORT_ENV, params.debug_port.to_string())]
        } else {
            Vec::new()
        };
        self.execute(run, &extra_env, true, params.show)?;

        layout.initialize()?;
        std::fs::write(layout.last_push_file(), &digest)?;
        Ok(())
    }

    fn log(&self, follow: bool, command: &Command) -> Result<LogStream, RuntimeError> {
        // The last step of a composite is the long-running one.
        let target = self
            .devfile
            .flatten(command)
            .last()
            .copied()
            .unwrap_or(command);
        let container = self.container_for(target)?;
        self.client.logs(&self.identity, &container, follow)
    }

    fn delete(&self, labels: &BTreeMap<String, String>, show: bool) -> Result<(), RuntimeError> {
        if !self.client.delete(labels, show)? {
            warn!("no {} resources found for component {}", self.client.name(), self.identity.name);
        }
        let last_push = ContextLayout::new(&self.identity.context).last_push_file();
        if last_push.exists() {
            std::fs::remove_file(last_push)?;
        }
        Ok(())
    }

    fn exec(&self, command: &[String]) -> Result<(), RuntimeError> {
        let container = self.source_component()?.name.to_string();
        let script = command
            .iter()
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ");
        self.client.exec(&self.identity, &container, &script, true)
    }

    fn test(&self, command_name: &str, show: bool) -> Result<(), RuntimeError> {
        let command = resolve_command(&self.devfile.commands, CommandKind::Test, command_name)?;
        self.execute(command, &[], false, show)
    }
}
