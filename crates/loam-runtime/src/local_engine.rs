use crate::adapter::{APPLICATION_LABEL, COMPONENT_LABEL};
use crate::component::PlatformClient;
use crate::platform::ComponentIdentity;
use crate::process::{probe, run_captured, run_shown, run_with_input, shell_quote, ChildStream, LogStream};
use crate::RuntimeError;
use loam_schema::{Component, Devfile};
use std::collections::BTreeMap;
use std::process::Command;
use tracing::{debug, info};

/// Environment variable naming the container engine binary to use.
pub const DOCKER_ENV: &str = "LOAM_DOCKER";

/// Local container engine client (docker or a CLI-compatible engine).
///
/// Each devfile component becomes one long-lived container named
/// `<component>-<devfile component>`.
pub struct DockerClient {
    docker: String,
}

impl DockerClient {
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = std::env::var(DOCKER_ENV).unwrap_or_else(|_| "docker".to_owned());
        if !probe(&docker, &["version"]) {
            return Err(RuntimeError::AdapterConstruction {
                platform: "local-engine".to_owned(),
                reason: format!(
                    "unable to reach the container engine with '{docker} version'; is it installed and running?"
                ),
            });
        }
        debug!("using container engine {docker}");
        Ok(Self { docker })
    }

    fn command(&self) -> Command {
        Command::new(&self.docker)
    }

    fn container_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        let out = run_captured(self.command().args([
            "ps",
            "-aq",
            "--filter",
            &format!("name=^{name}$"),
        ]))?;
        Ok(!out.trim().is_empty())
    }

    fn publishes_port(&self, name: &str, port: u16) -> Result<bool, RuntimeError> {
        let out = run_captured(self.command().args(["port", name]))?;
        Ok(publishes(&out, port))
    }
}

/// Whether `docker port` output maps container port `port`.
pub fn publishes(port_output: &str, port: u16) -> bool {
    let wanted = format!("{port}/tcp");
    port_output
        .lines()
        .any(|line| line.split_whitespace().next() == Some(wanted.as_str()))
}

/// Container name for one devfile component.
pub fn container_name(identity: &ComponentIdentity, component: &str) -> String {
    format!("{}-{component}", identity.name)
}

/// Arguments for `docker run` creating the container of `component`.
pub fn run_args(
    identity: &ComponentIdentity,
    component: &Component,
    debug_port: Option<u16>,
) -> Vec<String> {
    let mut args = vec![
        "run".to_owned(),
        "-d".to_owned(),
        "--name".to_owned(),
        container_name(identity, &component.name),
        "--label".to_owned(),
        format!("{COMPONENT_LABEL}={}", identity.name),
        "--label".to_owned(),
        format!("{APPLICATION_LABEL}={}", identity.application),
    ];
    for (key, value) in &component.env {
        args.push("-e".to_owned());
        args.push(format!("{key}={value}"));
    }
    for endpoint in &component.endpoints {
        args.push("-p".to_owned());
        args.push(format!("{0}:{0}", endpoint.port));
    }
    if let Some(port) = debug_port.filter(|_| component.mount_sources) {
        args.push("-p".to_owned());
        args.push(format!("{port}:{port}"));
    }
    args.extend([
        component.image.clone(),
        "tail".to_owned(),
        "-f".to_owned(),
        "/dev/null".to_owned(),
    ]);
    args
}

impl PlatformClient for DockerClient {
    fn name(&self) -> &'static str {
        "local-engine"
    }

    fn ensure_component(
        &self,
        identity: &ComponentIdentity,
        devfile: &Devfile,
        debug_port: Option<u16>,
    ) -> Result<bool, RuntimeError> {
        let mut created = false;
        for component in &devfile.components {
            let name = container_name(identity, &component.name);
            if self.container_exists(&name)? {
                // Published ports are fixed at creation.
                match debug_port.filter(|_| component.mount_sources) {
                    Some(port) if !self.publishes_port(&name, port)? => {
                        info!("recreating container {name} to publish debug port {port}");
                        run_captured(self.command().args(["rm", "-f", &name]))?;
                    }
                    _ => continue,
                }
            }
            info!("starting container {name} from {}", component.image);
            run_captured(
                self.command()
                    .args(run_args(identity, component, debug_port)),
            )?;
            created = true;
        }
        Ok(created)
    }

    fn sync(
        &self,
        identity: &ComponentIdentity,
        container: &str,
        target_dir: &str,
        archive: &[u8],
    ) -> Result<(), RuntimeError> {
        let target = shell_quote(target_dir);
        run_with_input(
            self.command().args([
                "exec",
                "-i",
                &container_name(identity, container),
                "sh",
                "-c",
                &format!("mkdir -p {target} && tar xf - -C {target}"),
            ]),
            archive,
        )
    }

    fn exec(
        &self,
        identity: &ComponentIdentity,
        container: &str,
        script: &str,
        show: bool,
    ) -> Result<(), RuntimeError> {
        run_shown(
            self.command().args([
                "exec",
                &container_name(identity, container),
                "sh",
                "-c",
                script,
            ]),
            show,
        )
    }

    fn logs(
        &self,
        identity: &ComponentIdentity,
        container: &str,
        follow: bool,
    ) -> Result<LogStream, RuntimeError> {
        let mut cmd = self.command();
        cmd.arg("logs");
        if follow {
            cmd.arg("--follow");
        }
        cmd.arg(container_name(identity, container));
        Ok(Box::new(ChildStream::spawn(&mut cmd)?))
    }

    fn delete(&self, labels: &BTreeMap<String, String>, show: bool) -> Result<bool, RuntimeError> {
        let mut ps = self.command();
        ps.args(["ps", "-aq"]);
        for (key, value) in labels {
            ps.arg("--filter").arg(format!("label={key}={value}"));
        }
        let ids: Vec<String> = run_captured(&mut ps)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect();
        if ids.is_empty() {
            return Ok(false);
        }
        run_captured(self.command().args(["rm", "-f"]).args(&ids))?;
        if show {
            for id in &ids {
                info!("removed container {id}");
            }
        }
        Ok(true)
    }
}
