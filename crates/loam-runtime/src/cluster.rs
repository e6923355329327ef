use crate::adapter::{APPLICATION_LABEL, COMPONENT_LABEL};
use crate::component::PlatformClient;
use crate::platform::ComponentIdentity;
use crate::process::{probe, run_captured, run_shown, run_with_input, shell_quote, ChildStream, LogStream};
use crate::RuntimeError;
use loam_schema::Devfile;
use std::collections::BTreeMap;
use std::process::Command;
use tracing::{debug, info};

/// Environment variable naming the kubectl binary to use.
pub const KUBECTL_ENV: &str = "LOAM_KUBECTL";
const READY_TIMEOUT: &str = "180s";

/// Cluster client driving `kubectl` against one namespace.
///
/// Each component runs as a single pod with one container per devfile
/// component, kept alive by an idle entrypoint.
pub struct KubectlClient {
    kubectl: String,
    namespace: String,
}

impl KubectlClient {
    pub fn connect(namespace: &str) -> Result<Self, RuntimeError> {
        let kubectl = std::env::var(KUBECTL_ENV).unwrap_or_else(|_| "kubectl".to_owned());
        if !probe(&kubectl, &["version", "--client"]) {
            return Err(RuntimeError::AdapterConstruction {
                platform: "cluster".to_owned(),
                reason: format!("unable to run '{kubectl} version --client'; is kubectl installed?"),
            });
        }
        debug!("using {kubectl} for namespace {namespace}");
        Ok(Self {
            kubectl,
            namespace: namespace.to_owned(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.kubectl);
        cmd.arg("--namespace").arg(&self.namespace);
        cmd
    }

    fn pod_exists(&self, pod: &str) -> Result<bool, RuntimeError> {
        let out = run_captured(
            self.command()
                .args(["get", "pod", pod, "--ignore-not-found", "-o", "name"]),
        )?;
        Ok(!out.trim().is_empty())
    }

    fn pod_ports(&self, pod: &str) -> Result<String, RuntimeError> {
        run_captured(self.command().args([
            "get",
            "pod",
            pod,
            "-o",
            "jsonpath={.spec.containers[*].ports[*].containerPort}",
        ]))
    }
}

/// Whether a space-separated `containerPort` listing includes `port`.
pub fn lists_port(listing: &str, port: u16) -> bool {
    listing
        .split_whitespace()
        .any(|p| p.parse::<u16>().ok() == Some(port))
}

/// Pod name for a component: `<component>-<application>`.
pub fn pod_name(identity: &ComponentIdentity) -> String {
    format!("{}-{}", identity.name, identity.application)
}

/// Pod manifest for a component.
pub fn pod_manifest(
    identity: &ComponentIdentity,
    devfile: &Devfile,
    debug_port: Option<u16>,
) -> serde_json::Value {
    let containers: Vec<serde_json::Value> = devfile
        .components
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            let mut ports: Vec<serde_json::Value> = c
                .endpoints
                .iter()
                .map(|e| serde_json::json!({ "name": e.name, "containerPort": e.port }))
                .collect();
            if let (Some(port), 0) = (debug_port, idx) {
                ports.push(serde_json::json!({ "name": "debug", "containerPort": port }));
            }
            let env: Vec<serde_json::Value> = c
                .env
                .iter()
                .map(|(k, v)| serde_json::json!({ "name": k, "value": v }))
                .collect();
            serde_json::json!({
                "name": c.name,
                "image": c.image,
                "command": ["tail", "-f", "/dev/null"],
                "env": env,
                "ports": ports,
            })
        })
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": pod_name(identity),
            "labels": {
                COMPONENT_LABEL: identity.name,
                APPLICATION_LABEL: identity.application,
            },
        },
        "spec": { "containers": containers },
    })
}

impl PlatformClient for KubectlClient {
    fn name(&self) -> &'static str {
        "cluster"
    }

    fn ensure_component(
        &self,
        identity: &ComponentIdentity,
        devfile: &Devfile,
        debug_port: Option<u16>,
    ) -> Result<bool, RuntimeError> {
        let pod = pod_name(identity);
        if self.pod_exists(&pod)? {
            // Pod ports are immutable, so a newly requested debug port means a new pod.
            match debug_port {
                Some(port) if !lists_port(&self.pod_ports(&pod)?, port) => {
                    info!("recreating pod {pod} to expose debug port {port}");
                    run_captured(self.command().args(["delete", "pod", &pod, "--wait"]))?;
                }
                _ => return Ok(false),
            }
        }
        info!("creating pod {pod} in namespace {}", self.namespace);
        let manifest = pod_manifest(identity, devfile, debug_port);
        run_with_input(
            self.command().args(["apply", "-f", "-"]),
            manifest.to_string().as_bytes(),
        )?;
        run_captured(self.command().args([
            "wait",
            "--for=condition=Ready",
            &format!("pod/{pod}"),
            &format!("--timeout={READY_TIMEOUT}"),
        ]))?;
        Ok(true)
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
                &pod_name(identity),
                "-c",
                container,
                "--",
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
                &pod_name(identity),
                "-c",
                container,
                "--",
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
        cmd.args(["logs", &pod_name(identity), "-c", container]);
        if follow {
            cmd.arg("--follow");
        }
        Ok(Box::new(ChildStream::spawn(&mut cmd)?))
    }

    fn delete(&self, labels: &BTreeMap<String, String>, show: bool) -> Result<bool, RuntimeError> {
        let selector = labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let out = run_captured(self.command().args([
            "delete",
            "pods,services",
            "-l",
            &selector,
            "--ignore-not-found",
            "-o",
            "name",
        ]))?;
        let deleted: Vec<&str> = out.lines().filter(|l| !l.trim().is_empty()).collect();
        if show {
            for name in &deleted {
                info!("deleted {name}");
            }
        }
        Ok(!deleted.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devfile() -> Devfile {
        loam_schema::parse_devfile_str(
            r#"
schema_version = "2.0.0"
[metadata]
name = "api"

[[components]]
name = "runtime"
image = "golang:1.22"
endpoints = [{ name = "http", port = 8080 }]
env = { GOFLAGS = "-mod=mod" }

[[components]]
name = "db"
image = "postgres:16"
mount_sources = false
"#,
        )
        .unwrap()
    }

    #[test]
    fn lists_port_matches_whole_ports() {
        assert!(lists_port("8080 5858", 5858));
        assert!(!lists_port("8080 58580", 5858));
        assert!(!lists_port("", 8080));
    }

    #[test]
    fn pod_name_combines_component_and_app() {
        let id = ComponentIdentity::new("api", "shop", "/src");
        assert_eq!(pod_name(&id), "api-shop");
    }

    #[test]
    fn pod_manifest_labels_and_containers() {
        let id = ComponentIdentity::new("api", "shop", "/src");
        let manifest = pod_manifest(&id, &devfile(), None);
        assert_eq!(manifest["metadata"]["labels"]["component"], "api");
        assert_eq!(manifest["metadata"]["labels"]["app"], "shop");
        let containers = manifest["spec"]["containers"].as_array().unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0]["ports"][0]["containerPort"], 8080);
        assert_eq!(containers[0]["env"][0]["name"], "GOFLAGS");
        assert_eq!(containers[1]["image"], "postgres:16");
    }

    #[test]
    fn debug_port_is_exposed_on_first_container() {
        let id = ComponentIdentity::new("api", "shop", "/src");
        let manifest = pod_manifest(&id, &devfile(), Some(5858));
        let ports = manifest["spec"]["containers"][0]["ports"].as_array().unwrap();
        assert!(ports.iter().any(|p| p["containerPort"] == 5858));
        assert!(manifest["spec"]["containers"][1]["ports"]
            .as_array()
            .unwrap()
            .is_empty());
    }
}
