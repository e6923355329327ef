use crate::cluster::KUBECTL_ENV;
use crate::local_engine::DOCKER_ENV;
use crate::platform::PlatformContext;
use crate::process::probe;
use std::fmt;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn binary(env: &str, default: &str) -> String {
    std::env::var(env).unwrap_or_else(|_| default.to_owned())
}

/// Check the client tools a platform needs.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_prereqs(platform: &PlatformContext) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    match platform {
        PlatformContext::Cluster { .. } => {
            let kubectl = binary(KUBECTL_ENV, "kubectl");
            if !probe(&kubectl, &["version", "--client"]) {
                missing.push(MissingPrereq {
                    name: kubectl,
                    purpose: "talking to the cluster",
                    install_hint: "https://kubernetes.io/docs/tasks/tools/ or set LOAM_KUBECTL",
                });
            }
        }
        PlatformContext::LocalEngine => {
            let docker = binary(DOCKER_ENV, "docker");
            if !probe(&docker, &["version"]) {
                missing.push(MissingPrereq {
                    name: docker,
                    purpose: "running components on the local container engine",
                    install_hint: "install docker or podman-docker and start the daemon, or set LOAM_DOCKER",
                });
            }
        }
    }

    if !probe("tar", &["--version"]) {
        missing.push(MissingPrereq {
            name: "tar".to_owned(),
            purpose: "inspecting synced sources locally",
            install_hint: "zypper install tar | apt install tar | dnf install tar | pacman -S tar",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nloam needs these tools to drive the selected push target.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "kubectl".to_owned(),
            purpose: "talking to the cluster",
            install_hint: "apt install kubectl",
        };
        let s = format!("{m}");
        assert!(s.contains("kubectl"));
        assert!(s.contains("talking to the cluster"));
        assert!(s.contains("apt install kubectl"));
    }

    #[test]
    fn format_missing_lists_every_item() {
        let items = vec![
            MissingPrereq {
                name: "kubectl".to_owned(),
                purpose: "cluster",
                install_hint: "a",
            },
            MissingPrereq {
                name: "docker".to_owned(),
                purpose: "engine",
                install_hint: "b",
            },
        ];
        let output = format_missing(&items);
        assert!(output.starts_with("missing prerequisites:"));
        assert!(output.contains("kubectl"));
        assert!(output.contains("docker"));
    }

    #[test]
    fn missing_engine_is_reported() {
        let _guard = crate::ENV_LOCK.lock().unwrap();
        std::env::set_var(DOCKER_ENV, "loam-missing-engine-prereq");
        let missing = check_prereqs(&PlatformContext::LocalEngine);
        std::env::remove_var(DOCKER_ENV);
        assert!(missing.iter().any(|m| m.name == "loam-missing-engine-prereq"));
    }
}
