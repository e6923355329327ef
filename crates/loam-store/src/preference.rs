use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable overriding the configured push target.
pub const PUSH_TARGET_ENV: &str = "LOAM_PUSH_TARGET";

/// Platform that components are pushed to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PushTarget {
    #[default]
    Cluster,
    LocalEngine,
}

impl PushTarget {
    pub fn is_local_engine(self) -> bool {
        self == PushTarget::LocalEngine
    }
}

impl FromStr for PushTarget {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cluster" | "kube" | "kubernetes" => Ok(PushTarget::Cluster),
            "local-engine" | "docker" | "podman" => Ok(PushTarget::LocalEngine),
            other => Err(StoreError::InvalidPushTarget(other.to_owned())),
        }
    }
}

impl std::fmt::Display for PushTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushTarget::Cluster => write!(f, "cluster"),
            PushTarget::LocalEngine => write!(f, "local-engine"),
        }
    }
}

/// User-level preferences, stored at `~/.config/loam/preference.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Preferences {
    #[serde(default)]
    pub push_target: PushTarget,
}

impl Preferences {
    /// Load from the default location; a missing file yields defaults.
    pub fn load_default() -> Result<Self, StoreError> {
        match default_preference_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Push target after applying the `LOAM_PUSH_TARGET` override.
    pub fn effective_push_target(&self) -> Result<PushTarget, StoreError> {
        match std::env::var(PUSH_TARGET_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(self.push_target),
        }
    }
}

fn default_preference_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/loam/preference.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_file_selects_local_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preference.toml");
        std::fs::write(&path, "push_target = \"local-engine\"\n").unwrap();

        let loaded = Preferences::load(&path).unwrap();
        assert_eq!(loaded.push_target, PushTarget::LocalEngine);
    }

    #[test]
    fn missing_file_yields_cluster_target() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(prefs.push_target, PushTarget::Cluster);
    }

    #[test]
    fn push_target_parses_aliases() {
        assert_eq!("docker".parse::<PushTarget>().unwrap(), PushTarget::LocalEngine);
        assert_eq!("Kube".parse::<PushTarget>().unwrap(), PushTarget::Cluster);
        assert!("vm".parse::<PushTarget>().is_err());
    }

    #[test]
    fn invalid_preferences_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preference.toml");
        std::fs::write(&path, "push_target = \"moon\"\n").unwrap();
        assert!(matches!(
            Preferences::load(&path),
            Err(StoreError::Preferences(_))
        ));
    }
}
