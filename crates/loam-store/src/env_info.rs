use crate::layout::ContextLayout;
use crate::lock::EnvLock;
use crate::{fsync_dir, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

/// Debug port used when none has been configured for the component.
pub const DEFAULT_DEBUG_PORT: u16 = 5858;

/// Mode the component was last successfully pushed in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Run,
    Debug,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Run => write!(f, "run"),
            RunMode::Debug => write!(f, "debug"),
        }
    }
}

/// Platform a URL was declared for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UrlKind {
    Cluster,
    LocalEngine,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalUrl {
    pub name: String,
    pub port: u16,
    pub kind: UrlKind,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Environment-specific state of one component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvInfo {
    pub name: String,
    pub application: String,
    pub namespace: String,
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,
    #[serde(default)]
    pub urls: Vec<LocalUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_mode: Option<RunMode>,
    pub updated_at: String,
    /// blake3 checksum over the content, excluding this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

fn default_debug_port() -> u16 {
    DEFAULT_DEBUG_PORT
}

impl EnvInfo {
    pub fn new(name: &str, application: &str, namespace: &str) -> Self {
        Self {
            name: name.to_owned(),
            application: application.to_owned(),
            namespace: namespace.to_owned(),
            debug_port: DEFAULT_DEBUG_PORT,
            urls: Vec::new(),
            run_mode: None,
            updated_at: chrono::Utc::now().to_rfc3339(),
            checksum: None,
        }
    }

    fn compute_checksum(&self) -> Result<String, StoreError> {
        let mut copy = self.clone();
        copy.checksum = None;
        let json = serde_json::to_string_pretty(&copy)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Accessors the lifecycle core needs from environment-specific storage.
pub trait EnvSpecificInfo {
    fn get_name(&self) -> String;

    fn get_application(&self) -> String;

    fn get_namespace(&self) -> String;

    fn get_debug_port(&self) -> u16;

    fn list_urls(&self) -> Result<Vec<LocalUrl>, StoreError>;

    /// Persist the run mode synchronously.
    fn set_run_mode(&self, mode: RunMode) -> Result<(), StoreError>;

    /// Point-in-time copy handed to adapters.
    fn snapshot(&self) -> EnvInfo;
}

/// File-backed [`EnvSpecificInfo`] stored at `<context>/.loam/env/env.json`.
pub struct EnvInfoFile {
    layout: ContextLayout,
    info: Mutex<EnvInfo>,
}

impl EnvInfoFile {
    /// Load existing env info, failing when the component was never initialized.
    pub fn load(layout: ContextLayout) -> Result<Self, StoreError> {
        let info = read_env_file(&layout)?;
        Ok(Self {
            layout,
            info: Mutex::new(info),
        })
    }

    /// Load existing env info or persist the one produced by `seed`.
    pub fn load_or_init(
        layout: ContextLayout,
        seed: impl FnOnce() -> EnvInfo,
    ) -> Result<Self, StoreError> {
        if layout.env_file().exists() {
            return Self::load(layout);
        }
        let info = seed();
        debug!(
            "initializing env info for '{}' at {}",
            info.name,
            layout.env_file().display()
        );
        write_env_file(&layout, &info)?;
        Ok(Self {
            layout,
            info: Mutex::new(info),
        })
    }

    fn with_info<T>(&self, f: impl FnOnce(&EnvInfo) -> T) -> T {
        match self.info.lock() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

impl EnvSpecificInfo for EnvInfoFile {
    fn get_name(&self) -> String {
        self.with_info(|i| i.name.clone())
    }

    fn get_application(&self) -> String {
        self.with_info(|i| i.application.clone())
    }

    fn get_namespace(&self) -> String {
        self.with_info(|i| i.namespace.clone())
    }

    fn get_debug_port(&self) -> u16 {
        self.with_info(|i| i.debug_port)
    }

    fn list_urls(&self) -> Result<Vec<LocalUrl>, StoreError> {
        Ok(self.with_info(|i| i.urls.clone()))
    }

    fn set_run_mode(&self, mode: RunMode) -> Result<(), StoreError> {
        let _lock = EnvLock::acquire(&self.layout.lock_file())?;

        let mut info = if self.layout.env_file().exists() {
            read_env_file(&self.layout)?
        } else {
            self.snapshot()
        };
        info.run_mode = Some(mode);
        info.updated_at = chrono::Utc::now().to_rfc3339();
        write_env_file(&self.layout, &info)?;

        match self.info.lock() {
            Ok(mut guard) => *guard = info,
            Err(poisoned) => *poisoned.into_inner() = info,
        }
        debug!("run mode set to {mode}");
        Ok(())
    }

    fn snapshot(&self) -> EnvInfo {
        self.with_info(Clone::clone)
    }
}

fn read_env_file(layout: &ContextLayout) -> Result<EnvInfo, StoreError> {
    let path = layout.env_file();
    if !path.exists() {
        return Err(StoreError::EnvNotFound(path.display().to_string()));
    }
    let content = fs::read_to_string(&path)?;
    let info: EnvInfo = serde_json::from_str(&content)?;

    // Hand-edited files drop the checksum; only verify when present.
    if let Some(ref expected) = info.checksum {
        let actual = info.compute_checksum()?;
        if actual != *expected {
            return Err(StoreError::IntegrityFailure {
                path: path.display().to_string(),
                expected: expected.clone(),
                actual,
            });
        }
    }
    Ok(info)
}

fn write_env_file(layout: &ContextLayout, info: &EnvInfo) -> Result<(), StoreError> {
    layout.initialize()?;

    let mut with_checksum = info.clone();
    with_checksum.checksum = Some(info.compute_checksum()?);
    let content = serde_json::to_string_pretty(&with_checksum)?;

    let dir = layout.env_dir();
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(layout.env_file())
        .map_err(|e| StoreError::Io(e.error))?;
    fsync_dir(&dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(dir: &std::path::Path) -> EnvInfoFile {
        EnvInfoFile::load_or_init(ContextLayout::new(dir), || {
            let mut info = EnvInfo::new("nodejs", "app", "dev");
            info.urls.push(LocalUrl {
                name: "http".to_owned(),
                port: 3000,
                kind: UrlKind::Cluster,
                secure: false,
                host: None,
            });
            info
        })
        .unwrap()
    }

    #[test]
    fn load_or_init_persists_seed() {
        let dir = tempfile::tempdir().unwrap();
        let env = seeded(dir.path());
        assert_eq!(env.get_name(), "nodejs");
        assert_eq!(env.get_debug_port(), DEFAULT_DEBUG_PORT);
        assert!(ContextLayout::new(dir.path()).env_file().exists());

        let reloaded = EnvInfoFile::load(ContextLayout::new(dir.path())).unwrap();
        assert_eq!(reloaded.get_namespace(), "dev");
        assert_eq!(reloaded.list_urls().unwrap().len(), 1);
    }

    #[test]
    fn load_or_init_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        seeded(dir.path());
        let env = EnvInfoFile::load_or_init(ContextLayout::new(dir.path()), || {
            EnvInfo::new("other", "app", "default")
        })
        .unwrap();
        assert_eq!(env.get_name(), "nodejs");
    }

    #[test]
    fn load_missing_fails_with_env_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = EnvInfoFile::load(ContextLayout::new(dir.path()));
        assert!(matches!(result, Err(StoreError::EnvNotFound(_))));
    }

    #[test]
    fn set_run_mode_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let env = seeded(dir.path());
        env.set_run_mode(RunMode::Debug).unwrap();
        assert_eq!(env.snapshot().run_mode, Some(RunMode::Debug));

        let reloaded = EnvInfoFile::load(ContextLayout::new(dir.path())).unwrap();
        assert_eq!(reloaded.snapshot().run_mode, Some(RunMode::Debug));
    }

    #[test]
    fn tampered_file_fails_integrity_check() {
        let dir = tempfile::tempdir().unwrap();
        seeded(dir.path());
        let path = ContextLayout::new(dir.path()).env_file();
        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("\"dev\"", "\"prod\"")).unwrap();

        let result = EnvInfoFile::load(ContextLayout::new(dir.path()));
        assert!(matches!(result, Err(StoreError::IntegrityFailure { .. })));
    }

    #[test]
    fn file_without_checksum_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ContextLayout::new(dir.path());
        layout.initialize().unwrap();
        fs::write(
            layout.env_file(),
            r#"{"name":"api","application":"app","namespace":"dev","updated_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let env = EnvInfoFile::load(layout).unwrap();
        assert_eq!(env.get_name(), "api");
        assert_eq!(env.get_debug_port(), DEFAULT_DEBUG_PORT);
        assert!(env.list_urls().unwrap().is_empty());
    }

    #[test]
    fn url_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&UrlKind::LocalEngine).unwrap();
        assert_eq!(json, "\"local-engine\"");
    }
}
