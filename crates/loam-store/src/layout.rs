use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-component state directory inside a component context.
pub const STATE_DIR: &str = ".loam";

/// Directory layout of a component context.
///
/// All loam state lives under `<context>/.loam`, which is also always
/// excluded from source sync.
#[derive(Debug, Clone)]
pub struct ContextLayout {
    root: PathBuf,
}

impl ContextLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    #[inline]
    pub fn env_dir(&self) -> PathBuf {
        self.state_dir().join("env")
    }

    #[inline]
    pub fn env_file(&self) -> PathBuf {
        self.env_dir().join("env.json")
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.env_dir().join(".lock")
    }

    /// Digest of the source tree sent by the last successful sync.
    #[inline]
    pub fn last_push_file(&self) -> PathBuf {
        self.env_dir().join("last-push")
    }

    pub fn initialize(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(self.env_dir())
    }
}
