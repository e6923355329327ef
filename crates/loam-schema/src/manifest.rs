use crate::command::{Command, CommandKind};
use crate::types::{CommandId, ComponentName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Devfile schema major version accepted by this parser.
pub const SUPPORTED_SCHEMA_MAJOR: &str = "2";
/// Default mount point of project sources inside a component container.
pub const DEFAULT_SOURCE_MAPPING: &str = "/projects";
/// Default manifest file name, looked up in the component context.
pub const DEVFILE_NAME: &str = "devfile.toml";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read devfile: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse devfile: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported schema_version '{0}', expected {SUPPORTED_SCHEMA_MAJOR}.x")]
    UnsupportedVersion(String),
    #[error("metadata.name must not be empty")]
    EmptyName,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Devfile {
    pub schema_version: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Ignore rules applied on top of the caller's when syncing sources.
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Component {
    pub name: ComponentName,
    pub image: String,
    #[serde(default = "default_source_mapping")]
    pub source_mapping: String,
    #[serde(default = "default_true")]
    pub mount_sources: bool,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Endpoint {
    pub name: String,
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
}

fn default_source_mapping() -> String {
    DEFAULT_SOURCE_MAPPING.to_owned()
}

fn default_true() -> bool {
    true
}

impl Devfile {
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name.as_str() == name)
    }

    pub fn command(&self, id: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.id.matches(id))
    }

    pub fn commands_of_kind(&self, kind: CommandKind) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(move |c| c.kind == kind)
    }

    /// Expand a command into the ordered exec steps it runs.
    ///
    /// Composite commands are flattened depth-first. Unknown children are
    /// skipped; `validate_devfile_data` rejects them before this is reached.
    pub fn flatten<'a>(&'a self, command: &'a Command) -> Vec<&'a Command> {
        let mut steps = Vec::new();
        let mut stack: Vec<&CommandId> = Vec::new();
        self.flatten_into(command, &mut stack, &mut steps);
        steps
    }

    fn flatten_into<'a>(
        &'a self,
        command: &'a Command,
        stack: &mut Vec<&'a CommandId>,
        steps: &mut Vec<&'a Command>,
    ) {
        if !command.is_composite() {
            steps.push(command);
            return;
        }
        if stack.iter().any(|id| id.matches(&command.id)) {
            return;
        }
        stack.push(&command.id);
        for child in &command.commands {
            if let Some(c) = self.command(child) {
                self.flatten_into(c, stack, steps);
            }
        }
        stack.pop();
    }
}

pub fn parse_devfile_str(input: &str) -> Result<Devfile, ManifestError> {
    let devfile: Devfile = toml::from_str(input)?;
    if devfile.schema_version.split('.').next() != Some(SUPPORTED_SCHEMA_MAJOR) {
        return Err(ManifestError::UnsupportedVersion(devfile.schema_version));
    }
    if devfile.metadata.name.trim().is_empty() {
        return Err(ManifestError::EmptyName);
    }
    Ok(devfile)
}

/// Read and parse a devfile from disk.
pub fn parse_and_validate(path: impl AsRef<Path>) -> Result<Devfile, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_devfile_str(&content)
}
