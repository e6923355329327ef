use crate::types::{CommandId, ComponentName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Lifecycle group a command belongs to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Build,
    #[default]
    Run,
    Debug,
    Test,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Build => write!(f, "build"),
            CommandKind::Run => write!(f, "run"),
            CommandKind::Debug => write!(f, "debug"),
            CommandKind::Test => write!(f, "test"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Command {
    pub id: CommandId,
    pub kind: CommandKind,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub component: Option<ComponentName>,
    #[serde(default)]
    pub command_line: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Child command ids for a composite command.
    #[serde(default)]
    pub commands: Vec<CommandId>,
}

impl Command {
    pub fn is_composite(&self) -> bool {
        !self.commands.is_empty()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("the command \"{name}\" is not found in the devfile for kind {kind}")]
    CommandNotFound { name: String, kind: CommandKind },
    #[error("no default {kind} command found in the devfile: mark exactly one {kind} command with default = true")]
    NoDefaultCommand { kind: CommandKind },
    #[error("no debug command found in devfile, please run \"{hint}\" for run command logs")]
    NoDebugCommand { hint: String },
}

/// Verb suggested to users when a debug command was requested but none exists.
pub const NON_DEBUG_HINT: &str = "loam log";

/// Select the lifecycle command to execute.
///
/// An explicit name is matched case-insensitively among commands of `kind`.
/// Without one, the command marked default is chosen; a kind with a single
/// unmarked command falls back to that command. Debug resolution fails with
/// [`ResolveError::NoDebugCommand`] whenever the manifest has no debug command
/// at all, regardless of the name requested.
pub fn resolve_command<'a>(
    commands: &'a [Command],
    kind: CommandKind,
    explicit_name: &str,
) -> Result<&'a Command, ResolveError> {
    let mut of_kind = commands.iter().filter(|c| c.kind == kind).peekable();

    if kind == CommandKind::Debug && of_kind.peek().is_none() {
        return Err(ResolveError::NoDebugCommand {
            hint: NON_DEBUG_HINT.to_owned(),
        });
    }

    if !explicit_name.is_empty() {
        let wanted = explicit_name.to_lowercase();
        return of_kind
            .find(|c| c.id.normalized() == wanted)
            .ok_or(ResolveError::CommandNotFound {
                name: wanted,
                kind,
            });
    }

    let candidates: Vec<&Command> = of_kind.collect();
    let defaults: Vec<&Command> = candidates.iter().copied().filter(|c| c.default).collect();
    match (defaults.as_slice(), candidates.as_slice()) {
        ([only], _) | ([], [only]) => Ok(*only),
        _ => Err(ResolveError::NoDefaultCommand { kind }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(id: &str, kind: CommandKind, default: bool) -> Command {
        Command {
            id: CommandId::new(id),
            kind,
            default,
            component: Some(ComponentName::new("runtime")),
            command_line: Some(format!("echo {id}")),
            ..Command::default()
        }
    }

    fn sample() -> Vec<Command> {
        vec![
            cmd("build", CommandKind::Build, true),
            cmd("run", CommandKind::Run, true),
            cmd("Run-Alt", CommandKind::Run, false),
        ]
    }

    #[test]
    fn default_command_is_selected_without_name() {
        let commands = sample();
        let c = resolve_command(&commands, CommandKind::Run, "").unwrap();
        assert_eq!(c.id.as_str(), "run");
    }

    #[test]
    fn two_defaults_fail_with_no_default() {
        let commands = vec![
            cmd("a", CommandKind::Build, true),
            cmd("b", CommandKind::Build, true),
        ];
        assert_eq!(
            resolve_command(&commands, CommandKind::Build, ""),
            Err(ResolveError::NoDefaultCommand {
                kind: CommandKind::Build
            })
        );
    }

    #[test]
    fn several_undefaulted_commands_fail_with_no_default() {
        let commands = vec![
            cmd("a", CommandKind::Test, false),
            cmd("b", CommandKind::Test, false),
        ];
        assert!(matches!(
            resolve_command(&commands, CommandKind::Test, ""),
            Err(ResolveError::NoDefaultCommand { .. })
        ));
    }

    #[test]
    fn single_unmarked_command_is_used() {
        let commands = vec![cmd("unit", CommandKind::Test, false)];
        let c = resolve_command(&commands, CommandKind::Test, "").unwrap();
        assert_eq!(c.id.as_str(), "unit");
    }

    #[test]
    fn missing_kind_fails_with_no_default() {
        let commands = sample();
        assert!(matches!(
            resolve_command(&commands, CommandKind::Test, ""),
            Err(ResolveError::NoDefaultCommand {
                kind: CommandKind::Test
            })
        ));
    }

    #[test]
    fn explicit_name_is_case_insensitive() {
        let commands = sample();
        let upper = resolve_command(&commands, CommandKind::Build, "Build").unwrap();
        let lower = resolve_command(&commands, CommandKind::Build, "build").unwrap();
        assert_eq!(upper, lower);

        let alt = resolve_command(&commands, CommandKind::Run, "run-alt").unwrap();
        assert_eq!(alt.id.as_str(), "Run-Alt");
    }

    #[test]
    fn explicit_name_of_other_kind_is_not_found() {
        let commands = sample();
        assert_eq!(
            resolve_command(&commands, CommandKind::Run, "BUILD"),
            Err(ResolveError::CommandNotFound {
                name: "build".to_owned(),
                kind: CommandKind::Run
            })
        );
    }

    #[test]
    fn debug_without_debug_commands_is_no_debug_command() {
        let commands = sample();
        for name in ["", "debug", "run"] {
            let err = resolve_command(&commands, CommandKind::Debug, name).unwrap_err();
            assert!(
                matches!(err, ResolveError::NoDebugCommand { .. }),
                "name {name:?} gave {err:?}"
            );
            assert!(err.to_string().contains("loam log"));
        }
    }

    #[test]
    fn debug_command_resolves_when_present() {
        let mut commands = sample();
        commands.push(cmd("debug", CommandKind::Debug, true));
        let c = resolve_command(&commands, CommandKind::Debug, "").unwrap();
        assert_eq!(c.kind, CommandKind::Debug);
    }

    #[test]
    fn kind_display_matches_manifest_tag() {
        assert_eq!(CommandKind::Debug.to_string(), "debug");
        let parsed: CommandKind = serde_json::from_str("\"test\"").unwrap();
        assert_eq!(parsed, CommandKind::Test);
    }
}
