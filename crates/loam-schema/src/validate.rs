use crate::command::{Command, CommandKind};
use crate::manifest::Devfile;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("devfile must declare at least one component")]
    NoComponents,
    #[error("duplicate component name '{0}'")]
    DuplicateComponent(String),
    #[error("component '{0}' must declare an image")]
    EmptyImage(String),
    #[error("duplicate command id '{0}' (command ids are case-insensitive)")]
    DuplicateCommand(String),
    #[error("command '{0}' must set exactly one of command_line or commands")]
    AmbiguousCommand(String),
    #[error("command '{command}' references unknown component '{component}'")]
    UnknownComponent { command: String, component: String },
    #[error("composite command '{command}' references unknown command '{child}'")]
    UnknownChild { command: String, child: String },
    #[error("composite command '{0}' references itself")]
    CompositeCycle(String),
    #[error("multiple default {kind} commands: {ids}")]
    MultipleDefaults { kind: CommandKind, ids: String },
}

/// Second validation pass over an already parsed devfile.
pub fn validate_devfile_data(devfile: &Devfile) -> Result<(), ValidationError> {
    validate_components(devfile)?;
    validate_commands(devfile)?;
    validate_defaults(&devfile.commands)
}

fn validate_components(devfile: &Devfile) -> Result<(), ValidationError> {
    if devfile.components.is_empty() {
        return Err(ValidationError::NoComponents);
    }
    let mut seen = HashSet::new();
    for component in &devfile.components {
        if !seen.insert(component.name.as_str()) {
            return Err(ValidationError::DuplicateComponent(
                component.name.to_string(),
            ));
        }
        if component.image.trim().is_empty() {
            return Err(ValidationError::EmptyImage(component.name.to_string()));
        }
    }
    Ok(())
}

fn validate_commands(devfile: &Devfile) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for command in &devfile.commands {
        if !seen.insert(command.id.normalized()) {
            return Err(ValidationError::DuplicateCommand(command.id.to_string()));
        }

        let has_line = command
            .command_line
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty());
        if has_line == command.is_composite() {
            return Err(ValidationError::AmbiguousCommand(command.id.to_string()));
        }

        if has_line {
            let component = command.component.as_deref().unwrap_or_default();
            if devfile.component(component).is_none() {
                return Err(ValidationError::UnknownComponent {
                    command: command.id.to_string(),
                    component: component.to_owned(),
                });
            }
        }

        for child in &command.commands {
            if devfile.command(child).is_none() {
                return Err(ValidationError::UnknownChild {
                    command: command.id.to_string(),
                    child: child.to_string(),
                });
            }
        }
    }

    for command in devfile.commands.iter().filter(|c| c.is_composite()) {
        let mut path = Vec::new();
        check_cycle(devfile, command, &mut path)?;
    }
    Ok(())
}

fn check_cycle(
    devfile: &Devfile,
    command: &Command,
    path: &mut Vec<String>,
) -> Result<(), ValidationError> {
    let id = command.id.normalized();
    if path.contains(&id) {
        return Err(ValidationError::CompositeCycle(command.id.to_string()));
    }
    path.push(id);
    for child in &command.commands {
        if let Some(c) = devfile.command(child) {
            check_cycle(devfile, c, path)?;
        }
    }
    path.pop();
    Ok(())
}

fn validate_defaults(commands: &[Command]) -> Result<(), ValidationError> {
    for kind in [
        CommandKind::Build,
        CommandKind::Run,
        CommandKind::Debug,
        CommandKind::Test,
    ] {
        let ids: Vec<&str> = commands
            .iter()
            .filter(|c| c.kind == kind && c.default)
            .map(|c| c.id.as_str())
            .collect();
        if ids.len() > 1 {
            return Err(ValidationError::MultipleDefaults {
                kind,
                ids: ids.join(", "),
            });
        }
    }
    Ok(())
}
