//! Devfile manifest parsing, validation, and command resolution for loam.
//!
//! This crate defines the schema layer: TOML devfile parsing (`Devfile`),
//! the independent structural validation pass (`validate_devfile_data`),
//! lifecycle command kinds, and the command resolver that picks which
//! build/run/debug/test command a verb executes.

pub mod command;
pub mod manifest;
pub mod types;
pub mod validate;

pub use command::{resolve_command, Command, CommandKind, ResolveError, NON_DEBUG_HINT};
pub use manifest::{
    parse_and_validate, parse_devfile_str, Component, Devfile, Endpoint, ManifestError, Metadata,
    DEFAULT_SOURCE_MAPPING, DEVFILE_NAME,
};
pub use types::{CommandId, ComponentName};
pub use validate::{validate_devfile_data, ValidationError};
