pub mod completions;
pub mod delete;
pub mod doctor;
pub mod exec;
pub mod log;
pub mod man_pages;
pub mod push;

use indicatif::{ProgressBar, ProgressStyle};
use loam_core::{
    load_devfile, open_env_info, ConsoleEventSink, ConsoleReporter, CoreError, Lifecycle,
};
use loam_runtime::PlatformAdapterFactory;
use loam_schema::{Devfile, DEVFILE_NAME};
use loam_store::{EnvInfoFile, EnvSpecificInfo, RunMode};
use std::path::PathBuf;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Global flags and configuration shared by every verb.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub context: PathBuf,
    pub devfile: Option<PathBuf>,
    pub namespace: Option<String>,
    pub json: bool,
    /// Global push target, read once at startup.
    pub local_engine: bool,
}

impl Invocation {
    pub fn devfile_path(&self) -> PathBuf {
        self.devfile
            .clone()
            .unwrap_or_else(|| self.context.join(DEVFILE_NAME))
    }

    /// Caller-supplied namespace, else the one recorded for the component.
    pub fn namespace_for(&self, env: &dyn EnvSpecificInfo) -> String {
        self.namespace
            .clone()
            .unwrap_or_else(|| env.get_namespace())
    }

    pub fn lifecycle(&self) -> Lifecycle<PlatformAdapterFactory, ConsoleReporter> {
        Lifecycle::new(
            PlatformAdapterFactory,
            ConsoleReporter::new(ConsoleEventSink, self.json),
            self.local_engine,
        )
    }

    /// Parse the devfile and open (or create) the component's env info.
    pub fn open_component(&self) -> Result<(Devfile, EnvInfoFile), CoreError> {
        let devfile = load_devfile(&self.devfile_path())?;
        let env = open_env_info(
            &self.context,
            &devfile,
            self.namespace.as_deref(),
            self.local_engine,
        )?;
        Ok((devfile, env))
    }
}

pub fn json_line(value: &serde_json::Value) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn json_pretty(value: &serde_json::Value) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Spinner shown while a verb runs; `None` in JSON mode or when the verb's
/// own output goes to the terminal.
pub fn maybe_spinner(enabled: bool, msg: &str) -> Option<ProgressBar> {
    enabled.then(|| spinner(msg))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_mode(mode: RunMode) -> String {
    use console::Style;
    let text = mode.to_string();
    match mode {
        RunMode::Run => Style::new().green().apply_to(text).to_string(),
        RunMode::Debug => Style::new().yellow().bold().apply_to(text).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(devfile: Option<PathBuf>, namespace: Option<&str>) -> Invocation {
        Invocation {
            context: PathBuf::from("/work/web"),
            devfile,
            namespace: namespace.map(str::to_owned),
            json: false,
            local_engine: false,
        }
    }

    #[test]
    fn devfile_defaults_to_context() {
        let inv = invocation(None, None);
        assert_eq!(inv.devfile_path(), PathBuf::from("/work/web/devfile.toml"));
        let inv = invocation(Some(PathBuf::from("/other/devfile.toml")), None);
        assert_eq!(inv.devfile_path(), PathBuf::from("/other/devfile.toml"));
    }

    #[test]
    fn namespace_flag_overrides_env_info() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvInfoFile::load_or_init(loam_store::ContextLayout::new(dir.path()), || {
            loam_store::EnvInfo::new("web", "app", "recorded")
        })
        .unwrap();
        assert_eq!(invocation(None, None).namespace_for(&env), "recorded");
        assert_eq!(invocation(None, Some("flag")).namespace_for(&env), "flag");
    }

    #[test]
    fn json_line_is_single_line() {
        let line = json_line(&serde_json::json!({"a": {"b": 1}})).unwrap();
        assert_eq!(line, r#"{"a":{"b":1}}"#);
        assert!(json_pretty(&serde_json::json!({"a": 1})).unwrap().contains('\n'));
    }

    #[test]
    fn colorize_mode_keeps_text() {
        assert!(colorize_mode(RunMode::Run).contains("run"));
        assert!(colorize_mode(RunMode::Debug).contains("debug"));
    }
}
