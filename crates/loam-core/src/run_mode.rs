use crate::CoreError;
use loam_store::{EnvSpecificInfo, RunMode};
use tracing::debug;

/// Persists the mode a component was last successfully pushed in.
pub struct RunModeTracker<'a> {
    env: &'a dyn EnvSpecificInfo,
}

impl<'a> RunModeTracker<'a> {
    pub fn new(env: &'a dyn EnvSpecificInfo) -> Self {
        Self { env }
    }

    pub fn mode_for(debug: bool) -> RunMode {
        if debug {
            RunMode::Debug
        } else {
            RunMode::Run
        }
    }

    /// Record a successful push. Storage failures are returned, never swallowed.
    pub fn record(&self, debug: bool) -> Result<RunMode, CoreError> {
        let mode = Self::mode_for(debug);
        self.env.set_run_mode(mode)?;
        debug!("run mode for {} set to {mode}", self.env.get_name());
        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_store::{ContextLayout, EnvInfo, EnvInfoFile};

    #[test]
    fn record_persists_mode() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvInfoFile::load_or_init(ContextLayout::new(dir.path()), || {
            EnvInfo::new("web", "app", "dev")
        })
        .unwrap();

        let tracker = RunModeTracker::new(&env);
        assert_eq!(tracker.record(true).unwrap(), RunMode::Debug);

        let reloaded = EnvInfoFile::load(ContextLayout::new(dir.path())).unwrap();
        assert_eq!(reloaded.snapshot().run_mode, Some(RunMode::Debug));
    }

    #[test]
    fn mode_follows_debug_flag() {
        assert_eq!(RunModeTracker::mode_for(false), RunMode::Run);
        assert_eq!(RunModeTracker::mode_for(true), RunMode::Debug);
    }
}
