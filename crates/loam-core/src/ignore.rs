use crate::CoreError;
use loam_store::layout::STATE_DIR;
use std::path::Path;
use tracing::debug;

/// Project-level ignore file, preferred over `.gitignore` when present.
pub const LOAM_IGNORE_FILE: &str = ".loamignore";
const GIT_IGNORE_FILE: &str = ".gitignore";

/// Rule every push carries so local state never reaches a container.
pub const ALWAYS_IGNORED: &str = STATE_DIR;

/// Merge the ignore rules for a push.
///
/// Order: caller rules, devfile `metadata.ignore`, the project ignore file
/// (`.loamignore`, else `.gitignore`), then the state directory. Duplicates
/// keep their first position.
pub fn merge_ignores(
    caller: &[String],
    manifest: &[String],
    source_path: &Path,
) -> Result<Vec<String>, CoreError> {
    let mut merged: Vec<String> = Vec::new();
    let mut push = |rule: &str| {
        let rule = rule.trim();
        if !rule.is_empty() && !rule.starts_with('#') && !merged.iter().any(|r| r == rule) {
            merged.push(rule.to_owned());
        }
    };

    caller.iter().for_each(|r| push(r.as_str()));
    manifest.iter().for_each(|r| push(r.as_str()));

    let loamignore = source_path.join(LOAM_IGNORE_FILE);
    let gitignore = source_path.join(GIT_IGNORE_FILE);
    let project_file = if loamignore.is_file() {
        Some(loamignore)
    } else if gitignore.is_file() {
        Some(gitignore)
    } else {
        None
    };
    if let Some(path) = project_file {
        debug!("reading ignore rules from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        content.lines().for_each(&mut push);
    }

    push(ALWAYS_IGNORED);
    Ok(merged)
}
