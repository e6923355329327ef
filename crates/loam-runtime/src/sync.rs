//! Source packing for component sync.
//!
//! Sources are sent to component containers as a tar stream. Entries are
//! collected in sorted order so that an unchanged tree always produces the
//! same digest, which adapters use to skip redundant rebuilds.

use crate::RuntimeError;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

/// Gitignore-style matcher over paths relative to the source root.
///
/// Supports `*`, `**`, `?`, a leading `/` to anchor at the root and a
/// trailing `/` to match directories only. Negated rules are skipped.
#[derive(Debug, Default)]
pub struct IgnoreMatcher {
    rules: Vec<IgnoreRule>,
}

#[derive(Debug)]
struct IgnoreRule {
    regex: Regex,
    /// Rule contains a slash and is matched against the full relative path.
    anchored: bool,
    dir_only: bool,
}

impl IgnoreMatcher {
    pub fn new(patterns: &[String]) -> Result<Self, RuntimeError> {
        let mut rules = Vec::new();
        for raw in patterns {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('!') {
                debug!("negated ignore rule '{line}' is not supported; skipping");
                continue;
            }
            let dir_only = line.ends_with('/');
            let body = line.trim_end_matches('/');
            let anchored = body.contains('/');
            let body = body.trim_start_matches('/');
            if body.is_empty() {
                continue;
            }
            let regex = Regex::new(&glob_to_regex(body)).map_err(|e| {
                RuntimeError::ExecFailed(format!("invalid ignore pattern '{line}': {e}"))
            })?;
            rules.push(IgnoreRule {
                regex,
                anchored,
                dir_only,
            });
        }
        Ok(Self { rules })
    }

    /// Whether `rel_path` (using `/` separators) or any of its parents is ignored.
    pub fn is_ignored(&self, rel_path: &str, is_dir: bool) -> bool {
        let components: Vec<&str> = rel_path.split('/').filter(|c| !c.is_empty()).collect();
        for (idx, name) in components.iter().enumerate() {
            let prefix = components[..=idx].join("/");
            let prefix_is_dir = is_dir || idx + 1 < components.len();
            for rule in &self.rules {
                if rule.dir_only && !prefix_is_dir {
                    continue;
                }
                let candidate = if rule.anchored { prefix.as_str() } else { name };
                if rule.regex.is_match(candidate) {
                    return true;
                }
            }
        }
        false
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

/// Pack `root` into a tar archive, skipping ignored entries.
pub fn pack_sources(root: &Path, ignores: &[String]) -> Result<Vec<u8>, RuntimeError> {
    let matcher = IgnoreMatcher::new(ignores)?;
    let mut entries = Vec::new();
    collect_entries(root, root, &matcher, &mut entries)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut ar = tar::Builder::new(Vec::new());
    ar.follow_symlinks(false);
    for (rel_path, full_path) in &entries {
        let ft = match full_path.symlink_metadata() {
            Ok(m) => m.file_type(),
            Err(e) => {
                warn!("skipping {rel_path}: metadata error: {e}");
                continue;
            }
        };
        if ft.is_file() || ft.is_dir() || ft.is_symlink() {
            ar.append_path_with_name(full_path, rel_path)?;
        } else {
            warn!("skipping unsupported file type: {rel_path}");
        }
    }
    debug!("packed {} entries from {}", entries.len(), root.display());
    Ok(ar.into_inner()?)
}

fn collect_entries(
    root: &Path,
    dir: &Path,
    matcher: &IgnoreMatcher,
    out: &mut Vec<(String, std::path::PathBuf)>,
) -> Result<(), RuntimeError> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .map_err(|e| RuntimeError::ExecFailed(format!("path outside source root: {e}")))?
            .to_string_lossy()
            .replace('\\', "/");
        let ft = entry.file_type()?;
        if matcher.is_ignored(&rel, ft.is_dir()) {
            continue;
        }
        out.push((rel, path.clone()));
        if ft.is_dir() {
            collect_entries(root, &path, matcher, out)?;
        }
    }
    Ok(())
}

/// Content digest of a packed source archive.
pub fn source_digest(archive: &[u8]) -> String {
    blake3::hash(archive).to_hex().to_string()
}
