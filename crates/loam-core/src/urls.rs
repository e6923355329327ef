use loam_store::{LocalUrl, UrlKind};
use tracing::warn;

/// Warn when the active platform has no URL while the other platform does.
///
/// Advisory only: the message is logged and returned, nothing else changes.
pub fn warn_if_urls_invalid(urls: &[LocalUrl], active_is_local_engine: bool) -> Option<String> {
    let (local_engine, cluster): (Vec<&LocalUrl>, Vec<&LocalUrl>) = urls
        .iter()
        .partition(|u| u.kind == UrlKind::LocalEngine);

    let noun = if urls.len() > 1 { "URLs" } else { "a URL" };
    let message = if active_is_local_engine && local_engine.is_empty() && !cluster.is_empty() {
        format!("Found {noun} defined for the cluster, but no valid URLs for the local container engine.")
    } else if !active_is_local_engine && cluster.is_empty() && !local_engine.is_empty() {
        format!("Found {noun} defined for the local container engine, but no valid URLs for the cluster.")
    } else {
        return None;
    };
    warn!("{message}");
    Some(message)
}
