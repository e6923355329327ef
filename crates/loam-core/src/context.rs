use crate::CoreError;
use loam_schema::Devfile;
use loam_store::{ContextLayout, EnvInfo, EnvInfoFile, LocalUrl, UrlKind};
use std::path::Path;

/// Application a component belongs to when none was configured.
pub const DEFAULT_APPLICATION: &str = "app";
/// Namespace used when neither the caller nor env info names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Initial env info for a component seen for the first time.
///
/// Every devfile endpoint becomes a URL for the platform currently targeted.
pub fn seed_env_info(devfile: &Devfile, namespace: &str, local_engine: bool) -> EnvInfo {
    let kind = if local_engine {
        UrlKind::LocalEngine
    } else {
        UrlKind::Cluster
    };
    let mut info = EnvInfo::new(&devfile.metadata.name, DEFAULT_APPLICATION, namespace);
    info.urls = devfile
        .components
        .iter()
        .flat_map(|c| c.endpoints.iter())
        .map(|e| LocalUrl {
            name: e.name.clone(),
            port: e.port,
            kind,
            secure: e.secure,
            host: None,
        })
        .collect();
    info
}

/// Open the env info of the component in `context`, creating it on first use.
pub fn open_env_info(
    context: &Path,
    devfile: &Devfile,
    namespace: Option<&str>,
    local_engine: bool,
) -> Result<EnvInfoFile, CoreError> {
    let layout = ContextLayout::new(context);
    Ok(EnvInfoFile::load_or_init(layout, || {
        seed_env_info(
            devfile,
            namespace.unwrap_or(DEFAULT_NAMESPACE),
            local_engine,
        )
    })?)
}
