use super::{Invocation, EXIT_SUCCESS};
use loam_core::LogOptions;

pub fn run(inv: &Invocation, follow: bool, debug: bool, tail: Option<usize>) -> Result<u8, String> {
    let (_, env) = inv.open_component().map_err(|e| e.to_string())?;
    let opts = LogOptions {
        devfile_path: inv.devfile_path(),
        context: inv.context.clone(),
        namespace: inv.namespace_for(&env),
        follow,
        debug,
        max_lines: tail,
    };
    inv.lifecycle()
        .log(&opts, &env, std::io::stdout().lock())
        .map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
