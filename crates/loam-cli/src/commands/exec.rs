use super::{Invocation, EXIT_SUCCESS};
use loam_core::ExecOptions;

pub fn run(inv: &Invocation, command: Vec<String>) -> Result<u8, String> {
    let (_, env) = inv.open_component().map_err(|e| e.to_string())?;
    let opts = ExecOptions {
        devfile_path: inv.devfile_path(),
        context: inv.context.clone(),
        namespace: inv.namespace_for(&env),
        command,
    };
    inv.lifecycle()
        .exec(&opts, &env)
        .map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
