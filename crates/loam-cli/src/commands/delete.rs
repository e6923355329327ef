use super::{json_line, maybe_spinner, spin_fail, spin_ok, Invocation, EXIT_SUCCESS};
use loam_core::DeleteOptions;
use loam_store::EnvSpecificInfo;

pub fn run(inv: &Invocation, show_log: bool) -> Result<u8, String> {
    let (_, env) = inv.open_component().map_err(|e| e.to_string())?;
    let component = env.get_name();
    let namespace = inv.namespace_for(&env);
    let opts = DeleteOptions {
        devfile_path: inv.devfile_path(),
        context: inv.context.clone(),
        namespace: namespace.clone(),
        show: show_log,
    };

    let pb = maybe_spinner(!inv.json, &format!("deleting component {component}..."));
    if let Err(e) = inv.lifecycle().delete(&opts, &env) {
        if let Some(ref pb) = pb {
            spin_fail(pb, "delete failed");
        }
        return Err(e.to_string());
    }
    if let Some(ref pb) = pb {
        spin_ok(pb, &format!("deleted component {component} from namespace {namespace}"));
    }
    if inv.json {
        let payload = serde_json::json!({
            "component": component,
            "namespace": namespace,
            "status": "deleted",
        });
        println!("{}", json_line(&payload)?);
    }
    Ok(EXIT_SUCCESS)
}
