use super::{json_line, maybe_spinner, spin_fail, spin_ok, Invocation, EXIT_FAILURE, EXIT_SUCCESS};
use loam_core::{FailureReporter, PushOptions, RunModeTracker};
use loam_store::EnvSpecificInfo;

#[derive(Debug, Clone, Default)]
pub struct PushArgs {
    pub force_build: bool,
    pub debug: bool,
    pub show_log: bool,
    pub build_command: Option<String>,
    pub run_command: Option<String>,
    pub debug_command: Option<String>,
    pub ignore: Vec<String>,
}

pub fn run(inv: &Invocation, args: PushArgs) -> Result<u8, String> {
    let lifecycle = inv.lifecycle();

    // Setup failures are push failures too and must honor structured output.
    let (devfile, env) = match inv.open_component() {
        Ok(opened) => opened,
        Err(e) => {
            lifecycle
                .reporter()
                .push_failed(e)
                .map_err(|e| e.to_string())?;
            return Ok(EXIT_FAILURE);
        }
    };
    let component = env.get_name();

    let opts = PushOptions {
        devfile_path: inv.devfile_path(),
        source_path: inv.context.clone(),
        namespace: inv.namespace_for(&env),
        ignores: args.ignore,
        force_build: args.force_build,
        debug: args.debug,
        show: args.show_log,
        build_command: args.build_command.unwrap_or_default(),
        run_command: args.run_command.unwrap_or_default(),
        debug_command: args.debug_command.unwrap_or_default(),
    };

    let pb = maybe_spinner(
        !inv.json && !args.show_log,
        &format!("pushing devfile component {component}..."),
    );
    match lifecycle.push(&opts, &env) {
        Ok(()) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("changes pushed to component {component}"));
            }
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "push failed");
            }
            return Err(e.to_string());
        }
    }

    let mode = RunModeTracker::mode_for(args.debug);
    if inv.json {
        let payload = serde_json::json!({
            "component": component,
            "devfile": devfile.metadata.name,
            "platform": if inv.local_engine { "local-engine" } else { "cluster" },
            "run_mode": mode.to_string(),
            "status": "pushed",
        });
        println!("{}", json_line(&payload)?);
    } else {
        println!(
            "component {component} is running in {} mode",
            super::colorize_mode(mode)
        );
    }
    Ok(EXIT_SUCCESS)
}
