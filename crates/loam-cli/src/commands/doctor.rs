use super::{json_pretty, Invocation, EXIT_FAILURE, EXIT_SUCCESS};
use loam_runtime::{check_prereqs, format_missing, select_platform};
use loam_store::{ContextLayout, EnvInfoFile, EnvSpecificInfo};

pub fn run(inv: &Invocation) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let target = if inv.local_engine {
        "local-engine"
    } else {
        "cluster"
    };
    checks.push(Check::info(
        "push_target",
        &format!("Push target: {target}"),
    ));

    check_devfile(inv, &mut checks, &mut all_pass);
    check_env_info(inv, &mut checks, &mut all_pass);
    check_platform(inv, &mut checks, &mut all_pass);

    print_results(&checks, all_pass, inv.json)
}

fn check_devfile(inv: &Invocation, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let path = inv.devfile_path();
    if !path.exists() {
        *all_pass = false;
        checks.push(Check::fail(
            "devfile",
            &format!("No devfile at {}", path.display()),
        ));
        return;
    }
    match loam_core::load_devfile(&path) {
        Ok(devfile) => checks.push(Check::pass(
            "devfile",
            &format!(
                "Devfile valid: {} ({} components, {} commands)",
                devfile.metadata.name,
                devfile.components.len(),
                devfile.commands.len()
            ),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("devfile", &format!("Devfile invalid: {e}")));
        }
    }
}

fn check_env_info(inv: &Invocation, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let layout = ContextLayout::new(&inv.context);
    if !layout.env_file().exists() {
        checks.push(Check::info(
            "env_info",
            "Component state not initialized (will be created on first push)",
        ));
        return;
    }
    match EnvInfoFile::load(layout) {
        Ok(env) => {
            let mode = env
                .snapshot()
                .run_mode
                .map_or_else(|| "never pushed".to_owned(), |m| format!("last pushed in {m} mode"));
            checks.push(Check::pass(
                "env_info",
                &format!(
                    "Component {} in namespace {}, {mode}",
                    env.get_name(),
                    env.get_namespace()
                ),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "env_info",
                &format!("Component state unreadable: {e}"),
            ));
        }
    }
}

fn check_platform(inv: &Invocation, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let namespace = inv.namespace.as_deref().unwrap_or(loam_core::DEFAULT_NAMESPACE);
    let platform = select_platform(inv.local_engine, namespace);
    let missing = check_prereqs(&platform);
    if missing.is_empty() {
        checks.push(Check::pass(
            "platform_prereqs",
            &format!("{} client tools available", platform.name()),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "platform_prereqs",
            &format!("Missing prerequisites: {}", format_missing(&missing)),
        ));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("loam doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => console::style("✓").green(),
                "fail" => console::style("✗").red(),
                _ => console::style("ℹ").cyan(),
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn pass(name: &'static str, message: &str) -> Self {
        Self {
            name,
            status: "pass",
            message: message.to_owned(),
        }
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self {
            name,
            status: "fail",
            message: message.to_owned(),
        }
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self {
            name,
            status: "info",
            message: message.to_owned(),
        }
    }
}
