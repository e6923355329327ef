mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{push::PushArgs, Invocation, EXIT_FAILURE};
use loam_runtime::{check_prereqs, format_missing, select_platform, PlatformContext};
use loam_store::Preferences;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "loam",
    version,
    about = "Iterative build, run, debug and test of devfile components on a cluster or local container engine"
)]
struct Cli {
    /// Component directory holding the devfile and `.loam` state.
    #[arg(long, default_value = ".", global = true)]
    context: PathBuf,

    /// Path to the devfile (default: <context>/devfile.toml).
    #[arg(long, global = true)]
    devfile: Option<PathBuf>,

    /// Cluster namespace (default: the one recorded for the component).
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or update the component and run its build and run commands.
    Push {
        /// Rebuild even if sources are unchanged.
        #[arg(long, default_value_t = false)]
        force_build: bool,
        /// Start the debug command instead of the run command.
        #[arg(long, default_value_t = false)]
        debug: bool,
        /// Show the output of the executed commands.
        #[arg(long, default_value_t = false)]
        show_log: bool,
        /// Build command to use instead of the default.
        #[arg(long)]
        build_command: Option<String>,
        /// Run command to use instead of the default.
        #[arg(long)]
        run_command: Option<String>,
        /// Debug command to use instead of the default.
        #[arg(long)]
        debug_command: Option<String>,
        /// Additional ignore rule for source sync (repeatable).
        #[arg(long)]
        ignore: Vec<String>,
    },
    /// Show the output of the component's run (or debug) command.
    Log {
        /// Keep streaming new output.
        #[arg(short, long, default_value_t = false)]
        follow: bool,
        /// Show the debug command's output.
        #[arg(long, default_value_t = false)]
        debug: bool,
        /// Only show the last N lines (ignored with --follow).
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Delete the component's resources from the cluster.
    Delete {
        /// Show the resources being removed.
        #[arg(long, default_value_t = false)]
        show_log: bool,
    },
    /// Run a command in the component's source container.
    Exec {
        /// Command and arguments to run.
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },
    /// Run the component's test command.
    Test {
        /// Test command to run instead of the default.
        #[arg(long, alias = "name")]
        test_command: Option<String>,
        /// Show the output of the test command.
        #[arg(long, default_value_t = false)]
        show_log: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
    /// Check the devfile, component state and platform tools.
    Doctor,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LOAM_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let local_engine = match Preferences::load_default().and_then(|p| p.effective_push_target()) {
        Ok(target) => {
            tracing::debug!("push target: {target}");
            target.is_local_engine()
        }
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let inv = Invocation {
        context: cli.context,
        devfile: cli.devfile,
        namespace: cli.namespace,
        json: cli.json,
        local_engine,
    };

    // Structured mode leaves missing tools to adapter construction so the
    // failure still arrives as a single event.
    if let Some(platform) = platform_for(&cli.command, &inv) {
        if !inv.json && std::env::var("LOAM_SKIP_PREREQS").as_deref() != Ok("1") {
            let missing = check_prereqs(&platform);
            if !missing.is_empty() {
                eprintln!("error: {}", format_missing(&missing));
                return ExitCode::from(EXIT_FAILURE);
            }
        }
    }

    let result = match cli.command {
        Commands::Push {
            force_build,
            debug,
            show_log,
            build_command,
            run_command,
            debug_command,
            ignore,
        } => commands::push::run(
            &inv,
            PushArgs {
                force_build,
                debug,
                show_log,
                build_command,
                run_command,
                debug_command,
                ignore,
            },
        ),
        Commands::Log {
            follow,
            debug,
            tail,
        } => commands::log::run(&inv, follow, debug, tail),
        Commands::Delete { show_log } => commands::delete::run(&inv, show_log),
        Commands::Exec { command } => commands::exec::run(&inv, command),
        Commands::Test {
            test_command,
            show_log,
        } => commands::test::run(&inv, test_command, show_log),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
        Commands::Doctor => commands::doctor::run(&inv),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Platform a verb will talk to, for the prerequisite check.
fn platform_for(command: &Commands, inv: &Invocation) -> Option<PlatformContext> {
    let namespace = inv
        .namespace
        .as_deref()
        .unwrap_or(loam_core::DEFAULT_NAMESPACE);
    match command {
        Commands::Push { .. } | Commands::Log { .. } | Commands::Test { .. } => {
            Some(select_platform(inv.local_engine, namespace))
        }
        Commands::Delete { .. } | Commands::Exec { .. } => Some(PlatformContext::Cluster {
            namespace: namespace.to_owned(),
        }),
        Commands::Completions { .. } | Commands::ManPages { .. } | Commands::Doctor => None,
    }
}
