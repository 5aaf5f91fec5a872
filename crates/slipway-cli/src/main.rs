mod cmd;
mod output;
mod stackfile;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "slipway",
    about = "Health-gated service stack supervisor — units, dependencies, and readiness gates from a slipway.yaml",
    version,
    propagate_version = true
)]
struct Cli {
    /// Stack file (default: search slipway.yaml upward from the current directory)
    #[arg(long, global = true, env = "SLIPWAY_FILE")]
    file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a slipway.yaml in the current directory
    Init,

    /// Start the stack and supervise it until interrupted
    Up {
        /// Port for the status API (0 = OS-assigned)
        #[arg(long, default_value = "7420")]
        api_port: u16,

        /// Don't serve the status API
        #[arg(long)]
        no_api: bool,
    },

    /// Stop a running stack
    Down {
        /// Also remove named volumes
        #[arg(long)]
        volumes: bool,
    },

    /// Show unit status of a running stack
    Ps,

    /// Inspect and validate the stack file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Up { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let file = cli.file.as_deref();
    let result = match cli.command {
        Commands::Init => {
            stackfile::init_target(file).map_err(Into::into).and_then(|t| cmd::init::run(&t))
        }
        Commands::Up { api_port, no_api } => stackfile::resolve(file)
            .map_err(Into::into)
            .and_then(|f| cmd::up::run(&f, api_port, no_api)),
        Commands::Down { volumes } => stackfile::resolve(file)
            .map_err(Into::into)
            .and_then(|f| cmd::down::run(&f, volumes)),
        Commands::Ps => stackfile::resolve(file)
            .map_err(Into::into)
            .and_then(|f| cmd::ps::run(&f, cli.json)),
        Commands::Config { subcommand } => stackfile::resolve(file)
            .map_err(Into::into)
            .and_then(|f| cmd::config::run(&f, subcommand, cli.json)),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
