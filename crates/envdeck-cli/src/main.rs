use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "envdeck")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Local console for a browser-profile manager",
    long_about = "Envdeck drives a browser-profile manager through its local API, attaches a \
                  remote-debugging client to launched browsers, and serves a REST API for \
                  environment lifecycle, element inspection, and AI-assisted commands."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST service
    Serve {
        /// Listen port (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to a JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Probe the profile-manager API and report what it finds
    Check {
        /// Path to a JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List environments known to the profile manager
    Envs {
        /// Path to a JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Filter by group id
        #[arg(long)]
        group: Option<String>,

        /// List the groups instead of the environments
        #[arg(long, conflicts_with = "group")]
        groups: bool,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve { port, config } => commands::serve::execute(port, config),
        Commands::Check { config } => commands::check::execute(config),
        Commands::Envs {
            config,
            group,
            groups,
            json,
        } => commands::envs::execute(config, group, groups, json),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "envdeck=debug,envdeck_core=debug,envdeck_client=debug,envdeck_browser=debug,\
             envdeck_ai=debug,envdeck_server=debug",
        )
    } else {
        EnvFilter::new("envdeck=info,envdeck_server=info,envdeck_client=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
