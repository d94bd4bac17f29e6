//! Strata CLI - operator tooling for the storage volume registry.
//!
//! Loads a JSON cloud storage configuration, checks it, bootstraps the
//! builtin volume into a SQLite volume directory and inspects the journal
//! kept next to it.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(about = "Operator CLI for the Strata storage volume registry")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Cloud storage configuration file (JSON). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the volume directory database and the journal
    #[arg(long, global = true, default_value = ".")]
    state_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and print the resolved builtin volume
    Validate,

    /// Create the builtin storage volume if it does not exist
    Bootstrap,

    /// List storage volumes
    List,

    /// Show one storage volume
    Show {
        /// Volume name
        name: String,
    },

    /// Replay the journal and print the resulting bindings
    Replay,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    debug!("State directory: {}", args.state_dir.display());

    let config = commands::load_config(args.config.as_deref())?;
    let output = match args.command {
        Command::Validate => commands::validate(&config)?,
        Command::Bootstrap => commands::bootstrap(&config, &args.state_dir)?,
        Command::List => commands::list(&config, &args.state_dir)?,
        Command::Show { name } => commands::show(&config, &args.state_dir, &name)?,
        Command::Replay => commands::replay(&config, &args.state_dir)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
