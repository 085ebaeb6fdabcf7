use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use volume_refill::commands::{self, Overrides};

#[derive(Parser)]
#[command(name = "volume-refill")]
#[command(about = "Watches a mobile contract's high-speed data volume and refills it before it runs out")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor the contract and refill automatically (default)
    Run,
    /// Show the current consumption once
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Log in and store the session for later runs
    Login,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);
    let json = matches!(command, Commands::Status { json: true });

    let config = match commands::load_config(&cli.overrides) {
        Ok(config) => config,
        Err(e) => handle_error(e, json),
    };

    let result = match command {
        Commands::Run => commands::run_monitor(config).await,
        Commands::Status { json } => commands::show_status(config, json).await,
        Commands::Login => commands::run_login(config).await,
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => handle_error(e, json),
    }
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
    } else {
        eprintln!("Error: {e:#}");
    }
    process::exit(1);
}
