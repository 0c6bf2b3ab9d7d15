use std::path::PathBuf;

use clap::Parser;
use fleetsh::{Shell, ShellOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleetsh")]
#[command(about = "An interactive operations shell for managing a fleet of remote servers")]
#[command(version)]
struct Cli {
    /// Path to the config store's JSON document
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Enable verbose diagnostics
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" })))
        .with_writer(std::io::stderr)
        .init();

    let options = ShellOptions { config_path: cli.config, verbose: cli.verbose };

    let mut shell = match Shell::new(options) {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("{}", e.display_line());
            std::process::exit(1);
        }
    };

    let code = shell.run().await;
    std::process::exit(code);
}
