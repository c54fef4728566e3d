//! Dockyard - operator console for a Dokku host

#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;
use dockyard_cli::cli::Cli;
use dockyard_cli::domain::DokkuError;
use dockyard_cli::output::json::format_error;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,dockyard_audit=info";

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    if let Err(e) = cli.run().await {
        let code = e.downcast_ref::<DokkuError>().map_or("ERROR", DokkuError::code);
        match format_error(&e.to_string(), code) {
            Ok(text) if json => println!("{text}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}
