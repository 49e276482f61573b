//! Orbit CLI - Opinionated tooling for building and running Nebula WordPress sites

use clap::Parser;

use orbit_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
