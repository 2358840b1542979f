//! specrepo CLI - split OpenAPI/Swagger repositories.
//!
//! Provides commands for:
//! - `serve`: Serve bundled specs and accept edited documents
//! - `bundle`: Assemble the full document from a spec root
//! - `sync`: Write a document back into a spec root

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BundleArgs, ServeArgs, SyncArgs};
use error::CliError;
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// specrepo - split OpenAPI/Swagger repositories.
#[derive(Parser)]
#[command(name = "specrepo", version, about)]
struct Cli {
    /// Enable verbose output (info-level logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the spec server.
    Serve(ServeArgs),
    /// Bundle a spec root into a single document.
    Bundle(BundleArgs),
    /// Sync a document into a spec root.
    Sync(SyncArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => serve(args),
        Commands::Bundle(args) => args.execute(),
        Commands::Sync(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn serve(args: ServeArgs) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(args.execute(VERSION))
}
