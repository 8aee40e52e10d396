//! Relay Server
//!
//! A CLI tool and HTTP server that forwards blockchain-data and fiat-onramp
//! requests from a client application to third-party providers (Moralis,
//! Alchemy, Transak), normalizing responses into a `{data, source}` envelope.
//!
//! ```sh
//! relay init              # Generate default config.toml
//! relay serve             # Start the server
//! ```

mod chain;
mod cmd;
mod config;
mod cursor;
mod error;
mod provider;
mod relay;
mod routes;
mod signal;
mod telemetry;

use clap::Parser;
use cmd::{Cli, Commands};

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { output, force } => cmd::init::run(&output, force),
        Commands::Serve { config } => cmd::serve::run(&config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
