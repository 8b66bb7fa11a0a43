//! Casegate CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use casegate::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => casegate::cli::commands::init::execute(args, cli.json).await,
        Commands::Case(args) => casegate::cli::commands::case::execute(args, cli.json).await,
        Commands::Verify(args) => casegate::cli::commands::verify::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        casegate::cli::handle_error(err, cli.json);
    }
}
