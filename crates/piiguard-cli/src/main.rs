mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let config = commands::load_config(&cli)?;

    match cli.command {
        cli::Commands::Analyze {
            file,
            save_redacted,
            json,
        } => commands::analyze::handle(&config, file, save_redacted, json).await,
        cli::Commands::Session => commands::session::handle(&config).await,
        cli::Commands::Config(config_cmd) => commands::config::handle(config_cmd, &config),
    }
}
