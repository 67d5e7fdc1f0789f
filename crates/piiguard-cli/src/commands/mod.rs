pub mod analyze;
pub mod config;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use piiguard_client::{ClientOptions, HttpAnalysisService};
use piiguard_config::Config;
use piiguard_engine::UploadOrchestrator;

use crate::cli::Cli;

/// Load config (explicit file or default location) and apply command-line overrides
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(server) = &cli.server {
        config.server.base_url = server.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.server.timeout_secs = timeout;
    }

    Ok(config)
}

pub fn build_orchestrator(config: &Config) -> Result<UploadOrchestrator> {
    let options = ClientOptions {
        base_url: config.server.base_url.clone(),
        api_prefix: config.server.api_prefix.clone(),
        timeout: config.server.timeout(),
        user_agent: config.server.user_agent.clone(),
    };
    let service = HttpAnalysisService::new(&options)?;

    Ok(UploadOrchestrator::new(
        Arc::new(service),
        config.server.timeout(),
    ))
}

/// Write the current redacted image to `dest`. Returns false if there is none.
pub async fn save_redacted(orchestrator: &UploadOrchestrator, dest: &Path) -> Result<bool> {
    match orchestrator.redacted_image() {
        Some(bytes) => {
            tokio::fs::write(dest, bytes).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
