use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "piiguard")]
#[command(about = "Detect and redact PII in documents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Analysis service base URL (default from config: http://localhost:8000)
    #[arg(long, global = true, env = "PIIGUARD_SERVER")]
    pub server: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a single document (.pdf, .jpg, .jpeg, .png)
    Analyze {
        /// Document to upload
        file: PathBuf,

        /// Write the redacted image here (images only)
        #[arg(long)]
        save_redacted: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive session: select files and analyze them from stdin
    Session,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,
}
