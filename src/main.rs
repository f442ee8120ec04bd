//! MaxChat - interactive terminal chat for a local Ollama server
//!
#![doc = "Main entry point for the MaxChat application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use maxchat::cli::Cli;
use maxchat::commands;
use maxchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    commands::chat::run_chat(config).await
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never interleave with streamed replies.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "maxchat=debug" } else { "maxchat=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
