#![deny(unsafe_code)]

//! Concierge CLI: run the service, or talk to the pipeline from a terminal.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use concierge_config::AppConfig;
use concierge_core::Daemon;

/// Concierge: answers questions directly or through discovered tools.
#[derive(Parser)]
#[command(name = "concierge", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "concierge.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP and WebSocket API.
    Serve,

    /// Answer one query in-process and exit.
    Ask {
        /// The question to ask.
        query: String,

        /// Session to attribute the exchange to.
        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Run tool discovery and list what was found.
    Tools,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration (the API key is never printed).
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, from_file) = load_config(&cli.config).await?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, &config.logging.level))),
        )
        .init();

    if !from_file {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match cli.command {
        Commands::Serve => cmd_serve(config).await,
        Commands::Ask { query, session } => cmd_ask(config, &session, &query).await,
        Commands::Tools => cmd_tools(config).await,
        Commands::Config { show } => cmd_config(&cli.config, config, show),
    }
}

/// `-v` flags win over the configured level.
fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

async fn cmd_serve(config: AppConfig) -> Result<()> {
    let daemon = Daemon::from_config(config)?;
    daemon.run().await?;
    Ok(())
}

async fn cmd_ask(config: AppConfig, session: &str, query: &str) -> Result<()> {
    let daemon = Daemon::from_config(config)?;
    let outcome = daemon.build_orchestrator().run(session, query).await;
    println!("{}", outcome.text);
    if let Some(kind) = outcome.error_kind {
        anyhow::bail!("request failed ({kind})");
    }
    Ok(())
}

async fn cmd_tools(config: AppConfig) -> Result<()> {
    let daemon = Daemon::from_config(config)?;
    let orchestrator = daemon.build_orchestrator();
    let registry = orchestrator.registry();
    if !registry.is_enabled() {
        println!("Tool discovery is disabled.");
        return Ok(());
    }

    let tools = registry.ensure_loaded().await;
    if tools.is_empty() {
        println!("No tools discovered at {}.", daemon.config().discovery.base_url);
    }
    for tool in tools.iter() {
        println!("{:<24} {}", tool.name, tool.description);
    }
    Ok(())
}

fn cmd_config(path: &Path, config: AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(&config).context("serializing configuration")?;
        println!("{toml_str}");
    } else {
        config.require_api_key()?;
        println!("Configuration at '{}' is valid.", path.display());
    }
    Ok(())
}

/// Read the file when present, otherwise start from defaults; environment
/// overrides apply either way.
async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    let from_file = path.exists();
    let mut config = if from_file {
        AppConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        AppConfig::default()
    };
    config.apply_env()?;
    Ok((config, from_file))
}
