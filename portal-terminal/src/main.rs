mod prompt;
mod render;
mod screens;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use expert_portal::{
    ChannelNavigator, FileLocalStore, HttpExpertApi, PortalConfig, Route, SessionManager,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::screens::Portal;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal client for the expert portal")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Portal API root, e.g. http://localhost:3046/api
    #[arg(long)]
    api_url: Option<String>,

    /// File backing the local session store
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the portal at a screen path (defaults to /login)
    Run {
        #[arg(default_value = "/login")]
        path: String,
    },
    /// Clear the stored session and exit
    Logout,
}

/// Initialize tracing on stderr so log lines never interleave with prompts
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "expert_portal=warn,portal_terminal=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

fn load_config(cli: &Cli) -> Result<PortalConfig> {
    let mut config =
        PortalConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &cli.api_url {
        config = config
            .with_overrides(|key| (key == "EXPERT_API_URL").then(|| url.clone()))
            .context("Invalid --api-url")?;
    }
    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let store = Arc::new(FileLocalStore::new(config.store_path.clone()));
    let sessions = SessionManager::new(store);

    let path = match cli.command {
        Some(Command::Logout) => {
            sessions.end().await.context("Failed to clear session")?;
            println!("Signed out.");
            return Ok(());
        }
        Some(Command::Run { path }) => path,
        None => "/login".to_string(),
    };
    let start = Route::parse(&path).with_context(|| format!("Unknown screen: {}", path))?;

    let api = Arc::new(HttpExpertApi::new(&config).context("Failed to build HTTP client")?);
    let (navigator, routes) = ChannelNavigator::new();

    info!(api_url = %api.base_url(), store = %config.store_path.display(), "Starting portal");

    Portal::new(api, sessions, Arc::new(navigator), routes, config)
        .run(start)
        .await
}
