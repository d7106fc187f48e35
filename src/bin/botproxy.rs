//! BotProxy CLI
//!
//! Connects to a OneBot gateway and prints decoded messages to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use botproxy::config::{self, Config, LogConfig, LogFormat};
use botproxy::core::{MessageSink, StdoutSink};
use botproxy::gateway::WsConnector;
use botproxy::subscription::ForwardHandler;
use botproxy::supervisor::Supervisor;
use botproxy::VERSION;

#[derive(Parser)]
#[command(
    name = "botproxy",
    author = "BotProxy Contributors",
    version = VERSION,
    about = "BotProxy - OneBot gateway client",
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $BOTPROXY_CONFIG or <config dir>/botproxy/config.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the gateway and forward messages (default)
    Run {
        /// Gateway WebSocket URL
        #[arg(long)]
        url: Option<String>,

        /// Access token
        #[arg(long)]
        token: Option<String>,
    },

    /// Validate the configuration and report issues
    CheckConfig,

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();

    match cli.command.unwrap_or(Commands::Run { url: None, token: None }) {
        Commands::Run { url, token } => {
            let mut config = load(config_path.as_deref())?;
            if let Some(url) = url {
                config.gateway.url = url;
            }
            if let Some(token) = token {
                config.gateway.access_token = SecretString::from(token);
            }
            init_logging(&config.log);
            run(config).await
        }
        Commands::CheckConfig => {
            let config = load(config_path.as_deref())?;
            check_config(&config)
        }
        Commands::InitConfig { force } => {
            init_config(config_path.unwrap_or_else(config::config_path), force)
        }
    }
}

fn load(path: Option<&std::path::Path>) -> Result<Config> {
    config::load_config(path).context("Failed to load configuration")
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_new(&log.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match log.format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

async fn run(config: Config) -> Result<()> {
    let validation = config::validate_config(&config);
    for issue in &validation.warnings {
        warn!("Config: {}", issue);
    }
    if !validation.valid {
        for issue in &validation.errors {
            error!("Config: {}", issue);
        }
        bail!("Invalid configuration ({} error(s))", validation.errors.len());
    }

    let connector = WsConnector::from_config(&config.gateway);
    let mut supervisor = Supervisor::from_config(connector, &config);

    let sink: Arc<dyn MessageSink> = Arc::new(StdoutSink);
    let subscriptions = config.subscribed_types();
    for event_type in &subscriptions {
        supervisor.subscribe(event_type.clone(), Arc::new(ForwardHandler::new(sink.clone())));
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                signal.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    info!("BotProxy v{} forwarding {:?}", VERSION, subscriptions);
    supervisor.run(shutdown).await?;
    info!("BotProxy shutdown complete");
    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    let result = config::validate_config(config);

    for issue in &result.errors {
        println!("error:   {}", issue);
    }
    for issue in &result.warnings {
        println!("warning: {}", issue);
    }

    if !result.valid {
        bail!("Configuration has {} error(s)", result.errors.len());
    }
    println!("Configuration OK ({})", config.gateway.url);
    Ok(())
}

fn init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::save_config(&Config::default(), &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    println!("Set BOTPROXY_ACCESS_TOKEN to supply the access token.");
    Ok(())
}
