use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::ParlayConfig;
use parlay_core::providers::azure::AzureProvider;
use parlay_core::providers::google::GoogleProvider;
use parlay_core::providers::StubProvider;
use parlay_core::{ChatOrchestrator, ChatRequest, ProviderGateway, ProviderKind};
use parlay_gateway::ApiServer;
use parlay_store::{AuditLog, SqliteStore};

#[derive(Parser)]
#[command(name = "parlay")]
#[command(version)]
#[command(about = "Parlay — a prompt-routing AI gateway")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve,

    /// Send a one-shot prompt through the orchestrator
    Ask {
        /// The prompt to route
        prompt: String,

        /// Provider tag to route to
        #[arg(short, long, default_value = "google")]
        provider: String,

        /// Caller identity recorded with the interaction
        #[arg(short, long, default_value = "default_user")]
        user: String,
    },

    /// Verify store and provider wiring
    Check,

    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(cli.config.as_deref()),
        Commands::Serve => cmd_serve(cli.config.as_deref()).await,
        Commands::Check => cmd_check(cli.config.as_deref()).await,
        Commands::Ask {
            prompt,
            provider,
            user,
        } => cmd_ask(cli.config.as_deref(), prompt, provider, user).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        info!("Created default config at {}", config_path.display());
    }

    println!("Parlay initialized at {}", config_dir.display());
    println!(
        "Edit {} to configure provider keys, or export GEMINI_API_KEY / AZURE_OPENAI_API_KEY.",
        config_path.display()
    );
    Ok(())
}

fn cmd_config(config_path: Option<&Path>) -> Result<()> {
    let config = ParlayConfig::load(config_path)?;
    println!("{config:#?}");
    Ok(())
}

async fn cmd_serve(config_path: Option<&Path>) -> Result<()> {
    let config = ParlayConfig::load(config_path)?;
    let orchestrator = build_orchestrator(&config)?;

    let bind: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.server.bind))?;

    ApiServer::new(bind, orchestrator, config.server.system_name.clone())
        .run()
        .await
}

async fn cmd_ask(
    config_path: Option<&Path>,
    prompt: String,
    provider: String,
    user: String,
) -> Result<()> {
    let config = ParlayConfig::load(config_path)?;
    let orchestrator = build_orchestrator(&config)?;

    orchestrator.record_system_event(format!("CLI ask routed to '{provider}'"));

    let request = ChatRequest::new(prompt)
        .with_provider(provider)
        .with_user_id(user);
    let result = orchestrator.handle(request).await;

    // Let the background appends land before the process exits.
    orchestrator.drain().await;

    let response = result?;
    println!("{}", response.response);
    println!();
    println!("  session:  {}", response.session_id);
    println!("  provider: {}", response.provider);
    Ok(())
}

async fn cmd_check(config_path: Option<&Path>) -> Result<()> {
    let config = ParlayConfig::load(config_path)?;

    println!("\n  Parlay system check\n  ───────────────────\n");

    let db_path = config.store.resolved_db_path();
    let store = open_store(&config)?;
    let events = store.recent_events(1).await?;
    println!(
        "  store: ok at {} ({} recent audit event(s) readable)",
        db_path.display(),
        events.len()
    );

    let google_wired = config
        .providers
        .google
        .as_ref()
        .is_some_and(|g| !g.api_key.is_empty());
    let azure_wired = config
        .providers
        .azure
        .as_ref()
        .is_some_and(|a| !a.api_key.is_empty() && !a.endpoint.is_empty());

    println!(
        "  provider google: {}",
        if google_wired { "wired" } else { "degraded (stub)" }
    );
    println!(
        "  provider azure:  {}",
        if azure_wired { "wired" } else { "degraded (stub)" }
    );

    Ok(())
}

/// Composition root: SQLite store below, providers beside, orchestrator on top.
fn build_orchestrator(config: &ParlayConfig) -> Result<Arc<ChatOrchestrator>> {
    let store = open_store(config)?;
    let providers = build_providers(config)?;
    Ok(Arc::new(ChatOrchestrator::new(
        providers,
        store.clone(),
        store,
        (&config.orchestrator).into(),
    )))
}

fn open_store(config: &ParlayConfig) -> Result<Arc<SqliteStore>> {
    let db_path = config.store.resolved_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create store dir: {}", parent.display()))?;
    }
    Ok(Arc::new(SqliteStore::new(&db_path)?))
}

/// Register every routable tag. A tag without working credentials gets the
/// labeled stub so routing stays total over the fixed provider set.
fn build_providers(config: &ParlayConfig) -> Result<ProviderGateway> {
    let mut gateway = ProviderGateway::new();

    match &config.providers.google {
        Some(google) if !google.api_key.is_empty() => {
            gateway.register(
                ProviderKind::Google,
                Arc::new(GoogleProvider::new(
                    google.api_key.clone(),
                    google.model.clone(),
                    google.max_tokens,
                )?),
            );
        }
        _ => {
            warn!("Google provider has no API key; registering stub");
            gateway.register(ProviderKind::Google, Arc::new(StubProvider::new("google")));
        }
    }

    match &config.providers.azure {
        Some(azure) if !azure.api_key.is_empty() && !azure.endpoint.is_empty() => {
            gateway.register(
                ProviderKind::Azure,
                Arc::new(AzureProvider::new(
                    azure.api_key.clone(),
                    azure.endpoint.clone(),
                    azure.deployment.clone(),
                    azure.api_version.clone(),
                    azure.max_tokens,
                )?),
            );
        }
        _ => {
            warn!("Azure provider has no API key or endpoint; registering stub");
            gateway.register(ProviderKind::Azure, Arc::new(StubProvider::new("azure")));
        }
    }

    Ok(gateway)
}
