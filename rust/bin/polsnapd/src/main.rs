//! `polsnapd` — the policy snapshot server binary.
//!
//! Usage:
//!   polsnapd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/polsnap/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use polsnap_core::Module;
use polsnap_policy::PolicyModule;
use polsnap_policy::fetch::{ControllerClient, ControllerConfig, PolicyFetcher};
use tracing::{info, warn};

use config::ServerConfig;

/// Policy snapshot server.
#[derive(Parser, Debug)]
#[command(name = "polsnapd", about = "Policy snapshot server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:5001).
    #[arg(long = "listen", default_value = "0.0.0.0:5001")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    server_config.verify()?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = polsnap_core::ServiceConfig {
        data_dir: Some(data_dir.clone()),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let sql: Arc<dyn polsnap_sql::SQLStore> = Arc::new(
        polsnap_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    // Build the controller client.
    if server_config.controller.insecure_skip_verify {
        warn!("Controller certificate verification is disabled by configuration");
    }
    let fetcher: Arc<dyn PolicyFetcher> = Arc::new(
        ControllerClient::new(&ControllerConfig {
            url: server_config.controller.url.clone(),
            insecure_skip_verify: server_config.controller.insecure_skip_verify,
        })
        .map_err(|e| anyhow::anyhow!("failed to build controller client: {}", e))?,
    );

    // Initialize the policy module (runs schema migration).
    let policy_module = PolicyModule::new(Arc::clone(&sql), fetcher)?;
    info!("Policy module initialized");

    let module_routes = vec![(policy_module.name(), policy_module.routes())];

    // Build router.
    let app = routes::build_router(module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("polsnap server listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
