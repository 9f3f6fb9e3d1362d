//! Todo Service Binary Entry Point
//!
//! Waits for the database, bootstraps the schema and then serves the HTTP API.
//! Core functionality is provided by the `todo_service` library crate.

use clap::Parser;
use std::sync::Arc;
use todo_service::{
    ConnectionManager, Connector, MemoryStore, PgConnector, SchemaBootstrapper,
    config::{AppConfig, DatabaseDriver},
    server::{AppState, create_router},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Todo Service - todo list HTTP API backed by PostgreSQL
#[derive(Parser, Debug)]
#[command(name = "todo-service", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (optional)
    #[arg(short, long, env = "TODO_CONFIG")]
    config: Option<String>,

    /// Server bind address (overrides config file)
    #[arg(long, env = "SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "SERVER_PORT")]
    server_port: Option<u16>,

    /// Database driver: postgres or memory (overrides config file)
    #[arg(long, env = "DB_DRIVER")]
    db_driver: Option<DatabaseDriver>,

    /// Database host (overrides config file)
    #[arg(long, env = "DB_HOST")]
    db_host: Option<String>,

    /// Database port (overrides config file)
    #[arg(long, env = "DB_PORT")]
    db_port: Option<u16>,

    /// Database name (overrides config file)
    #[arg(long, env = "DB_NAME")]
    db_name: Option<String>,

    /// Database user (overrides config file)
    #[arg(long, env = "DB_USER")]
    db_user: Option<String>,

    /// Database password (overrides config file)
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,
}

impl Cli {
    /// Apply CLI/env overrides (CLI > ENV > config file).
    fn apply(self, config: &mut AppConfig) {
        if let Some(bind) = self.server_bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.server_port {
            config.server.port = port;
        }
        if let Some(driver) = self.db_driver {
            config.database.driver = driver;
        }
        if let Some(host) = self.db_host {
            config.database.host = host;
        }
        if let Some(port) = self.db_port {
            config.database.port = port;
        }
        if let Some(name) = self.db_name {
            config.database.name = name;
        }
        if let Some(user) = self.db_user {
            config.database.user = user;
        }
        if let Some(password) = self.db_password {
            config.database.password = password;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,todo_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Todo Service");

    // Parse CLI arguments
    let mut cli = Cli::parse();

    // Load configuration from file, or start from defaults
    let mut config = match cli.config.take() {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            AppConfig::load(&path)?
        }
        None => AppConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    let params = config.database.connection_params();
    tracing::info!(
        "Server: {}:{}, Database: {} ({})",
        config.server.bind,
        config.server.port,
        params,
        config.database.driver,
    );

    let connector: Arc<dyn Connector> = match config.database.driver {
        DatabaseDriver::Postgres => Arc::new(PgConnector::new()),
        DatabaseDriver::Memory => {
            tracing::warn!("Using in-memory store; data will be lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    let connections =
        ConnectionManager::new(&params, connector).with_policy(config.database.connect_retry);

    // Create the schema before accepting traffic
    SchemaBootstrapper::new(connections.clone())
        .with_policy(config.database.bootstrap_retry)
        .ensure_schema()
        .await?;

    // Create web server state
    let app_state = AppState {
        connections: connections.with_policy(config.database.request_retry),
    };

    // Build Axum router
    let app = create_router(app_state);

    // Parse bind address
    let addr = config.server.socket_addr()?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
