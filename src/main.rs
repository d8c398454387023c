//! loan_tracker - Personal loan tracking backend API
//!
//! Admin backend for beneficiaries, the loans made to them and the
//! payments received against those loans.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loan_tracker::api::{self, AppState};
use loan_tracker::auth::{hash_password, TokenService};
use loan_tracker::config::{Config, StorageBackend};
use loan_tracker::db;
use loan_tracker::messages::Messages;
use loan_tracker::store::{MemoryStore, PgStore};

/// Initialize tracing/logging. Production writes JSON lines.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "loan_tracker=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres backend"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await?;

    db::verify_connection(&pool).await?;
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");
    Ok(pool)
}

/// Memory backend, seeded with the admin credential when one is configured
fn memory_store(config: &Config) -> anyhow::Result<MemoryStore> {
    let store = MemoryStore::new();
    match (&config.admin_login, &config.admin_password) {
        (Some(login), Some(password)) => {
            store.add_user(login, &hash_password(password)?)?;
            tracing::info!(login = %login, "Seeded admin user");
        }
        _ => tracing::warn!("ADMIN_LOGIN/ADMIN_PASSWORD not set, nobody can log in"),
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.is_production());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(?config, "Starting loan_tracker server");

    let tokens = Arc::new(TokenService::new(config.jwt_secret.as_bytes()));
    let messages = Messages::bundled(config.default_locale.clone());

    let mut pool = None;
    let state = match config.storage_backend {
        StorageBackend::Postgres => {
            let connected = connect(&config).await?;
            let store = PgStore::new(connected.clone());
            pool = Some(connected);
            AppState::new(store, tokens, messages, config.max_image_bytes)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on shutdown");
            let store = memory_store(&config)?;
            AppState::new(store, tokens, messages, config.max_image_bytes)
        }
    };

    let app = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
