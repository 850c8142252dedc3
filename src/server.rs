//! HTTP server bootstrap.
//!
//! Wires together configuration, the database pool, the core services
//! (cart store, inventory ledger, order store, payment reconciler) and the
//! axum router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api;
use crate::api::handlers::health;
use crate::crypto::WebhookVerifier;
use crate::infra::{
    CartStore, InventoryLedger, InventorySummaryCache, LogEventSink, OrderStore, PgCartStore,
    PgInventoryLedger, PgOrderStore,
};
use crate::payment::{PaymentProvider, PaymentReconciler};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Maximum database connections.
    pub max_connections: u32,
    /// Quantities at or below this count as low stock.
    pub low_stock_threshold: i64,
    /// Shared secret for payment callback signatures.
    pub payment_webhook_secret: String,
    /// TTL for cached inventory projections.
    pub summary_cache_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/commerce_core".to_string());

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address: {e}"))?;

        let max_connections: u32 = std::env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(10);

        let low_stock_threshold: i64 = std::env::var("LOW_STOCK_THRESHOLD")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5);

        let payment_webhook_secret = std::env::var("PAYMENT_WEBHOOK_SECRET")
            .map_err(|_| anyhow::anyhow!("PAYMENT_WEBHOOK_SECRET is required"))?;

        let summary_cache_ttl = std::env::var("SUMMARY_CACHE_TTL_SECS")
            .ok()
            .and_then(|p| p.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        Ok(Self {
            database_url,
            listen_addr,
            max_connections,
            low_stock_threshold,
            payment_webhook_secret,
            summary_cache_ttl,
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<dyn CartStore>,
    pub inventory: Arc<dyn InventoryLedger>,
    pub orders: Arc<dyn OrderStore>,
    pub reconciler: Arc<PaymentReconciler>,
}

impl AppState {
    /// Build the full service graph on top of a connected pool.
    pub fn new(
        pool: sqlx::PgPool,
        config: &Config,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        // The summary cache is owned here and handed into the ledger,
        // which calls its invalidation hooks on every stock mutation.
        let summary_cache = Arc::new(InventorySummaryCache::new(16, config.summary_cache_ttl));

        let carts = Arc::new(PgCartStore::new(pool.clone()));
        let inventory = Arc::new(PgInventoryLedger::new(
            pool.clone(),
            config.low_stock_threshold,
            summary_cache,
        ));
        let orders: Arc<dyn OrderStore> =
            Arc::new(PgOrderStore::new(pool, Arc::new(LogEventSink)));
        let verifier = WebhookVerifier::new(&config.payment_webhook_secret);
        let reconciler = Arc::new(PaymentReconciler::new(provider, orders.clone(), verifier));

        Self {
            carts,
            inventory,
            orders,
            reconciler,
        }
    }
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initialize tracing from `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Connect, migrate, and serve until shutdown.
pub async fn run(config: Config, provider: Arc<dyn PaymentProvider>) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    crate::migrations::run_postgres(&pool).await?;

    let state = AppState::new(pool, &config, provider);
    let router = app(state);

    info!(addr = %config.listen_addr, "commerce core listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install ctrl-c handler");
    }
}
