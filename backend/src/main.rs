//! Card Stock Tracker - Backend Server
//!
//! Receives stock into batches, issues it out again and reports on cost,
//! revenue and activity for the CARDS and INVENTORY modes.

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod middleware;
mod repositories;
mod routes;
mod services;

pub use config::Config;
use services::UploadStorage;

/// Files accepted in a single multipart request
const MAX_FILES_PER_REQUEST: u64 = 10;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub storage: UploadStorage,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    init_tracing();

    let config = config::Config::load()?;

    tracing::info!("Starting Card Stock Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Default system mode: {}", config.system_mode);
    if config.api_key.is_none() {
        tracing::warn!("API_KEY is not set; the API accepts unauthenticated requests");
    }

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.is_development() {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let storage = UploadStorage::new(&config.upload);
    storage.ensure_dir().await?;
    tracing::info!("Storing uploads in {}", config.upload.dir);

    // Create application state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        storage,
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `LOG_FORMAT=json` switches to structured JSON lines
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stock_server=debug,tower_http=debug,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Multipart bodies carry several files; each file is checked on its own while streaming
fn request_body_limit(max_file_size: u64) -> usize {
    let limit = max_file_size
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(1024 * 1024);
    usize::try_from(limit).unwrap_or(usize::MAX)
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = request_body_limit(state.storage.max_file_size());

    let api = routes::api_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::api_key_middleware,
    ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        // Applied as its own (innermost) layer so its response body is boxed
        // into axum's `Body` before reaching CORS, which requires `Default`.
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new())
                .layer(DefaultBodyLimit::disable()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_limit() {
        assert_eq!(request_body_limit(1024), 10 * 1024 + 1024 * 1024);
        assert_eq!(request_body_limit(u64::MAX), usize::MAX);
    }
}
