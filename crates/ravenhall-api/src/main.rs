//! Ravenhall API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ravenhall_core::clock::SystemClock;
use ravenhall_dialogue::client::WorkflowClient;
use ravenhall_dialogue::retry::{ResilientProvider, RetryConfig};
use ravenhall_content::catalog::YamlScriptCatalog;
use ravenhall_session_store::pg_session_store::PgSessionStore;

use ravenhall_api::routes;
use ravenhall_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Ravenhall API server");

    // Read configuration from environment.
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| "DATABASE_URL environment variable must be set")?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| format!("PORT must be a valid u16: {e}"))?;
    let workflow_url = std::env::var("WORKFLOW_API_URL")
        .map_err(|_| "WORKFLOW_API_URL environment variable must be set")?;
    let monologue_key = std::env::var("WORKFLOW_MONOLOGUE_KEY")
        .map_err(|_| "WORKFLOW_MONOLOGUE_KEY environment variable must be set")?;
    let qna_key = std::env::var("WORKFLOW_QNA_KEY")
        .map_err(|_| "WORKFLOW_QNA_KEY environment variable must be set")?;
    let scripts_dir = std::env::var("SCRIPTS_DIR").unwrap_or_else(|_| "scripts".to_string());

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    // Build application state.
    let client = WorkflowClient::new(&workflow_url, &monologue_key, &qna_key);
    let dialogue = ResilientProvider::new(Arc::new(client), RetryConfig::default());
    let app_state = AppState::new(
        Arc::new(PgSessionStore::new(pool)),
        Arc::new(dialogue),
        Arc::new(SystemClock),
        Arc::new(YamlScriptCatalog::new(scripts_dir)),
    );

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/sessions", routes::session::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
