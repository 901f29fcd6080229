use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod dns;
mod error;
mod explain;
mod fetch;
mod handlers;
mod heuristics;
mod history;
mod html;
mod models;
mod probe;
mod tls;
mod walker;
mod whois;

#[cfg(test)]
mod test_support;

use auth::{JwtVerifier, TokenVerifier};
use history::{HistoryStore, HttpHistoryClient};
use probe::Probes;
use walker::RedirectChainWalker;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    /// Walks redirect chains; owns the DNS / TLS / registration probes.
    pub walker: RedirectChainWalker,
    /// Where analyses are persisted and read back from.
    pub history: Arc<dyn HistoryStore>,
    pub verifier: Arc<dyn TokenVerifier>,
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    let link_router = Router::new()
        .route("/analyze", post(handlers::link::analyze))
        .route("/details/:record_id", get(handlers::link::details));

    Router::new()
        // Health check: 200 OK, no auth required
        .route("/health", get(handlers::health))
        .nest("/link", link_router)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent; env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "link_analyser=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting link analyser on {}:{}", config.host, config.port);
    tracing::info!("History service: {}", config.history_service_url);

    // Build shared state
    let verifier = JwtVerifier::new(
        &config.jwt_key,
        config.jwt_audience.as_deref(),
        config.jwt_issuer.as_deref(),
    )?;
    let history = HttpHistoryClient::new(&config.history_service_url)?;
    let walker = RedirectChainWalker::new(Probes::live(&config)?, config.max_hops);
    let bind_addr = format!("{}:{}", config.host, config.port);

    let state = Arc::new(AppState {
        walker,
        history: Arc::new(history),
        verifier: Arc::new(verifier),
    });

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
