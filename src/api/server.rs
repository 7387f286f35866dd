//! HTTP server: router, middleware and lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::handlers::{self, AppState};
use crate::config::ServerConfig;
use crate::db::Database;

/// Trading journal HTTP server.
pub struct JournalServer {
    config: ServerConfig,
    db: Arc<Database>,
}

impl JournalServer {
    pub fn new(config: ServerConfig, db: Database) -> Self {
        Self {
            config,
            db: Arc::new(db),
        }
    }

    /// Bind and serve until Ctrl+C.
    pub async fn start(self) -> Result<()> {
        let addr = self.config.bind_address()?;
        let app = router(&self.config, Arc::clone(&self.db));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to address {}", addr))?;

        info!(address = %addr, "Trading journal API listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("Server stopped");
        Ok(())
    }
}

/// Build the application router with all routes and middleware.
pub fn router(config: &ServerConfig, db: Arc<Database>) -> Router {
    let state = AppState { db };

    let trades = get(handlers::list_trades).post(handlers::create_trade);
    let trade = get(handlers::get_trade)
        .put(handlers::update_trade)
        .delete(handlers::delete_trade);

    let mut app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/trades", trades.clone())
        .route("/trades/", trades)
        .route("/trades/stats/summary", get(handlers::stats_summary))
        .route("/trades/:trade_id", trade)
        .with_state(state);

    if let Some(dir) = &config.static_dir {
        info!(dir = %dir.display(), "Serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
}

/// CORS for the configured browser origins, credentials allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    // Credentialed CORS cannot use a literal wildcard, so "*" mirrors the caller
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, run until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
