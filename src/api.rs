//! HTTP surface of the integral service
//!
//! - `POST /calculate-integral` integrates, explains and plots an expression
//! - `GET /get-graph` returns the last plot (per `X-Session-Id`, or the shared one)
//! - `GET /health`
pub mod errors;
/// keyword heuristic behind the step-by-step explanation
pub mod explanation;
pub mod graph_store;
pub mod handlers;

use crate::Utils::config::Config;
use axum::Router;
use axum::routing::{get, post};
use handlers::{AppState, calculate_integral, get_graph, health};
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Any origin, method and header with credentials. A wildcard cannot be combined with
/// credentials, so the request's own values are echoed back.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/calculate-integral", post(calculate_integral))
        .route("/get-graph", get(get_graph))
        .route("/health", get(health))
        .layer(cors_layer())
        .with_state(state)
}

/// Serves on an already bound listener until the task is dropped.
pub async fn serve_on(listener: TcpListener, config: &Config) -> std::io::Result<()> {
    let app = router(AppState::new(config));
    axum::serve(listener, app).await
}

pub async fn serve(config: &Config) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.address()).await?;
    info!("listening on {}", listener.local_addr()?);
    serve_on(listener, config).await
}
