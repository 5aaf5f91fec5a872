pub mod error;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use unit_runner::Supervisor;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(supervisor: Arc<Supervisor>) -> Router {
    let app_state = AppState::new(supervisor);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/events", get(routes::events::sse_events))
        .route("/api/stack", get(routes::stack::get_stack))
        .route("/api/stack/status", get(routes::stack::get_status))
        .route("/api/units", get(routes::units::list_units))
        .route("/api/units/{name}", get(routes::units::get_unit))
        .layer(cors)
        .with_state(app_state)
}

/// Serve the status API for a running stack.
pub async fn serve(supervisor: Arc<Supervisor>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(supervisor, listener).await
}

/// Serve on a pre-bound listener. Useful when `port = 0` and the caller
/// needs the actual port before starting.
pub async fn serve_on(
    supervisor: Arc<Supervisor>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(supervisor);
    tracing::info!("status API listening on http://localhost:{actual_port}");
    axum::serve(listener, app).await?;
    Ok(())
}
