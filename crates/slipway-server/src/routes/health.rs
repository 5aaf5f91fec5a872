use crate::state::AppState;
use axum::extract::State;
use axum::Json;

/// GET /health — liveness endpoint. Always 200 while the server is up;
/// the body names the stack it fronts.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": app.supervisor.stack().name,
    }))
}
