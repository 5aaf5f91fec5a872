use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use slipway_core::StackConfig;

/// GET /api/stack — the loaded stack definition, post-interpolation.
pub async fn get_stack(State(app): State<AppState>) -> Json<StackConfig> {
    Json(app.supervisor.stack().clone())
}

/// GET /api/stack/status — every unit's live state.
pub async fn get_status(
    State(app): State<AppState>,
) -> Result<Json<slipway_core::StackStatus>, AppError> {
    Ok(Json(app.supervisor.status()?))
}
