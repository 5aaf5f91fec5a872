use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use slipway_core::{UnitConfig, UnitStatus};

#[derive(Serialize)]
pub struct UnitDetail {
    #[serde(flatten)]
    pub status: UnitStatus,
    pub config: UnitConfig,
}

/// GET /api/units — status of every unit, in start order.
pub async fn list_units(State(app): State<AppState>) -> Result<Json<Vec<UnitStatus>>, AppError> {
    Ok(Json(app.supervisor.status()?.units))
}

/// GET /api/units/{name} — one unit's status plus its configuration.
pub async fn get_unit(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<UnitDetail>, AppError> {
    let status = app
        .supervisor
        .unit_status(&name)
        .ok_or_else(|| AppError::not_found(format!("unit '{name}' not found")))?;
    let config = app.supervisor.stack().unit(&name)?.clone();
    Ok(Json(UnitDetail { status, config }))
}
