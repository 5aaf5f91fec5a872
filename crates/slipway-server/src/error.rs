use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use slipway_core::SlipwayError;

/// Private sentinel error type used to carry an explicit HTTP 404 through
/// the `anyhow::Error` chain without touching the `SlipwayError` enum.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(n) = self.0.downcast_ref::<NotFoundError>() {
            let body = serde_json::json!({ "error": n.0.clone() });
            return (StatusCode::NOT_FOUND, axum::Json(body)).into_response();
        }

        let status = if let Some(e) = self.0.downcast_ref::<SlipwayError>() {
            match e {
                SlipwayError::UnitNotFound(_) => StatusCode::NOT_FOUND,
                SlipwayError::StackFileNotFound(_) | SlipwayError::NotRunning => {
                    StatusCode::BAD_REQUEST
                }
                SlipwayError::InvalidUnitName(_)
                | SlipwayError::UnknownDependency { .. }
                | SlipwayError::DependencyCycle(_)
                | SlipwayError::InvalidPortMapping(_)
                | SlipwayError::InvalidVolumeMount(_)
                | SlipwayError::InvalidDuration(_)
                | SlipwayError::UnknownVolume { .. }
                | SlipwayError::UnknownNetwork { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                SlipwayError::Io(_) | SlipwayError::Yaml(_) | SlipwayError::Json(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
