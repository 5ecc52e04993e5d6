//! Operational HTTP endpoints.
//!
//! - `/health`  : liveness, independent of the gauge store
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use mailmon_core::error::MailmonError;
use mailmon_core::exposition;

use crate::app_state::AppState;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "OK" })))
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = exposition::render(&state.gauges().read_all())?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, exposition::CONTENT_TYPE)],
        body,
    )
        .into_response())
}

/// Error wrapper that renders as a JSON body with a stable code.
#[derive(Debug)]
pub struct ApiError(pub MailmonError);

impl From<MailmonError> for ApiError {
    fn from(e: MailmonError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Every failure on this surface is server-side; routes take no input.
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        tracing::error!(error = %self.0, "request failed");
        let body = json!({
            "error": {
                "code": self.0.code().as_str(),
                "msg": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
