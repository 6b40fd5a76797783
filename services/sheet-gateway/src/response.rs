//! Envelope responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use bomsheet_models::ApiEnvelope;
use bomsheet_utils::BomsheetError;
use serde_json::Value;

pub const SUCCESS_MESSAGE: &str = "Operation completed successfully";

pub fn success(data: Value) -> Response {
    (
        StatusCode::OK,
        Json(ApiEnvelope::success(SUCCESS_MESSAGE, Some(data))),
    )
        .into_response()
}

/// Wrapper that renders a [`BomsheetError`] as the failure envelope.
#[derive(Debug)]
pub struct ApiError(pub BomsheetError);

impl From<BomsheetError> for ApiError {
    fn from(error: BomsheetError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = self.0.error_code(), error = %self.0, "Request failed");
        } else {
            tracing::warn!(code = self.0.error_code(), error = %self.0, "Request rejected");
        }

        (status, Json(ApiEnvelope::failure(self.0.client_message()))).into_response()
    }
}
