//! Single POST endpoint.
//!
//! The request JSON may arrive as a `data` query parameter, a `data` field of
//! a URL-encoded form, or the raw body. A `data` parameter wins over the body.

use std::collections::HashMap;

use axum::{
    body::to_bytes,
    extract::{FromRequest, Query, Request, State},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
    Form,
};
use bomsheet_models::ApiRequest;
use bomsheet_utils::{BomsheetError, BomsheetResult};
use serde_json::Value;

use crate::dispatch::Operation;
use crate::response::{success, ApiError};
use crate::state::AppState;

const INVALID_PARAMETER_JSON: &str = "Invalid JSON in parameter data";
const INVALID_BODY_JSON: &str = "Invalid JSON in request body";
const NO_REQUEST_DATA: &str = "No request data provided";

/// POST /
pub async fn handle_api_call(State(state): State<AppState>, request: Request) -> Response {
    let parsed = match read_request(&state, request).await {
        Ok(parsed) => parsed,
        Err(err) => {
            state.metrics.record("invalid", "invalid", "rejected");
            return ApiError(err).into_response();
        }
    };

    let operation = match Operation::from_request(parsed) {
        Ok(operation) => operation,
        Err(err) => {
            state.metrics.record("invalid", "invalid", "rejected");
            return ApiError(err).into_response();
        }
    };

    let action = operation.action().as_str();
    let table = operation.table().as_str();
    tracing::info!(action, table, "Dispatching request");

    match operation.execute(&state).await {
        Ok(data) => {
            state.metrics.record(action, table, "success");
            success(data)
        }
        Err(err) => {
            let outcome = match err {
                BomsheetError::NotFound { .. } => "not_found",
                BomsheetError::Validation { .. } => "rejected",
                _ => "error",
            };
            state.metrics.record(action, table, outcome);
            ApiError(err).into_response()
        }
    }
}

async fn read_request(state: &AppState, request: Request) -> BomsheetResult<ApiRequest> {
    let (parts, body) = request.into_parts();

    if let Some(data) = query_data(&parts) {
        tracing::debug!("Request data taken from query parameter");
        return decode(&data, INVALID_PARAMETER_JSON);
    }

    if is_form(&parts) {
        let request = Request::from_parts(parts, body);
        let Form(fields) = Form::<HashMap<String, String>>::from_request(request, &())
            .await
            .map_err(|err| BomsheetError::validation("data", err.body_text()))?;
        return match fields.get("data") {
            Some(data) => decode(data, INVALID_PARAMETER_JSON),
            None => Err(BomsheetError::validation("data", NO_REQUEST_DATA)),
        };
    }

    let limit = state.config.server.max_request_size;
    let bytes = to_bytes(body, limit).await.map_err(|err| {
        BomsheetError::validation("body", format!("Unable to read request body: {}", err))
    })?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(BomsheetError::validation("body", NO_REQUEST_DATA));
    }

    let body = std::str::from_utf8(&bytes)
        .map_err(|_| BomsheetError::validation("body", INVALID_BODY_JSON))?;
    decode(body, INVALID_BODY_JSON)
}

fn query_data(parts: &Parts) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).ok()?;
    params.get("data").filter(|data| !data.is_empty()).cloned()
}

fn is_form(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

fn decode(text: &str, invalid_message: &str) -> BomsheetResult<ApiRequest> {
    let value: Value = serde_json::from_str(text)
        .map_err(|_| BomsheetError::validation("data", invalid_message))?;
    if !value.is_object() {
        return Err(BomsheetError::validation("data", invalid_message));
    }
    serde_json::from_value(value)
        .map_err(|err| BomsheetError::validation("data", format!("Invalid request: {}", err)))
}
