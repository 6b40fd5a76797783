use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Json, Response},
};
use bomsheet_models::ApiEnvelope;

use crate::state::AppState;

const INDEX_PAGE: &str = include_str!("../../static/index.html");

/// GET /
pub async fn index(State(state): State<AppState>) -> Response {
    if state.config.server.serve_html {
        return Html(INDEX_PAGE).into_response();
    }

    Json(ApiEnvelope::success(
        "Bomsheet service is running properly",
        None,
    ))
    .into_response()
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}
