use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware::*, state::AppState};

pub fn create_app(state: AppState) -> Router {
    let max_request_size = state.config.server.max_request_size;

    Router::new()
        .route("/", get(handlers::index).post(handlers::handle_api_call))
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(allow_methods_header())
                .layer(allow_headers_header())
                .layer(max_age_header())
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(cors_layer())
                .layer(DefaultBodyLimit::max(max_request_size)),
        )
        .with_state(state)
}
