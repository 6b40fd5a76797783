//! # Bomsheet Gateway
//!
//! HTTP surface of the sheet service: one action-dispatching `POST /`, a
//! health or HTML `GET /`, and Prometheus metrics.

pub mod dispatch;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::create_app;
pub use state::AppState;
