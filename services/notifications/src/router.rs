use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use courier_core::health::{healthz, readyz};

pub fn build_router() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .layer(TraceLayer::new_for_http())
}
