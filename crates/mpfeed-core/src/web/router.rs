//! Router configuration

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{get_feed, get_opml, rpc};
use crate::state::AppState;

/// Create the main router: feed documents, OPML and RPC
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/feeds/:file", get(get_feed))
        .route("/opml", get(get_opml))
        .route("/rpc", post(rpc))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_methods(Any)
                        .allow_headers(Any)
                        .allow_origin(Any),
                ),
        )
        .with_state(state)
        .merge(create_health_router())
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}
