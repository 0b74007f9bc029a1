//! HTTP route table.

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the application router with all routes and middleware layers.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());
    Router::new()
        .route("/health", get(handlers::calls::health))
        .route("/incoming-call", post(handlers::calls::incoming_call))
        .route("/outgoing-call", post(handlers::calls::outgoing_call))
        .route("/media", get(handlers::media::media_stream))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    match allowed_origins {
        Some(list) => {
            let origins: Vec<HeaderValue> = list
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}
