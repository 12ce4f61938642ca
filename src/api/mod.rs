//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub use routes::create_router;

/// Build the full application router
pub fn build_app(state: AppState) -> Router {
    // Layers run last-added first: auth, then logging, then the handler
    let protected = routes::create_router()
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn_with_state(
            state.pool.clone(),
            middleware::auth_middleware,
        ));

    let api = Router::new()
        .route("/health", get(routes::readiness_check))
        .merge(protected);

    Router::new()
        .route("/health", get(routes::health_check))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
