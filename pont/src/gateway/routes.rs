use super::{AppState, handlers};
use axum::{
    Router,
    routing::{any, get},
};
use tower_http::trace::TraceLayer;

/// Builds the gateway router.
///
/// Calls and unmatched paths are logged through the trace layer. Probes are not.
pub fn router(state: AppState) -> Router {
    let actuator = Router::new()
        .route("/actuator/health", get(handlers::health))
        .route("/actuator/services", get(handlers::introspect));

    let calls = Router::new()
        .route("/v1/{*path}", any(handlers::invoke))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http());

    actuator.merge(calls).with_state(state)
}
