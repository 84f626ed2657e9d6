pub mod auth;
mod error;
mod handlers;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, AuthRequirement};
use sk_core::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub auth: AuthConfig,
}

/// Attaches the endpoint's auth tier as a request extension so the single
/// `auth_middleware` can read it without per-route closures.
fn gated(router: Router<AppState>, requirement: AuthRequirement) -> Router<AppState> {
    router.route_layer(axum::Extension(requirement))
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new().route("/api/v1/ping", get(handlers::ping));
    let public = gated(public, AuthRequirement::None);

    let required = Router::new()
        .route("/api/v1/stream_wal", post(handlers::stream_wal))
        .route("/api/v1/replicate_wal", post(handlers::replicate_wal))
        .route("/api/v1/request_vote", post(handlers::request_vote))
        .route("/api/v1/heartbeat", post(handlers::heartbeat));
    let required = gated(required, AuthRequirement::Required);

    let optional = Router::new()
        .route("/api/v1/metrics", get(handlers::metrics))
        .route("/api/v1/get_wal", get(handlers::get_wal))
        .route("/api/v1/get_latest_lsn", get(handlers::get_latest_lsn))
        .route("/api/v1/get_wal_range", get(handlers::get_wal_range))
        .route("/api/v1/timelines", get(handlers::get_timelines))
        .route("/api/v1/timelines/create", post(handlers::create_timeline))
        .route("/api/v1/timelines/:id", get(handlers::get_timeline))
        .route("/api/v1/membership/add_peer", post(handlers::add_peer))
        .route("/api/v1/membership/remove_peer", post(handlers::remove_peer))
        .route("/api/v1/recover_from_peer", post(handlers::recover_from_peer))
        .route("/api/v1/recover_timeline", post(handlers::recover_timeline));
    let optional = gated(optional, AuthRequirement::Optional);

    public
        .merge(required)
        .merge(optional)
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
