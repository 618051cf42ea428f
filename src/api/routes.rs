use super::{handlers, ApiState};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        // Chain entity routes
        .route("/api/chains/:chain_id/bundle", get(handlers::get_bundle))
        .route("/api/chains/:chain_id/factory", get(handlers::get_factory))
        .route("/api/chains/:chain_id/factory/days", get(handlers::get_factory_days))
        .route("/api/chains/:chain_id/tokens/:address", get(handlers::get_token))
        .route("/api/chains/:chain_id/tokens/:address/days", get(handlers::get_token_days))
        .route("/api/chains/:chain_id/pools/:address", get(handlers::get_pool))
        .route("/api/chains/:chain_id/pools/:address/candles", get(handlers::get_candles))
        // Status routes
        .route("/api/status/blocks", get(handlers::get_processing_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
