use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use topmodel_shared::GENERATE_PATH;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::handlers::generate as generate_handlers;
use crate::upstream::ImageModel;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn ImageModel>,
    pub config: Config,
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route(
            GENERATE_PATH,
            post(generate_handlers::generate).fallback(generate_handlers::method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
