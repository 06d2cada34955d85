//! Shared state and router wiring.
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::config::Config;
use crate::workflow::SessionStore;

/// Photos arrive base64-encoded inside JSON, so allow well above the default.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub struct AppState {
    pub sessions: SessionStore,
    pub pix_key: String,
    pub price_label: String,
}

impl AppState {
    pub fn new(sessions: SessionStore, config: &Config) -> Self {
        AppState { sessions, pix_key: config.pix_key.clone(), price_label: config.price_label() }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/catalog", get(handlers::catalog))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:id", get(handlers::get_session).delete(handlers::delete_session))
        .route("/sessions/:id/image", get(handlers::source_image).put(handlers::select_image))
        .route("/sessions/:id/configuration", axum::routing::patch(handlers::update_configuration))
        .route("/sessions/:id/submit", post(handlers::submit_configuration))
        .route("/sessions/:id/payment/receipt", post(handlers::upload_receipt))
        .route("/sessions/:id/payment/confirm", post(handlers::confirm_payment))
        .route("/sessions/:id/payment/cancel", post(handlers::cancel_payment))
        .route("/sessions/:id/generate", post(handlers::generate))
        .route("/sessions/:id/refine", post(handlers::refine))
        .route("/sessions/:id/result", get(handlers::download_result))
        .route("/sessions/:id/reset", post(handlers::reset))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
