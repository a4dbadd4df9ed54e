//! API routes module - organizes the relay's route handlers.

pub mod app_state;
pub mod collaboration;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

pub use app_state::AppState;

/// Create the shared application state.
pub fn create_app_state() -> AppState {
    AppState::new()
}

/// Create the main API router combining all route modules.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .merge(collaboration::collaboration_router())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "uml-collab-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
