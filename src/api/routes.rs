//! Route Definitions

use super::handlers::*;
use crate::submission::relay_client::SUBMIT_PATH;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(SUBMIT_PATH, post(submit_handler))
        .with_state(state)
}
