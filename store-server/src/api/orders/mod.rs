//! Order API Module
//!
//! Order creation is service-to-service (the payment layer calls it with
//! a verified reference); the rest is read-only queries.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Service-to-service creation (idempotent on payment reference)
        .route("/internal/create", post(handler::create_internal))
        // Admin list
        .route("/", get(handler::list))
        // Monthly stats
        .route("/stats", get(handler::stats))
        // Per-user history
        .route("/user/{user_id}", get(handler::list_by_user))
        // Order detail
        .route("/{id}", get(handler::get_by_id))
}
