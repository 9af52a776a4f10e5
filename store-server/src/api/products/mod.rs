//! Product API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/products", product_routes())
}

fn product_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/generate", post(handler::generate))
        .route(
            "/{ref}",
            get(handler::get_by_ref)
                .put(handler::update)
                .delete(handler::delete),
        )
}
