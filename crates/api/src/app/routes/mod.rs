use axum::{Router, routing::get};

pub mod admin;
pub mod orders;
pub mod sellers;
pub mod system;

/// Router for every fulfillment endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/events/stream", get(system::stream))
        .nest("/orders", orders::router())
        .nest("/sellers", sellers::router())
        .nest("/admin", admin::router())
}
