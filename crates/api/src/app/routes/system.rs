use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::{self, AppServices};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn stream(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    services::transition_stream(services)
}
