use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use forgeroute_core::OrderId;
use forgeroute_routing::RoutingError;

use crate::app::dto::{AssignmentResponse, OrderResponse, PlaceOrderRequest};
use crate::app::errors::{self, blocking, routing_error_to_response};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order))
        .route("/:id", get(get_order))
        .route("/:id/assign", post(assign_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/reject", post(reject_order))
}

pub(crate) fn parse_order_id(raw: &str) -> Result<OrderId, Response> {
    raw.parse().map_err(|_| errors::invalid_id("order"))
}

/// Intake a paid order and route it straight away.
pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PlaceOrderRequest>,
) -> Response {
    if body.lines.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "order has no lines");
    }

    let engine = services.engine();
    let order_id = body.order_id.unwrap_or_default();
    let result = blocking(
        move || -> Result<_, RoutingError> {
            engine.place_order(order_id, body.lines, body.shipping)?;
            let outcome = engine.assign(order_id)?;
            let order = engine.order(order_id)?;
            Ok(AssignmentResponse::new(outcome, &order))
        },
        routing_error_to_response,
    )
    .await;

    match result {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_order(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let engine = services.engine();
    match blocking(move || engine.order(order_id), routing_error_to_response).await {
        Ok(order) => Json(OrderResponse::from(&order)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn assign_order(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let engine = services.engine();
    let result = blocking(
        move || -> Result<_, RoutingError> {
            let outcome = engine.assign(order_id)?;
            Ok(AssignmentResponse::new(outcome, &engine.order(order_id)?))
        },
        routing_error_to_response,
    )
    .await;

    match result {
        Ok(response) => Json(response).into_response(),
        Err(resp) => resp,
    }
}

/// System-initiated reject: release the current seller and re-route.
pub async fn reject_order(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let engine = services.engine();
    let result = blocking(
        move || -> Result<_, RoutingError> {
            let outcome = engine.reject(order_id)?;
            Ok(AssignmentResponse::new(outcome, &engine.order(order_id)?))
        },
        routing_error_to_response,
    )
    .await;

    match result {
        Ok(response) => Json(response).into_response(),
        Err(resp) => resp,
    }
}

pub async fn cancel_order(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let engine = services.engine();
    match blocking(move || engine.cancel(order_id), routing_error_to_response).await {
        Ok(order) => Json(OrderResponse::from(&order)).into_response(),
        Err(resp) => resp,
    }
}
