//! Admin routes for the fulfillment dashboard and manual interventions.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};

use forgeroute_core::ProductId;
use forgeroute_inventory::{CentralStockRecord, LedgerError, SkuKey};
use forgeroute_routing::RoutingError;

use crate::app::dto::{AssignmentResponse, CentralStockRequest, CentralStockResponse, OverrideRequest};
use crate::app::errors::{self, blocking, ledger_error_to_response, routing_error_to_response};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/fulfillment/dashboard", get(dashboard))
        .route("/fulfillment/override", post(override_to_admin))
        .route("/stock/:product_id", put(set_central_stock))
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard
// ─────────────────────────────────────────────────────────────────────────────

pub async fn dashboard(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let engine = services.engine();
    match blocking(move || engine.dashboard(), routing_error_to_response).await {
        Ok(counts) => Json(counts).into_response(),
        Err(resp) => resp,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Interventions
// ─────────────────────────────────────────────────────────────────────────────

/// Take an order away from its seller and fulfill it from the hub.
pub async fn override_to_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<OverrideRequest>,
) -> Response {
    let engine = services.engine();
    let order_id = body.order_id;
    let result = blocking(
        move || -> Result<_, RoutingError> {
            let outcome = engine.override_to_admin(order_id)?;
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

pub async fn set_central_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
    Json(body): Json<CentralStockRequest>,
) -> Response {
    let product_id: ProductId = match product_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("product"),
    };

    let sku = SkuKey::new(product_id, body.variation_id);
    let record = if body.manage_stock {
        CentralStockRecord::tracked(body.quantity)
    } else {
        CentralStockRecord::untracked()
    };

    let ledger = services.ledger();
    let result = blocking(
        move || -> Result<_, LedgerError> { ledger.set_central_stock(sku, record) },
        ledger_error_to_response,
    )
    .await;

    match result {
        Ok(()) => Json(CentralStockResponse::new(sku, record)).into_response(),
        Err(resp) => resp,
    }
}
