use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};

use forgeroute_core::{Coordinates, SellerId};
use forgeroute_inventory::{LedgerError, SkuKey};
use forgeroute_routing::{RoutingError, Seller};

use crate::app::dto::{
    AssignmentResponse, OrderResponse, SellerResponse, StockIntakeRequest, StockRecordResponse, UpsertSellerRequest,
};
use crate::app::errors::{
    self, blocking, domain_error_to_response, ledger_error_to_response, routing_error_to_response,
    store_error_to_response,
};
use crate::app::routes::orders::parse_order_id;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/:seller_id", put(upsert_seller))
        .route("/:seller_id/stock", put(set_stock).get(get_stock))
        .route("/:seller_id/orders/pending", get(pending_orders))
        .route("/:seller_id/orders/:id/accept", post(accept_order))
        .route("/:seller_id/orders/:id/reject", post(reject_order))
}

fn parse_seller_id(raw: &str) -> Result<SellerId, Response> {
    raw.parse().map_err(|_| errors::invalid_id("seller"))
}

/// Seller profile feed from the onboarding side.
pub async fn upsert_seller(
    Extension(services): Extension<Arc<AppServices>>,
    Path(seller_id): Path<String>,
    Json(body): Json<UpsertSellerRequest>,
) -> Response {
    let seller_id = match parse_seller_id(&seller_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let coordinates = match (body.latitude, body.longitude) {
        (Some(lat), Some(lon)) => match Coordinates::new(lat, lon) {
            Ok(c) => Some(c),
            Err(e) => return domain_error_to_response(e),
        },
        (None, None) => None,
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "latitude and longitude must be given together",
            );
        }
    };
    let business_name = body.business_name.trim().to_string();
    if business_name.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "business_name is required");
    }

    let seller = Seller {
        id: seller_id,
        business_name,
        active: body.active,
        auto_accept: body.auto_accept,
        coordinates,
    };
    let directory = services.sellers();
    let stored = seller.clone();
    match blocking(move || directory.upsert(stored), store_error_to_response).await {
        Ok(()) => Json(SellerResponse::from(seller)).into_response(),
        Err(resp) => resp,
    }
}

/// Stock intake: replace `on_hand` for one SKU.
pub async fn set_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(seller_id): Path<String>,
    Json(body): Json<StockIntakeRequest>,
) -> Response {
    let seller_id = match parse_seller_id(&seller_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let sku = SkuKey::new(body.product_id, body.variation_id);
    let ledger = services.ledger();
    match blocking(move || ledger.set_on_hand(seller_id, sku, body.on_hand), ledger_error_to_response).await {
        Ok(record) => Json(StockRecordResponse::new(sku, record)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_stock(Extension(services): Extension<Arc<AppServices>>, Path(seller_id): Path<String>) -> Response {
    let seller_id = match parse_seller_id(&seller_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let ledger = services.ledger();
    let result = blocking(
        move || -> Result<_, LedgerError> { ledger.snapshot(seller_id) },
        ledger_error_to_response,
    )
    .await;

    match result {
        Ok(records) => Json(
            records
                .into_iter()
                .map(|(sku, record)| StockRecordResponse::new(sku, record))
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(resp) => resp,
    }
}

pub async fn pending_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Path(seller_id): Path<String>,
) -> Response {
    let seller_id = match parse_seller_id(&seller_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let engine = services.engine();
    match blocking(move || engine.pending_for_seller(seller_id), routing_error_to_response).await {
        Ok(orders) => Json(orders.iter().map(OrderResponse::from).collect::<Vec<_>>()).into_response(),
        Err(resp) => resp,
    }
}

pub async fn accept_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path((seller_id, id)): Path<(String, String)>,
) -> Response {
    let (seller_id, order_id) = match (parse_seller_id(&seller_id), parse_order_id(&id)) {
        (Ok(s), Ok(o)) => (s, o),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    let engine = services.engine();
    match blocking(move || engine.accept(order_id, seller_id), routing_error_to_response).await {
        Ok(order) => Json(OrderResponse::from(&order)).into_response(),
        Err(resp) => resp,
    }
}

/// The holding seller turns the order down; it is re-routed immediately.
pub async fn reject_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path((seller_id, id)): Path<(String, String)>,
) -> Response {
    let (seller_id, order_id) = match (parse_seller_id(&seller_id), parse_order_id(&id)) {
        (Ok(s), Ok(o)) => (s, o),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    let engine = services.engine();
    let result = blocking(
        move || -> Result<_, RoutingError> {
            let outcome = engine.reject_by_seller(order_id, seller_id)?;
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

