use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeroute_core::{Coordinates, OrderId, ProductId, SellerId, VariationId};
use forgeroute_inventory::{CentralStockRecord, InventoryRecord, SkuKey, StockStatus};
use forgeroute_orders::{AssignmentStatus, FulfillmentSource, Order, OrderLine, ShippingAddress};
use forgeroute_routing::{AssignmentOutcome, Seller};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    /// Id of the paid order in the shop; generated when absent.
    pub order_id: Option<OrderId>,
    pub lines: Vec<OrderLine>,
    #[serde(default)]
    pub shipping: ShippingAddress,
}

#[derive(Debug, Deserialize)]
pub struct UpsertSellerRequest {
    pub business_name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub auto_accept: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StockIntakeRequest {
    pub product_id: ProductId,
    pub variation_id: Option<VariationId>,
    pub on_hand: u32,
}

#[derive(Debug, Deserialize)]
pub struct CentralStockRequest {
    pub variation_id: Option<VariationId>,
    pub quantity: u32,
    #[serde(default = "default_true")]
    pub manage_stock: bool,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub order_id: OrderId,
}

fn default_true() -> bool {
    true
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub status: AssignmentStatus,
    pub fulfillment_source: Option<FulfillmentSource>,
    pub assigned_seller_id: Option<SellerId>,
    pub attempt_count: u32,
    pub assignment_expiry: Option<DateTime<Utc>>,
    pub excluded_sellers: Vec<SellerId>,
    pub destination: Option<Coordinates>,
    pub shipping: ShippingAddress,
    pub lines: Vec<OrderLine>,
    pub placed_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id_typed(),
            status: order.status(),
            fulfillment_source: order.fulfillment_source(),
            assigned_seller_id: order.assigned_seller(),
            attempt_count: order.attempt_count(),
            assignment_expiry: order.assignment_expiry(),
            excluded_sellers: order.excluded_sellers().iter().copied().collect(),
            destination: order.destination().copied(),
            shipping: order.shipping().clone(),
            lines: order.lines().to_vec(),
            placed_at: order.placed_at(),
        }
    }
}

/// Flat `(success, reason)` view of a routing attempt plus the details.
#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub success: bool,
    pub reason: String,
    pub outcome: AssignmentOutcome,
    pub order: OrderResponse,
}

impl AssignmentResponse {
    pub fn new(outcome: AssignmentOutcome, order: &Order) -> Self {
        Self {
            success: outcome.success(),
            reason: outcome.reason(),
            outcome,
            order: OrderResponse::from(order),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SellerResponse {
    pub id: SellerId,
    pub business_name: String,
    pub active: bool,
    pub auto_accept: bool,
    pub coordinates: Option<Coordinates>,
}

impl From<Seller> for SellerResponse {
    fn from(seller: Seller) -> Self {
        Self {
            id: seller.id,
            business_name: seller.business_name,
            active: seller.active,
            auto_accept: seller.auto_accept,
            coordinates: seller.coordinates,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockRecordResponse {
    pub product_id: ProductId,
    pub variation_id: Option<VariationId>,
    pub on_hand: u32,
    pub reserved: u32,
    pub available: u32,
}

impl StockRecordResponse {
    pub fn new(sku: SkuKey, record: InventoryRecord) -> Self {
        Self {
            product_id: sku.product_id,
            variation_id: sku.variation_id,
            on_hand: record.on_hand(),
            reserved: record.reserved(),
            available: record.available(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CentralStockResponse {
    pub product_id: ProductId,
    pub variation_id: Option<VariationId>,
    pub quantity: u32,
    pub manage_stock: bool,
    pub status: StockStatus,
}

impl CentralStockResponse {
    pub fn new(sku: SkuKey, record: CentralStockRecord) -> Self {
        Self {
            product_id: sku.product_id,
            variation_id: sku.variation_id,
            quantity: record.quantity,
            manage_stock: record.manage_stock,
            status: record.status,
        }
    }
}
