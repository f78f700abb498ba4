//! Inventory ledger for order routing.
//!
//! Seller stock is tracked as `on_hand` / `reserved` counters per
//! `(seller, product, variation)`. Reservations are all-or-nothing across the
//! lines of one order. Central (admin) stock is deducted directly when an
//! order falls back to centralized fulfillment.

pub mod alerts;
pub mod in_memory;
pub mod ledger;
pub mod record;

pub use alerts::{InMemoryStockAlertSink, NoopStockAlertSink, OutOfStock, StockAlertSink};
pub use in_memory::InMemoryInventoryLedger;
pub use ledger::{InventoryLedger, LedgerError};
pub use record::{CentralStockRecord, InventoryRecord, SkuKey, StockLine, StockStatus, required_by_sku};
