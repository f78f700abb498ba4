use chrono::{DateTime, Utc};
use thiserror::Error;

use forgeroute_core::{ProductId, SellerId, VariationId};

use crate::alerts::OutOfStock;
use crate::record::{CentralStockRecord, InventoryRecord, SkuKey, StockLine, required_by_sku};

/// Ledger failure.
///
/// `InsufficientStock` is an expected business outcome: callers treat the
/// seller as ineligible and move on. `Storage` is an infrastructure failure
/// and must propagate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: SkuKey,
        requested: u32,
        available: u32,
    },

    #[error("on-hand {on_hand} for {sku} would drop below reserved {reserved}")]
    BelowReserved {
        sku: SkuKey,
        on_hand: u32,
        reserved: u32,
    },

    #[error("ledger storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. })
    }
}

/// The only writer of seller and central stock.
///
/// Implementations must make `reserve` atomic per seller: every line of the
/// order is checked and reserved under one lock/transaction, so concurrent
/// reservations can never push `reserved` above `on_hand`.
pub trait InventoryLedger: Send + Sync {
    /// `on_hand - reserved` for one seller SKU; missing record is 0.
    fn available(
        &self,
        seller: SellerId,
        product: ProductId,
        variation: Option<VariationId>,
    ) -> Result<u32, LedgerError>;

    /// Reserve every line for `seller`, all-or-nothing.
    fn reserve(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError>;

    /// Give back a reservation. Clamped at zero, so repeated calls are harmless.
    fn release(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError>;

    /// Deduct central stock directly for an order fulfilled by the admin
    /// warehouse. Returns the out-of-stock alerts raised (one per exhausted line);
    /// they are also handed to the configured alert sink.
    fn commit_deduction(
        &self,
        lines: &[StockLine],
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<OutOfStock>, LedgerError>;

    /// Seller stock intake. Refuses to drop `on_hand` below `reserved`.
    fn set_on_hand(
        &self,
        seller: SellerId,
        sku: SkuKey,
        on_hand: u32,
    ) -> Result<InventoryRecord, LedgerError>;

    /// All stock records held by one seller, ordered by SKU.
    fn snapshot(&self, seller: SellerId) -> Result<Vec<(SkuKey, InventoryRecord)>, LedgerError>;

    fn set_central_stock(&self, sku: SkuKey, record: CentralStockRecord) -> Result<(), LedgerError>;

    fn central_stock(&self, sku: SkuKey) -> Result<Option<CentralStockRecord>, LedgerError>;

    /// Whether `seller` can currently cover every line (read-only, may be stale).
    fn covers(&self, seller: SellerId, lines: &[StockLine]) -> Result<bool, LedgerError> {
        for (sku, required) in required_by_sku(lines) {
            if self.available(seller, sku.product_id, sku.variation_id)? < required {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<L> InventoryLedger for std::sync::Arc<L>
where
    L: InventoryLedger + ?Sized,
{
    fn available(
        &self,
        seller: SellerId,
        product: ProductId,
        variation: Option<VariationId>,
    ) -> Result<u32, LedgerError> {
        (**self).available(seller, product, variation)
    }

    fn reserve(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
        (**self).reserve(seller, lines)
    }

    fn release(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
        (**self).release(seller, lines)
    }

    fn commit_deduction(
        &self,
        lines: &[StockLine],
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<OutOfStock>, LedgerError> {
        (**self).commit_deduction(lines, occurred_at)
    }

    fn set_on_hand(
        &self,
        seller: SellerId,
        sku: SkuKey,
        on_hand: u32,
    ) -> Result<InventoryRecord, LedgerError> {
        (**self).set_on_hand(seller, sku, on_hand)
    }

    fn snapshot(&self, seller: SellerId) -> Result<Vec<(SkuKey, InventoryRecord)>, LedgerError> {
        (**self).snapshot(seller)
    }

    fn set_central_stock(&self, sku: SkuKey, record: CentralStockRecord) -> Result<(), LedgerError> {
        (**self).set_central_stock(sku, record)
    }

    fn central_stock(&self, sku: SkuKey) -> Result<Option<CentralStockRecord>, LedgerError> {
        (**self).central_stock(sku)
    }

    fn covers(&self, seller: SellerId, lines: &[StockLine]) -> Result<bool, LedgerError> {
        (**self).covers(seller, lines)
    }
}
