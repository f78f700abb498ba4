use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use forgeroute_core::{ProductId, VariationId};

/// Stock-keeping key: a product, optionally narrowed to one variation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkuKey {
    pub product_id: ProductId,
    pub variation_id: Option<VariationId>,
}

impl SkuKey {
    pub fn new(product_id: ProductId, variation_id: Option<VariationId>) -> Self {
        Self {
            product_id,
            variation_id,
        }
    }

    /// The product-level key for this SKU (variation stripped).
    pub fn product_level(&self) -> Self {
        Self::new(self.product_id, None)
    }
}

impl core::fmt::Display for SkuKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.variation_id {
            Some(v) => write!(f, "{}/{}", self.product_id, v),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// One quantity of one SKU requested by an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub sku: SkuKey,
    pub quantity: u32,
}

impl StockLine {
    pub fn new(product_id: ProductId, variation_id: Option<VariationId>, quantity: u32) -> Self {
        Self {
            sku: SkuKey::new(product_id, variation_id),
            quantity,
        }
    }
}

/// Sum the requested quantity per SKU.
///
/// An order may list the same SKU on several lines; availability must be
/// checked against the total, not line by line.
pub fn required_by_sku(lines: &[StockLine]) -> BTreeMap<SkuKey, u32> {
    let mut required = BTreeMap::new();
    for line in lines {
        let entry = required.entry(line.sku).or_insert(0u32);
        *entry = entry.saturating_add(line.quantity);
    }
    required
}

/// Seller-held stock for one SKU.
///
/// Invariant: `reserved <= on_hand`. Fields are private so the invariant can
/// only be changed through the methods below.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    on_hand: u32,
    reserved: u32,
}

impl InventoryRecord {
    pub fn new(on_hand: u32) -> Self {
        Self {
            on_hand,
            reserved: 0,
        }
    }

    /// Rebuild a record from persisted counters, clamping `reserved`.
    pub fn from_parts(on_hand: u32, reserved: u32) -> Self {
        Self {
            on_hand,
            reserved: reserved.min(on_hand),
        }
    }

    pub fn on_hand(&self) -> u32 {
        self.on_hand
    }

    pub fn reserved(&self) -> u32 {
        self.reserved
    }

    pub fn available(&self) -> u32 {
        self.on_hand - self.reserved
    }

    pub(crate) fn reserve(&mut self, quantity: u32) {
        debug_assert!(quantity <= self.available());
        self.reserved += quantity;
    }

    /// Decrement `reserved`, clamped at zero.
    pub(crate) fn release(&mut self, quantity: u32) {
        self.reserved = self.reserved.saturating_sub(quantity);
    }

    /// Replace `on_hand`; refused when it would drop below what is reserved.
    pub(crate) fn set_on_hand(&mut self, on_hand: u32) -> Result<(), u32> {
        if on_hand < self.reserved {
            return Err(self.reserved);
        }
        self.on_hand = on_hand;
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

/// Central (admin warehouse) stock for one SKU.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralStockRecord {
    pub quantity: u32,
    /// Untracked SKUs are never deducted and never reported out of stock.
    pub manage_stock: bool,
    pub status: StockStatus,
}

impl CentralStockRecord {
    pub fn tracked(quantity: u32) -> Self {
        Self {
            quantity,
            manage_stock: true,
            status: if quantity == 0 {
                StockStatus::OutOfStock
            } else {
                StockStatus::InStock
            },
        }
    }

    pub fn untracked() -> Self {
        Self {
            quantity: 0,
            manage_stock: false,
            status: StockStatus::InStock,
        }
    }

    /// Deduct directly (no reservation phase). Returns `true` when the record
    /// is exhausted afterwards.
    pub(crate) fn deduct(&mut self, quantity: u32) -> bool {
        if !self.manage_stock {
            return false;
        }
        self.quantity = self.quantity.saturating_sub(quantity);
        if self.quantity == 0 {
            self.status = StockStatus::OutOfStock;
            return true;
        }
        false
    }
}
