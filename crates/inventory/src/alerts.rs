use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeroute_events::Event;

use crate::record::SkuKey;

/// Notification: central stock for an order line ran out during a
/// centralized-fulfillment deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStock {
    pub sku: SkuKey,
    /// Quantity the line asked for when the stock ran out.
    pub requested: u32,
    pub occurred_at: DateTime<Utc>,
}

impl Event for OutOfStock {
    fn event_type(&self) -> &'static str {
        "inventory.central.out_of_stock"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Receiver of out-of-stock notifications (read by the notification component).
///
/// Delivery is best-effort: sinks must not fail the deduction that produced
/// the alert.
pub trait StockAlertSink: Send + Sync + 'static {
    fn out_of_stock(&self, alert: &OutOfStock);
}

/// Sink that drops every alert.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStockAlertSink;

impl StockAlertSink for NoopStockAlertSink {
    fn out_of_stock(&self, _alert: &OutOfStock) {}
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStockAlertSink {
    inner: Mutex<Vec<OutOfStock>>,
}

impl InMemoryStockAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<OutOfStock> {
        self.inner.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl StockAlertSink for InMemoryStockAlertSink {
    fn out_of_stock(&self, alert: &OutOfStock) {
        if let Ok(mut alerts) = self.inner.lock() {
            alerts.push(alert.clone());
        }
    }
}
