//! In-memory inventory ledger for tests/dev.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use forgeroute_core::{ProductId, SellerId, VariationId};

use crate::alerts::{NoopStockAlertSink, OutOfStock, StockAlertSink};
use crate::ledger::{InventoryLedger, LedgerError};
use crate::record::{CentralStockRecord, InventoryRecord, SkuKey, StockLine, required_by_sku};

type SellerStock = Arc<Mutex<BTreeMap<SkuKey, InventoryRecord>>>;

/// In-memory ledger.
///
/// Each seller's records sit behind their own `Mutex`: a reservation locks
/// exactly one seller for the duration of the check-and-reserve, so orders
/// competing for different sellers never contend.
pub struct InMemoryInventoryLedger {
    sellers: RwLock<HashMap<SellerId, SellerStock>>,
    central: Mutex<HashMap<SkuKey, CentralStockRecord>>,
    alerts: Arc<dyn StockAlertSink>,
}

impl InMemoryInventoryLedger {
    pub fn new() -> Self {
        Self::with_alert_sink(Arc::new(NoopStockAlertSink))
    }

    pub fn with_alert_sink(alerts: Arc<dyn StockAlertSink>) -> Self {
        Self {
            sellers: RwLock::new(HashMap::new()),
            central: Mutex::new(HashMap::new()),
            alerts,
        }
    }

    fn seller_stock(&self, seller: SellerId) -> Result<Option<SellerStock>, LedgerError> {
        let sellers = self
            .sellers
            .read()
            .map_err(|_| LedgerError::storage("seller index lock poisoned"))?;
        Ok(sellers.get(&seller).cloned())
    }

    fn seller_stock_or_insert(&self, seller: SellerId) -> Result<SellerStock, LedgerError> {
        if let Some(stock) = self.seller_stock(seller)? {
            return Ok(stock);
        }
        let mut sellers = self
            .sellers
            .write()
            .map_err(|_| LedgerError::storage("seller index lock poisoned"))?;
        Ok(sellers.entry(seller).or_default().clone())
    }
}

impl Default for InMemoryInventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for InMemoryInventoryLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryInventoryLedger").finish_non_exhaustive()
    }
}

fn poisoned(seller: SellerId) -> LedgerError {
    LedgerError::storage(format!("stock lock poisoned for seller {seller}"))
}

impl InventoryLedger for InMemoryInventoryLedger {
    fn available(
        &self,
        seller: SellerId,
        product: ProductId,
        variation: Option<VariationId>,
    ) -> Result<u32, LedgerError> {
        let Some(stock) = self.seller_stock(seller)? else {
            return Ok(0);
        };
        let records = stock.lock().map_err(|_| poisoned(seller))?;
        Ok(records
            .get(&SkuKey::new(product, variation))
            .map(InventoryRecord::available)
            .unwrap_or(0))
    }

    fn reserve(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
        let required = required_by_sku(lines);
        let Some(stock) = self.seller_stock(seller)? else {
            let (sku, requested) = required
                .into_iter()
                .next()
                .ok_or_else(|| LedgerError::storage("reserve called without lines"))?;
            return Err(LedgerError::InsufficientStock {
                sku,
                requested,
                available: 0,
            });
        };

        let mut records = stock.lock().map_err(|_| poisoned(seller))?;

        // Check every SKU first; nothing is written unless all of them fit.
        for (sku, requested) in &required {
            let available = records.get(sku).map(InventoryRecord::available).unwrap_or(0);
            if available < *requested {
                debug!(seller = %seller, sku = %sku, requested, available, "reservation refused");
                return Err(LedgerError::InsufficientStock {
                    sku: *sku,
                    requested: *requested,
                    available,
                });
            }
        }

        for (sku, requested) in required {
            if let Some(record) = records.get_mut(&sku) {
                record.reserve(requested);
            }
        }
        Ok(())
    }

    fn release(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
        let Some(stock) = self.seller_stock(seller)? else {
            return Ok(());
        };
        let mut records = stock.lock().map_err(|_| poisoned(seller))?;
        for (sku, quantity) in required_by_sku(lines) {
            if let Some(record) = records.get_mut(&sku) {
                record.release(quantity);
            }
        }
        Ok(())
    }

    fn commit_deduction(
        &self,
        lines: &[StockLine],
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<OutOfStock>, LedgerError> {
        let mut alerts = Vec::new();
        {
            let mut central = self
                .central
                .lock()
                .map_err(|_| LedgerError::storage("central stock lock poisoned"))?;

            for line in lines {
                let mut exhausted = central
                    .get_mut(&line.sku)
                    .map(|record| record.deduct(line.quantity))
                    .unwrap_or(false);

                // Variation lines also draw down the product-level total.
                if line.sku.variation_id.is_some() {
                    if let Some(record) = central.get_mut(&line.sku.product_level()) {
                        exhausted |= record.deduct(line.quantity);
                    }
                }

                if exhausted {
                    alerts.push(OutOfStock {
                        sku: line.sku,
                        requested: line.quantity,
                        occurred_at,
                    });
                }
            }
        }

        for alert in &alerts {
            info!(sku = %alert.sku, "central stock exhausted");
            self.alerts.out_of_stock(alert);
        }
        Ok(alerts)
    }

    fn set_on_hand(
        &self,
        seller: SellerId,
        sku: SkuKey,
        on_hand: u32,
    ) -> Result<InventoryRecord, LedgerError> {
        let stock = self.seller_stock_or_insert(seller)?;
        let mut records = stock.lock().map_err(|_| poisoned(seller))?;
        let record = records.entry(sku).or_default();
        record
            .set_on_hand(on_hand)
            .map_err(|reserved| LedgerError::BelowReserved {
                sku,
                on_hand,
                reserved,
            })?;
        Ok(*record)
    }

    fn snapshot(&self, seller: SellerId) -> Result<Vec<(SkuKey, InventoryRecord)>, LedgerError> {
        let Some(stock) = self.seller_stock(seller)? else {
            return Ok(Vec::new());
        };
        let records = stock.lock().map_err(|_| poisoned(seller))?;
        Ok(records.iter().map(|(k, v)| (*k, *v)).collect())
    }

    fn set_central_stock(&self, sku: SkuKey, record: CentralStockRecord) -> Result<(), LedgerError> {
        let mut central = self
            .central
            .lock()
            .map_err(|_| LedgerError::storage("central stock lock poisoned"))?;
        central.insert(sku, record);
        Ok(())
    }

    fn central_stock(&self, sku: SkuKey) -> Result<Option<CentralStockRecord>, LedgerError> {
        let central = self
            .central
            .lock()
            .map_err(|_| LedgerError::storage("central stock lock poisoned"))?;
        Ok(central.get(&sku).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::InMemoryStockAlertSink;
    use crate::record::StockStatus;
    use proptest::prelude::*;
    use std::thread;

    fn sku() -> SkuKey {
        SkuKey::new(ProductId::new(), None)
    }

    fn line(sku: SkuKey, quantity: u32) -> StockLine {
        StockLine { sku, quantity }
    }

    #[test]
    fn missing_record_has_zero_available() {
        let ledger = InMemoryInventoryLedger::new();
        let s = sku();
        assert_eq!(ledger.available(SellerId::new(), s.product_id, None).unwrap(), 0);
    }

    #[test]
    fn reserve_is_all_or_nothing_across_lines() {
        let ledger = InMemoryInventoryLedger::new();
        let seller = SellerId::new();
        let (a, b) = (sku(), sku());
        ledger.set_on_hand(seller, a, 5).unwrap();
        ledger.set_on_hand(seller, b, 1).unwrap();

        let err = ledger
            .reserve(seller, &[line(a, 2), line(b, 2)])
            .unwrap_err();
        assert!(err.is_insufficient_stock());

        // Line `a` fit, but nothing was reserved because `b` did not.
        assert_eq!(ledger.available(seller, a.product_id, None).unwrap(), 5);
        assert_eq!(ledger.available(seller, b.product_id, None).unwrap(), 1);
    }

    #[test]
    fn duplicate_lines_are_checked_against_their_total() {
        let ledger = InMemoryInventoryLedger::new();
        let seller = SellerId::new();
        let a = sku();
        ledger.set_on_hand(seller, a, 3).unwrap();

        let err = ledger.reserve(seller, &[line(a, 2), line(a, 2)]).unwrap_err();
        match err {
            LedgerError::InsufficientStock { requested, available, .. } => {
                assert_eq!(requested, 4);
                assert_eq!(available, 3);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn unknown_seller_is_insufficient_not_an_error() {
        let ledger = InMemoryInventoryLedger::new();
        let err = ledger.reserve(SellerId::new(), &[line(sku(), 1)]).unwrap_err();
        assert!(err.is_insufficient_stock());
    }

    #[test]
    fn release_twice_never_goes_negative() {
        let ledger = InMemoryInventoryLedger::new();
        let seller = SellerId::new();
        let a = sku();
        ledger.set_on_hand(seller, a, 4).unwrap();
        ledger.reserve(seller, &[line(a, 3)]).unwrap();

        ledger.release(seller, &[line(a, 3)]).unwrap();
        ledger.release(seller, &[line(a, 3)]).unwrap();

        let snapshot = ledger.snapshot(seller).unwrap();
        assert_eq!(snapshot[0].1.reserved(), 0);
        assert_eq!(snapshot[0].1.available(), 4);
    }

    #[test]
    fn stock_intake_cannot_undercut_reservations() {
        let ledger = InMemoryInventoryLedger::new();
        let seller = SellerId::new();
        let a = sku();
        ledger.set_on_hand(seller, a, 4).unwrap();
        ledger.reserve(seller, &[line(a, 3)]).unwrap();

        match ledger.set_on_hand(seller, a, 2).unwrap_err() {
            LedgerError::BelowReserved { reserved, .. } => assert_eq!(reserved, 3),
            other => panic!("expected BelowReserved, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_reservations_never_oversell() {
        let ledger = Arc::new(InMemoryInventoryLedger::new());
        let seller = SellerId::new();
        let a = sku();
        ledger.set_on_hand(seller, a, 10).unwrap();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || ledger.reserve(seller, &[line(a, 1)]).is_ok())
            })
            .collect();
        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(granted, 10);
        assert_eq!(ledger.available(seller, a.product_id, None).unwrap(), 0);
    }

    #[test]
    fn commit_deduction_alerts_once_per_exhausted_line() {
        let sink = Arc::new(InMemoryStockAlertSink::new());
        let ledger = InMemoryInventoryLedger::with_alert_sink(sink.clone());
        let product = ProductId::new();
        let variation = VariationId::new();
        let var_sku = SkuKey::new(product, Some(variation));
        let other = sku();

        ledger.set_central_stock(var_sku, CentralStockRecord::tracked(1)).unwrap();
        ledger
            .set_central_stock(var_sku.product_level(), CentralStockRecord::tracked(10))
            .unwrap();
        ledger.set_central_stock(other, CentralStockRecord::tracked(5)).unwrap();

        let alerts = ledger
            .commit_deduction(&[line(var_sku, 1), line(other, 2)], Utc::now())
            .unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sku, var_sku);
        assert_eq!(sink.all(), alerts);

        let var_record = ledger.central_stock(var_sku).unwrap().unwrap();
        assert_eq!(var_record.status, StockStatus::OutOfStock);
        assert_eq!(ledger.central_stock(var_sku.product_level()).unwrap().unwrap().quantity, 9);
        assert_eq!(ledger.central_stock(other).unwrap().unwrap().quantity, 3);
    }

    #[test]
    fn commit_deduction_does_not_touch_seller_stock() {
        let ledger = InMemoryInventoryLedger::new();
        let seller = SellerId::new();
        let a = sku();
        ledger.set_on_hand(seller, a, 2).unwrap();
        ledger.set_central_stock(a, CentralStockRecord::tracked(2)).unwrap();

        ledger.commit_deduction(&[line(a, 1)], Utc::now()).unwrap();

        assert_eq!(ledger.available(seller, a.product_id, None).unwrap(), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        SetOnHand(usize, u32),
        Reserve(usize, u32),
        Release(usize, u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..2, 0u32..20).prop_map(|(i, q)| Op::SetOnHand(i, q)),
            (0usize..2, 1u32..6).prop_map(|(i, q)| Op::Reserve(i, q)),
            (0usize..2, 1u32..6).prop_map(|(i, q)| Op::Release(i, q)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any sequence of ledger operations, `0 <= reserved <= on_hand`.
        #[test]
        fn reserved_stays_within_on_hand(ops in prop::collection::vec(op(), 1..60)) {
            let ledger = InMemoryInventoryLedger::new();
            let seller = SellerId::new();
            let skus = [sku(), sku()];

            for op in ops {
                // Refusals are expected outcomes; only the invariant matters here.
                let _ = match op {
                    Op::SetOnHand(i, q) => ledger.set_on_hand(seller, skus[i], q).map(|_| ()),
                    Op::Reserve(i, q) => ledger.reserve(seller, &[line(skus[i], q)]),
                    Op::Release(i, q) => ledger.release(seller, &[line(skus[i], q)]),
                };

                for (_, record) in ledger.snapshot(seller).unwrap() {
                    prop_assert!(record.reserved() <= record.on_hand());
                    prop_assert_eq!(record.available(), record.on_hand() - record.reserved());
                }
            }
        }
    }
}
