//! End-to-end routing scenarios against the in-memory adapters.
//!
//! Verifies:
//! - Nearest fully-stocked seller wins; the hub wins only when strictly closer
//! - Reject / timeout release stock and reassign to the next seller
//! - Concurrent assignments never oversell a seller
//! - A stale ranking that loses the reservation moves on to the next seller
//! - Cancel and admin override release held reservations

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    use forgeroute_core::{
        AggregateRoot, Coordinates, DomainError, ExpectedVersion, OrderId, ProductId, SellerId, VariationId,
    };
    use forgeroute_inventory::{
        CentralStockRecord, InMemoryInventoryLedger, InMemoryStockAlertSink, InventoryLedger, InventoryRecord,
        LedgerError, OutOfStock, SkuKey, StockLine, StockStatus,
    };
    use forgeroute_orders::{
        AssignmentEvent, AssignmentStatus, FallbackReason, FulfillmentSource, Order, OrderLine, ShippingAddress,
    };

    use crate::clock::{Clock, ManualClock};
    use crate::engine::{RoutingEngine, RoutingSettings};
    use crate::error::RoutingError;
    use crate::geocode::{GeocodeError, Geocoder};
    use crate::outcome::AssignmentOutcome;
    use crate::seller::{InMemorySellerDirectory, Seller, SellerDirectory};
    use crate::sink::InMemoryTransitionSink;
    use crate::store::{InMemoryOrderStore, OrderStore, StoreError};

    /// Customer sits on the equator at the prime meridian; one degree of
    /// longitude there is about 111.2 km.
    fn km_east(km: f64) -> Coordinates {
        Coordinates::new(0.0, km / 111.195).unwrap()
    }

    fn customer() -> ShippingAddress {
        ShippingAddress {
            city: "Nowhere".into(),
            country: "Atlantic".into(),
            coordinates: Some(km_east(0.0)),
            ..ShippingAddress::default()
        }
    }

    struct Fixture {
        engine: RoutingEngine,
        orders: Arc<InMemoryOrderStore>,
        sellers: Arc<InMemorySellerDirectory>,
        ledger: Arc<InMemoryInventoryLedger>,
        alerts: Arc<InMemoryStockAlertSink>,
        transitions: Arc<InMemoryTransitionSink>,
        clock: Arc<ManualClock>,
        product: ProductId,
    }

    impl Fixture {
        fn with_hub_km(hub_km: f64) -> Self {
            let orders = Arc::new(InMemoryOrderStore::new());
            let sellers = Arc::new(InMemorySellerDirectory::new());
            let alerts = Arc::new(InMemoryStockAlertSink::new());
            let ledger = Arc::new(InMemoryInventoryLedger::with_alert_sink(alerts.clone()));
            let transitions = Arc::new(InMemoryTransitionSink::new());
            let clock = Arc::new(ManualClock::new(Utc::now()));
            let settings = RoutingSettings {
                hub: km_east(hub_km),
                assignment_window: Duration::hours(24),
            };
            let engine = RoutingEngine::new(orders.clone(), sellers.clone(), ledger.clone(), settings)
                .with_clock(clock.clone())
                .with_transition_sink(transitions.clone());

            Self {
                engine,
                orders,
                sellers,
                ledger,
                alerts,
                transitions,
                clock,
                product: ProductId::new(),
            }
        }

        fn seller(&self, name: &str, km: f64, stock: u32) -> SellerId {
            self.seller_with(name, Some(km_east(km)), stock, false)
        }

        fn seller_with(&self, name: &str, at: Option<Coordinates>, stock: u32, auto_accept: bool) -> SellerId {
            let id = SellerId::new();
            self.sellers
                .upsert(Seller {
                    id,
                    business_name: name.into(),
                    active: true,
                    auto_accept,
                    coordinates: at,
                })
                .unwrap();
            self.ledger
                .set_on_hand(id, SkuKey::new(self.product, None), stock)
                .unwrap();
            id
        }

        fn order(&self, quantity: u32) -> OrderId {
            self.order_to(quantity, customer())
        }

        fn order_to(&self, quantity: u32, shipping: ShippingAddress) -> OrderId {
            let id = OrderId::new();
            self.engine
                .place_order(
                    id,
                    vec![OrderLine {
                        product_id: self.product,
                        variation_id: None,
                        quantity,
                    }],
                    shipping,
                )
                .unwrap();
            id
        }

        fn available(&self, seller: SellerId) -> u32 {
            self.ledger.available(seller, self.product, None).unwrap()
        }

        fn load(&self, id: OrderId) -> Order {
            self.engine.order(id).unwrap()
        }
    }

    #[test]
    fn nearest_stocked_seller_wins() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller("S", 5.0, 2);
        let t = fx.seller("T", 50.0, 10);
        let order_id = fx.order(1);

        let outcome = fx.engine.assign(order_id).unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.assigned_seller(), Some(s));
        let order = fx.load(order_id);
        assert_eq!(order.status(), AssignmentStatus::Assigned);
        assert_eq!(order.assigned_seller(), Some(s));
        assert_eq!(order.fulfillment_source(), Some(FulfillmentSource::Seller));
        assert_eq!(order.attempt_count(), 1);
        assert_eq!(order.assignment_expiry(), Some(fx.clock.now() + Duration::hours(24)));
        assert_eq!(fx.available(s), 1);
        assert_eq!(fx.available(t), 10);
    }

    #[test]
    fn hub_closer_than_best_seller_falls_back() {
        let fx = Fixture::with_hub_km(10.0);
        let s = fx.seller("S", 5.0, 0);
        let t = fx.seller("T", 50.0, 10);
        let sku = SkuKey::new(fx.product, None);
        fx.ledger.set_central_stock(sku, CentralStockRecord::tracked(5)).unwrap();
        let order_id = fx.order(1);

        let outcome = fx.engine.assign(order_id).unwrap();

        assert_eq!(
            outcome,
            AssignmentOutcome::FellBackToAdmin {
                reason: FallbackReason::HubCloser,
                out_of_stock_alerts: 0,
            }
        );
        let order = fx.load(order_id);
        assert_eq!(order.status(), AssignmentStatus::AdminFallback);
        assert_eq!(order.assigned_seller(), None);
        assert_eq!(order.fulfillment_source(), Some(FulfillmentSource::Admin));
        assert_eq!(fx.ledger.central_stock(sku).unwrap().unwrap().quantity, 4);
        assert_eq!(fx.available(s), 0);
        assert_eq!(fx.available(t), 10);
    }

    #[test]
    fn seller_reject_reassigns_to_next_candidate() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller("S", 5.0, 2);
        let t = fx.seller("T", 50.0, 10);
        let order_id = fx.order(1);
        fx.engine.assign(order_id).unwrap();

        let outcome = fx.engine.reject_by_seller(order_id, s).unwrap();

        assert_eq!(outcome.assigned_seller(), Some(t));
        let order = fx.load(order_id);
        assert_eq!(order.assigned_seller(), Some(t));
        assert_eq!(order.attempt_count(), 2);
        assert!(order.excluded_sellers().contains(&s));
        assert_eq!(fx.available(s), 2);
        assert_eq!(fx.available(t), 9);
    }

    #[test]
    fn reject_by_another_seller_is_refused() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller("S", 5.0, 2);
        let t = fx.seller("T", 50.0, 10);
        let order_id = fx.order(1);
        fx.engine.assign(order_id).unwrap();

        let err = fx.engine.reject_by_seller(order_id, t).unwrap_err();
        assert!(matches!(err, RoutingError::Domain(DomainError::Unauthorized)));
        assert_eq!(fx.load(order_id).assigned_seller(), Some(s));
        assert_eq!(fx.available(s), 1);
    }

    #[test]
    fn exhausted_candidates_fall_back_regardless_of_distance() {
        let fx = Fixture::with_hub_km(5_000.0);
        let s = fx.seller("S", 5.0, 1);
        let order_id = fx.order(1);
        fx.engine.assign(order_id).unwrap();

        let outcome = fx.engine.reject(order_id).unwrap();

        assert_eq!(
            outcome,
            AssignmentOutcome::FellBackToAdmin {
                reason: FallbackReason::CandidatesExhausted,
                out_of_stock_alerts: 0,
            }
        );
        assert_eq!(fx.load(order_id).status(), AssignmentStatus::AdminFallback);
        assert_eq!(fx.available(s), 1);
    }

    #[test]
    fn fallback_deducts_central_stock_and_raises_alerts() {
        let fx = Fixture::with_hub_km(5_000.0);
        let sku = SkuKey::new(fx.product, None);
        fx.ledger.set_central_stock(sku, CentralStockRecord::tracked(2)).unwrap();
        let order_id = fx.order(3);

        let outcome = fx.engine.assign(order_id).unwrap();

        assert_eq!(
            outcome,
            AssignmentOutcome::FellBackToAdmin {
                reason: FallbackReason::CandidatesExhausted,
                out_of_stock_alerts: 1,
            }
        );
        let central = fx.ledger.central_stock(sku).unwrap().unwrap();
        assert_eq!(central.quantity, 0);
        assert_eq!(central.status, StockStatus::OutOfStock);
        assert_eq!(fx.alerts.all().len(), 1);
    }

    #[test]
    fn assign_twice_does_not_double_reserve() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller("S", 5.0, 2);
        let order_id = fx.order(1);

        assert!(fx.engine.assign(order_id).unwrap().success());
        let second = fx.engine.assign(order_id).unwrap();

        assert_eq!(
            second,
            AssignmentOutcome::NotRoutable {
                status: AssignmentStatus::Assigned
            }
        );
        assert!(!second.success());
        assert_eq!(fx.available(s), 1);
    }

    #[test]
    fn auto_accept_sellers_keep_the_reservation() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller_with("Auto", Some(km_east(5.0)), 2, true);
        let order_id = fx.order(1);

        let outcome = fx.engine.assign(order_id).unwrap();

        match outcome {
            AssignmentOutcome::Assigned { auto_accepted, .. } => assert!(auto_accepted),
            other => panic!("expected Assigned, got {other:?}"),
        }
        assert_eq!(fx.load(order_id).status(), AssignmentStatus::Accepted);
        assert_eq!(fx.available(s), 1);
    }

    #[test]
    fn accept_requires_the_assigned_seller() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller("S", 5.0, 2);
        let order_id = fx.order(1);
        fx.engine.assign(order_id).unwrap();

        let err = fx.engine.accept(order_id, SellerId::new()).unwrap_err();
        assert!(matches!(err, RoutingError::Domain(DomainError::Unauthorized)));

        let order = fx.engine.accept(order_id, s).unwrap();
        assert_eq!(order.status(), AssignmentStatus::Accepted);
        assert_eq!(order.assignment_expiry(), None);
        assert!(fx.engine.pending_for_seller(s).unwrap().is_empty());
    }

    #[test]
    fn expired_assignment_is_released_and_reassigned() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller("S", 5.0, 2);
        let t = fx.seller("T", 50.0, 10);
        let order_id = fx.order(2);
        fx.engine.assign(order_id).unwrap();

        // Window not over yet.
        assert!(fx.engine.expire(order_id).is_err());
        assert!(fx.engine.expired_orders(10).unwrap().is_empty());

        fx.clock.advance(Duration::hours(24) + Duration::seconds(1));
        assert_eq!(fx.engine.expired_orders(10).unwrap(), vec![order_id]);

        let outcome = fx.engine.expire(order_id).unwrap();
        assert_eq!(outcome.assigned_seller(), Some(t));
        assert_eq!(fx.available(s), 2);
        assert_eq!(fx.available(t), 8);

        let events = fx.transitions.for_order(order_id);
        assert!(events.iter().any(|e| matches!(e, AssignmentEvent::AssignmentExpired(e) if e.seller_id == s)));
    }

    #[test]
    fn cancel_releases_reservation_and_is_idempotent() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller("S", 5.0, 2);
        let order_id = fx.order(2);
        fx.engine.assign(order_id).unwrap();
        assert_eq!(fx.available(s), 0);

        let order = fx.engine.cancel(order_id).unwrap();
        assert_eq!(order.status(), AssignmentStatus::Cancelled);
        assert_eq!(fx.available(s), 2);

        let again = fx.engine.cancel(order_id).unwrap();
        assert_eq!(again.version(), order.version());
        assert_eq!(fx.available(s), 2);
        assert!(!fx.engine.assign(order_id).unwrap().success());
    }

    #[test]
    fn admin_override_releases_the_seller() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller_with("Auto", Some(km_east(5.0)), 2, true);
        let order_id = fx.order(1);
        fx.engine.assign(order_id).unwrap();
        assert_eq!(fx.available(s), 1);

        let outcome = fx.engine.override_to_admin(order_id).unwrap();

        assert_eq!(
            outcome,
            AssignmentOutcome::FellBackToAdmin {
                reason: FallbackReason::AdminOverride,
                out_of_stock_alerts: 0,
            }
        );
        assert_eq!(fx.available(s), 2);
        assert_eq!(fx.engine.dashboard().unwrap().admin_fallbacks, 1);
    }

    #[test]
    fn unknown_order_is_reported() {
        let fx = Fixture::with_hub_km(500.0);
        let missing = OrderId::new();
        assert!(matches!(fx.engine.assign(missing), Err(RoutingError::OrderNotFound(id)) if id == missing));
    }

    #[test]
    fn transitions_are_published_in_order() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller("S", 5.0, 2);
        let order_id = fx.order(1);
        fx.engine.assign(order_id).unwrap();
        fx.engine.accept(order_id, s).unwrap();

        let events = fx.transitions.for_order(order_id);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AssignmentEvent::SellerAssigned(_)));
        assert!(matches!(events[1], AssignmentEvent::AssignmentAccepted(_)));
    }

    struct FixedGeocoder(Result<Option<Coordinates>, ()>);

    impl Geocoder for FixedGeocoder {
        fn geocode(&self, _address: &ShippingAddress) -> Result<Option<Coordinates>, GeocodeError> {
            self.0
                .map_err(|_| GeocodeError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn missing_destination_is_geocoded_and_saved() {
        let fx = Fixture::with_hub_km(500.0);
        let engine = RoutingEngine::new(fx.orders.clone(), fx.sellers.clone(), fx.ledger.clone(), *fx.engine.settings())
            .with_geocoder(Arc::new(FixedGeocoder(Ok(Some(km_east(0.0))))));
        fx.seller("Far", 50.0, 1);
        let near = fx.seller("Near", 5.0, 1);
        let order_id = fx.order_to(
            1,
            ShippingAddress {
                city: "Somewhere".into(),
                ..ShippingAddress::default()
            },
        );

        let outcome = engine.assign(order_id).unwrap();

        assert_eq!(outcome.assigned_seller(), Some(near));
        assert_eq!(fx.load(order_id).destination(), Some(&km_east(0.0)));
    }

    #[test]
    fn geocoding_failure_degrades_to_unknown_distance() {
        let fx = Fixture::with_hub_km(10.0);
        let engine = RoutingEngine::new(fx.orders.clone(), fx.sellers.clone(), fx.ledger.clone(), *fx.engine.settings())
            .with_geocoder(Arc::new(FixedGeocoder(Err(()))));
        let s = fx.seller("S", 50.0, 1);
        let order_id = fx.order_to(
            1,
            ShippingAddress {
                city: "Somewhere".into(),
                ..ShippingAddress::default()
            },
        );

        // Unknown destination: every distance is infinite, so the hub never wins.
        let outcome = engine.assign(order_id).unwrap();

        assert_eq!(outcome.assigned_seller(), Some(s));
        match outcome {
            AssignmentOutcome::Assigned { distance_km, .. } => assert_eq!(distance_km, None),
            other => panic!("expected Assigned, got {other:?}"),
        }
        assert_eq!(fx.load(order_id).destination(), None);
    }

    #[test]
    fn concurrent_assignments_share_one_unit_correctly() {
        let fx = Arc::new(Fixture::with_hub_km(5_000.0));
        let a = fx.seller("A", 5.0, 1);
        let b = fx.seller("B", 50.0, 1);
        let first = fx.order(1);
        let second = fx.order(1);

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [first, second]
            .into_iter()
            .map(|order_id| {
                let fx = fx.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    fx.engine.assign(order_id).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<AssignmentOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let mut winners: Vec<SellerId> = outcomes.iter().filter_map(|o| o.assigned_seller()).collect();
        winners.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(winners, expected);
        assert_eq!(fx.available(a), 0);
        assert_eq!(fx.available(b), 0);
    }

    /// Order store whose saves always lose the version race.
    struct AlwaysConflicting(InMemoryOrderStore);

    impl OrderStore for AlwaysConflicting {
        fn insert(&self, order: &Order) -> Result<(), StoreError> {
            self.0.insert(order)
        }

        fn load(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
            self.0.load(id)
        }

        fn save(&self, order: &Order, expected: ExpectedVersion) -> Result<(), StoreError> {
            Err(StoreError::Conflict {
                order_id: order.id_typed(),
                expected,
                actual: order.version() + 1,
            })
        }

        fn expired_assignments(
            &self,
            now: chrono::DateTime<Utc>,
            limit: usize,
        ) -> Result<Vec<OrderId>, StoreError> {
            self.0.expired_assignments(now, limit)
        }

        fn stranded_orders(&self, limit: usize) -> Result<Vec<OrderId>, StoreError> {
            self.0.stranded_orders(limit)
        }

        fn assigned_to(&self, seller: SellerId, status: AssignmentStatus) -> Result<Vec<Order>, StoreError> {
            self.0.assigned_to(seller, status)
        }

        fn count_by_status(&self, status: AssignmentStatus) -> Result<u64, StoreError> {
            self.0.count_by_status(status)
        }
    }

    #[test]
    fn superseded_assignment_releases_its_reservation() {
        let fx = Fixture::with_hub_km(500.0);
        let s = fx.seller("S", 5.0, 1);
        let store = Arc::new(AlwaysConflicting(InMemoryOrderStore::new()));
        let engine = RoutingEngine::new(store.clone(), fx.sellers.clone(), fx.ledger.clone(), *fx.engine.settings());
        let order_id = OrderId::new();
        engine
            .place_order(
                order_id,
                vec![OrderLine {
                    product_id: fx.product,
                    variation_id: None,
                    quantity: 1,
                }],
                customer(),
            )
            .unwrap();

        let outcome = engine.assign(order_id).unwrap();

        assert_eq!(outcome, AssignmentOutcome::Superseded);
        assert_eq!(fx.available(s), 1);
    }

    /// Ledger whose availability reads are stale: every seller looks fully
    /// stocked to the ranker, while `reserve` sees the real counters.
    struct StaleReads(Arc<InMemoryInventoryLedger>);

    impl InventoryLedger for StaleReads {
        fn available(
            &self,
            _seller: SellerId,
            _product: ProductId,
            _variation: Option<VariationId>,
        ) -> Result<u32, LedgerError> {
            Ok(u32::MAX)
        }

        fn reserve(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
            self.0.reserve(seller, lines)
        }

        fn release(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
            self.0.release(seller, lines)
        }

        fn commit_deduction(
            &self,
            lines: &[StockLine],
            occurred_at: chrono::DateTime<Utc>,
        ) -> Result<Vec<OutOfStock>, LedgerError> {
            self.0.commit_deduction(lines, occurred_at)
        }

        fn set_on_hand(&self, seller: SellerId, sku: SkuKey, on_hand: u32) -> Result<InventoryRecord, LedgerError> {
            self.0.set_on_hand(seller, sku, on_hand)
        }

        fn snapshot(&self, seller: SellerId) -> Result<Vec<(SkuKey, InventoryRecord)>, LedgerError> {
            self.0.snapshot(seller)
        }

        fn set_central_stock(&self, sku: SkuKey, record: CentralStockRecord) -> Result<(), LedgerError> {
            self.0.set_central_stock(sku, record)
        }

        fn central_stock(&self, sku: SkuKey) -> Result<Option<CentralStockRecord>, LedgerError> {
            self.0.central_stock(sku)
        }
    }

    impl Fixture {
        fn stale_engine(&self) -> RoutingEngine {
            RoutingEngine::new(
                self.orders.clone(),
                self.sellers.clone(),
                Arc::new(StaleReads(self.ledger.clone())),
                *self.engine.settings(),
            )
            .with_clock(self.clock.clone())
        }
    }

    #[test]
    fn lost_reservation_moves_on_to_the_next_candidate() {
        let fx = Fixture::with_hub_km(500.0);
        let near = fx.seller("near", 5.0, 0);
        let middle = fx.seller("middle", 10.0, 0);
        let far = fx.seller("far", 50.0, 3);
        let order_id = fx.order(1);

        let outcome = fx.stale_engine().assign(order_id).unwrap();

        assert_eq!(outcome.assigned_seller(), Some(far));
        let order = fx.load(order_id);
        assert_eq!(order.assigned_seller(), Some(far));
        assert_eq!(order.attempt_count(), 3);
        // Lost races are not rejections.
        assert!(!order.excluded_sellers().contains(&near));
        assert!(!order.excluded_sellers().contains(&middle));
        assert_eq!(fx.available(far), 2);
    }

    #[test]
    fn losing_every_reservation_falls_back_to_admin() {
        let fx = Fixture::with_hub_km(500.0);
        let a = fx.seller("A", 5.0, 0);
        let b = fx.seller("B", 10.0, 0);
        let order_id = fx.order(1);

        let outcome = fx.stale_engine().assign(order_id).unwrap();

        assert_eq!(
            outcome,
            AssignmentOutcome::FellBackToAdmin {
                reason: FallbackReason::CandidatesExhausted,
                out_of_stock_alerts: 0,
            }
        );
        let order = fx.load(order_id);
        assert_eq!(order.status(), AssignmentStatus::AdminFallback);
        assert_eq!(order.attempt_count(), 2);
        assert_eq!(fx.available(a), 0);
        assert_eq!(fx.available(b), 0);
    }

    fn point() -> impl Strategy<Value = Coordinates> {
        (-60.0f64..60.0, -170.0f64..170.0).prop_map(|(lat, lon)| Coordinates::new(lat, lon).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: whenever the hub is strictly closer than every eligible
        /// seller, the order goes to admin fulfillment.
        #[test]
        fn hub_strictly_closer_always_falls_back(
            destination in point(),
            hub in point(),
            seller_points in prop::collection::vec(point(), 1..5),
        ) {
            let hub_km = destination.distance_to(&hub);
            let nearest = seller_points
                .iter()
                .map(|p| destination.distance_to(p))
                .fold(f64::INFINITY, f64::min);
            prop_assume!(hub_km < nearest);

            let orders = Arc::new(InMemoryOrderStore::new());
            let sellers = Arc::new(InMemorySellerDirectory::new());
            let ledger = Arc::new(InMemoryInventoryLedger::new());
            let product = ProductId::new();
            for (i, p) in seller_points.iter().enumerate() {
                let id = SellerId::new();
                sellers.upsert(Seller {
                    id,
                    business_name: format!("seller-{i}"),
                    active: true,
                    auto_accept: false,
                    coordinates: Some(*p),
                }).unwrap();
                ledger.set_on_hand(id, SkuKey::new(product, None), 5).unwrap();
            }
            let settings = RoutingSettings { hub, assignment_window: Duration::hours(24) };
            let engine = RoutingEngine::new(orders, sellers, ledger, settings);

            let order_id = OrderId::new();
            engine.place_order(
                order_id,
                vec![OrderLine { product_id: product, variation_id: None, quantity: 1 }],
                ShippingAddress { coordinates: Some(destination), ..ShippingAddress::default() },
            ).unwrap();

            let outcome = engine.assign(order_id).unwrap();
            prop_assert_eq!(
                outcome,
                AssignmentOutcome::FellBackToAdmin { reason: FallbackReason::HubCloser, out_of_stock_alerts: 0 }
            );
        }
    }
}
