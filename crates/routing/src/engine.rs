//! The routing engine: assign, reassign on reject/timeout, fall back to the
//! central hub, cancel.
//!
//! Every operation follows the same shape: load the order, decide and apply
//! through the aggregate, save with an exact-version check, then perform the
//! ledger side effect that must not be lost. Ordering of ledger calls
//! relative to the save decides who compensates when two writers race:
//!
//! - assign: reserve -> save -> release on conflict
//! - reject / timeout / cancel / override: save -> release
//! - admin fallback: save -> deduct central stock

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use forgeroute_core::{Aggregate, AggregateRoot, Coordinates, ExpectedVersion, OrderId, SellerId, distance_km};
use forgeroute_inventory::{InventoryLedger, StockLine};
use forgeroute_orders::{
    AcceptAssignment, AssignSeller, AssignmentCommand, AssignmentEvent, AssignmentStatus, CancelOrder,
    ExpireAssignment, FallBackToAdmin, FallbackReason, Order, OrderLine, RejectAssignment,
    ResolveDestination, ShippingAddress,
};

use crate::clock::{Clock, SystemClock};
use crate::decision::{RoutingDecision, decide};
use crate::error::RoutingError;
use crate::geocode::{Geocoder, NoopGeocoder};
use crate::outcome::AssignmentOutcome;
use crate::ranker::{Candidate, rank_candidates};
use crate::seller::SellerDirectory;
use crate::sink::{NoopTransitionSink, TransitionSink};
use crate::store::{OrderStore, StoreError};

/// Central warehouse (Guangzhou).
pub const DEFAULT_HUB: Coordinates = Coordinates {
    lat: 23.1291,
    lon: 113.2644,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingSettings {
    /// Location of the centralized fulfillment hub.
    pub hub: Coordinates,
    /// How long a seller has to accept before the assignment times out.
    pub assignment_window: Duration,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            hub: DEFAULT_HUB,
            assignment_window: Duration::hours(24),
        }
    }
}

/// Admin dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DashboardCounts {
    pub pending_seller_acceptance: u64,
    pub accepted_by_sellers: u64,
    pub admin_fallbacks: u64,
}

/// Orchestrates ranking, reservation and the assignment state machine.
///
/// Safe to share across threads. No lock is held across ranking: the only
/// serialization points are the ledger's per-seller reservation and the
/// order store's version check.
pub struct RoutingEngine {
    orders: Arc<dyn OrderStore>,
    sellers: Arc<dyn SellerDirectory>,
    ledger: Arc<dyn InventoryLedger>,
    geocoder: Arc<dyn Geocoder>,
    clock: Arc<dyn Clock>,
    transitions: Arc<dyn TransitionSink>,
    settings: RoutingSettings,
}

impl RoutingEngine {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        sellers: Arc<dyn SellerDirectory>,
        ledger: Arc<dyn InventoryLedger>,
        settings: RoutingSettings,
    ) -> Self {
        Self {
            orders,
            sellers,
            ledger,
            geocoder: Arc::new(NoopGeocoder),
            clock: Arc::new(SystemClock),
            transitions: Arc::new(NoopTransitionSink),
            settings,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transition_sink(mut self, transitions: Arc<dyn TransitionSink>) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn settings(&self) -> &RoutingSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ---------------------------------------------------------------------
    // Intake and reads
    // ---------------------------------------------------------------------

    /// Register a paid order in `unassigned`. Routing is a separate `assign` call.
    pub fn place_order(
        &self,
        order_id: OrderId,
        lines: Vec<OrderLine>,
        shipping: ShippingAddress,
    ) -> Result<Order, RoutingError> {
        let order = Order::place(order_id, lines, shipping, self.now())?;
        self.orders.insert(&order)?;
        info!(order = %order_id, lines = order.lines().len(), "order placed");
        Ok(order)
    }

    pub fn order(&self, order_id: OrderId) -> Result<Order, RoutingError> {
        self.load(order_id)
    }

    /// Orders assigned to `seller` and waiting for an answer.
    pub fn pending_for_seller(&self, seller: SellerId) -> Result<Vec<Order>, RoutingError> {
        Ok(self.orders.assigned_to(seller, AssignmentStatus::Assigned)?)
    }

    pub fn dashboard(&self) -> Result<DashboardCounts, RoutingError> {
        Ok(DashboardCounts {
            pending_seller_acceptance: self.orders.count_by_status(AssignmentStatus::Assigned)?,
            accepted_by_sellers: self.orders.count_by_status(AssignmentStatus::Accepted)?,
            admin_fallbacks: self.orders.count_by_status(AssignmentStatus::AdminFallback)?,
        })
    }

    /// Orders whose assignment window has elapsed as of now, oldest first.
    pub fn expired_orders(&self, limit: usize) -> Result<Vec<OrderId>, RoutingError> {
        Ok(self.orders.expired_assignments(self.now(), limit)?)
    }

    /// Rejected or timed-out orders that were released but never re-routed,
    /// e.g. because the re-route hit a storage error. `assign` picks them up.
    pub fn stranded_orders(&self, limit: usize) -> Result<Vec<OrderId>, RoutingError> {
        Ok(self.orders.stranded_orders(limit)?)
    }

    // ---------------------------------------------------------------------
    // Routing
    // ---------------------------------------------------------------------

    /// Route an order to the nearest seller that can ship all of it, or to
    /// the central hub.
    ///
    /// Calling this for an order that is already assigned, accepted or
    /// otherwise settled is a no-op (`NotRoutable`); stock is never reserved
    /// twice for the same order.
    pub fn assign(&self, order_id: OrderId) -> Result<AssignmentOutcome, RoutingError> {
        let mut order = self.load(order_id)?;
        if !order.status().is_routable() {
            debug!(order = %order_id, status = %order.status(), "assign skipped");
            return Ok(AssignmentOutcome::NotRoutable {
                status: order.status(),
            });
        }

        let expected = ExpectedVersion::Exact(order.version());
        let now = self.now();
        let mut events = self.resolve_destination(&mut order, now);

        let lines = order.stock_lines();
        let sellers = self.sellers.active_sellers()?;
        let candidates = rank_candidates(order.destination(), &sellers, &lines, &*self.ledger)?;
        let hub_distance = distance_km(order.destination(), Some(&self.settings.hub));

        // Sellers that lost a reservation race during this call.
        let mut raced: BTreeSet<SellerId> = BTreeSet::new();
        loop {
            let best = candidates.iter().find(|c| {
                !order.excluded_sellers().contains(&c.seller.id) && !raced.contains(&c.seller.id)
            });

            match decide(best, hub_distance) {
                RoutingDecision::AssignToSeller(candidate) => {
                    match self.ledger.reserve(candidate.seller.id, &lines) {
                        Ok(()) => {
                            let lost_races = raced.len() as u32;
                            return self.commit_assignment(order, expected, events, candidate, lost_races, &lines, now);
                        }
                        Err(e) if e.is_insufficient_stock() => {
                            debug!(
                                order = %order_id,
                                seller = %candidate.seller.id,
                                error = %e,
                                "candidate lost stock race, trying next"
                            );
                            raced.insert(candidate.seller.id);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                RoutingDecision::FallbackToAdmin(reason) => {
                    events.extend(order.execute(&AssignmentCommand::FallBackToAdmin(FallBackToAdmin {
                        order_id,
                        reason,
                        lost_races: raced.len() as u32,
                        occurred_at: now,
                    }))?);
                    return self.commit_fallback(order, expected, events, &lines, None, now);
                }
            }
        }
    }

    /// Seller accepts the order assigned to them.
    pub fn accept(&self, order_id: OrderId, seller: SellerId) -> Result<Order, RoutingError> {
        let mut order = self.load(order_id)?;
        let expected = ExpectedVersion::Exact(order.version());
        let events = order.execute(&AssignmentCommand::AcceptAssignment(AcceptAssignment {
            order_id,
            seller_id: seller,
            occurred_at: self.now(),
        }))?;
        self.orders.save(&order, expected)?;
        info!(order = %order_id, seller = %seller, "assignment accepted");
        self.transitions.publish(&order, &events);
        Ok(order)
    }

    /// System-initiated reject: release the holder's reservation and re-route.
    pub fn reject(&self, order_id: OrderId) -> Result<AssignmentOutcome, RoutingError> {
        self.reject_inner(order_id, None)
    }

    /// Reject by the seller holding the order; other sellers are refused
    /// with `DomainError::Unauthorized`.
    pub fn reject_by_seller(
        &self,
        order_id: OrderId,
        seller: SellerId,
    ) -> Result<AssignmentOutcome, RoutingError> {
        self.reject_inner(order_id, Some(seller))
    }

    /// Timeout path used by the expiry sweeper: same release and re-route as
    /// a reject, but only once the assignment window has elapsed.
    pub fn expire(&self, order_id: OrderId) -> Result<AssignmentOutcome, RoutingError> {
        let now = self.now();
        self.release_and_reroute(
            order_id,
            AssignmentCommand::ExpireAssignment(ExpireAssignment {
                order_id,
                occurred_at: now,
            }),
        )
    }

    /// Cancel an order, releasing any reservation it holds. Cancelling twice
    /// is harmless.
    pub fn cancel(&self, order_id: OrderId) -> Result<Order, RoutingError> {
        let mut order = self.load(order_id)?;
        let expected = ExpectedVersion::Exact(order.version());
        let lines = order.stock_lines();
        let events = order.execute(&AssignmentCommand::CancelOrder(CancelOrder {
            order_id,
            occurred_at: self.now(),
        }))?;
        if events.is_empty() {
            return Ok(order);
        }

        self.orders.save(&order, expected)?;
        if let Some(AssignmentEvent::OrderCancelled(cancelled)) = events.first() {
            if let Some(seller) = cancelled.released_seller {
                self.ledger.release(seller, &lines)?;
            }
            info!(
                order = %order_id,
                previous = %cancelled.previous_status,
                "order cancelled"
            );
        }
        self.transitions.publish(&order, &events);
        Ok(order)
    }

    /// Take an assigned or accepted order away from its seller and fulfill
    /// it centrally.
    pub fn override_to_admin(&self, order_id: OrderId) -> Result<AssignmentOutcome, RoutingError> {
        let mut order = self.load(order_id)?;
        let expected = ExpectedVersion::Exact(order.version());
        let lines = order.stock_lines();
        let now = self.now();
        let released = order.assigned_seller();
        let events = order.execute(&AssignmentCommand::FallBackToAdmin(FallBackToAdmin {
            order_id,
            reason: FallbackReason::AdminOverride,
            lost_races: 0,
            occurred_at: now,
        }))?;
        self.commit_fallback(order, expected, events, &lines, released, now)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn load(&self, order_id: OrderId) -> Result<Order, RoutingError> {
        self.orders
            .load(order_id)?
            .ok_or(RoutingError::OrderNotFound(order_id))
    }

    fn reject_inner(
        &self,
        order_id: OrderId,
        seller: Option<SellerId>,
    ) -> Result<AssignmentOutcome, RoutingError> {
        let now = self.now();
        self.release_and_reroute(
            order_id,
            AssignmentCommand::RejectAssignment(RejectAssignment {
                order_id,
                seller_id: seller,
                occurred_at: now,
            }),
        )
    }

    /// Apply a reject/timeout, give the stock back and route again.
    ///
    /// The release is committed before routing starts. If routing then
    /// fails, the order is left in `rejected`/`timeout` and shows up in
    /// `stranded_orders` for the sweeper to retry.
    fn release_and_reroute(
        &self,
        order_id: OrderId,
        command: AssignmentCommand,
    ) -> Result<AssignmentOutcome, RoutingError> {
        let mut order = self.load(order_id)?;
        let expected = ExpectedVersion::Exact(order.version());
        let lines = order.stock_lines();
        let events = order.execute(&command)?;

        self.orders.save(&order, expected)?;

        let released = events.iter().find_map(|e| match e {
            AssignmentEvent::AssignmentRejected(e) => Some(e.seller_id),
            AssignmentEvent::AssignmentExpired(e) => Some(e.seller_id),
            _ => None,
        });
        if let Some(seller) = released {
            self.ledger.release(seller, &lines)?;
            info!(
                order = %order_id,
                seller = %seller,
                status = %order.status(),
                "assignment released, re-routing"
            );
        }
        self.transitions.publish(&order, &events);

        self.assign(order_id)
    }

    /// Best-effort geocoding of an order without destination coordinates.
    fn resolve_destination(&self, order: &mut Order, now: DateTime<Utc>) -> Vec<AssignmentEvent> {
        if order.destination().is_some() || order.shipping().is_blank() {
            return Vec::new();
        }

        let order_id = order.id_typed();
        match self.geocoder.geocode(order.shipping()) {
            Ok(Some(coordinates)) => {
                match order.execute(&AssignmentCommand::ResolveDestination(ResolveDestination {
                    order_id,
                    coordinates,
                    occurred_at: now,
                })) {
                    Ok(events) => {
                        debug!(order = %order_id, lat = coordinates.lat, lon = coordinates.lon, "destination resolved");
                        events
                    }
                    Err(e) => {
                        warn!(order = %order_id, error = %e, "could not record destination");
                        Vec::new()
                    }
                }
            }
            Ok(None) => {
                warn!(order = %order_id, "address not found by geocoder, routing without destination");
                Vec::new()
            }
            Err(e) => {
                warn!(order = %order_id, error = %e, "geocoding failed, routing without destination");
                Vec::new()
            }
        }
    }

    fn commit_assignment(
        &self,
        mut order: Order,
        expected: ExpectedVersion,
        mut events: Vec<AssignmentEvent>,
        candidate: Candidate,
        lost_races: u32,
        lines: &[StockLine],
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome, RoutingError> {
        let order_id = order.id_typed();
        let seller = &candidate.seller;

        let assigned = order.execute(&AssignmentCommand::AssignSeller(AssignSeller {
            order_id,
            seller_id: seller.id,
            expires_at: now + self.settings.assignment_window,
            auto_accept: seller.auto_accept,
            lost_races,
            occurred_at: now,
        }));
        let assigned = match assigned {
            Ok(assigned) => assigned,
            Err(e) => {
                self.compensate_reservation(order_id, seller.id, lines);
                return Err(e.into());
            }
        };
        events.extend(assigned);

        match self.orders.save(&order, expected) {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                self.compensate_reservation(order_id, seller.id, lines);
                info!(order = %order_id, seller = %seller.id, "assignment superseded by a concurrent update");
                return Ok(AssignmentOutcome::Superseded);
            }
            Err(e) => {
                self.compensate_reservation(order_id, seller.id, lines);
                return Err(e.into());
            }
        }

        let auto_accepted = order.status() == AssignmentStatus::Accepted;
        info!(
            order = %order_id,
            seller = %seller.id,
            distance_km = candidate.distance_km,
            attempt = order.attempt_count(),
            auto_accepted,
            "order assigned to seller"
        );
        self.transitions.publish(&order, &events);

        Ok(AssignmentOutcome::Assigned {
            seller_id: seller.id,
            business_name: seller.business_name.clone(),
            distance_km: candidate.distance_km.is_finite().then_some(candidate.distance_km),
            attempt: order.attempt_count(),
            auto_accepted,
        })
    }

    fn commit_fallback(
        &self,
        order: Order,
        expected: ExpectedVersion,
        events: Vec<AssignmentEvent>,
        lines: &[StockLine],
        released: Option<SellerId>,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome, RoutingError> {
        let order_id = order.id_typed();
        let reason = events
            .iter()
            .find_map(|e| match e {
                AssignmentEvent::FellBackToAdmin(e) => Some(e.reason),
                _ => None,
            })
            .unwrap_or(FallbackReason::CandidatesExhausted);

        match self.orders.save(&order, expected) {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) if released.is_none() => {
                info!(order = %order_id, "admin fallback superseded by a concurrent update");
                return Ok(AssignmentOutcome::Superseded);
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(seller) = released {
            self.ledger.release(seller, lines)?;
        }
        let alerts = self.ledger.commit_deduction(lines, now)?;
        info!(
            order = %order_id,
            reason = reason.as_str(),
            out_of_stock = alerts.len(),
            "order routed to admin fulfillment"
        );
        self.transitions.publish(&order, &events);

        Ok(AssignmentOutcome::FellBackToAdmin {
            reason,
            out_of_stock_alerts: alerts.len(),
        })
    }

    fn compensate_reservation(&self, order_id: OrderId, seller: SellerId, lines: &[StockLine]) {
        if let Err(e) = self.ledger.release(seller, lines) {
            error!(order = %order_id, seller = %seller, error = %e, "failed to release reservation");
        }
    }
}

impl core::fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
