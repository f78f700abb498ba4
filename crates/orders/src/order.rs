use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeroute_core::{Aggregate, AggregateRoot, Coordinates, DomainError, OrderId, ProductId, SellerId, VariationId};
use forgeroute_events::Event;
use forgeroute_inventory::StockLine;

use crate::address::ShippingAddress;

/// Routing status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Unassigned,
    Assigned,
    Accepted,
    Rejected,
    Timeout,
    AdminFallback,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Unassigned => "unassigned",
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Accepted => "accepted",
            AssignmentStatus::Rejected => "rejected",
            AssignmentStatus::Timeout => "timeout",
            AssignmentStatus::AdminFallback => "admin_fallback",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }

    /// States from which the engine may pick a (new) fulfillment source.
    pub fn is_routable(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Unassigned | AssignmentStatus::Rejected | AssignmentStatus::Timeout
        )
    }

    /// States in which a seller holds the order (and its reservation).
    pub fn holds_seller(&self) -> bool {
        matches!(self, AssignmentStatus::Assigned | AssignmentStatus::Accepted)
    }
}

impl core::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentSource {
    Seller,
    Admin,
}

/// Why an order went to centralized (admin) fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No remaining seller can cover every line.
    CandidatesExhausted,
    /// The central hub is strictly closer than the best eligible seller.
    HubCloser,
    /// An administrator took the order away from its seller.
    AdminOverride,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::CandidatesExhausted => "candidates_exhausted",
            FallbackReason::HubCloser => "hub_closer",
            FallbackReason::AdminOverride => "admin_override",
        }
    }
}

/// Order line: product (optionally a variation) and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub variation_id: Option<VariationId>,
    pub quantity: u32,
}

impl OrderLine {
    pub fn stock_line(&self) -> StockLine {
        StockLine::new(self.product_id, self.variation_id, self.quantity)
    }
}

/// Aggregate root: Order (routing view).
///
/// Invariant: `assigned_seller` is set iff `status` is `Assigned` or `Accepted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    lines: Vec<OrderLine>,
    shipping: ShippingAddress,
    fulfillment_source: Option<FulfillmentSource>,
    assigned_seller: Option<SellerId>,
    status: AssignmentStatus,
    attempt_count: u32,
    assignment_expiry: Option<DateTime<Utc>>,
    excluded_sellers: BTreeSet<SellerId>,
    placed_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            lines: Vec::new(),
            shipping: ShippingAddress::default(),
            fulfillment_source: None,
            assigned_seller: None,
            status: AssignmentStatus::Unassigned,
            attempt_count: 0,
            assignment_expiry: None,
            excluded_sellers: BTreeSet::new(),
            placed_at: None,
            version: 0,
            created: false,
        }
    }

    /// Place a new order in one step (handle + apply of `PlaceOrder`).
    pub fn place(
        id: OrderId,
        lines: Vec<OrderLine>,
        shipping: ShippingAddress,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let mut order = Self::empty(id);
        order.execute(&AssignmentCommand::PlaceOrder(PlaceOrder {
            order_id: id,
            lines,
            shipping,
            occurred_at,
        }))?;
        Ok(order)
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn stock_lines(&self) -> Vec<StockLine> {
        self.lines.iter().map(OrderLine::stock_line).collect()
    }

    pub fn shipping(&self) -> &ShippingAddress {
        &self.shipping
    }

    pub fn destination(&self) -> Option<&Coordinates> {
        self.shipping.coordinates.as_ref()
    }

    pub fn fulfillment_source(&self) -> Option<FulfillmentSource> {
        self.fulfillment_source
    }

    pub fn assigned_seller(&self) -> Option<SellerId> {
        self.assigned_seller
    }

    pub fn status(&self) -> AssignmentStatus {
        self.status
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn assignment_expiry(&self) -> Option<DateTime<Utc>> {
        self.assignment_expiry
    }

    pub fn excluded_sellers(&self) -> &BTreeSet<SellerId> {
        &self.excluded_sellers
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// `true` when the order sits with a seller past its assignment window.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == AssignmentStatus::Assigned
            && self.assignment_expiry.is_some_and(|expiry| now > expiry)
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder (paid order enters routing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingAddress,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResolveDestination (geocoding result written back).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveDestination {
    pub order_id: OrderId,
    pub coordinates: Coordinates,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignSeller. The caller has already reserved stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignSeller {
    pub order_id: OrderId,
    pub seller_id: SellerId,
    pub expires_at: DateTime<Utc>,
    pub auto_accept: bool,
    /// Picks in the same routing pass whose reservation failed before this one.
    #[serde(default)]
    pub lost_races: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcceptAssignment (seller action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptAssignment {
    pub order_id: OrderId,
    pub seller_id: SellerId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectAssignment.
///
/// `seller_id` is set when a seller rejects through their own channel and must
/// match the assigned seller; `None` is a system-initiated reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectAssignment {
    pub order_id: OrderId,
    pub seller_id: Option<SellerId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ExpireAssignment (`occurred_at` is the sweep time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpireAssignment {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FallBackToAdmin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallBackToAdmin {
    pub order_id: OrderId,
    pub reason: FallbackReason,
    /// Picks in the same routing pass whose reservation failed.
    #[serde(default)]
    pub lost_races: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignmentCommand {
    PlaceOrder(PlaceOrder),
    ResolveDestination(ResolveDestination),
    AssignSeller(AssignSeller),
    AcceptAssignment(AcceptAssignment),
    RejectAssignment(RejectAssignment),
    ExpireAssignment(ExpireAssignment),
    FallBackToAdmin(FallBackToAdmin),
    CancelOrder(CancelOrder),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingAddress,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DestinationResolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationResolved {
    pub order_id: OrderId,
    pub coordinates: Coordinates,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SellerAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerAssigned {
    pub order_id: OrderId,
    pub seller_id: SellerId,
    /// 1-based attempt number of this assignment.
    pub attempt: u32,
    pub expires_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AssignmentAccepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentAccepted {
    pub order_id: OrderId,
    pub seller_id: SellerId,
    /// `true` when accepted on the seller's behalf (auto-accept sellers).
    pub automatic: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AssignmentRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRejected {
    pub order_id: OrderId,
    pub seller_id: SellerId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AssignmentExpired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentExpired {
    pub order_id: OrderId,
    pub seller_id: SellerId,
    pub expired_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FellBackToAdmin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FellBackToAdmin {
    pub order_id: OrderId,
    pub reason: FallbackReason,
    /// Seller whose reservation must be released (admin override only).
    pub released_seller: Option<SellerId>,
    /// Failed seller picks counted by this fallback.
    #[serde(default)]
    pub lost_races: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub previous_status: AssignmentStatus,
    pub released_seller: Option<SellerId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignmentEvent {
    OrderPlaced(OrderPlaced),
    DestinationResolved(DestinationResolved),
    SellerAssigned(SellerAssigned),
    AssignmentAccepted(AssignmentAccepted),
    AssignmentRejected(AssignmentRejected),
    AssignmentExpired(AssignmentExpired),
    FellBackToAdmin(FellBackToAdmin),
    OrderCancelled(OrderCancelled),
}

impl AssignmentEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            AssignmentEvent::OrderPlaced(e) => e.order_id,
            AssignmentEvent::DestinationResolved(e) => e.order_id,
            AssignmentEvent::SellerAssigned(e) => e.order_id,
            AssignmentEvent::AssignmentAccepted(e) => e.order_id,
            AssignmentEvent::AssignmentRejected(e) => e.order_id,
            AssignmentEvent::AssignmentExpired(e) => e.order_id,
            AssignmentEvent::FellBackToAdmin(e) => e.order_id,
            AssignmentEvent::OrderCancelled(e) => e.order_id,
        }
    }
}

impl Event for AssignmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AssignmentEvent::OrderPlaced(_) => "fulfillment.order.placed",
            AssignmentEvent::DestinationResolved(_) => "fulfillment.order.destination_resolved",
            AssignmentEvent::SellerAssigned(_) => "fulfillment.order.seller_assigned",
            AssignmentEvent::AssignmentAccepted(_) => "fulfillment.order.accepted",
            AssignmentEvent::AssignmentRejected(_) => "fulfillment.order.rejected",
            AssignmentEvent::AssignmentExpired(_) => "fulfillment.order.timed_out",
            AssignmentEvent::FellBackToAdmin(_) => "fulfillment.order.admin_fallback",
            AssignmentEvent::OrderCancelled(_) => "fulfillment.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AssignmentEvent::OrderPlaced(e) => e.occurred_at,
            AssignmentEvent::DestinationResolved(e) => e.occurred_at,
            AssignmentEvent::SellerAssigned(e) => e.occurred_at,
            AssignmentEvent::AssignmentAccepted(e) => e.occurred_at,
            AssignmentEvent::AssignmentRejected(e) => e.occurred_at,
            AssignmentEvent::AssignmentExpired(e) => e.occurred_at,
            AssignmentEvent::FellBackToAdmin(e) => e.occurred_at,
            AssignmentEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = AssignmentCommand;
    type Event = AssignmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AssignmentEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.lines = e.lines.clone();
                self.shipping = e.shipping.clone();
                self.status = AssignmentStatus::Unassigned;
                self.placed_at = Some(e.occurred_at);
                self.created = true;
            }
            AssignmentEvent::DestinationResolved(e) => {
                self.shipping.coordinates = Some(e.coordinates);
            }
            AssignmentEvent::SellerAssigned(e) => {
                self.status = AssignmentStatus::Assigned;
                self.fulfillment_source = Some(FulfillmentSource::Seller);
                self.assigned_seller = Some(e.seller_id);
                self.assignment_expiry = Some(e.expires_at);
                self.attempt_count = e.attempt;
            }
            AssignmentEvent::AssignmentAccepted(_) => {
                self.status = AssignmentStatus::Accepted;
                self.assignment_expiry = None;
            }
            AssignmentEvent::AssignmentRejected(e) => {
                self.status = AssignmentStatus::Rejected;
                self.release_seller(e.seller_id);
            }
            AssignmentEvent::AssignmentExpired(e) => {
                self.status = AssignmentStatus::Timeout;
                self.release_seller(e.seller_id);
            }
            AssignmentEvent::FellBackToAdmin(e) => {
                self.status = AssignmentStatus::AdminFallback;
                self.attempt_count = self.attempt_count.saturating_add(e.lost_races);
                self.fulfillment_source = Some(FulfillmentSource::Admin);
                self.assigned_seller = None;
                self.assignment_expiry = None;
            }
            AssignmentEvent::OrderCancelled(_) => {
                self.status = AssignmentStatus::Cancelled;
                self.assigned_seller = None;
                self.assignment_expiry = None;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AssignmentCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            AssignmentCommand::ResolveDestination(cmd) => self.handle_resolve(cmd),
            AssignmentCommand::AssignSeller(cmd) => self.handle_assign(cmd),
            AssignmentCommand::AcceptAssignment(cmd) => self.handle_accept(cmd),
            AssignmentCommand::RejectAssignment(cmd) => self.handle_reject(cmd),
            AssignmentCommand::ExpireAssignment(cmd) => self.handle_expire(cmd),
            AssignmentCommand::FallBackToAdmin(cmd) => self.handle_fallback(cmd),
            AssignmentCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Order {
    fn release_seller(&mut self, seller_id: SellerId) {
        self.assigned_seller = None;
        self.assignment_expiry = None;
        self.excluded_sellers.insert(seller_id);
    }

    fn ensure_created(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    /// The seller currently holding the order; only valid in `Assigned`/`Accepted`.
    fn holder(&self) -> Result<SellerId, DomainError> {
        self.assigned_seller
            .ok_or_else(|| DomainError::invariant("assigned order has no seller"))
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<AssignmentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("order must have at least one line"));
        }
        if cmd.lines.iter().any(|line| line.quantity == 0) {
            return Err(DomainError::validation("line quantity must be positive"));
        }

        Ok(vec![AssignmentEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            lines: cmd.lines.clone(),
            shipping: cmd.shipping.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resolve(&self, cmd: &ResolveDestination) -> Result<Vec<AssignmentEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        if self.status == AssignmentStatus::Cancelled {
            return Err(DomainError::invariant("cannot update a cancelled order"));
        }
        if self.shipping.coordinates == Some(cmd.coordinates) {
            return Ok(Vec::new());
        }

        Ok(vec![AssignmentEvent::DestinationResolved(DestinationResolved {
            order_id: cmd.order_id,
            coordinates: cmd.coordinates,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign(&self, cmd: &AssignSeller) -> Result<Vec<AssignmentEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        if !self.status.is_routable() {
            return Err(DomainError::invariant(format!(
                "cannot assign a seller to an order in status {}",
                self.status
            )));
        }
        if self.excluded_sellers.contains(&cmd.seller_id) {
            return Err(DomainError::invariant(
                "seller already rejected or timed out on this order",
            ));
        }
        if cmd.expires_at <= cmd.occurred_at {
            return Err(DomainError::validation("assignment expiry must be in the future"));
        }

        let mut events = vec![AssignmentEvent::SellerAssigned(SellerAssigned {
            order_id: cmd.order_id,
            seller_id: cmd.seller_id,
            attempt: self.attempt_count.saturating_add(cmd.lost_races).saturating_add(1),
            expires_at: cmd.expires_at,
            occurred_at: cmd.occurred_at,
        })];
        if cmd.auto_accept {
            events.push(AssignmentEvent::AssignmentAccepted(AssignmentAccepted {
                order_id: cmd.order_id,
                seller_id: cmd.seller_id,
                automatic: true,
                occurred_at: cmd.occurred_at,
            }));
        }
        Ok(events)
    }

    fn handle_accept(&self, cmd: &AcceptAssignment) -> Result<Vec<AssignmentEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        if self.status != AssignmentStatus::Assigned {
            return Err(DomainError::invariant(format!(
                "only assigned orders can be accepted (status: {})",
                self.status
            )));
        }
        if self.holder()? != cmd.seller_id {
            return Err(DomainError::Unauthorized);
        }

        Ok(vec![AssignmentEvent::AssignmentAccepted(AssignmentAccepted {
            order_id: cmd.order_id,
            seller_id: cmd.seller_id,
            automatic: false,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectAssignment) -> Result<Vec<AssignmentEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        if self.status != AssignmentStatus::Assigned {
            return Err(DomainError::invariant(format!(
                "only assigned orders can be rejected (status: {})",
                self.status
            )));
        }
        let holder = self.holder()?;
        if cmd.seller_id.is_some_and(|seller| seller != holder) {
            return Err(DomainError::Unauthorized);
        }

        Ok(vec![AssignmentEvent::AssignmentRejected(AssignmentRejected {
            order_id: cmd.order_id,
            seller_id: holder,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_expire(&self, cmd: &ExpireAssignment) -> Result<Vec<AssignmentEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        if self.status != AssignmentStatus::Assigned {
            return Err(DomainError::invariant(format!(
                "only assigned orders can time out (status: {})",
                self.status
            )));
        }
        let expired_at = self
            .assignment_expiry
            .ok_or_else(|| DomainError::invariant("assigned order has no expiry"))?;
        if cmd.occurred_at <= expired_at {
            return Err(DomainError::invariant("assignment window has not elapsed"));
        }

        Ok(vec![AssignmentEvent::AssignmentExpired(AssignmentExpired {
            order_id: cmd.order_id,
            seller_id: self.holder()?,
            expired_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_fallback(&self, cmd: &FallBackToAdmin) -> Result<Vec<AssignmentEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        let allowed = match cmd.reason {
            FallbackReason::AdminOverride => self.status.holds_seller(),
            FallbackReason::CandidatesExhausted | FallbackReason::HubCloser => {
                self.status.is_routable()
            }
        };
        if !allowed {
            return Err(DomainError::invariant(format!(
                "cannot fall back to admin ({}) from status {}",
                cmd.reason.as_str(),
                self.status
            )));
        }

        Ok(vec![AssignmentEvent::FellBackToAdmin(FellBackToAdmin {
            order_id: cmd.order_id,
            reason: cmd.reason,
            released_seller: self.assigned_seller,
            lost_races: cmd.lost_races,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<AssignmentEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        if self.status == AssignmentStatus::Cancelled {
            return Ok(Vec::new());
        }

        Ok(vec![AssignmentEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            previous_status: self.status,
            released_seller: self.assigned_seller,
            occurred_at: cmd.occurred_at,
        })])
    }
}
