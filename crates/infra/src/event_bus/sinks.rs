//! Adapters that put routing transitions and stock alerts on an event bus.

use serde_json::Value as JsonValue;
use tracing::warn;

use forgeroute_core::AggregateRoot;
use forgeroute_events::{EventBus, EventEnvelope};
use forgeroute_inventory::{OutOfStock, StockAlertSink};
use forgeroute_orders::{AssignmentEvent, Order};
use forgeroute_routing::TransitionSink;

pub const ORDER_AGGREGATE_TYPE: &str = "fulfillment.order";
pub const CENTRAL_STOCK_AGGREGATE_TYPE: &str = "inventory.central";

/// Publishes committed order transitions as JSON envelopes.
///
/// Envelope sequence numbers are the order version after each event.
pub struct BusTransitionSink<B> {
    bus: B,
}

impl<B> BusTransitionSink<B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B> TransitionSink for BusTransitionSink<B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn publish(&self, order: &Order, events: &[AssignmentEvent]) {
        let order_id = order.id_typed();
        let first_seq = order.version().saturating_sub(events.len() as u64) + 1;

        for (offset, event) in events.iter().enumerate() {
            let envelope = match EventEnvelope::wrap(
                *order_id.as_uuid(),
                ORDER_AGGREGATE_TYPE,
                first_seq + offset as u64,
                event,
            ) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(order = %order_id, error = %e, "failed to serialize transition");
                    continue;
                }
            };
            if let Err(e) = self.bus.publish(envelope) {
                warn!(order = %order_id, error = ?e, "failed to publish transition");
            }
        }
    }
}

/// Publishes central out-of-stock alerts as JSON envelopes (stream per product,
/// not sequenced).
pub struct BusStockAlertSink<B> {
    bus: B,
}

impl<B> BusStockAlertSink<B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B> StockAlertSink for BusStockAlertSink<B>
where
    B: EventBus<EventEnvelope<JsonValue>> + 'static,
{
    fn out_of_stock(&self, alert: &OutOfStock) {
        let envelope = match EventEnvelope::wrap(
            *alert.sku.product_id.as_uuid(),
            CENTRAL_STOCK_AGGREGATE_TYPE,
            0,
            alert,
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(sku = %alert.sku, error = %e, "failed to serialize stock alert");
                return;
            }
        };
        if let Err(e) = self.bus.publish(envelope) {
            warn!(sku = %alert.sku, error = ?e, "failed to publish stock alert");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use forgeroute_core::{Aggregate, AggregateRoot, OrderId, ProductId, SellerId};
    use forgeroute_events::InMemoryEventBus;
    use forgeroute_inventory::SkuKey;
    use forgeroute_orders::{AssignSeller, AssignmentCommand, OrderLine, ShippingAddress};

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    #[test]
    fn transitions_carry_order_versions() {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let sink = BusTransitionSink::new(bus.clone());

        let now = Utc::now();
        let mut order = Order::place(
            OrderId::new(),
            vec![OrderLine {
                product_id: ProductId::new(),
                variation_id: None,
                quantity: 1,
            }],
            ShippingAddress::default(),
            now,
        )
        .unwrap();
        let events = order
            .execute(&AssignmentCommand::AssignSeller(AssignSeller {
                order_id: order.id_typed(),
                seller_id: SellerId::new(),
                expires_at: now + chrono::Duration::hours(1),
                auto_accept: true,
                lost_races: 0,
                occurred_at: now,
            }))
            .unwrap();
        sink.publish(&order, &events);

        let published = sub.drain();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].event_type(), "fulfillment.order.seller_assigned");
        assert_eq!(published[0].sequence_number(), 2);
        assert_eq!(published[1].event_type(), "fulfillment.order.accepted");
        assert_eq!(published[1].sequence_number(), 3);
        assert_eq!(published[1].aggregate_id(), *order.id_typed().as_uuid());
        assert_eq!(published[1].aggregate_type(), ORDER_AGGREGATE_TYPE);
    }

    #[test]
    fn stock_alerts_are_published() {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let sink = BusStockAlertSink::new(bus.clone());
        let alert = OutOfStock {
            sku: SkuKey::new(ProductId::new(), None),
            requested: 3,
            occurred_at: Utc::now(),
        };

        sink.out_of_stock(&alert);

        let published = sub.drain();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type(), "inventory.central.out_of_stock");
        assert_eq!(published[0].payload()["requested"], 3);
    }
}
