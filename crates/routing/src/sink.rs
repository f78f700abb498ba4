use std::sync::Mutex;

use forgeroute_core::OrderId;
use forgeroute_orders::{AssignmentEvent, Order};

/// Receiver of committed assignment transitions (dashboards, notifications).
///
/// Called after the order has been saved; `order` is the saved state and
/// `events` the transitions that produced it, oldest first. Publishing is
/// best-effort and must not fail the routing operation.
pub trait TransitionSink: Send + Sync {
    fn publish(&self, order: &Order, events: &[AssignmentEvent]);
}

/// Sink that drops every transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransitionSink;

impl TransitionSink for NoopTransitionSink {
    fn publish(&self, _order: &Order, _events: &[AssignmentEvent]) {}
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTransitionSink {
    inner: Mutex<Vec<(OrderId, AssignmentEvent)>>,
}

impl InMemoryTransitionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<(OrderId, AssignmentEvent)> {
        self.inner.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn for_order(&self, order_id: OrderId) -> Vec<AssignmentEvent> {
        self.all()
            .into_iter()
            .filter(|(id, _)| *id == order_id)
            .map(|(_, event)| event)
            .collect()
    }
}

impl TransitionSink for InMemoryTransitionSink {
    fn publish(&self, order: &Order, events: &[AssignmentEvent]) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.extend(events.iter().cloned().map(|e| (order.id_typed(), e)));
        }
    }
}

impl<S> TransitionSink for std::sync::Arc<S>
where
    S: TransitionSink + ?Sized,
{
    fn publish(&self, order: &Order, events: &[AssignmentEvent]) {
        (**self).publish(order, events)
    }
}
