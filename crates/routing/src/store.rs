use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use thiserror::Error;

use forgeroute_core::{AggregateRoot, ExpectedVersion, OrderId, SellerId};
use forgeroute_orders::{AssignmentStatus, Order};

/// Order/seller storage error (infrastructure, not domain).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed: someone else saved the order first.
    #[error("order {order_id} was modified concurrently (expected {expected:?}, found {actual})")]
    Conflict {
        order_id: OrderId,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("order already exists: {0}")]
    Duplicate(OrderId),

    #[error("order not found: {0}")]
    NotFound(OrderId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Persistence for order routing state.
///
/// `save` is a compare-and-set on the aggregate version: the stored order
/// must still be at `expected` or the write is refused with
/// `StoreError::Conflict`.
pub trait OrderStore: Send + Sync {
    fn insert(&self, order: &Order) -> Result<(), StoreError>;

    fn load(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    fn save(&self, order: &Order, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Orders still `assigned` whose expiry is strictly before `now`, oldest first.
    fn expired_assignments(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OrderId>, StoreError>;

    /// Orders left in `rejected` or `timeout` with no seller: the release
    /// was saved but re-routing did not complete.
    fn stranded_orders(&self, limit: usize) -> Result<Vec<OrderId>, StoreError>;

    /// Orders held by `seller` in the given status.
    fn assigned_to(&self, seller: SellerId, status: AssignmentStatus) -> Result<Vec<Order>, StoreError>;

    fn count_by_status(&self, status: AssignmentStatus) -> Result<u64, StoreError>;
}

impl<S> OrderStore for std::sync::Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn insert(&self, order: &Order) -> Result<(), StoreError> {
        (**self).insert(order)
    }

    fn load(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).load(id)
    }

    fn save(&self, order: &Order, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(order, expected)
    }

    fn expired_assignments(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OrderId>, StoreError> {
        (**self).expired_assignments(now, limit)
    }

    fn stranded_orders(&self, limit: usize) -> Result<Vec<OrderId>, StoreError> {
        (**self).stranded_orders(limit)
    }

    fn assigned_to(&self, seller: SellerId, status: AssignmentStatus) -> Result<Vec<Order>, StoreError> {
        (**self).assigned_to(seller, status)
    }

    fn count_by_status(&self, status: AssignmentStatus) -> Result<u64, StoreError> {
        (**self).count_by_status(status)
    }
}

/// In-memory order store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        let id = order.id_typed();
        if orders.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        orders.insert(id, order.clone());
        Ok(())
    }

    fn load(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(orders.get(&id).cloned())
    }

    fn save(&self, order: &Order, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        let id = order.id_typed();
        let current = orders.get(&id).ok_or(StoreError::NotFound(id))?;
        if !expected.matches(current.version()) {
            return Err(StoreError::Conflict {
                order_id: id,
                expected,
                actual: current.version(),
            });
        }
        orders.insert(id, order.clone());
        Ok(())
    }

    fn expired_assignments(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OrderId>, StoreError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        let mut expired: Vec<(DateTime<Utc>, OrderId)> = orders
            .values()
            .filter(|o| o.is_expired(now))
            .filter_map(|o| o.assignment_expiry().map(|at| (at, o.id_typed())))
            .collect();
        expired.sort();
        Ok(expired.into_iter().take(limit).map(|(_, id)| id).collect())
    }

    fn stranded_orders(&self, limit: usize) -> Result<Vec<OrderId>, StoreError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        let mut stranded: Vec<(Option<DateTime<Utc>>, OrderId)> = orders
            .values()
            .filter(|o| matches!(o.status(), AssignmentStatus::Rejected | AssignmentStatus::Timeout))
            .map(|o| (o.placed_at(), o.id_typed()))
            .collect();
        stranded.sort();
        Ok(stranded.into_iter().take(limit).map(|(_, id)| id).collect())
    }

    fn assigned_to(&self, seller: SellerId, status: AssignmentStatus) -> Result<Vec<Order>, StoreError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        let mut held: Vec<Order> = orders
            .values()
            .filter(|o| o.status() == status && o.assigned_seller() == Some(seller))
            .cloned()
            .collect();
        held.sort_by_key(|o| (o.placed_at(), o.id_typed()));
        Ok(held)
    }

    fn count_by_status(&self, status: AssignmentStatus) -> Result<u64, StoreError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(orders.values().filter(|o| o.status() == status).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgeroute_core::{Aggregate, ProductId};
    use forgeroute_orders::{AssignSeller, AssignmentCommand, OrderLine, RejectAssignment, ShippingAddress};

    fn order() -> Order {
        Order::place(
            OrderId::new(),
            vec![OrderLine {
                product_id: ProductId::new(),
                variation_id: None,
                quantity: 1,
            }],
            ShippingAddress::default(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn stale_save_is_a_conflict() {
        let store = InMemoryOrderStore::new();
        let original = order();
        store.insert(&original).unwrap();

        let now = Utc::now();
        let assign = AssignmentCommand::AssignSeller(AssignSeller {
            order_id: original.id_typed(),
            seller_id: SellerId::new(),
            expires_at: now + chrono::Duration::hours(1),
            auto_accept: false,
            lost_races: 0,
            occurred_at: now,
        });

        let mut first = original.clone();
        first.execute(&assign).unwrap();
        store.save(&first, ExpectedVersion::Exact(original.version())).unwrap();

        let mut second = original.clone();
        second.execute(&assign).unwrap();
        let err = store
            .save(&second, ExpectedVersion::Exact(original.version()))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn duplicate_insert_is_refused() {
        let store = InMemoryOrderStore::new();
        let o = order();
        store.insert(&o).unwrap();
        assert!(matches!(store.insert(&o), Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn expired_assignments_are_strictly_past_expiry() {
        let store = InMemoryOrderStore::new();
        let mut o = order();
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(1);
        o.execute(&AssignmentCommand::AssignSeller(AssignSeller {
            order_id: o.id_typed(),
            seller_id: SellerId::new(),
            expires_at,
            auto_accept: false,
            lost_races: 0,
            occurred_at: now,
        }))
        .unwrap();
        store.insert(&o).unwrap();

        assert!(store.expired_assignments(expires_at, 10).unwrap().is_empty());
        let later = expires_at + chrono::Duration::seconds(1);
        assert_eq!(store.expired_assignments(later, 10).unwrap(), vec![o.id_typed()]);
    }

    #[test]
    fn rejected_orders_are_stranded_until_rerouted() {
        let store = InMemoryOrderStore::new();
        let mut o = order();
        let now = Utc::now();
        o.execute(&AssignmentCommand::AssignSeller(AssignSeller {
            order_id: o.id_typed(),
            seller_id: SellerId::new(),
            expires_at: now + chrono::Duration::hours(1),
            auto_accept: false,
            lost_races: 0,
            occurred_at: now,
        }))
        .unwrap();
        store.insert(&o).unwrap();
        store.insert(&order()).unwrap();
        assert!(store.stranded_orders(10).unwrap().is_empty());

        let expected = ExpectedVersion::Exact(o.version());
        o.execute(&AssignmentCommand::RejectAssignment(RejectAssignment {
            order_id: o.id_typed(),
            seller_id: None,
            occurred_at: now,
        }))
        .unwrap();
        store.save(&o, expected).unwrap();

        assert_eq!(store.stranded_orders(10).unwrap(), vec![o.id_typed()]);
        assert!(store.stranded_orders(0).unwrap().is_empty());
    }
}
