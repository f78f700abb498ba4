use thiserror::Error;

use forgeroute_core::{DomainError, OrderId};
use forgeroute_inventory::LedgerError;

use crate::store::StoreError;

/// Routing operation error.
///
/// Expected business outcomes (no eligible seller, a lost stock race) are
/// reported through `AssignmentOutcome`, not here. `Store` and `Ledger` are
/// infrastructure failures; `Domain` carries an illegal transition or an
/// ownership mismatch back to the caller.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
