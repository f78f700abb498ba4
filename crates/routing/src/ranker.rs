//! Candidate ranking: which sellers can ship the whole order, nearest first.

use forgeroute_core::{Coordinates, distance_km};
use forgeroute_inventory::{InventoryLedger, LedgerError, StockLine};

use crate::seller::Seller;

/// An eligible seller and its distance to the customer.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub seller: Seller,
    /// Kilometers; `f64::INFINITY` when either side has no coordinates.
    pub distance_km: f64,
}

/// Rank sellers for an order.
///
/// A seller is eligible when it is active and can cover **every** line from
/// its available stock; split shipments are not supported. Eligible sellers
/// are sorted by `(distance, seller id)` so ties resolve the same way every
/// time.
///
/// Availability is read without locking. The result may be stale by the time
/// the caller reserves; the caller absorbs that by moving to the next
/// candidate.
pub fn rank_candidates<L>(
    destination: Option<&Coordinates>,
    sellers: &[Seller],
    lines: &[StockLine],
    ledger: &L,
) -> Result<Vec<Candidate>, LedgerError>
where
    L: InventoryLedger + ?Sized,
{
    let mut candidates = Vec::new();
    for seller in sellers.iter().filter(|s| s.active) {
        if !ledger.covers(seller.id, lines)? {
            continue;
        }
        candidates.push(Candidate {
            distance_km: distance_km(destination, seller.coordinates.as_ref()),
            seller: seller.clone(),
        });
    }

    candidates.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.seller.id.cmp(&b.seller.id))
    });
    Ok(candidates)
}
