use forgeroute_orders::FallbackReason;

use crate::ranker::Candidate;

/// Where an order should go next.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    AssignToSeller(Candidate),
    FallbackToAdmin(FallbackReason),
}

/// Choose between the best remaining candidate and the central hub.
///
/// The hub wins only when it is strictly closer. With an unknown destination
/// both distances are infinite and the seller is kept.
pub fn decide(best: Option<&Candidate>, hub_distance_km: f64) -> RoutingDecision {
    match best {
        None => RoutingDecision::FallbackToAdmin(FallbackReason::CandidatesExhausted),
        Some(candidate) if hub_distance_km < candidate.distance_km => {
            RoutingDecision::FallbackToAdmin(FallbackReason::HubCloser)
        }
        Some(candidate) => RoutingDecision::AssignToSeller(candidate.clone()),
    }
}
