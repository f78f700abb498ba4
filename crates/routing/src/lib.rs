//! Order routing: candidate ranking, the seller-vs-hub decision and the
//! engine that drives orders through assignment, reassignment and fallback.
//!
//! The engine is synchronous and thread-safe. Storage, geocoding, time and
//! transition publishing are injected through the traits in this crate so
//! the same engine runs against in-memory adapters in tests and Postgres or
//! HTTP adapters in production.

pub mod clock;
pub mod decision;
pub mod engine;
pub mod error;
pub mod geocode;
pub mod outcome;
pub mod ranker;
pub mod seller;
pub mod sink;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{RoutingDecision, decide};
pub use engine::{DashboardCounts, RoutingEngine, RoutingSettings, DEFAULT_HUB};
pub use error::RoutingError;
pub use geocode::{GeocodeError, Geocoder, NoopGeocoder};
pub use outcome::AssignmentOutcome;
pub use ranker::{Candidate, rank_candidates};
pub use seller::{InMemorySellerDirectory, Seller, SellerDirectory};
pub use sink::{InMemoryTransitionSink, NoopTransitionSink, TransitionSink};
pub use store::{InMemoryOrderStore, OrderStore, StoreError};
