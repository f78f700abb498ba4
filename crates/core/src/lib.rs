//! `forgeroute-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, aggregate traits and geodesic distance.

pub mod aggregate;
pub mod error;
pub mod geo;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use geo::{distance_km, Coordinates, EARTH_RADIUS_KM};
pub use id::{OrderId, ProductId, SellerId, VariationId};
