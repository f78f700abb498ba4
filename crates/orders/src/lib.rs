//! Order routing state (event-sourced).
//!
//! This crate holds the per-order assignment state machine as deterministic
//! domain logic (no IO, no HTTP, no storage). Stock reservations, geocoding
//! and persistence are performed by the routing engine around it.

pub mod address;
pub mod order;

pub use address::ShippingAddress;
pub use order::{
    AssignSeller, AssignmentAccepted, AssignmentCommand, AssignmentEvent, AssignmentExpired,
    AssignmentRejected, AssignmentStatus, CancelOrder, DestinationResolved, ExpireAssignment,
    FallBackToAdmin, FallbackReason, FellBackToAdmin, FulfillmentSource, Order, OrderCancelled,
    OrderLine, OrderPlaced, PlaceOrder, AcceptAssignment, RejectAssignment, ResolveDestination,
    SellerAssigned,
};
