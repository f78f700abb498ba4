//! Event contracts and pub/sub mechanics.
//!
//! Routing transitions and out-of-stock alerts are published as
//! [`EventEnvelope`]s on an [`EventBus`] for dashboards and notifiers.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
