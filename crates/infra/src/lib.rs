//! Infrastructure layer: configuration, Postgres adapters, geocoding client,
//! event bus adapters and background workers.

pub mod config;
pub mod event_bus;
pub mod geocoding;
pub mod postgres;

/// Background workers (assignment expiry sweeper).
pub mod workers {
    pub mod expiry_sweeper;

    pub use expiry_sweeper::{ExpirySweeper, ExpirySweeperHandle, SweepReport, sweep_once};
}

pub use config::{ConfigError, GeocoderConfig, RoutingConfig};
