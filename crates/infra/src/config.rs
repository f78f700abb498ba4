//! Configuration loading and representation.
//!
//! Everything comes from environment variables with development defaults.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use forgeroute_core::Coordinates;
use forgeroute_routing::{RoutingSettings, DEFAULT_HUB};

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_GEOCODER_USER_AGENT: &str = "forgeroute-fulfillment/0.1";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Geocoding client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GEOCODER_URL.to_string(),
            user_agent: DEFAULT_GEOCODER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Process configuration for the routing service.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    pub hub: Coordinates,
    pub assignment_window: chrono::Duration,
    pub sweep_interval: Duration,
    pub geocoder: GeocoderConfig,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            hub: DEFAULT_HUB,
            assignment_window: chrono::Duration::hours(24),
            sweep_interval: Duration::from_secs(60),
            geocoder: GeocoderConfig::default(),
            use_persistent_stores: false,
            database_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl RoutingConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (tests pass a map instead of touching the
    /// process environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let lat = parse_or(&get, "FULFILLMENT_HUB_LAT", defaults.hub.lat)?;
        let lon = parse_or(&get, "FULFILLMENT_HUB_LON", defaults.hub.lon)?;
        let hub = Coordinates::new(lat, lon).map_err(|e| ConfigError::Invalid {
            key: "FULFILLMENT_HUB_LAT/FULFILLMENT_HUB_LON",
            value: format!("{lat},{lon}"),
            reason: e.to_string(),
        })?;

        let window_hours: u32 = parse_or(&get, "ASSIGNMENT_WINDOW_HOURS", 24)?;
        if window_hours == 0 {
            return Err(ConfigError::Invalid {
                key: "ASSIGNMENT_WINDOW_HOURS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let sweep_secs: u64 = parse_or(&get, "EXPIRY_SWEEP_INTERVAL_SECS", 60)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "EXPIRY_SWEEP_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let timeout_secs: u64 = parse_or(&get, "GEOCODER_TIMEOUT_SECS", 5)?;
        let geocoder = GeocoderConfig {
            url: get("GEOCODER_URL").unwrap_or(defaults.geocoder.url),
            user_agent: get("GEOCODER_USER_AGENT").unwrap_or(defaults.geocoder.user_agent),
            timeout: Duration::from_secs(timeout_secs),
        };

        let use_persistent_stores = parse_or(&get, "USE_PERSISTENT_STORES", false)?;
        let database_url = get("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let bind_addr = parse_or(&get, "BIND_ADDR", defaults.bind_addr)?;

        Ok(Self {
            hub,
            assignment_window: chrono::Duration::hours(i64::from(window_hours)),
            sweep_interval: Duration::from_secs(sweep_secs),
            geocoder,
            use_persistent_stores,
            database_url,
            bind_addr,
        })
    }

    pub fn routing_settings(&self) -> RoutingSettings {
        RoutingSettings {
            hub: self.hub,
            assignment_window: self.assignment_window,
        }
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
