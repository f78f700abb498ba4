//! Nominatim (OpenStreetMap) search client.
//!
//! Blocking HTTP, meant to be called from the engine's worker threads. The
//! public Nominatim instance allows one request per second per client, so
//! requests are spaced by `min_interval`.

use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use forgeroute_core::Coordinates;
use forgeroute_orders::ShippingAddress;
use forgeroute_routing::{GeocodeError, Geocoder};

use crate::config::GeocoderConfig;

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Parse a Nominatim `format=json` search response; the first hit wins.
pub fn parse_response(body: &str) -> Result<Option<Coordinates>, GeocodeError> {
    let places: Vec<Place> =
        serde_json::from_str(body).map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;
    let Some(place) = places.first() else {
        return Ok(None);
    };

    let lat: f64 = place
        .lat
        .parse()
        .map_err(|_| GeocodeError::InvalidResponse(format!("bad latitude {:?}", place.lat)))?;
    let lon: f64 = place
        .lon
        .parse()
        .map_err(|_| GeocodeError::InvalidResponse(format!("bad longitude {:?}", place.lon)))?;
    Coordinates::new(lat, lon)
        .map(Some)
        .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))
}

pub struct NominatimGeocoder {
    config: GeocoderConfig,
    min_interval: Duration,
    // Built on first use so construction never happens on an async executor thread.
    client: OnceLock<reqwest::blocking::Client>,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> Self {
        Self {
            config,
            min_interval: Duration::from_secs(1),
            client: OnceLock::new(),
            last_request: Mutex::new(None),
        }
    }

    /// Override request spacing (self-hosted instances have no rate limit).
    /// Lookups are serialized while the interval is non-zero.
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, GeocodeError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(self.config.user_agent.clone())
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;
        Ok(self.client.get_or_init(|| client))
    }

    /// Waits out `min_interval` while holding the lock, so concurrent lookups
    /// queue up one behind another. Use `with_min_interval(Duration::ZERO)` for
    /// instances without a rate limit.
    fn throttle(&self) {
        let Ok(mut last) = self.last_request.lock() else {
            return;
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl core::fmt::Debug for NominatimGeocoder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NominatimGeocoder")
            .field("url", &self.config.url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self, address), err)]
    fn geocode(&self, address: &ShippingAddress) -> Result<Option<Coordinates>, GeocodeError> {
        let query = address.one_line();
        if query.is_empty() {
            return Ok(None);
        }

        let client = self.client()?;
        self.throttle();

        let response = client
            .get(&self.config.url)
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "geocoding service returned an error status");
            return Err(GeocodeError::Unavailable(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;
        let found = parse_response(&body)?;
        if found.is_none() {
            debug!(query = %query, "geocoding found no results");
        }
        Ok(found)
    }
}
