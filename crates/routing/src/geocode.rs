use thiserror::Error;

use forgeroute_core::Coordinates;
use forgeroute_orders::ShippingAddress;

#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Service unreachable, timed out or answered with an error status.
    #[error("geocoding unavailable: {0}")]
    Unavailable(String),

    #[error("invalid geocoding response: {0}")]
    InvalidResponse(String),
}

/// Address to coordinates lookup.
///
/// `Ok(None)` means the service answered but found nothing. Callers treat
/// both that and an error as "destination unknown".
pub trait Geocoder: Send + Sync {
    fn geocode(&self, address: &ShippingAddress) -> Result<Option<Coordinates>, GeocodeError>;
}

/// Geocoder that never resolves anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGeocoder;

impl Geocoder for NoopGeocoder {
    fn geocode(&self, _address: &ShippingAddress) -> Result<Option<Coordinates>, GeocodeError> {
        Ok(None)
    }
}

impl<G> Geocoder for std::sync::Arc<G>
where
    G: Geocoder + ?Sized,
{
    fn geocode(&self, address: &ShippingAddress) -> Result<Option<Coordinates>, GeocodeError> {
        (**self).geocode(address)
    }
}
