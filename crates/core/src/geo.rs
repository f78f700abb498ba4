//! Geodesic distance between customer destinations and fulfillment origins.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 point in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Validated constructor.
    pub fn new(lat: f64, lon: f64) -> DomainResult<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(DomainError::validation("coordinates must be finite"));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(DomainError::validation(format!("latitude out of range: {lat}")));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(DomainError::validation(format!("longitude out of range: {lon}")));
        }
        Ok(Self { lat, lon })
    }

    /// Great-circle distance to `other` in kilometers.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        let (lat1, lon1) = (self.lat.to_radians(), self.lon.to_radians());
        let (lat2, lon2) = (other.lat.to_radians(), other.lon.to_radians());

        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        // Clamp guards asin against rounding slightly above 1.0 for antipodal points.
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_KM * c
    }
}

/// Distance between two optional points.
///
/// A missing point yields `f64::INFINITY`, so a seller or order without
/// coordinates never outranks a located candidate and never wins a
/// strictly-less-than comparison against one.
pub fn distance_km(a: Option<&Coordinates>, b: Option<&Coordinates>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => a.distance_to(b),
        _ => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pt(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn missing_point_is_infinitely_far() {
        let karachi = pt(24.8607, 67.0011);
        assert_eq!(distance_km(Some(&karachi), None), f64::INFINITY);
        assert_eq!(distance_km(None, Some(&karachi)), f64::INFINITY);
        assert_eq!(distance_km(None, None), f64::INFINITY);
    }

    #[test]
    fn known_city_pair_is_close_to_reference() {
        // Karachi -> Lahore is roughly 1030 km great-circle.
        let karachi = pt(24.8607, 67.0011);
        let lahore = pt(31.5204, 74.3587);
        let d = distance_km(Some(&karachi), Some(&lahore));
        assert!((d - 1030.0).abs() < 15.0, "got {d}");
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = pt(0.0, 0.0).distance_to(&pt(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    fn coords() -> impl Strategy<Value = Coordinates> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| Coordinates { lat, lon })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: distance is symmetric.
        #[test]
        fn distance_is_symmetric(a in coords(), b in coords()) {
            let ab = distance_km(Some(&a), Some(&b));
            let ba = distance_km(Some(&b), Some(&a));
            prop_assert!((ab - ba).abs() < 1e-9);
        }

        /// Property: a point is at distance zero from itself.
        #[test]
        fn distance_to_self_is_zero(a in coords()) {
            prop_assert_eq!(distance_km(Some(&a), Some(&a)), 0.0);
        }

        /// Property: never exceeds half the Earth's circumference.
        #[test]
        fn distance_is_bounded(a in coords(), b in coords()) {
            let d = a.distance_to(&b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= core::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }
    }
}
