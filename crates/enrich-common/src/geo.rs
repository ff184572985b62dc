//! Geographic coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

use crate::error::{EnrichError, EnrichResult};

/// Mean Earth radius used for haversine distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A validated WGS84 point in decimal degrees.
///
/// Latitude is within [-90, 90] and longitude within [-180, 180]; the only
/// way to build one is through [`Coordinates::new`], which deserialization
/// also goes through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = EnrichError;

    fn try_from(raw: RawCoordinates) -> EnrichResult<Self> {
        Coordinates::new(raw.lat, raw.lon)
    }
}

impl Coordinates {
    /// Validate and create a coordinate pair.
    pub fn new(lat: f64, lon: f64) -> EnrichResult<Self> {
        if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lon)
        {
            return Err(EnrichError::InvalidCoordinates { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    /// Great-circle distance to another point, in meters.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        haversine_distance_m(self.lat, self.lon, other.lat, other.lon)
    }

    /// Longitude in the 0..360 convention used by some global grids.
    pub fn lon_360(&self) -> f64 {
        if self.lon < 0.0 {
            self.lon + 360.0
        } else {
            self.lon
        }
    }
}

/// Haversine distance between two points on a sphere of radius [`EARTH_RADIUS_M`].
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}
