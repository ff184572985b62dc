//! Common types and utilities shared across the enrichment crates.

pub mod bbox;
pub mod error;
pub mod geo;
pub mod time;

pub use bbox::{BoundingBox, US_SOIL_SURVEY_REGIONS};
pub use error::{EnrichError, EnrichResult};
pub use geo::{haversine_distance_m, Coordinates, EARTH_RADIUS_M};
pub use time::{parse_collection_date, AvailabilityWindow, WindowEnd, DATE_FORMATS};
