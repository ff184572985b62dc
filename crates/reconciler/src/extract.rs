//! Coordinate and collection-date extraction from biosample records.
//!
//! Records arrive in several field-naming conventions. Extraction walks an
//! ordered list of candidate key paths and the first candidate that yields a
//! usable value wins. Conversion failures are swallowed and the next
//! candidate is tried.

use chrono::NaiveDate;
use serde_json::Value;

use enrich_common::{parse_collection_date, Coordinates, EnrichError, EnrichResult};

use crate::domain::DepthInterval;

/// A way of locating latitude and longitude inside a record.
#[derive(Debug, Clone, Copy)]
pub enum LocationCandidate {
    /// Separate key paths for latitude and longitude.
    Pair {
        lat: &'static [&'static str],
        lon: &'static [&'static str],
    },
    /// One string holding "lat lon", e.g. `lat_lon.has_raw_value`.
    Raw(&'static [&'static str]),
}

/// Location candidates in priority order.
pub const LOCATION_CANDIDATES: &[LocationCandidate] = &[
    LocationCandidate::Pair {
        lat: &["lat_lon", "latitude"],
        lon: &["lat_lon", "longitude"],
    },
    LocationCandidate::Pair {
        lat: &["latitude"],
        lon: &["longitude"],
    },
    LocationCandidate::Pair {
        lat: &["lat"],
        lon: &["lon"],
    },
    LocationCandidate::Pair {
        lat: &["lat_lon", "lat"],
        lon: &["lat_lon", "lon"],
    },
    LocationCandidate::Pair {
        lat: &["decimal_latitude"],
        lon: &["decimal_longitude"],
    },
    LocationCandidate::Raw(&["lat_lon", "has_raw_value"]),
];

/// Collection-date key paths in priority order.
pub const DATE_CANDIDATES: &[&[&str]] = &[
    &["collection_date", "has_raw_value"],
    &["collection_date"],
    &["dateCollected"],
];

/// Sampling-depth key paths in priority order. Numeric depths are meters.
pub const DEPTH_CANDIDATES: &[&[&str]] = &[
    &["depth", "has_numeric_value"],
    &["depth"],
    &["depth_m"],
    &["collection_depth"],
];

/// Follow a key path through nested objects.
fn lookup<'a>(record: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(record, |value, key| value.get(key))
}

/// Numbers and numeric strings become `f64`; anything else is rejected.
fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn parse_raw_pair(s: &str) -> Option<(f64, f64)> {
    let mut parts = s.split(|c: char| c.is_whitespace() || c == ',').filter(|p| !p.is_empty());
    let lat = parts.next()?.parse().ok()?;
    let lon = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((lat, lon))
}

/// Raw latitude/longitude from the first matching candidate, unvalidated.
pub fn extract_lat_lon(record: &Value) -> Option<(f64, f64)> {
    LOCATION_CANDIDATES.iter().find_map(|candidate| match candidate {
        LocationCandidate::Pair { lat, lon } => {
            let lat = lookup(record, lat).and_then(as_f64)?;
            let lon = lookup(record, lon).and_then(as_f64)?;
            Some((lat, lon))
        }
        LocationCandidate::Raw(path) => lookup(record, path)
            .and_then(Value::as_str)
            .and_then(parse_raw_pair),
    })
}

/// Validated coordinates, distinguishing "absent" from "out of range".
pub fn extract_coordinates(record: &Value) -> EnrichResult<Coordinates> {
    let (lat, lon) = extract_lat_lon(record).ok_or(EnrichError::MissingCoordinates)?;
    Coordinates::new(lat, lon)
}

/// Collection date from the first candidate that parses.
pub fn extract_collection_date(record: &Value) -> Option<NaiveDate> {
    DATE_CANDIDATES
        .iter()
        .filter_map(|path| lookup(record, path).and_then(Value::as_str))
        .find_map(parse_collection_date)
}

/// Sampling depth interval, if the record states one.
pub fn extract_depth(record: &Value) -> Option<DepthInterval> {
    DEPTH_CANDIDATES.iter().find_map(|path| {
        let value = lookup(record, path)?;
        if let Some(meters) = value.as_f64() {
            return Some(DepthInterval::from_depth_m(meters));
        }
        let text = value.as_str()?;
        text.parse::<DepthInterval>()
            .ok()
            .or_else(|| as_f64(value).map(DepthInterval::from_depth_m))
    })
}
