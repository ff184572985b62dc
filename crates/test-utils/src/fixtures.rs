//! Common biosample records and observation builders.

use chrono::NaiveDate;
use serde_json::{json, Value};

use enrich_common::Coordinates;
use reconciler::{
    Aggregate, MarineField, MarineQuality, Observation, Precision, QualityTier, SoilQuality,
    WeatherField, WeatherQuality,
};

/// Reference sampling points.
pub mod points {
    /// Lake Michigan shoreline, used by the shape A/B records.
    pub const GREAT_LAKES: (f64, f64) = (42.5, -85.4);

    /// Open Pacific, far from any weather station.
    pub const MID_PACIFIC: (f64, f64) = (0.0, -150.0);

    /// Iowa farmland, inside the US soil survey.
    pub const IOWA: (f64, f64) = (42.0, -93.5);

    /// Central Germany, outside the US soil survey.
    pub const GERMANY: (f64, f64) = (51.0, 10.0);
}

pub fn coords((lat, lon): (f64, f64)) -> Coordinates {
    Coordinates::new(lat, lon).expect("fixture coordinates are valid")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("fixture date is valid")
}

/// The shared collection date of the shape A/B records.
pub fn collection_date() -> NaiveDate {
    date(2018, 7, 12)
}

/// NMDC-style record: nested `lat_lon` and `collection_date.has_raw_value`.
pub fn shape_a_record(lat: f64, lon: f64, date: &str) -> Value {
    json!({
        "id": "nmdc:bsm-11-test",
        "lat_lon": {"latitude": lat, "longitude": lon},
        "collection_date": {"has_raw_value": date},
    })
}

/// GOLD-style record: flat `latitude`/`longitude` and `dateCollected`.
pub fn shape_b_record(lat: f64, lon: f64, date: &str) -> Value {
    json!({
        "biosampleGoldId": "Gb0000001",
        "latitude": lat,
        "longitude": lon,
        "dateCollected": date,
    })
}

pub fn record_without_coordinates() -> Value {
    json!({"collection_date": {"has_raw_value": "2018-07-12"}})
}

pub fn record_without_date() -> Value {
    json!({"lat_lon": {"latitude": 42.5, "longitude": -85.4}})
}

pub fn sst_observation(tier: MarineQuality, provider: &str) -> (MarineField, Observation<MarineQuality>) {
    (
        MarineField::SeaSurfaceTemperature,
        Observation::new(
            Aggregate::min_max_avg(18.2, 26.7, 22.1),
            "Celsius",
            Precision::new("optimal_interpolation", tier, provider),
        )
        .with_score(tier.base_score()),
    )
}

pub fn bathymetry_observation(tier: MarineQuality, provider: &str) -> (MarineField, Observation<MarineQuality>) {
    (
        MarineField::Bathymetry,
        Observation::new(-1250.5, "meters", Precision::new("bathymetric_grid", tier, provider))
            .with_score(tier.base_score()),
    )
}

pub fn temperature_observation(
    tier: WeatherQuality,
    provider: &str,
    avg: f64,
) -> (WeatherField, Observation<WeatherQuality>) {
    (
        WeatherField::Temperature,
        Observation::new(
            Aggregate::min_max_avg(avg - 5.0, avg + 5.0, avg),
            "Celsius",
            Precision::new("hourly_aggregation", tier, provider),
        ),
    )
}

pub fn soil_precision(tier: SoilQuality, provider: &str) -> Precision<SoilQuality> {
    Precision::new("soil_fixture", tier, provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconciler::{extract_collection_date, extract_lat_lon};

    #[test]
    fn test_shapes_extract_identically() {
        let (lat, lon) = points::GREAT_LAKES;
        let a = shape_a_record(lat, lon, "2018-07-12");
        let b = shape_b_record(lat, lon, "2018-07-12");
        assert_eq!(extract_lat_lon(&a), extract_lat_lon(&b));
        assert_eq!(extract_collection_date(&a), Some(collection_date()));
        assert_eq!(extract_collection_date(&b), Some(collection_date()));
    }

    #[test]
    fn test_missing_inputs() {
        assert_eq!(extract_lat_lon(&record_without_coordinates()), None);
        assert_eq!(extract_collection_date(&record_without_date()), None);
    }

    #[test]
    fn test_fixture_scores() {
        let (_, obs) = sst_observation(MarineQuality::SatelliteL4, "noaa_oisst");
        assert_eq!(obs.quality_score, Some(90));
    }
}
