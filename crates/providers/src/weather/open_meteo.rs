//! Open-Meteo ERA5 archive: hourly reanalysis aggregated to one day.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, instrument};

use enrich_common::AvailabilityWindow;
use reconciler::observation::circular_mean_deg;
use reconciler::quality::{assess_temporal_coverage, completeness_factor, quality_score};
use reconciler::{
    Aggregate, Coordinates, Domain, DomainResult, Observation, ObservationValue, Precision, Provider,
    ProviderId, Weather, WeatherField, WeatherQuality,
};

use crate::error::{settle, ProviderError, ProviderResult};
use crate::http::{HttpClient, RequestOptions};

pub const ID: &str = "open_meteo";
pub const DEFAULT_BASE_URL: &str = "https://archive-api.open-meteo.com/v1/era5";

const HOURLY_VARIABLES: &str = "temperature_2m,precipitation,wind_speed_10m,wind_direction_10m,\
relative_humidity_2m,surface_pressure,shortwave_radiation";
const HOURS_PER_DAY: u32 = 24;
const METHOD: &str = "hourly_aggregation";

#[derive(Debug, Default, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    hourly: HourlySeries,
}

#[derive(Debug, Default, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    surface_pressure: Vec<Option<f64>>,
    #[serde(default)]
    shortwave_radiation: Vec<Option<f64>>,
}

fn present(series: &[Option<f64>]) -> Vec<f64> {
    series.iter().flatten().copied().filter(|v| v.is_finite()).collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Aggregate one day of hourly ERA5 values into weather observations.
pub fn parse_archive(
    body: &[u8],
    location: Coordinates,
    date: NaiveDate,
) -> ProviderResult<DomainResult<Weather>> {
    let response: ArchiveResponse = serde_json::from_slice(body)?;
    let hourly = response.hourly;
    if hourly.time.is_empty() {
        return Err(ProviderError::Empty("no hourly timestamps".into()));
    }

    let temperature = present(&hourly.temperature_2m);
    let hours_present = temperature.len() as u32;
    let tier = assess_temporal_coverage(hours_present, HOURS_PER_DAY, METHOD);
    if tier == WeatherQuality::NoData {
        return Err(ProviderError::Empty(format!(
            "only {}/{} hours of temperature",
            hours_present, HOURS_PER_DAY
        )));
    }

    let precision = Precision::new(METHOD, tier, ID)
        .with_coverage_info(format!("{}/{} hours", hours_present, HOURS_PER_DAY))
        .with_distance(0.0)
        .with_spatial_resolution("0.25 degree");

    let mut fields: Vec<(WeatherField, ObservationValue, &str)> = Vec::new();

    if let Some(agg) = Aggregate::from_series(&temperature) {
        fields.push((WeatherField::Temperature, agg.into(), "Celsius"));
    }
    let precipitation = present(&hourly.precipitation);
    if !precipitation.is_empty() {
        let sum = precipitation.iter().sum();
        fields.push((WeatherField::Precipitation, Aggregate::default().with_sum(sum).into(), "mm"));
    }
    if let Some(agg) = Aggregate::from_series(&present(&hourly.wind_speed_10m)) {
        fields.push((WeatherField::WindSpeed, agg.into(), "m/s"));
    }
    if let Some(direction) = circular_mean_deg(&present(&hourly.wind_direction_10m)) {
        let agg = Aggregate::default().with_vector_mean(direction);
        fields.push((WeatherField::WindDirection, agg.into(), "degrees"));
    }
    if let Some(humidity) = mean(&present(&hourly.relative_humidity_2m)) {
        fields.push((WeatherField::Humidity, humidity.into(), "percent"));
    }
    // hPa to kPa
    if let Some(pressure) = mean(&present(&hourly.surface_pressure)) {
        fields.push((WeatherField::Pressure, (pressure / 10.0).into(), "kPa"));
    }
    if let Some(radiation) = mean(&present(&hourly.shortwave_radiation)) {
        fields.push((WeatherField::SolarRadiation, radiation.into(), "W/m2"));
    }

    let completeness = completeness_factor(fields.len(), Weather::total_fields());
    let score = quality_score(tier, Some(0.0), completeness);

    let mut result = DomainResult::empty(location, date);
    for (field, value, unit) in fields {
        result.insert(field, Observation::new(value, unit, precision.clone()).with_score(score));
    }
    Ok(result)
}

/// ERA5 reanalysis through the Open-Meteo archive API.
pub struct OpenMeteoProvider {
    http: Arc<HttpClient>,
    base_url: String,
    window: AvailabilityWindow,
}

impl OpenMeteoProvider {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        let start = NaiveDate::from_ymd_opt(1959, 1, 1).unwrap_or(NaiveDate::MIN);
        Self {
            http,
            base_url: base_url.into(),
            window: AvailabilityWindow::since(start),
        }
    }

    fn query(location: &Coordinates, date: NaiveDate) -> Vec<(&'static str, String)> {
        let day = date.format("%Y-%m-%d").to_string();
        vec![
            ("latitude", location.lat.to_string()),
            ("longitude", location.lon.to_string()),
            ("start_date", day.clone()),
            ("end_date", day),
            ("hourly", HOURLY_VARIABLES.to_string()),
            ("timezone", "UTC".to_string()),
            ("wind_speed_unit", "ms".to_string()),
        ]
    }

    async fn try_fetch(&self, location: &Coordinates, date: NaiveDate) -> ProviderResult<DomainResult<Weather>> {
        let response = self
            .http
            .get(&self.base_url, &Self::query(location, date), RequestOptions::default())
            .await?
            .error_for_status(&self.base_url)?;
        let result = parse_archive(&response.body, *location, date)?;
        debug!(fields = result.filled_fields().len(), cached = response.cached, "Parsed ERA5 day");
        Ok(result)
    }
}

#[async_trait]
impl Provider<Weather> for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::from(ID)
    }

    fn is_available(&self, _location: &Coordinates, date: NaiveDate) -> bool {
        self.window.contains(date)
    }

    #[instrument(skip(self), fields(provider = ID))]
    async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<Weather> {
        settle(self.id(), location, date, self.try_fetch(location, date).await)
    }
}
