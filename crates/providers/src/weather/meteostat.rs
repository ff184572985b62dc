//! Meteostat bulk daily station summaries.
//!
//! The station list and each station's daily history are published as
//! gzip-compressed files. The list is downloaded once per provider and kept
//! in memory; the nearest station with daily inventory covering the date is
//! used if it lies within [`MAX_STATION_DISTANCE_M`].

use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use flate2::read::GzDecoder;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use enrich_common::{AvailabilityWindow, WindowEnd};
use reconciler::quality::{completeness_factor, quality_score};
use reconciler::{
    Aggregate, Coordinates, DomainResult, Observation, ObservationValue, Precision, Provider,
    ProviderId, Weather, WeatherField, WeatherQuality,
};

use crate::error::{settle, ProviderError, ProviderResult};
use crate::http::{HttpClient, RequestOptions};

pub const ID: &str = "meteostat";
pub const DEFAULT_BASE_URL: &str = "https://bulk.meteostat.net/v2";

pub const MAX_STATION_DISTANCE_M: f64 = 100_000.0;

/// Columns counted for completeness: tavg, tmin, tmax, prcp, wspd, wdir, pres.
const SCORED_COLUMNS: usize = 7;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Deserialize)]
pub struct Station {
    pub id: String,
    pub location: StationLocation,
    #[serde(default)]
    pub inventory: Inventory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub daily: DailyInventory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyInventory {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Station {
    fn covers(&self, date: NaiveDate) -> bool {
        match (self.inventory.daily.start, self.inventory.daily.end) {
            (Some(start), Some(end)) => start <= date && date <= end,
            (Some(start), None) => start <= date,
            (None, _) => false,
        }
    }

    fn distance_m(&self, location: &Coordinates) -> Option<f64> {
        let lat = self.location.latitude?;
        let lon = self.location.longitude?;
        let station = Coordinates::new(lat, lon).ok()?;
        Some(location.distance_to(&station))
    }
}

/// One row of a station's daily CSV.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DailyRow {
    pub date: Option<NaiveDate>,
    pub tavg: Option<f64>,
    pub tmin: Option<f64>,
    pub tmax: Option<f64>,
    pub prcp: Option<f64>,
    pub wdir: Option<f64>,
    /// km/h
    pub wspd: Option<f64>,
    /// hPa
    pub pres: Option<f64>,
}

impl DailyRow {
    fn available(&self) -> usize {
        [self.tavg, self.tmin, self.tmax, self.prcp, self.wspd, self.wdir, self.pres]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }
}

/// Decompress a gzip body; bodies already decoded in transit pass through.
pub fn gunzip(body: &[u8]) -> ProviderResult<Vec<u8>> {
    if !body.starts_with(&GZIP_MAGIC) {
        return Ok(body.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(body).read_to_end(&mut out)?;
    Ok(out)
}

pub fn parse_stations(body: &[u8]) -> ProviderResult<Vec<Station>> {
    Ok(serde_json::from_slice(body)?)
}

/// Nearest station within `max_distance_m` whose daily inventory covers `date`.
pub fn nearest_station<'a>(
    stations: &'a [Station],
    location: &Coordinates,
    date: NaiveDate,
    max_distance_m: f64,
) -> Option<(&'a Station, f64)> {
    stations
        .iter()
        .filter(|s| s.covers(date))
        .filter_map(|s| s.distance_m(location).map(|d| (s, d)))
        .filter(|(_, d)| *d <= max_distance_m)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn column(cols: &[&str], idx: usize) -> Option<f64> {
    cols.get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Find the row for `date` in a headerless daily CSV
/// (`date,tavg,tmin,tmax,prcp,snow,wdir,wspd,wpgt,pres,tsun`).
pub fn find_daily_row(csv: &str, date: NaiveDate) -> Option<DailyRow> {
    let key = date.format("%Y-%m-%d").to_string();
    csv.lines()
        .map(|line| line.split(',').collect::<Vec<_>>())
        .find(|cols| cols.first().map(|d| d.trim()) == Some(key.as_str()))
        .map(|cols| DailyRow {
            date: Some(date),
            tavg: column(&cols, 1),
            tmin: column(&cols, 2),
            tmax: column(&cols, 3),
            prcp: column(&cols, 4),
            wdir: column(&cols, 6),
            wspd: column(&cols, 7),
            pres: column(&cols, 9),
        })
}

/// Turn a station's daily summary into weather observations.
pub fn build_result(
    row: &DailyRow,
    station_id: &str,
    distance_m: f64,
    location: Coordinates,
    date: NaiveDate,
) -> ProviderResult<DomainResult<Weather>> {
    let available = row.available();
    if available == 0 {
        return Err(ProviderError::Empty(format!("station {} has an empty row", station_id)));
    }

    let tier = if row.tavg.is_some() && row.tmin.is_some() && row.tmax.is_some() {
        WeatherQuality::DaySpecificComplete
    } else {
        WeatherQuality::DaySpecificPartial
    };
    let score = quality_score(tier, Some(distance_m), completeness_factor(available, SCORED_COLUMNS));
    let precision = Precision::new("station_daily_summary", tier, ID)
        .with_coverage_info(format!("station {} at {:.1} km", station_id, distance_m / 1000.0))
        .with_distance(distance_m);

    let mut fields: Vec<(WeatherField, ObservationValue, &str)> = Vec::new();

    let temperature = Aggregate {
        min: row.tmin,
        max: row.tmax,
        avg: row.tavg,
        ..Default::default()
    };
    if !temperature.is_empty() {
        fields.push((WeatherField::Temperature, temperature.into(), "Celsius"));
    }
    if let Some(prcp) = row.prcp {
        fields.push((WeatherField::Precipitation, Aggregate::default().with_sum(prcp).into(), "mm"));
    }
    // km/h to m/s
    if let Some(wspd) = row.wspd {
        let agg = Aggregate {
            avg: Some(wspd / 3.6),
            ..Default::default()
        };
        fields.push((WeatherField::WindSpeed, agg.into(), "m/s"));
    }
    if let Some(wdir) = row.wdir {
        fields.push((WeatherField::WindDirection, Aggregate::default().with_vector_mean(wdir).into(), "degrees"));
    }
    // hPa to kPa
    if let Some(pres) = row.pres {
        fields.push((WeatherField::Pressure, (pres / 10.0).into(), "kPa"));
    }

    let mut result = DomainResult::empty(location, date);
    for (field, value, unit) in fields {
        result.insert(field, Observation::new(value, unit, precision.clone()).with_score(score));
    }
    Ok(result)
}

/// Daily summaries from the nearest Meteostat station.
pub struct MeteostatProvider {
    http: Arc<HttpClient>,
    base_url: String,
    window: AvailabilityWindow,
    stations: OnceCell<Vec<Station>>,
}

impl MeteostatProvider {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        let start = NaiveDate::from_ymd_opt(1973, 1, 1).unwrap_or(NaiveDate::MIN);
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            window: AvailabilityWindow::since(start).until(WindowEnd::DaysAgo(7)),
            stations: OnceCell::new(),
        }
    }

    async fn stations(&self) -> ProviderResult<&[Station]> {
        let stations = self
            .stations
            .get_or_try_init(|| async {
                let url = format!("{}/stations/lite.json.gz", self.base_url);
                // Held in memory for the provider's lifetime.
                let response = self
                    .http
                    .get(&url, &[], RequestOptions::bypass())
                    .await?
                    .error_for_status(&url)?;
                let stations = parse_stations(&gunzip(&response.body)?)?;
                info!(count = stations.len(), "Loaded Meteostat station list");
                Ok::<_, ProviderError>(stations)
            })
            .await?;
        Ok(stations.as_slice())
    }

    async fn try_fetch(&self, location: &Coordinates, date: NaiveDate) -> ProviderResult<DomainResult<Weather>> {
        let stations = self.stations().await?;
        let (station, distance_m) = nearest_station(stations, location, date, MAX_STATION_DISTANCE_M)
            .ok_or_else(|| ProviderError::Empty("no station within 100 km".into()))?;
        debug!(station = %station.id, distance_m, "Nearest station");

        let url = format!("{}/daily/{}.csv.gz", self.base_url, station.id);
        let response = self
            .http
            .get(&url, &[], RequestOptions::default())
            .await?
            .error_for_status(&url)?;
        let csv = String::from_utf8(gunzip(&response.body)?)
            .map_err(|e| ProviderError::Parse(format!("daily CSV is not UTF-8: {}", e)))?;

        let row = find_daily_row(&csv, date)
            .ok_or_else(|| ProviderError::Empty(format!("station {} has no row for {}", station.id, date)))?;
        build_result(&row, &station.id, distance_m, *location, date)
    }
}

#[async_trait]
impl Provider<Weather> for MeteostatProvider {
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

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use test_utils::{assert_approx_eq, collection_date, coords, date, load_fixture, points};

    fn stations() -> Vec<Station> {
        parse_stations(load_fixture("meteostat_stations.json").as_bytes()).unwrap()
    }

    #[test]
    fn test_gunzip_round_trip_and_passthrough() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"2018-07-12,23.6").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(gunzip(&compressed).unwrap(), b"2018-07-12,23.6");
        assert_eq!(gunzip(b"plain").unwrap(), b"plain");
        assert_eq!(gunzip(&[0x1f, 0x8b, 0x00]).unwrap_err().kind(), "decompress");
    }

    #[test]
    fn test_nearest_station_respects_inventory() {
        let stations = stations();
        let here = coords(points::GREAT_LAKES);

        // Battle Creek is closer but its daily record starts in 2020; the
        // station without inventory is never chosen.
        let (station, distance) = nearest_station(&stations, &here, collection_date(), MAX_STATION_DISTANCE_M).unwrap();
        assert_eq!(station.id, "72539");
        assert!(distance > 25_000.0 && distance < 40_000.0, "got {distance}");

        let (later, _) = nearest_station(&stations, &here, date(2021, 6, 1), MAX_STATION_DISTANCE_M).unwrap();
        assert_eq!(later.id, "KBTL0");
    }

    #[test]
    fn test_no_station_in_range() {
        let stations = stations();
        assert!(nearest_station(&stations, &coords(points::MID_PACIFIC), collection_date(), MAX_STATION_DISTANCE_M).is_none());
    }

    #[test]
    fn test_find_daily_row() {
        let csv = load_fixture("meteostat_daily.csv");
        let row = find_daily_row(&csv, collection_date()).unwrap();

        assert_eq!(row.tavg, Some(23.6));
        assert_eq!(row.wdir, Some(270.0));
        assert_eq!(row.wspd, Some(18.0));
        assert_eq!(row.pres, Some(1012.5));
        assert!(find_daily_row(&csv, date(2018, 7, 20)).is_none());
    }

    #[test]
    fn test_build_complete_day() {
        let csv = load_fixture("meteostat_daily.csv");
        let row = find_daily_row(&csv, collection_date()).unwrap();
        let result = build_result(&row, "72539", 32_000.0, coords(points::GREAT_LAKES), collection_date()).unwrap();

        assert_eq!(result.overall_quality, WeatherQuality::DaySpecificComplete);
        assert_eq!(result.filled_fields().len(), 5);

        let wind = result.observation(WeatherField::WindSpeed).unwrap();
        assert_approx_eq!(wind.value.as_number().unwrap(), 5.0, 1e-9);
        // Over 25 km from the station: distance factor 0.3.
        assert_eq!(wind.quality_score, Some(30));

        let pressure = result.observation(WeatherField::Pressure).unwrap();
        assert_approx_eq!(pressure.value.as_number().unwrap(), 101.25, 1e-9);
        assert_eq!(
            result.observation(WeatherField::WindDirection).unwrap().value.as_number(),
            Some(270.0)
        );
    }

    #[test]
    fn test_build_partial_day() {
        let csv = load_fixture("meteostat_daily.csv");
        let row = find_daily_row(&csv, date(2018, 7, 13)).unwrap();
        let result = build_result(&row, "72539", 500.0, coords(points::GREAT_LAKES), date(2018, 7, 13)).unwrap();

        assert_eq!(result.overall_quality, WeatherQuality::DaySpecificPartial);
        let temp = result.observation(WeatherField::Temperature).unwrap();
        assert_eq!(temp.value.as_aggregate().unwrap().min, Some(18.3));
        // 85 * 0.9 * 2/7
        assert_eq!(temp.quality_score, Some(22));
    }

    #[test]
    fn test_empty_row_is_rejected() {
        let row = DailyRow::default();
        let err = build_result(&row, "x", 0.0, coords(points::GREAT_LAKES), collection_date()).unwrap_err();
        assert!(matches!(err, ProviderError::Empty(_)));
    }
}
