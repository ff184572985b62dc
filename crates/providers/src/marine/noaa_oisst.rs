//! NOAA OISST v2.1 daily sea-surface temperature through ERDDAP.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, instrument};

use enrich_common::AvailabilityWindow;
use reconciler::quality::assess_acquisition_method;
use reconciler::{
    Coordinates, DomainResult, Marine, MarineField, Observation, Precision, Provider, ProviderId,
    QualityTier,
};

use super::erddap::{check_range, coord_dim, griddap_url, parse_point_csv, point_dim};
use crate::error::{settle, ProviderResult};
use crate::http::{HttpClient, RequestOptions};

pub const ID: &str = "noaa_oisst";
pub const DEFAULT_BASE_URL: &str = "https://coastwatch.pfeg.noaa.gov/erddap/griddap";
pub const DATASET: &str = "ncdc_oisst_v2_avhrr_by_time_zlev_lat_lon";

const METHOD: &str = "optimal_interpolation";
const SST_RANGE_C: (f64, f64) = (-5.0, 50.0);

/// Point query for one day at the surface level. The grid uses 0..360 longitudes.
pub fn query_url(base_url: &str, location: &Coordinates, date: NaiveDate) -> String {
    let time = format!("{}T12:00:00Z", date.format("%Y-%m-%d"));
    griddap_url(
        base_url,
        DATASET,
        "sst",
        &[
            point_dim(&time),
            point_dim("0.0"),
            coord_dim(location.lat),
            coord_dim(location.lon_360()),
        ],
    )
}

pub fn parse_sst(text: &str, location: Coordinates, date: NaiveDate) -> ProviderResult<DomainResult<Marine>> {
    let point = parse_point_csv(text)?;
    let sst = check_range("sea_surface_temperature", point.value, SST_RANGE_C.0, SST_RANGE_C.1)?;

    let tier = assess_acquisition_method(METHOD);
    let precision = Precision::new(METHOD, tier, ID)
        .with_coverage_info("daily")
        .with_spatial_resolution("0.25 degree");

    let mut result = DomainResult::empty(location, date);
    result.insert(
        MarineField::SeaSurfaceTemperature,
        Observation::new(sst, "Celsius", precision).with_score(tier.base_score()),
    );
    Ok(result)
}

/// Gap-filled daily SST analysis.
pub struct NoaaOisstProvider {
    http: Arc<HttpClient>,
    base_url: String,
    window: AvailabilityWindow,
}

impl NoaaOisstProvider {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        let start = NaiveDate::from_ymd_opt(1981, 9, 1).unwrap_or(NaiveDate::MIN);
        Self {
            http,
            base_url: base_url.into(),
            window: AvailabilityWindow::since(start),
        }
    }

    async fn try_fetch(&self, location: &Coordinates, date: NaiveDate) -> ProviderResult<DomainResult<Marine>> {
        let url = query_url(&self.base_url, location, date);
        let response = self
            .http
            .get(&url, &[], RequestOptions::default())
            .await?
            .error_for_status(&url)?;
        let result = parse_sst(&response.text()?, *location, date)?;
        debug!(cached = response.cached, "Parsed OISST point");
        Ok(result)
    }
}

#[async_trait]
impl Provider<Marine> for NoaaOisstProvider {
    fn id(&self) -> ProviderId {
        ProviderId::from(ID)
    }

    fn is_available(&self, _location: &Coordinates, date: NaiveDate) -> bool {
        self.window.contains(date)
    }

    #[instrument(skip(self), fields(provider = ID))]
    async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<Marine> {
        settle(self.id(), location, date, self.try_fetch(location, date).await)
    }
}
