//! Daily ocean-colour chlorophyll-a through ERDDAP.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::instrument;

use enrich_common::AvailabilityWindow;
use reconciler::quality::assess_acquisition_method;
use reconciler::{
    Coordinates, DomainResult, Marine, MarineField, Observation, Precision, Provider, ProviderId,
    QualityTier,
};

use super::erddap::{check_range, coord_dim, griddap_url, parse_point_csv, point_dim};
use crate::error::{settle, ProviderResult};
use crate::http::{HttpClient, RequestOptions};

pub const ID: &str = "esa_cci";
pub const DEFAULT_BASE_URL: &str = "https://coastwatch.pfeg.noaa.gov/erddap/griddap";
pub const DATASET: &str = "nesdisVHNSQchlaDaily";

const METHOD: &str = "ocean_colour_composite";
const CHLOROPHYLL_RANGE: (f64, f64) = (0.001, 100.0);

pub fn query_url(base_url: &str, location: &Coordinates, date: NaiveDate) -> String {
    let day = date.format("%Y-%m-%d").to_string();
    griddap_url(
        base_url,
        DATASET,
        "chlor_a",
        &[point_dim(&day), coord_dim(location.lat), coord_dim(location.lon)],
    )
}

pub fn parse_chlorophyll(text: &str, location: Coordinates, date: NaiveDate) -> ProviderResult<DomainResult<Marine>> {
    let point = parse_point_csv(text)?;
    let chl = check_range("chlorophyll_a", point.value, CHLOROPHYLL_RANGE.0, CHLOROPHYLL_RANGE.1)?;

    let tier = assess_acquisition_method(METHOD);
    let precision = Precision::new(METHOD, tier, ID)
        .with_coverage_info("daily")
        .with_spatial_resolution("4 km");

    let mut result = DomainResult::empty(location, date);
    result.insert(
        MarineField::ChlorophyllA,
        Observation::new(chl, "mg/m3", precision).with_score(tier.base_score()),
    );
    Ok(result)
}

/// Satellite ocean-colour composite.
pub struct EsaCciProvider {
    http: Arc<HttpClient>,
    base_url: String,
    window: AvailabilityWindow,
}

impl EsaCciProvider {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        let start = NaiveDate::from_ymd_opt(1997, 9, 4).unwrap_or(NaiveDate::MIN);
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
        parse_chlorophyll(&response.text()?, *location, date)
    }
}

#[async_trait]
impl Provider<Marine> for EsaCciProvider {
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

#[cfg(test)]
mod tests {
    use super::*;
    use reconciler::MarineQuality;
    use test_utils::{collection_date, coords, load_fixture, points};

    #[test]
    fn test_query_keeps_signed_longitude() {
        let url = query_url(DEFAULT_BASE_URL, &coords(points::GREAT_LAKES), collection_date());
        assert!(url.contains("nesdisVHNSQchlaDaily.csv?chlor_a[(2018-07-12):1:(2018-07-12)]"));
        assert!(url.ends_with("[(-85.4000):1:(-85.4000)]"));
    }

    #[test]
    fn test_parse_chlorophyll() {
        let result =
            parse_chlorophyll(&load_fixture("esa_cci_chla.csv"), coords(points::GREAT_LAKES), collection_date()).unwrap();
        let chl = result.observation(MarineField::ChlorophyllA).unwrap();

        assert_eq!(chl.value.as_number(), Some(0.8421));
        assert_eq!(chl.tier(), MarineQuality::SatelliteL3);
        assert_eq!(chl.quality_score, Some(85));
    }

    #[test]
    fn test_below_detection_rejected() {
        let csv = "time,altitude,latitude,longitude,chlor_a\nUTC,m,degrees_north,degrees_east,mg m^-3\n\
2018-07-12T12:00:00Z,0.0,42.4975,-85.4025,0.0001\n";
        let err = parse_chlorophyll(csv, coords(points::GREAT_LAKES), collection_date()).unwrap_err();
        assert_eq!(err.kind(), "out_of_range");
    }
}
