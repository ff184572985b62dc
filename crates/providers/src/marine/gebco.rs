//! GEBCO bathymetry through the Open Topo Data API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use reconciler::quality::assess_acquisition_method;
use reconciler::{
    Coordinates, DomainResult, Marine, MarineField, Observation, Precision, Provider, ProviderId,
    QualityTier,
};

use crate::error::{settle, ProviderError, ProviderResult};
use crate::http::{HttpClient, RequestOptions};

pub const ID: &str = "gebco";
pub const DEFAULT_BASE_URL: &str = "https://api.opentopodata.org/v1/gebco2020";

const METHOD: &str = "bathymetric_grid";

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<ElevationResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ElevationResult {
    elevation: Option<f64>,
}

/// Seafloor elevation at the point. Land points (elevation >= 0) carry no
/// bathymetry and are reported as empty.
pub fn parse_elevation(body: &[u8], location: Coordinates, date: NaiveDate) -> ProviderResult<DomainResult<Marine>> {
    let response: ElevationResponse = serde_json::from_slice(body)?;
    if response.status != "OK" {
        return Err(ProviderError::Parse(format!(
            "status {}: {}",
            response.status,
            response.error.unwrap_or_default()
        )));
    }

    let elevation = response
        .results
        .first()
        .and_then(|r| r.elevation)
        .ok_or_else(|| ProviderError::Empty("no elevation at point".into()))?;
    if elevation >= 0.0 {
        return Err(ProviderError::Empty(format!("land point ({} m)", elevation)));
    }

    let tier = assess_acquisition_method(METHOD);
    let precision = Precision::new(METHOD, tier, ID).with_spatial_resolution("15 arc-seconds");

    let mut result = DomainResult::empty(location, date);
    result.insert(
        MarineField::Bathymetry,
        Observation::new(elevation, "meters", precision).with_score(tier.base_score()),
    );
    Ok(result)
}

/// Static global bathymetry grid.
pub struct GebcoProvider {
    http: Arc<HttpClient>,
    base_url: String,
}

impl GebcoProvider {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn try_fetch(&self, location: &Coordinates, date: NaiveDate) -> ProviderResult<DomainResult<Marine>> {
        let params = [("locations", format!("{},{}", location.lat, location.lon))];
        let response = self
            .http
            .get(&self.base_url, &params, RequestOptions::default())
            .await?
            .error_for_status(&self.base_url)?;
        parse_elevation(&response.body, *location, date)
    }
}

#[async_trait]
impl Provider<Marine> for GebcoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::from(ID)
    }

    /// Static dataset: any validated point on any date.
    fn is_available(&self, _location: &Coordinates, _date: NaiveDate) -> bool {
        true
    }

    #[instrument(skip(self), fields(provider = ID))]
    async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<Marine> {
        settle(self.id(), location, date, self.try_fetch(location, date).await)
    }
}
