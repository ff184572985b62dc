//! ISRIC SoilGrids v2: WRB classification and topsoil properties.
//!
//! SoilGrids publishes integer-scaled predictions on a 250 m grid; values are
//! divided by the property's conversion factor before use.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use reconciler::quality::{completeness_factor, quality_score};
use reconciler::{
    classify_texture, Coordinates, DepthInterval, DomainResult, Observation, Precision, Provider,
    ProviderId, Soil, SoilField, SoilQuality,
};

use crate::error::{settle, ProviderError, ProviderResult};
use crate::http::{HttpClient, RequestOptions};

pub const ID: &str = "soilgrids";
pub const DEFAULT_BASE_URL: &str = "https://rest.isric.org/soilgrids/v2.0";

const METHOD: &str = "gridded_prediction";
/// Layer queried when the sample depth is unknown.
const SURFACE: DepthInterval = DepthInterval::Cm0To5;
/// Distance from any point to the centre of its 250 m pixel, at most.
const PIXEL_CENTRE_DISTANCE_M: f64 = 125.0;
/// Seven properties plus the WRB class.
const SCORED_FIELDS: usize = 8;

/// SoilGrids property name, target field, divisor and unit.
pub const PROPERTIES: [(&str, SoilField, f64, &str); 7] = [
    ("phh2o", SoilField::PhH2o, 10.0, "pH"),
    ("soc", SoilField::OrganicCarbon, 10.0, "g/kg"),
    ("bdod", SoilField::BulkDensity, 100.0, "g/cm3"),
    ("sand", SoilField::Sand, 10.0, "%"),
    ("silt", SoilField::Silt, 10.0, "%"),
    ("clay", SoilField::Clay, 10.0, "%"),
    ("nitrogen", SoilField::TotalNitrogen, 100.0, "g/kg"),
];

#[derive(Debug, Deserialize)]
struct ClassificationResponse {
    wrb_class_name: Option<String>,
    #[serde(default)]
    wrb_class_probability: Vec<(String, f64)>,
}

#[derive(Debug, Deserialize)]
struct PropertiesResponse {
    properties: PropertyLayers,
}

#[derive(Debug, Deserialize)]
struct PropertyLayers {
    #[serde(default)]
    layers: Vec<PropertyLayer>,
}

#[derive(Debug, Deserialize)]
struct PropertyLayer {
    name: String,
    #[serde(default)]
    depths: Vec<PropertyDepth>,
}

#[derive(Debug, Deserialize)]
struct PropertyDepth {
    label: String,
    values: DepthValues,
}

#[derive(Debug, Deserialize)]
struct DepthValues {
    mean: Option<f64>,
}

/// Most probable WRB reference soil group.
#[derive(Debug, Clone, PartialEq)]
pub struct WrbClass {
    pub name: String,
    /// Probability in 0..1, when reported.
    pub probability: Option<f64>,
}

pub fn parse_classification(body: &[u8]) -> ProviderResult<Option<WrbClass>> {
    let response: ClassificationResponse = serde_json::from_slice(body)?;
    let Some(name) = response.wrb_class_name.filter(|n| !n.trim().is_empty()) else {
        return Ok(None);
    };
    let probability = response
        .wrb_class_probability
        .iter()
        .find(|(class, _)| *class == name)
        .map(|(_, p)| p / 100.0);
    Ok(Some(WrbClass { name, probability }))
}

/// SoilGrids layer for a sample depth. Unknown depths and whole-profile
/// samples fall back to the surface layer.
pub fn query_depth(depth: Option<DepthInterval>) -> DepthInterval {
    match depth {
        Some(DepthInterval::FullProfile) | None => SURFACE,
        Some(depth) => depth,
    }
}

/// Scaled mean at `depth` of each requested property that has a value.
pub fn parse_properties(body: &[u8], depth: DepthInterval) -> ProviderResult<Vec<(SoilField, f64, &'static str)>> {
    let response: PropertiesResponse = serde_json::from_slice(body)?;
    let mut values = Vec::new();
    for (name, field, divisor, unit) in PROPERTIES {
        let mean = response
            .properties
            .layers
            .iter()
            .find(|l| l.name == name)
            .and_then(|l| l.depths.iter().find(|d| d.label == depth.as_str()))
            .and_then(|d| d.values.mean);
        if let Some(raw) = mean {
            values.push((field, raw / divisor, unit));
        }
    }
    Ok(values)
}

fn property(values: &[(SoilField, f64, &str)], field: SoilField) -> Option<f64> {
    values.iter().find(|(f, _, _)| *f == field).map(|(_, v, _)| *v)
}

/// Assemble observations in the `depth` layer. Texture is derived from sand,
/// silt and clay when all three are present and consistent.
pub fn build_result(
    wrb: Option<&WrbClass>,
    properties: &[(SoilField, f64, &'static str)],
    depth: DepthInterval,
    location: Coordinates,
    date: NaiveDate,
) -> ProviderResult<DomainResult<Soil>> {
    if wrb.is_none() && properties.is_empty() {
        return Err(ProviderError::Empty("no classification or properties at point".into()));
    }

    let tier = SoilQuality::GriddedPrediction;
    let filled = properties.len() + usize::from(wrb.is_some());
    let score = quality_score(
        tier,
        Some(PIXEL_CENTRE_DISTANCE_M),
        completeness_factor(filled, SCORED_FIELDS),
    );
    let precision = Precision::new(METHOD, tier, ID)
        .with_distance(PIXEL_CENTRE_DISTANCE_M)
        .with_spatial_resolution("250 m");

    let mut result = DomainResult::empty(location, date);
    let depth = Some(depth);

    if let Some(class) = wrb {
        let mut class_precision = precision.clone();
        if let Some(p) = class.probability {
            class_precision = class_precision.with_confidence(p);
        }
        result.insert_at(
            depth,
            SoilField::ClassificationWrb,
            Observation::text(class.name.clone(), "WRB", class_precision).with_score(score),
        );
    }

    for (field, value, unit) in properties {
        result.insert_at(depth, *field, Observation::new(*value, *unit, precision.clone()).with_score(score));
    }

    if let (Some(sand), Some(silt), Some(clay)) = (
        property(properties, SoilField::Sand),
        property(properties, SoilField::Silt),
        property(properties, SoilField::Clay),
    ) {
        match classify_texture(sand, silt, clay) {
            Ok(texture) => {
                result.insert_at(
                    depth,
                    SoilField::TextureClass,
                    Observation::text(texture.as_str(), "USDA", precision).with_score(score),
                );
            }
            Err(e) => debug!(sand, silt, clay, error = %e, "Texture not derived"),
        }
    }

    Ok(result)
}

/// Global gridded soil predictions.
pub struct SoilGridsProvider {
    http: Arc<HttpClient>,
    base_url: String,
}

impl SoilGridsProvider {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn point_params(location: &Coordinates) -> Vec<(&'static str, String)> {
        vec![("lon", location.lon.to_string()), ("lat", location.lat.to_string())]
    }

    async fn classification(&self, location: &Coordinates) -> ProviderResult<Option<WrbClass>> {
        let url = format!("{}/classification/query", self.base_url);
        let mut params = Self::point_params(location);
        params.push(("number_classes", "1".to_string()));
        let response = self
            .http
            .get(&url, &params, RequestOptions::default())
            .await?
            .error_for_status(&url)?;
        parse_classification(&response.body)
    }

    async fn properties(
        &self,
        location: &Coordinates,
        depth: DepthInterval,
    ) -> ProviderResult<Vec<(SoilField, f64, &'static str)>> {
        let url = format!("{}/properties/query", self.base_url);
        let mut params = Self::point_params(location);
        params.extend(PROPERTIES.iter().map(|(name, ..)| ("property", name.to_string())));
        params.push(("depth", depth.as_str().to_string()));
        params.push(("value", "mean".to_string()));
        let response = self
            .http
            .get(&url, &params, RequestOptions::default())
            .await?
            .error_for_status(&url)?;
        parse_properties(&response.body, depth)
    }

    async fn try_fetch(
        &self,
        location: &Coordinates,
        date: NaiveDate,
        depth: DepthInterval,
    ) -> ProviderResult<DomainResult<Soil>> {
        // Either half may fail without discarding the other.
        let wrb = self.classification(location).await.unwrap_or_else(|e| {
            warn!(kind = e.kind(), error = %e, "SoilGrids classification failed");
            None
        });
        let properties = self.properties(location, depth).await.unwrap_or_else(|e| {
            warn!(kind = e.kind(), error = %e, "SoilGrids properties failed");
            Vec::new()
        });
        build_result(wrb.as_ref(), &properties, depth, *location, date)
    }
}

#[async_trait]
impl Provider<Soil> for SoilGridsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::from(ID)
    }

    /// Global coverage; soil is static.
    fn is_available(&self, _location: &Coordinates, _date: NaiveDate) -> bool {
        true
    }

    async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<Soil> {
        self.fetch_at_depth(location, date, None).await
    }

    #[instrument(skip(self), fields(provider = ID))]
    async fn fetch_at_depth(
        &self,
        location: &Coordinates,
        date: NaiveDate,
        depth: Option<DepthInterval>,
    ) -> DomainResult<Soil> {
        let depth = query_depth(depth);
        settle(self.id(), location, date, self.try_fetch(location, date, depth).await)
    }
}
