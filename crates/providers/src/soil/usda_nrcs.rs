//! USDA NRCS Soil Data Access: survey map unit taxonomy.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, instrument};

use enrich_common::{BoundingBox, US_SOIL_SURVEY_REGIONS};
use reconciler::quality::quality_score;
use reconciler::{
    Coordinates, DepthInterval, DomainResult, Observation, Precision, Provider, ProviderId, Soil,
    SoilField, SoilQuality,
};

use crate::error::{settle, ProviderError, ProviderResult};
use crate::http::{HttpClient, RequestOptions};

pub const ID: &str = "usda_nrcs";
pub const DEFAULT_BASE_URL: &str = "https://sdmdataaccess.sc.egov.usda.gov/Tabular/post.rest";

const METHOD: &str = "soil_survey";

/// `{"Table": [[...], ...]}`; the key is absent when the query matched nothing.
#[derive(Debug, Default, Deserialize)]
struct TableResponse {
    #[serde(rename = "Table", default)]
    table: Vec<Vec<Option<String>>>,
}

/// Dominant series component of a map unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub percent: Option<f64>,
    pub order: Option<String>,
    pub suborder: Option<String>,
    pub great_group: Option<String>,
    pub subgroup: Option<String>,
}

impl Component {
    /// Taxonomy path `order > suborder > great group > subgroup`, or the
    /// component name when no taxonomy is recorded.
    pub fn classification(&self) -> String {
        let parts: Vec<&str> = [&self.order, &self.suborder, &self.great_group, &self.subgroup]
            .iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.name.clone()
        } else {
            parts.join(" > ")
        }
    }
}

pub fn mukey_query(location: &Coordinates) -> String {
    format!(
        "SELECT TOP 1 mukey FROM SDA_Get_Mukey_from_intersection_with_WktWgs84('point({} {})')",
        location.lon, location.lat
    )
}

pub fn components_query(mukey: &str) -> String {
    format!(
        "SELECT compname, comppct_r, majcompflag, taxorder, taxsubgrp, taxgrtgrp, taxsuborder \
FROM component WHERE mukey = '{}' AND compkind = 'Series' ORDER BY comppct_r DESC",
        mukey
    )
}

fn parse_table(body: &[u8]) -> ProviderResult<Vec<Vec<Option<String>>>> {
    // SDA answers an empty match with an empty body.
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let response: TableResponse = serde_json::from_slice(body)?;
    Ok(response.table)
}

/// Map unit key from the point-intersection query. Only numeric keys are
/// accepted since the key is interpolated into the next query.
pub fn parse_mukey(body: &[u8]) -> ProviderResult<String> {
    let table = parse_table(body)?;
    let mukey = table
        .first()
        .and_then(|row| row.first().cloned().flatten())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ProviderError::Empty("point is outside any survey map unit".into()))?;
    if !mukey.chars().all(|c| c.is_ascii_digit()) {
        return Err(ProviderError::Parse(format!("unexpected map unit key: {}", mukey)));
    }
    Ok(mukey)
}

/// The dominant component: first row of the `comppct_r DESC` query.
pub fn parse_dominant_component(body: &[u8]) -> ProviderResult<Component> {
    let table = parse_table(body)?;
    let row = table
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Empty("map unit has no series components".into()))?;
    let cell = |idx: usize| row.get(idx).cloned().flatten().filter(|s| !s.trim().is_empty());

    let name = cell(0).ok_or_else(|| ProviderError::Parse("component without a name".into()))?;
    Ok(Component {
        name,
        percent: cell(1).and_then(|p| p.trim().parse().ok()),
        order: cell(3),
        suborder: cell(6),
        great_group: cell(5),
        subgroup: cell(4),
    })
}

pub fn build_result(
    mukey: &str,
    component: &Component,
    location: Coordinates,
    date: NaiveDate,
) -> DomainResult<Soil> {
    let tier = SoilQuality::SurveyMapUnit;
    let mut precision = Precision::new(METHOD, tier, ID)
        .with_distance(0.0)
        .with_coverage_info(format!("map unit {}, component {}", mukey, component.name));
    if let Some(pct) = component.percent {
        precision = precision.with_confidence(pct / 100.0);
    }

    let mut result = DomainResult::empty(location, date);
    result.insert_at(
        Some(DepthInterval::FullProfile),
        SoilField::ClassificationUsda,
        Observation::text(component.classification(), "USDA", precision)
            .with_score(quality_score(tier, Some(0.0), 1.0)),
    );
    result
}

/// Soil survey lookups inside the United States.
pub struct UsdaNrcsProvider {
    http: Arc<HttpClient>,
    base_url: String,
    regions: Vec<BoundingBox>,
}

impl UsdaNrcsProvider {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            regions: US_SOIL_SURVEY_REGIONS.to_vec(),
        }
    }

    async fn run_query(&self, sql: String) -> ProviderResult<bytes::Bytes> {
        let form = [("FORMAT", "JSON".to_string()), ("QUERY", sql)];
        let response = self
            .http
            .post_form(&self.base_url, &form, RequestOptions::default())
            .await?
            .error_for_status(&self.base_url)?;
        Ok(response.body)
    }

    async fn try_fetch(&self, location: &Coordinates, date: NaiveDate) -> ProviderResult<DomainResult<Soil>> {
        let mukey = parse_mukey(&self.run_query(mukey_query(location)).await?)?;
        let component = parse_dominant_component(&self.run_query(components_query(&mukey)).await?)?;
        debug!(mukey = %mukey, component = %component.name, "Dominant component");
        Ok(build_result(&mukey, &component, *location, date))
    }
}

#[async_trait]
impl Provider<Soil> for UsdaNrcsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::from(ID)
    }

    /// Survey coverage only; soil is static so the date is not checked.
    fn is_available(&self, location: &Coordinates, _date: NaiveDate) -> bool {
        BoundingBox::any_contains(&self.regions, location)
    }

    #[instrument(skip(self), fields(provider = ID))]
    async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<Soil> {
        settle(self.id(), location, date, self.try_fetch(location, date).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{collection_date, coords, load_fixture, points};

    #[test]
    fn test_queries() {
        let sql = mukey_query(&coords(points::IOWA));
        assert!(sql.ends_with("('point(-93.5 42)')"));
        assert!(components_query("411324").contains("mukey = '411324'"));
    }

    #[test]
    fn test_parse_mukey() {
        assert_eq!(parse_mukey(load_fixture("sda_mukey.json").as_bytes()).unwrap(), "411324");
        assert_eq!(parse_mukey(b"").unwrap_err().kind(), "empty");
        assert_eq!(parse_mukey(b"{}").unwrap_err().kind(), "empty");
        assert_eq!(parse_mukey(br#"{"Table": [["1' OR '1'='1"]]}"#).unwrap_err().kind(), "parse");
    }

    #[test]
    fn test_dominant_component_taxonomy() {
        let component = parse_dominant_component(load_fixture("sda_components.json").as_bytes()).unwrap();

        assert_eq!(component.name, "Clarion");
        assert_eq!(component.percent, Some(55.0));
        assert_eq!(component.classification(), "Mollisols > Udolls > Hapludolls > Typic Hapludolls");
    }

    #[test]
    fn test_classification_falls_back_to_name() {
        let body = br#"{"Table": [["Udorthents", "80", "Yes", null, null, null, null]]}"#;
        let component = parse_dominant_component(body).unwrap();
        assert_eq!(component.classification(), "Udorthents");
    }

    #[test]
    fn test_result_in_full_profile_layer() {
        let component = parse_dominant_component(load_fixture("sda_components.json").as_bytes()).unwrap();
        let result = build_result("411324", &component, coords(points::IOWA), collection_date());

        let obs = result
            .observation_at(Some(DepthInterval::FullProfile), SoilField::ClassificationUsda)
            .unwrap();
        assert_eq!(obs.unit, "USDA");
        assert_eq!(obs.quality_score, Some(95));
        assert_eq!(obs.precision.confidence, Some(0.55));
        assert_eq!(result.overall_quality, SoilQuality::SurveyMapUnit);
    }

    #[test]
    fn test_available_only_in_survey_regions() {
        let provider = UsdaNrcsProvider::new(Arc::new(HttpClient::new(&Default::default()).unwrap()));
        assert!(provider.is_available(&coords(points::IOWA), collection_date()));
        assert!(!provider.is_available(&coords(points::GERMANY), collection_date()));
    }
}
