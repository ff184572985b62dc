//! Per-domain enrichment results.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use enrich_common::Coordinates;

use crate::domain::{DepthInterval, Domain};
use crate::observation::{Observation, ProviderId};
use crate::quality::QualityTier;

/// Observations sharing one depth interval. Weather and marine results use a
/// single layer without depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Layer<D: Domain> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<DepthInterval>,
    pub observations: BTreeMap<D::Field, Observation<D::Tier>>,
}

impl<D: Domain> Layer<D> {
    fn new(depth: Option<DepthInterval>) -> Self {
        Self {
            depth,
            observations: BTreeMap::new(),
        }
    }
}

/// Result for one (location, date, domain).
///
/// `overall_quality` is the best tier among filled observations and is
/// no-data exactly when no observation is present. Mutators keep that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct DomainResult<D: Domain> {
    pub location: Coordinates,
    pub collection_date: NaiveDate,
    /// Sorted shallow to deep; a depthless layer sorts first.
    pub layers: Vec<Layer<D>>,
    pub successful_providers: BTreeSet<ProviderId>,
    pub failed_providers: BTreeSet<ProviderId>,
    pub overall_quality: D::Tier,
}

impl<D: Domain> DomainResult<D> {
    /// A result with every slot empty.
    pub fn empty(location: Coordinates, collection_date: NaiveDate) -> Self {
        Self {
            location,
            collection_date,
            layers: Vec::new(),
            successful_providers: BTreeSet::new(),
            failed_providers: BTreeSet::new(),
            overall_quality: D::Tier::no_data(),
        }
    }

    /// An empty result recording `provider` as failed.
    pub fn failed(location: Coordinates, collection_date: NaiveDate, provider: impl Into<ProviderId>) -> Self {
        let mut result = Self::empty(location, collection_date);
        result.failed_providers.insert(provider.into());
        result
    }

    /// Insert an observation into the depthless layer.
    pub fn insert(&mut self, field: D::Field, observation: Observation<D::Tier>) -> bool {
        self.insert_at(None, field, observation)
    }

    /// Insert an observation at a depth, replacing any existing one.
    ///
    /// Observations tiered as no-data are dropped so that an empty slot and
    /// a no-data slot cannot be told apart. Returns whether it was stored.
    pub fn insert_at(
        &mut self,
        depth: Option<DepthInterval>,
        field: D::Field,
        observation: Observation<D::Tier>,
    ) -> bool {
        if observation.tier().is_no_data() {
            return false;
        }
        self.layer_mut(depth).observations.insert(field, observation);
        self.refresh_quality();
        true
    }

    /// Layer for `depth`, created in sorted position if missing.
    fn layer_mut(&mut self, depth: Option<DepthInterval>) -> &mut Layer<D> {
        let idx = match self.layers.binary_search_by(|l| l.depth.cmp(&depth)) {
            Ok(idx) => idx,
            Err(idx) => {
                self.layers.insert(idx, Layer::new(depth));
                idx
            }
        };
        &mut self.layers[idx]
    }

    pub fn layer(&self, depth: Option<DepthInterval>) -> Option<&Layer<D>> {
        self.layers.iter().find(|l| l.depth == depth)
    }

    /// Observation for `field` at an exact depth.
    pub fn observation_at(&self, depth: Option<DepthInterval>, field: D::Field) -> Option<&Observation<D::Tier>> {
        self.layer(depth).and_then(|l| l.observations.get(&field))
    }

    /// Shallowest observation of `field` in any layer.
    pub fn observation(&self, field: D::Field) -> Option<&Observation<D::Tier>> {
        self.layers.iter().find_map(|l| l.observations.get(&field))
    }

    /// Every observation with its depth, shallow to deep, fields in canonical order.
    pub fn observations(&self) -> impl Iterator<Item = (Option<DepthInterval>, D::Field, &Observation<D::Tier>)> {
        self.layers
            .iter()
            .flat_map(|l| l.observations.iter().map(move |(f, o)| (l.depth, *f, o)))
    }

    /// Distinct fields filled in any layer.
    pub fn filled_fields(&self) -> BTreeSet<D::Field> {
        self.observations().map(|(_, f, _)| f).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|l| l.observations.is_empty())
    }

    /// Best tier among filled observations.
    pub fn best_tier(&self) -> D::Tier {
        D::Tier::best_of(self.observations().map(|(_, _, o)| o.tier()))
    }

    /// Recompute `overall_quality` from the observations.
    pub fn refresh_quality(&mut self) {
        self.overall_quality = self.best_tier();
    }

    /// Drop empty layers and recompute `overall_quality`.
    pub fn normalize(&mut self) {
        self.layers.retain(|l| !l.observations.is_empty());
        self.layers.sort_by(|a, b| a.depth.cmp(&b.depth));
        self.refresh_quality();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Marine, MarineField, Soil, SoilField};
    use crate::observation::Precision;
    use crate::quality::{MarineQuality, SoilQuality};

    fn point() -> Coordinates {
        Coordinates::new(42.5, -85.4).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 7, 12).unwrap()
    }

    fn marine_obs(value: f64, tier: MarineQuality) -> Observation<MarineQuality> {
        Observation::new(value, "meters", Precision::new("bathymetric_grid", tier, "gebco"))
    }

    #[test]
    fn test_empty_result_is_no_data() {
        let result = DomainResult::<Marine>::empty(point(), date());
        assert!(result.is_empty());
        assert_eq!(result.overall_quality, MarineQuality::NoData);
        assert!(result.filled_fields().is_empty());
    }

    #[test]
    fn test_failed_result_records_provider() {
        let result = DomainResult::<Marine>::failed(point(), date(), "noaa_oisst");
        assert!(result.is_empty());
        assert!(result.failed_providers.contains(&ProviderId::from("noaa_oisst")));
    }

    #[test]
    fn test_insert_updates_quality() {
        let mut result = DomainResult::<Marine>::empty(point(), date());
        assert!(result.insert(MarineField::Bathymetry, marine_obs(-1250.5, MarineQuality::StaticDataset)));
        assert_eq!(result.overall_quality, MarineQuality::StaticDataset);

        assert!(result.insert(MarineField::SeaSurfaceTemperature, marine_obs(22.1, MarineQuality::SatelliteL4)));
        assert_eq!(result.overall_quality, MarineQuality::SatelliteL4);
        assert_eq!(result.filled_fields().len(), 2);
    }

    #[test]
    fn test_no_data_observation_is_dropped() {
        let mut result = DomainResult::<Marine>::empty(point(), date());
        assert!(!result.insert(MarineField::Salinity, marine_obs(35.0, MarineQuality::NoData)));
        assert!(result.is_empty());
        assert_eq!(result.overall_quality, MarineQuality::NoData);
    }

    #[test]
    fn test_layers_sorted_and_shallowest_wins() {
        let mut result = DomainResult::<Soil>::empty(point(), date());
        let survey = Precision::new("soil_survey", SoilQuality::SurveyMapUnit, "usda_nrcs");
        let grid = Precision::new("gridded_prediction", SoilQuality::GriddedPrediction, "soilgrids");

        result.insert_at(
            Some(DepthInterval::FullProfile),
            SoilField::ClassificationUsda,
            Observation::text("Mollisols", "USDA", survey),
        );
        result.insert_at(Some(DepthInterval::Cm5To15), SoilField::PhH2o, Observation::new(6.8, "pH", grid.clone()));
        result.insert_at(Some(DepthInterval::Cm0To5), SoilField::PhH2o, Observation::new(6.5, "pH", grid));

        let depths: Vec<_> = result.layers.iter().map(|l| l.depth).collect();
        assert_eq!(
            depths,
            vec![
                Some(DepthInterval::Cm0To5),
                Some(DepthInterval::Cm5To15),
                Some(DepthInterval::FullProfile)
            ]
        );
        assert_eq!(result.observation(SoilField::PhH2o).unwrap().value.as_number(), Some(6.5));
        assert!(result.observation(SoilField::ClassificationUsda).is_some());
        assert_eq!(result.overall_quality, SoilQuality::SurveyMapUnit);
        assert_eq!(result.filled_fields().len(), 2);
    }

    #[test]
    fn test_serialization_shape() {
        let mut result = DomainResult::<Marine>::empty(point(), date());
        result.insert(MarineField::Bathymetry, marine_obs(-1250.5, MarineQuality::StaticDataset));
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["collection_date"], "2018-07-12");
        assert_eq!(json["overall_quality"], "static_dataset");
        assert_eq!(json["layers"][0]["observations"]["bathymetry"]["value"], -1250.5);
        assert!(json["layers"][0].get("depth").is_none());

        let back: DomainResult<Marine> = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
