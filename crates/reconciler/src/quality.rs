//! Quality tiers and scoring.
//!
//! Every domain has a single ordered list of tiers, best first. "Better than"
//! is an index comparison into that list and is the only key used when
//! merging observations. Scores are a separate 0-100 integer derived from the
//! tier's base score, the distance to the measurement point and the fraction
//! of expected sub-fields present.

use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An ordered quality classification for one domain.
pub trait QualityTier:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// All tiers, best first. The last entry is the no-data tier.
    const ORDER: &'static [Self];

    /// Base score before distance and completeness factors are applied.
    fn base_score(&self) -> u8;

    /// Stable identifier used in serialized output.
    fn as_str(&self) -> &'static str;

    /// The tier meaning "nothing usable".
    fn no_data() -> Self {
        Self::ORDER[Self::ORDER.len() - 1]
    }

    /// Position in [`QualityTier::ORDER`]; lower is better.
    fn rank(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|t| t == self)
            .unwrap_or(Self::ORDER.len())
    }

    /// Strictly better than `other`.
    fn is_better_than(&self, other: &Self) -> bool {
        self.rank() < other.rank()
    }

    fn is_no_data(&self) -> bool {
        *self == Self::no_data()
    }

    /// Best tier of an iterator, or no-data when empty.
    fn best_of<I: IntoIterator<Item = Self>>(tiers: I) -> Self {
        tiers
            .into_iter()
            .min_by_key(|t| t.rank())
            .unwrap_or_else(Self::no_data)
    }
}

/// Temporal quality of atmospheric observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherQuality {
    /// At least 80% of the day's hours present.
    DaySpecificComplete,
    /// At least 50% of the day's hours present.
    DaySpecificPartial,
    WeeklyComposite,
    MonthlyClimatology,
    NoData,
}

impl QualityTier for WeatherQuality {
    const ORDER: &'static [Self] = &[
        WeatherQuality::DaySpecificComplete,
        WeatherQuality::DaySpecificPartial,
        WeatherQuality::WeeklyComposite,
        WeatherQuality::MonthlyClimatology,
        WeatherQuality::NoData,
    ];

    fn base_score(&self) -> u8 {
        match self {
            WeatherQuality::DaySpecificComplete => 100,
            WeatherQuality::DaySpecificPartial => 85,
            WeatherQuality::WeeklyComposite => 70,
            WeatherQuality::MonthlyClimatology => 50,
            WeatherQuality::NoData => 0,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            WeatherQuality::DaySpecificComplete => "day_specific_complete",
            WeatherQuality::DaySpecificPartial => "day_specific_partial",
            WeatherQuality::WeeklyComposite => "weekly_composite",
            WeatherQuality::MonthlyClimatology => "monthly_climatology",
            WeatherQuality::NoData => "no_data",
        }
    }
}

/// Acquisition quality of oceanographic observations.
///
/// Tier rank and base score are independent: static datasets score higher
/// than gap-filled satellite products but rank below them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarineQuality {
    /// Gap-filled satellite product.
    SatelliteL4,
    /// Daily satellite composite with gaps.
    SatelliteL3,
    StaticDataset,
    ModelReanalysis,
    Climatology,
    NoData,
}

impl QualityTier for MarineQuality {
    const ORDER: &'static [Self] = &[
        MarineQuality::SatelliteL4,
        MarineQuality::SatelliteL3,
        MarineQuality::StaticDataset,
        MarineQuality::ModelReanalysis,
        MarineQuality::Climatology,
        MarineQuality::NoData,
    ];

    fn base_score(&self) -> u8 {
        match self {
            MarineQuality::SatelliteL4 => 90,
            MarineQuality::SatelliteL3 => 85,
            MarineQuality::StaticDataset => 95,
            MarineQuality::ModelReanalysis => 75,
            MarineQuality::Climatology => 50,
            MarineQuality::NoData => 0,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            MarineQuality::SatelliteL4 => "satellite_l4",
            MarineQuality::SatelliteL3 => "satellite_l3",
            MarineQuality::StaticDataset => "static_dataset",
            MarineQuality::ModelReanalysis => "model_reanalysis",
            MarineQuality::Climatology => "climatology",
            MarineQuality::NoData => "no_data",
        }
    }
}

/// Provenance quality of soil observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilQuality {
    /// Mapped soil survey polygon containing the point.
    SurveyMapUnit,
    /// Machine-learning prediction on a global grid.
    GriddedPrediction,
    NoData,
}

impl QualityTier for SoilQuality {
    const ORDER: &'static [Self] = &[
        SoilQuality::SurveyMapUnit,
        SoilQuality::GriddedPrediction,
        SoilQuality::NoData,
    ];

    fn base_score(&self) -> u8 {
        match self {
            SoilQuality::SurveyMapUnit => 95,
            SoilQuality::GriddedPrediction => 80,
            SoilQuality::NoData => 0,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SoilQuality::SurveyMapUnit => "survey_map_unit",
            SoilQuality::GriddedPrediction => "gridded_prediction",
            SoilQuality::NoData => "no_data",
        }
    }
}

macro_rules! impl_tier_display {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

impl_tier_display!(WeatherQuality, MarineQuality, SoilQuality);

/// Hourly coverage at or above this fraction is a complete day.
pub const COMPLETE_COVERAGE_THRESHOLD: f64 = 0.8;
/// Hourly coverage at or above this fraction is a partial day.
pub const PARTIAL_COVERAGE_THRESHOLD: f64 = 0.5;

/// Classify atmospheric data by hours present out of hours expected.
///
/// Below the partial threshold the acquisition method decides: methods
/// mentioning "weekly" are composites, "monthly" or "climatology" are
/// climatologies, anything else is no data.
pub fn assess_temporal_coverage(hours_present: u32, hours_expected: u32, method: &str) -> WeatherQuality {
    let fraction = if hours_expected == 0 {
        0.0
    } else {
        hours_present as f64 / hours_expected as f64
    };

    if fraction >= COMPLETE_COVERAGE_THRESHOLD {
        return WeatherQuality::DaySpecificComplete;
    }
    if fraction >= PARTIAL_COVERAGE_THRESHOLD {
        return WeatherQuality::DaySpecificPartial;
    }

    let method = method.to_ascii_lowercase();
    if method.contains("weekly") {
        WeatherQuality::WeeklyComposite
    } else if method.contains("monthly") || method.contains("climatology") {
        WeatherQuality::MonthlyClimatology
    } else {
        WeatherQuality::NoData
    }
}

/// Classify oceanographic data by its acquisition method name.
pub fn assess_acquisition_method(method: &str) -> MarineQuality {
    let method = method.to_ascii_lowercase();
    if method.contains("optimal_interpolation") || method.contains("l4") || method.contains("gap_filled") {
        MarineQuality::SatelliteL4
    } else if method.contains("satellite") || method.contains("composite") || method.contains("l3") {
        MarineQuality::SatelliteL3
    } else if method.contains("bathymetr") || method.contains("static") {
        MarineQuality::StaticDataset
    } else if method.contains("reanalysis") || method.contains("model") {
        MarineQuality::ModelReanalysis
    } else if method.contains("climatolog") {
        MarineQuality::Climatology
    } else {
        MarineQuality::NoData
    }
}

/// Distance bucket multiplier for the offset between query point and measurement.
///
/// Unknown distance gets full credit.
pub fn distance_factor(distance_m: Option<f64>) -> f64 {
    let Some(d) = distance_m else {
        return 1.0;
    };
    let d = d.abs();
    if d <= 100.0 {
        1.0
    } else if d <= 1_000.0 {
        0.9
    } else if d <= 5_000.0 {
        0.7
    } else if d <= 25_000.0 {
        0.5
    } else {
        0.3
    }
}

/// Fraction of expected sub-fields present, clamped to [0, 1].
pub fn completeness_factor(present: usize, expected: usize) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    (present as f64 / expected as f64).clamp(0.0, 1.0)
}

/// Final score: `round(base × distance × completeness)` clamped to [0, 100].
///
/// The factors are multiplied in that order and rounded once.
pub fn quality_score<T: QualityTier>(tier: T, distance_m: Option<f64>, completeness: f64) -> u8 {
    let raw = tier.base_score() as f64 * distance_factor(distance_m) * completeness;
    raw.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_order_is_index_order() {
        assert!(WeatherQuality::DaySpecificComplete.is_better_than(&WeatherQuality::DaySpecificPartial));
        assert!(WeatherQuality::WeeklyComposite.is_better_than(&WeatherQuality::NoData));
        assert!(!WeatherQuality::NoData.is_better_than(&WeatherQuality::NoData));
        assert!(MarineQuality::SatelliteL4.is_better_than(&MarineQuality::StaticDataset));
        assert!(MarineQuality::StaticDataset.is_better_than(&MarineQuality::ModelReanalysis));
        assert!(SoilQuality::SurveyMapUnit.is_better_than(&SoilQuality::GriddedPrediction));
    }

    #[test]
    fn test_no_data_is_last() {
        assert_eq!(WeatherQuality::no_data(), WeatherQuality::NoData);
        assert_eq!(MarineQuality::no_data(), MarineQuality::NoData);
        assert_eq!(SoilQuality::no_data(), SoilQuality::NoData);
    }

    #[test]
    fn test_best_of() {
        let best = MarineQuality::best_of([MarineQuality::StaticDataset, MarineQuality::SatelliteL4]);
        assert_eq!(best, MarineQuality::SatelliteL4);
        assert_eq!(MarineQuality::best_of(std::iter::empty()), MarineQuality::NoData);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&MarineQuality::SatelliteL4).unwrap();
        assert_eq!(json, "\"satellite_l4\"");
        assert_eq!(WeatherQuality::DaySpecificPartial.to_string(), "day_specific_partial");
    }

    #[test]
    fn test_temporal_coverage_thresholds() {
        assert_eq!(assess_temporal_coverage(24, 24, "hourly"), WeatherQuality::DaySpecificComplete);
        assert_eq!(assess_temporal_coverage(20, 24, "hourly"), WeatherQuality::DaySpecificComplete);
        assert_eq!(assess_temporal_coverage(19, 24, "hourly"), WeatherQuality::DaySpecificPartial);
        assert_eq!(assess_temporal_coverage(12, 24, "hourly"), WeatherQuality::DaySpecificPartial);
        assert_eq!(assess_temporal_coverage(11, 24, "hourly"), WeatherQuality::NoData);
        assert_eq!(assess_temporal_coverage(0, 24, "weekly_mean"), WeatherQuality::WeeklyComposite);
        assert_eq!(assess_temporal_coverage(0, 24, "Monthly normals"), WeatherQuality::MonthlyClimatology);
        assert_eq!(assess_temporal_coverage(0, 0, "climatology"), WeatherQuality::MonthlyClimatology);
    }

    #[test]
    fn test_acquisition_method() {
        assert_eq!(assess_acquisition_method("optimal_interpolation"), MarineQuality::SatelliteL4);
        assert_eq!(assess_acquisition_method("ocean_colour_composite"), MarineQuality::SatelliteL3);
        assert_eq!(assess_acquisition_method("bathymetric_grid"), MarineQuality::StaticDataset);
        assert_eq!(assess_acquisition_method("model_reanalysis"), MarineQuality::ModelReanalysis);
        assert_eq!(assess_acquisition_method("climatology"), MarineQuality::Climatology);
        assert_eq!(assess_acquisition_method("guess"), MarineQuality::NoData);
    }

    #[test]
    fn test_distance_buckets() {
        assert_eq!(distance_factor(None), 1.0);
        assert_eq!(distance_factor(Some(0.0)), 1.0);
        assert_eq!(distance_factor(Some(100.0)), 1.0);
        assert_eq!(distance_factor(Some(100.1)), 0.9);
        assert_eq!(distance_factor(Some(1_000.0)), 0.9);
        assert_eq!(distance_factor(Some(4_999.0)), 0.7);
        assert_eq!(distance_factor(Some(25_000.0)), 0.5);
        assert_eq!(distance_factor(Some(25_001.0)), 0.3);
    }

    #[test]
    fn test_score_composition() {
        // 100 * 0.9 * 5/7 = 64.28...
        let score = quality_score(WeatherQuality::DaySpecificComplete, Some(500.0), completeness_factor(5, 7));
        assert_eq!(score, 64);
        assert_eq!(quality_score(WeatherQuality::DaySpecificPartial, None, 1.0), 85);
        assert_eq!(quality_score(WeatherQuality::NoData, Some(0.0), 1.0), 0);
        assert_eq!(quality_score(MarineQuality::StaticDataset, None, 1.0), 95);
    }

    #[test]
    fn test_score_monotonic_in_distance() {
        let distances = [50.0, 500.0, 2_500.0, 10_000.0, 100_000.0];
        for tier in WeatherQuality::ORDER {
            for completeness in [1.0, 6.0 / 7.0, 0.5] {
                let scores: Vec<u8> = distances
                    .iter()
                    .map(|d| quality_score(*tier, Some(*d), completeness))
                    .collect();
                assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{tier}: {scores:?}");
            }
        }
    }

    #[test]
    fn test_completeness_factor_bounds() {
        assert_eq!(completeness_factor(0, 0), 0.0);
        assert_eq!(completeness_factor(9, 7), 1.0);
        assert_eq!(completeness_factor(7, 7), 1.0);
    }
}
