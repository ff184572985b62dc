//! Observation values, units and precision metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a data provider (e.g. "noaa_oisst").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Fixed-key summary of several readings of the same quantity.
///
/// `vector_mean` is the circular mean for directional quantities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_mean: Option<f64>,
}

impl Aggregate {
    /// Aggregate with min, max and avg set.
    pub fn min_max_avg(min: f64, max: f64, avg: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            avg: Some(avg),
            ..Default::default()
        }
    }

    /// Summarize a series of readings. Returns `None` for an empty series.
    pub fn from_series(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        Some(Self::min_max_avg(min, max, avg))
    }

    pub fn with_sum(mut self, sum: f64) -> Self {
        self.sum = Some(sum);
        self
    }

    pub fn with_vector_mean(mut self, vector_mean: f64) -> Self {
        self.vector_mean = Some(vector_mean);
        self
    }

    /// True when no key is set.
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.avg.is_none()
            && self.sum.is_none()
            && self.vector_mean.is_none()
    }

    /// The single value a flat target field should carry.
    ///
    /// Prefers `avg`, then `vector_mean`, then `sum`, then the midpoint of
    /// `min`/`max`, then whichever bound is present.
    pub fn representative(&self) -> Option<f64> {
        self.avg
            .or(self.vector_mean)
            .or(self.sum)
            .or(match (self.min, self.max) {
                (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
                (lo, hi) => lo.or(hi),
            })
    }
}

/// Circular mean of angles in degrees, normalized to [0, 360).
pub fn circular_mean_deg(angles: &[f64]) -> Option<f64> {
    if angles.is_empty() {
        return None;
    }
    let (sin_sum, cos_sum) = angles.iter().fold((0.0, 0.0), |(s, c), a| {
        let r = a.to_radians();
        (s + r.sin(), c + r.cos())
    });
    let n = angles.len() as f64;
    let mean = (sin_sum / n).atan2(cos_sum / n).to_degrees();
    let normalized = mean.rem_euclid(360.0);
    Some(if normalized >= 360.0 { 0.0 } else { normalized })
}

/// The value carried by an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationValue {
    Scalar(f64),
    Aggregate(Aggregate),
    Text(String),
}

impl ObservationValue {
    /// Numeric value suitable for a single quantity field.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ObservationValue::Scalar(v) => Some(*v),
            ObservationValue::Aggregate(a) => a.representative(),
            ObservationValue::Text(_) => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&Aggregate> {
        match self {
            ObservationValue::Aggregate(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ObservationValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ObservationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationValue::Text(s) => f.write_str(s),
            other => match other.as_number() {
                Some(v) => write!(f, "{}", v),
                None => Ok(()),
            },
        }
    }
}

impl From<f64> for ObservationValue {
    fn from(v: f64) -> Self {
        ObservationValue::Scalar(v)
    }
}

impl From<Aggregate> for ObservationValue {
    fn from(a: Aggregate) -> Self {
        ObservationValue::Aggregate(a)
    }
}

/// How an observation was acquired and how trustworthy it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precision<T> {
    /// Acquisition method, e.g. "hourly_aggregation", "bathymetric_grid".
    pub method: String,
    pub tier: T,
    /// Free-text coverage description, e.g. "20/24 hours".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_info: Option<String>,
    pub provider: ProviderId,
    /// Distance from the query point to the measurement location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    /// Provider-declared confidence in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_resolution: Option<String>,
}

impl<T> Precision<T> {
    pub fn new(method: impl Into<String>, tier: T, provider: impl Into<ProviderId>) -> Self {
        Self {
            method: method.into(),
            tier,
            coverage_info: None,
            provider: provider.into(),
            distance_m: None,
            confidence: None,
            spatial_resolution: None,
        }
    }

    pub fn with_coverage_info(mut self, info: impl Into<String>) -> Self {
        self.coverage_info = Some(info.into());
        self
    }

    pub fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = Some(distance_m);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_spatial_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.spatial_resolution = Some(resolution.into());
        self
    }
}

/// A single named environmental quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation<T> {
    pub value: ObservationValue,
    /// Never empty.
    pub unit: String,
    pub precision: Precision<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u8>,
}

impl<T: Copy> Observation<T> {
    pub fn new(value: impl Into<ObservationValue>, unit: impl Into<String>, precision: Precision<T>) -> Self {
        let unit = unit.into();
        debug_assert!(!unit.is_empty(), "observation unit must not be empty");
        Self {
            value: value.into(),
            unit,
            precision,
            quality_score: None,
        }
    }

    /// Categorical observation; `system` names the vocabulary (e.g. "USDA").
    pub fn text(value: impl Into<String>, system: impl Into<String>, precision: Precision<T>) -> Self {
        Self::new(ObservationValue::Text(value.into()), system, precision)
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.quality_score = Some(score.min(100));
        self
    }

    pub fn tier(&self) -> T {
        self.precision.tier
    }

    pub fn provider(&self) -> &ProviderId {
        &self.precision.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::WeatherQuality;

    #[test]
    fn test_aggregate_from_series() {
        let agg = Aggregate::from_series(&[18.0, 22.0, 26.0]).unwrap();
        assert_eq!(agg.min, Some(18.0));
        assert_eq!(agg.max, Some(26.0));
        assert_eq!(agg.avg, Some(22.0));
        assert!(Aggregate::from_series(&[]).is_none());
    }

    #[test]
    fn test_representative_value() {
        assert_eq!(Aggregate::min_max_avg(1.0, 3.0, 2.5).representative(), Some(2.5));
        assert_eq!(Aggregate::default().with_sum(4.2).representative(), Some(4.2));
        assert_eq!(Aggregate::default().with_vector_mean(270.0).representative(), Some(270.0));
        let bounds = Aggregate {
            min: Some(10.0),
            max: Some(20.0),
            ..Default::default()
        };
        assert_eq!(bounds.representative(), Some(15.0));
        assert_eq!(Aggregate::default().representative(), None);
        assert!(Aggregate::default().is_empty());
    }

    #[test]
    fn test_circular_mean_wraps_north() {
        let mean = circular_mean_deg(&[350.0, 10.0]).unwrap();
        assert!(mean < 1e-9 || (360.0 - mean) < 1e-9, "got {mean}");

        let east = circular_mean_deg(&[80.0, 100.0]).unwrap();
        assert!((east - 90.0).abs() < 1e-9);
        assert!(circular_mean_deg(&[]).is_none());
    }

    #[test]
    fn test_value_serialization_is_untagged() {
        let scalar = serde_json::to_value(ObservationValue::Scalar(-1250.5)).unwrap();
        assert_eq!(scalar, serde_json::json!(-1250.5));

        let agg = serde_json::to_value(ObservationValue::from(Aggregate::min_max_avg(18.2, 26.7, 22.1))).unwrap();
        assert_eq!(agg, serde_json::json!({"min": 18.2, "max": 26.7, "avg": 22.1}));

        let text = serde_json::to_value(ObservationValue::Text("Loam".into())).unwrap();
        assert_eq!(text, serde_json::json!("Loam"));
    }

    #[test]
    fn test_observation_builder() {
        let precision = Precision::new("hourly_aggregation", WeatherQuality::DaySpecificComplete, "open_meteo")
            .with_coverage_info("24/24 hours")
            .with_confidence(1.7);
        let obs = Observation::new(21.5, "Celsius", precision).with_score(250);

        assert_eq!(obs.quality_score, Some(100));
        assert_eq!(obs.precision.confidence, Some(1.0));
        assert_eq!(obs.tier(), WeatherQuality::DaySpecificComplete);
        assert_eq!(obs.provider().as_str(), "open_meteo");
        assert_eq!(obs.value.to_string(), "21.5");
    }
}
