//! Coverage metrics derived from a merged result.

use serde::{Deserialize, Serialize};

use crate::domain::{Domain, DomainField};
use crate::observation::ProviderId;
use crate::quality::QualityTier;
use crate::result::DomainResult;

/// How much of a domain's field set a result filled, and how well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub enriched_count: usize,
    pub total_possible_fields: usize,
    /// `enriched_count / total_possible_fields * 100`.
    pub enrichment_percentage: f64,
    pub enriched_fields: Vec<String>,
    /// Mean of present quality scores; `None` when no observation has one.
    pub average_quality_score: Option<f64>,
    pub tier: String,
    pub successful_providers: Vec<ProviderId>,
    pub provider_count: usize,
}

impl CoverageMetrics {
    pub fn from_result<D: Domain>(result: &DomainResult<D>) -> Self {
        let filled = result.filled_fields();
        let enriched_fields: Vec<String> = D::FIELDS
            .iter()
            .filter(|f| filled.contains(f))
            .map(|f| f.as_str().to_string())
            .collect();

        let enriched_count = enriched_fields.len();
        let total_possible_fields = D::total_fields();

        let scores: Vec<f64> = result
            .observations()
            .filter_map(|(_, _, o)| o.quality_score)
            .map(f64::from)
            .collect();

        let successful_providers: Vec<ProviderId> = result.successful_providers.iter().cloned().collect();

        Self {
            enriched_count,
            total_possible_fields,
            enrichment_percentage: percentage(enriched_count, total_possible_fields),
            enriched_fields,
            average_quality_score: mean(&scores),
            tier: result.overall_quality.as_str().to_string(),
            provider_count: successful_providers.len(),
            successful_providers,
        }
    }
}

/// `part / whole * 100`, or 0 for an empty whole.
pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
