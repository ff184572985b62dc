//! Before/after field coverage across a collection of records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use enrich_common::EnrichResult;

use crate::coverage::{mean, percentage};
use crate::domain::{Domain, DomainField};
use crate::enrich::{Enricher, EnrichmentOutcome};
use crate::observation::ProviderId;
use crate::schema::{SchemaMapper, SchemaMapping, TargetSchema};

/// Size of a coverage gain in percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementCategory {
    Major,
    Significant,
    Moderate,
    Minor,
    None,
}

impl ImprovementCategory {
    pub fn from_points(absolute: f64) -> Self {
        if absolute >= 50.0 {
            ImprovementCategory::Major
        } else if absolute >= 20.0 {
            ImprovementCategory::Significant
        } else if absolute >= 5.0 {
            ImprovementCategory::Moderate
        } else if absolute > 0.0 {
            ImprovementCategory::Minor
        } else {
            ImprovementCategory::None
        }
    }
}

/// Coverage change for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldImprovement {
    /// Percent of records carrying the field before enrichment.
    pub before: f64,
    pub after: f64,
    /// `after - before`, in percentage points.
    pub absolute: f64,
    /// Gain relative to `before`, in percent; `None` when `before` is 0.
    pub relative: Option<f64>,
    pub category: ImprovementCategory,
}

impl FieldImprovement {
    pub fn new(before: f64, after: f64) -> Self {
        let absolute = after - before;
        let relative = (before > 0.0).then(|| absolute / before * 100.0);
        Self {
            before,
            after,
            absolute,
            relative,
            category: ImprovementCategory::from_points(absolute),
        }
    }
}

/// Aggregate outcome counts for an analyzed collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    pub successful: usize,
    pub failed: usize,
    pub failure_reasons: BTreeMap<String, usize>,
    pub tier_distribution: BTreeMap<String, usize>,
    pub provider_success: BTreeMap<ProviderId, usize>,
    /// Mean of per-record average scores; `None` when no record had one.
    pub average_quality_score: Option<f64>,
}

impl EnrichmentSummary {
    pub fn from_outcomes<'a, D: Domain>(outcomes: impl IntoIterator<Item = &'a EnrichmentOutcome<D>>) -> Self {
        let mut summary = Self::default();
        let mut scores = Vec::new();

        for outcome in outcomes {
            if outcome.success {
                summary.successful += 1;
            } else {
                summary.failed += 1;
            }
            if let Some(reason) = outcome.error {
                *summary.failure_reasons.entry(reason.as_str().to_string()).or_default() += 1;
            }
            if let Some(metrics) = &outcome.coverage_metrics {
                *summary.tier_distribution.entry(metrics.tier.clone()).or_default() += 1;
                for provider in &metrics.successful_providers {
                    *summary.provider_success.entry(provider.clone()).or_default() += 1;
                }
                scores.extend(metrics.average_quality_score);
            }
        }

        summary.average_quality_score = mean(&scores);
        summary
    }
}

/// Field coverage of a collection before and after enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionAnalysis {
    pub source: String,
    pub domain: String,
    pub schema: TargetSchema,
    pub total_records: usize,
    /// Keyed by domain field name.
    pub fields: BTreeMap<String, FieldImprovement>,
    pub summary: EnrichmentSummary,
}

impl CollectionAnalysis {
    pub fn field(&self, name: &str) -> Option<&FieldImprovement> {
        self.fields.get(name)
    }
}

/// Whether a record key holds usable data.
///
/// Quantity and text objects count when `has_numeric_value` or
/// `has_raw_value` is non-null; bare numbers count; strings count unless blank.
pub fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Number(_) | Value::Bool(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Object(obj) => ["has_numeric_value", "has_raw_value"]
            .iter()
            .any(|k| obj.get(*k).is_some_and(|v| !v.is_null())),
        Value::Array(items) => !items.is_empty(),
    }
}

/// Whether `field` is present under any of its alias keys.
pub fn record_has_field<F: DomainField>(record: &Value, field: F) -> bool {
    field
        .record_aliases()
        .iter()
        .any(|alias| record.get(*alias).is_some_and(has_value))
}

/// A record with the mapping's keys laid over it.
fn overlay(record: &Value, mapping: &SchemaMapping) -> Value {
    let mut merged = match record {
        Value::Object(obj) => obj.clone(),
        _ => SchemaMapping::new(),
    };
    for (key, value) in mapping {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}

/// Percentage of `records` carrying each domain field.
pub fn field_coverage<D: Domain>(records: &[Value]) -> Vec<(D::Field, f64)> {
    D::FIELDS
        .iter()
        .map(|field| {
            let present = records.iter().filter(|r| record_has_field(r, *field)).count();
            (*field, percentage(present, records.len()))
        })
        .collect()
}

impl<D: SchemaMapper> Enricher<D> {
    /// Enrich every record and report per-field coverage gains.
    pub async fn analyze_collection(
        &self,
        records: &[Value],
        source: &str,
        schema_id: &str,
    ) -> EnrichResult<CollectionAnalysis> {
        let schema: TargetSchema = schema_id.parse()?;
        let batch = self.enrich_batch(records, schema.as_str()).await?;

        let enriched: Vec<Value> = records
            .iter()
            .zip(&batch.outcomes)
            .map(|(record, outcome)| overlay(record, &outcome.schema_mapping))
            .collect();

        let before = field_coverage::<D>(records);
        let after = field_coverage::<D>(&enriched);

        let fields = before
            .into_iter()
            .zip(after)
            .map(|((field, b), (_, a))| (field.as_str().to_string(), FieldImprovement::new(b, a)))
            .collect();

        let analysis = CollectionAnalysis {
            source: source.to_string(),
            domain: D::NAME.to_string(),
            schema,
            total_records: records.len(),
            fields,
            summary: EnrichmentSummary::from_outcomes(&batch.outcomes),
        };

        info!(
            source,
            domain = D::NAME,
            records = analysis.total_records,
            successful = analysis.summary.successful,
            "Collection analysis complete"
        );

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Weather, WeatherField};
    use serde_json::json;

    #[test]
    fn test_categories() {
        assert_eq!(ImprovementCategory::from_points(50.0), ImprovementCategory::Major);
        assert_eq!(ImprovementCategory::from_points(20.0), ImprovementCategory::Significant);
        assert_eq!(ImprovementCategory::from_points(5.0), ImprovementCategory::Moderate);
        assert_eq!(ImprovementCategory::from_points(0.1), ImprovementCategory::Minor);
        assert_eq!(ImprovementCategory::from_points(0.0), ImprovementCategory::None);
    }

    #[test]
    fn test_relative_undefined_from_zero() {
        let improvement = FieldImprovement::new(0.0, 40.0);
        assert_eq!(improvement.relative, None);
        assert_eq!(improvement.category, ImprovementCategory::Significant);

        let improvement = FieldImprovement::new(25.0, 50.0);
        assert_eq!(improvement.relative, Some(100.0));
        assert_eq!(improvement.absolute, 25.0);
    }

    #[test]
    fn test_has_value() {
        assert!(has_value(&json!({"has_numeric_value": 0.0})));
        assert!(has_value(&json!({"has_raw_value": "loam"})));
        assert!(!has_value(&json!({"has_numeric_value": null})));
        assert!(!has_value(&json!({"type": "nmdc:QuantityValue"})));
        assert!(has_value(&json!(12.5)));
        assert!(!has_value(&json!("  ")));
        assert!(!has_value(&Value::Null));
    }

    #[test]
    fn test_field_coverage_uses_aliases() {
        let records = vec![
            json!({"temp": {"has_numeric_value": 12.0}}),
            json!({"sampleCollectionTemperature": "12 Celsius"}),
            json!({"avg_temp": null, "humidity": 40}),
            json!({}),
        ];
        let coverage = field_coverage::<Weather>(&records);
        let temp = coverage.iter().find(|(f, _)| *f == WeatherField::Temperature).unwrap();
        assert_eq!(temp.1, 50.0);
        let humidity = coverage.iter().find(|(f, _)| *f == WeatherField::Humidity).unwrap();
        assert_eq!(humidity.1, 25.0);
    }

    #[test]
    fn test_empty_collection() {
        let coverage = field_coverage::<Weather>(&[]);
        assert!(coverage.iter().all(|(_, pct)| *pct == 0.0));
    }
}
