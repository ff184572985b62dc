//! Record-level entry points.
//!
//! `enrich` turns one biosample record into a schema mapping plus coverage
//! metrics. Missing inputs and empty merges are reported in the outcome, not
//! raised; only an unsupported target schema is an error.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use enrich_common::{Coordinates, EnrichError, EnrichResult};

use crate::coverage::CoverageMetrics;
use crate::domain::{DepthInterval, Domain};
use crate::extract::{extract_collection_date, extract_coordinates, extract_depth};
use crate::quality::QualityTier;
use crate::reconcile::Reconciler;
use crate::result::DomainResult;
use crate::schema::{SchemaMapper, SchemaMapping, TargetSchema};

/// Why a record produced no enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoCoordinates,
    InvalidCoordinates,
    NoCollectionDate,
    /// Every provider was unavailable, failed or returned nothing.
    NoDataAvailable,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NoCoordinates => "no_coordinates",
            FailureReason::InvalidCoordinates => "invalid_coordinates",
            FailureReason::NoCollectionDate => "no_collection_date",
            FailureReason::NoDataAvailable => "no_data_available",
        }
    }

    /// True when the record could not be looked up at all.
    pub fn is_input_failure(&self) -> bool {
        !matches!(self, FailureReason::NoDataAvailable)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of enriching a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct EnrichmentOutcome<D: Domain> {
    pub success: bool,
    /// Target-schema fields; empty unless `success`.
    pub schema_mapping: SchemaMapping,
    /// Present whenever providers were queried.
    pub coverage_metrics: Option<CoverageMetrics>,
    pub merged_result: Option<DomainResult<D>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureReason>,
}

impl<D: Domain> EnrichmentOutcome<D> {
    /// Outcome for a record that could not be looked up.
    pub fn failed(reason: FailureReason) -> Self {
        Self {
            success: false,
            schema_mapping: SchemaMapping::new(),
            coverage_metrics: None,
            merged_result: None,
            error: Some(reason),
        }
    }
}

/// Outcomes for a collection of records, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct BatchOutcome<D: Domain> {
    pub outcomes: Vec<EnrichmentOutcome<D>>,
    pub successful: usize,
    pub failed: usize,
}

impl<D: Domain> BatchOutcome<D> {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Enrichment over a single domain's reconciler.
pub struct Enricher<D: Domain> {
    reconciler: Reconciler<D>,
}

impl<D: Domain> Clone for Enricher<D> {
    fn clone(&self) -> Self {
        Self {
            reconciler: self.reconciler.clone(),
        }
    }
}

impl<D: SchemaMapper> Enricher<D> {
    pub fn new(reconciler: Reconciler<D>) -> Self {
        Self { reconciler }
    }

    pub fn reconciler(&self) -> &Reconciler<D> {
        &self.reconciler
    }

    /// Enrich one record into `schema_id`.
    pub async fn enrich(&self, record: &Value, schema_id: &str) -> EnrichResult<EnrichmentOutcome<D>> {
        let schema: TargetSchema = schema_id.parse()?;
        Ok(self.enrich_record(record, schema).await)
    }

    /// Enrich a record with an already-parsed schema.
    pub async fn enrich_record(&self, record: &Value, schema: TargetSchema) -> EnrichmentOutcome<D> {
        let location = match extract_coordinates(record) {
            Ok(location) => location,
            Err(EnrichError::InvalidCoordinates { lat, lon }) => {
                warn!(lat, lon, "Record coordinates out of range");
                return EnrichmentOutcome::failed(FailureReason::InvalidCoordinates);
            }
            Err(_) => return EnrichmentOutcome::failed(FailureReason::NoCoordinates),
        };

        let Some(date) = extract_collection_date(record) else {
            return EnrichmentOutcome::failed(FailureReason::NoCollectionDate);
        };

        let depth = extract_depth(record);
        self.enrich_point_at(&location, date, depth, schema).await
    }

    /// Enrich an explicit location and date.
    pub async fn enrich_point(
        &self,
        location: &Coordinates,
        date: NaiveDate,
        schema: TargetSchema,
    ) -> EnrichmentOutcome<D> {
        self.enrich_point_at(location, date, None, schema).await
    }

    /// Enrich a location and date for a sample taken at `depth`.
    #[instrument(skip(self, schema), fields(domain = D::NAME, schema = %schema))]
    pub async fn enrich_point_at(
        &self,
        location: &Coordinates,
        date: NaiveDate,
        depth: Option<DepthInterval>,
        schema: TargetSchema,
    ) -> EnrichmentOutcome<D> {
        let merged = self.reconciler.reconcile_at(location, date, depth).await;
        let metrics = CoverageMetrics::from_result(&merged);

        if merged.overall_quality.is_no_data() {
            return EnrichmentOutcome {
                success: false,
                schema_mapping: SchemaMapping::new(),
                coverage_metrics: Some(metrics),
                merged_result: Some(merged),
                error: Some(FailureReason::NoDataAvailable),
            };
        }

        EnrichmentOutcome {
            success: true,
            schema_mapping: D::map_result(&merged, schema),
            coverage_metrics: Some(metrics),
            merged_result: Some(merged),
            error: None,
        }
    }

    /// Enrich records one after another. A failing record is recorded and
    /// the batch continues.
    pub async fn enrich_batch(&self, records: &[Value], schema_id: &str) -> EnrichResult<BatchOutcome<D>> {
        let schema: TargetSchema = schema_id.parse()?;

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(self.enrich_record(record, schema).await);
        }

        let successful = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - successful;

        info!(
            domain = D::NAME,
            total = outcomes.len(),
            successful,
            failed,
            "Batch enrichment complete"
        );

        Ok(BatchOutcome {
            outcomes,
            successful,
            failed,
        })
    }
}
