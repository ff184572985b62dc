//! Wires configured providers into one enricher per domain and runs the CLI
//! commands against them.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use enrich_common::Coordinates;
use providers::{marine_registry, soil_registry, weather_registry, CacheStats, HttpClient};
use reconciler::{DomainKind, Enricher, Marine, Reconciler, Soil, TargetSchema, Weather};

use crate::config::EnricherConfig;

/// Counts and serialized outcomes of a batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub output: Value,
}

/// One enricher per domain.
pub struct Enrichers {
    weather: Enricher<Weather>,
    marine: Enricher<Marine>,
    soil: Enricher<Soil>,
    http: Option<Arc<HttpClient>>,
}

impl Enrichers {
    pub fn new(weather: Enricher<Weather>, marine: Enricher<Marine>, soil: Enricher<Soil>) -> Self {
        Self {
            weather,
            marine,
            soil,
            http: None,
        }
    }

    /// Build enrichers over the live providers, in configured priority order.
    pub fn from_config(config: &EnricherConfig) -> Result<Self> {
        let http = Arc::new(HttpClient::new(&config.http).context("Failed to build HTTP client")?);

        let weather = Reconciler::from_registry(
            &weather_registry(http.clone()),
            &config.domain(DomainKind::Weather).providers,
        )?;
        let marine = Reconciler::from_registry(
            &marine_registry(http.clone()),
            &config.domain(DomainKind::Marine).providers,
        )?;
        let soil = Reconciler::from_registry(
            &soil_registry(http.clone()),
            &config.domain(DomainKind::Soil).providers,
        )?;

        info!(
            weather = ?config.weather.providers,
            marine = ?config.marine.providers,
            soil = ?config.soil.providers,
            "Providers configured"
        );

        let mut enrichers = Self::new(Enricher::new(weather), Enricher::new(marine), Enricher::new(soil));
        enrichers.http = Some(http);
        Ok(enrichers)
    }

    /// Response cache counters, when the live client has a cache.
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match self.http.as_ref().and_then(|http| http.cache()) {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Enrich a single point.
    pub async fn lookup(
        &self,
        domain: DomainKind,
        location: &Coordinates,
        date: NaiveDate,
        schema: TargetSchema,
    ) -> Result<Value> {
        let value = match domain {
            DomainKind::Weather => to_json(&self.weather.enrich_point(location, date, schema).await)?,
            DomainKind::Marine => to_json(&self.marine.enrich_point(location, date, schema).await)?,
            DomainKind::Soil => to_json(&self.soil.enrich_point(location, date, schema).await)?,
        };
        Ok(value)
    }

    /// Enrich every record. Records without usable inputs or data are
    /// counted as failed; they never abort the batch.
    pub async fn batch(&self, domain: DomainKind, records: &[Value], schema: TargetSchema) -> Result<BatchReport> {
        macro_rules! run {
            ($enricher:expr) => {{
                let batch = $enricher.enrich_batch(records, schema.as_str()).await?;
                BatchReport {
                    total: batch.total(),
                    successful: batch.successful,
                    failed: batch.failed,
                    output: to_json(&batch)?,
                }
            }};
        }

        let report = match domain {
            DomainKind::Weather => run!(self.weather),
            DomainKind::Marine => run!(self.marine),
            DomainKind::Soil => run!(self.soil),
        };
        Ok(report)
    }

    /// Before/after field coverage over a collection.
    pub async fn analyze(
        &self,
        domain: DomainKind,
        records: &[Value],
        source: &str,
        schema: TargetSchema,
    ) -> Result<Value> {
        let analysis = match domain {
            DomainKind::Weather => self.weather.analyze_collection(records, source, schema.as_str()).await?,
            DomainKind::Marine => self.marine.analyze_collection(records, source, schema.as_str()).await?,
            DomainKind::Soil => self.soil.analyze_collection(records, source, schema.as_str()).await?,
        };
        to_json(&analysis)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize result")
}
