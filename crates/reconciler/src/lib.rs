//! Multi-source environmental observation reconciliation.
//!
//! Queries an ordered set of providers for one location and date, scores the
//! returned observations, keeps the best-tier observation per field and
//! projects the merged result into a target biosample schema.
//!
//! # Example
//!
//! ```ignore
//! use reconciler::{Enricher, Reconciler, Marine};
//!
//! let reconciler = Reconciler::<Marine>::new(vec![oisst, gebco]);
//! let enricher = Enricher::new(reconciler);
//! let outcome = enricher.enrich(&record, "nmdc").await?;
//! ```

pub mod analysis;
pub mod coverage;
pub mod domain;
pub mod enrich;
pub mod extract;
pub mod observation;
pub mod provider;
pub mod quality;
pub mod reconcile;
pub mod result;
pub mod schema;
pub mod soil;

pub use analysis::{CollectionAnalysis, EnrichmentSummary, FieldImprovement, ImprovementCategory};
pub use domain::{
    DepthInterval, Domain, DomainField, DomainKind, Marine, MarineField, Soil, SoilField, Weather,
    WeatherField,
};
pub use enrich::{BatchOutcome, Enricher, EnrichmentOutcome, FailureReason};
pub use extract::{extract_collection_date, extract_coordinates, extract_lat_lon};
pub use coverage::CoverageMetrics;
pub use observation::{Aggregate, Observation, ObservationValue, Precision, ProviderId};
pub use provider::{Provider, ProviderRegistry};
pub use quality::{MarineQuality, QualityTier, SoilQuality, WeatherQuality};
pub use reconcile::Reconciler;
pub use result::{DomainResult, Layer};
pub use schema::{SchemaMapper, SchemaMapping, TargetSchema};
pub use soil::{classify_texture, TextureClass};

pub use enrich_common::{Coordinates, EnrichError, EnrichResult};
