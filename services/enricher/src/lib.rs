//! Biosample enrichment service: configuration, input handling and the
//! per-domain enrichers behind the `enricher` binary.

pub mod config;
pub mod input;
pub mod runner;

pub use config::{DomainConfig, EnricherConfig};
pub use input::{parse_records, read_records};
pub use runner::{BatchReport, Enrichers};
