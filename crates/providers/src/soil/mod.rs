//! Soil providers.

pub mod soilgrids;
pub mod usda_nrcs;

pub use soilgrids::SoilGridsProvider;
pub use usda_nrcs::UsdaNrcsProvider;
