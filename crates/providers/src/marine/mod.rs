//! Oceanographic providers.

pub mod erddap;
pub mod esa_cci;
pub mod gebco;
pub mod noaa_oisst;

pub use esa_cci::EsaCciProvider;
pub use gebco::GebcoProvider;
pub use noaa_oisst::NoaaOisstProvider;
