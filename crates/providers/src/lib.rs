//! Environmental data providers for the reconciler.
//!
//! Each provider answers for one domain and implements
//! [`reconciler::Provider`]. All of them share one [`HttpClient`], which
//! applies the request timeout and caches successful responses.
//!
//! Weather: [`OpenMeteoProvider`] (ERA5 hourly), [`MeteostatProvider`]
//! (station daily summaries).
//! Marine: [`NoaaOisstProvider`] (SST), [`EsaCciProvider`] (chlorophyll-a),
//! [`GebcoProvider`] (bathymetry).
//! Soil: [`UsdaNrcsProvider`] (US survey taxonomy), [`SoilGridsProvider`]
//! (global WRB class and topsoil properties).

pub mod cache;
pub mod error;
pub mod http;
pub mod marine;
pub mod registry;
pub mod soil;
pub mod weather;

pub use cache::{CacheStats, ResponseCache};
pub use error::{ProviderError, ProviderResult};
pub use http::{cache_key, CacheConfig, HttpClient, HttpConfig, HttpResponse, RequestOptions};
pub use marine::{EsaCciProvider, GebcoProvider, NoaaOisstProvider};
pub use registry::{marine_registry, soil_registry, weather_registry, ProviderKind};
pub use soil::{SoilGridsProvider, UsdaNrcsProvider};
pub use weather::{MeteostatProvider, OpenMeteoProvider};
