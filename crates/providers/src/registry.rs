//! Provider identifiers and registry construction.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use reconciler::{DomainKind, EnrichError, Marine, ProviderRegistry, Soil, Weather};

use crate::http::HttpClient;
use crate::marine::{esa_cci, gebco, noaa_oisst, EsaCciProvider, GebcoProvider, NoaaOisstProvider};
use crate::soil::{soilgrids, usda_nrcs, SoilGridsProvider, UsdaNrcsProvider};
use crate::weather::{meteostat, open_meteo, MeteostatProvider, OpenMeteoProvider};

/// Every concrete provider, grouped by domain in default priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenMeteo,
    Meteostat,
    NoaaOisst,
    EsaCci,
    Gebco,
    UsdaNrcs,
    Soilgrids,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 7] = [
        ProviderKind::OpenMeteo,
        ProviderKind::Meteostat,
        ProviderKind::NoaaOisst,
        ProviderKind::EsaCci,
        ProviderKind::Gebco,
        ProviderKind::UsdaNrcs,
        ProviderKind::Soilgrids,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenMeteo => open_meteo::ID,
            ProviderKind::Meteostat => meteostat::ID,
            ProviderKind::NoaaOisst => noaa_oisst::ID,
            ProviderKind::EsaCci => esa_cci::ID,
            ProviderKind::Gebco => gebco::ID,
            ProviderKind::Soilgrids => soilgrids::ID,
            ProviderKind::UsdaNrcs => usda_nrcs::ID,
        }
    }

    pub fn domain(&self) -> DomainKind {
        match self {
            ProviderKind::OpenMeteo | ProviderKind::Meteostat => DomainKind::Weather,
            ProviderKind::NoaaOisst | ProviderKind::EsaCci | ProviderKind::Gebco => DomainKind::Marine,
            ProviderKind::Soilgrids | ProviderKind::UsdaNrcs => DomainKind::Soil,
        }
    }

    /// Default priority order for a domain.
    pub fn defaults_for(domain: DomainKind) -> Vec<ProviderKind> {
        Self::ALL.into_iter().filter(|k| k.domain() == domain).collect()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| EnrichError::UnknownProvider(s.to_string()))
    }
}

pub fn weather_registry(http: Arc<HttpClient>) -> ProviderRegistry<Weather> {
    let mut registry = ProviderRegistry::new();
    registry
        .register(Arc::new(OpenMeteoProvider::new(http.clone())))
        .register(Arc::new(MeteostatProvider::new(http)));
    registry
}

pub fn marine_registry(http: Arc<HttpClient>) -> ProviderRegistry<Marine> {
    let mut registry = ProviderRegistry::new();
    registry
        .register(Arc::new(NoaaOisstProvider::new(http.clone())))
        .register(Arc::new(EsaCciProvider::new(http.clone())))
        .register(Arc::new(GebcoProvider::new(http)));
    registry
}

pub fn soil_registry(http: Arc<HttpClient>) -> ProviderRegistry<Soil> {
    let mut registry = ProviderRegistry::new();
    registry
        .register(Arc::new(UsdaNrcsProvider::new(http.clone())))
        .register(Arc::new(SoilGridsProvider::new(http)));
    registry
}
