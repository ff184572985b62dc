//! Enrichment domains and their fixed field sets.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use enrich_common::EnrichError;

use crate::quality::{MarineQuality, QualityTier, SoilQuality, WeatherQuality};

/// A named observation slot of a domain.
pub trait DomainField:
    Copy + Ord + Hash + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Snake-case name used in output and metrics.
    fn as_str(&self) -> &'static str;

    /// Record keys that already carry this quantity in either target schema.
    fn record_aliases(&self) -> &'static [&'static str];
}

/// An enrichment domain: its field set and tier ordering.
pub trait Domain: fmt::Debug + Clone + PartialEq + Send + Sync + 'static {
    type Field: DomainField;
    type Tier: QualityTier;

    const NAME: &'static str;

    /// Every observation slot, in canonical order.
    const FIELDS: &'static [Self::Field];

    fn total_fields() -> usize {
        Self::FIELDS.len()
    }
}

/// Atmospheric conditions on the collection day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Weather;

/// Oceanographic conditions at the collection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Marine;

/// Static soil site characterization, stratified by depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Soil;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherField {
    Temperature,
    WindSpeed,
    WindDirection,
    Humidity,
    SolarRadiation,
    Precipitation,
    Pressure,
}

impl DomainField for WeatherField {
    fn as_str(&self) -> &'static str {
        match self {
            WeatherField::Temperature => "temperature",
            WeatherField::WindSpeed => "wind_speed",
            WeatherField::WindDirection => "wind_direction",
            WeatherField::Humidity => "humidity",
            WeatherField::SolarRadiation => "solar_radiation",
            WeatherField::Precipitation => "precipitation",
            WeatherField::Pressure => "pressure",
        }
    }

    fn record_aliases(&self) -> &'static [&'static str] {
        match self {
            WeatherField::Temperature => &["temp", "avg_temp", "sampleCollectionTemperature"],
            WeatherField::WindSpeed => &["wind_speed", "windSpeed"],
            WeatherField::WindDirection => &["wind_direction"],
            WeatherField::Humidity => &["humidity", "abs_air_humidity"],
            WeatherField::SolarRadiation => &["solar_irradiance", "photon_flux"],
            WeatherField::Precipitation => &["precipitation"],
            WeatherField::Pressure => &["pressure"],
        }
    }
}

impl Domain for Weather {
    type Field = WeatherField;
    type Tier = WeatherQuality;

    const NAME: &'static str = "weather";

    const FIELDS: &'static [WeatherField] = &[
        WeatherField::Temperature,
        WeatherField::WindSpeed,
        WeatherField::WindDirection,
        WeatherField::Humidity,
        WeatherField::SolarRadiation,
        WeatherField::Precipitation,
        WeatherField::Pressure,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarineField {
    SeaSurfaceTemperature,
    /// Negative below sea level.
    Bathymetry,
    ChlorophyllA,
    Salinity,
    DissolvedOxygen,
    Ph,
    /// Eastward velocity.
    OceanCurrentU,
    /// Northward velocity.
    OceanCurrentV,
    SignificantWaveHeight,
}

impl DomainField for MarineField {
    fn as_str(&self) -> &'static str {
        match self {
            MarineField::SeaSurfaceTemperature => "sea_surface_temperature",
            MarineField::Bathymetry => "bathymetry",
            MarineField::ChlorophyllA => "chlorophyll_a",
            MarineField::Salinity => "salinity",
            MarineField::DissolvedOxygen => "dissolved_oxygen",
            MarineField::Ph => "ph",
            MarineField::OceanCurrentU => "ocean_current_u",
            MarineField::OceanCurrentV => "ocean_current_v",
            MarineField::SignificantWaveHeight => "significant_wave_height",
        }
    }

    fn record_aliases(&self) -> &'static [&'static str] {
        match self {
            MarineField::SeaSurfaceTemperature => &["temp", "sampleCollectionTemperature"],
            MarineField::Bathymetry => &["tot_depth_water_col", "depthInMeters"],
            MarineField::ChlorophyllA => &["chlorophyll", "chlorophyllConcentration"],
            MarineField::Salinity => &["salinity", "salinityConcentration"],
            MarineField::DissolvedOxygen => &["diss_oxygen", "oxygenConcentration"],
            MarineField::Ph => &["ph"],
            MarineField::OceanCurrentU | MarineField::OceanCurrentV => &[],
            MarineField::SignificantWaveHeight => &[],
        }
    }
}

impl Domain for Marine {
    type Field = MarineField;
    type Tier = MarineQuality;

    const NAME: &'static str = "marine";

    const FIELDS: &'static [MarineField] = &[
        MarineField::SeaSurfaceTemperature,
        MarineField::Bathymetry,
        MarineField::ChlorophyllA,
        MarineField::Salinity,
        MarineField::DissolvedOxygen,
        MarineField::Ph,
        MarineField::OceanCurrentU,
        MarineField::OceanCurrentV,
        MarineField::SignificantWaveHeight,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilField {
    ClassificationUsda,
    ClassificationWrb,
    TextureClass,
    PhH2o,
    OrganicCarbon,
    BulkDensity,
    Sand,
    Silt,
    Clay,
    TotalNitrogen,
}

impl DomainField for SoilField {
    fn as_str(&self) -> &'static str {
        match self {
            SoilField::ClassificationUsda => "classification_usda",
            SoilField::ClassificationWrb => "classification_wrb",
            SoilField::TextureClass => "texture_class",
            SoilField::PhH2o => "ph_h2o",
            SoilField::OrganicCarbon => "organic_carbon",
            SoilField::BulkDensity => "bulk_density",
            SoilField::Sand => "sand",
            SoilField::Silt => "silt",
            SoilField::Clay => "clay",
            SoilField::TotalNitrogen => "total_nitrogen",
        }
    }

    fn record_aliases(&self) -> &'static [&'static str] {
        match self {
            SoilField::ClassificationUsda | SoilField::ClassificationWrb => &["soil_type"],
            SoilField::TextureClass => &["soil_texture_meth"],
            SoilField::PhH2o => &["ph", "soil_ph"],
            SoilField::OrganicCarbon => &["org_carb"],
            SoilField::TotalNitrogen => &["tot_nitro_content"],
            SoilField::BulkDensity | SoilField::Sand | SoilField::Silt | SoilField::Clay => &[],
        }
    }
}

impl Domain for Soil {
    type Field = SoilField;
    type Tier = SoilQuality;

    const NAME: &'static str = "soil";

    const FIELDS: &'static [SoilField] = &[
        SoilField::ClassificationUsda,
        SoilField::ClassificationWrb,
        SoilField::TextureClass,
        SoilField::PhH2o,
        SoilField::OrganicCarbon,
        SoilField::BulkDensity,
        SoilField::Sand,
        SoilField::Silt,
        SoilField::Clay,
        SoilField::TotalNitrogen,
    ];
}

/// Standard soil depth intervals. Ordering is shallow to deep, with the
/// full-profile interval last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DepthInterval {
    #[serde(rename = "0-5cm")]
    Cm0To5,
    #[serde(rename = "5-15cm")]
    Cm5To15,
    #[serde(rename = "15-30cm")]
    Cm15To30,
    #[serde(rename = "30-60cm")]
    Cm30To60,
    #[serde(rename = "60-100cm")]
    Cm60To100,
    #[serde(rename = "100-200cm")]
    Cm100To200,
    /// Whole described profile, used by survey data.
    #[serde(rename = "0-200cm")]
    FullProfile,
}

impl DepthInterval {
    pub const STANDARD: [DepthInterval; 6] = [
        DepthInterval::Cm0To5,
        DepthInterval::Cm5To15,
        DepthInterval::Cm15To30,
        DepthInterval::Cm30To60,
        DepthInterval::Cm60To100,
        DepthInterval::Cm100To200,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DepthInterval::Cm0To5 => "0-5cm",
            DepthInterval::Cm5To15 => "5-15cm",
            DepthInterval::Cm15To30 => "15-30cm",
            DepthInterval::Cm30To60 => "30-60cm",
            DepthInterval::Cm60To100 => "60-100cm",
            DepthInterval::Cm100To200 => "100-200cm",
            DepthInterval::FullProfile => "0-200cm",
        }
    }

    /// Standard interval containing a sampling depth given in meters.
    pub fn from_depth_m(depth_m: f64) -> Self {
        let depth_m = depth_m.abs();
        if depth_m <= 0.05 {
            DepthInterval::Cm0To5
        } else if depth_m <= 0.15 {
            DepthInterval::Cm5To15
        } else if depth_m <= 0.30 {
            DepthInterval::Cm15To30
        } else if depth_m <= 0.60 {
            DepthInterval::Cm30To60
        } else if depth_m <= 1.00 {
            DepthInterval::Cm60To100
        } else {
            DepthInterval::Cm100To200
        }
    }
}

impl fmt::Display for DepthInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepthInterval {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(' ', "");
        DepthInterval::STANDARD
            .iter()
            .chain(std::iter::once(&DepthInterval::FullProfile))
            .find(|d| d.as_str() == normalized)
            .copied()
            .ok_or_else(|| EnrichError::Config(format!("unknown depth interval: {}", s)))
    }
}

/// Runtime selector for a domain, used by configuration and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    Weather,
    Marine,
    Soil,
}

impl DomainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainKind::Weather => Weather::NAME,
            DomainKind::Marine => Marine::NAME,
            DomainKind::Soil => Soil::NAME,
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainKind {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weather" => Ok(DomainKind::Weather),
            "marine" => Ok(DomainKind::Marine),
            "soil" => Ok(DomainKind::Soil),
            other => Err(EnrichError::Config(format!("unknown domain: {}", other))),
        }
    }
}
