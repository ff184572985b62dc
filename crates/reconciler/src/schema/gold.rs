//! GOLD biosample tables: flat strings and bare numbers.

use std::collections::BTreeSet;

use serde_json::Value;

use super::{FieldRule, SchemaMapping, Shape};
use crate::domain::{MarineField, Soil, SoilField, WeatherField};
use crate::result::DomainResult;

pub(super) const WEATHER: &[FieldRule<WeatherField>] = &[
    FieldRule::new(WeatherField::Temperature, "sampleCollectionTemperature", Shape::FlatString),
    FieldRule::new(WeatherField::Pressure, "pressure", Shape::FlatString),
    FieldRule::new(WeatherField::WindSpeed, "windSpeed", Shape::FlatString),
    FieldRule::new(WeatherField::Humidity, "humidity", Shape::FlatString),
];

pub(super) const MARINE: &[FieldRule<MarineField>] = &[
    FieldRule::new(MarineField::SeaSurfaceTemperature, "sampleCollectionTemperature", Shape::FlatString),
    FieldRule::new(MarineField::Bathymetry, "depthInMeters", Shape::Number).absolute(),
    FieldRule::new(MarineField::Bathymetry, "elevationInMeters", Shape::Number),
    FieldRule::new(MarineField::Salinity, "salinity", Shape::FlatString),
    FieldRule::new(MarineField::Salinity, "salinityConcentration", Shape::FlatString),
    FieldRule::new(MarineField::DissolvedOxygen, "oxygenConcentration", Shape::FlatString),
    FieldRule::new(MarineField::Ph, "ph", Shape::Number),
    FieldRule::new(MarineField::ChlorophyllA, "chlorophyllConcentration", Shape::FlatString),
];

pub(super) const SOIL: &[FieldRule<SoilField>] = &[FieldRule::new(SoilField::PhH2o, "ph", Shape::Number)];

/// `habitatDetails`: "Soil: X; Texture: Y; pH: Z" from the parts present.
pub(super) fn soil_composites(result: &DomainResult<Soil>, out: &mut SchemaMapping) {
    let mut details = Vec::new();

    if let Some(class) = result
        .observation(SoilField::ClassificationUsda)
        .and_then(|o| o.value.as_text())
    {
        details.push(format!("Soil: {}", class));
    }
    if let Some(texture) = result
        .observation(SoilField::TextureClass)
        .and_then(|o| o.value.as_text())
    {
        details.push(format!("Texture: {}", texture));
    }
    if let Some(ph) = result
        .observation(SoilField::PhH2o)
        .and_then(|o| o.value.as_number())
    {
        details.push(format!("pH: {}", ph));
    }

    if !details.is_empty() {
        out.insert("habitatDetails".to_string(), Value::String(details.join("; ")));
    }
}

pub(super) fn soil_composite_sources(mapping: &SchemaMapping, fields: &mut BTreeSet<SoilField>) {
    let Some(details) = mapping.get("habitatDetails").and_then(Value::as_str) else {
        return;
    };
    for part in details.split("; ") {
        if part.starts_with("Soil: ") {
            fields.insert(SoilField::ClassificationUsda);
        } else if part.starts_with("Texture: ") {
            fields.insert(SoilField::TextureClass);
        } else if part.starts_with("pH: ") {
            fields.insert(SoilField::PhH2o);
        }
    }
}
