//! NMDC biosample tables: nested quantity and text objects.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{FieldRule, SchemaMapping, Shape, TargetSchema};
use crate::domain::{MarineField, Soil, SoilField, WeatherField};
use crate::result::DomainResult;

pub(super) const WEATHER: &[FieldRule<WeatherField>] = &[
    FieldRule::new(WeatherField::Temperature, "temp", Shape::QuantityWithRange),
    FieldRule::new(WeatherField::WindSpeed, "wind_speed", Shape::QuantityWithUnit),
    FieldRule::new(WeatherField::WindDirection, "wind_direction", Shape::Text),
    FieldRule::new(WeatherField::Humidity, "humidity", Shape::QuantityWithUnit),
    FieldRule::new(WeatherField::SolarRadiation, "solar_irradiance", Shape::QuantityWithUnit),
    FieldRule::new(WeatherField::Precipitation, "precipitation", Shape::QuantityWithUnit),
    FieldRule::new(WeatherField::Pressure, "pressure", Shape::QuantityWithUnit),
];

pub(super) const MARINE: &[FieldRule<MarineField>] = &[
    FieldRule::new(MarineField::SeaSurfaceTemperature, "temp", Shape::QuantityWithUnit),
    FieldRule::new(MarineField::Bathymetry, "tot_depth_water_col", Shape::QuantityWithUnit).absolute(),
    FieldRule::new(MarineField::Bathymetry, "elev", Shape::QuantityWithUnit),
    FieldRule::new(MarineField::ChlorophyllA, "chlorophyll", Shape::QuantityWithUnit),
    FieldRule::new(MarineField::Salinity, "salinity", Shape::QuantityWithUnit),
    FieldRule::new(MarineField::DissolvedOxygen, "diss_oxygen", Shape::QuantityWithUnit),
    FieldRule::new(MarineField::Ph, "ph", Shape::QuantityWithUnit),
];

pub(super) const SOIL: &[FieldRule<SoilField>] = &[
    FieldRule::new(SoilField::PhH2o, "ph", Shape::QuantityWithUnit).unit("pH"),
    FieldRule::new(SoilField::OrganicCarbon, "org_carb", Shape::QuantityWithUnit),
    FieldRule::new(SoilField::TotalNitrogen, "tot_nitro_content", Shape::QuantityWithUnit),
];

const TEXTURE_PREFIX: &str = "USDA texture classification: ";
const USDA_MARKER: &str = "[USDA]";
const WRB_MARKER: &str = "[WRB]";

/// `soil_type` and `soil_texture_meth`.
pub(super) fn soil_composites(result: &DomainResult<Soil>, out: &mut SchemaMapping) {
    let text = |field| {
        result
            .observation(field)
            .and_then(|o| o.value.as_text().map(str::to_string))
    };

    let classifications: Vec<String> = [
        (SoilField::ClassificationUsda, USDA_MARKER),
        (SoilField::ClassificationWrb, WRB_MARKER),
    ]
    .into_iter()
    .filter_map(|(field, marker)| text(field).map(|name| format!("{} {}", name, marker)))
    .collect();

    if !classifications.is_empty() {
        out.insert(
            "soil_type".to_string(),
            json!({
                "has_raw_value": classifications.join(" / "),
                "type": TargetSchema::Nmdc.text_tag(),
            }),
        );
    }

    if let Some(texture) = text(SoilField::TextureClass) {
        out.insert(
            "soil_texture_meth".to_string(),
            Value::String(format!("{}{}", TEXTURE_PREFIX, texture)),
        );
    }
}

pub(super) fn soil_composite_sources(mapping: &SchemaMapping, fields: &mut BTreeSet<SoilField>) {
    if let Some(raw) = mapping
        .get("soil_type")
        .and_then(|v| v.get("has_raw_value"))
        .and_then(Value::as_str)
    {
        if raw.contains(USDA_MARKER) {
            fields.insert(SoilField::ClassificationUsda);
        }
        if raw.contains(WRB_MARKER) {
            fields.insert(SoilField::ClassificationWrb);
        }
    }

    let has_texture = mapping
        .get("soil_texture_meth")
        .and_then(Value::as_str)
        .is_some_and(|s| s.starts_with(TEXTURE_PREFIX));
    if has_texture {
        fields.insert(SoilField::TextureClass);
    }
}
