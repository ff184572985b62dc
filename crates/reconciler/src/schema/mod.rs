//! Projection of merged results into target biosample schemas.
//!
//! Each target schema is a fixed table of rules, one per output key, naming
//! the source field, the output shape and where the unit comes from. A few
//! soil outputs combine several fields and are built next to the tables.

mod gold;
mod nmdc;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use enrich_common::EnrichError;

use crate::domain::{Domain, Marine, Soil, SoilField, Weather};
use crate::observation::Observation;
use crate::result::DomainResult;

/// Output of a schema mapping: target key to target value.
pub type SchemaMapping = Map<String, Value>;

/// Supported target schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSchema {
    /// National Microbiome Data Collaborative: nested quantity/text objects.
    Nmdc,
    /// Genomes OnLine Database: flat strings and numbers.
    Gold,
}

impl TargetSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSchema::Nmdc => "nmdc",
            TargetSchema::Gold => "gold",
        }
    }

    /// Type tag carried by quantity objects.
    pub fn quantity_tag(&self) -> &'static str {
        match self {
            TargetSchema::Nmdc => "nmdc:QuantityValue",
            TargetSchema::Gold => "gold:QuantityValue",
        }
    }

    /// Type tag carried by text objects.
    pub fn text_tag(&self) -> &'static str {
        match self {
            TargetSchema::Nmdc => "nmdc:TextValue",
            TargetSchema::Gold => "gold:TextValue",
        }
    }
}

impl fmt::Display for TargetSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetSchema {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nmdc" => Ok(TargetSchema::Nmdc),
            "gold" => Ok(TargetSchema::Gold),
            _ => Err(EnrichError::UnsupportedSchema(s.to_string())),
        }
    }
}

/// Value nesting of one output key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `{has_numeric_value, has_unit, type}`.
    QuantityWithUnit,
    /// Quantity plus `<key>_min` / `<key>_max` when the value is an aggregate.
    QuantityWithRange,
    /// `{has_raw_value, type}` holding "<value> <unit>".
    Text,
    /// `"<value> <unit>"`.
    FlatString,
    /// Bare number.
    Number,
}

/// Numeric transform applied before shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    /// Non-negative magnitude, e.g. water depth from signed bathymetry.
    Absolute,
}

/// Where the emitted unit string comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRule {
    /// The observation's own unit.
    Passthrough,
    Fixed(&'static str),
}

/// One `(source field, output key, shape, unit)` row of a schema table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule<F> {
    pub source: F,
    pub output_key: &'static str,
    pub shape: Shape,
    pub transform: Transform,
    pub unit: UnitRule,
}

impl<F> FieldRule<F> {
    pub const fn new(source: F, output_key: &'static str, shape: Shape) -> Self {
        Self {
            source,
            output_key,
            shape,
            transform: Transform::Identity,
            unit: UnitRule::Passthrough,
        }
    }

    pub const fn absolute(mut self) -> Self {
        self.transform = Transform::Absolute;
        self
    }

    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = UnitRule::Fixed(unit);
        self
    }
}

/// Apply a single rule to an observation.
fn emit<T>(rule: &FieldRule<impl Copy>, observation: &Observation<T>, schema: TargetSchema, out: &mut SchemaMapping) {
    let unit = match rule.unit {
        UnitRule::Passthrough => observation.unit.as_str(),
        UnitRule::Fixed(u) => u,
    };
    let number = observation.value.as_number().map(|v| match rule.transform {
        Transform::Identity => v,
        Transform::Absolute => v.abs(),
    });

    let value = match rule.shape {
        Shape::QuantityWithUnit | Shape::QuantityWithRange => {
            let Some(v) = number else { return };
            let mut quantity = json!({
                "has_numeric_value": v,
                "has_unit": unit,
                "type": schema.quantity_tag(),
            });
            if rule.shape == Shape::QuantityWithRange {
                if let Some(agg) = observation.value.as_aggregate() {
                    if let Some(obj) = quantity.as_object_mut() {
                        if let Some(min) = agg.min {
                            obj.insert(format!("{}_min", rule.output_key), json!(min));
                        }
                        if let Some(max) = agg.max {
                            obj.insert(format!("{}_max", rule.output_key), json!(max));
                        }
                    }
                }
            }
            quantity
        }
        Shape::Text => {
            let raw = match number {
                Some(v) => format!("{} {}", v, unit),
                None => observation.value.to_string(),
            };
            json!({ "has_raw_value": raw, "type": schema.text_tag() })
        }
        Shape::FlatString => {
            let Some(v) = number else { return };
            Value::String(format!("{} {}", v, unit))
        }
        Shape::Number => {
            let Some(v) = number else { return };
            json!(v)
        }
    };

    out.insert(rule.output_key.to_string(), value);
}

/// Apply a rule table to a result's shallowest observations.
pub fn apply_rules<D: Domain>(
    rules: &[FieldRule<D::Field>],
    result: &DomainResult<D>,
    schema: TargetSchema,
) -> SchemaMapping {
    let mut out = SchemaMapping::new();
    for rule in rules {
        if let Some(observation) = result.observation(rule.source) {
            emit(rule, observation, schema, &mut out);
        }
    }
    out
}

/// Source fields whose output keys appear in `mapping`.
pub fn fields_present<F: Copy + Ord>(rules: &[FieldRule<F>], mapping: &SchemaMapping) -> BTreeSet<F> {
    rules
        .iter()
        .filter(|r| mapping.contains_key(r.output_key))
        .map(|r| r.source)
        .collect()
}

/// Schema projection for a domain.
pub trait SchemaMapper: Domain {
    /// The rule table for a schema.
    fn rules(schema: TargetSchema) -> &'static [FieldRule<Self::Field>];

    /// Project a merged result. Empty slots produce no keys.
    fn map_result(result: &DomainResult<Self>, schema: TargetSchema) -> SchemaMapping {
        apply_rules(Self::rules(schema), result, schema)
    }

    /// Source fields a mapping was produced from. Never reports a field
    /// whose output keys are absent.
    fn unmap(mapping: &SchemaMapping, schema: TargetSchema) -> BTreeSet<Self::Field> {
        fields_present(Self::rules(schema), mapping)
    }
}

impl SchemaMapper for Weather {
    fn rules(schema: TargetSchema) -> &'static [FieldRule<Self::Field>] {
        match schema {
            TargetSchema::Nmdc => nmdc::WEATHER,
            TargetSchema::Gold => gold::WEATHER,
        }
    }
}

impl SchemaMapper for Marine {
    fn rules(schema: TargetSchema) -> &'static [FieldRule<Self::Field>] {
        match schema {
            TargetSchema::Nmdc => nmdc::MARINE,
            TargetSchema::Gold => gold::MARINE,
        }
    }
}

impl SchemaMapper for Soil {
    fn rules(schema: TargetSchema) -> &'static [FieldRule<Self::Field>] {
        match schema {
            TargetSchema::Nmdc => nmdc::SOIL,
            TargetSchema::Gold => gold::SOIL,
        }
    }

    fn map_result(result: &DomainResult<Self>, schema: TargetSchema) -> SchemaMapping {
        let mut out = apply_rules(Self::rules(schema), result, schema);
        match schema {
            TargetSchema::Nmdc => nmdc::soil_composites(result, &mut out),
            TargetSchema::Gold => gold::soil_composites(result, &mut out),
        }
        out
    }

    fn unmap(mapping: &SchemaMapping, schema: TargetSchema) -> BTreeSet<SoilField> {
        let mut fields = fields_present(Self::rules(schema), mapping);
        match schema {
            TargetSchema::Nmdc => nmdc::soil_composite_sources(mapping, &mut fields),
            TargetSchema::Gold => gold::soil_composite_sources(mapping, &mut fields),
        }
        fields
    }
}
