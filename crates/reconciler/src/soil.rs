//! USDA soil texture classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use enrich_common::{EnrichError, EnrichResult};

/// The twelve USDA texture classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureClass {
    Sand,
    #[serde(rename = "Loamy sand")]
    LoamySand,
    #[serde(rename = "Sandy loam")]
    SandyLoam,
    Loam,
    #[serde(rename = "Silt loam")]
    SiltLoam,
    Silt,
    #[serde(rename = "Sandy clay loam")]
    SandyClayLoam,
    #[serde(rename = "Clay loam")]
    ClayLoam,
    #[serde(rename = "Silty clay loam")]
    SiltyClayLoam,
    #[serde(rename = "Sandy clay")]
    SandyClay,
    #[serde(rename = "Silty clay")]
    SiltyClay,
    Clay,
}

impl TextureClass {
    pub const ALL: [TextureClass; 12] = [
        TextureClass::Sand,
        TextureClass::LoamySand,
        TextureClass::SandyLoam,
        TextureClass::Loam,
        TextureClass::SiltLoam,
        TextureClass::Silt,
        TextureClass::SandyClayLoam,
        TextureClass::ClayLoam,
        TextureClass::SiltyClayLoam,
        TextureClass::SandyClay,
        TextureClass::SiltyClay,
        TextureClass::Clay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextureClass::Sand => "Sand",
            TextureClass::LoamySand => "Loamy sand",
            TextureClass::SandyLoam => "Sandy loam",
            TextureClass::Loam => "Loam",
            TextureClass::SiltLoam => "Silt loam",
            TextureClass::Silt => "Silt",
            TextureClass::SandyClayLoam => "Sandy clay loam",
            TextureClass::ClayLoam => "Clay loam",
            TextureClass::SiltyClayLoam => "Silty clay loam",
            TextureClass::SandyClay => "Sandy clay",
            TextureClass::SiltyClay => "Silty clay",
            TextureClass::Clay => "Clay",
        }
    }
}

impl fmt::Display for TextureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextureClass {
    type Err = EnrichError;

    /// Case-insensitive match on the class name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TextureClass::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| EnrichError::InvalidTexture(format!("unknown texture class: {}", s)))
    }
}

/// Classify a soil sample on the USDA texture triangle.
///
/// Percentages must each lie in [0, 100] and sum to within 95..=105; they are
/// normalized to 100 before the rules are applied.
pub fn classify_texture(sand_pct: f64, silt_pct: f64, clay_pct: f64) -> EnrichResult<TextureClass> {
    if [sand_pct, silt_pct, clay_pct]
        .iter()
        .any(|p| !p.is_finite() || *p < 0.0 || *p > 100.0)
    {
        return Err(EnrichError::InvalidTexture(
            "all percentages must be between 0 and 100".to_string(),
        ));
    }

    let total = sand_pct + silt_pct + clay_pct;
    if !(95.0..=105.0).contains(&total) {
        return Err(EnrichError::InvalidTexture(format!(
            "sand + silt + clay must sum to ~100%, got {}%",
            total
        )));
    }

    let factor = 100.0 / total;
    let sand = sand_pct * factor;
    let silt = silt_pct * factor;
    let clay = clay_pct * factor;

    let class = if clay >= 40.0 {
        if sand >= 45.0 {
            TextureClass::SandyClay
        } else if silt >= 40.0 {
            TextureClass::SiltyClay
        } else {
            TextureClass::Clay
        }
    } else if clay >= 27.0 {
        if sand >= 45.0 {
            TextureClass::SandyClayLoam
        } else if (28.0..50.0).contains(&silt) {
            TextureClass::ClayLoam
        } else {
            TextureClass::SiltyClayLoam
        }
    } else if clay >= 20.0 {
        if sand >= 45.0 {
            TextureClass::SandyClayLoam
        } else {
            TextureClass::ClayLoam
        }
    } else if silt >= 80.0 {
        TextureClass::Silt
    } else if silt >= 50.0 {
        TextureClass::SiltLoam
    } else if sand >= 85.0 {
        TextureClass::Sand
    } else if sand >= 70.0 {
        TextureClass::LoamySand
    } else if sand >= 50.0 {
        TextureClass::SandyLoam
    } else {
        TextureClass::Loam
    };

    Ok(class)
}
