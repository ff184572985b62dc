//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

/// An axis-aligned box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

/// Regions covered by the US soil survey: contiguous US, Alaska, Hawaii.
pub const US_SOIL_SURVEY_REGIONS: [BoundingBox; 3] = [
    BoundingBox::new(24.0, -125.0, 50.0, -66.0),
    BoundingBox::new(60.0, -180.0, 72.0, -140.0),
    BoundingBox::new(18.0, -161.0, 23.0, -154.0),
];

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains(&self, point: &Coordinates) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }

    /// Check if any box in `regions` contains the point.
    pub fn any_contains(regions: &[BoundingBox], point: &Coordinates) -> bool {
        regions.iter().any(|r| r.contains(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_regions() {
        let iowa = Coordinates::new(42.0, -93.5).unwrap();
        let fairbanks = Coordinates::new(64.8, -147.7).unwrap();
        let honolulu = Coordinates::new(21.3, -157.8).unwrap();
        let paris = Coordinates::new(48.85, 2.35).unwrap();

        assert!(BoundingBox::any_contains(&US_SOIL_SURVEY_REGIONS, &iowa));
        assert!(BoundingBox::any_contains(&US_SOIL_SURVEY_REGIONS, &fairbanks));
        assert!(BoundingBox::any_contains(&US_SOIL_SURVEY_REGIONS, &honolulu));
        assert!(!BoundingBox::any_contains(&US_SOIL_SURVEY_REGIONS, &paris));
    }

    #[test]
    fn test_edges_inclusive() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bbox.contains(&Coordinates::new(10.0, 0.0).unwrap()));
        assert!(!bbox.contains(&Coordinates::new(10.01, 0.0).unwrap()));
    }
}
