//! Axis-aligned extents of regions and rasters.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in the units of whatever it bounds: degrees for
/// search regions, meters for UTM rasters and clip regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The inverted box: grows to exactly the first point included.
    pub fn empty() -> Self {
        Self::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Shared area, or `None` when the boxes only touch or are disjoint.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let overlap = BoundingBox::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        );
        (overlap.min_x < overlap.max_x && overlap.min_y < overlap.max_y).then_some(overlap)
    }

    /// Closed-interval containment.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_of_region_and_tile() {
        let tile = BoundingBox::new(500000.0, 4090200.0, 609800.0, 4200000.0);
        let region = BoundingBox::new(600000.0, 4150000.0, 650000.0, 4160000.0);

        assert_eq!(
            tile.intersection(&region),
            Some(BoundingBox::new(600000.0, 4150000.0, 609800.0, 4160000.0))
        );

        // Sharing only an edge is no overlap.
        let neighbour = BoundingBox::new(609800.0, 4090200.0, 719600.0, 4200000.0);
        assert_eq!(tile.intersection(&neighbour), None);
    }

    #[test]
    fn test_include_grows_empty_box() {
        let mut bbox = BoundingBox::empty();
        assert!(bbox.is_empty());

        bbox.include(3.0, -1.0);
        assert!(!bbox.is_empty());
        bbox.include(-2.0, 4.0);
        assert_eq!(bbox, BoundingBox::new(-2.0, -1.0, 3.0, 4.0));

        assert!(bbox.contains_point(3.0, 4.0));
        assert!(!bbox.contains_point(3.1, 0.0));
    }
}
