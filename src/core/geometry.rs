use serde::{Deserialize, Serialize};

/// Smallest width used as a divisor when computing aspect ratios.
pub const ASPECT_EPSILON: f64 = 1e-6;

/// Pixel-aligned bounding box of a connected component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BBox {
    pub top: u32,
    pub left: u32,
    pub height: u32,
    pub width: u32,
}

impl BBox {
    pub fn new(top: u32, left: u32, height: u32, width: u32) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    /// Builds a box from inclusive pixel extents.
    pub fn from_extent(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            top: min_y,
            left: min_x,
            height: max_y.saturating_sub(min_y) + 1,
            width: max_x.saturating_sub(min_x) + 1,
        }
    }

    pub fn area(&self) -> u64 {
        self.height as u64 * self.width as u64
    }

    /// Height over width, with the width clamped away from zero.
    pub fn aspect_ratio(&self) -> f64 {
        self.height as f64 / (self.width as f64).max(ASPECT_EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_from_inclusive_extent() {
        let bbox = BBox::from_extent(3, 5, 7, 5);
        assert_eq!(bbox, BBox::new(5, 3, 1, 5));
        assert_eq!(bbox.area(), 5);
    }

    #[test]
    fn aspect_ratio_is_height_over_width() {
        assert_eq!(BBox::new(0, 0, 20, 10).aspect_ratio(), 2.0);
        let degenerate = BBox::new(0, 0, 4, 0);
        assert!(degenerate.aspect_ratio().is_finite());
    }
}
