//! Axis-aligned bounding boxes

use serde::{Deserialize, Serialize};

/// Axis-aligned box, inclusive on both ends
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

    /// Degenerate box seeded at a single point
    pub fn seeded(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Grow the box to include a point.
    pub fn extend(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut bbox = Self::seeded(x, y);
        for (x, y) in iter {
            bbox.extend(x, y);
        }
        Some(bbox)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Grow every side by a fraction of the box's own width (left, right)
    /// or height (top, bottom).
    pub fn padded(&self, frac_x: f64, frac_y: f64) -> Self {
        let pad_x = self.width() * frac_x;
        let pad_y = self.height() * frac_y;
        Self::new(
            self.min_x - pad_x,
            self.min_y - pad_y,
            self.max_x + pad_x,
            self.max_y + pad_y,
        )
    }

    /// Scale every coordinate by a constant factor.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.min_x * factor,
            self.min_y * factor,
            self.max_x * factor,
            self.max_y * factor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_degenerate() {
        let bbox = BoundingBox::seeded(3.0, 4.0);
        assert_eq!(bbox.width(), 0.0);
        assert_eq!(bbox.height(), 0.0);
    }

    #[test]
    fn test_extend() {
        let mut bbox = BoundingBox::seeded(10.0, 10.0);
        bbox.extend(50.0, 30.0);
        bbox.extend(20.0, 5.0);
        assert_eq!(bbox, BoundingBox::new(10.0, 5.0, 50.0, 30.0));
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.center(), (30.0, 17.5));
    }

    #[test]
    fn test_from_points() {
        assert!(BoundingBox::from_points(Vec::new()).is_none());
        let bbox = BoundingBox::from_points(vec![(1.0, 2.0), (-1.0, 5.0)]).unwrap();
        assert_eq!(bbox, BoundingBox::new(-1.0, 2.0, 1.0, 5.0));
    }

    #[test]
    fn test_padded() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0).padded(0.2, 0.4);
        assert_eq!(bbox, BoundingBox::new(-2.0, -4.0, 12.0, 14.0));
    }

    #[test]
    fn test_scaled() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0).scaled(10.0);
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
    }
}
