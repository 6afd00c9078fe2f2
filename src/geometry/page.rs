//! Page Coordinate Conversion
//!
//! Dot coordinates arrive in pen units (one unit ≈ 2.371 mm on the printed
//! dot pattern). Two conversions are needed downstream: physical length for
//! the gesture size rules, and normalized [0, 1] document space for the
//! rendering layer.

use super::bounds::BoundingBox;
use serde::{Deserialize, Serialize};

/// Meters per pen unit
pub const PEN_UNIT_M: f64 = 0.002371;

/// Printed page width in pen units
pub const PAGE_WIDTH: f64 = 91.0;

/// Printed page height in pen units
pub const PAGE_HEIGHT: f64 = 118.0;

/// Calibration for `to_normalized`, x axis: `nx = NORM_X.0 + NORM_X.1 * x`
const NORM_X: (f64, f64) = (-0.004882, 0.0110093);

/// Calibration for `to_normalized`, y axis
const NORM_Y: (f64, f64) = (0.0013664, 0.0084734);

/// Convert a pen-unit position into normalized document coordinates.
#[inline]
pub fn to_normalized(x: f64, y: f64) -> (f64, f64) {
    (NORM_X.0 + NORM_X.1 * x, NORM_Y.0 + NORM_Y.1 * y)
}

/// Physical description of the printed page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Page width (pen units)
    pub width: f64,
    /// Page height (pen units)
    pub height: f64,
    /// Meters per pen unit
    pub pen_unit_m: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
            pen_unit_m: PEN_UNIT_M,
        }
    }
}

impl PageGeometry {
    /// Pen-unit length to meters
    #[inline]
    pub fn to_meters(&self, pen_units: f64) -> f64 {
        pen_units * self.pen_unit_m
    }

    /// Meters to pen-unit length
    #[inline]
    pub fn to_pen_units(&self, meters: f64) -> f64 {
        meters / self.pen_unit_m
    }

    /// Horizontal center of the page (pen units)
    #[inline]
    pub fn mid_x(&self) -> f64 {
        self.width * 0.5
    }

    /// Distance in meters from `x` to the nearest vertical page edge.
    pub fn edge_distance_m(&self, x: f64) -> f64 {
        self.to_meters(x.min(self.width - x))
    }

    /// Normalize a pen-unit box into document space.
    pub fn normalize_box(&self, bbox: &BoundingBox) -> BoundingBox {
        let (min_x, min_y) = to_normalized(bbox.min_x, bbox.min_y);
        let (max_x, max_y) = to_normalized(bbox.max_x, bbox.max_y);
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Clamp a box to the page rectangle.
    pub fn clamp_box(&self, bbox: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: bbox.min_x.clamp(0.0, self.width),
            min_y: bbox.min_y.clamp(0.0, self.height),
            max_x: bbox.max_x.clamp(0.0, self.width),
            max_y: bbox.max_y.clamp(0.0, self.height),
        }
    }
}
