//! Page geometry
//!
//! Unit conversion between pen units, physical meters and normalized
//! document coordinates, plus bounding boxes for stroke windows.

pub mod bounds;
pub mod page;

pub use bounds::BoundingBox;
pub use page::{to_normalized, PageGeometry, PEN_UNIT_M};
