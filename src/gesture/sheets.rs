//! Sheet decoders
//!
//! Sticky-note pads and control sheets print a 3 x 4 grid of identical
//! cells. The pen position at the start of a stroke decides which cell and
//! which button inside it was touched.

use serde::{Deserialize, Serialize};
use std::fmt;

const GRID_ORIGIN: (f64, f64) = (6.17, 5.425);
const CELL_SIZE: (f64, f64) = (26.27, 26.235);
const GRID_COLUMNS: u32 = 3;
const GRID_ROWS: u32 = 4;

const STICKY_BUTTON_MIN_X: f64 = 17.0;
const STICKY_BUTTON_SPLIT_Y: f64 = 9.075;
const STICKY_INPUT_MIN_Y: f64 = 17.375;

/// A position inside the sheet grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub col: u32,
    pub row: u32,
    /// Position relative to the cell's top-left corner (pen units)
    pub local: (f64, f64),
}

/// Locate `(x, y)` in the sheet grid. `None` outside of it.
pub fn locate(x: f64, y: f64) -> Option<GridCell> {
    let rel_x = x - GRID_ORIGIN.0;
    let rel_y = y - GRID_ORIGIN.1;
    if rel_x < 0.0 || rel_y < 0.0 {
        return None;
    }

    let col = (rel_x / CELL_SIZE.0).floor() as u32;
    let row = (rel_y / CELL_SIZE.1).floor() as u32;
    if col >= GRID_COLUMNS || row >= GRID_ROWS {
        return None;
    }

    Some(GridCell {
        col,
        row,
        local: (
            rel_x - col as f64 * CELL_SIZE.0,
            rel_y - row as f64 * CELL_SIZE.1,
        ),
    })
}

/// View layout commands printed on a control sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlCode {
    #[default]
    Default,
    SideBySide,
    Vertical,
    Hud,
    PauseVideo,
    ResumeVideo,
}

impl ControlCode {
    const ALL: [ControlCode; 6] = [
        ControlCode::Default,
        ControlCode::SideBySide,
        ControlCode::Vertical,
        ControlCode::Hud,
        ControlCode::PauseVideo,
        ControlCode::ResumeVideo,
    ];

    fn from_index(index: u32) -> Self {
        Self::ALL[index as usize % Self::ALL.len()]
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlCode::Default => "default",
            ControlCode::SideBySide => "side-by-side",
            ControlCode::Vertical => "vertical",
            ControlCode::Hud => "hud",
            ControlCode::PauseVideo => "pause-video",
            ControlCode::ResumeVideo => "resume-video",
        };
        f.write_str(name)
    }
}

/// Control command under `(x, y)`. Outside the grid is [`ControlCode::Default`].
pub fn decode_control(x: f64, y: f64) -> ControlCode {
    match locate(x, y) {
        Some(cell) => ControlCode::from_index(cell.row * GRID_COLUMNS + cell.col),
        None => {
            tracing::debug!("Control sheet touched outside the grid at ({:.1}, {:.1})", x, y);
            ControlCode::Default
        }
    }
}

/// Area of a sticky note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickyZone {
    /// Upper button: search the local library
    Top,
    /// Lower button: search online
    Bottom,
    /// Handwriting box
    Input,
}

/// Sticky-note zone under `(x, y)`, if any
pub fn decode_sticky(x: f64, y: f64) -> Option<StickyZone> {
    let cell = locate(x, y)?;
    let (lx, ly) = cell.local;

    if lx >= STICKY_BUTTON_MIN_X && ly <= STICKY_INPUT_MIN_Y {
        if ly < STICKY_BUTTON_SPLIT_Y {
            Some(StickyZone::Top)
        } else {
            Some(StickyZone::Bottom)
        }
    } else if ly >= STICKY_INPUT_MIN_Y {
        Some(StickyZone::Input)
    } else {
        None
    }
}
