//! Axis-aligned rectangles in frame pixel coordinates.

use serde::Deserialize;
use std::fmt;

/// Rectangle given by its top-left `(x1, y1)` and bottom-right `(x2, y2)` corners.
///
/// Detection boxes are never clamped to the frame, so coordinates may be negative
/// or exceed the frame size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }

    /// True when every corner coordinate is zero (an unset ROI).
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// True when `x1 < x2` and `y1 < y2`.
    pub fn is_well_formed(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Open-interval intersection test. Rectangles that only share an edge do
    /// not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x2 > other.x1 && self.x1 < other.x2 && self.y2 > other.y1 && self.y1 < other.y2
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}
