//! Scalar geometry shared across the layout pipeline.
//!
//! All values are in typographic points. These are plain value types; the
//! engine never interprets them beyond arithmetic.

use serde::{Deserialize, Serialize};

/// Width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Size {
    /// Build a new size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Absolute position on a page, origin at the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset from the left page edge.
    pub x: f64,
    /// Vertical offset from the top page edge.
    pub y: f64,
}

impl Position {
    /// Build a new position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Per-edge spacing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Insets {
    /// Top edge.
    pub top: f64,
    /// Right edge.
    pub right: f64,
    /// Bottom edge.
    pub bottom: f64,
    /// Left edge.
    pub left: f64,
}

impl Insets {
    /// Build insets from individual edges.
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Uniform insets on all four edges.
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }
}

/// Physical page size plus content insets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Full page size.
    pub size: Size,
    /// Margins around the content area.
    pub insets: Insets,
}

impl PageGeometry {
    /// Build a page geometry.
    pub fn new(size: Size, insets: Insets) -> Self {
        Self { size, insets }
    }

    /// Usable width between the left and right insets.
    pub fn content_width(&self) -> f64 {
        (self.size.width - self.insets.left - self.insets.right).max(0.0)
    }

    /// Usable height between the top and bottom insets.
    pub fn content_height(&self) -> f64 {
        (self.size.height - self.insets.top - self.insets.bottom).max(0.0)
    }

    /// Y coordinate of the bottom edge of the content area.
    pub fn content_bottom(&self) -> f64 {
        self.size.height - self.insets.bottom
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        // A4 in points with generous book margins.
        Self {
            size: Size::new(595.0, 842.0),
            insets: Insets::new(72.0, 70.0, 72.0, 70.0),
        }
    }
}
