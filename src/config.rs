//! Configuration surface for a typesetting run.
//!
//! The weighting constants of the breakpoint search are configuration with
//! classical defaults, not magic numbers; product tuning happens here.

use serde::{Deserialize, Serialize};

use crate::geom::PageGeometry;

/// Knobs for the paragraph breakpoint search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Badness tolerances tried in order, each pass more permissive than the
    /// last. A line is feasible when `100 * |ratio|^3` does not exceed the
    /// pass tolerance.
    pub tolerances: Vec<f64>,
    /// Base cost added to every line before squaring.
    pub line_penalty: f64,
    /// Surcharge when two consecutive chosen breaks are both flagged
    /// (hyphen after hyphen).
    pub flagged_demerits: f64,
    /// Surcharge when adjacent lines differ by more than one fitness class.
    pub fitness_demerits: f64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            tolerances: vec![100.0, 200.0, 800.0],
            line_penalty: 10.0,
            flagged_demerits: 100.0,
            fitness_demerits: 100.0,
        }
    }
}

impl BreakerConfig {
    /// The most permissive configured tolerance.
    pub fn loosest_tolerance(&self) -> f64 {
        self.tolerances
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Widow/orphan policy for page breaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidowOrphanControl {
    /// Enable widow/orphan avoidance.
    pub enabled: bool,
    /// Keep at least this many paragraph lines on each side of a page break
    /// when an alternative break exists.
    pub min_lines: u8,
}

impl Default for WidowOrphanControl {
    fn default() -> Self {
        Self {
            enabled: true,
            min_lines: 2,
        }
    }
}

/// Vertical breaking policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerticalConfig {
    /// Widow/orphan avoidance policy.
    pub widow_orphan: WidowOrphanControl,
}

/// Floating-placement policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatConfig {
    /// Horizontal gap between a side-anchored float and the narrowed text.
    pub gutter: f64,
}

impl Default for FloatConfig {
    fn default() -> Self {
        Self { gutter: 12.0 }
    }
}

/// Complete configuration for a typesetting run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypesetConfig {
    /// Page size and content insets.
    pub page: PageGeometry,
    /// Paragraph breakpoint search knobs.
    pub breaker: BreakerConfig,
    /// Vertical breaking policy.
    pub vertical: VerticalConfig,
    /// Floating-placement policy.
    pub floats: FloatConfig,
    /// Worker threads for per-paragraph breaking. `0` uses the available
    /// parallelism; `1` forces the sequential path.
    pub workers: usize,
}

impl TypesetConfig {
    /// Configuration for a given page geometry with default policies.
    pub fn for_page(page: PageGeometry) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }
}
