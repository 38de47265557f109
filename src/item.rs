//! Measured paragraph content units: boxes, glue and penalties.
//!
//! Items arrive pre-measured from the document converter; the engine never
//! consults fonts or styles itself. A box has a fixed width, glue is blank
//! space that may stretch or shrink, and a penalty marks a potential break
//! point with an aesthetic cost.

use serde::{Deserialize, Serialize};

use crate::error::ItemError;
use crate::geom::Size;

/// Break costs at or below this value force a break.
pub const FORCED_BREAK: f64 = -1000.0;

/// Break costs at or above this value forbid a break.
pub const IMPOSSIBLE_BREAK: f64 = 1000.0;

/// Opaque handle to a resolved style owned by the external style layer.
///
/// The engine only threads it through to the emitted page elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleId(pub u32);

/// A measured run of text in a single resolved style.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content.
    pub text: String,
    /// Resolved style the external layer measured this run with.
    pub style: StyleId,
}

impl TextRun {
    /// Build a text run.
    pub fn new(text: impl Into<String>, style: StyleId) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// A pre-typeset inline math atom with its measured size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MathInline {
    /// Source expression, kept for the exporter.
    pub source: String,
    /// Measured size of the rendered expression.
    pub size: Size,
}

/// Renderable payload carried by a box item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InlineContent {
    /// A measured text run.
    Text(TextRun),
    /// A measured inline math expression.
    Math(MathInline),
}

/// Fixed-width, non-breakable content unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxItem {
    /// Measured width.
    pub width: f64,
    /// What to emit when the box is laid out.
    pub content: InlineContent,
}

impl BoxItem {
    /// Box holding a measured text run.
    pub fn text(width: f64, run: TextRun) -> Self {
        Self {
            width,
            content: InlineContent::Text(run),
        }
    }

    /// Box holding an inline math atom.
    pub fn math(math: MathInline) -> Self {
        Self {
            width: math.size.width,
            content: InlineContent::Math(math),
        }
    }
}

/// Variable-width blank space.
///
/// Fields are private: construction validates that both flexibilities are
/// non-negative, the only invariant this layer enforces.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Glue {
    width: f64,
    stretch: f64,
    shrink: f64,
}

impl Glue {
    /// Build glue with a natural width and stretch/shrink limits.
    pub fn new(width: f64, stretch: f64, shrink: f64) -> Result<Self, ItemError> {
        if stretch < 0.0 {
            return Err(ItemError::NegativeStretch(stretch));
        }
        if shrink < 0.0 {
            return Err(ItemError::NegativeShrink(shrink));
        }
        Ok(Self {
            width,
            stretch,
            shrink,
        })
    }

    /// Zero-width glue with infinite stretch, used to fill the last line of a
    /// paragraph.
    pub fn filling() -> Self {
        Self {
            width: 0.0,
            stretch: f64::INFINITY,
            shrink: 0.0,
        }
    }

    /// Natural width.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Stretchability limit.
    pub fn stretch(&self) -> f64 {
        self.stretch
    }

    /// Shrinkability limit.
    pub fn shrink(&self) -> f64 {
        self.shrink
    }

    /// Effective width under an adjustment ratio.
    ///
    /// Positive ratios consume stretchability, negative ratios shrinkability.
    pub fn width_under(&self, ratio: f64) -> f64 {
        if ratio >= 0.0 {
            if self.stretch.is_infinite() {
                // Infinite stretch absorbs slack without widening this glue.
                self.width
            } else {
                self.width + ratio * self.stretch
            }
        } else {
            self.width + ratio * self.shrink
        }
    }
}

/// A potential break point with an aesthetic cost.
///
/// Costs saturate at [`FORCED_BREAK`] (mandatory) and [`IMPOSSIBLE_BREAK`]
/// (forbidden); infinite inputs land on those classes naturally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    /// Aesthetic cost of breaking here.
    pub cost: f64,
    /// Width added to the line only when the break is taken.
    pub width: f64,
    /// Flagged penalties (hyphen-like) attract a surcharge when two are chosen
    /// in a row.
    pub flagged: bool,
    /// Visible text emitted when the break is taken (e.g. a hyphen).
    pub replacement: Option<TextRun>,
}

impl Penalty {
    /// Build a penalty break point.
    pub fn new(cost: f64, width: f64, flagged: bool) -> Self {
        Self {
            cost,
            width,
            flagged,
            replacement: None,
        }
    }

    /// Mandatory break, e.g. the end of a paragraph. Not flagged: a hyphen
    /// right before a paragraph end is no double hyphenation.
    pub fn forced() -> Self {
        Self::new(FORCED_BREAK, 0.0, false)
    }

    /// Attach the text emitted when this break is taken.
    pub fn with_replacement(mut self, run: TextRun) -> Self {
        self.replacement = Some(run);
        self
    }

    /// Whether a break here is mandatory.
    pub fn is_forced(&self) -> bool {
        self.cost <= FORCED_BREAK
    }

    /// Whether a break here is forbidden.
    pub fn is_impossible(&self) -> bool {
        self.cost >= IMPOSSIBLE_BREAK
    }
}

/// One measured unit of paragraph content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Item {
    /// Fixed-width content.
    Box(BoxItem),
    /// Flexible blank space.
    Glue(Glue),
    /// Potential break point.
    Penalty(Penalty),
}

impl Item {
    /// Natural width contributed when the item sits inside a line.
    ///
    /// A penalty contributes nothing unless chosen as the break.
    pub fn width(&self) -> f64 {
        match self {
            Self::Box(b) => b.width,
            Self::Glue(g) => g.width(),
            Self::Penalty(_) => 0.0,
        }
    }

    /// Width contributed when this item is chosen as the break point.
    pub fn width_if_broken(&self) -> f64 {
        match self {
            Self::Penalty(p) => p.width,
            _ => 0.0,
        }
    }

    /// Stretchability contributed to a line.
    pub fn stretch(&self) -> f64 {
        match self {
            Self::Glue(g) => g.stretch(),
            _ => 0.0,
        }
    }

    /// Shrinkability contributed to a line.
    pub fn shrink(&self) -> f64 {
        match self {
            Self::Glue(g) => g.shrink(),
            _ => 0.0,
        }
    }

    /// Effective width under an adjustment ratio.
    ///
    /// Boxes ignore the ratio; glue flexes; an unchosen penalty is invisible.
    pub fn width_under(&self, ratio: f64) -> f64 {
        match self {
            Self::Box(b) => b.width,
            Self::Glue(g) => g.width_under(ratio),
            Self::Penalty(_) => 0.0,
        }
    }

    /// Whether this item is a box.
    pub fn is_box(&self) -> bool {
        matches!(self, Self::Box(_))
    }

    /// Whether this item is glue.
    pub fn is_glue(&self) -> bool {
        matches!(self, Self::Glue(_))
    }

    /// The penalty, if this item is one.
    pub fn as_penalty(&self) -> Option<&Penalty> {
        match self {
            Self::Penalty(p) => Some(p),
            _ => None,
        }
    }

    /// Whether this item is a penalty that forces a break.
    pub fn is_forced_break(&self) -> bool {
        self.as_penalty().is_some_and(Penalty::is_forced)
    }

    /// Whether this item is a flagged penalty.
    pub fn is_flagged(&self) -> bool {
        self.as_penalty().is_some_and(|p| p.flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glue_rejects_negative_flexibility() {
        assert_eq!(
            Glue::new(10.0, -1.0, 0.0),
            Err(ItemError::NegativeStretch(-1.0))
        );
        assert_eq!(
            Glue::new(10.0, 0.0, -2.0),
            Err(ItemError::NegativeShrink(-2.0))
        );
        assert!(Glue::new(10.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn glue_width_under_ratio_flexes_both_ways() {
        let glue = Glue::new(10.0, 5.0, 3.0).unwrap();
        assert_eq!(glue.width_under(0.0), 10.0);
        assert_eq!(glue.width_under(1.0), 15.0);
        assert_eq!(glue.width_under(-1.0), 7.0);
        assert_eq!(glue.width_under(0.5), 12.5);
    }

    #[test]
    fn filling_glue_ignores_positive_ratio() {
        let glue = Glue::filling();
        assert_eq!(glue.width_under(3.0), 0.0);
    }

    #[test]
    fn box_ignores_ratio() {
        let item = Item::Box(BoxItem::text(42.0, TextRun::new("word", StyleId(0))));
        assert_eq!(item.width_under(2.0), 42.0);
        assert_eq!(item.width_under(-0.5), 42.0);
    }

    #[test]
    fn penalty_classes_saturate() {
        assert!(Penalty::new(f64::NEG_INFINITY, 0.0, false).is_forced());
        assert!(Penalty::new(FORCED_BREAK, 0.0, true).is_forced());
        assert!(Penalty::new(f64::INFINITY, 0.0, false).is_impossible());
        let hyphen = Penalty::new(50.0, 4.0, true);
        assert!(!hyphen.is_forced());
        assert!(!hyphen.is_impossible());
        assert_eq!(Item::Penalty(hyphen).width_if_broken(), 4.0);
    }
}
