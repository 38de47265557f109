//! Page output IR: positioned elements plus layout warnings.
//!
//! Pages are backend-agnostic; the export subsystem walks the element list in
//! order and renders each payload. Degraded layout never aborts a run — it is
//! recorded on the affected page instead.

use serde::{Deserialize, Serialize};

use crate::geom::{Position, Size};
use crate::item::{MathInline, TextRun};
use crate::paragraph::{LeaderStyle, TableSpec};

/// Kind-specific payload of a positioned element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ElementPayload {
    /// A measured text run.
    Text(TextRun),
    /// An image reference.
    Image {
        /// Source reference resolved by the exporter.
        source: String,
    },
    /// A horizontal rule.
    Rule {
        /// Stroke thickness.
        thickness: f64,
        /// Solid or dotted stroke.
        style: LeaderStyle,
    },
    /// An inline or display math expression.
    Math(MathInline),
    /// A pre-laid-out table grid.
    Table(TableSpec),
}

/// One positioned visual element on a page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Absolute position of the top-left corner.
    pub position: Position,
    /// Extent of the element.
    pub size: Size,
    /// What to render.
    pub payload: ElementPayload,
}

impl Element {
    /// Build an element.
    pub fn new(position: Position, size: Size, payload: ElementPayload) -> Self {
        Self {
            position,
            size,
            payload,
        }
    }
}

/// Non-fatal layout imperfections attached to the page they affect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum LayoutWarning {
    /// A line was accepted outside the feasible ratio range because no
    /// feasible break existed at the loosest tolerance.
    DegradedLine {
        /// Source-order paragraph index.
        paragraph: usize,
        /// Zero-based line index within the paragraph.
        line: usize,
        /// The adjustment ratio the line was accepted at.
        ratio: f64,
    },
    /// A widow or orphan was accepted because no alternative break fit.
    DegradedPageBreak {
        /// Source-order paragraph index.
        paragraph: usize,
    },
    /// A single unbreakable unit exceeded the page content height and was
    /// placed alone on an oversized page.
    OverfullPage {
        /// Height of the offending unit.
        height: f64,
    },
}

/// One laid-out page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    /// Positioned elements in paint order.
    pub elements: Vec<Element>,
    /// Imperfections accepted while assembling this page.
    pub warnings: Vec<LayoutWarning>,
}

impl Page {
    /// Create an empty page.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            elements: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Append an element.
    pub fn push_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Record a layout warning.
    pub fn push_warning(&mut self, warning: LayoutWarning) {
        self.warnings.push(warning);
    }

    /// Whether the page carries any degraded-layout warning.
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}
