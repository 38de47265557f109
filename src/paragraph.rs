//! Paragraph streams and the paragraph kind model.
//!
//! A paragraph is the unit handed to the line breaker: an ordered item stream,
//! a per-line width function, and a kind tag. Non-text kinds carry their
//! pre-measured payloads instead of items. Paragraphs are produced by the
//! external document converter and consumed once broken.

use serde::{Deserialize, Serialize};

use crate::float::FloatAnchor;
use crate::geom::Size;
use crate::item::{Glue, Item, MathInline, Penalty, TextRun};

/// Horizontal alignment of a paragraph's lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Stretch/shrink glue so every full line exactly fills its target width.
    #[default]
    Justified,
    /// Ragged right.
    Left,
    /// Centered.
    Center,
    /// Ragged left.
    Right,
}

/// Vertical spacing around a paragraph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockSpacing {
    /// Space before the first line or block.
    pub before: f64,
    /// Space after the last line or block.
    pub after: f64,
}

impl BlockSpacing {
    /// Build a spacing pair.
    pub fn new(before: f64, after: f64) -> Self {
        Self { before, after }
    }
}

/// Width and left indent of one leading line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineConstraint {
    /// Target width of the line.
    pub width: f64,
    /// Extra left offset of the line inside the content area.
    pub indent: f64,
}

/// Per-line target widths for a paragraph.
///
/// Index-addressed rather than a closure so paragraphs stay `Send` and can be
/// broken on worker threads. Line indices are zero-based: the first
/// `leading.len()` lines use their explicit constraint, every later line the
/// default width at zero indent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineWidths {
    default: f64,
    leading: Vec<LineConstraint>,
}

impl LineWidths {
    /// Every line gets the same target width.
    pub fn constant(width: f64) -> Self {
        Self {
            default: width,
            leading: Vec::new(),
        }
    }

    /// Explicit constraints for the leading lines, the default width after.
    pub fn with_leading(default: f64, leading: Vec<LineConstraint>) -> Self {
        Self { default, leading }
    }

    /// Target width for the given zero-based line index.
    pub fn width_for(&self, line: usize) -> f64 {
        self.leading.get(line).map_or(self.default, |c| c.width)
    }

    /// Left indent for the given zero-based line index.
    pub fn indent_for(&self, line: usize) -> f64 {
        self.leading.get(line).map_or(0.0, |c| c.indent)
    }

    /// Width of lines beyond the explicit leading constraints.
    pub fn default_width(&self) -> f64 {
        self.default
    }

    /// Narrow the first `lines` lines by `by` points, indenting them by
    /// `indent_by`, e.g. to flow text beside a side-anchored float.
    pub fn narrow_leading(&mut self, lines: usize, by: f64, indent_by: f64) {
        if lines == 0 || by <= 0.0 {
            return;
        }
        if self.leading.len() < lines {
            let default = self.default;
            self.leading.resize(
                lines,
                LineConstraint {
                    width: default,
                    indent: 0.0,
                },
            );
        }
        for constraint in self.leading.iter_mut().take(lines) {
            constraint.width = (constraint.width - by).max(0.0);
            constraint.indent += indent_by;
        }
    }
}

/// Pre-measured image payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    /// Source reference resolved by the exporter.
    pub source: String,
    /// Measured display size.
    pub size: Size,
    /// Optional measured caption run rendered below the image.
    pub caption: Option<TextRun>,
}

/// Pre-typeset display math payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MathBlock {
    /// The measured expression.
    pub expression: MathInline,
}

/// Pre-laid-out table payload. Cell layout happens externally; the engine only
/// needs the grid extents to place and page-break around the block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Column widths, left to right.
    pub column_widths: Vec<f64>,
    /// Row heights, top to bottom.
    pub row_heights: Vec<f64>,
}

impl TableSpec {
    /// Total grid size.
    pub fn size(&self) -> Size {
        Size::new(
            self.column_widths.iter().sum(),
            self.row_heights.iter().sum(),
        )
    }
}

/// Pre-formatted code listing payload. Lines are never re-broken; the page
/// breaker may split the listing between lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// One measured run per source line.
    pub lines: Vec<TextRun>,
    /// Uniform height of each listing line.
    pub line_height: f64,
}

/// Leader fill between a table-of-contents title and its page label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaderStyle {
    /// No leader.
    None,
    /// A solid rule.
    Solid,
    /// A dotted rule.
    #[default]
    Dotted,
}

/// Payload of a table-of-contents entry paragraph.
///
/// The title itself arrives as the paragraph's item stream; the page label is
/// set flush right with a leader filling the gap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TocEntryBlock {
    /// Measured page-number label.
    pub page_label: TextRun,
    /// Reserved width for the page label at the right edge.
    pub page_label_width: f64,
    /// Leader fill between title and label.
    pub leader: LeaderStyle,
    /// Leader rule thickness.
    pub leader_thickness: f64,
}

/// Closed set of paragraph kinds with their payloads.
///
/// `Text` and `TocEntry` carry item streams and go through the line breaker;
/// the block kinds are placed whole by the page breaker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParagraphKind {
    /// Ordinary line-broken text.
    Text,
    /// A table-of-contents entry: line-broken title plus leader and label.
    TocEntry(TocEntryBlock),
    /// An image block.
    Image(ImageBlock),
    /// A display math block.
    Math(MathBlock),
    /// A table block.
    Table(TableSpec),
    /// A code listing.
    Code(CodeBlock),
    /// An explicit page break separating consecutive-paragraph runs.
    PageBreak,
}

/// Discriminant-only view of [`ParagraphKind`], used as a registry key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParagraphKindTag {
    /// Line-broken text.
    Text,
    /// Table-of-contents entry.
    TocEntry,
    /// Image block.
    Image,
    /// Display math block.
    Math,
    /// Table block.
    Table,
    /// Code listing.
    Code,
    /// Explicit page break.
    PageBreak,
}

impl ParagraphKind {
    /// The registry key for this kind.
    pub fn tag(&self) -> ParagraphKindTag {
        match self {
            Self::Text => ParagraphKindTag::Text,
            Self::TocEntry(_) => ParagraphKindTag::TocEntry,
            Self::Image(_) => ParagraphKindTag::Image,
            Self::Math(_) => ParagraphKindTag::Math,
            Self::Table(_) => ParagraphKindTag::Table,
            Self::Code(_) => ParagraphKindTag::Code,
            Self::PageBreak => ParagraphKindTag::PageBreak,
        }
    }
}

impl ParagraphKindTag {
    /// Stable lowercase name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::TocEntry => "toc-entry",
            Self::Image => "image",
            Self::Math => "math",
            Self::Table => "table",
            Self::Code => "code",
            Self::PageBreak => "page-break",
        }
    }
}

/// One semantic paragraph, ready for breaking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    kind: ParagraphKind,
    items: Vec<Item>,
    line_widths: LineWidths,
    alignment: Alignment,
    float_anchor: Option<FloatAnchor>,
    line_height: f64,
    spacing: BlockSpacing,
}

impl Paragraph {
    /// Start building a line-broken text paragraph.
    pub fn text(line_width: f64, line_height: f64) -> ParagraphBuilder {
        ParagraphBuilder::new(ParagraphKind::Text, line_width, line_height)
    }

    /// Start building a table-of-contents entry paragraph. The item stream
    /// holds the measured title; the entry payload holds the page label.
    pub fn toc_entry(line_width: f64, line_height: f64, entry: TocEntryBlock) -> ParagraphBuilder {
        ParagraphBuilder::new(ParagraphKind::TocEntry(entry), line_width, line_height)
    }

    /// Build a block paragraph (image, math, table or code) without items.
    pub fn block(kind: ParagraphKind, line_width: f64) -> Self {
        Self {
            kind,
            items: Vec::new(),
            line_widths: LineWidths::constant(line_width),
            alignment: Alignment::Left,
            float_anchor: None,
            line_height: 0.0,
            spacing: BlockSpacing::default(),
        }
    }

    /// An explicit page break marker.
    pub fn page_break() -> Self {
        Self::block(ParagraphKind::PageBreak, 0.0)
    }

    /// The paragraph kind and payload.
    pub fn kind(&self) -> &ParagraphKind {
        &self.kind
    }

    /// The ordered item stream. Empty for block kinds.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The per-line width function.
    pub fn line_widths(&self) -> &LineWidths {
        &self.line_widths
    }

    /// Mutable access for the float pre-pass width narrowing.
    pub(crate) fn line_widths_mut(&mut self) -> &mut LineWidths {
        &mut self.line_widths
    }

    /// Horizontal alignment.
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Set the alignment of a block paragraph.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Mark a block paragraph as floating with the given page anchor.
    pub fn with_float_anchor(mut self, anchor: FloatAnchor) -> Self {
        self.float_anchor = Some(anchor);
        self
    }

    /// Set the vertical spacing of a block paragraph.
    pub fn with_spacing(mut self, spacing: BlockSpacing) -> Self {
        self.spacing = spacing;
        self
    }

    /// Whether this paragraph floats outside normal flow.
    pub fn is_floating(&self) -> bool {
        self.float_anchor.is_some()
    }

    /// The float anchor, if floating.
    pub fn float_anchor(&self) -> Option<FloatAnchor> {
        self.float_anchor
    }

    /// Line height of the paragraph's lines.
    pub fn line_height(&self) -> f64 {
        self.line_height
    }

    /// Vertical spacing around the paragraph.
    pub fn spacing(&self) -> BlockSpacing {
        self.spacing
    }

    /// Whether this kind goes through the line breaker.
    pub fn is_line_broken(&self) -> bool {
        matches!(self.kind, ParagraphKind::Text | ParagraphKind::TocEntry(_))
    }

    /// Measured height of a block kind, zero for line-broken kinds.
    pub fn block_height(&self) -> f64 {
        match &self.kind {
            ParagraphKind::Text | ParagraphKind::TocEntry(_) | ParagraphKind::PageBreak => 0.0,
            ParagraphKind::Image(image) => {
                let caption = if image.caption.is_some() {
                    self.line_height.max(12.0)
                } else {
                    0.0
                };
                image.size.height + caption
            }
            ParagraphKind::Math(math) => math.expression.size.height,
            ParagraphKind::Table(table) => table.size().height,
            ParagraphKind::Code(code) => code.lines.len() as f64 * code.line_height,
        }
    }

    /// Whether the item stream ends with a forced break.
    pub fn has_trailing_forced_break(&self) -> bool {
        self.items.last().is_some_and(Item::is_forced_break)
    }
}

/// Builder for line-broken paragraphs.
///
/// `finish` appends the closing sequence — zero-width infinitely stretchable
/// glue followed by a forced penalty — unless the stream already ends in a
/// forced break, guaranteeing the breakpoint search terminates.
#[derive(Debug)]
pub struct ParagraphBuilder {
    paragraph: Paragraph,
}

impl ParagraphBuilder {
    fn new(kind: ParagraphKind, line_width: f64, line_height: f64) -> Self {
        Self {
            paragraph: Paragraph {
                kind,
                items: Vec::new(),
                line_widths: LineWidths::constant(line_width),
                alignment: Alignment::Justified,
                float_anchor: None,
                line_height,
                spacing: BlockSpacing::default(),
            },
        }
    }

    /// Append one item.
    pub fn item(mut self, item: Item) -> Self {
        self.paragraph.items.push(item);
        self
    }

    /// Append all items from an iterator.
    pub fn items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.paragraph.items.extend(items);
        self
    }

    /// Replace the per-line width function.
    pub fn line_widths(mut self, widths: LineWidths) -> Self {
        self.paragraph.line_widths = widths;
        self
    }

    /// Set the alignment.
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.paragraph.alignment = alignment;
        self
    }

    /// Set the vertical spacing.
    pub fn spacing(mut self, spacing: BlockSpacing) -> Self {
        self.paragraph.spacing = spacing;
        self
    }

    /// Close the paragraph, appending the trailing forced break if missing.
    pub fn finish(mut self) -> Paragraph {
        if !self.paragraph.has_trailing_forced_break() {
            self.paragraph.items.push(Item::Glue(Glue::filling()));
            self.paragraph.items.push(Item::Penalty(Penalty::forced()));
        }
        self.paragraph
    }
}
