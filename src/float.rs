//! Floating-placement resolution.
//!
//! Floating paragraphs (typically figures) leave normal vertical flow and
//! anchor to a page edge instead. Resolution happens in two stages: a pre-pass
//! here extracts the floats and narrows the line widths of the text that will
//! flow beside a side-anchored float, so that per-paragraph line breaking
//! stays independent and parallelizable; the page breaker then drains the
//! planned floats onto pages without disturbing the order of the remaining
//! content.

use serde::{Deserialize, Serialize};

use crate::config::TypesetConfig;
use crate::paragraph::{Alignment, Paragraph};

/// Which page edge a float is pinned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatAnchor {
    /// Pinned under the top inset, above the page's flowed content.
    Top,
    /// Pinned above the bottom inset, below the page's flowed content.
    Bottom,
}

/// One float lifted out of normal flow.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedFloat {
    /// Source-order index of the floating paragraph.
    pub paragraph: usize,
    /// Page edge the float anchors to.
    pub anchor: FloatAnchor,
    /// Block width of the float.
    pub width: f64,
    /// Block height of the float, spacing included.
    pub height: f64,
    /// Horizontal placement, taken from the paragraph's alignment.
    pub alignment: Alignment,
}

impl PlannedFloat {
    /// Whether following text flows beside this float in narrowed lines
    /// instead of below it.
    pub fn is_beside(&self) -> bool {
        self.anchor == FloatAnchor::Top
            && matches!(self.alignment, Alignment::Left | Alignment::Right)
    }
}

/// The floats of one document, in source order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatPlan {
    floats: Vec<PlannedFloat>,
}

impl FloatPlan {
    /// The float originating at the given paragraph, if any.
    pub fn float_at(&self, paragraph: usize) -> Option<&PlannedFloat> {
        self.floats.iter().find(|f| f.paragraph == paragraph)
    }

    /// All planned floats in source order.
    pub fn floats(&self) -> &[PlannedFloat] {
        &self.floats
    }
}

/// Extract floats and narrow the line widths of adjacent text.
///
/// Side-anchored floats (left/right alignment) reserve a column: the next
/// line-broken paragraph has its leading lines narrowed by the float width
/// plus the configured gutter, for as many lines as the float is tall.
/// Center-aligned floats span the content width and narrow nothing.
pub fn plan_floats(paragraphs: &mut [Paragraph], config: &TypesetConfig) -> FloatPlan {
    let mut floats = Vec::new();

    for index in 0..paragraphs.len() {
        let Some(anchor) = paragraphs[index].float_anchor() else {
            continue;
        };
        let paragraph = &paragraphs[index];
        let spacing = paragraph.spacing();
        let width = block_width(paragraph);
        let height = paragraph.block_height() + spacing.before + spacing.after;
        let alignment = paragraph.alignment();
        floats.push(PlannedFloat {
            paragraph: index,
            anchor,
            width,
            height,
            alignment,
        });

        // Only a top-anchored side float has text flowing beside it; a
        // bottom-anchored or centered float displaces content vertically.
        if anchor == FloatAnchor::Top && matches!(alignment, Alignment::Left | Alignment::Right) {
            narrow_following_text(
                paragraphs,
                index,
                width + config.floats.gutter,
                height,
                alignment == Alignment::Left,
            );
        }
    }

    FloatPlan { floats }
}

/// Width a block paragraph occupies, bounded by its line width.
fn block_width(paragraph: &Paragraph) -> f64 {
    use crate::paragraph::ParagraphKind;
    let natural = match paragraph.kind() {
        ParagraphKind::Image(image) => image.size.width,
        ParagraphKind::Math(math) => math.expression.size.width,
        ParagraphKind::Table(table) => table.size().width,
        _ => paragraph.line_widths().default_width(),
    };
    natural.min(paragraph.line_widths().default_width())
}

fn narrow_following_text(
    paragraphs: &mut [Paragraph],
    float_index: usize,
    narrow_by: f64,
    float_height: f64,
    indent: bool,
) {
    for paragraph in paragraphs.iter_mut().skip(float_index + 1) {
        if !paragraph.is_line_broken() {
            continue;
        }
        let line_height = paragraph.line_height();
        if line_height <= 0.0 {
            return;
        }
        let affected = (float_height / line_height).ceil() as usize;
        let indent_by = if indent { narrow_by } else { 0.0 };
        paragraph
            .line_widths_mut()
            .narrow_leading(affected, narrow_by, indent_by);
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Size;
    use crate::item::{BoxItem, Item, StyleId, TextRun};
    use crate::paragraph::{ImageBlock, ParagraphKind};

    fn figure(width: f64, height: f64) -> Paragraph {
        Paragraph::block(
            ParagraphKind::Image(ImageBlock {
                source: "fig.png".to_string(),
                size: Size::new(width, height),
                caption: None,
            }),
            300.0,
        )
    }

    fn text_paragraph() -> Paragraph {
        Paragraph::text(300.0, 14.0)
            .item(Item::Box(BoxItem::text(
                50.0,
                TextRun::new("word", StyleId(0)),
            )))
            .finish()
    }

    #[test]
    fn side_float_narrows_following_text() {
        let mut paragraphs = vec![
            figure(100.0, 70.0)
                .with_alignment(Alignment::Left)
                .with_float_anchor(FloatAnchor::Top),
            text_paragraph(),
        ];
        let config = TypesetConfig::default();
        let plan = plan_floats(&mut paragraphs, &config);

        assert_eq!(plan.floats().len(), 1);
        let float = plan.float_at(0).expect("float recorded");
        assert_eq!(float.anchor, FloatAnchor::Top);
        assert_eq!(float.width, 100.0);

        // 70pt of float over 14pt lines narrows the first five lines by the
        // float width plus the 12pt default gutter.
        let widths = paragraphs[1].line_widths();
        assert_eq!(widths.width_for(0), 300.0 - 112.0);
        assert_eq!(widths.width_for(4), 300.0 - 112.0);
        assert_eq!(widths.width_for(5), 300.0);
        // A left float pushes the narrowed lines right by the same amount.
        assert_eq!(widths.indent_for(0), 112.0);
        assert_eq!(widths.indent_for(5), 0.0);
    }

    #[test]
    fn centered_float_keeps_text_width() {
        let mut paragraphs = vec![
            figure(120.0, 60.0)
                .with_alignment(Alignment::Center)
                .with_float_anchor(FloatAnchor::Bottom),
            text_paragraph(),
        ];
        let config = TypesetConfig::default();
        let plan = plan_floats(&mut paragraphs, &config);

        assert_eq!(plan.floats().len(), 1);
        assert_eq!(paragraphs[1].line_widths().width_for(0), 300.0);
    }

    #[test]
    fn non_floating_paragraphs_are_untouched() {
        let mut paragraphs = vec![figure(100.0, 50.0), text_paragraph()];
        let config = TypesetConfig::default();
        let plan = plan_floats(&mut paragraphs, &config);
        assert!(plan.floats().is_empty());
        assert_eq!(paragraphs[1].line_widths().width_for(0), 300.0);
    }
}
