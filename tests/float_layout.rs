//! Floating-placement suite: anchored figures and the text flowing beside.

use folio_typeset::{
    Alignment, BoxItem, ElementPayload, FloatAnchor, FlowDocument, Glue, ImageBlock, Insets, Item,
    LayoutWarning, Page, PageGeometry, Paragraph, ParagraphKind, Size, StyleId, TextRun,
    TypesetConfig, TypesetEngine,
};

fn config() -> TypesetConfig {
    // 260 x 200 content area inside 20pt insets.
    TypesetConfig {
        page: PageGeometry::new(Size::new(300.0, 240.0), Insets::uniform(20.0)),
        ..TypesetConfig::default()
    }
}

fn figure(width: f64, height: f64) -> Paragraph {
    Paragraph::block(
        ParagraphKind::Image(ImageBlock {
            source: "figure.png".to_string(),
            size: Size::new(width, height),
            caption: None,
        }),
        260.0,
    )
}

fn prose(words: usize) -> Paragraph {
    let items: Vec<Item> = (0..words)
        .flat_map(|i| {
            [
                Item::Box(BoxItem::text(
                    40.0,
                    TextRun::new(format!("word{i}"), StyleId(0)),
                )),
                Item::Glue(Glue::new(10.0, 6.0, 4.0).expect("valid glue")),
            ]
        })
        .collect();
    Paragraph::text(260.0, 14.0).items(items).finish()
}

fn typeset(paragraphs: Vec<Paragraph>) -> Vec<Page> {
    TypesetEngine::new(config())
        .typeset(FlowDocument::new(paragraphs))
        .expect("typesets")
}

fn first_text(page: &Page) -> &folio_typeset::Element {
    page.elements
        .iter()
        .find(|e| matches!(e.payload, ElementPayload::Text(_)))
        .expect("text element")
}

fn first_image(page: &Page) -> &folio_typeset::Element {
    page.elements
        .iter()
        .find(|e| matches!(e.payload, ElementPayload::Image { .. }))
        .expect("image element")
}

#[test]
fn left_float_pins_to_the_margin_and_text_flows_beside() {
    let pages = typeset(vec![
        figure(100.0, 70.0)
            .with_alignment(Alignment::Left)
            .with_float_anchor(FloatAnchor::Top),
        prose(12),
    ]);
    assert_eq!(pages.len(), 1);

    let image = first_image(&pages[0]);
    assert_eq!(image.position.x, 20.0);
    assert_eq!(image.position.y, 20.0);

    // The first text line starts beside the float, indented past it and its
    // gutter, at the same height.
    let text = first_text(&pages[0]);
    assert_eq!(text.position.x, 20.0 + 100.0 + 12.0);
    assert_eq!(text.position.y, 20.0);
}

#[test]
fn right_float_keeps_text_at_the_left_margin() {
    let pages = typeset(vec![
        figure(100.0, 70.0)
            .with_alignment(Alignment::Right)
            .with_float_anchor(FloatAnchor::Top),
        prose(12),
    ]);
    let image = first_image(&pages[0]);
    assert_eq!(image.position.x, 20.0 + 260.0 - 100.0);

    let text = first_text(&pages[0]);
    assert_eq!(text.position.x, 20.0);
}

#[test]
fn narrowed_lines_recover_their_full_width_past_the_float() {
    let pages = typeset(vec![
        figure(100.0, 70.0)
            .with_alignment(Alignment::Left)
            .with_float_anchor(FloatAnchor::Top),
        prose(30),
    ]);
    // 70pt of float over 14pt lines narrows five lines; the sixth returns to
    // the left margin.
    let sixth_line_y = 20.0 + 5.0 * 14.0;
    let full_width_line = pages[0]
        .elements
        .iter()
        .filter(|e| matches!(e.payload, ElementPayload::Text(_)))
        .find(|e| e.position.y >= sixth_line_y)
        .expect("a line past the float");
    assert_eq!(full_width_line.position.x, 20.0);
}

#[test]
fn bottom_float_reserves_the_page_bottom() {
    let pages = typeset(vec![
        figure(120.0, 60.0)
            .with_alignment(Alignment::Center)
            .with_float_anchor(FloatAnchor::Bottom),
        prose(8),
    ]);
    assert_eq!(pages.len(), 1);

    let image = first_image(&pages[0]);
    assert_eq!(image.position.x, 20.0 + (260.0 - 120.0) / 2.0);
    assert_eq!(image.position.y, 20.0 + 200.0 - 60.0);

    // Flowed text still starts at the top inset.
    assert_eq!(first_text(&pages[0]).position.y, 20.0);
}

#[test]
fn source_order_of_non_floating_content_is_preserved() {
    let pages = typeset(vec![
        prose(4),
        figure(100.0, 40.0)
            .with_alignment(Alignment::Left)
            .with_float_anchor(FloatAnchor::Top),
        prose(4),
    ]);
    // Both prose paragraphs land in source order; their lines keep ascending
    // y positions.
    let text_ys: Vec<f64> = pages[0]
        .elements
        .iter()
        .filter(|e| matches!(e.payload, ElementPayload::Text(_)))
        .map(|e| e.position.y)
        .collect();
    let mut sorted = text_ys.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
    assert_eq!(text_ys, sorted);
}

#[test]
fn oversized_float_gets_a_flagged_page_of_its_own() {
    let pages = typeset(vec![
        figure(200.0, 500.0)
            .with_alignment(Alignment::Center)
            .with_float_anchor(FloatAnchor::Top),
        prose(4),
    ]);
    assert_eq!(pages.len(), 2);
    assert!(pages[0]
        .warnings
        .iter()
        .any(|w| matches!(w, LayoutWarning::OverfullPage { .. })));
    assert!(pages[1]
        .elements
        .iter()
        .any(|e| matches!(e.payload, ElementPayload::Text(_))));
}
