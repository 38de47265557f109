//! Behavioral regression suite for the paragraph breakpoint search.

use folio_typeset::{
    break_paragraph, BoxItem, BreakError, BreakerConfig, BrokenParagraph, Fitness, Glue, Item,
    Paragraph, ParagraphKind, Penalty, StyleId, TextRun,
};

fn word(width: f64, text: &str) -> Item {
    Item::Box(BoxItem::text(width, TextRun::new(text, StyleId(0))))
}

fn space() -> Item {
    Item::Glue(Glue::new(10.0, 6.0, 4.0).expect("valid glue"))
}

fn prose(words: usize, word_width: f64) -> Vec<Item> {
    (0..words)
        .flat_map(|i| [word(word_width, &format!("word{i}")), space()])
        .collect()
}

fn line_keys(broken: &BrokenParagraph) -> Vec<(usize, usize, f64, Fitness)> {
    broken
        .lines
        .iter()
        .map(|l| (l.start, l.break_at, l.ratio, l.fitness))
        .collect()
}

#[test]
fn exact_fill_produces_one_line_at_ratio_zero() {
    let para = Paragraph::text(110.0, 14.0)
        .items([word(50.0, "alpha"), space(), word(50.0, "beta")])
        .finish();
    let broken = break_paragraph(&para, &BreakerConfig::default()).expect("breaks");
    assert_eq!(broken.lines.len(), 1);
    assert_eq!(broken.lines[0].ratio, 0.0);
    assert!(broken.lines[0].is_last);
    assert!(!broken.is_degraded());
}

#[test]
fn non_degraded_lines_never_shrink_past_the_limit() {
    let para = Paragraph::text(140.0, 14.0).items(prose(24, 38.0)).finish();
    let broken = break_paragraph(&para, &BreakerConfig::default()).expect("breaks");
    assert!(broken.lines.len() > 1);
    for line in &broken.lines {
        if !line.degraded {
            assert!(line.ratio >= -1.0);
        }
    }
}

#[test]
fn identical_input_breaks_identically() {
    let para = Paragraph::text(160.0, 14.0).items(prose(18, 30.0)).finish();
    let config = BreakerConfig::default();
    let first = break_paragraph(&para, &config).expect("breaks");
    let second = break_paragraph(&para, &config).expect("breaks");
    assert_eq!(line_keys(&first), line_keys(&second));
    assert_eq!(first.total_demerits, second.total_demerits);
}

#[test]
fn every_paragraph_ends_at_its_forced_break() {
    for words in [1, 3, 7, 19] {
        let para = Paragraph::text(150.0, 14.0)
            .items(prose(words, 38.0))
            .finish();
        let broken = break_paragraph(&para, &BreakerConfig::default()).expect("breaks");
        let last = broken.lines.last().expect("at least one line");
        assert!(last.is_last);
        assert!(para.items()[last.break_at].is_forced_break());
    }
}

#[test]
fn relaxed_tolerance_never_increases_total_demerits() {
    let para = Paragraph::text(150.0, 14.0).items(prose(16, 39.0)).finish();
    let mut previous = f64::INFINITY;
    for tolerance in [150.0, 300.0, 600.0, 1200.0] {
        let broken = break_paragraph(
            &para,
            &BreakerConfig {
                tolerances: vec![tolerance],
                ..BreakerConfig::default()
            },
        )
        .expect("breaks");
        assert!(
            broken.total_demerits <= previous,
            "tolerance {tolerance} worsened the optimum"
        );
        previous = broken.total_demerits;
    }
}

#[test]
fn rigid_overfull_paragraph_degrades_deterministically() {
    // Natural width 110 against a 100pt target with 3pt of shrink: the
    // required ratio is about -3.33, past the overfull limit, and the only
    // ending is the trailing forced break. The result must be a single
    // degraded line, not an error.
    let para = Paragraph::text(100.0, 14.0)
        .items([
            word(50.0, "alpha"),
            Item::Glue(Glue::new(10.0, 5.0, 3.0).expect("valid glue")),
            word(50.0, "beta"),
        ])
        .finish();
    let first = break_paragraph(&para, &BreakerConfig::default()).expect("degrades");
    let second = break_paragraph(&para, &BreakerConfig::default()).expect("degrades");
    assert_eq!(first.lines.len(), 1);
    assert!(first.lines[0].degraded);
    assert!((first.lines[0].ratio - (-10.0 / 3.0)).abs() < 1e-9);
    assert_eq!(line_keys(&first), line_keys(&second));
}

#[test]
fn consecutive_flagged_breaks_add_exactly_one_surcharge() {
    let build = |flagged: bool| {
        let hyphen = || {
            Item::Penalty(
                Penalty::new(50.0, 8.0, flagged).with_replacement(TextRun::new("-", StyleId(0))),
            )
        };
        Paragraph::text(58.0, 14.0)
            .items([
                word(50.0, "frag"),
                hyphen(),
                word(50.0, "ment"),
                hyphen(),
                word(50.0, "ed"),
            ])
            .finish()
    };
    let config = BreakerConfig::default();
    let plain = break_paragraph(&build(false), &config).expect("breaks");
    let flagged = break_paragraph(&build(true), &config).expect("breaks");
    let cuts = |b: &BrokenParagraph| b.lines.iter().map(|l| l.break_at).collect::<Vec<_>>();
    assert_eq!(cuts(&plain), cuts(&flagged));
    assert!(flagged.total_demerits > plain.total_demerits);
    assert_eq!(
        flagged.total_demerits - plain.total_demerits,
        config.flagged_demerits
    );
}

#[test]
fn empty_tolerance_list_falls_back_to_a_sane_pass() {
    let para = Paragraph::text(160.0, 14.0).items(prose(8, 45.0)).finish();
    let broken = break_paragraph(
        &para,
        &BreakerConfig {
            tolerances: Vec::new(),
            ..BreakerConfig::default()
        },
    )
    .expect("breaks");
    assert!(!broken.lines.is_empty());
}

#[test]
fn item_stream_without_forced_break_is_rejected() {
    let para = Paragraph::block(ParagraphKind::Text, 120.0);
    assert_eq!(
        break_paragraph(&para, &BreakerConfig::default()),
        Err(BreakError::MissingTrailingForcedBreak)
    );
}
