//! Vertical breaking: partitioning flowed content into pages.
//!
//! The page breaker consumes the already line-broken output of every
//! paragraph as a sequence of flow units — fixed-height lines, opaque blocks,
//! inter-paragraph gaps and float markers — grouped into consecutive-paragraph
//! runs separated by explicit page breaks. It accumulates height per page,
//! prefers breaking at inter-paragraph gaps over positions inside a
//! paragraph, avoids widows and orphans where an alternative break exists,
//! and flags rather than rejects content that cannot fit.

use crate::config::TypesetConfig;
use crate::float::FloatAnchor;
use crate::geom::{Position, Size};
use crate::page::{Element, ElementPayload, LayoutWarning, Page};

/// An element positioned within its flow unit, before the unit's page and
/// vertical offset are known. `dx` is absolute from the left page edge; `dy`
/// is relative to the unit's top.
#[derive(Clone, Debug, PartialEq)]
pub struct OffsetElement {
    /// Absolute horizontal position.
    pub dx: f64,
    /// Vertical offset inside the unit.
    pub dy: f64,
    /// Element extent.
    pub size: Size,
    /// What to render.
    pub payload: ElementPayload,
}

impl OffsetElement {
    fn place(&self, y: f64) -> Element {
        Element::new(
            Position::new(self.dx, y + self.dy),
            self.size,
            self.payload.clone(),
        )
    }
}

/// One vertical unit of flowed content, in source order.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowUnit {
    /// One line of a line-broken paragraph. Consecutive lines of the same
    /// paragraph form the group the widow/orphan rules apply to.
    Line {
        /// Source-order paragraph index.
        paragraph: usize,
        /// Zero-based line index within the paragraph.
        line: usize,
        /// Line height.
        height: f64,
        /// Adjustment ratio the line was accepted at.
        ratio: f64,
        /// Whether the line breaker accepted this line as degraded.
        degraded: bool,
        /// The line's elements.
        elements: Vec<OffsetElement>,
    },
    /// An unbreakable block (image, math, table).
    Block {
        /// Source-order paragraph index.
        paragraph: usize,
        /// Block height.
        height: f64,
        /// The block's elements.
        elements: Vec<OffsetElement>,
    },
    /// A float lifted out of flow, queued for a page edge.
    Float {
        /// Source-order paragraph index.
        paragraph: usize,
        /// Page edge to anchor to.
        anchor: FloatAnchor,
        /// Whether following text flows beside the float in narrowed lines;
        /// such a float is pinned at the cursor without advancing it.
        beside: bool,
        /// Float height, spacing included.
        height: f64,
        /// The float's elements.
        elements: Vec<OffsetElement>,
    },
    /// Inter-paragraph spacing; the preferred break position. Discarded at
    /// page boundaries.
    Gap {
        /// Gap height.
        height: f64,
    },
}

/// A float waiting for the next page.
#[derive(Clone, Debug)]
struct QueuedFloat {
    anchor: FloatAnchor,
    beside: bool,
    height: f64,
    elements: Vec<OffsetElement>,
}

/// Per-page placement cursor.
struct PageCursor<'a> {
    config: &'a TypesetConfig,
    pages: Vec<Page>,
    page: Page,
    /// Next content y.
    y: f64,
    /// Lower bound of the content area, reduced by bottom floats.
    bottom_limit: f64,
    /// Whether flowed content has landed on the current page.
    has_content: bool,
    deferred: Vec<QueuedFloat>,
}

impl<'a> PageCursor<'a> {
    fn new(config: &'a TypesetConfig) -> Self {
        let geometry = &config.page;
        Self {
            config,
            pages: Vec::new(),
            page: Page::new(1),
            y: geometry.insets.top,
            bottom_limit: geometry.content_bottom(),
            has_content: false,
            deferred: Vec::new(),
        }
    }

    fn available(&self) -> f64 {
        self.bottom_limit - self.y
    }

    /// Height still free on a page with no content or floats.
    fn fresh_capacity(&self) -> f64 {
        self.config.page.content_height()
    }

    fn place(&mut self, elements: &[OffsetElement], height: f64) {
        for element in elements {
            self.page.push_element(element.place(self.y));
        }
        self.y += height;
        self.has_content = true;
    }

    fn advance_gap(&mut self, height: f64) {
        if self.has_content {
            self.y = (self.y + height).min(self.bottom_limit);
        }
    }

    /// Anchor a float on the current page if possible, otherwise defer it.
    fn queue_float(
        &mut self,
        anchor: FloatAnchor,
        beside: bool,
        height: f64,
        elements: Vec<OffsetElement>,
    ) {
        if height > self.fresh_capacity() {
            self.force_oversized_float(height, elements);
            return;
        }
        if beside {
            // Text flows beside this float in narrowed lines; pin it at the
            // cursor without advancing.
            if height <= self.available() {
                let top = self.y;
                for element in &elements {
                    self.page.push_element(element.place(top));
                }
            } else {
                self.deferred.push(QueuedFloat {
                    anchor,
                    beside,
                    height,
                    elements,
                });
            }
            return;
        }
        match anchor {
            FloatAnchor::Top => {
                if !self.has_content && height <= self.available() {
                    let top = self.y;
                    for element in &elements {
                        self.page.push_element(element.place(top));
                    }
                    self.y += height;
                } else {
                    self.deferred.push(QueuedFloat {
                        anchor,
                        beside,
                        height,
                        elements,
                    });
                }
            }
            FloatAnchor::Bottom => {
                if height <= self.available() {
                    self.bottom_limit -= height;
                    let top = self.bottom_limit;
                    for element in &elements {
                        self.page.push_element(element.place(top));
                    }
                } else {
                    self.deferred.push(QueuedFloat {
                        anchor,
                        beside,
                        height,
                        elements,
                    });
                }
            }
        }
    }

    /// A float taller than the content area gets a page of its own, flagged.
    fn force_oversized_float(&mut self, height: f64, elements: Vec<OffsetElement>) {
        if self.has_content || !self.page.elements.is_empty() {
            self.break_page();
        }
        let top = self.y;
        for element in &elements {
            self.page.push_element(element.place(top));
        }
        self.page.push_warning(LayoutWarning::OverfullPage { height });
        log::warn!("float of height {height} exceeds the page content area");
        self.break_page();
    }

    /// Close the current page and open the next, landing deferred floats.
    fn break_page(&mut self) {
        let geometry = &self.config.page;
        let number = self.page.number;
        let finished = core::mem::replace(&mut self.page, Page::new(number + 1));
        self.pages.push(finished);
        self.y = geometry.insets.top;
        self.bottom_limit = geometry.content_bottom();
        self.has_content = false;

        let deferred = core::mem::take(&mut self.deferred);
        for float in deferred {
            self.queue_float(float.anchor, float.beside, float.height, float.elements);
        }
    }

    fn finish(mut self) -> Vec<Page> {
        while !self.deferred.is_empty() {
            self.break_page();
        }
        if self.pages.is_empty() || self.has_content || !self.page.elements.is_empty() {
            self.pages.push(self.page);
        }
        self.pages
    }
}

/// Assemble runs of flow units into pages.
///
/// Each run is separated from the next by an explicit page break.
pub fn assemble_pages(runs: &[Vec<FlowUnit>], config: &TypesetConfig) -> Vec<Page> {
    let mut cursor = PageCursor::new(config);

    for (run_index, run) in runs.iter().enumerate() {
        let mut index = 0;
        while index < run.len() {
            match &run[index] {
                FlowUnit::Gap { height } => {
                    cursor.advance_gap(*height);
                    index += 1;
                }
                FlowUnit::Float {
                    anchor,
                    beside,
                    height,
                    elements,
                    ..
                } => {
                    cursor.queue_float(*anchor, *beside, *height, elements.clone());
                    index += 1;
                }
                FlowUnit::Block {
                    height, elements, ..
                } => {
                    place_block(&mut cursor, *height, elements);
                    index += 1;
                }
                FlowUnit::Line { paragraph, .. } => {
                    let paragraph = *paragraph;
                    let end = run[index..]
                        .iter()
                        .take_while(|unit| {
                            matches!(unit, FlowUnit::Line { paragraph: p, .. } if *p == paragraph)
                        })
                        .count()
                        + index;
                    place_line_group(&mut cursor, &run[index..end], paragraph);
                    index = end;
                }
            }
        }
        if run_index + 1 < runs.len() {
            cursor.break_page();
        }
    }

    cursor.finish()
}

fn place_block(cursor: &mut PageCursor<'_>, height: f64, elements: &[OffsetElement]) {
    if height > cursor.available() {
        if cursor.has_content {
            cursor.break_page();
        }
        if height > cursor.available() {
            // Taller than a whole page: emit it alone and flag the page.
            cursor.place(elements, height);
            cursor
                .page
                .push_warning(LayoutWarning::OverfullPage { height });
            log::warn!("block of height {height} exceeds the page content area");
            cursor.break_page();
            return;
        }
    }
    cursor.place(elements, height);
}

fn unit_height(unit: &FlowUnit) -> f64 {
    match unit {
        FlowUnit::Line { height, .. }
        | FlowUnit::Block { height, .. }
        | FlowUnit::Float { height, .. }
        | FlowUnit::Gap { height } => *height,
    }
}

/// Number of leading lines from `group` that fit in `available` height.
fn fitting_lines(group: &[FlowUnit], available: f64) -> usize {
    let mut used = 0.0;
    let mut count = 0;
    for unit in group {
        used += unit_height(unit);
        if used > available + 1.0e-9 {
            break;
        }
        count += 1;
    }
    count
}

/// Place one paragraph's lines, applying the widow/orphan policy at page
/// boundaries.
fn place_line_group(cursor: &mut PageCursor<'_>, group: &[FlowUnit], paragraph: usize) {
    let control = cursor.config.vertical.widow_orphan;
    let min_lines = usize::from(control.min_lines.max(1));
    let total = group.len();
    let mut placed = 0;

    while placed < total {
        let remaining = total - placed;
        let capacity = fitting_lines(&group[placed..], cursor.available());

        if capacity >= remaining {
            place_lines(cursor, &group[placed..], paragraph);
            return;
        }

        let mut take = capacity;
        let mut degraded = false;
        if control.enabled {
            // Widow: keep at least `min_lines` for the following page.
            let leftover = remaining - take;
            if leftover < min_lines {
                take = take.saturating_sub(min_lines - leftover);
            }
            // Orphan: a paragraph must not open with fewer than `min_lines`
            // on the departing page; prefer the inter-paragraph break.
            if placed == 0 && take < min_lines {
                take = 0;
            }
        }

        if take == 0 {
            if cursor.has_content {
                cursor.break_page();
                continue;
            }
            // A fresh page still cannot satisfy the policy: accept the
            // degraded break rather than fail.
            take = capacity.min(remaining).max(1);
            degraded = true;
        }

        if degraded {
            cursor
                .page
                .push_warning(LayoutWarning::DegradedPageBreak { paragraph });
            log::warn!("accepting a degraded page break inside paragraph {paragraph}");
            if capacity == 0 {
                // Not even one line fits a fresh page.
                cursor
                    .page
                    .push_warning(LayoutWarning::OverfullPage {
                        height: unit_height(&group[placed]),
                    });
            }
        }

        place_lines(cursor, &group[placed..placed + take], paragraph);
        cursor.break_page();
        placed += take;
    }
}

fn place_lines(cursor: &mut PageCursor<'_>, lines: &[FlowUnit], paragraph: usize) {
    for unit in lines {
        if let FlowUnit::Line {
            line,
            height,
            ratio,
            degraded,
            elements,
            ..
        } = unit
        {
            if *degraded {
                cursor.page.push_warning(LayoutWarning::DegradedLine {
                    paragraph,
                    line: *line,
                    ratio: *ratio,
                });
            }
            cursor.place(elements, *height);
        }
    }
}
