//! Engine orchestration: paragraph handlers, parallel breaking, assembly.
//!
//! Per-paragraph line breaking is embarrassingly parallel — each paragraph
//! reads only its own items plus read-only configuration — so the engine fans
//! it out over worker threads and joins before page assembly, which is
//! strictly sequential because every page depends on the cumulative height of
//! everything before it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::config::TypesetConfig;
use crate::error::{ConfigurationError, TypesetError};
use crate::float::plan_floats;
use crate::geom::Size;
use crate::item::{InlineContent, Item};
use crate::linebreak::{break_paragraph, BrokenParagraph, Line};
use crate::page::{ElementPayload, LayoutWarning, Page};
use crate::pagebreak::{assemble_pages, FlowUnit, OffsetElement};
use crate::paragraph::{Alignment, LeaderStyle, Paragraph, ParagraphKind, ParagraphKindTag};

/// Gap between a table-of-contents title, its leader and the page label.
const TOC_LEADER_MARGIN: f64 = 5.0;

/// The converted document: paragraphs in source order, with explicit
/// page-break paragraphs separating consecutive runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    /// Paragraphs in source order.
    pub paragraphs: Vec<Paragraph>,
}

impl FlowDocument {
    /// Wrap a converted paragraph sequence.
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }
}

/// Runtime diagnostics mirrored from the warnings attached to pages.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum LayoutDiagnostic {
    /// A line was accepted outside the feasible ratio range.
    DegradedLine {
        /// Page the line landed on.
        page: usize,
        /// Source-order paragraph index.
        paragraph: usize,
        /// Zero-based line index within the paragraph.
        line: usize,
        /// The accepted adjustment ratio.
        ratio: f64,
    },
    /// A widow or orphan was accepted.
    DegradedPageBreak {
        /// Page the break landed on.
        page: usize,
        /// Source-order paragraph index.
        paragraph: usize,
    },
    /// An unbreakable unit overflowed the page content area.
    OverfullPage {
        /// The flagged page.
        page: usize,
        /// Height of the offending unit.
        height: f64,
    },
}

type DiagnosticCallback = Arc<Mutex<Box<dyn FnMut(LayoutDiagnostic) + Send + 'static>>>;

/// Everything a paragraph handler needs to flow one paragraph.
pub struct HandlerContext<'a> {
    /// Source-order paragraph index.
    pub index: usize,
    /// The paragraph being flowed.
    pub paragraph: &'a Paragraph,
    /// Line-breaker output for line-broken kinds.
    pub broken: Option<&'a BrokenParagraph>,
    /// Run configuration.
    pub config: &'a TypesetConfig,
}

/// Turns one paragraph into vertical flow units.
pub trait ParagraphHandler: Send + Sync {
    /// Produce the paragraph's flow units in order.
    fn flow(&self, ctx: &HandlerContext<'_>) -> Vec<FlowUnit>;
}

/// Explicit handler lookup, built once per engine and passed by reference —
/// no process-wide handler state.
pub struct HandlerRegistry {
    handlers: BTreeMap<ParagraphKindTag, Box<dyn ParagraphHandler>>,
}

impl core::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerRegistry {
    /// Registry covering every built-in paragraph kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            handlers: BTreeMap::new(),
        };
        registry.register(ParagraphKindTag::Text, Box::new(TextHandler));
        registry.register(ParagraphKindTag::TocEntry, Box::new(TocEntryHandler));
        registry.register(ParagraphKindTag::Image, Box::new(ImageHandler));
        registry.register(ParagraphKindTag::Math, Box::new(MathHandler));
        registry.register(ParagraphKindTag::Table, Box::new(TableHandler));
        registry.register(ParagraphKindTag::Code, Box::new(CodeHandler));
        registry
    }

    /// Install or replace the handler for a kind.
    pub fn register(&mut self, tag: ParagraphKindTag, handler: Box<dyn ParagraphHandler>) {
        self.handlers.insert(tag, handler);
    }

    /// Look up the handler for a kind.
    pub fn get(&self, tag: ParagraphKindTag) -> Option<&dyn ParagraphHandler> {
        self.handlers.get(&tag).map(Box::as_ref)
    }
}

/// The typesetting engine.
pub struct TypesetEngine {
    config: TypesetConfig,
    registry: HandlerRegistry,
    diagnostic_sink: Option<DiagnosticCallback>,
}

impl core::fmt::Debug for TypesetEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypesetEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("has_diagnostic_sink", &self.diagnostic_sink.is_some())
            .finish()
    }
}

impl TypesetEngine {
    /// Build an engine with the default handler registry.
    pub fn new(config: TypesetConfig) -> Self {
        Self {
            config,
            registry: HandlerRegistry::with_defaults(),
            diagnostic_sink: None,
        }
    }

    /// Replace the handler registry.
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Install a diagnostic callback mirroring every layout warning.
    pub fn with_diagnostic_sink<F>(mut self, sink: F) -> Self
    where
        F: FnMut(LayoutDiagnostic) + Send + 'static,
    {
        self.diagnostic_sink = Some(Arc::new(Mutex::new(Box::new(sink))));
        self
    }

    /// The engine configuration.
    pub fn config(&self) -> &TypesetConfig {
        &self.config
    }

    /// Typeset a converted document into pages.
    ///
    /// Never fails for layout reasons: degraded lines and overfull pages are
    /// flagged on the output instead. Errors indicate contract violations.
    pub fn typeset(&self, document: FlowDocument) -> Result<Vec<Page>, TypesetError> {
        if self.config.page.content_width() <= 0.0 || self.config.page.content_height() <= 0.0 {
            return Err(ConfigurationError::InvalidPageGeometry.into());
        }

        let mut paragraphs = document.paragraphs;
        let plan = plan_floats(&mut paragraphs, &self.config);
        let broken = self.break_all(&paragraphs)?;

        let mut runs: Vec<Vec<FlowUnit>> = Vec::new();
        let mut current: Vec<FlowUnit> = Vec::new();
        for (index, paragraph) in paragraphs.iter().enumerate() {
            if matches!(paragraph.kind(), ParagraphKind::PageBreak) {
                runs.push(core::mem::take(&mut current));
                continue;
            }
            let tag = paragraph.kind().tag();
            let handler =
                self.registry
                    .get(tag)
                    .ok_or(ConfigurationError::UnhandledParagraphKind {
                        kind: tag.name(),
                    })?;
            let ctx = HandlerContext {
                index,
                paragraph,
                broken: broken[index].as_ref(),
                config: &self.config,
            };
            let units = handler.flow(&ctx);

            if let Some(float) = plan.float_at(index) {
                // Lift the block out of flow; spacing travels with the float.
                let spacing = paragraph.spacing();
                let mut elements = Vec::new();
                for unit in units {
                    if let FlowUnit::Block {
                        elements: block_elements,
                        ..
                    } = unit
                    {
                        for mut element in block_elements {
                            element.dy += spacing.before;
                            elements.push(element);
                        }
                    }
                }
                current.push(FlowUnit::Float {
                    paragraph: index,
                    anchor: float.anchor,
                    beside: float.is_beside(),
                    height: float.height,
                    elements,
                });
                continue;
            }

            let spacing = paragraph.spacing();
            if spacing.before > 0.0 {
                current.push(FlowUnit::Gap {
                    height: spacing.before,
                });
            }
            current.extend(units);
            if spacing.after > 0.0 {
                current.push(FlowUnit::Gap {
                    height: spacing.after,
                });
            }
        }
        runs.push(current);

        let pages = assemble_pages(&runs, &self.config);
        self.report(&pages);
        Ok(pages)
    }

    /// Break every line-broken paragraph, in parallel when configured.
    fn break_all(
        &self,
        paragraphs: &[Paragraph],
    ) -> Result<Vec<Option<BrokenParagraph>>, TypesetError> {
        let todo: Vec<usize> = paragraphs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_line_broken())
            .map(|(i, _)| i)
            .collect();
        let mut results: Vec<Option<BrokenParagraph>> = vec![None; paragraphs.len()];

        let workers = self.worker_count(todo.len());
        if workers <= 1 {
            for &index in &todo {
                let broken = break_paragraph(&paragraphs[index], &self.config.breaker)
                    .map_err(|source| TypesetError::Break {
                        paragraph: index,
                        source,
                    })?;
                results[index] = Some(broken);
            }
            return Ok(results);
        }

        let chunk = todo.len().div_ceil(workers);
        let breaker = &self.config.breaker;
        let outcomes = std::thread::scope(|scope| {
            let handles: Vec<_> = todo
                .chunks(chunk)
                .map(|indices| {
                    scope.spawn(move || {
                        indices
                            .iter()
                            .map(|&index| (index, break_paragraph(&paragraphs[index], breaker)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            let mut merged = Vec::with_capacity(todo.len());
            for handle in handles {
                match handle.join() {
                    Ok(list) => merged.extend(list),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            merged
        });

        for (index, outcome) in outcomes {
            let broken = outcome.map_err(|source| TypesetError::Break {
                paragraph: index,
                source,
            })?;
            results[index] = Some(broken);
        }
        Ok(results)
    }

    fn worker_count(&self, jobs: usize) -> usize {
        if jobs <= 1 || self.config.workers == 1 {
            return 1;
        }
        let configured = if self.config.workers == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            self.config.workers
        };
        configured.min(jobs).max(1)
    }

    fn report(&self, pages: &[Page]) {
        for page in pages {
            for warning in &page.warnings {
                let diagnostic = match warning {
                    LayoutWarning::DegradedLine {
                        paragraph,
                        line,
                        ratio,
                    } => LayoutDiagnostic::DegradedLine {
                        page: page.number,
                        paragraph: *paragraph,
                        line: *line,
                        ratio: *ratio,
                    },
                    LayoutWarning::DegradedPageBreak { paragraph } => {
                        LayoutDiagnostic::DegradedPageBreak {
                            page: page.number,
                            paragraph: *paragraph,
                        }
                    }
                    LayoutWarning::OverfullPage { height } => LayoutDiagnostic::OverfullPage {
                        page: page.number,
                        height: *height,
                    },
                };
                self.emit(diagnostic);
            }
        }
    }

    fn emit(&self, diagnostic: LayoutDiagnostic) {
        if let Some(sink) = &self.diagnostic_sink {
            if let Ok(mut callback) = sink.lock() {
                (*callback)(diagnostic);
            }
        }
    }
}

/// Lay one broken line out into positioned elements.
fn line_elements(
    paragraph: &Paragraph,
    line: &Line,
    line_index: usize,
    config: &TypesetConfig,
) -> Vec<OffsetElement> {
    let items = paragraph.items();
    let widths = paragraph.line_widths();
    let target = widths.width_for(line_index);
    let line_height = paragraph.line_height();
    let mut x = config.page.insets.left + widths.indent_for(line_index);

    let justify = paragraph.alignment() == Alignment::Justified;
    let ratio = if justify { line.ratio } else { 0.0 };

    if !justify {
        let mut natural: f64 = items[line.start..line.break_at]
            .iter()
            .map(Item::width)
            .sum();
        natural += items[line.break_at].width_if_broken();
        let rest = (target - natural).max(0.0);
        x += match paragraph.alignment() {
            Alignment::Center => rest / 2.0,
            Alignment::Right => rest,
            Alignment::Left | Alignment::Justified => 0.0,
        };
    }

    let mut elements = Vec::new();
    for item in &items[line.start..line.break_at] {
        match item {
            Item::Box(boxed) => {
                let payload = match &boxed.content {
                    InlineContent::Text(run) => ElementPayload::Text(run.clone()),
                    InlineContent::Math(math) => ElementPayload::Math(math.clone()),
                };
                elements.push(OffsetElement {
                    dx: x,
                    dy: 0.0,
                    size: Size::new(boxed.width, line_height),
                    payload,
                });
                x += boxed.width;
            }
            Item::Glue(glue) => {
                x += glue.width_under(ratio);
            }
            Item::Penalty(_) => {}
        }
    }

    // A chosen hyphen-like break contributes its replacement text.
    if let Some(penalty) = items[line.break_at].as_penalty() {
        if penalty.width > 0.0 {
            if let Some(run) = &penalty.replacement {
                elements.push(OffsetElement {
                    dx: x,
                    dy: 0.0,
                    size: Size::new(penalty.width, line_height),
                    payload: ElementPayload::Text(run.clone()),
                });
            }
        }
    }
    elements
}

fn text_flow(ctx: &HandlerContext<'_>) -> Vec<FlowUnit> {
    let Some(broken) = ctx.broken else {
        return Vec::new();
    };
    let line_height = ctx.paragraph.line_height();
    broken
        .lines
        .iter()
        .enumerate()
        .map(|(line_index, line)| FlowUnit::Line {
            paragraph: ctx.index,
            line: line_index,
            height: line_height,
            ratio: line.ratio,
            degraded: line.degraded,
            elements: line_elements(ctx.paragraph, line, line_index, ctx.config),
        })
        .collect()
}

/// Handler for ordinary text paragraphs.
struct TextHandler;

impl ParagraphHandler for TextHandler {
    fn flow(&self, ctx: &HandlerContext<'_>) -> Vec<FlowUnit> {
        text_flow(ctx)
    }
}

/// Handler for table-of-contents entries: text lines plus a flush-right page
/// label and a leader rule on the last line.
struct TocEntryHandler;

impl ParagraphHandler for TocEntryHandler {
    fn flow(&self, ctx: &HandlerContext<'_>) -> Vec<FlowUnit> {
        let mut units = text_flow(ctx);
        let ParagraphKind::TocEntry(entry) = ctx.paragraph.kind() else {
            return units;
        };

        if let Some(FlowUnit::Line {
            elements, height, ..
        }) = units.last_mut()
        {
            let insets = ctx.config.page.insets;
            let content_right = insets.left + ctx.paragraph.line_widths().default_width();
            let label_x = content_right - entry.page_label_width;
            let title_end = elements
                .iter()
                .rev()
                .find_map(|element| match element.payload {
                    ElementPayload::Text(_) | ElementPayload::Math(_) => {
                        Some(element.dx + element.size.width)
                    }
                    _ => None,
                })
                .unwrap_or(insets.left);

            elements.push(OffsetElement {
                dx: label_x,
                dy: 0.0,
                size: Size::new(entry.page_label_width, *height),
                payload: ElementPayload::Text(entry.page_label.clone()),
            });

            if entry.leader != LeaderStyle::None {
                let start = title_end + TOC_LEADER_MARGIN;
                let end = label_x - TOC_LEADER_MARGIN;
                if end > start {
                    elements.push(OffsetElement {
                        dx: start,
                        dy: *height * 0.8,
                        size: Size::new(end - start, entry.leader_thickness),
                        payload: ElementPayload::Rule {
                            thickness: entry.leader_thickness,
                            style: entry.leader,
                        },
                    });
                }
            }
        }
        units
    }
}

/// Horizontal block offset within the content area for an alignment.
fn aligned_x(config: &TypesetConfig, width: f64, alignment: Alignment) -> f64 {
    let content_width = config.page.content_width();
    let rest = (content_width - width).max(0.0);
    config.page.insets.left
        + match alignment {
            Alignment::Center => rest / 2.0,
            Alignment::Right => rest,
            Alignment::Left | Alignment::Justified => 0.0,
        }
}

/// Handler for image blocks, caption included.
struct ImageHandler;

impl ParagraphHandler for ImageHandler {
    fn flow(&self, ctx: &HandlerContext<'_>) -> Vec<FlowUnit> {
        let ParagraphKind::Image(image) = ctx.paragraph.kind() else {
            return Vec::new();
        };
        let width = image.size.width.min(ctx.config.page.content_width());
        let x = aligned_x(ctx.config, width, ctx.paragraph.alignment());

        let mut elements = vec![OffsetElement {
            dx: x,
            dy: 0.0,
            size: Size::new(width, image.size.height),
            payload: ElementPayload::Image {
                source: image.source.clone(),
            },
        }];
        if let Some(caption) = &image.caption {
            let caption_height = ctx.paragraph.line_height().max(12.0);
            elements.push(OffsetElement {
                dx: x,
                dy: image.size.height,
                size: Size::new(width, caption_height),
                payload: ElementPayload::Text(caption.clone()),
            });
        }
        vec![FlowUnit::Block {
            paragraph: ctx.index,
            height: ctx.paragraph.block_height(),
            elements,
        }]
    }
}

/// Handler for display math blocks, centered in the content area.
struct MathHandler;

impl ParagraphHandler for MathHandler {
    fn flow(&self, ctx: &HandlerContext<'_>) -> Vec<FlowUnit> {
        let ParagraphKind::Math(math) = ctx.paragraph.kind() else {
            return Vec::new();
        };
        let size = math.expression.size;
        let x = aligned_x(ctx.config, size.width, Alignment::Center);
        vec![FlowUnit::Block {
            paragraph: ctx.index,
            height: size.height,
            elements: vec![OffsetElement {
                dx: x,
                dy: 0.0,
                size,
                payload: ElementPayload::Math(math.expression.clone()),
            }],
        }]
    }
}

/// Handler for table blocks.
struct TableHandler;

impl ParagraphHandler for TableHandler {
    fn flow(&self, ctx: &HandlerContext<'_>) -> Vec<FlowUnit> {
        let ParagraphKind::Table(table) = ctx.paragraph.kind() else {
            return Vec::new();
        };
        let size = table.size();
        let x = aligned_x(ctx.config, size.width, ctx.paragraph.alignment());
        vec![FlowUnit::Block {
            paragraph: ctx.index,
            height: size.height,
            elements: vec![OffsetElement {
                dx: x,
                dy: 0.0,
                size,
                payload: ElementPayload::Table(table.clone()),
            }],
        }]
    }
}

/// Handler for code listings: one pre-formatted line per unit so the page
/// breaker may split long listings between lines.
struct CodeHandler;

impl ParagraphHandler for CodeHandler {
    fn flow(&self, ctx: &HandlerContext<'_>) -> Vec<FlowUnit> {
        let ParagraphKind::Code(code) = ctx.paragraph.kind() else {
            return Vec::new();
        };
        let width = ctx.paragraph.line_widths().default_width();
        let x = ctx.config.page.insets.left;
        code.lines
            .iter()
            .enumerate()
            .map(|(line_index, run)| FlowUnit::Line {
                paragraph: ctx.index,
                line: line_index,
                height: code.line_height,
                ratio: 0.0,
                degraded: false,
                elements: vec![OffsetElement {
                    dx: x,
                    dy: 0.0,
                    size: Size::new(width, code.line_height),
                    payload: ElementPayload::Text(run.clone()),
                }],
            })
            .collect()
    }
}
