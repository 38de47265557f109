//! Knuth-Plass line breaking and pagination engine for folio documents.
//!
//! The engine consumes pre-measured paragraph content — boxes, glue and
//! penalties produced by the external document converter — and produces pages
//! of absolutely positioned elements for the export layer. The two breaking
//! stages are independent: per-paragraph line breaking is a globally-optimal
//! breakpoint search that may run in parallel across paragraphs, and page
//! breaking then walks the broken output sequentially, handling floats,
//! widows/orphans and explicit page breaks.
//!
//! Degraded layout never fails a run: overfull lines and oversized blocks are
//! accepted, flagged on the affected line or page, and mirrored through the
//! optional diagnostic sink.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod config;
mod engine;
mod error;
mod float;
mod geom;
mod item;
mod linebreak;
mod page;
mod pagebreak;
mod paragraph;

pub use config::{BreakerConfig, FloatConfig, TypesetConfig, VerticalConfig, WidowOrphanControl};
pub use engine::{
    FlowDocument, HandlerContext, HandlerRegistry, LayoutDiagnostic, ParagraphHandler,
    TypesetEngine,
};
pub use error::{BreakError, ConfigurationError, ItemError, TypesetError};
pub use float::{plan_floats, FloatAnchor, FloatPlan, PlannedFloat};
pub use geom::{Insets, PageGeometry, Position, Size};
pub use item::{
    BoxItem, Glue, InlineContent, Item, MathInline, Penalty, StyleId, TextRun, FORCED_BREAK,
    IMPOSSIBLE_BREAK,
};
pub use linebreak::{break_paragraph, BrokenParagraph, Fitness, Line};
pub use page::{Element, ElementPayload, LayoutWarning, Page};
pub use pagebreak::{assemble_pages, FlowUnit, OffsetElement};
pub use paragraph::{
    Alignment, BlockSpacing, CodeBlock, ImageBlock, LeaderStyle, LineConstraint, LineWidths,
    MathBlock, Paragraph, ParagraphBuilder, ParagraphKind, ParagraphKindTag, TableSpec,
    TocEntryBlock,
};
