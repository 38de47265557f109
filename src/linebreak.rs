//! Globally-optimal paragraph line breaking.
//!
//! Active-breakpoint dynamic programming in the Knuth-Plass family: the
//! breaker keeps a frontier of feasible breakpoints, scores every legal
//! candidate against each of them, prunes dominated entries per line/fitness
//! combination, and finally backtracks the cheapest path of predecessor
//! references into ordered line records.
//!
//! The search never fails for layout reasons. When a pass strands the frontier
//! it retries at the next configured tolerance, and at the loosest tolerance
//! it forces a break at the least-bad stranded candidate instead, marking the
//! line degraded.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::BreakerConfig;
use crate::error::BreakError;
use crate::item::Item;
use crate::paragraph::Paragraph;

/// Sentinel for "no predecessor" in the breakpoint arena.
const NO_NODE: usize = usize::MAX;

/// Tolerance used when the configured pass list is empty.
const FALLBACK_TOLERANCE: f64 = 200.0;

/// Path cost of a forced degraded line, scaled by how far past the shrink
/// limit it lands. Large enough to dominate any feasible alternative so the
/// search only degrades when nothing else reaches the end of the paragraph.
const DEGRADED_LINE_DEMERITS: f64 = 1.0e7;

/// Fitness classification of a line's adjustment ratio.
///
/// Adjacent lines whose classes differ by more than one step read as a jarring
/// contrast and attract a surcharge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fitness {
    /// Ratio below -0.5: glue shrunk noticeably.
    Tight,
    /// Ratio in [-0.5, 0.5].
    Decent,
    /// Ratio above 0.5.
    Loose,
    /// Ratio above 1.0.
    VeryLoose,
}

impl Fitness {
    /// Classify an adjustment ratio.
    pub fn classify(ratio: f64) -> Self {
        if ratio < -0.5 {
            Self::Tight
        } else if ratio > 1.0 {
            Self::VeryLoose
        } else if ratio > 0.5 {
            Self::Loose
        } else {
            Self::Decent
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Tight => 0,
            Self::Decent => 1,
            Self::Loose => 2,
            Self::VeryLoose => 3,
        }
    }

    /// Number of class steps between two fitness values.
    pub fn distance(self, other: Self) -> u8 {
        self.rank().abs_diff(other.rank())
    }
}

/// One line of a broken paragraph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Index of the first item contributing to the line.
    pub start: usize,
    /// Index of the item chosen as the breakpoint. The line consists of items
    /// `start..break_at`, plus the break item's own width when it is a
    /// penalty.
    pub break_at: usize,
    /// Adjustment ratio that makes the line exactly fill its target width.
    pub ratio: f64,
    /// Fitness class of the ratio.
    pub fitness: Fitness,
    /// Whether this is the paragraph's last line.
    pub is_last: bool,
    /// Whether the line was accepted outside the feasible range because no
    /// feasible break existed.
    pub degraded: bool,
}

/// Result of breaking one paragraph into lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokenParagraph {
    /// Ordered line records.
    pub lines: Vec<Line>,
    /// Cumulative demerits of the chosen breakpoint path.
    pub total_demerits: f64,
    /// The tolerance the solution was found at.
    pub tolerance: f64,
}

impl BrokenParagraph {
    /// Whether any line was accepted as degraded.
    pub fn is_degraded(&self) -> bool {
        self.lines.iter().any(|line| line.degraded)
    }
}

/// A settled breakpoint in the search arena.
///
/// Predecessors are arena indices, not references, so the transient search
/// state stays flat and is discarded wholesale after path reconstruction.
#[derive(Clone, Copy, Debug)]
struct Node {
    /// Item index of the break; `NO_NODE` for the paragraph-start root.
    at: usize,
    /// First content index of the line following this break.
    start: usize,
    /// Completed lines up to and including this break.
    line: usize,
    /// Fitness of the line ending here.
    fitness: Fitness,
    /// Cumulative demerits along the path ending here.
    demerits: f64,
    /// Ratio of the line ending here.
    ratio: f64,
    /// Whether the line ending here was forced outside feasibility.
    degraded: bool,
    /// Arena index of the predecessor breakpoint.
    prev: usize,
}

/// Candidate entry for one (line, fitness) slot at the current position.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    line: usize,
    fitness: Fitness,
    demerits: f64,
    ratio: f64,
    degraded: bool,
    prev: usize,
}

/// Cumulative width/stretch/shrink prefix sums over the item stream.
struct FlowTotals {
    width: Vec<f64>,
    stretch: Vec<f64>,
    shrink: Vec<f64>,
}

impl FlowTotals {
    fn measure(items: &[Item]) -> Self {
        let mut width = Vec::with_capacity(items.len() + 1);
        let mut stretch = Vec::with_capacity(items.len() + 1);
        let mut shrink = Vec::with_capacity(items.len() + 1);
        let (mut w, mut st, mut sh) = (0.0_f64, 0.0_f64, 0.0_f64);
        width.push(w);
        stretch.push(st);
        shrink.push(sh);
        for item in items {
            w += item.width();
            st += item.stretch();
            sh += item.shrink();
            width.push(w);
            stretch.push(st);
            shrink.push(sh);
        }
        Self {
            width,
            stretch,
            shrink,
        }
    }

    /// Natural width, stretch and shrink of the half-open item range.
    fn between(&self, start: usize, end: usize) -> (f64, f64, f64) {
        if end <= start {
            return (0.0, 0.0, 0.0);
        }
        (
            self.width[end] - self.width[start],
            self.stretch[end] - self.stretch[start],
            self.shrink[end] - self.shrink[start],
        )
    }
}

fn badness(ratio: f64) -> f64 {
    100.0 * ratio.abs().powi(3)
}

/// Whether the item at `index` is a legal breakpoint: glue immediately after a
/// box, or a penalty that is not impossible.
fn is_legal_break(items: &[Item], index: usize) -> bool {
    match &items[index] {
        Item::Glue(_) => index > 0 && items[index - 1].is_box(),
        Item::Penalty(p) => !p.is_impossible(),
        Item::Box(_) => false,
    }
}

/// First content index after a break: glue and non-forced penalties right
/// after a break are discarded.
fn next_line_start(items: &[Item], break_at: usize) -> usize {
    let mut index = break_at + 1;
    while index < items.len() {
        match &items[index] {
            Item::Box(_) => break,
            Item::Penalty(p) if p.is_forced() => break,
            _ => index += 1,
        }
    }
    index
}

/// Adjustment ratio making the material exactly fill `target`, or `None` when
/// the required flexibility is zero while a non-zero ratio is needed.
fn adjustment_ratio(natural: f64, stretch: f64, shrink: f64, target: f64) -> Option<f64> {
    let delta = target - natural;
    if delta == 0.0 {
        Some(0.0)
    } else if delta > 0.0 {
        if stretch > 0.0 {
            Some(delta / stretch)
        } else {
            None
        }
    } else if shrink > 0.0 {
        Some(delta / shrink)
    } else {
        None
    }
}

enum PassFailure {
    /// The frontier emptied with feasible candidates still pending; a more
    /// permissive pass may succeed.
    Stranded,
    /// No path reached the trailing forced break.
    NoSolution,
}

/// Break a paragraph into lines.
///
/// Runs the configured tolerance passes in order and returns the first
/// solution. Errors indicate contract violations, never layout difficulty.
pub fn break_paragraph(
    paragraph: &Paragraph,
    config: &BreakerConfig,
) -> Result<BrokenParagraph, BreakError> {
    let items = paragraph.items();
    if items.is_empty() || !paragraph.has_trailing_forced_break() {
        return Err(BreakError::MissingTrailingForcedBreak);
    }

    let totals = FlowTotals::measure(items);
    let fallback = [FALLBACK_TOLERANCE];
    let tolerances: &[f64] = if config.tolerances.is_empty() {
        &fallback
    } else {
        &config.tolerances
    };

    let last_pass = tolerances.len() - 1;
    for (pass, &tolerance) in tolerances.iter().enumerate() {
        match run_pass(paragraph, &totals, config, tolerance, pass == last_pass) {
            Ok(broken) => return Ok(broken),
            Err(PassFailure::Stranded) if pass != last_pass => continue,
            Err(_) => return Err(BreakError::NoFeasibleSolution),
        }
    }
    Err(BreakError::NoFeasibleSolution)
}

fn run_pass(
    paragraph: &Paragraph,
    totals: &FlowTotals,
    config: &BreakerConfig,
    tolerance: f64,
    final_pass: bool,
) -> Result<BrokenParagraph, PassFailure> {
    let items = paragraph.items();
    let line_widths = paragraph.line_widths();
    let last_index = items.len() - 1;

    let mut arena: Vec<Node> = Vec::with_capacity(32);
    arena.push(Node {
        at: NO_NODE,
        start: first_content_index(items),
        line: 0,
        fitness: Fitness::Decent,
        demerits: 0.0,
        ratio: 0.0,
        degraded: false,
        prev: NO_NODE,
    });
    let mut active: SmallVec<[usize; 16]> = SmallVec::new();
    active.push(0);

    for b in 0..items.len() {
        if !is_legal_break(items, b) {
            continue;
        }
        let forced = items[b].is_forced_break();
        let break_cost = items[b].as_penalty().map_or(0.0, |p| p.cost);
        let break_flagged = items[b].is_flagged();

        let mut removed: SmallVec<[usize; 8]> = SmallVec::new();
        let mut candidates: SmallVec<[Candidate; 8]> = SmallVec::new();

        for (slot, &node_index) in active.iter().enumerate() {
            let node = arena[node_index];
            if node.at != NO_NODE && b <= node.at {
                continue;
            }

            let (mut natural, stretch, shrink) = totals.between(node.start.min(b), b);
            natural += items[b].width_if_broken();
            let target = line_widths.width_for(node.line);
            let ratio = adjustment_ratio(natural, stretch, shrink, target);

            // Overfull-from-here actives can never improve; forced breaks end
            // every open line.
            let overfull = matches!(ratio, Some(r) if r < -1.0);
            if overfull || forced {
                removed.push(slot);
            }

            let effective = match ratio {
                Some(r) if r >= -1.0 => {
                    if badness(r) <= tolerance || forced {
                        Some((r, false))
                    } else {
                        None
                    }
                }
                // Rigid material only ever fits at a forced break. Mark it
                // degraded when it overflows the target.
                None if forced => Some((0.0, natural > target)),
                _ => None,
            };
            let Some((ratio, rigid_overflow)) = effective else {
                continue;
            };

            let line_badness = badness(ratio);
            let mut demerits = (config.line_penalty + line_badness).powi(2);
            if !forced {
                if break_cost > 0.0 {
                    demerits += break_cost * break_cost;
                } else if break_cost < 0.0 {
                    demerits -= break_cost * break_cost;
                }
            }
            if break_flagged && node.at != NO_NODE && items[node.at].is_flagged() {
                demerits += config.flagged_demerits;
            }
            let fitness = Fitness::classify(ratio);
            if fitness.distance(node.fitness) > 1 {
                demerits += config.fitness_demerits;
            }
            let total = node.demerits + demerits;

            upsert_candidate(
                &mut candidates,
                Candidate {
                    line: node.line + 1,
                    fitness,
                    demerits: total,
                    ratio,
                    degraded: rigid_overflow,
                    prev: node_index,
                },
            );
        }

        if candidates.is_empty() && removed.len() == active.len() && !active.is_empty() {
            // The frontier is stranded at this position.
            if !final_pass {
                return Err(PassFailure::Stranded);
            }
            let forced_candidate =
                least_bad_forced(&arena, &active, totals, line_widths, items, b);
            log::warn!(
                "no feasible breakpoint at item {b} (tolerance {tolerance}); forcing a degraded break at ratio {:.3}",
                forced_candidate.ratio
            );
            candidates.push(forced_candidate);
        }

        for slot in removed.iter().rev() {
            active.remove(*slot);
        }
        for candidate in candidates {
            let node_index = arena.len();
            arena.push(Node {
                at: b,
                start: next_line_start(items, b),
                line: candidate.line,
                fitness: candidate.fitness,
                demerits: candidate.demerits,
                ratio: candidate.ratio,
                degraded: candidate.degraded,
                prev: candidate.prev,
            });
            active.push(node_index);
        }
    }

    let terminal = best_terminal(&arena, last_index).ok_or(PassFailure::NoSolution)?;
    Ok(reconstruct(&arena, terminal, items, tolerance))
}

fn first_content_index(items: &[Item]) -> usize {
    let mut index = 0;
    while index < items.len() {
        match &items[index] {
            Item::Box(_) => break,
            Item::Penalty(p) if p.is_forced() => break,
            _ => index += 1,
        }
    }
    index
}

/// Keep only the cheapest candidate per (line, fitness) combination.
fn upsert_candidate(candidates: &mut SmallVec<[Candidate; 8]>, candidate: Candidate) {
    for existing in candidates.iter_mut() {
        if existing.line == candidate.line && existing.fitness == candidate.fitness {
            if candidate.demerits < existing.demerits {
                *existing = candidate;
            }
            return;
        }
    }
    candidates.push(candidate);
}

/// Choose the least-bad pair when no active breakpoint admits a feasible
/// line at a stranded position: the smallest overfull deficit wins, then the
/// cheapest path.
fn least_bad_forced(
    arena: &[Node],
    active: &[usize],
    totals: &FlowTotals,
    line_widths: &crate::paragraph::LineWidths,
    items: &[Item],
    b: usize,
) -> Candidate {
    let mut best: Option<(f64, Candidate)> = None;
    for &node_index in active {
        let node = arena[node_index];
        let (mut natural, stretch, shrink) = totals.between(node.start.min(b), b);
        natural += items[b].width_if_broken();
        let target = line_widths.width_for(node.line);
        let ratio = match adjustment_ratio(natural, stretch, shrink, target) {
            Some(r) => r,
            // Rigid line: report how far it overflows as a pseudo-ratio.
            None => {
                if target > 0.0 {
                    (target - natural) / target
                } else {
                    -1.0
                }
            }
        };
        let deficit = (-1.0 - ratio).max(0.0);
        let candidate = Candidate {
            line: node.line + 1,
            fitness: Fitness::classify(ratio),
            demerits: node.demerits + (deficit + 1.0) * DEGRADED_LINE_DEMERITS,
            ratio,
            degraded: true,
            prev: node_index,
        };
        let better = match &best {
            None => true,
            Some((best_deficit, best_candidate)) => {
                deficit < *best_deficit
                    || (deficit == *best_deficit && candidate.demerits < best_candidate.demerits)
            }
        };
        if better {
            best = Some((deficit, candidate));
        }
    }
    // The caller only reaches this with a non-empty active list.
    best.map(|(_, candidate)| candidate).unwrap_or(Candidate {
        line: 1,
        fitness: Fitness::Tight,
        demerits: f64::MAX,
        ratio: -1.0,
        degraded: true,
        prev: 0,
    })
}

fn best_terminal(arena: &[Node], last_index: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, node) in arena.iter().enumerate() {
        if node.at != last_index {
            continue;
        }
        let better = match best {
            None => true,
            Some(current) => {
                let cur = &arena[current];
                node.demerits < cur.demerits
                    || (node.demerits == cur.demerits && node.line < cur.line)
            }
        };
        if better {
            best = Some(index);
        }
    }
    best
}

fn reconstruct(
    arena: &[Node],
    terminal: usize,
    items: &[Item],
    tolerance: f64,
) -> BrokenParagraph {
    let total_demerits = arena[terminal].demerits;
    let mut path: Vec<usize> = Vec::new();
    let mut cursor = terminal;
    while cursor != NO_NODE && arena[cursor].at != NO_NODE {
        path.push(cursor);
        cursor = arena[cursor].prev;
    }
    path.reverse();

    let mut lines: Vec<Line> = Vec::with_capacity(path.len());
    let mut previous_start = arena[0].start;
    for &node_index in &path {
        let node = &arena[node_index];
        lines.push(Line {
            start: previous_start.min(node.at),
            break_at: node.at,
            ratio: node.ratio,
            fitness: node.fitness,
            is_last: false,
            degraded: node.degraded,
        });
        previous_start = node.start;
    }

    // A paragraph that ends in an explicit mid-stream break leaves a final
    // line holding nothing but the closing glue; drop it.
    if lines.len() > 1 {
        let boxless = {
            let last = &lines[lines.len() - 1];
            !items[last.start..last.break_at]
                .iter()
                .any(Item::is_box)
        };
        if boxless {
            lines.pop();
        }
    }
    if let Some(last) = lines.last_mut() {
        last.is_last = true;
    }

    BrokenParagraph {
        lines,
        total_demerits,
        tolerance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{BoxItem, Glue, Penalty, StyleId, TextRun};
    use crate::paragraph::Paragraph;

    fn word(width: f64, text: &str) -> Item {
        Item::Box(BoxItem::text(width, TextRun::new(text, StyleId(0))))
    }

    fn space() -> Item {
        Item::Glue(Glue::new(10.0, 5.0, 3.0).expect("valid glue"))
    }

    fn config() -> BreakerConfig {
        BreakerConfig::default()
    }

    #[test]
    fn exact_fit_yields_single_line_at_ratio_zero() {
        // Two boxes and one space at natural width exactly fill the target.
        let para = Paragraph::text(110.0, 14.0)
            .items([word(50.0, "alpha"), space(), word(50.0, "beta")])
            .finish();
        let broken = break_paragraph(&para, &config()).expect("breaks");
        assert_eq!(broken.lines.len(), 1);
        let line = &broken.lines[0];
        assert_eq!(line.ratio, 0.0);
        assert_eq!(line.fitness, Fitness::Decent);
        assert!(line.is_last);
        assert!(!line.degraded);
        assert_eq!(line.break_at, para.items().len() - 1);
    }

    #[test]
    fn overfull_rigid_paragraph_degrades_instead_of_failing() {
        // Natural width 110 against a 100pt target with only 3pt of shrink:
        // required ratio -10/3 is past the overfull limit, and the only break
        // is the trailing forced one.
        let para = Paragraph::text(100.0, 14.0)
            .items([word(50.0, "alpha"), space(), word(50.0, "beta")])
            .finish();
        let broken = break_paragraph(&para, &config()).expect("degrades, not errors");
        assert_eq!(broken.lines.len(), 1);
        let line = &broken.lines[0];
        assert!(line.degraded);
        assert!(line.ratio < -1.0);
        assert!((line.ratio - (-10.0 / 3.0)).abs() < 1e-9);
        assert!(broken.is_degraded());
    }

    #[test]
    fn breaking_is_deterministic() {
        let items: Vec<Item> = (0..12)
            .flat_map(|i| [word(42.0, &format!("w{i}")), space()])
            .collect();
        let para = Paragraph::text(160.0, 14.0).items(items).finish();
        let first = break_paragraph(&para, &config()).expect("breaks");
        let second = break_paragraph(&para, &config()).expect("breaks");
        let key = |b: &BrokenParagraph| -> Vec<(usize, usize, f64, Fitness)> {
            b.lines
                .iter()
                .map(|l| (l.start, l.break_at, l.ratio, l.fitness))
                .collect()
        };
        assert_eq!(key(&first), key(&second));
    }

    #[test]
    fn final_line_ends_at_trailing_forced_break() {
        let items: Vec<Item> = (0..9)
            .flat_map(|i| [word(40.0, &format!("w{i}")), space()])
            .collect();
        let para = Paragraph::text(150.0, 14.0).items(items).finish();
        let broken = break_paragraph(&para, &config()).expect("breaks");
        let last = broken.lines.last().expect("at least one line");
        assert!(last.is_last);
        assert_eq!(last.break_at, para.items().len() - 1);
        assert!(para.items()[last.break_at].is_forced_break());
    }

    #[test]
    fn accepted_lines_respect_the_shrink_limit() {
        let items: Vec<Item> = (0..20)
            .flat_map(|i| [word(35.0, &format!("w{i}")), space()])
            .collect();
        let para = Paragraph::text(130.0, 14.0).items(items).finish();
        let broken = break_paragraph(&para, &config()).expect("breaks");
        for line in &broken.lines {
            if !line.degraded {
                assert!(line.ratio >= -1.0, "line ratio {} below -1", line.ratio);
            }
        }
    }

    #[test]
    fn relaxing_tolerance_never_worsens_the_optimum() {
        let items: Vec<Item> = (0..15)
            .flat_map(|i| [word(37.0, &format!("w{i}")), space()])
            .collect();
        let para = Paragraph::text(140.0, 14.0).items(items).finish();

        let strict = break_paragraph(
            &para,
            &BreakerConfig {
                tolerances: vec![200.0],
                ..BreakerConfig::default()
            },
        )
        .expect("breaks");
        let relaxed = break_paragraph(
            &para,
            &BreakerConfig {
                tolerances: vec![800.0],
                ..BreakerConfig::default()
            },
        )
        .expect("breaks");
        assert!(relaxed.total_demerits <= strict.total_demerits);
    }

    #[test]
    fn consecutive_flagged_breaks_cost_more() {
        // Identical streams except for the flag on the two mid-word break
        // penalties. The line widths force breaks at both penalties.
        let build = |flagged: bool| {
            let hyphen = |text: &str| {
                Item::Penalty(
                    Penalty::new(50.0, 8.0, flagged)
                        .with_replacement(TextRun::new(text, StyleId(0))),
                )
            };
            Paragraph::text(58.0, 14.0)
                .items([
                    word(50.0, "frag"),
                    hyphen("-"),
                    word(50.0, "ment"),
                    hyphen("-"),
                    word(50.0, "ed"),
                ])
                .finish()
        };
        let plain = break_paragraph(&build(false), &config()).expect("breaks");
        let flagged = break_paragraph(&build(true), &config()).expect("breaks");
        // Same break positions in both runs.
        let cuts = |b: &BrokenParagraph| -> Vec<usize> {
            b.lines.iter().map(|l| l.break_at).collect()
        };
        assert_eq!(cuts(&plain), cuts(&flagged));
        assert!(flagged.total_demerits > plain.total_demerits);
        assert_eq!(
            flagged.total_demerits - plain.total_demerits,
            config().flagged_demerits
        );
    }

    #[test]
    fn varying_line_widths_are_respected() {
        let items: Vec<Item> = (0..10)
            .flat_map(|i| [word(40.0, &format!("w{i}")), space()])
            .collect();
        let para = Paragraph::text(150.0, 14.0)
            .items(items)
            .line_widths(crate::paragraph::LineWidths::with_leading(
                150.0,
                vec![crate::paragraph::LineConstraint {
                    width: 100.0,
                    indent: 0.0,
                }],
            ))
            .finish();
        let broken = break_paragraph(&para, &config()).expect("breaks");
        assert!(broken.lines.len() >= 2);
        // First line must fit the narrowed 100pt target: at most two words.
        let first = &broken.lines[0];
        let boxes = para.items()[first.start..first.break_at]
            .iter()
            .filter(|i| i.is_box())
            .count();
        assert!(boxes <= 2, "first line holds {boxes} words for a 100pt target");
    }

    #[test]
    fn missing_forced_break_is_a_contract_error() {
        let para = Paragraph::block(crate::paragraph::ParagraphKind::Text, 100.0);
        assert_eq!(
            break_paragraph(&para, &config()),
            Err(BreakError::MissingTrailingForcedBreak)
        );
    }
}
