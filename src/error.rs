//! Error types for the typesetting engine.
//!
//! Only contract violations are errors. Degraded layout (an overfull line, a
//! widow the breaker could not avoid, an oversized block) is recovered locally
//! and surfaced as a [`LayoutWarning`](crate::page::LayoutWarning) instead, so
//! a run always produces usable pages.

use core::fmt;

/// Validation failure raised when constructing a measured item.
///
/// Rejecting negative flexibility at construction time is the only validation
/// the item layer performs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum ItemError {
    /// Glue was given a negative stretchability.
    NegativeStretch(f64),
    /// Glue was given a negative shrinkability.
    NegativeShrink(f64),
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeStretch(value) => {
                write!(f, "glue stretchability must be >= 0, got {value}")
            }
            Self::NegativeShrink(value) => {
                write!(f, "glue shrinkability must be >= 0, got {value}")
            }
        }
    }
}

impl std::error::Error for ItemError {}

/// A paragraph handed to the line breaker violates the construction contract.
///
/// These indicate converter bugs upstream of the engine and are fail-fast.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// A line-broken paragraph does not end in a forced break, so termination
    /// of the breakpoint search is not guaranteed.
    MissingTrailingForcedBreak {
        /// Source-order paragraph index.
        paragraph: usize,
    },
    /// No handler is registered for a paragraph kind.
    UnhandledParagraphKind {
        /// Stable name of the offending kind.
        kind: &'static str,
    },
    /// The page content area is degenerate (zero or negative extent).
    InvalidPageGeometry,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTrailingForcedBreak { paragraph } => write!(
                f,
                "paragraph {paragraph} has no trailing forced break; refusing to break it"
            ),
            Self::UnhandledParagraphKind { kind } => {
                write!(f, "no handler registered for paragraph kind '{kind}'")
            }
            Self::InvalidPageGeometry => {
                write!(f, "page geometry leaves no usable content area")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Failure inside the line-breaking search for a single paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BreakError {
    /// The item stream lacks the guaranteed trailing forced break.
    MissingTrailingForcedBreak,
    /// Backtracking found no path to the trailing forced break. Given the
    /// construction guarantee this means the item stream is malformed.
    NoFeasibleSolution,
}

impl fmt::Display for BreakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTrailingForcedBreak => {
                write!(f, "item stream has no trailing forced break")
            }
            Self::NoFeasibleSolution => {
                write!(f, "no feasible breakpoint sequence reaches the trailing forced break")
            }
        }
    }
}

impl std::error::Error for BreakError {}

/// Top-level failure of a typesetting run.
#[derive(Debug)]
#[non_exhaustive]
pub enum TypesetError {
    /// A paragraph or the configuration violates the engine contract.
    Configuration(ConfigurationError),
    /// Line breaking failed for one paragraph.
    Break {
        /// Source-order paragraph index.
        paragraph: usize,
        /// The underlying breaker failure.
        source: BreakError,
    },
}

impl fmt::Display for TypesetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(err) => write!(f, "configuration error: {err}"),
            Self::Break { paragraph, source } => {
                write!(f, "line breaking failed for paragraph {paragraph}: {source}")
            }
        }
    }
}

impl std::error::Error for TypesetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Configuration(err) => Some(err),
            Self::Break { source, .. } => Some(source),
        }
    }
}

impl From<ConfigurationError> for TypesetError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err)
    }
}
