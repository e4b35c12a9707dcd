//! Domain logic for testdelta.
//!
//! This crate is intentionally I/O-free: it matches, classifies and clusters.
//! Every entry point is a pure function of its arguments; nothing is cached
//! between calls.

mod cluster;
mod compare;
mod similarity;
mod summary;

pub use cluster::{cluster, cluster_with, is_new_failure};
pub use compare::{compare, detect_flakiness};
pub use similarity::{edit_distance, message_similarity, similarity_score};
pub use summary::summarize;

use testdelta_types::{DEFAULT_MIN_SIMILARITY, DEFAULT_THRESHOLD_PCT};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DomainError {
    #[error("duration threshold must be a finite, non-negative percentage (got {0})")]
    InvalidThreshold(f64),

    #[error("minimum similarity must be within 0.0..=1.0 (got {0})")]
    InvalidSimilarity(f64),

    #[error("message length cap must be > 0")]
    InvalidMessageCap,
}

/// Percent change in duration beyond which a passing test counts as slower
/// (or, negated, faster).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DurationThreshold(f64);

impl DurationThreshold {
    /// Zero means "use the default" (20%).
    pub fn new(pct: f64) -> Result<Self, DomainError> {
        if !pct.is_finite() || pct < 0.0 {
            return Err(DomainError::InvalidThreshold(pct));
        }
        if pct == 0.0 {
            return Ok(Self::default());
        }
        Ok(Self(pct))
    }

    pub fn pct(self) -> f64 {
        self.0
    }
}

impl Default for DurationThreshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD_PCT)
    }
}

/// Knobs for [`cluster_with`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClusterOptions {
    /// A failure joins the first cluster scoring at least this much.
    pub min_similarity: f64,

    /// Messages are cut to this many chars before edit distance. `None` compares
    /// them whole.
    pub max_message_chars: Option<usize>,
}

impl ClusterOptions {
    pub fn new(min_similarity: f64, max_message_chars: Option<usize>) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err(DomainError::InvalidSimilarity(min_similarity));
        }
        if max_message_chars == Some(0) {
            return Err(DomainError::InvalidMessageCap);
        }
        Ok(Self {
            min_similarity,
            max_message_chars,
        })
    }
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            max_message_chars: None,
        }
    }
}
