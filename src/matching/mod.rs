//! Multi-strategy name matching.
//!
//! Used when an exact attribute name is not available, typically when
//! mapping spreadsheet headers onto attributes. Strategies run in a fixed
//! order and the first one that accepts any candidate wins:
//!
//! 1. `Exact`: case-insensitive equality.
//! 2. `Normalized`: punctuation stripped, whitespace collapsed, then equal.
//! 3. `Cleaned`: separators removed, then equality or containment.
//! 4. `WordOverlap`: word-set overlap above the acceptance threshold.
//!
//! Within a stage the highest score wins. Equal top scores select the
//! lexicographically smallest name and flag the match as ambiguous.

mod normalize;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use normalize::{clean, normalize, word_overlap, words};

/// Scores closer than this are treated as a tie.
const SCORE_EPSILON: f64 = 1e-9;

/// Matching stage that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Case-insensitive equality.
    Exact,
    /// Equality after normalization.
    Normalized,
    /// Equality or containment after separator removal.
    Cleaned,
    /// Word-set overlap.
    WordOverlap,
}

impl MatchStrategy {
    /// Stages in evaluation order.
    pub const ORDER: [MatchStrategy; 4] = [
        MatchStrategy::Exact,
        MatchStrategy::Normalized,
        MatchStrategy::Cleaned,
        MatchStrategy::WordOverlap,
    ];
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Normalized => write!(f, "normalized"),
            Self::Cleaned => write!(f, "cleaned"),
            Self::WordOverlap => write!(f, "word_overlap"),
        }
    }
}

/// A successful match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyMatch {
    /// Chosen candidate, as given.
    pub candidate: String,
    /// Stage that accepted the candidate.
    pub strategy: MatchStrategy,
    /// Score within the stage, in `(0.0, 1.0]`.
    pub score: f64,
    /// Other candidates that tied with the chosen one.
    pub tied_with: Vec<String>,
}

impl FuzzyMatch {
    /// True when another candidate scored the same in the same stage.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        !self.tied_with.is_empty()
    }
}

/// Multi-strategy name matcher.
///
/// Pure: results depend only on the query, the candidate set and the
/// threshold.
///
/// # Examples
///
/// ```
/// use paramkit::{FuzzyMatcher, MatchStrategy};
///
/// let matcher = FuzzyMatcher::default();
/// let found = matcher
///     .find_match("Foundation Thickness (mm)", ["Foundation Thickness", "Length", "Width"])
///     .unwrap();
/// assert_eq!(found.candidate, "Foundation Thickness");
/// assert_eq!(found.strategy, MatchStrategy::Cleaned);
/// assert!(matcher.find_match("xyz123", ["Length", "Width"]).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl FuzzyMatcher {
    /// Default word-overlap acceptance threshold.
    pub const DEFAULT_THRESHOLD: f64 = 0.3;

    /// Creates a matcher with a custom word-overlap threshold.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ThresholdOutOfRange` unless `0 < threshold <= 1`.
    pub fn with_threshold(threshold: f64) -> Result<Self, ConfigError> {
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            return Err(ConfigError::ThresholdOutOfRange { value: threshold });
        }
        Ok(Self { threshold })
    }

    /// Word-overlap acceptance threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Finds the best candidate for `query`, or `None` when nothing matches.
    pub fn find_match<I, S>(&self, query: &str, candidates: I) -> Option<FuzzyMatch>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let owned: Vec<S> = candidates.into_iter().collect();
        let set: BTreeSet<&str> = owned.iter().map(AsRef::as_ref).collect();
        if set.is_empty() || query.trim().is_empty() {
            return None;
        }

        MatchStrategy::ORDER
            .iter()
            .find_map(|&strategy| self.run_stage(strategy, query, &set))
    }

    fn run_stage(&self, strategy: MatchStrategy, query: &str, set: &BTreeSet<&str>) -> Option<FuzzyMatch> {
        let scored: Vec<(&str, f64)> = match strategy {
            MatchStrategy::Exact => {
                let q = query.to_lowercase();
                set.iter()
                    .filter(|c| c.to_lowercase() == q)
                    .map(|c| (*c, 1.0))
                    .collect()
            }
            MatchStrategy::Normalized => {
                let q = normalize(query);
                if q.is_empty() {
                    return None;
                }
                set.iter()
                    .filter(|c| normalize(c) == q)
                    .map(|c| (*c, 1.0))
                    .collect()
            }
            MatchStrategy::Cleaned => {
                let q = clean(query);
                if q.is_empty() {
                    return None;
                }
                set.iter()
                    .filter_map(|c| cleaned_score(&q, &clean(c)).map(|s| (*c, s)))
                    .collect()
            }
            MatchStrategy::WordOverlap => {
                let q = words(query);
                set.iter()
                    .map(|c| (*c, word_overlap(&q, &words(c))))
                    .filter(|(_, s)| *s > self.threshold)
                    .collect()
            }
        };

        pick_best(strategy, &scored)
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}

/// Score of any containment in the cleaned stage. Containments are not
/// ranked against each other, so two of them tie.
const CONTAINMENT_SCORE: f64 = 0.5;

/// Equality scores 1.0; containment either way scores [`CONTAINMENT_SCORE`].
fn cleaned_score(query: &str, candidate: &str) -> Option<f64> {
    if candidate.is_empty() {
        return None;
    }
    if query == candidate {
        return Some(1.0);
    }
    if query.contains(candidate) || candidate.contains(query) {
        return Some(CONTAINMENT_SCORE);
    }
    None
}

/// `scored` is in lexicographic candidate order.
fn pick_best(strategy: MatchStrategy, scored: &[(&str, f64)]) -> Option<FuzzyMatch> {
    let top = scored.iter().map(|(_, s)| *s).fold(f64::NEG_INFINITY, f64::max);
    if !top.is_finite() {
        return None;
    }

    let mut winners = scored
        .iter()
        .filter(|(_, s)| (top - s).abs() < SCORE_EPSILON)
        .map(|(c, _)| (*c).to_string());
    let candidate = winners.next()?;
    let tied_with: Vec<String> = winners.collect();

    Some(FuzzyMatch {
        candidate,
        strategy,
        score: top,
        tied_with,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANDIDATES: [&str; 3] = ["Foundation Thickness", "Length", "Width"];

    #[test]
    fn test_exact_is_case_insensitive() {
        let m = FuzzyMatcher::default().find_match("LENGTH", CANDIDATES).unwrap();
        assert_eq!(m.candidate, "Length");
        assert_eq!(m.strategy, MatchStrategy::Exact);
        assert!((m.score - 1.0).abs() < f64::EPSILON);
        assert!(!m.is_ambiguous());
    }

    #[test]
    fn test_normalized_strips_punctuation() {
        let m = FuzzyMatcher::default()
            .find_match("foundation  thickness.", CANDIDATES)
            .unwrap();
        assert_eq!(m.candidate, "Foundation Thickness");
        assert_eq!(m.strategy, MatchStrategy::Normalized);
    }

    #[test]
    fn test_cleaned_accepts_containment() {
        let m = FuzzyMatcher::default()
            .find_match("Foundation Thickness (mm)", CANDIDATES)
            .unwrap();
        assert_eq!(m.candidate, "Foundation Thickness");
        assert_eq!(m.strategy, MatchStrategy::Cleaned);
        assert!((m.score - CONTAINMENT_SCORE).abs() < f64::EPSILON);
        assert!(!m.is_ambiguous());
    }

    #[test]
    fn test_cleaned_containment_tie_is_ambiguous() {
        let m = FuzzyMatcher::default()
            .find_match("Cover", ["Top Cover", "Bottom Cover"])
            .unwrap();
        assert_eq!(m.strategy, MatchStrategy::Cleaned);
        assert_eq!(m.candidate, "Bottom Cover");
        assert_eq!(m.tied_with, vec!["Top Cover".to_string()]);
        assert!(m.is_ambiguous());
    }

    #[test]
    fn test_cleaned_equality_beats_containment() {
        let m = FuzzyMatcher::default()
            .find_match("top_cover", ["Top Cover", "Top Cover Offset"])
            .unwrap();
        assert_eq!(m.candidate, "Top Cover");
        assert!((m.score - 1.0).abs() < f64::EPSILON);
        assert!(!m.is_ambiguous());
    }

    #[test]
    fn test_cleaned_equality_ignores_separators() {
        let m = FuzzyMatcher::default()
            .find_match("bar_spacing", ["Bar Spacing", "Bar Diameter"])
            .unwrap();
        assert_eq!(m.candidate, "Bar Spacing");
        assert_eq!(m.strategy, MatchStrategy::Cleaned);
        assert!((m.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_word_overlap_above_threshold() {
        let m = FuzzyMatcher::default()
            .find_match("Spacing of top bars", ["Top Bar Spacing", "Cover"])
            .unwrap();
        assert_eq!(m.candidate, "Top Bar Spacing");
        assert_eq!(m.strategy, MatchStrategy::WordOverlap);
    }

    #[test]
    fn test_no_match() {
        assert!(FuzzyMatcher::default().find_match("xyz123", CANDIDATES).is_none());
    }

    #[test]
    fn test_empty_inputs() {
        let none: [&str; 0] = [];
        assert!(FuzzyMatcher::default().find_match("Length", none).is_none());
        assert!(FuzzyMatcher::default().find_match("   ", CANDIDATES).is_none());
    }

    #[test]
    fn test_tie_picks_lexicographically_smaller_and_flags() {
        let m = FuzzyMatcher::default()
            .find_match("width", ["WIDTH", "Width"])
            .unwrap();
        assert_eq!(m.candidate, "WIDTH");
        assert_eq!(m.tied_with, vec!["Width".to_string()]);
        assert!(m.is_ambiguous());
    }

    #[test]
    fn test_word_overlap_tie_is_ambiguous() {
        let m = FuzzyMatcher::default()
            .find_match("Top Cover", ["Top Spacing", "Bottom Cover"])
            .unwrap();
        assert_eq!(m.strategy, MatchStrategy::WordOverlap);
        assert_eq!(m.candidate, "Bottom Cover");
        assert!(m.is_ambiguous());
    }

    #[test]
    fn test_earlier_stage_wins() {
        // "Length" matches exactly even though "Length Total" would contain it.
        let m = FuzzyMatcher::default()
            .find_match("length", ["Length Total", "Length"])
            .unwrap();
        assert_eq!(m.candidate, "Length");
        assert_eq!(m.strategy, MatchStrategy::Exact);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(FuzzyMatcher::with_threshold(0.0).is_err());
        assert!(FuzzyMatcher::with_threshold(1.5).is_err());
        assert!(FuzzyMatcher::with_threshold(f64::NAN).is_err());
        let m = FuzzyMatcher::with_threshold(0.9).unwrap();
        assert!((m.threshold() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_high_threshold_rejects_partial_overlap() {
        let m = FuzzyMatcher::with_threshold(0.9).unwrap();
        assert!(m.find_match("Spacing of top bars", ["Top Bar Spacing"]).is_none());
    }
}
