
use std::cmp::Ordering;

use crate::data_types::variants::VariantKey;

/// Scores closer than this are treated as equal
pub const SCORE_EPSILON: f64 = 1e-9;

/// Equality check for scores that tolerates float representation noise
pub fn scores_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= SCORE_EPSILON
}

/// Snaps |delta| onto the SCORE_EPSILON grid; ordering on the snapped value stays a total order
fn magnitude_key(delta: f64) -> f64 {
    (delta.abs() / SCORE_EPSILON).round()
}

/// Renders a score the way it is usually written in VCFs, dropping a trailing ".0"
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) if s.fract() == 0.0 && s.abs() < 1e15 => format!("{}", s as i64),
        Some(s) => format!("{s}"),
        None => String::new()
    }
}

/// One shared variant whose scores were compared
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreComparisonEntry {
    /// Identity of the shared variant
    key: VariantKey,
    /// Index of the pair in `ReconciliationResult::shared`
    shared_index: usize,
    /// Score in the first input
    score_first: Option<f64>,
    /// Score in the second input
    score_second: Option<f64>,
    /// second - first; only when both scores are present
    delta: Option<f64>,
    /// True if either score is at or above the configured threshold
    passes_threshold: bool,
    /// Differing sub-scores as "name:first/second", comma-joined; "-" when none differ
    sub_score_summary: String
}

impl ScoreComparisonEntry {
    /// Creates a new entry; the delta is derived from the two scores.
    /// # Arguments
    /// * `key` - the shared identity key
    /// * `shared_index` - position of the pair in the shared partition
    /// * `score_first` - score in the first input
    /// * `score_second` - score in the second input
    /// * `threshold` - minimum score for the filtered view, None lets everything pass
    /// * `sub_score_summary` - pre-rendered sub-score differences
    pub fn new(
        key: VariantKey, shared_index: usize,
        score_first: Option<f64>, score_second: Option<f64>,
        threshold: Option<f64>, sub_score_summary: String
    ) -> Self {
        let delta = match (score_first, score_second) {
            (Some(s1), Some(s2)) => Some(s2 - s1),
            _ => None
        };
        let passes_threshold = match threshold {
            None => true,
            Some(t) => score_first.is_some_and(|s| s >= t) || score_second.is_some_and(|s| s >= t)
        };
        Self {
            key, shared_index,
            score_first, score_second, delta,
            passes_threshold,
            sub_score_summary
        }
    }

    /// Report ordering: entries where one score is missing come first, then by |delta| descending, then by locus and alleles.
    pub fn cmp_significance(&self, other: &Self) -> Ordering {
        let magnitude_order = match (self.delta, other.delta) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(d1), Some(d2)) => magnitude_key(d2).total_cmp(&magnitude_key(d1))
        };
        magnitude_order.then_with(|| self.key.cmp_full(&other.key))
    }

    /// Returns true when both scores exist and are equal
    pub fn is_concordant(&self) -> bool {
        self.delta.is_some_and(|d| d.abs() <= SCORE_EPSILON)
    }

    // getters
    pub fn key(&self) -> &VariantKey {
        &self.key
    }

    pub fn shared_index(&self) -> usize {
        self.shared_index
    }

    pub fn score_first(&self) -> Option<f64> {
        self.score_first
    }

    pub fn score_second(&self) -> Option<f64> {
        self.score_second
    }

    pub fn delta(&self) -> Option<f64> {
        self.delta
    }

    pub fn passes_threshold(&self) -> bool {
        self.passes_threshold
    }

    pub fn sub_score_summary(&self) -> &str {
        &self.sub_score_summary
    }
}
