/*!
# Score Comparator
Compares the score of every shared variant and orders the differences by significance.

Entries are produced for shared pairs where at least one side carries a score.
Pairs with identical scores are skipped unless `include_equal_scores` is set, which keeps exact concordance visible.
The threshold never drops entries; it only flags which ones belong in the filtered view.

## Example usage
```rust
use noodles::core::Position;
use vcfdelta::data_types::variants::{VariantKey, VariantRecord};
use vcfdelta::score_comparator::{compare_scores, ScoreConfigBuilder};

let record = |score: f64| {
    let key = VariantKey::new(
        "chr1".to_string(), Position::try_from(100).unwrap(), "A".to_string(), "G".to_string()
    ).unwrap();
    VariantRecord::new(key, None, Default::default()).unwrap().with_score(Some(score))
};

let shared = vec![(record(10.0), record(12.0))];
let config = ScoreConfigBuilder::default()
    .score_threshold(11.0)
    .build().unwrap();
let entries = compare_scores(&shared, &config);
assert_eq!(entries.len(), 1);
assert_eq!(entries[0].delta(), Some(2.0));
assert!(entries[0].passes_threshold());
```
*/
use derive_builder::Builder;
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;

use crate::config::ConfigurationError;
use crate::data_types::score_comparison::{format_score, scores_equal, ScoreComparisonEntry};
use crate::data_types::variants::VariantRecord;

/// Controls which shared pairs become comparison entries
#[derive(Builder, Clone, Copy, Debug, Default)]
#[builder(default, build_fn(validate = "Self::validate", error = "ConfigurationError"))]
pub struct ScoreConfig {
    /// Entries where neither score reaches this value are left out of the filtered view
    #[builder(setter(strip_option))]
    score_threshold: Option<f64>,
    /// If true, pairs with equal scores are kept
    include_equal_scores: bool
}

impl ScoreConfigBuilder {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(Some(threshold)) = self.score_threshold {
            if !threshold.is_finite() {
                return Err(ConfigurationError::InvalidThreshold(threshold));
            }
        }
        Ok(())
    }
}

impl ScoreConfig {
    // getters
    pub fn score_threshold(&self) -> Option<f64> {
        self.score_threshold
    }

    pub fn include_equal_scores(&self) -> bool {
        self.include_equal_scores
    }
}

/// Aggregate counts over a set of comparison entries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    /// Number of entries
    pub total: u64,
    /// Entries with different scores, one-sided entries included
    pub differing: u64,
    /// Entries with a score on only one side
    pub one_sided: u64,
    /// Entries where the second score is higher
    pub increased: u64,
    /// Entries where the second score is lower
    pub decreased: u64,
    /// Entries passing the threshold
    pub above_threshold: u64,
    /// Differing entries passing the threshold
    pub differing_above_threshold: u64
}

impl ScoreSummary {
    pub fn from_entries(entries: &[ScoreComparisonEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries.iter() {
            summary.total += 1;
            let differing = !entry.is_concordant();
            if differing {
                summary.differing += 1;
            }
            match entry.delta() {
                None => summary.one_sided += 1,
                Some(d) if d > 0.0 && !entry.is_concordant() => summary.increased += 1,
                Some(d) if d < 0.0 && !entry.is_concordant() => summary.decreased += 1,
                Some(_) => {}
            }
            if entry.passes_threshold() {
                summary.above_threshold += 1;
                if differing {
                    summary.differing_above_threshold += 1;
                }
            }
        }
        summary
    }
}

/// Describes differing sub-scores as "name:first/second", comma-joined; "-" if everything matches.
/// Names are visited in first-record order, followed by any only present in the second record.
pub fn sub_score_summary(first: &IndexMap<String, f64>, second: &IndexMap<String, f64>) -> String {
    let differences: Vec<String> = first.keys()
        .chain(second.keys())
        .unique()
        .filter_map(|name| {
            let s1 = first.get(name).copied();
            let s2 = second.get(name).copied();
            let same = match (s1, s2) {
                (Some(a), Some(b)) => scores_equal(a, b),
                _ => false
            };
            if same {
                None
            } else {
                Some(format!("{name}:{}/{}", format_score(s1), format_score(s2)))
            }
        })
        .collect();

    if differences.is_empty() {
        "-".to_string()
    } else {
        differences.join(",")
    }
}

/// Builds the ordered score comparison for all shared pairs.
/// # Arguments
/// * `shared` - shared pairs from the reconciliation, (first, second)
/// * `config` - threshold and concordance settings
pub fn compare_scores(shared: &[(VariantRecord, VariantRecord)], config: &ScoreConfig) -> Vec<ScoreComparisonEntry> {
    let mut entries: Vec<ScoreComparisonEntry> = shared.iter()
        .enumerate()
        .filter_map(|(shared_index, (r1, r2))| {
            let (s1, s2) = (r1.score(), r2.score());
            match (s1, s2) {
                (None, None) => return None,
                (Some(a), Some(b)) if scores_equal(a, b) && !config.include_equal_scores() => return None,
                _ => {}
            }
            let sub_scores = sub_score_summary(r1.sub_scores(), r2.sub_scores());
            Some(ScoreComparisonEntry::new(
                r1.key().clone(), shared_index, s1, s2, config.score_threshold(), sub_scores
            ))
        })
        .collect();

    entries.sort_by(|a, b| a.cmp_significance(b));
    debug!("Generated {} score comparison entries from {} shared variants", entries.len(), shared.len());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::variants::VariantKey;
    use noodles::core::Position;

    fn record(chrom: &str, pos: usize, score: Option<f64>) -> VariantRecord {
        let key = VariantKey::new(chrom.to_string(), Position::try_from(pos).unwrap(), "A".to_string(), "G".to_string()).unwrap();
        VariantRecord::new(key, None, Default::default()).unwrap()
            .with_score(score)
    }

    fn pair(chrom: &str, pos: usize, s1: Option<f64>, s2: Option<f64>) -> (VariantRecord, VariantRecord) {
        (record(chrom, pos, s1), record(chrom, pos, s2))
    }

    fn locus(entry: &ScoreComparisonEntry) -> (String, usize) {
        (entry.key().chromosome().to_string(), usize::from(entry.key().position()))
    }

    #[test]
    fn test_drops_missing_and_equal() {
        let shared = vec![
            pair("chr1", 100, None, None),
            pair("chr1", 200, Some(5.0), Some(5.0)),
            pair("chr1", 300, Some(5.0), Some(7.0)),
            pair("chr1", 400, None, Some(7.0)),
        ];
        let entries = compare_scores(&shared, &ScoreConfig::default());
        assert_eq!(entries.iter().map(locus).collect::<Vec<_>>(), vec![
            ("chr1".to_string(), 400), ("chr1".to_string(), 300)
        ]);
        assert_eq!(entries[1].shared_index(), 2);
    }

    #[test]
    fn test_include_equal_scores() {
        let shared = vec![
            pair("chr1", 200, Some(5.0), Some(5.0)),
            pair("chr1", 300, Some(5.0), Some(7.0)),
        ];
        let config = ScoreConfigBuilder::default()
            .include_equal_scores(true)
            .build().unwrap();
        let entries = compare_scores(&shared, &config);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].delta(), Some(0.0));
        assert!(entries[1].is_concordant());

        let summary = ScoreSummary::from_entries(&entries);
        assert_eq!(summary, ScoreSummary {
            total: 2, differing: 1, one_sided: 0, increased: 1, decreased: 0,
            above_threshold: 2, differing_above_threshold: 1
        });
    }

    #[test]
    fn test_ordering() {
        let shared = vec![
            pair("chr2", 100, Some(10.0), Some(15.0)),
            pair("chr1", 500, Some(10.0), Some(5.0)),
            pair("chr1", 100, Some(10.0), Some(30.0)),
            pair("chr1", 50, Some(1.0), Some(2.0)),
            pair("chrX", 10, Some(3.0), None),
        ];
        let entries = compare_scores(&shared, &ScoreConfig::default());
        let order: Vec<(String, usize)> = entries.iter().map(locus).collect();
        assert_eq!(order, vec![
            ("chrX".to_string(), 10),
            ("chr1".to_string(), 100),
            ("chr1".to_string(), 500),
            ("chr2".to_string(), 100),
            ("chr1".to_string(), 50),
        ]);

        // reversing the input does not change the result
        let reversed: Vec<_> = shared.into_iter().rev().collect();
        let entries_rev = compare_scores(&reversed, &ScoreConfig::default());
        assert_eq!(entries_rev.iter().map(locus).collect::<Vec<_>>(), order);
    }

    #[test]
    fn test_ordering_all_permutations() {
        let shared = vec![
            pair("chr1", 100, Some(0.0), Some(1.0)),
            pair("chr1", 200, Some(0.0), Some(1.0 + 0.6e-9)),
            pair("chr1", 300, Some(0.0), Some(1.0 + 1.2e-9)),
            pair("chr2", 50, Some(4.0), Some(3.0)),
            pair("chrX", 10, Some(3.0), None),
        ];
        let expected = vec![
            ("chrX".to_string(), 10),
            ("chr1".to_string(), 200),
            ("chr1".to_string(), 300),
            ("chr1".to_string(), 100),
            ("chr2".to_string(), 50),
        ];

        for permutation in (0..shared.len()).permutations(shared.len()) {
            let permuted: Vec<(VariantRecord, VariantRecord)> = permutation.iter()
                .map(|&i| shared[i].clone())
                .collect();
            let entries = compare_scores(&permuted, &ScoreConfig::default());
            assert_eq!(entries.iter().map(locus).collect::<Vec<_>>(), expected, "input order {permutation:?}");
        }
    }

    #[test]
    fn test_threshold_flags() {
        let shared = vec![
            pair("chr1", 100, Some(2.0), Some(3.0)),
            pair("chr1", 200, Some(2.0), Some(9.0)),
        ];
        let config = ScoreConfigBuilder::default()
            .score_threshold(5.0)
            .build().unwrap();
        let entries = compare_scores(&shared, &config);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].passes_threshold());
        assert!(!entries[1].passes_threshold());

        let summary = ScoreSummary::from_entries(&entries);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.above_threshold, 1);
    }

    #[test]
    fn test_invalid_threshold() {
        let result = ScoreConfigBuilder::default()
            .score_threshold(f64::NAN)
            .build();
        assert!(matches!(result, Err(ConfigurationError::InvalidThreshold(_))));
    }

    #[test]
    fn test_sub_score_summary() {
        let mut first = IndexMap::new();
        first.insert("Consequence".to_string(), 3.0);
        first.insert("Conservation".to_string(), 1.0);
        let mut second = IndexMap::new();
        second.insert("Consequence".to_string(), 5.0);
        second.insert("Conservation".to_string(), 1.0);
        second.insert("Inheritance".to_string(), 2.0);
        assert_eq!(sub_score_summary(&first, &second), "Consequence:3/5,Inheritance:/2");
        assert_eq!(sub_score_summary(&first, &first), "-");
    }
}
