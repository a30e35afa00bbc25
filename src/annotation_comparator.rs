/*!
# Annotation Comparator
Looks at the INFO and FILTER columns of shared variants and summarizes how they changed between the two inputs.

Pipeline outputs frequently embed their own run identifier in annotation values (e.g. file paths or sample tags).
Before values are compared, each side's run label is replaced with `RUNID` so those differences do not drown out real ones.
*/
use derive_builder::Builder;
use indexmap::IndexMap;
use log::debug;
use rustc_hash::FxHashMap as HashMap;
use std::collections::BTreeMap;

use crate::config::ConfigurationError;
use crate::data_types::variants::{VariantKey, VariantRecord};
use crate::parsing::vcf_reader::parse_score;

/// Stand-in for a run label inside annotation values
pub const RUN_ID_PLACEHOLDER: &str = "RUNID";
/// Placeholder for a missing FILTER value
pub const MISSING_FILTER: &str = ".";

/// Controls the annotation comparison
#[derive(Builder, Clone, Debug)]
#[builder(default, build_fn(validate = "Self::validate", error = "ConfigurationError"))]
pub struct AnnotationConfig {
    /// Number of shared variants to check for key/value differences
    max_checked: usize,
    /// Run label of the first input, masked in its annotation values
    #[builder(setter(into))]
    first_label: String,
    /// Run label of the second input, masked in its annotation values
    #[builder(setter(into))]
    second_label: String,
    /// INFO keys that get a detailed presence / value comparison over all shared variants
    custom_info_keys: Vec<String>
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            max_checked: 10000,
            first_label: String::new(),
            second_label: String::new(),
            custom_info_keys: vec![]
        }
    }
}

impl AnnotationConfigBuilder {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_checked == Some(0) {
            return Err(ConfigurationError::ZeroMaxChecked);
        }
        Ok(())
    }
}

impl AnnotationConfig {
    // getters
    pub fn max_checked(&self) -> usize {
        self.max_checked
    }

    pub fn custom_info_keys(&self) -> &[String] {
        &self.custom_info_keys
    }
}

/// A single differing annotation value
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationDifference {
    /// The variant where it was observed
    pub key: VariantKey,
    /// Masked value in the first input
    pub first_value: String,
    /// Masked value in the second input
    pub second_value: String
}

/// How often one value turned into another
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub count: u64
}

/// Presence and value comparison of one INFO key across all shared variants
#[derive(Clone, Debug, PartialEq)]
pub struct FieldComparison {
    /// The INFO key
    pub info_key: String,
    /// Pairs where neither side has the key
    pub none_present: u64,
    /// Pairs where only the first side has the key
    pub first_only: u64,
    /// Pairs where only the second side has the key
    pub second_only: u64,
    /// Pairs where both sides have the key
    pub both_present: u64,
    /// Pairs with identical values
    pub identical: u64,
    /// Per-side medians, only when every paired value is numeric
    pub medians: Option<(f64, f64)>,
    /// Value transitions among differing pairs
    pub transitions: Vec<Transition>
}

/// Everything the annotation comparison found
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationComparison {
    /// Number of shared pairs checked for key/value differences
    checked: usize,
    /// Number of shared pairs available
    total_shared: usize,
    /// INFO keys only seen in the first record of a pair, with counts
    first_only_keys: BTreeMap<String, u64>,
    /// INFO keys only seen in the second record of a pair, with counts
    second_only_keys: BTreeMap<String, u64>,
    /// Differing values grouped by INFO key, keys in order of first difference
    value_differences: IndexMap<String, Vec<AnnotationDifference>>,
    /// FILTER changes across all shared pairs
    filter_transitions: Vec<Transition>,
    /// Detailed comparisons for the requested INFO keys
    field_comparisons: Vec<FieldComparison>
}

impl AnnotationComparison {
    // getters
    pub fn checked(&self) -> usize {
        self.checked
    }

    pub fn total_shared(&self) -> usize {
        self.total_shared
    }

    pub fn first_only_keys(&self) -> &BTreeMap<String, u64> {
        &self.first_only_keys
    }

    pub fn second_only_keys(&self) -> &BTreeMap<String, u64> {
        &self.second_only_keys
    }

    pub fn value_differences(&self) -> &IndexMap<String, Vec<AnnotationDifference>> {
        &self.value_differences
    }

    pub fn filter_transitions(&self) -> &[Transition] {
        &self.filter_transitions
    }

    pub fn field_comparisons(&self) -> &[FieldComparison] {
        &self.field_comparisons
    }
}

/// Replaces the run label inside a value; empty labels are left alone
fn mask_label(value: &str, label: &str) -> String {
    if label.is_empty() {
        value.to_string()
    } else {
        value.replace(label, RUN_ID_PLACEHOLDER)
    }
}

/// Counts differing (from, to) pairs, most frequent first; ties sort by text so output is stable
pub fn count_transitions<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<Transition> {
    let mut counts: HashMap<(&str, &str), u64> = HashMap::default();
    for (from, to) in pairs.filter(|(a, b)| a != b) {
        *counts.entry((from, to)).or_default() += 1;
    }

    let mut transitions: Vec<Transition> = counts.into_iter()
        .map(|((from, to), count)| Transition { from: from.to_string(), to: to.to_string(), count })
        .collect();
    transitions.sort_by(|a, b| {
        b.count.cmp(&a.count)
            .then_with(|| a.from.cmp(&b.from))
            .then_with(|| a.to.cmp(&b.to))
    });
    transitions
}

/// Median of a list of values, None when empty
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Compares one INFO key across every shared pair
fn compare_field(info_key: &str, shared: &[(VariantRecord, VariantRecord)]) -> FieldComparison {
    let mut comparison = FieldComparison {
        info_key: info_key.to_string(),
        none_present: 0, first_only: 0, second_only: 0, both_present: 0, identical: 0,
        medians: None,
        transitions: vec![]
    };

    let mut paired_values: Vec<(&str, &str)> = vec![];
    for (r1, r2) in shared.iter() {
        match (r1.info_value(info_key), r2.info_value(info_key)) {
            (None, None) => comparison.none_present += 1,
            (Some(_), None) => comparison.first_only += 1,
            (None, Some(_)) => comparison.second_only += 1,
            (Some(v1), Some(v2)) => {
                comparison.both_present += 1;
                if v1 == v2 {
                    comparison.identical += 1;
                }
                paired_values.push((v1, v2));
            }
        }
    }

    // medians only make sense if every value on both sides parses
    let numeric: Option<Vec<(f64, f64)>> = paired_values.iter()
        .map(|(v1, v2)| Some((parse_score(v1)?, parse_score(v2)?)))
        .collect();
    if let Some(numeric) = numeric.filter(|n| !n.is_empty()) {
        let first: Vec<f64> = numeric.iter().map(|(a, _)| *a).collect();
        let second: Vec<f64> = numeric.iter().map(|(_, b)| *b).collect();
        comparison.medians = median(&first).zip(median(&second));
    }

    comparison.transitions = count_transitions(paired_values.into_iter());
    comparison
}

/// Compares annotations among shared variants.
/// # Arguments
/// * `shared` - shared pairs from the reconciliation, (first, second)
/// * `config` - limits, run labels, and custom INFO keys
pub fn compare_annotations(shared: &[(VariantRecord, VariantRecord)], config: &AnnotationConfig) -> AnnotationComparison {
    let mut comparison = AnnotationComparison {
        total_shared: shared.len(),
        ..Default::default()
    };

    for (r1, r2) in shared.iter().take(config.max_checked()) {
        comparison.checked += 1;
        for (info_key, v1) in r1.info_fields().iter() {
            match r2.info_value(info_key) {
                None => *comparison.first_only_keys.entry(info_key.clone()).or_default() += 1,
                Some(v2) => {
                    let first_value = mask_label(v1, &config.first_label);
                    let second_value = mask_label(v2, &config.second_label);
                    if first_value != second_value {
                        comparison.value_differences.entry(info_key.clone()).or_default()
                            .push(AnnotationDifference { key: r1.key().clone(), first_value, second_value });
                    }
                }
            }
        }
        for info_key in r2.info_fields().keys() {
            if r1.info_value(info_key).is_none() {
                *comparison.second_only_keys.entry(info_key.clone()).or_default() += 1;
            }
        }
    }
    debug!("Checked annotations for {} of {} shared variants", comparison.checked, comparison.total_shared);

    comparison.filter_transitions = count_transitions(
        shared.iter().map(|(r1, r2)| (r1.filter().unwrap_or(MISSING_FILTER), r2.filter().unwrap_or(MISSING_FILTER)))
    );

    comparison.field_comparisons = config.custom_info_keys().iter()
        .map(|info_key| compare_field(info_key, shared))
        .collect();

    comparison
}
