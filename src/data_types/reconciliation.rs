
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::data_types::summary_metrics::PresenceMetrics;
use crate::data_types::variants::{VariantRecord, VariantType};

/// Identifies which of the two inputs something came from
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, strum_macros::AsRefStr)]
pub enum InputSide {
    #[strum(serialize = "first")]
    First,
    #[strum(serialize = "second")]
    Second
}

/// Non-fatal conditions found while reconciling; these are reported, never raised
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReconcileWarning {
    /// One side had no variants at all, which usually means an upstream failure
    EmptyInput { side: InputSide },
    /// Identity keys that occurred more than once on a side; only the first occurrence is matched
    DuplicateIdentityKey { side: InputSide, count: usize },
    /// Records on a side without a usable score
    MissingScore { side: InputSide, count: usize }
}

impl fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileWarning::EmptyInput { side } => write!(
                f, "The {} input contains zero variants; this usually indicates an upstream pipeline failure", side.as_ref()
            ),
            ReconcileWarning::DuplicateIdentityKey { side, count } => write!(
                f, "{count} duplicate identity key(s) in the {} input; only the first occurrence of each was matched", side.as_ref()
            ),
            ReconcileWarning::MissingScore { side, count } => write!(
                f, "{count} variant(s) in the {} input have no usable score", side.as_ref()
            )
        }
    }
}

impl ReconcileWarning {
    pub fn is_empty_input(&self) -> bool {
        matches!(self, ReconcileWarning::EmptyInput { .. })
    }
}

/// The partitions produced by matching two variant collections.
/// Partitions keep the order of the input files; shared pairs follow the first input.
#[derive(Clone, Debug, Default)]
pub struct ReconciliationResult {
    /// Variants only present in the first input
    only_in_first: Vec<VariantRecord>,
    /// Variants only present in the second input
    only_in_second: Vec<VariantRecord>,
    /// Pairs with identical identity keys, (first, second)
    shared: Vec<(VariantRecord, VariantRecord)>,
    /// Anything worth flagging that did not stop the comparison
    warnings: Vec<ReconcileWarning>
}

impl ReconciliationResult {
    /// Constructor
    pub fn new(
        only_in_first: Vec<VariantRecord>,
        only_in_second: Vec<VariantRecord>,
        shared: Vec<(VariantRecord, VariantRecord)>,
        warnings: Vec<ReconcileWarning>
    ) -> Self {
        Self {
            only_in_first, only_in_second, shared, warnings
        }
    }

    /// Counts the partitions, optionally only keeping variants that pass `threshold`.
    /// A shared pair passes if either side passes.
    /// # Arguments
    /// * `threshold` - minimum score; None keeps everything
    pub fn presence_metrics(&self, threshold: Option<f64>) -> PresenceMetrics {
        let first_only = self.only_in_first.iter()
            .filter(|r| r.passes_threshold(threshold))
            .count() as u64;
        let second_only = self.only_in_second.iter()
            .filter(|r| r.passes_threshold(threshold))
            .count() as u64;
        let shared = self.shared.iter()
            .filter(|(r1, r2)| r1.passes_threshold(threshold) || r2.passes_threshold(threshold))
            .count() as u64;
        PresenceMetrics::new(first_only, second_only, shared)
    }

    /// Same as `presence_metrics`, but broken down by variant type.
    /// Shared pairs are typed by the first record; identical keys only differ in type when END/SVTYPE annotations disagree.
    pub fn presence_by_type(&self, threshold: Option<f64>) -> BTreeMap<VariantType, PresenceMetrics> {
        let mut by_type: BTreeMap<VariantType, PresenceMetrics> = BTreeMap::new();
        for record in self.only_in_first.iter().filter(|r| r.passes_threshold(threshold)) {
            by_type.entry(record.variant_type()).or_default().first_only += 1;
        }
        for record in self.only_in_second.iter().filter(|r| r.passes_threshold(threshold)) {
            by_type.entry(record.variant_type()).or_default().second_only += 1;
        }
        for (r1, r2) in self.shared.iter() {
            if r1.passes_threshold(threshold) || r2.passes_threshold(threshold) {
                by_type.entry(r1.variant_type()).or_default().shared += 1;
            }
        }
        by_type
    }

    /// Total number of records read from the first input
    pub fn first_total(&self) -> usize {
        self.only_in_first.len() + self.shared.len()
    }

    /// Total number of records read from the second input
    pub fn second_total(&self) -> usize {
        self.only_in_second.len() + self.shared.len()
    }

    pub fn has_empty_input(&self) -> bool {
        self.warnings.iter().any(|w| w.is_empty_input())
    }

    // getters
    pub fn only_in_first(&self) -> &[VariantRecord] {
        &self.only_in_first
    }

    pub fn only_in_second(&self) -> &[VariantRecord] {
        &self.only_in_second
    }

    pub fn shared(&self) -> &[(VariantRecord, VariantRecord)] {
        &self.shared
    }

    pub fn warnings(&self) -> &[ReconcileWarning] {
        &self.warnings
    }
}
