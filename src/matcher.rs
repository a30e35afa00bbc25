/*!
# Variant Matcher
Partitions two variant collections into "only in first", "only in second", and shared pairs.
Matching is an exact hash join on the identity key `(chromosome, position, REF, ALT)`; nothing else about a record affects the outcome.

Duplicate identity keys inside one input are allowed.
The first occurrence is the only one eligible for matching, later copies land in the "only in" partition of their own side and are counted in a `DuplicateIdentityKey` warning.

## Example usage
```rust
use noodles::core::Position;
use vcfdelta::data_types::variants::{VariantKey, VariantRecord};
use vcfdelta::matcher::reconcile_variants;

let record = |pos: usize, alt: &str| {
    let key = VariantKey::new(
        "chr1".to_string(), Position::try_from(pos).unwrap(), "A".to_string(), alt.to_string()
    ).unwrap();
    VariantRecord::new(key, None, Default::default()).unwrap()
};

let first = vec![record(100, "G"), record(200, "T")];
let second = vec![record(100, "G"), record(300, "C")];
let result = reconcile_variants(first, second);
assert_eq!(result.shared().len(), 1);
assert_eq!(result.only_in_first().len(), 1);
assert_eq!(result.only_in_second().len(), 1);
```
*/
use log::{debug, warn};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::data_types::reconciliation::{InputSide, ReconcileWarning, ReconciliationResult};
use crate::data_types::variants::{VariantKey, VariantRecord};

/// Counts records whose identity key was already seen earlier in the same input
fn count_duplicates(records: &[VariantRecord]) -> usize {
    let mut seen: HashSet<&VariantKey> = HashSet::default();
    records.iter()
        .filter(|r| !seen.insert(r.key()))
        .count()
}

/// Collects the warnings that only depend on one side's records
fn side_warnings(side: InputSide, records: &[VariantRecord]) -> Vec<ReconcileWarning> {
    let mut warnings = vec![];
    if records.is_empty() {
        warnings.push(ReconcileWarning::EmptyInput { side });
        return warnings;
    }

    let duplicates = count_duplicates(records);
    if duplicates > 0 {
        warnings.push(ReconcileWarning::DuplicateIdentityKey { side, count: duplicates });
    }

    let missing_scores = records.iter().filter(|r| r.score().is_none()).count();
    if missing_scores > 0 {
        warnings.push(ReconcileWarning::MissingScore { side, count: missing_scores });
    }
    warnings
}

/// Reconciles two variant collections into matched and unmatched partitions in O(n+m).
/// # Arguments
/// * `first` - records from the first input, in file order
/// * `second` - records from the second input, in file order
pub fn reconcile_variants(first: Vec<VariantRecord>, second: Vec<VariantRecord>) -> ReconciliationResult {
    let mut warnings = side_warnings(InputSide::First, &first);
    warnings.extend(side_warnings(InputSide::Second, &second));
    for warning in warnings.iter() {
        warn!("{warning}");
    }

    // first occurrence of each key in the second input
    let mut second_lookup: HashMap<VariantKey, usize> = HashMap::default();
    for (index, record) in second.iter().enumerate() {
        second_lookup.entry(record.key().clone()).or_insert(index);
    }

    let mut second_slots: Vec<Option<VariantRecord>> = second.into_iter().map(Some).collect();
    let mut only_in_first = vec![];
    let mut shared = vec![];
    for record in first.into_iter() {
        // removing the key means later duplicates in `first` cannot match again
        match second_lookup.remove(record.key()).and_then(|index| second_slots[index].take()) {
            Some(partner) => shared.push((record, partner)),
            None => only_in_first.push(record)
        }
    }
    let only_in_second: Vec<VariantRecord> = second_slots.into_iter().flatten().collect();

    debug!(
        "Reconciled variants: {} only in first, {} only in second, {} shared",
        only_in_first.len(), only_in_second.len(), shared.len()
    );
    ReconciliationResult::new(only_in_first, only_in_second, shared, warnings)
}
