
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use strum::IntoEnumIterator;

use crate::data_types::reconciliation::ReconciliationResult;
use crate::data_types::summary_metrics::PresenceMetrics;
use crate::data_types::variants::VariantType;

pub const FILTER_ALL: &str = "ALL";
pub const FILTER_ABOVE_THRESHOLD: &str = "ABOVE_THRESHOLD";

/// This is a wrapper for writing out presence stats to a file
#[derive(Default)]
pub struct SummaryWriter {
    /// Comparison label to go on each row
    compare_label: String,
    /// Presence counts over every variant
    all_metrics: PresenceMetrics,
    /// Presence counts over every variant, by type
    variant_all_metrics: BTreeMap<VariantType, PresenceMetrics>,
    /// Presence counts over variants passing the score threshold
    threshold_metrics: PresenceMetrics,
    /// Presence counts over variants passing the score threshold, by type
    variant_threshold_metrics: BTreeMap<VariantType, PresenceMetrics>
}

/// Contains all the data written to each row of our stats file
#[derive(Serialize)]
struct SummaryRow {
    /// User provided label
    compare_label: String,
    /// Any applied filters
    filter: String,
    /// The type of variant represented by this row
    variant_type: String,
    /// Total number of variants in the first input
    first_total: u64,
    /// Total number of variants in the second input
    second_total: u64,
    /// Variants only in the first input
    first_only: u64,
    /// Variants only in the second input
    second_only: u64,
    /// Variants in both
    shared: u64,
    /// shared / first_total
    first_concordance: Option<f64>,
    /// shared / second_total
    second_concordance: Option<f64>,
    /// shared / (first_only + second_only + shared)
    jaccard: Option<f64>
}

impl SummaryRow {
    /// Creates a new row from labels and presence metrics
    pub fn new(compare_label: String, variant_type: String, filter: String, metrics: &PresenceMetrics) -> Self {
        Self {
            compare_label,
            variant_type, filter,
            first_total: metrics.first_total(),
            second_total: metrics.second_total(),
            first_only: metrics.first_only,
            second_only: metrics.second_only,
            shared: metrics.shared,
            first_concordance: metrics.first_concordance(),
            second_concordance: metrics.second_concordance(),
            jaccard: metrics.jaccard()
        }
    }
}

impl SummaryWriter {
    /// Collects the presence stats of a reconciliation
    /// # Arguments
    /// * `compare_label` - label placed on every row
    /// * `result` - the reconciliation to summarize
    /// * `score_threshold` - threshold for the filtered rows, None makes them match the unfiltered ones
    pub fn new(compare_label: String, result: &ReconciliationResult, score_threshold: Option<f64>) -> Self {
        Self {
            compare_label,
            all_metrics: result.presence_metrics(None),
            variant_all_metrics: result.presence_by_type(None),
            threshold_metrics: result.presence_metrics(score_threshold),
            variant_threshold_metrics: result.presence_by_type(score_threshold)
        }
    }

    /// Will write the summary out to the given file path
    /// # Arguments
    /// * `filename` - the filename for the output (tsv/csv)
    pub fn write_summary(&self, filename: &Path) -> csv::Result<()> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;

        // joint indel sub-categories
        let joint_label = "JointIndel".to_string();
        let joint_types = [VariantType::Insertion, VariantType::Deletion, VariantType::Indel];

        write_category(
            &mut csv_writer, self.compare_label.clone(), FILTER_ALL.to_string(),
            &self.all_metrics, &self.variant_all_metrics,
            joint_label.clone(), &joint_types
        )?;

        write_category(
            &mut csv_writer, self.compare_label.clone(), FILTER_ABOVE_THRESHOLD.to_string(),
            &self.threshold_metrics, &self.variant_threshold_metrics,
            joint_label, &joint_types
        )?;

        // save everything
        csv_writer.flush()?;
        Ok(())
    }

    // getters
    pub fn all_metrics(&self) -> &PresenceMetrics {
        &self.all_metrics
    }

    pub fn threshold_metrics(&self) -> &PresenceMetrics {
        &self.threshold_metrics
    }
}

/// Wrapper function for write out everything for a particular filter
/// # Arguments
/// * `csv_writer` - the writer handle
/// * `compare_label` - user provided comparison label, fixed
/// * `filter` - pass through to filter field of row
/// * `full_metrics` - the summary for all variant types
/// * `type_metrics` - variant-specific metrics
/// * `joint_label` - a joint label for a special row
/// * `joint_types` - the variant types that get added together for the joint row
fn write_category(
    csv_writer: &mut csv::Writer<File>,
    compare_label: String, filter: String,
    full_metrics: &PresenceMetrics,
    type_metrics: &BTreeMap<VariantType, PresenceMetrics>,
    joint_label: String, joint_types: &[VariantType],
) -> csv::Result<()> {
    // write the row for all variants
    let all_row = SummaryRow::new(
        compare_label.clone(), "ALL".to_string(), filter.clone(), full_metrics
    );
    csv_writer.serialize(&all_row)?;

    // variant-specific metrics, every type gets a row even when empty
    let mut joint_metrics = PresenceMetrics::default();
    for variant_type in VariantType::iter() {
        let metrics = type_metrics.get(&variant_type).copied().unwrap_or_default();
        let v_row = SummaryRow::new(
            compare_label.clone(), variant_type.as_ref().to_string(), filter.clone(), &metrics
        );
        csv_writer.serialize(&v_row)?;

        if joint_types.contains(&variant_type) {
            joint_metrics += metrics;
        }
    }

    // we also have the joint indel row
    let joint_row = SummaryRow::new(
        compare_label, joint_label, filter, &joint_metrics
    );
    csv_writer.serialize(&joint_row)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::variants::{VariantKey, VariantRecord};
    use noodles::core::Position;

    fn record(pos: usize, alt: &str, score: f64) -> VariantRecord {
        let key = VariantKey::new("chr1".to_string(), Position::try_from(pos).unwrap(), "A".to_string(), alt.to_string()).unwrap();
        VariantRecord::new(key, None, Default::default()).unwrap()
            .with_score(Some(score))
    }

    #[test]
    fn test_write_summary() {
        let result = ReconciliationResult::new(
            vec![record(1, "G", 20.0), record(2, "GT", 1.0)],
            vec![record(3, "C", 1.0)],
            vec![(record(4, "T", 2.0), record(4, "T", 30.0))],
            vec![]
        );
        let writer = SummaryWriter::new("cmp".to_string(), &result, Some(10.0));
        assert_eq!(writer.all_metrics(), &PresenceMetrics::new(2, 1, 1));
        assert_eq!(writer.threshold_metrics(), &PresenceMetrics::new(1, 0, 1));

        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("summary.tsv");
        writer.write_summary(&filename).unwrap();

        let contents = std::fs::read_to_string(&filename).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "compare_label\tfilter\tvariant_type\tfirst_total\tsecond_total\tfirst_only\tsecond_only\tshared\tfirst_concordance\tsecond_concordance\tjaccard");
        // ALL, one row per variant type, and JointIndel for each filter
        assert_eq!(lines.len(), 1 + 2 * 7);
        assert_eq!(lines[1], "cmp\tALL\tALL\t3\t2\t2\t1\t1\t0.3333333333333333\t0.5\t0.25");
        assert_eq!(lines[3], "cmp\tALL\tInsertion\t1\t0\t1\t0\t0\t0.0\t\t0.0");
        assert_eq!(lines[4], "cmp\tALL\tDeletion\t0\t0\t0\t0\t0\t\t\t");
        assert_eq!(lines[7], "cmp\tALL\tJointIndel\t1\t0\t1\t0\t0\t0.0\t\t0.0");
        assert!(lines[8].starts_with("cmp\tABOVE_THRESHOLD\tALL\t2\t1\t1\t0\t1\t"));
    }
}
