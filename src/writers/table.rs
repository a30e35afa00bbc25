
use itertools::Itertools;

use crate::data_types::score_comparison::{format_score, ScoreComparisonEntry};
use crate::data_types::variants::{truncate, VariantRecord};

/// Spaces added after the widest cell of each column
pub const DEFAULT_PADDING: usize = 4;

/// Left-aligns every column to its widest cell plus `padding`.
/// Rows may be ragged; missing cells are treated as empty.
/// # Arguments
/// * `rows` - the cells to align, header included if desired
/// * `padding` - extra spaces between columns
pub fn prettify_rows(rows: &[Vec<String>], padding: usize) -> Vec<String> {
    let num_columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut column_widths = vec![0; num_columns];
    for row in rows.iter() {
        for (i, cell) in row.iter().enumerate() {
            column_widths[i] = column_widths[i].max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            let line: String = row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{cell:<width$}", width = column_widths[i] + padding))
                .collect();
            line.trim_end().to_string()
        })
        .collect()
}

/// Header for a table of records from a single input; line numbers lead the row when shown
pub fn presence_header(show_line_numbers: bool, annotation_columns: &[String]) -> Vec<String> {
    let mut header: Vec<String> = vec![];
    if show_line_numbers {
        header.push("line_number".to_string());
    }
    header.extend(["chr", "pos", "ref", "alt"].iter().map(|s| s.to_string()));
    header.push("length".to_string());
    header.push("type".to_string());
    header.push("score".to_string());
    header.extend(annotation_columns.iter().cloned());
    header
}

/// One row describing a single record, matching `presence_header`
pub fn presence_row(record: &VariantRecord, show_line_numbers: bool, annotation_columns: &[String]) -> Vec<String> {
    let key = record.key();
    let mut row = vec![];
    if show_line_numbers {
        row.push(line_number(record));
    }
    row.extend([
        key.chromosome().to_string(),
        usize::from(key.position()).to_string(),
        truncate(key.reference()),
        truncate(key.alternate())
    ]);
    row.push(record.length().to_string());
    row.push(record.variant_type().as_ref().to_string());
    row.push(format_score(record.score()));
    row.extend(annotation_columns.iter().map(|c| record.info_value(c).unwrap_or_default().to_string()));
    row
}

/// Sub-score names over all shared pairs, in first-seen order with the first input visited before the second
pub fn sub_score_columns(shared: &[(VariantRecord, VariantRecord)]) -> Vec<String> {
    shared.iter()
        .flat_map(|(r1, r2)| r1.sub_scores().keys().chain(r2.sub_scores().keys()))
        .unique()
        .cloned()
        .collect()
}

/// Header for the score comparison tables
/// # Arguments
/// * `labels` - run labels of the (first, second) inputs
/// * `show_line_numbers` - adds a leading "first/second" line number column
/// * `annotation_columns` - INFO keys shown for both sides
/// * `sub_score_names` - sub-scores shown for both sides as `r1_<name>` and `r2_<name>`
pub fn score_header(
    labels: (&str, &str), show_line_numbers: bool, annotation_columns: &[String], sub_score_names: &[String]
) -> Vec<String> {
    let mut header: Vec<String> = vec![];
    if show_line_numbers {
        header.push("line_numbers".to_string());
    }
    header.extend(["chr", "pos", "var", "length"].iter().map(|s| s.to_string()));
    header.push(format!("score_{}", labels.0));
    header.push(format!("score_{}", labels.1));
    header.push("delta".to_string());
    header.push("score_diff_summary".to_string());
    for column in annotation_columns.iter() {
        header.push(format!("{}_{column}", labels.0));
        header.push(format!("{}_{column}", labels.1));
    }
    header.extend(sub_score_names.iter().map(|name| format!("r1_{name}")));
    header.extend(sub_score_names.iter().map(|name| format!("r2_{name}")));
    header
}

/// One row describing a score comparison entry, matching `score_header`
/// # Arguments
/// * `entry` - the comparison entry
/// * `pair` - the shared records the entry was built from
/// * `show_line_numbers` - adds a leading "first/second" line number column
/// * `annotation_columns` - INFO keys shown for both sides
/// * `sub_score_names` - sub-scores shown for both sides, empty when missing
pub fn score_row(
    entry: &ScoreComparisonEntry, pair: &(VariantRecord, VariantRecord),
    show_line_numbers: bool, annotation_columns: &[String], sub_score_names: &[String]
) -> Vec<String> {
    let key = entry.key();
    let (r1, r2) = pair;
    let mut row = vec![];
    if show_line_numbers {
        row.push(format!("{}/{}", line_number(r1), line_number(r2)));
    }
    row.extend([
        key.chromosome().to_string(),
        usize::from(key.position()).to_string(),
        format!("{}/{}", truncate(key.reference()), truncate(key.alternate())),
        r1.length().to_string()
    ]);
    row.push(format_score(entry.score_first()));
    row.push(format_score(entry.score_second()));
    row.push(format_score(entry.delta()));
    row.push(entry.sub_score_summary().to_string());
    for column in annotation_columns.iter() {
        row.push(r1.info_value(column).unwrap_or_default().to_string());
        row.push(r2.info_value(column).unwrap_or_default().to_string());
    }
    for record in [r1, r2] {
        row.extend(sub_score_names.iter().map(|name| format_score(record.sub_scores().get(name).copied())));
    }
    row
}

fn line_number(record: &VariantRecord) -> String {
    record.source_line()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::variants::VariantKey;
    use crate::parsing::vcf_reader::parse_info_field;
    use indexmap::IndexMap;
    use noodles::core::Position;

    fn record(alt: &str, score: Option<f64>, line: Option<usize>) -> VariantRecord {
        let key = VariantKey::new("chr1".to_string(), Position::try_from(100).unwrap(), "A".to_string(), alt.to_string()).unwrap();
        VariantRecord::new(key, None, parse_info_field("GENE=BRCA1")).unwrap()
            .with_score(score)
            .with_source_line(line)
    }

    #[test]
    fn test_prettify_rows() {
        let rows = vec![
            vec!["chr".to_string(), "pos".to_string()],
            vec!["chr10".to_string(), "5".to_string()],
            vec!["1".to_string()],
        ];
        let pretty = prettify_rows(&rows, 2);
        assert_eq!(pretty, vec![
            "chr    pos".to_string(),
            "chr10  5".to_string(),
            "1".to_string()
        ]);
        assert!(prettify_rows(&[], DEFAULT_PADDING).is_empty());
    }

    #[test]
    fn test_presence_row() {
        let long_alt = "G".repeat(40);
        let r = record(&long_alt, Some(12.5), Some(8));
        let columns = vec!["GENE".to_string(), "DP".to_string()];
        let header = presence_header(true, &columns);
        let row = presence_row(&r, true, &columns);
        assert_eq!(header.len(), row.len());
        assert_eq!(header[0], "line_number");
        assert_eq!(row, vec![
            "8".to_string(), "chr1".to_string(), "100".to_string(), "A".to_string(), format!("{}...", "G".repeat(30)),
            "1".to_string(), "Insertion".to_string(), "12.5".to_string(),
            "BRCA1".to_string(), "".to_string()
        ]);
    }

    #[test]
    fn test_score_row() {
        let pair = (record("T", Some(10.0), Some(7)), record("T", None, None));
        let entry = ScoreComparisonEntry::new(pair.0.key().clone(), 0, Some(10.0), None, None, "-".to_string());
        let columns = vec!["GENE".to_string()];
        let header = score_header(("run_a", "run_b"), true, &columns, &[]);
        assert_eq!(header, vec![
            "line_numbers", "chr", "pos", "var", "length", "score_run_a", "score_run_b", "delta", "score_diff_summary",
            "run_a_GENE", "run_b_GENE"
        ]);
        let row = score_row(&entry, &pair, true, &columns, &[]);
        assert_eq!(row, vec![
            "7/-", "chr1", "100", "A/T", "1", "10", "", "", "-", "BRCA1", "BRCA1"
        ]);
    }

    #[test]
    fn test_sub_score_columns() {
        let sub_scores = |values: &[(&str, f64)]| -> IndexMap<String, f64> {
            values.iter().map(|(n, v)| (n.to_string(), *v)).collect()
        };
        let key = VariantKey::new("chr2".to_string(), Position::try_from(50).unwrap(), "ACGT".to_string(), "A".to_string()).unwrap();
        let r1 = VariantRecord::new(key.clone(), None, Default::default()).unwrap()
            .with_score(Some(3.0))
            .with_sub_scores(sub_scores(&[("Consequence", 1.0), ("Conservation", 2.0)]));
        let r2 = VariantRecord::new(key.clone(), None, Default::default()).unwrap()
            .with_score(Some(5.0))
            .with_sub_scores(sub_scores(&[("Consequence", 3.0), ("Splicing", 1.5)]));
        let shared = vec![(r1, r2)];

        let names = sub_score_columns(&shared);
        assert_eq!(names, vec!["Consequence", "Conservation", "Splicing"]);

        let entry = ScoreComparisonEntry::new(key, 0, Some(3.0), Some(5.0), None, "Consequence:1/3".to_string());
        let header = score_header(("a", "b"), false, &[], &names);
        let row = score_row(&entry, &shared[0], false, &[], &names);
        assert_eq!(header, vec![
            "chr", "pos", "var", "length", "score_a", "score_b", "delta", "score_diff_summary",
            "r1_Consequence", "r1_Conservation", "r1_Splicing", "r2_Consequence", "r2_Conservation", "r2_Splicing"
        ]);
        assert_eq!(row, vec![
            "chr2", "50", "ACGT/A", "4", "3", "5", "2", "Consequence:1/3",
            "1", "2", "", "3", "", "1.5"
        ]);
    }
}
