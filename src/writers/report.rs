/*!
# Report generator
Renders a reconciliation into console lines and, when an output directory is configured, a set of tab-delimited files.

The console listing is bounded by `max_display` and is always a prefix of the corresponding full list in the files.
Every file is created through an `OutputGuard`, so a failure part way through removes everything written so far.
*/
use anyhow::Context;
use derive_builder::Builder;
use itertools::Itertools;
use log::warn;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::annotation_comparator::{AnnotationComparison, Transition};
use crate::config::ConfigurationError;
use crate::data_types::reconciliation::ReconciliationResult;
use crate::data_types::score_comparison::{format_score, ScoreComparisonEntry};
use crate::data_types::summary_metrics::PresenceMetrics;
use crate::data_types::variants::{truncate, VariantRecord};
use crate::score_comparator::ScoreSummary;
use crate::util::json_io::save_json;
use crate::writers::summary::SummaryWriter;
use crate::writers::table::{
    prettify_rows, presence_header, presence_row, score_header, score_row, sub_score_columns, DEFAULT_PADDING
};

/// Name of the saved settings file inside the output directory
pub const SETTINGS_FILENAME: &str = "cli_settings.json";
/// Maximum number of transitions listed on the console
pub const MAX_TRANSITIONS: usize = 10;

/// Controls what gets rendered and where
#[derive(Builder, Clone, Debug)]
#[builder(default, build_fn(validate = "Self::validate", error = "ConfigurationError"))]
pub struct ReportConfig {
    /// Run label of the first input, used in headers
    #[builder(setter(into))]
    first_label: String,
    /// Run label of the second input, used in headers
    #[builder(setter(into))]
    second_label: String,
    /// Prefix for every output file
    #[builder(setter(into))]
    file_label: String,
    /// Maximum number of rows per console listing
    max_display: usize,
    /// Threshold used for the filtered presence counts and headers
    #[builder(setter(strip_option))]
    score_threshold: Option<f64>,
    /// If true, rows are prefixed with source line numbers
    show_line_numbers: bool,
    /// Directory for the output files; None renders to the console only
    #[builder(setter(into, strip_option))]
    output_dir: Option<PathBuf>,
    /// Extra INFO keys appended as columns
    annotation_columns: Vec<String>
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            first_label: "first".to_string(),
            second_label: "second".to_string(),
            file_label: "vcfdelta".to_string(),
            max_display: 30,
            score_threshold: None,
            show_line_numbers: false,
            output_dir: None,
            annotation_columns: vec![]
        }
    }
}

impl ReportConfigBuilder {
    fn validate(&self) -> Result<(), ConfigurationError> {
        let labels = [
            ("first", &self.first_label),
            ("second", &self.second_label),
            ("file", &self.file_label)
        ];
        for (name, label) in labels.into_iter() {
            if label.as_ref().is_some_and(|l| l.trim().is_empty()) {
                return Err(ConfigurationError::EmptyLabel(name));
            }
        }
        if self.max_display == Some(0) {
            return Err(ConfigurationError::ZeroMaxDisplay);
        }
        if let Some(Some(threshold)) = self.score_threshold {
            if !threshold.is_finite() {
                return Err(ConfigurationError::InvalidThreshold(threshold));
            }
        }
        Ok(())
    }
}

impl ReportConfig {
    // getters
    pub fn first_label(&self) -> &str {
        &self.first_label
    }

    pub fn second_label(&self) -> &str {
        &self.second_label
    }

    pub fn file_label(&self) -> &str {
        &self.file_label
    }

    pub fn max_display(&self) -> usize {
        self.max_display
    }

    pub fn score_threshold(&self) -> Option<f64> {
        self.score_threshold
    }

    pub fn show_line_numbers(&self) -> bool {
        self.show_line_numbers
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn annotation_columns(&self) -> &[String] {
        &self.annotation_columns
    }
}

/// Tracks created files and directories and removes them unless committed
#[derive(Debug, Default)]
pub struct OutputGuard {
    created: Vec<PathBuf>,
    /// Directories made by `create_dir`, innermost first
    created_dirs: Vec<PathBuf>,
    committed: bool
}

impl OutputGuard {
    /// Creates `dir` and any missing parents; only the directories made here are tracked
    pub fn create_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        let missing: Vec<PathBuf> = dir.ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        std::fs::create_dir_all(dir)?;
        self.created_dirs.extend(missing);
        Ok(())
    }

    /// Registers a path that is about to be written and hands it back
    pub fn track(&mut self, path: PathBuf) -> PathBuf {
        self.created.push(path.clone());
        path
    }

    /// Keeps every tracked file and directory and returns the file paths
    pub fn commit(mut self) -> Vec<PathBuf> {
        self.committed = true;
        self.created_dirs.clear();
        std::mem::take(&mut self.created)
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in self.created.iter().filter(|p| p.is_file()) {
            warn!("Removing partial output {path:?}");
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove {path:?}: {e}");
            }
        }
        for dir in self.created_dirs.iter() {
            warn!("Removing partial output directory {dir:?}");
            if let Err(e) = std::fs::remove_dir(dir) {
                warn!("Failed to remove {dir:?}: {e}");
            }
        }
    }
}

/// The rendered report
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedReport {
    /// Lines meant for the console, already aligned
    console_lines: Vec<String>,
    /// Files written to the output directory
    written_files: Vec<PathBuf>
}

impl RenderedReport {
    // getters
    pub fn console_lines(&self) -> &[String] {
        &self.console_lines
    }

    pub fn written_files(&self) -> &[PathBuf] {
        &self.written_files
    }
}

/// Renders reconciliations according to a fixed config
#[derive(Clone, Debug)]
pub struct ReportGenerator {
    config: ReportConfig,
    /// Optional settings saved next to the report
    settings: Option<serde_json::Value>
}

impl ReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            settings: None
        }
    }

    /// Attaches settings that get saved as `cli_settings.json` with the other outputs
    pub fn with_settings<T: Serialize>(mut self, settings: &T) -> anyhow::Result<Self> {
        self.settings = Some(serde_json::to_value(settings)?);
        Ok(self)
    }

    /// Renders the console report and writes the output files, if configured.
    /// # Arguments
    /// * `result` - the reconciliation partitions
    /// * `entries` - score comparison entries, in significance order
    /// * `annotations` - optional annotation comparison
    /// # Errors
    /// * if any output file cannot be written; previously written files are removed
    pub fn render(
        &self, result: &ReconciliationResult, entries: &[ScoreComparisonEntry], annotations: Option<&AnnotationComparison>
    ) -> anyhow::Result<RenderedReport> {
        let mut console_lines = self.warning_lines(result);
        console_lines.extend(self.presence_lines(result));
        console_lines.extend(self.score_lines(result, entries));
        if let Some(annotations) = annotations {
            console_lines.extend(self.annotation_lines(annotations));
        }

        let written_files = match self.config.output_dir() {
            Some(output_dir) => self.write_files(output_dir, result, entries, annotations)?,
            None => vec![]
        };

        Ok(RenderedReport {
            console_lines,
            written_files
        })
    }

    fn labels(&self) -> (&str, &str) {
        (self.config.first_label(), self.config.second_label())
    }

    /// Empty inputs get a banner so they cannot be missed
    fn warning_lines(&self, result: &ReconciliationResult) -> Vec<String> {
        let mut lines = vec![];
        if result.has_empty_input() {
            let banner = "!".repeat(80);
            lines.push(banner.clone());
            for warning in result.warnings().iter().filter(|w| w.is_empty_input()) {
                lines.push(format!("!!! WARNING: {warning}"));
            }
            lines.push(banner);
        }
        for warning in result.warnings().iter().filter(|w| !w.is_empty_input()) {
            lines.push(format!("# Warning: {warning}"));
        }
        lines
    }

    fn presence_table(&self, metrics: &PresenceMetrics) -> Vec<String> {
        let (l1, l2) = self.labels();
        let rows = vec![
            vec!["".to_string(), "total".to_string(), "only".to_string(), "shared".to_string()],
            vec![l1.to_string(), metrics.first_total().to_string(), metrics.first_only.to_string(), metrics.shared.to_string()],
            vec![l2.to_string(), metrics.second_total().to_string(), metrics.second_only.to_string(), metrics.shared.to_string()]
        ];
        prettify_rows(&rows, DEFAULT_PADDING)
    }

    fn presence_lines(&self, result: &ReconciliationResult) -> Vec<String> {
        let (l1, l2) = self.labels();
        let mut lines = vec![format!("# Variant presence, {l1} vs {l2}")];
        lines.extend(self.presence_table(&result.presence_metrics(None)));
        if let Some(threshold) = self.config.score_threshold() {
            lines.push(format!("# Variant presence with score >= {}", format_score(Some(threshold))));
            lines.extend(self.presence_table(&result.presence_metrics(Some(threshold))));
        }

        if result.only_in_first().is_empty() && result.only_in_second().is_empty() {
            lines.push("# No presence differences found".to_string());
            return lines;
        }
        for (label, records) in [(l1, result.only_in_first()), (l2, result.only_in_second())] {
            if records.is_empty() {
                continue;
            }
            lines.push(format!("# First {} only found in {label}", records.len().min(self.config.max_display())));
            let mut rows = vec![presence_header(self.config.show_line_numbers(), self.config.annotation_columns())];
            rows.extend(
                records.iter()
                    .take(self.config.max_display())
                    .map(|r| presence_row(r, self.config.show_line_numbers(), self.config.annotation_columns()))
            );
            lines.extend(prettify_rows(&rows, DEFAULT_PADDING));
        }
        lines
    }

    /// Table rows for a list of entries, in the given order
    fn score_rows<'a>(
        &'a self, result: &'a ReconciliationResult, entries: impl Iterator<Item = &'a ScoreComparisonEntry> + 'a,
        sub_score_names: &'a [String]
    ) -> impl Iterator<Item = Vec<String>> + 'a {
        entries.filter_map(move |entry| {
            result.shared().get(entry.shared_index())
                .map(|pair| score_row(entry, pair, self.config.show_line_numbers(), self.config.annotation_columns(), sub_score_names))
        })
    }

    /// The rows shown on the console: a prefix of the threshold-filtered list
    fn score_display_rows(&self, result: &ReconciliationResult, entries: &[ScoreComparisonEntry]) -> Vec<Vec<String>> {
        let filtered = entries.iter()
            .filter(|e| e.passes_threshold())
            .take(self.config.max_display());
        self.score_rows(result, filtered, &[]).collect()
    }

    fn score_lines(&self, result: &ReconciliationResult, entries: &[ScoreComparisonEntry]) -> Vec<String> {
        if entries.is_empty() {
            return vec!["# No differently scored variants found".to_string()];
        }

        let (l1, l2) = self.labels();
        let summary = ScoreSummary::from_entries(entries);
        let mut lines = vec![format!("# Number differently scored total: {}", summary.differing)];
        if let Some(threshold) = self.config.score_threshold() {
            lines.push(format!(
                "# Number differently scored above {}: {}", format_score(Some(threshold)), summary.differing_above_threshold
            ));
        }
        lines.push(format!(
            "# Total number shared variants: {} ({l1}: {}, {l2}: {})",
            result.shared().len(), result.first_total(), result.second_total()
        ));
        if summary.above_threshold as usize > self.config.max_display() {
            lines.push(format!("# Only printing the {} first", self.config.max_display()));
        }

        let mut rows = vec![score_header(self.labels(), self.config.show_line_numbers(), self.config.annotation_columns(), &[])];
        rows.extend(self.score_display_rows(result, entries));
        lines.extend(prettify_rows(&rows, DEFAULT_PADDING));
        lines
    }

    fn transition_lines(&self, transitions: &[Transition]) -> Vec<String> {
        if transitions.is_empty() {
            return vec!["# No differences found".to_string()];
        }
        let mut lines = vec![];
        if transitions.len() > MAX_TRANSITIONS {
            lines.push(format!("# Truncated at {MAX_TRANSITIONS}"));
        }
        let mut rows = vec![vec!["From".to_string(), "To".to_string(), "Count".to_string()]];
        rows.extend(
            transitions.iter()
                .take(MAX_TRANSITIONS)
                .map(|t| vec![truncate(&t.from), truncate(&t.to), t.count.to_string()])
        );
        lines.extend(prettify_rows(&rows, DEFAULT_PADDING));
        lines
    }

    fn annotation_lines(&self, annotations: &AnnotationComparison) -> Vec<String> {
        let (l1, l2) = self.labels();
        let mut lines = vec![format!(
            "# Annotation comparison, {} of {} shared variants checked", annotations.checked(), annotations.total_shared()
        )];

        for (label, keys) in [(l1, annotations.first_only_keys()), (l2, annotations.second_only_keys())] {
            if !keys.is_empty() {
                let listing = keys.iter().map(|(k, count)| format!("{k} ({count})")).join(", ");
                lines.push(format!("# INFO keys only in {label}: {listing}"));
            }
        }

        if annotations.value_differences().is_empty() {
            lines.push("# No differing INFO values found".to_string());
        } else {
            lines.push(format!("# Differing values in {} INFO keys", annotations.value_differences().len()));
            for (info_key, differences) in annotations.value_differences().iter() {
                if let Some(example) = differences.first() {
                    lines.push(format!(
                        "{info_key}: {} differing, first at {}: {} -> {}",
                        differences.len(), example.key, truncate(&example.first_value), truncate(&example.second_value)
                    ));
                }
            }
        }

        lines.push(format!("# FILTER transitions {l1} to {l2}"));
        lines.extend(self.transition_lines(annotations.filter_transitions()));

        for field in annotations.field_comparisons().iter() {
            lines.push(format!(
                "# {}: {} present in both, {} identical ({} {l1} only, {} {l2} only, {} in neither)",
                field.info_key, field.both_present, field.identical, field.first_only, field.second_only, field.none_present
            ));
            if let Some((m1, m2)) = field.medians {
                lines.push(format!(
                    "# {} median: {l1} {}, {l2} {}", field.info_key, format_score(Some(m1)), format_score(Some(m2))
                ));
            }
            lines.extend(self.transition_lines(&field.transitions));
        }
        lines
    }

    fn output_path(&self, output_dir: &Path, suffix: &str) -> PathBuf {
        output_dir.join(format!("{}_{suffix}", self.config.file_label()))
    }

    fn write_files(
        &self, output_dir: &Path,
        result: &ReconciliationResult, entries: &[ScoreComparisonEntry], annotations: Option<&AnnotationComparison>
    ) -> anyhow::Result<Vec<PathBuf>> {
        let mut guard = OutputGuard::default();
        guard.create_dir(output_dir)
            .with_context(|| format!("Error while creating output directory {output_dir:?}:"))?;

        let show_line_numbers = self.config.show_line_numbers();
        let columns = self.config.annotation_columns();
        let (l1, l2) = self.labels();

        if let Some(settings) = self.settings.as_ref() {
            let filename = guard.track(output_dir.join(SETTINGS_FILENAME));
            save_json(settings, &filename)?;
        }

        // presence of every only-in record, first then second
        let filename = guard.track(self.output_path(output_dir, "presence.tsv"));
        let mut header = vec!["source".to_string()];
        header.extend(presence_header(show_line_numbers, columns));
        let rows = [(l1, result.only_in_first()), (l2, result.only_in_second())].into_iter()
            .flat_map(move |(label, records)| {
                records.iter().map(move |r| labeled_row(label, r, show_line_numbers, columns))
            });
        write_table(&filename, &header, rows)?;

        // score tables, with every sub-score spelled out
        let sub_score_names = sub_score_columns(result.shared());
        let header = score_header(self.labels(), show_line_numbers, columns, &sub_score_names);
        let filename = guard.track(self.output_path(output_dir, "score_all.tsv"));
        write_table(&filename, &header, self.score_rows(result, entries.iter(), &sub_score_names))?;

        let filename = guard.track(self.output_path(output_dir, "score_above_thres.tsv"));
        let filtered = entries.iter().filter(|e| e.passes_threshold());
        write_table(&filename, &header, self.score_rows(result, filtered, &sub_score_names))?;

        // per-type presence summary
        let filename = guard.track(self.output_path(output_dir, "summary.tsv"));
        SummaryWriter::new(self.config.file_label().to_string(), result, self.config.score_threshold())
            .write_summary(&filename)
            .with_context(|| format!("Error while writing summary to {filename:?}:"))?;

        if let Some(annotations) = annotations {
            let filename = guard.track(self.output_path(output_dir, "annotations.tsv"));
            let header: Vec<String> = ["category", "info_key", "first", "second", "count", "example"].iter()
                .map(|s| s.to_string())
                .collect();
            write_table(&filename, &header, annotation_rows(annotations).into_iter())?;
        }

        Ok(guard.commit())
    }
}

fn labeled_row(label: &str, record: &VariantRecord, show_line_numbers: bool, columns: &[String]) -> Vec<String> {
    let mut row = vec![label.to_string()];
    row.extend(presence_row(record, show_line_numbers, columns));
    row
}

/// Flattens the annotation comparison into (category, key, first, second, count, example) rows
fn annotation_rows(annotations: &AnnotationComparison) -> Vec<Vec<String>> {
    let row = |category: &str, info_key: &str, first: &str, second: &str, count: u64, example: String| {
        vec![
            category.to_string(), info_key.to_string(), first.to_string(), second.to_string(), count.to_string(), example
        ]
    };

    let mut rows = vec![];
    for (info_key, count) in annotations.first_only_keys().iter() {
        rows.push(row("first_only_key", info_key, "", "", *count, String::new()));
    }
    for (info_key, count) in annotations.second_only_keys().iter() {
        rows.push(row("second_only_key", info_key, "", "", *count, String::new()));
    }
    for (info_key, differences) in annotations.value_differences().iter() {
        if let Some(example) = differences.first() {
            rows.push(row(
                "value_difference", info_key, &example.first_value, &example.second_value,
                differences.len() as u64, example.key.to_string()
            ));
        }
    }
    for transition in annotations.filter_transitions().iter() {
        rows.push(row("filter_transition", "FILTER", &transition.from, &transition.to, transition.count, String::new()));
    }
    for field in annotations.field_comparisons().iter() {
        let key = field.info_key.as_str();
        rows.push(row("field_both_present", key, "", "", field.both_present, String::new()));
        rows.push(row("field_identical", key, "", "", field.identical, String::new()));
        rows.push(row("field_first_only", key, "", "", field.first_only, String::new()));
        rows.push(row("field_second_only", key, "", "", field.second_only, String::new()));
        rows.push(row("field_none_present", key, "", "", field.none_present, String::new()));
        if let Some((m1, m2)) = field.medians {
            rows.push(row(
                "field_median", key, &format_score(Some(m1)), &format_score(Some(m2)), field.both_present, String::new()
            ));
        }
        for transition in field.transitions.iter() {
            rows.push(row("field_transition", key, &transition.from, &transition.to, transition.count, String::new()));
        }
    }
    rows
}

/// Writes a header and rows as a tab-delimited file
fn write_table(filename: &Path, header: &[String], rows: impl Iterator<Item = Vec<String>>) -> anyhow::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(filename)
        .with_context(|| format!("Error while creating {filename:?}:"))?;
    csv_writer.write_record(header)
        .with_context(|| format!("Error while writing to {filename:?}:"))?;
    for row in rows {
        csv_writer.write_record(&row)
            .with_context(|| format!("Error while writing to {filename:?}:"))?;
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing output to {filename:?}:"))?;
    Ok(())
}
