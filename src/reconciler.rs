/*!
# Reconciler
Runs the full comparison of two variant files: read both sides, match on identity keys, compare scores, and optionally compare annotations.

## Example usage
```no_run
use std::path::Path;
use vcfdelta::reconciler::{reconcile_files, ReconcileConfigBuilder};

let config = ReconcileConfigBuilder::default()
    .score_threshold(17.0)
    .build().unwrap();
let reconciliation = reconcile_files(Path::new("run_a.vcf.gz"), Path::new("run_b.vcf.gz"), &config).unwrap();
println!("{} shared variants", reconciliation.result().shared().len());
```
*/
use anyhow::Context;
use derive_builder::Builder;
use log::{debug, info};
use std::path::Path;

use crate::annotation_comparator::{compare_annotations, AnnotationComparison, AnnotationConfig};
use crate::config::ConfigurationError;
use crate::data_types::reconciliation::ReconciliationResult;
use crate::data_types::score_comparison::ScoreComparisonEntry;
use crate::matcher::reconcile_variants;
use crate::parsing::vcf_reader::{ReaderOptions, ReaderOptionsBuilder, VcfFile};
use crate::score_comparator::{compare_scores, ScoreConfig, ScoreConfigBuilder};

/// Everything needed to reconcile two files
#[derive(Builder, Clone, Debug)]
#[builder(default, build_fn(validate = "Self::validate", error = "ConfigurationError"))]
pub struct ReconcileConfig {
    /// INFO key holding the score
    #[builder(setter(into))]
    score_field: String,
    /// INFO key holding the sub-scores; None disables sub-score parsing
    #[builder(setter(into))]
    sub_score_field: Option<String>,
    /// Threshold for the filtered score view
    #[builder(setter(strip_option))]
    score_threshold: Option<f64>,
    /// If true, shared variants with equal scores are kept in the comparison
    include_equal_scores: bool,
    /// If true, records keep their source line numbers
    keep_line_numbers: bool,
    /// Annotation comparison settings; None skips the comparison
    #[builder(setter(strip_option))]
    annotation: Option<AnnotationConfig>
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            score_field: "RankScore".to_string(),
            sub_score_field: Some("RankResult".to_string()),
            score_threshold: None,
            include_equal_scores: false,
            keep_line_numbers: false,
            annotation: None
        }
    }
}

impl ReconcileConfigBuilder {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.score_field.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(ConfigurationError::EmptyScoreField);
        }
        if let Some(Some(threshold)) = self.score_threshold {
            if !threshold.is_finite() {
                return Err(ConfigurationError::InvalidThreshold(threshold));
            }
        }
        Ok(())
    }
}

impl ReconcileConfig {
    /// Options handed to both file readers
    pub fn reader_options(&self) -> anyhow::Result<ReaderOptions> {
        let options = ReaderOptionsBuilder::default()
            .score_field(self.score_field.clone())
            .sub_score_field(self.sub_score_field.clone())
            .keep_line_numbers(self.keep_line_numbers)
            .build()?;
        Ok(options)
    }

    /// Settings handed to the score comparator
    pub fn score_config(&self) -> Result<ScoreConfig, ConfigurationError> {
        let mut builder = ScoreConfigBuilder::default();
        builder.include_equal_scores(self.include_equal_scores);
        if let Some(threshold) = self.score_threshold {
            builder.score_threshold(threshold);
        }
        builder.build()
    }

    // getters
    pub fn score_field(&self) -> &str {
        &self.score_field
    }

    pub fn score_threshold(&self) -> Option<f64> {
        self.score_threshold
    }

    pub fn annotation(&self) -> Option<&AnnotationConfig> {
        self.annotation.as_ref()
    }
}

/// Output of a full reconciliation
#[derive(Clone, Debug)]
pub struct Reconciliation {
    /// Presence partitions and warnings
    result: ReconciliationResult,
    /// Score comparison entries, most significant first
    entries: Vec<ScoreComparisonEntry>,
    /// Annotation comparison, if it was requested
    annotations: Option<AnnotationComparison>
}

impl Reconciliation {
    // getters
    pub fn result(&self) -> &ReconciliationResult {
        &self.result
    }

    pub fn entries(&self) -> &[ScoreComparisonEntry] {
        &self.entries
    }

    pub fn annotations(&self) -> Option<&AnnotationComparison> {
        self.annotations.as_ref()
    }
}

/// Reads two variant files and reconciles them.
/// # Arguments
/// * `first_path` - the first (usually older) variant file
/// * `second_path` - the second variant file
/// * `config` - reading, scoring, and annotation settings
/// # Errors
/// * if either file cannot be read
/// * if either file contains a malformed record, in which case nothing is returned
pub fn reconcile_files(first_path: &Path, second_path: &Path, config: &ReconcileConfig) -> anyhow::Result<Reconciliation> {
    let reader_options = config.reader_options()?;
    let score_config = config.score_config()?;

    info!("Loading variants from {first_path:?}...");
    let first = VcfFile::open(first_path, reader_options.clone())
        .and_then(|vcf| vcf.read_all())
        .with_context(|| format!("Error while loading variants from {first_path:?}:"))?;
    info!("Loading variants from {second_path:?}...");
    let second = VcfFile::open(second_path, reader_options)
        .and_then(|vcf| vcf.read_all())
        .with_context(|| format!("Error while loading variants from {second_path:?}:"))?;
    info!("Loaded {} and {} variants.", first.len(), second.len());

    let result = reconcile_variants(first, second);
    let entries = compare_scores(result.shared(), &score_config);
    let annotations = config.annotation().map(|annotation_config| {
        debug!("Comparing annotations...");
        compare_annotations(result.shared(), annotation_config)
    });

    Ok(Reconciliation {
        result,
        entries,
        annotations
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation_comparator::AnnotationConfigBuilder;
    use crate::data_types::reconciliation::{InputSide, ReconcileWarning};
    use crate::parsing::vcf_reader::MalformedRecordError;
    use std::io::Write;
    use std::path::PathBuf;

    const HEADER: &str = "##fileformat=VCFv4.2
##INFO=<ID=RankScore,Number=.,Type=String,Description=\"The rank score for this variant\">
##INFO=<ID=RankResult,Number=.,Type=String,Description=\"Consequence|Conservation\">
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
";

    fn write_vcf(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_three_variant_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_vcf(&dir, "first.vcf", "\
chr1\t100\t.\tA\tG\t.\tPASS\tRankScore=fam:10;RankResult=3|1;DP=20
chr1\t200\t.\tC\tT\t.\tPASS\tRankScore=fam:20;RankResult=5|2
");
        let second = write_vcf(&dir, "second.vcf", "\
chr1\t100\t.\tA\tG\t.\tPASS\tRankScore=fam:12;RankResult=5|1;DP=25
chr1\t300\t.\tG\tA\t.\tPASS\tRankScore=fam:5;RankResult=1|1
");

        let config = ReconcileConfigBuilder::default()
            .annotation(AnnotationConfig::default())
            .build().unwrap();
        let reconciliation = reconcile_files(&first, &second, &config).unwrap();
        let result = reconciliation.result();
        assert_eq!(result.only_in_first().len(), 1);
        assert_eq!(usize::from(result.only_in_first()[0].key().position()), 200);
        assert_eq!(result.only_in_second().len(), 1);
        assert_eq!(usize::from(result.only_in_second()[0].key().position()), 300);
        assert_eq!(result.shared().len(), 1);

        let entries = reconciliation.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].delta(), Some(2.0));
        assert_eq!(entries[0].sub_score_summary(), "Consequence:3/5");

        let annotations = reconciliation.annotations().unwrap();
        assert_eq!(annotations.checked(), 1);
        let differing: Vec<&String> = annotations.value_differences().keys().collect();
        assert_eq!(differing, vec!["RankScore", "RankResult", "DP"]);
    }

    #[test]
    fn test_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_vcf(&dir, "first.vcf", "\
chr1\t100\t.\tA\tG\t.\tPASS\tRankScore=fam:10
chr1\t200\t.\tC\tT\t.\tPASS\tRankScore=fam:2
");
        let second = write_vcf(&dir, "second.vcf", "\
chr1\t100\t.\tA\tG\t.\tPASS\tRankScore=fam:12
chr1\t200\t.\tC\tT\t.\tPASS\tRankScore=fam:3
");
        let config = ReconcileConfigBuilder::default()
            .score_threshold(5.0)
            .build().unwrap();
        let reconciliation = reconcile_files(&first, &second, &config).unwrap();
        let passing: Vec<usize> = reconciliation.entries().iter()
            .filter(|e| e.passes_threshold())
            .map(|e| usize::from(e.key().position()))
            .collect();
        assert_eq!(passing, vec![100]);
        assert!(reconciliation.annotations().is_none());
    }

    #[test]
    fn test_empty_second_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_vcf(&dir, "first.vcf", "\
chr1\t100\t.\tA\tG\t.\tPASS\tRankScore=fam:10
chr2\t100\t.\tA\tG\t.\tPASS\tRankScore=fam:10
");
        let second = write_vcf(&dir, "second.vcf", "");
        let reconciliation = reconcile_files(&first, &second, &ReconcileConfig::default()).unwrap();
        let result = reconciliation.result();
        assert_eq!(result.only_in_first().len(), 2);
        assert!(result.shared().is_empty());
        assert_eq!(result.warnings(), &[ReconcileWarning::EmptyInput { side: InputSide::Second }]);
        assert!(reconciliation.entries().is_empty());
    }

    #[test]
    fn test_malformed_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_vcf(&dir, "first.vcf", "\
chr1\t100\t.\tA\tG\t.\tPASS\tRankScore=fam:10
chr1\tabc\t.\tA\tG\t.\tPASS\tRankScore=fam:10
");
        let second = write_vcf(&dir, "second.vcf", "");
        let error = reconcile_files(&first, &second, &ReconcileConfig::default()).unwrap_err();
        let malformed = error.chain()
            .find_map(|e| e.downcast_ref::<MalformedRecordError>())
            .unwrap();
        assert_eq!(malformed.line_number(), 7);
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            ReconcileConfigBuilder::default().score_field("").build(),
            Err(ConfigurationError::EmptyScoreField)
        ));
        assert!(matches!(
            ReconcileConfigBuilder::default().score_threshold(f64::INFINITY).build(),
            Err(ConfigurationError::InvalidThreshold(_))
        ));

        let config = ReconcileConfigBuilder::default()
            .score_field("CADD")
            .annotation(AnnotationConfigBuilder::default().max_checked(5).build().unwrap())
            .build().unwrap();
        assert_eq!(config.score_field(), "CADD");
        assert_eq!(config.reader_options().unwrap().score_field(), "CADD");
        assert_eq!(config.annotation().unwrap().max_checked(), 5);
    }
}
