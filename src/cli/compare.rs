
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::annotation_comparator::AnnotationConfigBuilder;
use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::config::ConfigurationError;
use crate::reconciler::{ReconcileConfig, ReconcileConfigBuilder};
use crate::writers::report::{ReportConfig, ReportConfigBuilder};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct CompareSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    vcfdelta_version: String,

    /// First variant call file (VCF), usually the older run
    #[clap(required = true)]
    #[clap(short = '1')]
    #[clap(long = "first")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub first_vcf_filename: PathBuf,

    /// Second variant call file (VCF)
    #[clap(required = true)]
    #[clap(short = '2')]
    #[clap(long = "second")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub second_vcf_filename: PathBuf,

    /// Run label for the first VCF [default: file name without extensions]
    #[clap(long = "first-label")]
    #[clap(value_name = "LABEL")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "", hide_default_value = true)]
    pub first_label: String,

    /// Run label for the second VCF [default: file name without extensions]
    #[clap(long = "second-label")]
    #[clap(value_name = "LABEL")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "", hide_default_value = true)]
    pub second_label: String,

    /// Optional output directory for the full report files
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_dir: Option<PathBuf>,

    /// Prefix for the report files
    #[clap(long = "label")]
    #[clap(value_name = "LABEL")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "vcfdelta")]
    pub label: String,

    /// INFO key holding the variant score
    #[clap(long = "score-field")]
    #[clap(value_name = "KEY")]
    #[clap(help_heading = Some("Scoring"))]
    #[clap(default_value = "RankScore")]
    pub score_field: String,

    /// INFO key holding '|'-separated sub-scores; an empty value disables sub-scores
    #[clap(long = "sub-score-field")]
    #[clap(value_name = "KEY")]
    #[clap(help_heading = Some("Scoring"))]
    #[clap(default_value = "RankResult")]
    pub sub_score_field: String,

    /// Only variants with a score at or above this value on either side appear in the filtered views
    #[clap(long = "score-threshold")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Scoring"))]
    pub score_threshold: Option<f64>,

    /// Also report shared variants whose scores are identical
    #[clap(long = "all-variants")]
    #[clap(help_heading = Some("Scoring"))]
    pub all_variants: bool,

    /// Maximum number of rows in each console listing
    #[clap(long = "max-display")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Report"))]
    #[clap(default_value = "30")]
    pub max_display: usize,

    /// Prefix rows with the source line numbers
    #[clap(long = "line-numbers")]
    #[clap(help_heading = Some("Report"))]
    pub line_numbers: bool,

    /// INFO keys added as extra report columns, comma-separated
    #[clap(long = "annotations")]
    #[clap(value_name = "KEYS")]
    #[clap(help_heading = Some("Report"))]
    #[clap(value_delimiter = ',')]
    pub annotations: Vec<String>,

    /// Skips the annotation comparison of shared variants
    #[clap(long = "skip-annotations")]
    #[clap(help_heading = Some("Annotations"))]
    pub skip_annotations: bool,

    /// Maximum number of shared variants checked for annotation differences
    #[clap(long = "max-checked-annotations")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Annotations"))]
    #[clap(default_value = "10000")]
    pub max_checked_annotations: usize,

    /// INFO keys that get a detailed presence and value comparison, comma-separated
    #[clap(long = "custom-info")]
    #[clap(value_name = "KEYS")]
    #[clap(help_heading = Some("Annotations"))]
    #[clap(value_delimiter = ',')]
    pub custom_info: Vec<String>,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

/// Derives a run label from a file name, dropping ".gz" and ".vcf"
fn default_label(filename: &Path) -> String {
    let name = filename.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let name = name.strip_suffix(".vcf").unwrap_or(name);
    name.to_string()
}

pub fn check_compare_settings(mut settings: CompareSettings) -> anyhow::Result<CompareSettings> {
    // hard code the version in
    settings.vcfdelta_version = FULL_VERSION.clone();
    info!("vcfdelta version: {:?}", &settings.vcfdelta_version);
    info!("Sub-command: compare");
    info!("Inputs:");

    // check for all the required input files
    check_required_filename(&settings.first_vcf_filename, "First VCF")?;
    check_required_filename(&settings.second_vcf_filename, "Second VCF")?;

    // labels default to the file names, with a suffix when they collide
    if settings.first_label.is_empty() {
        settings.first_label = default_label(&settings.first_vcf_filename);
    }
    if settings.second_label.is_empty() {
        settings.second_label = default_label(&settings.second_vcf_filename);
        if settings.second_label == settings.first_label {
            settings.second_label = format!("{}_2", settings.second_label);
        }
    }

    info!("\tFirst VCF: {:?}", &settings.first_vcf_filename);
    info!("\tFirst label: {:?}", &settings.first_label);
    info!("\tSecond VCF: {:?}", &settings.second_vcf_filename);
    info!("\tSecond label: {:?}", &settings.second_label);

    info!("Scoring:");
    info!("\tScore field: {:?}", &settings.score_field);
    if settings.sub_score_field.is_empty() {
        info!("\tSub-score field: DISABLED");
    } else {
        info!("\tSub-score field: {:?}", &settings.sub_score_field);
    }
    if let Some(threshold) = settings.score_threshold {
        info!("\tScore threshold: {threshold}");
    } else {
        info!("\tScore threshold: None");
    }
    info!("\tEqual scores: {}", if settings.all_variants { "INCLUDED" } else { "EXCLUDED" });

    info!("Annotations:");
    if settings.skip_annotations {
        info!("\tComparison: DISABLED");
    } else {
        info!("\tMax checked: {}", settings.max_checked_annotations);
        if !settings.custom_info.is_empty() {
            info!("\tCustom INFO keys: {:?}", &settings.custom_info);
        }
    }

    // outputs
    info!("Outputs:");
    info!("\tMax display: {}", settings.max_display);
    info!("\tLine numbers: {}", if settings.line_numbers { "ENABLED" } else { "DISABLED" });
    if !settings.annotations.is_empty() {
        info!("\tExtra columns: {:?}", &settings.annotations);
    }
    if let Some(output_dir) = settings.output_dir.as_ref() {
        info!("\tReport label: {:?}", &settings.label);
        info!("\tOutput folder: {output_dir:?}");
    } else {
        info!("\tOutput folder: None");
    }

    Ok(settings)
}

impl CompareSettings {
    /// Builds the reconciliation config from the command line
    pub fn reconcile_config(&self) -> Result<ReconcileConfig, ConfigurationError> {
        let mut builder = ReconcileConfigBuilder::default();
        builder.score_field(self.score_field.clone())
            .sub_score_field((!self.sub_score_field.is_empty()).then(|| self.sub_score_field.clone()))
            .include_equal_scores(self.all_variants)
            .keep_line_numbers(self.line_numbers);
        if let Some(threshold) = self.score_threshold {
            builder.score_threshold(threshold);
        }
        if !self.skip_annotations {
            let annotation_config = AnnotationConfigBuilder::default()
                .max_checked(self.max_checked_annotations)
                .first_label(self.first_label.clone())
                .second_label(self.second_label.clone())
                .custom_info_keys(self.custom_info.clone())
                .build()?;
            builder.annotation(annotation_config);
        }
        builder.build()
    }

    /// Builds the report config from the command line
    pub fn report_config(&self) -> Result<ReportConfig, ConfigurationError> {
        let mut builder = ReportConfigBuilder::default();
        builder.first_label(self.first_label.clone())
            .second_label(self.second_label.clone())
            .file_label(self.label.clone())
            .max_display(self.max_display)
            .show_line_numbers(self.line_numbers)
            .annotation_columns(self.annotations.clone());
        if let Some(threshold) = self.score_threshold {
            builder.score_threshold(threshold);
        }
        if let Some(output_dir) = self.output_dir.as_ref() {
            builder.output_dir(output_dir.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(first: &Path, second: &Path) -> CompareSettings {
        CompareSettings {
            first_vcf_filename: first.to_path_buf(),
            second_vcf_filename: second.to_path_buf(),
            label: "vcfdelta".to_string(),
            score_field: "RankScore".to_string(),
            sub_score_field: "RankResult".to_string(),
            max_display: 30,
            max_checked_annotations: 10000,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_label() {
        assert_eq!(default_label(Path::new("/data/run_a.vcf.gz")), "run_a");
        assert_eq!(default_label(Path::new("run_b.vcf")), "run_b");
        assert_eq!(default_label(Path::new("calls.txt")), "calls.txt");
    }

    #[test]
    fn test_label_collision() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a").join("sample.vcf");
        let second = dir.path().join("b").join("sample.vcf.gz");
        for path in [&first, &second] {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }

        let checked = check_compare_settings(settings(&first, &second)).unwrap();
        assert_eq!(checked.first_label, "sample");
        assert_eq!(checked.second_label, "sample_2");
        assert_eq!(checked.vcfdelta_version, *FULL_VERSION);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("missing.vcf");
        assert!(check_compare_settings(settings(&first, &first)).is_err());
    }

    #[test]
    fn test_configs() {
        let mut s = settings(Path::new("a.vcf"), Path::new("b.vcf"));
        s.first_label = "a".to_string();
        s.second_label = "b".to_string();
        s.score_threshold = Some(12.0);
        s.sub_score_field = String::new();
        s.skip_annotations = true;

        let reconcile_config = s.reconcile_config().unwrap();
        assert_eq!(reconcile_config.score_threshold(), Some(12.0));
        assert!(reconcile_config.annotation().is_none());
        assert_eq!(reconcile_config.reader_options().unwrap().sub_score_field(), None);

        let report_config = s.report_config().unwrap();
        assert_eq!(report_config.first_label(), "a");
        assert_eq!(report_config.output_dir(), None);

        s.max_display = 0;
        assert_eq!(s.report_config().unwrap_err(), ConfigurationError::ZeroMaxDisplay);
        s.max_checked_annotations = 0;
        s.skip_annotations = false;
        assert_eq!(s.reconcile_config().unwrap_err(), ConfigurationError::ZeroMaxChecked);
    }
}
