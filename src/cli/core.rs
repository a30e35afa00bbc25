
use anyhow::bail;
use clap::{Parser, Subcommand};
use chrono::Datelike;
use lazy_static::lazy_static;
use std::path::Path;

use crate::cli::compare::CompareSettings;

lazy_static! {
    /// Stores the full version string we plan to use, which is generated in build.rs
    /// # Examples
    /// * `0.3.1-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.1-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));

    /// Shared after help string containing the legalese.
    pub static ref AFTER_HELP: String = format!("Copyright (C) 2023-{}     vcfdelta contributors
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year());
}

#[derive(Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = &**AFTER_HELP)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

/// vcfdelta, a tool for reconciling two scored variant call sets.
/// Select a subcommand to see more usage information:
#[derive(Subcommand)]
pub enum Commands {
    /// Compares variant presence, scores, and annotations between two VCF files
    Compare(Box<CompareSettings>)
}

pub fn get_cli() -> Cli {
    Cli::parse()
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
pub fn check_required_filename(filename: &Path, label: &str) -> anyhow::Result<()> {
    if !filename.exists() {
        bail!("{} does not exist: \"{}\"", label, filename.display());
    }

    // file exists
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_required_filename() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(check_required_filename(file.path(), "First VCF").is_ok());

        let error = check_required_filename(Path::new("/does/not/exist.vcf"), "First VCF").unwrap_err();
        assert_eq!(error.to_string(), "First VCF does not exist: \"/does/not/exist.vcf\"");
    }

    #[test]
    fn test_parse_compare() {
        let cli = Cli::try_parse_from([
            "vcfdelta", "compare", "-1", "a.vcf", "-2", "b.vcf",
            "--score-threshold", "17", "--annotations", "GENE,DP", "-vv"
        ]).unwrap();
        let Commands::Compare(settings) = cli.command;
        assert_eq!(settings.first_vcf_filename, Path::new("a.vcf"));
        assert_eq!(settings.score_threshold, Some(17.0));
        assert_eq!(settings.annotations, vec!["GENE".to_string(), "DP".to_string()]);
        assert_eq!(settings.verbosity, 2);
        assert_eq!(settings.max_display, 30);
    }
}
