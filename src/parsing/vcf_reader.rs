
use anyhow::Context;
use derive_builder::Builder;
use indexmap::IndexMap;
use log::{debug, trace};
use noodles::core::Position;
use noodles::vcf;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::data_types::variants::{VariantError, VariantKey, VariantRecord, MISSING_INFO_VALUE};

/// CHROM, POS, ID, REF, ALT
pub const MANDATORY_COLUMNS: usize = 5;
const FILTER_COLUMN: usize = 6;
const INFO_COLUMN: usize = 7;
const END_KEY: &str = "END";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MalformedRecordError {
    #[error("line {line_number}: expected tab-delimited CHROM, POS, ID, REF and ALT columns, found {found} column(s)")]
    MissingColumns { line_number: usize, found: usize },
    #[error("line {line_number}: POS {value:?} is not a positive integer")]
    InvalidPosition { line_number: usize, value: String },
    #[error("line {line_number}: END {value:?} is not a positive integer")]
    InvalidEnd { line_number: usize, value: String },
    #[error("line {line_number}: invalid variant record")]
    InvalidRecord { line_number: usize, source: VariantError },
    #[error("line {line_number}: {field} has {found} values but the header declares {expected} names")]
    SubScoreCount { line_number: usize, field: String, found: usize, expected: usize },
    #[error("line {line_number}: {field} is present but no ##INFO header declares its sub-score names")]
    UndeclaredSubScores { line_number: usize, field: String }
}

impl MalformedRecordError {
    pub fn line_number(&self) -> usize {
        match self {
            MalformedRecordError::MissingColumns { line_number, .. } |
            MalformedRecordError::InvalidPosition { line_number, .. } |
            MalformedRecordError::InvalidEnd { line_number, .. } |
            MalformedRecordError::InvalidRecord { line_number, .. } |
            MalformedRecordError::SubScoreCount { line_number, .. } |
            MalformedRecordError::UndeclaredSubScores { line_number, .. } => *line_number
        }
    }
}

/// Controls which annotations get lifted out of the INFO column
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct ReaderOptions {
    /// INFO key holding the score; values like "family:17" use the part after the last ':'
    #[builder(setter(into))]
    score_field: String,
    /// INFO key holding '|'-separated sub-scores, named by that key's ##INFO description; None skips them
    #[builder(setter(into))]
    sub_score_field: Option<String>,
    /// If true, records keep their 1-based line number
    keep_line_numbers: bool
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            score_field: "RankScore".to_string(),
            sub_score_field: Some("RankResult".to_string()),
            keep_line_numbers: false
        }
    }
}

impl ReaderOptions {
    // getters
    pub fn score_field(&self) -> &str {
        &self.score_field
    }

    pub fn sub_score_field(&self) -> Option<&str> {
        self.sub_score_field.as_deref()
    }

    pub fn keep_line_numbers(&self) -> bool {
        self.keep_line_numbers
    }
}

/// The parts of the VCF header we care about
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VcfHeader {
    /// ##INFO IDs in file order
    info_ids: Vec<String>,
    /// Sub-score names pulled from the Description of the sub-score INFO line
    sub_score_names: Option<Vec<String>>
}

impl VcfHeader {
    /// Collects the INFO IDs and sub-score names from a parsed header
    /// # Arguments
    /// * `header` - the full noodles header
    /// * `sub_score_field` - INFO key whose Description lists the '|'-separated sub-score names
    pub fn from_vcf_header(header: &vcf::Header, sub_score_field: Option<&str>) -> Self {
        let infos = header.infos();
        let sub_score_names = sub_score_field
            .and_then(|field| infos.get(field))
            .map(|info| info.description().split('|').map(|s| s.to_string()).collect());
        Self {
            info_ids: infos.keys().cloned().collect(),
            sub_score_names
        }
    }

    pub fn info_ids(&self) -> &[String] {
        &self.info_ids
    }

    pub fn sub_score_names(&self) -> Option<&[String]> {
        self.sub_score_names.as_deref()
    }
}

/// Wrapper function that handles both gzip compressed and uncompressed text files
/// # Arguments
/// * `filename` - path to the file to open, ".gz" files are decompressed (BGZF included)
pub fn open_text_file(filename: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    let file = File::open(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;
    let reader: Box<dyn BufRead> = if filename.extension().unwrap_or_default() == "gz" {
        Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Splits an INFO column into key/value pairs; flags get MISSING_INFO_VALUE and repeated keys keep the last value.
pub fn parse_info_field(info: &str) -> IndexMap<String, String> {
    let mut info_fields = IndexMap::new();
    if info == "." {
        return info_fields;
    }
    for entry in info.split(';').filter(|e| !e.is_empty()) {
        match entry.split_once('=') {
            Some((key, value)) => info_fields.insert(key.to_string(), value.to_string()),
            None => info_fields.insert(entry.to_string(), MISSING_INFO_VALUE.to_string())
        };
    }
    info_fields
}

/// Parses a score annotation. Values shaped like "family:17" use the text after the last ':'.
/// Returns None for anything that is not a finite number.
pub fn parse_score(value: &str) -> Option<f64> {
    let raw = value.rsplit(':').next()?.trim();
    raw.parse::<f64>().ok().filter(|s| s.is_finite())
}

/// Parses a single data line into a record.
/// # Arguments
/// * `line` - the raw line without its newline
/// * `line_number` - 1-based line number, used for errors and optionally stored
/// * `header` - parsed header, needed for sub-score names
/// * `options` - controls score and sub-score extraction
/// # Errors
/// * if mandatory columns are missing or empty
/// * if POS or END are not positive integers, or END < POS
/// * if sub-scores do not line up with the header declaration
pub fn parse_record(line: &str, line_number: usize, header: &VcfHeader, options: &ReaderOptions) -> Result<VariantRecord, MalformedRecordError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MANDATORY_COLUMNS {
        return Err(MalformedRecordError::MissingColumns { line_number, found: fields.len() });
    }

    let position: Position = fields[1].parse()
        .map_err(|_| MalformedRecordError::InvalidPosition { line_number, value: fields[1].to_string() })?;
    let key = VariantKey::new(fields[0].to_string(), position, fields[3].to_string(), fields[4].to_string())
        .map_err(|source| MalformedRecordError::InvalidRecord { line_number, source })?;

    let filter = fields.get(FILTER_COLUMN)
        .filter(|f| !f.is_empty() && **f != ".")
        .map(|f| f.to_string());
    let info_fields = fields.get(INFO_COLUMN)
        .map(|info| parse_info_field(info))
        .unwrap_or_default();

    let end = match info_fields.get(END_KEY) {
        Some(value) => Some(
            value.parse::<Position>()
                .map_err(|_| MalformedRecordError::InvalidEnd { line_number, value: value.clone() })?
        ),
        None => None
    };

    let score = info_fields.get(options.score_field()).and_then(|v| parse_score(v));

    let mut sub_scores = IndexMap::new();
    if let Some(field) = options.sub_score_field() {
        if let Some(raw_values) = info_fields.get(field) {
            let names = header.sub_score_names()
                .ok_or_else(|| MalformedRecordError::UndeclaredSubScores { line_number, field: field.to_string() })?;
            let values: Vec<&str> = raw_values.split('|').collect();
            if values.len() != names.len() {
                return Err(MalformedRecordError::SubScoreCount {
                    line_number, field: field.to_string(), found: values.len(), expected: names.len()
                });
            }
            for (name, value) in names.iter().zip(values) {
                // non-numeric sub-scores are left out rather than failing the line
                if let Some(v) = parse_score(value) {
                    sub_scores.insert(name.clone(), v);
                }
            }
        }
    }

    let source_line = if options.keep_line_numbers() { Some(line_number) } else { None };
    let record = VariantRecord::new(key, end, info_fields)
        .map_err(|source| MalformedRecordError::InvalidRecord { line_number, source })?
        .with_filter(filter)
        .with_score(score)
        .with_sub_scores(sub_scores)
        .with_source_line(source_line);
    Ok(record)
}

/// A variant file on disk; the header is read once and records can be streamed any number of times.
#[derive(Clone, Debug)]
pub struct VcfFile {
    /// Location of the file
    path: PathBuf,
    /// Parsed header information
    header: VcfHeader,
    /// Parsing options applied to every record
    options: ReaderOptions
}

impl VcfFile {
    /// Opens the file and parses the header lines.
    /// Files without a `##fileformat` line are read as headerless; their `#` lines are plain comments.
    /// # Arguments
    /// * `path` - a .vcf or .vcf.gz file
    /// * `options` - controls which annotations are extracted
    /// # Errors
    /// * if the file cannot be opened or decoded
    /// * if a `##fileformat` header is present but is not a valid VCF header
    pub fn open(path: &Path, options: ReaderOptions) -> anyhow::Result<Self> {
        debug!("Reading header of {path:?}...");
        let reader = open_text_file(path)?;

        let mut raw_header = String::new();
        for line in reader.lines() {
            let line = line.with_context(|| format!("Error while reading header of {path:?}:"))?;
            if !line.starts_with('#') {
                break;
            }
            raw_header.push_str(line.trim_end_matches('\r'));
            raw_header.push('\n');
        }

        let header = if raw_header.starts_with("##fileformat=") {
            let vcf_header: vcf::Header = raw_header.parse()
                .with_context(|| format!("Error while parsing header of {path:?}:"))?;
            VcfHeader::from_vcf_header(&vcf_header, options.sub_score_field())
        } else {
            VcfHeader::default()
        };
        debug!("Found {} INFO header lines in {path:?}", header.info_ids.len());

        Ok(Self {
            path: path.to_path_buf(),
            header,
            options
        })
    }

    /// Starts a fresh pass over the records. Each call re-opens the file; the handle closes when the iterator is dropped.
    /// # Errors
    /// * if the file cannot be re-opened
    pub fn records(&self) -> anyhow::Result<VcfRecordIterator<'_>> {
        let reader = open_text_file(&self.path)?;
        Ok(VcfRecordIterator {
            file: self,
            lines: reader.lines(),
            line_number: 0,
            finished: false
        })
    }

    /// Loads every record into memory, failing on the first malformed line
    pub fn read_all(&self) -> anyhow::Result<Vec<VariantRecord>> {
        let records: Vec<VariantRecord> = self.records()?.collect::<anyhow::Result<_>>()?;
        debug!("Loaded {} variants from {:?}", records.len(), self.path);
        Ok(records)
    }

    // getters
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }
}

/// Lazy record iterator; stops for good after the first error
pub struct VcfRecordIterator<'a> {
    /// Source file, provides header and options
    file: &'a VcfFile,
    /// Line iterator over the open handle
    lines: Lines<Box<dyn BufRead>>,
    /// Last line number read, 1-based
    line_number: usize,
    /// Set after exhaustion or the first error
    finished: bool
}

impl Iterator for VcfRecordIterator<'_> {
    type Item = anyhow::Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(
                        Err(e).with_context(|| format!("Error while reading {:?} after line {}:", self.file.path, self.line_number))
                    );
                },
                None => {
                    self.finished = true;
                    return None;
                }
            };
            self.line_number += 1;

            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            trace!("{:?}:{} => {line}", self.file.path, self.line_number);
            let result = parse_record(line, self.line_number, &self.file.header, &self.file.options)
                .with_context(|| format!("Malformed record in {:?}:", self.file.path));
            if result.is_err() {
                self.finished = true;
            }
            return Some(result);
        }
    }
}
