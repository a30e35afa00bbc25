
use indexmap::IndexMap;
use noodles::core::Position;
use std::cmp::Ordering;
use std::fmt;

/// Display rows cut REF/ALT strings longer than this
pub const TRUNCATE_LENGTH: usize = 30;
/// Value assigned to INFO entries that are flags rather than key=value pairs
pub const MISSING_INFO_VALUE: &str = "<MISSING>";

/// All the variant types we distinguish in summaries
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, strum_macros::AsRefStr, strum_macros::EnumIter)]
pub enum VariantType {
    /// REF and ALT are both length = 1
    Snv=0,
    /// REF length = 1, ALT length > 1
    Insertion,
    /// REF length > 1, ALT length = 1
    Deletion,
    /// REF and ALT lengths > 1
    Indel,
    /// Symbolic or breakend ALT, or tagged with END / SVTYPE
    Structural
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum VariantError {
    #[error("{column} must not be empty")]
    EmptyField { column: &'static str },
    #[error("END ({end}) must be >= POS ({position})")]
    EndBeforeStart { position: usize, end: usize },
}

/// Ordering bucket for chromosome names; autosomes sort numerically, then sex chromosomes, mitochondria, and everything else.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
enum ChromosomeRank<'a> {
    Autosome(u64),
    X,
    Y,
    Mitochondrial,
    Other(&'a str)
}

fn chromosome_rank(chromosome: &str) -> ChromosomeRank<'_> {
    let stripped = chromosome.strip_prefix("chr").unwrap_or(chromosome);
    match stripped {
        "X" => ChromosomeRank::X,
        "Y" => ChromosomeRank::Y,
        "M" | "MT" => ChromosomeRank::Mitochondrial,
        _ => match stripped.parse::<u64>() {
            Ok(n) => ChromosomeRank::Autosome(n),
            Err(_) => ChromosomeRank::Other(chromosome)
        }
    }
}

/// Compares two chromosome names in natural genome order.
/// Names that land in the same bucket (e.g. "1" and "chr1") fall back to a plain string comparison so the order stays total.
pub fn compare_chromosomes(a: &str, b: &str) -> Ordering {
    chromosome_rank(a).cmp(&chromosome_rank(b))
        .then_with(|| a.cmp(b))
}

/// The identity of a called variant: two records are the same variant iff all four fields are equal.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct VariantKey {
    /// Contig name, compared exactly
    chromosome: String,
    /// 1-based start coordinate
    position: Position,
    /// REF allele
    reference: String,
    /// ALT allele, may be symbolic
    alternate: String
}

impl VariantKey {
    /// Creates a new identity key.
    /// # Arguments
    /// * `chromosome` - the contig name
    /// * `position` - the 1-based start coordinate
    /// * `reference` - the REF allele
    /// * `alternate` - the ALT allele
    /// # Errors
    /// * if any of the string fields is empty
    pub fn new(chromosome: String, position: Position, reference: String, alternate: String) -> Result<Self, VariantError> {
        if chromosome.is_empty() {
            return Err(VariantError::EmptyField { column: "CHROM" });
        }
        if reference.is_empty() {
            return Err(VariantError::EmptyField { column: "REF" });
        }
        if alternate.is_empty() {
            return Err(VariantError::EmptyField { column: "ALT" });
        }
        Ok(Self { chromosome, position, reference, alternate })
    }

    /// Locus ordering: natural chromosome order, then position.
    pub fn cmp_locus(&self, other: &Self) -> Ordering {
        compare_chromosomes(&self.chromosome, &other.chromosome)
            .then_with(|| self.position.cmp(&other.position))
    }

    /// Full ordering, locus first and then the alleles
    pub fn cmp_full(&self, other: &Self) -> Ordering {
        self.cmp_locus(other)
            .then_with(|| self.reference.cmp(&other.reference))
            .then_with(|| self.alternate.cmp(&other.alternate))
    }

    // getters
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn alternate(&self) -> &str {
        &self.alternate
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f, "{}:{} {}/{}",
            self.chromosome, self.position, truncate(&self.reference), truncate(&self.alternate)
        )
    }
}

/// Shortens long allele strings for display, appending "..." when cut
pub fn truncate(value: &str) -> String {
    match value.char_indices().nth(TRUNCATE_LENGTH) {
        Some((byte_index, _)) => format!("{}...", &value[..byte_index]),
        None => value.to_string()
    }
}

/// One called variant along with the attributes we compare.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantRecord {
    /// Identity of the variant
    key: VariantKey,
    /// END coordinate, typically only on structural variants
    end: Option<Position>,
    /// FILTER column; None when missing or "."
    filter: Option<String>,
    /// INFO column decoded into key/value pairs, in file order
    info_fields: IndexMap<String, String>,
    /// Score parsed out of the configured INFO key
    score: Option<f64>,
    /// Named sub-scores, in header order
    sub_scores: IndexMap<String, f64>,
    /// Line number in the source file, only retained on request
    source_line: Option<usize>
}

impl VariantRecord {
    /// Creates a new record with no score attached.
    /// # Arguments
    /// * `key` - the identity of the variant
    /// * `end` - optional END coordinate, must be >= the start position
    /// * `info_fields` - parsed INFO column
    /// # Errors
    /// * if `end` is before the start position
    pub fn new(key: VariantKey, end: Option<Position>, info_fields: IndexMap<String, String>) -> Result<Self, VariantError> {
        if let Some(end) = end {
            if end < key.position() {
                return Err(VariantError::EndBeforeStart {
                    position: usize::from(key.position()),
                    end: usize::from(end)
                });
            }
        }

        Ok(Self {
            key,
            end,
            filter: None,
            info_fields,
            score: None,
            sub_scores: Default::default(),
            source_line: None
        })
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = score;
        self
    }

    pub fn with_sub_scores(mut self, sub_scores: IndexMap<String, f64>) -> Self {
        self.sub_scores = sub_scores;
        self
    }

    pub fn with_source_line(mut self, source_line: Option<usize>) -> Self {
        self.source_line = source_line;
        self
    }

    /// Extent of the variant on the reference: `end - position + 1` when END is set, otherwise the REF length.
    pub fn length(&self) -> usize {
        match self.end {
            Some(end) => usize::from(end) - usize::from(self.key.position()) + 1,
            None => self.key.reference().len()
        }
    }

    /// Classifies the record for summary breakdowns
    pub fn variant_type(&self) -> VariantType {
        let alt = self.key.alternate();
        let is_symbolic = alt.starts_with('<') || alt.contains('[') || alt.contains(']');
        if is_symbolic || self.end.is_some() || self.info_fields.contains_key("SVTYPE") {
            return VariantType::Structural;
        }

        match (self.key.reference().len(), alt.len()) {
            (1, 1) => VariantType::Snv,
            (1, _) => VariantType::Insertion,
            (_, 1) => VariantType::Deletion,
            _ => VariantType::Indel
        }
    }

    /// Returns true if the score is at or above `threshold`; a missing threshold lets everything pass.
    pub fn passes_threshold(&self, threshold: Option<f64>) -> bool {
        match threshold {
            None => true,
            Some(t) => self.score.is_some_and(|s| s >= t)
        }
    }

    /// Looks up a single INFO value
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.info_fields.get(key).map(|v| v.as_str())
    }

    // getters
    pub fn key(&self) -> &VariantKey {
        &self.key
    }

    pub fn end(&self) -> Option<Position> {
        self.end
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn info_fields(&self) -> &IndexMap<String, String> {
        &self.info_fields
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn sub_scores(&self) -> &IndexMap<String, f64> {
        &self.sub_scores
    }

    pub fn source_line(&self) -> Option<usize> {
        self.source_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(p: usize) -> Position {
        Position::try_from(p).unwrap()
    }

    fn key(chrom: &str, p: usize, r: &str, a: &str) -> VariantKey {
        VariantKey::new(chrom.to_string(), pos(p), r.to_string(), a.to_string()).unwrap()
    }

    #[test]
    fn test_length_from_end() {
        let record = VariantRecord::new(key("chr1", 100, "N", "<DEL>"), Some(pos(104)), Default::default()).unwrap();
        assert_eq!(record.length(), 5);
        assert_eq!(record.variant_type(), VariantType::Structural);
    }

    #[test]
    fn test_length_from_reference() {
        let record = VariantRecord::new(key("chr1", 100, "ACG", "A"), None, Default::default()).unwrap();
        assert_eq!(record.length(), 3);
        assert_eq!(record.variant_type(), VariantType::Deletion);
    }

    #[test]
    fn test_end_before_start() {
        let result = VariantRecord::new(key("chr1", 100, "A", "<DEL>"), Some(pos(99)), Default::default());
        assert_eq!(result, Err(VariantError::EndBeforeStart { position: 100, end: 99 }));
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(
            VariantKey::new("chr1".to_string(), pos(1), "".to_string(), "A".to_string()),
            Err(VariantError::EmptyField { column: "REF" })
        );
        assert_eq!(
            VariantKey::new("".to_string(), pos(1), "A".to_string(), "C".to_string()),
            Err(VariantError::EmptyField { column: "CHROM" })
        );
    }

    #[test]
    fn test_variant_types() {
        let snv = VariantRecord::new(key("1", 5, "A", "C"), None, Default::default()).unwrap();
        assert_eq!(snv.variant_type(), VariantType::Snv);
        let ins = VariantRecord::new(key("1", 5, "A", "AGT"), None, Default::default()).unwrap();
        assert_eq!(ins.variant_type(), VariantType::Insertion);
        let indel = VariantRecord::new(key("1", 5, "AG", "AGT"), None, Default::default()).unwrap();
        assert_eq!(indel.variant_type(), VariantType::Indel);
        let bnd = VariantRecord::new(key("1", 5, "A", "A]2:300]"), None, Default::default()).unwrap();
        assert_eq!(bnd.variant_type(), VariantType::Structural);

        let mut info = IndexMap::new();
        info.insert("SVTYPE".to_string(), "INS".to_string());
        let tagged = VariantRecord::new(key("1", 5, "A", "AGTTTTT"), None, info).unwrap();
        assert_eq!(tagged.variant_type(), VariantType::Structural);
    }

    #[test]
    fn test_identity_ignores_other_fields() {
        let a = VariantRecord::new(key("chr1", 100, "A", "G"), None, Default::default()).unwrap()
            .with_score(Some(10.0));
        let b = VariantRecord::new(key("chr1", 100, "A", "G"), Some(pos(150)), Default::default()).unwrap()
            .with_score(Some(12.0))
            .with_source_line(Some(42));
        assert_eq!(a.key(), b.key());
        assert_ne!(a, b);

        let c = VariantRecord::new(key("Chr1", 100, "A", "G"), None, Default::default()).unwrap();
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_chromosome_order() {
        let mut names = vec!["chrY", "chr10", "chr2", "chrM", "chrUn_gl000220", "chrX", "chr1"];
        names.sort_by(|a, b| compare_chromosomes(a, b));
        assert_eq!(names, vec!["chr1", "chr2", "chr10", "chrX", "chrY", "chrM", "chrUn_gl000220"]);

        // same bucket falls back to string order
        assert_eq!(compare_chromosomes("1", "chr1"), Ordering::Less);
    }

    #[test]
    fn test_locus_order() {
        let a = key("chr2", 500, "A", "G");
        let b = key("chr10", 100, "A", "G");
        let c = key("chr2", 600, "A", "G");
        assert_eq!(a.cmp_locus(&b), Ordering::Less);
        assert_eq!(a.cmp_locus(&c), Ordering::Less);
        assert_eq!(a.cmp_full(&key("chr2", 500, "A", "T")), Ordering::Less);
    }

    #[test]
    fn test_truncate() {
        let long = "A".repeat(40);
        assert_eq!(truncate(&long), format!("{}...", "A".repeat(30)));
        assert_eq!(truncate("ACGT"), "ACGT");
        assert_eq!(format!("{}", key("chr1", 7, "A", "C")), "chr1:7 A/C");
    }

    #[test]
    fn test_passes_threshold() {
        let record = VariantRecord::new(key("chr1", 100, "A", "G"), None, Default::default()).unwrap()
            .with_score(Some(17.0));
        assert!(record.passes_threshold(None));
        assert!(record.passes_threshold(Some(17.0)));
        assert!(!record.passes_threshold(Some(17.5)));

        let unscored = VariantRecord::new(key("chr1", 100, "A", "G"), None, Default::default()).unwrap();
        assert!(unscored.passes_threshold(None));
        assert!(!unscored.passes_threshold(Some(0.0)));
    }
}
