/*!
# Parsing module
Contains the logic for reading variant files into records.
*/
/// Header parsing, record parsing, and lazy record iteration for VCF files
pub mod vcf_reader;
