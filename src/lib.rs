/// Compares INFO and FILTER annotations of shared variants
pub mod annotation_comparator;
/// Command line interface functionality
pub mod cli;
/// Configuration errors shared by all component configs
pub mod config;
/// Contains various shared data types
pub mod data_types;
/// Partitions two variant collections by identity key
pub mod matcher;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Reads and reconciles two variant files end to end
pub mod reconciler;
/// Compares the scores of shared variants
pub mod score_comparator;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
