
/// Partitions and warnings produced by matching two inputs
pub mod reconciliation;
/// Per-variant score comparison entries
pub mod score_comparison;
/// Presence counters and derived concordance metrics
pub mod summary_metrics;
/// Variant identity and record definitions
pub mod variants;
