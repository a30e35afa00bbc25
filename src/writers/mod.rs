/*!
# Writers module
Contains the logic for rendering a reconciliation to the console and to output files.
*/
/// Console report and output files, with rollback on failure
pub mod report;
/// Generates the per-variant-type presence summary file
pub mod summary;
/// Row formatting and column alignment shared by the report tables
pub mod table;
