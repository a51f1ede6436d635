//! Findings and their output
//!
//! A [`Finding`] is immutable once the analyzer creates it. Output is an
//! append-only stream of delimited records, one per finding.

mod record;
mod status;
mod summary;

pub use record::{
    decode_record, encode_record, escape_field, unescape_field, DelimitedWriter, Finding,
    FindingSink, RecordSource, FIELD_DELIMITER,
};
pub use status::Status;
pub use summary::{AnalysisSummary, UnitOutcome};
