//! Error types for rust-sqlcompass

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading configuration or analysing a source unit.
///
/// Only build-time inconsistencies and I/O problems are errors. Constructs that
/// cannot be classified with certainty are never errors: they become findings
/// with a review status.
#[derive(Error, Debug)]
pub enum CompassError {
    #[error("Failed to read source file: {path}")]
    SourceReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read project file: {path}")]
    ProjectReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse project file: {path}")]
    ProjectParseError {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Failed to read feature matrix: {path}")]
    MatrixReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Feature matrix parse error in {origin} at line {line}: {message}")]
    MatrixParse {
        origin: String,
        line: usize,
        message: String,
    },

    #[error("Unknown target version '{version}' (known: {known})")]
    UnknownTargetVersion { version: String, known: String },

    /// The dispatcher asked for a key the feature matrix does not define.
    #[error("Feature matrix out of sync: section [{section}]{}", drift_item_suffix(.item))]
    ConfigDrift {
        section: String,
        item: Option<String>,
    },

    /// A finding record would corrupt the record stream.
    #[error("Finding record integrity violation in field '{field}': {record}")]
    IntegrityViolation { field: &'static str, record: String },

    #[error("Failed to write findings to {path}")]
    OutputWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn drift_item_suffix(item: &Option<String>) -> String {
    match item {
        Some(item) => format!(", item '{}'", item),
        None => String::new(),
    }
}

impl CompassError {
    /// Whether this error must abort the analysis of the current unit.
    pub fn is_fatal_for_unit(&self) -> bool {
        matches!(
            self,
            CompassError::ConfigDrift { .. } | CompassError::IntegrityViolation { .. }
        )
    }
}
