//! rust-sqlcompass: T-SQL portability assessment
//!
//! Classifies every construct of SQL Server scripts against a versioned
//! feature-support matrix and writes one delimited record per finding.

pub mod analyzer;
pub mod error;
pub mod features;
pub mod input;
pub mod parser;
pub mod report;
pub mod util;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

pub use analyzer::{AnalyzerConfig, UnitReport};
pub use error::CompassError;
pub use features::{ConfigMatrix, FeatureMatrix, Overrides};
pub use report::{AnalysisSummary, Finding, Status};

use input::SourceInput;
use report::{DelimitedWriter, FindingSink, RecordSource};

/// Minimum number of units to benefit from parallel analysis.
/// Below this threshold, sequential processing is faster due to rayon overhead.
const PARALLEL_THRESHOLD: usize = 8;

/// Options for an assessment run
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Files, directories, glob patterns or .sqlproj files
    pub inputs: Vec<String>,
    /// Destination of the finding records (stdout when absent)
    pub output_path: Option<PathBuf>,
    /// Application name written into every record
    pub application: String,
    /// Target version (defaults to the newest in the matrix)
    pub target_version: Option<String>,
    pub default_database: String,
    pub default_schema: String,
    pub quoted_identifier: bool,
    /// Feature matrix file (the embedded matrix when absent)
    pub matrix_path: Option<PathBuf>,
    pub overrides_path: Option<PathBuf>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output_path: None,
            application: String::new(),
            target_version: None,
            default_database: String::new(),
            default_schema: "dbo".to_string(),
            quoted_identifier: true,
            matrix_path: None,
            overrides_path: None,
        }
    }
}

/// Analyse one source unit.
///
/// Findings are returned only when every batch was classified; a fatal
/// condition yields the error and no findings.
pub fn analyze_sql(
    text: &str,
    config: &AnalyzerConfig,
    matrix: &dyn FeatureMatrix,
) -> Result<UnitReport, CompassError> {
    analyzer::analyze_unit(text, config, matrix)
}

/// Load the feature matrix from `path`, or the embedded one.
pub fn load_matrix(path: Option<&Path>) -> Result<ConfigMatrix, CompassError> {
    match path {
        Some(path) => ConfigMatrix::load(path),
        None => ConfigMatrix::embedded(),
    }
}

fn unit_config(options: &AnalyzeOptions, overrides: &Overrides, source: &SourceInput) -> AnalyzerConfig {
    let mut config = AnalyzerConfig {
        target_version: options.target_version.clone(),
        default_database: options.default_database.clone(),
        default_schema: options.default_schema.clone(),
        quoted_identifier: options.quoted_identifier,
        overrides: overrides.clone(),
    };
    if let Some(project) = &source.project {
        config.default_schema = project.default_schema.clone();
        config.quoted_identifier = project.quoted_identifier;
    }
    config
}

fn analyze_source(
    source: &SourceInput,
    options: &AnalyzeOptions,
    overrides: &Overrides,
    matrix: &ConfigMatrix,
) -> Result<UnitReport, CompassError> {
    debug!(path = %source.path.display(), "unit start");
    let text = input::read_source(&source.path)?;
    let config = unit_config(options, overrides, source);
    let report = analyze_sql(&text, &config, matrix)?;
    debug!(
        path = %source.path.display(),
        batches = report.batches,
        findings = report.findings.len(),
        "unit end"
    );
    Ok(report)
}

/// Run an assessment over every input of `options`.
///
/// Units are analysed independently; a unit that fails contributes no
/// records and is listed as failed in the summary.
pub fn run_analysis(options: AnalyzeOptions) -> Result<AnalysisSummary> {
    let matrix = load_matrix(options.matrix_path.as_deref())?;
    let overrides = match &options.overrides_path {
        Some(path) => Overrides::load(path)?,
        None => Overrides::default(),
    };
    let version = matrix.resolve_version(options.target_version.as_deref())?;

    let sources = input::discover(&options.inputs)?;
    info!(
        units = sources.len(),
        target_version = %version,
        matrix = matrix.origin(),
        sections = matrix.section_count(),
        "starting assessment"
    );

    let results: Vec<Result<UnitReport, CompassError>> = if sources.len() >= PARALLEL_THRESHOLD {
        sources
            .par_iter()
            .map(|source| analyze_source(source, &options, &overrides, &matrix))
            .collect()
    } else {
        sources
            .iter()
            .map(|source| analyze_source(source, &options, &overrides, &matrix))
            .collect()
    };

    let out: Box<dyn Write> = match &options.output_path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    let destination = options
        .output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("<stdout>"));
    let mut writer = DelimitedWriter::new(out, destination);

    let mut summary = AnalysisSummary::new(version.to_string());
    for (source, result) in sources.iter().zip(results) {
        let file = source.path.display().to_string();
        let record_source = RecordSource {
            application: &options.application,
            file: &file,
        };
        let encoded = result.and_then(|report| {
            let mut records: Vec<String> = Vec::with_capacity(report.findings.len());
            for finding in &report.findings {
                records.emit(finding, &record_source)?;
            }
            Ok((report, records))
        });
        match encoded {
            Ok((report, records)) => {
                writer.write_records(&records)?;
                summary.record_success(
                    file,
                    report.batches,
                    &report.findings,
                    report.handled_error_codes.iter().map(|c| c.code.to_string()),
                );
            }
            Err(e) => {
                if e.is_fatal_for_unit() {
                    error!(path = %file, error = %e, "unit aborted");
                } else {
                    warn!(path = %file, error = %e, "unit skipped");
                }
                summary.record_failure(file, e.to_string());
            }
        }
    }
    writer.flush()?;

    info!(
        records = writer.records_written(),
        failed = summary.failed_units(),
        "assessment complete"
    );
    Ok(summary)
}
