//! Semantic classification engine
//!
//! Drives two passes over every batch of a source unit. The first pass
//! ([`pass1`]) records declarations and the quoted-identifier state at each
//! batch start; the second walks each tree through the dispatcher, which
//! looks every construct up in the feature matrix and emits findings.
//!
//! Query findings are queued while a batch is walked and emitted after it,
//! once every query node of the batch has been finalized.

mod context;
pub mod datatype;
mod dispatch;
pub mod error_codes;
pub mod names;
mod object_context;
mod pass1;
pub mod query_context;
pub mod quoted_identifier;
pub mod symbols;

pub use context::AnalysisContext;
pub use error_codes::HandledErrorCode;
pub use names::ResolvedName;

use tracing::{debug, trace};

use crate::error::CompassError;
use crate::features::{sections, FeatureMatrix, Overrides};
use crate::parser::{parse_batch, split_batches, Batch, SyntaxTree};
use crate::report::Finding;

/// Per-run settings of the analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Target version; `None` selects the matrix default.
    pub target_version: Option<String>,
    /// Database the code runs in, for three-part name checks.
    pub default_database: String,
    pub default_schema: String,
    /// `QUOTED_IDENTIFIER` setting at the start of every unit.
    pub quoted_identifier: bool,
    pub overrides: Overrides,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            target_version: None,
            default_database: String::new(),
            default_schema: "dbo".to_string(),
            quoted_identifier: true,
            overrides: Overrides::default(),
        }
    }
}

/// Result of analysing one source unit.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub findings: Vec<Finding>,
    pub batches: usize,
    pub handled_error_codes: Vec<HandledErrorCode>,
    pub target_version: String,
}

/// Analyses one source unit.
///
/// Either every batch is classified or the unit fails as a whole: a fatal
/// error discards the findings collected so far.
pub fn analyze_unit(
    text: &str,
    config: &AnalyzerConfig,
    matrix: &dyn FeatureMatrix,
) -> Result<UnitReport, CompassError> {
    let version = matrix.resolve_version(config.target_version.as_deref())?;
    let batches = split_batches(text);
    let trees: Vec<SyntaxTree> = batches.iter().map(|b| parse_batch(&b.content)).collect();
    debug!(
        batches = batches.len(),
        target_version = %version,
        "analysing unit"
    );

    let mut ctx = AnalysisContext::new(config, matrix, version.clone())?;

    for (index, tree) in trees.iter().enumerate() {
        pass1::collect(&mut ctx, index, tree);
    }

    for (index, (batch, tree)) in batches.iter().zip(&trees).enumerate() {
        ctx.begin_batch(index, batch);
        trace!(
            batch = batch.number,
            start_line = batch.start_line,
            nodes = tree.len(),
            "second pass"
        );
        report_batch_directives(&mut ctx, batch)?;
        dispatch::visit(&mut ctx, tree, tree.root())?;
        ctx.finish_batch();
    }

    let (findings, handled_error_codes) = ctx.into_findings();
    debug!(findings = findings.len(), "unit complete");
    Ok(UnitReport {
        findings,
        batches: batches.len(),
        handled_error_codes,
        target_version: version.to_string(),
    })
}

/// SQLCMD directive lines and `GO <count>` repeats of a batch.
fn report_batch_directives(ctx: &mut AnalysisContext<'_>, batch: &Batch) -> Result<(), CompassError> {
    for directive in &batch.directives {
        let line = directive.line.saturating_sub(batch.start_line) + 1;
        ctx.report(
            sections::SQLCMD_DIRECTIVES,
            &directive.command,
            &directive.text,
            line,
        )?;
    }
    if let Some(count) = batch.repeat {
        let line = batch.content.lines().count() + 1;
        ctx.report_as(
            sections::SQLCMD_DIRECTIVES,
            Some("GO <count>"),
            &format!("GO {}", count),
            &format!("batch repeated {} times", count),
            line,
        )?;
    }
    Ok(())
}
