//! Per-unit analysis state threaded through both passes

use tracing::trace;

use super::datatype::TypeEnv;
use super::error_codes::{ErrorCodeTracker, HandledErrorCode};
use super::names::ResolvedName;
use super::object_context::ObjectContext;
use super::query_context::QueryContextStack;
use super::quoted_identifier::QuotedIdentifierTracker;
use super::symbols::SymbolTable;
use super::AnalyzerConfig;
use crate::error::CompassError;
use crate::features::{sections, FeatureMatrix, Overrides, Version};
use crate::parser::Batch;
use crate::report::{Finding, Status};
use crate::util::{collapse_whitespace, truncate_chars};

/// Longest detail text kept in a finding.
const DETAIL_MAX_CHARS: usize = 200;

/// Everything the classification of one source unit reads and mutates.
///
/// A fresh context is built per unit: schema-level symbols accumulate across
/// the unit's batches, per-batch state is reset by [`Self::begin_batch`].
pub struct AnalysisContext<'a> {
    pub matrix: &'a dyn FeatureMatrix,
    overrides: &'a Overrides,
    pub version: Version,
    pub default_schema: String,
    pub current_database: String,
    pub symbols: SymbolTable,
    pub quoted: QuotedIdentifierTracker,
    pub queries: QueryContextStack,
    pub error_codes: ErrorCodeTracker,
    pub objects: ObjectContext,
    pub handled_codes: Vec<HandledErrorCode>,
    identifier_limit: i64,
    special_columns: Vec<String>,
    findings: Vec<Finding>,
    pending: Vec<Finding>,
    batch_number: usize,
    batch_start_line: usize,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        config: &'a AnalyzerConfig,
        matrix: &'a dyn FeatureMatrix,
        version: Version,
    ) -> Result<Self, CompassError> {
        let identifier_limit = matrix.int_limit(sections::MAX_IDENTIFIER_LENGTH)?;
        let special_columns = matrix.value_list(sections::SPECIAL_COLUMN_NAMES)?;
        Ok(Self {
            matrix,
            overrides: &config.overrides,
            version,
            default_schema: config.default_schema.clone(),
            current_database: config.default_database.clone(),
            symbols: SymbolTable::new(),
            quoted: QuotedIdentifierTracker::new(config.quoted_identifier),
            queries: QueryContextStack::new(),
            error_codes: ErrorCodeTracker::new(),
            objects: ObjectContext::new(),
            handled_codes: Vec::new(),
            identifier_limit,
            special_columns,
            findings: Vec::new(),
            pending: Vec::new(),
            batch_number: 0,
            batch_start_line: 1,
        })
    }

    /// Switches to batch `index` for the second pass.
    pub fn begin_batch(&mut self, index: usize, batch: &Batch) {
        self.batch_number = batch.number;
        self.batch_start_line = batch.start_line;
        self.symbols.enter_batch(index);
        self.quoted.begin_batch(index);
        self.error_codes.begin_batch();
        self.queries.clear();
        self.objects.clear();
    }

    /// Emits the findings queued by query nodes, after the batch's own.
    pub fn finish_batch(&mut self) {
        trace!(
            batch = self.batch_number,
            queued = self.pending.len(),
            "flushing query findings"
        );
        self.findings.append(&mut self.pending);
    }

    pub fn into_findings(self) -> (Vec<Finding>, Vec<HandledErrorCode>) {
        (self.findings, self.handled_codes)
    }

    pub fn status(&self, section: &str, item: Option<&str>) -> Result<Status, CompassError> {
        self.matrix.status(&self.version, section, item)
    }

    /// Reports `item`, looked up and displayed under the same name.
    pub fn report(&mut self, section: &str, item: &str, detail: &str, line: usize) -> Result<(), CompassError> {
        self.report_as(section, Some(item), item, detail, line)
    }

    /// Reports a construct whose matrix key differs from its display text.
    /// `lookup` of `None` reads the section-level status.
    pub fn report_as(
        &mut self,
        section: &str,
        lookup: Option<&str>,
        display: &str,
        detail: &str,
        line: usize,
    ) -> Result<(), CompassError> {
        let status = self.status(section, lookup)?;
        let finding = self.build(section, lookup, display, detail, line, status)?;
        self.findings.push(finding);
        Ok(())
    }

    /// Reports with a status decided by the caller rather than the matrix.
    pub fn report_with_status(
        &mut self,
        section: &str,
        lookup: Option<&str>,
        display: &str,
        detail: &str,
        line: usize,
        status: Status,
    ) -> Result<(), CompassError> {
        if !self.matrix.exists(section, lookup) {
            return Err(CompassError::ConfigDrift {
                section: section.to_string(),
                item: lookup.map(str::to_string),
            });
        }
        let finding = self.build(section, lookup, display, detail, line, status)?;
        self.findings.push(finding);
        Ok(())
    }

    /// Like [`Self::report_as`], but held back until the batch is finished.
    pub fn queue_as(
        &mut self,
        section: &str,
        lookup: Option<&str>,
        display: &str,
        detail: &str,
        line: usize,
    ) -> Result<(), CompassError> {
        let status = self.status(section, lookup)?;
        let finding = self.build(section, lookup, display, detail, line, status)?;
        self.pending.push(finding);
        Ok(())
    }

    fn build(
        &self,
        section: &str,
        lookup: Option<&str>,
        display: &str,
        detail: &str,
        line: usize,
        status: Status,
    ) -> Result<Finding, CompassError> {
        let report_group = self.matrix.report_group(section, lookup)?;
        let key = lookup.unwrap_or(display);
        let (status, misc) = match self.overrides.apply(section, key, status) {
            Some(replacement) => (replacement, format!("Overridden from {}", status)),
            None => (status, String::new()),
        };
        Ok(Finding {
            item: collapse_whitespace(display),
            detail: truncate_chars(&collapse_whitespace(detail), DETAIL_MAX_CHARS),
            report_group,
            status,
            line,
            batch: self.batch_number,
            file_line: self.batch_start_line + line.max(1) - 1,
            object_context: collapse_whitespace(&self.objects.describe()),
            sub_object_context: collapse_whitespace(&self.objects.describe_sub_object()),
            misc,
        })
    }

    /// Symbol key of an object name in the current schema context.
    pub fn object_key(&self, raw: &str) -> String {
        ResolvedName::resolve(raw).symbol_key(&self.default_schema)
    }

    /// Reports leading-dot, three-part, four-part and over-long names.
    pub fn check_object_name(&mut self, raw: &str, line: usize) -> Result<ResolvedName, CompassError> {
        let name = ResolvedName::resolve(raw);
        if name.has_leading_dot() {
            self.report(sections::IDENTIFIERS, "Leading dot identifier", raw, line)?;
        }
        if name.is_remote() {
            self.report(sections::REMOTE_OBJECT_REFERENCES, "Four-part name", raw, line)?;
        } else if name.is_cross_database() {
            let same_database =
                !self.current_database.is_empty() && name.is_in_database(&self.current_database);
            let item = if same_database {
                "Three-part name to current database"
            } else {
                "Three-part name"
            };
            self.report(sections::CROSS_DATABASE_REFERENCES, item, raw, line)?;
        }
        self.check_identifier_length(name.object(), line)?;
        Ok(name)
    }

    pub fn check_identifier_length(&mut self, identifier: &str, line: usize) -> Result<(), CompassError> {
        let length = identifier.chars().count() as i64;
        if length > self.identifier_limit {
            let detail = format!("{} ({} characters)", identifier, length);
            self.report_as(
                sections::MAX_IDENTIFIER_LENGTH,
                None,
                "Identifier too long",
                &detail,
                line,
            )?;
        }
        Ok(())
    }

    pub fn is_special_column(&self, column: &str) -> bool {
        self.special_columns
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
    }

    pub fn type_env(&self) -> TypeEnv<'_> {
        TypeEnv {
            symbols: &self.symbols,
            default_schema: &self.default_schema,
            quoted_identifier: self.quoted.is_on(),
        }
    }
}
