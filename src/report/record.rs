//! Finding records and their delimited encoding

use std::io::Write;
use std::path::{Path, PathBuf};

use super::Status;
use crate::error::CompassError;

/// Field separator of the record stream.
pub const FIELD_DELIMITER: char = '|';

const DELIMITER_MARKER: &str = "~p~";
const ESCAPE_CHAR: char = '~';
const ESCAPE_MARKER: &str = "~t~";

/// One classified construct occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub item: String,
    pub detail: String,
    pub report_group: String,
    pub status: Status,
    /// Line within the batch.
    pub line: usize,
    pub batch: usize,
    /// Line within the source file.
    pub file_line: usize,
    pub object_context: String,
    pub sub_object_context: String,
    pub misc: String,
}

/// Unit-level values written alongside every finding.
#[derive(Debug, Clone, Copy)]
pub struct RecordSource<'a> {
    pub application: &'a str,
    pub file: &'a str,
}

/// Escapes the field delimiter so a value can be embedded in a record.
///
/// The escape character itself is escaped first, which keeps the mapping
/// reversible by [`unescape_field`].
pub fn escape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ESCAPE_CHAR => out.push_str(ESCAPE_MARKER),
            FIELD_DELIMITER => out.push_str(DELIMITER_MARKER),
            _ => out.push(c),
        }
    }
    out
}

/// Reverses [`escape_field`].
pub fn unescape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix(ESCAPE_MARKER) {
            out.push(ESCAPE_CHAR);
            rest = after;
        } else if let Some(after) = rest.strip_prefix(DELIMITER_MARKER) {
            out.push(FIELD_DELIMITER);
            rest = after;
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out
}

/// Builds the delimited record for a finding.
///
/// A value containing a line break is rejected: the record stream is
/// line-oriented and cannot represent it.
pub fn encode_record(finding: &Finding, source: &RecordSource<'_>) -> Result<String, CompassError> {
    let line = finding.line.to_string();
    let batch = finding.batch.to_string();
    let file_line = finding.file_line.to_string();
    let fields: [(&'static str, &str); 12] = [
        ("item", &finding.item),
        ("detail", &finding.detail),
        ("report group", &finding.report_group),
        ("status", finding.status.label()),
        ("line", &line),
        ("application", source.application),
        ("file", source.file),
        ("batch", &batch),
        ("file line", &file_line),
        ("object context", &finding.object_context),
        ("sub-object context", &finding.sub_object_context),
        ("misc", &finding.misc),
    ];

    let mut record = String::new();
    for (index, (name, value)) in fields.iter().enumerate() {
        if value.contains('\n') || value.contains('\r') {
            return Err(CompassError::IntegrityViolation {
                field: *name,
                record: value.replace(['\r', '\n'], "\\n"),
            });
        }
        if index > 0 {
            record.push(FIELD_DELIMITER);
        }
        record.push_str(&escape_field(value));
    }
    Ok(record)
}

/// Splits a record back into its unescaped field values.
pub fn decode_record(record: &str) -> Vec<String> {
    record.split(FIELD_DELIMITER).map(unescape_field).collect()
}

/// Append-only destination of finding records.
pub trait FindingSink {
    fn emit(&mut self, finding: &Finding, source: &RecordSource<'_>) -> Result<(), CompassError>;
}

impl FindingSink for Vec<String> {
    fn emit(&mut self, finding: &Finding, source: &RecordSource<'_>) -> Result<(), CompassError> {
        self.push(encode_record(finding, source)?);
        Ok(())
    }
}

/// Writes one delimited record per line.
pub struct DelimitedWriter<W: Write> {
    out: W,
    path: PathBuf,
    records: usize,
}

impl<W: Write> DelimitedWriter<W> {
    /// `path` only names the destination in error messages.
    pub fn new(out: W, path: impl AsRef<Path>) -> Self {
        Self {
            out,
            path: path.as_ref().to_path_buf(),
            records: 0,
        }
    }

    pub fn records_written(&self) -> usize {
        self.records
    }

    pub fn flush(&mut self) -> Result<(), CompassError> {
        self.out.flush().map_err(|e| CompassError::OutputWriteError {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Writes records that were already encoded.
    pub fn write_records(&mut self, records: &[String]) -> Result<(), CompassError> {
        for record in records {
            writeln!(self.out, "{}", record).map_err(|e| CompassError::OutputWriteError {
                path: self.path.clone(),
                source: e,
            })?;
            self.records += 1;
        }
        Ok(())
    }
}

impl<W: Write> FindingSink for DelimitedWriter<W> {
    fn emit(&mut self, finding: &Finding, source: &RecordSource<'_>) -> Result<(), CompassError> {
        let record = encode_record(finding, source)?;
        writeln!(self.out, "{}", record).map_err(|e| CompassError::OutputWriteError {
            path: self.path.clone(),
            source: e,
        })?;
        self.records += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(item: &str) -> Finding {
        Finding {
            item: item.to_string(),
            detail: String::new(),
            report_group: "Queries".to_string(),
            status: Status::Supported,
            line: 3,
            batch: 2,
            file_line: 10,
            object_context: "dbo.p".to_string(),
            sub_object_context: String::new(),
            misc: String::new(),
        }
    }

    const SOURCE: RecordSource<'static> = RecordSource {
        application: "app",
        file: "a.sql",
    };

    #[test]
    fn test_record_field_order() {
        let record = encode_record(&finding("SELECT"), &SOURCE).unwrap();
        assert_eq!(record, "SELECT||Queries|Supported|3|app|a.sql|2|10|dbo.p||");
    }

    #[test]
    fn test_delimiter_is_substituted() {
        let record = encode_record(&finding("a|b"), &SOURCE).unwrap();
        assert!(record.starts_with("a~p~b|"));
        assert_eq!(decode_record(&record)[0], "a|b");
    }

    #[test]
    fn test_escape_marker_text_survives() {
        let original = "x~p~y~t~|~";
        assert_eq!(unescape_field(&escape_field(original)), original);
    }

    #[test]
    fn test_line_break_is_integrity_violation() {
        let err = encode_record(&finding("a\nb"), &SOURCE).unwrap_err();
        assert!(matches!(
            err,
            CompassError::IntegrityViolation { field: "item", .. }
        ));
    }

    #[test]
    fn test_writer_counts_records() {
        let mut writer = DelimitedWriter::new(Vec::new(), "out.txt");
        writer.emit(&finding("SELECT"), &SOURCE).unwrap();
        writer.emit(&finding("INSERT"), &SOURCE).unwrap();
        assert_eq!(writer.records_written(), 2);
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
