//! Common test utilities for rust-sqlcompass tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rust_sqlcompass::report::decode_record;
use rust_sqlcompass::{run_analysis, AnalysisSummary, AnalyzeOptions};
use tempfile::TempDir;

/// The matrix compiled into the binary, for tests that need a modified copy.
pub const EMBEDDED_MATRIX: &str = include_str!("../../src/features/default_features.cfg");

/// Test context with temporary directory for isolated test execution
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Writes `content` to `name` below the context root, creating directories.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join("findings.txt")
    }

    /// Options analysing `inputs` into [`Self::output_path`].
    pub fn options(&self, inputs: &[&Path]) -> AnalyzeOptions {
        AnalyzeOptions {
            inputs: inputs.iter().map(|p| p.display().to_string()).collect(),
            output_path: Some(self.output_path()),
            application: "billing".to_string(),
            ..AnalyzeOptions::default()
        }
    }

    /// Runs an assessment and returns the summary and the decoded records.
    pub fn analyze(&self, options: AnalyzeOptions) -> (AnalysisSummary, Vec<Record>) {
        let summary = run_analysis(options).expect("Assessment failed");
        (summary, self.records())
    }

    pub fn records(&self) -> Vec<Record> {
        let text = fs::read_to_string(self.output_path()).expect("Failed to read findings");
        text.lines().map(Record::parse).collect()
    }
}

/// One decoded finding record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub item: String,
    pub detail: String,
    pub report_group: String,
    pub status: String,
    pub line: usize,
    pub application: String,
    pub file: String,
    pub batch: usize,
    pub file_line: usize,
    pub object_context: String,
    pub sub_object_context: String,
    pub misc: String,
}

impl Record {
    pub fn parse(line: &str) -> Self {
        let fields = decode_record(line);
        assert_eq!(fields.len(), 12, "Malformed record: {}", line);
        let number = |i: usize| -> usize {
            fields[i]
                .parse()
                .unwrap_or_else(|_| panic!("Field {} is not a number in: {}", i, line))
        };
        Self {
            item: fields[0].clone(),
            detail: fields[1].clone(),
            report_group: fields[2].clone(),
            status: fields[3].clone(),
            line: number(4),
            application: fields[5].clone(),
            file: fields[6].clone(),
            batch: number(7),
            file_line: number(8),
            object_context: fields[9].clone(),
            sub_object_context: fields[10].clone(),
            misc: fields[11].clone(),
        }
    }

    /// File name of the record's unit.
    pub fn file_name(&self) -> String {
        Path::new(&self.file)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

pub fn items(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.item.as_str()).collect()
}
