//! Run summary rendering

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use chrono::{DateTime, Local};

use super::{Finding, Status};

/// Outcome of one analysed source unit.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub path: String,
    pub batches: usize,
    pub findings: usize,
    /// Diagnostic of the fatal condition that discarded the unit's findings.
    pub failure: Option<String>,
}

/// Totals of a whole run.
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub started_at: DateTime<Local>,
    pub target_version: String,
    pub units: Vec<UnitOutcome>,
    /// Finding counts per report group and status.
    pub counts: BTreeMap<String, BTreeMap<Status, usize>>,
    /// Error codes the analysed code explicitly branches on.
    pub handled_error_codes: BTreeSet<String>,
}

impl AnalysisSummary {
    pub fn new(target_version: impl Into<String>) -> Self {
        Self {
            started_at: Local::now(),
            target_version: target_version.into(),
            units: Vec::new(),
            counts: BTreeMap::new(),
            handled_error_codes: BTreeSet::new(),
        }
    }

    pub fn record_success(
        &mut self,
        path: impl Into<String>,
        batches: usize,
        findings: &[Finding],
        error_codes: impl IntoIterator<Item = String>,
    ) {
        for finding in findings {
            *self
                .counts
                .entry(finding.report_group.clone())
                .or_default()
                .entry(finding.status)
                .or_insert(0) += 1;
        }
        self.handled_error_codes.extend(error_codes);
        self.units.push(UnitOutcome {
            path: path.into(),
            batches,
            findings: findings.len(),
            failure: None,
        });
    }

    pub fn record_failure(&mut self, path: impl Into<String>, diagnostic: impl Into<String>) {
        self.units.push(UnitOutcome {
            path: path.into(),
            batches: 0,
            findings: 0,
            failure: Some(diagnostic.into()),
        });
    }

    pub fn failed_units(&self) -> usize {
        self.units.iter().filter(|u| u.failure.is_some()).count()
    }

    pub fn total_findings(&self) -> usize {
        self.units.iter().map(|u| u.findings).sum()
    }

    /// Findings with the given status across all groups.
    pub fn status_total(&self, status: Status) -> usize {
        self.counts
            .values()
            .filter_map(|by_status| by_status.get(&status))
            .sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Assessment of {} unit(s) for target {} started {}",
            self.units.len(),
            self.target_version,
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(
            out,
            "Findings: {} ({} unit(s) failed)",
            self.total_findings(),
            self.failed_units()
        );

        for (group, by_status) in &self.counts {
            let parts: Vec<String> = by_status
                .iter()
                .map(|(status, count)| format!("{}={}", status, count))
                .collect();
            let _ = writeln!(out, "  {}: {}", group, parts.join(", "));
        }

        if !self.handled_error_codes.is_empty() {
            let codes: Vec<&str> = self.handled_error_codes.iter().map(String::as_str).collect();
            let _ = writeln!(out, "Handled error codes: {}", codes.join(", "));
        }

        for unit in &self.units {
            if let Some(failure) = &unit.failure {
                let _ = writeln!(out, "FAILED {}: {}", unit.path, failure);
            }
        }
        out
    }
}
