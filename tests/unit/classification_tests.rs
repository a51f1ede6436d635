//! Tests for unit classification through the public API

use rust_sqlcompass::features::ConfigMatrix;
use rust_sqlcompass::{analyze_sql, AnalyzerConfig, CompassError, Finding, Overrides, Status};

fn embedded() -> ConfigMatrix {
    ConfigMatrix::embedded().unwrap()
}

fn analyze(sql: &str) -> Vec<Finding> {
    analyze_sql(sql, &AnalyzerConfig::default(), &embedded())
        .unwrap()
        .findings
}

fn find<'a>(findings: &'a [Finding], item: &str) -> &'a Finding {
    findings
        .iter()
        .find(|f| f.item == item)
        .unwrap_or_else(|| panic!("no finding '{}' in {:?}", item, findings))
}

// ============================================================================
// Target Version Tests
// ============================================================================

#[test]
fn test_target_version_selects_status() {
    let sql = "SELECT a INTO #t FROM x ORDER BY a";
    let matrix = embedded();

    let old = AnalyzerConfig {
        target_version: Some("1.0.0".to_string()),
        ..AnalyzerConfig::default()
    };
    let report = analyze_sql(sql, &old, &matrix).unwrap();
    assert_eq!(report.target_version, "1.0.0");
    assert_eq!(find(&report.findings, "SELECT..INTO #tmp").status, Status::ReviewManually);

    let report = analyze_sql(sql, &AnalyzerConfig::default(), &matrix).unwrap();
    assert_eq!(report.target_version, "2.0.0");
    assert_eq!(find(&report.findings, "SELECT..INTO #tmp").status, Status::Rewritten);
}

#[test]
fn test_unknown_target_version_fails() {
    let config = AnalyzerConfig {
        target_version: Some("7.0".to_string()),
        ..AnalyzerConfig::default()
    };
    let err = analyze_sql("SELECT 1", &config, &embedded()).unwrap_err();
    assert!(matches!(err, CompassError::UnknownTargetVersion { .. }));
}

// ============================================================================
// Position Tests
// ============================================================================

#[test]
fn test_batch_and_file_lines() {
    let findings = analyze("SELECT a FROM t ORDER BY a\nGO\n\nSELECT TOP 1 a FROM t");
    let first = find(&findings, "SELECT");
    assert_eq!((first.batch, first.line, first.file_line), (1, 1, 1));

    let top = find(&findings, "TOP without ORDER BY");
    assert_eq!(top.batch, 2);
    assert_eq!(top.line, 2);
    assert_eq!(top.file_line, 4);
    assert_eq!(top.status, Status::ReviewSemantics);
    assert_eq!(top.report_group, "Queries");
}

#[test]
fn test_object_context_follows_procedure() {
    let findings = analyze("CREATE PROCEDURE dbo.p AS\nSELECT a FROM t ORDER BY a\nGO\nSELECT b FROM u ORDER BY b");
    let procedure = find(&findings, "CREATE PROCEDURE");
    assert_eq!(procedure.object_context, "PROCEDURE dbo.p");

    let selects: Vec<&Finding> = findings.iter().filter(|f| f.item == "SELECT").collect();
    assert_eq!(selects.len(), 2);
    assert_eq!(selects[0].object_context, "PROCEDURE dbo.p");
    assert_eq!(selects[1].object_context, "");
}

#[test]
fn test_findings_never_carry_line_breaks() {
    let findings = analyze("SELECT a,\n       b\nFROM t\nWHERE a = 1\nORDER BY a");
    let select = find(&findings, "SELECT");
    assert!(!select.detail.contains('\n'));
    assert!(select.detail.contains("FROM t"));
}

// ============================================================================
// Overrides Tests
// ============================================================================

#[test]
fn test_override_reclassifies_and_marks_misc() {
    let overrides = Overrides::parse("test", "[SelectTopWoOrderBy]\nTOP without ORDER BY = ignored\n").unwrap();
    let config = AnalyzerConfig {
        overrides,
        ..AnalyzerConfig::default()
    };
    let report = analyze_sql("SELECT TOP 10 * FROM t", &config, &embedded()).unwrap();
    let top = find(&report.findings, "TOP without ORDER BY");
    assert_eq!(top.status, Status::Ignored);
    assert_eq!(top.misc, "Overridden from Review semantics");

    let select = find(&report.findings, "SELECT");
    assert_eq!(select.status, Status::Supported);
    assert_eq!(select.misc, "");
}

// ============================================================================
// Error Code Tests
// ============================================================================

#[test]
fn test_handled_error_codes_are_collected() {
    let report = analyze_sql(
        "BEGIN TRY\n  INSERT INTO t VALUES (1)\nEND TRY\nBEGIN CATCH\n  IF ERROR_NUMBER() = 2627 PRINT 'dup'\nEND CATCH",
        &AnalyzerConfig::default(),
        &embedded(),
    )
    .unwrap();
    let codes: Vec<i64> = report.handled_error_codes.iter().map(|c| c.code).collect();
    assert_eq!(codes, vec![2627]);
    assert_eq!(find(&report.findings, "Error code 2627").line, 5);
}

// ============================================================================
// Configuration Drift Tests
// ============================================================================

#[test]
fn test_missing_section_fails_the_unit() {
    let matrix = ConfigMatrix::parse(
        "partial",
        "[Versions]\nlist = 1.0.0\n[Maximum identifier length]\nlimit = 30\n[Special column names]\nlist = ROWID\n",
    )
    .unwrap();
    let err = analyze_sql("SELECT a FROM t ORDER BY a", &AnalyzerConfig::default(), &matrix).unwrap_err();
    assert!(matches!(err, CompassError::ConfigDrift { .. }));
    assert!(err.is_fatal_for_unit());
}

#[test]
fn test_missing_limit_fails_before_any_batch() {
    let matrix = ConfigMatrix::parse("partial", "[Versions]\nlist = 1.0.0\n").unwrap();
    let err = analyze_sql("", &AnalyzerConfig::default(), &matrix).unwrap_err();
    assert!(matches!(err, CompassError::ConfigDrift { .. }));
}

#[test]
fn test_empty_unit_has_no_findings() {
    let report = analyze_sql("-- nothing here\n", &AnalyzerConfig::default(), &embedded()).unwrap();
    assert!(report.findings.is_empty());
    assert_eq!(report.batches, 1);
}

// ============================================================================
// Multi-part Name Tests
// ============================================================================

#[test]
fn test_four_part_name_is_remote_only() {
    let findings = analyze("SELECT a FROM srv.sales.dbo.orders ORDER BY a");
    let remote = findings.iter().filter(|f| f.item == "Four-part name").count();
    let cross = findings
        .iter()
        .filter(|f| f.item.starts_with("Three-part name"))
        .count();
    assert_eq!((remote, cross), (1, 0));
}

#[test]
fn test_three_part_name_to_current_database() {
    let config = AnalyzerConfig {
        default_database: "Sales".to_string(),
        ..AnalyzerConfig::default()
    };
    let report = analyze_sql(
        "SELECT a FROM sales.dbo.orders ORDER BY a\nSELECT b FROM hr.dbo.staff ORDER BY b",
        &config,
        &embedded(),
    )
    .unwrap();
    let items: Vec<&str> = report
        .findings
        .iter()
        .filter(|f| f.item.starts_with("Three-part name"))
        .map(|f| f.item.as_str())
        .collect();
    assert_eq!(items, vec!["Three-part name to current database", "Three-part name"]);
}
