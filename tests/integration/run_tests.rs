//! End-to-end assessment runs over files on disk

use pretty_assertions::assert_eq;
use rust_sqlcompass::run_analysis;

use crate::common::{items, Record, TestContext, EMBEDDED_MATRIX};

#[test]
fn test_single_unit_records() {
    let ctx = TestContext::new();
    let script = ctx.write("report.sql", "SELECT TOP 10 * FROM t");

    let (summary, records) = ctx.analyze(ctx.options(&[&script]));

    assert_eq!(summary.failed_units(), 0);
    assert_eq!(summary.total_findings(), 2);
    assert_eq!(items(&records), vec!["SELECT", "TOP without ORDER BY"]);

    let select = &records[0];
    assert_eq!(
        (
            select.report_group.as_str(),
            select.status.as_str(),
            select.line,
            select.application.as_str(),
            select.batch,
            select.file_line,
        ),
        ("Queries", "Supported", 1, "billing", 1, 1)
    );
    assert_eq!(select.file_name(), "report.sql");
    assert!(select.detail.contains("FROM t"));
    assert_eq!(records[1].status, "Review semantics");
}

#[test]
fn test_units_are_written_in_input_order() {
    let ctx = TestContext::new();
    let b = ctx.write("b.sql", "TRUNCATE TABLE t");
    let a = ctx.write("a.sql", "SELECT a FROM t ORDER BY a");

    let (_, records) = ctx.analyze(ctx.options(&[&b, &a]));

    let files: Vec<String> = records.iter().map(Record::file_name).collect();
    let first_a = files.iter().position(|f| f == "a.sql").unwrap();
    assert!(files[..first_a].iter().all(|f| f == "b.sql"));
    assert!(files[first_a..].iter().all(|f| f == "a.sql"));
    assert_eq!(records[0].item, "TRUNCATE TABLE");
}

#[test]
fn test_directory_input_runs_in_parallel_and_keeps_order() {
    let ctx = TestContext::new();
    for n in 0..12 {
        ctx.write(
            &format!("scripts/u{:02}.sql", n),
            &format!("SELECT c{} FROM t{} ORDER BY 1", n, n),
        );
    }

    let (summary, records) = ctx.analyze(ctx.options(&[&ctx.root.join("scripts")]));

    assert_eq!(summary.units.len(), 12);
    let selects: Vec<String> = records
        .iter()
        .filter(|r| r.item == "SELECT")
        .map(Record::file_name)
        .collect();
    let expected: Vec<String> = (0..12).map(|n| format!("u{:02}.sql", n)).collect();
    assert_eq!(selects, expected);
}

#[test]
fn test_failed_unit_contributes_no_records() {
    let ctx = TestContext::new();
    // A matrix without the TRUNCATE TABLE section.
    let matrix = ctx.write(
        "matrix.cfg",
        &EMBEDDED_MATRIX.replace("[TRUNCATE TABLE]", "[Truncation]"),
    );
    let good = ctx.write("good.sql", "SELECT a FROM t ORDER BY a");
    let bad = ctx.write("bad.sql", "SELECT a FROM t ORDER BY a\nGO\nTRUNCATE TABLE t");

    let mut options = ctx.options(&[&good, &bad]);
    options.matrix_path = Some(matrix);
    let (summary, records) = ctx.analyze(options);

    assert_eq!(summary.failed_units(), 1);
    let failed = summary.units.iter().find(|u| u.failure.is_some()).unwrap();
    assert!(failed.path.ends_with("bad.sql"));
    assert!(failed
        .failure
        .as_deref()
        .unwrap()
        .contains("Feature matrix out of sync"));
    assert!(records.iter().all(|r| r.file_name() == "good.sql"));
    assert!(!records.is_empty());
}

#[test]
fn test_overrides_file_reclassifies() {
    let ctx = TestContext::new();
    let script = ctx.write("top.sql", "SELECT TOP 10 * FROM t");
    let overrides = ctx.write(
        "overrides.cfg",
        "# accepted for this migration\n[SelectTopWoOrderBy]\nTOP without ORDER BY = ignored\n",
    );

    let mut options = ctx.options(&[&script]);
    options.overrides_path = Some(overrides);
    let (_, records) = ctx.analyze(options);

    let top = records.iter().find(|r| r.item == "TOP without ORDER BY").unwrap();
    assert_eq!(top.status, "Ignored");
    assert_eq!(top.misc, "Overridden from Review semantics");
}

#[test]
fn test_target_version_in_summary() {
    let ctx = TestContext::new();
    let script = ctx.write("tmp.sql", "SELECT a INTO #t FROM x ORDER BY a");

    let mut options = ctx.options(&[&script]);
    options.target_version = Some("1.0.0".to_string());
    let (summary, records) = ctx.analyze(options);

    assert_eq!(summary.target_version, "1.0.0");
    let into = records.iter().find(|r| r.item == "SELECT..INTO #tmp").unwrap();
    assert_eq!(into.status, "Review manually");
    assert!(summary.render().contains("1.0.0"));
}

#[test]
fn test_unknown_target_version_aborts_run() {
    let ctx = TestContext::new();
    let script = ctx.write("a.sql", "SELECT 1");

    let mut options = ctx.options(&[&script]);
    options.target_version = Some("3.0".to_string());
    let err = run_analysis(options).unwrap_err();

    assert!(err.to_string().contains("Unknown target version '3.0'"));
    assert!(!ctx.output_path().exists());
}

#[test]
fn test_missing_input_aborts_run() {
    let ctx = TestContext::new();
    let options = ctx.options(&[&ctx.root.join("absent.sql")]);
    assert!(run_analysis(options).is_err());
}

#[test]
fn test_windows_1252_source_is_decoded() {
    let ctx = TestContext::new();
    let path = ctx.root.join("legacy.sql");
    std::fs::write(&path, b"SELECT name FROM t WHERE name = 'caf\xE9' ORDER BY name").unwrap();

    let (summary, records) = ctx.analyze(ctx.options(&[&path]));

    assert_eq!(summary.failed_units(), 0);
    let select = records.iter().find(|r| r.item == "SELECT").unwrap();
    assert!(select.detail.contains("café"));
}

#[test]
fn test_handled_error_codes_in_summary() {
    let ctx = TestContext::new();
    let script = ctx.write(
        "errors.sql",
        "BEGIN TRY\n  INSERT INTO t VALUES (1)\nEND TRY\nBEGIN CATCH\n  IF ERROR_NUMBER() IN (2627, 547) PRINT 'dup'\nEND CATCH",
    );

    let (summary, _) = ctx.analyze(ctx.options(&[&script]));

    let codes: Vec<&str> = summary.handled_error_codes.iter().map(String::as_str).collect();
    assert_eq!(codes, vec!["2627", "547"]);
}
