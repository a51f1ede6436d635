//! Tests for the feature matrix format and the embedded matrix

use rust_sqlcompass::features::{sections, ConfigMatrix, FeatureMatrix, Version};
use rust_sqlcompass::{CompassError, Status};

fn version(text: &str) -> Version {
    text.parse().unwrap()
}

// ============================================================================
// Embedded Matrix Tests
// ============================================================================

#[test]
fn test_embedded_matrix_report_groups_resolve() {
    let matrix = ConfigMatrix::embedded().unwrap();
    assert!(matrix.section_count() > sections::ALL.len());
    for section in sections::ALL {
        let group = matrix.report_group(section, None).unwrap();
        assert!(!group.is_empty(), "empty report group for [{}]", section);
    }
    assert_eq!(
        matrix.report_group(sections::JOINS, Some("Old-style outer join")).unwrap(),
        "Legacy syntax"
    );
}

#[test]
fn test_embedded_matrix_versions() {
    let matrix = ConfigMatrix::embedded().unwrap();
    let versions: Vec<&str> = matrix.versions().iter().map(Version::as_str).collect();
    assert_eq!(versions, vec!["1.0.0", "1.1.0", "2.0.0"]);
    assert_eq!(matrix.default_version().unwrap().as_str(), "2.0.0");
}

#[test]
fn test_embedded_matrix_limits() {
    let matrix = ConfigMatrix::embedded().unwrap();
    assert_eq!(matrix.int_limit(sections::MAX_IDENTIFIER_LENGTH).unwrap(), 63);
    let special = matrix.value_list(sections::SPECIAL_COLUMN_NAMES).unwrap();
    assert!(special.iter().any(|c| c == "CTID"));
}

#[test]
fn test_embedded_status_changes_between_versions() {
    let matrix = ConfigMatrix::embedded().unwrap();
    let status = |v: &str| {
        matrix
            .status(&version(v), sections::SELECT, Some("SELECT..INTO #tmp"))
            .unwrap()
    };
    assert_eq!(status("1.0.0"), Status::ReviewManually);
    assert_eq!(status("1.1.0"), Status::Rewritten);
    assert_eq!(status("2.0.0"), Status::Rewritten);
}

// ============================================================================
// Format Tests
// ============================================================================

const MATRIX: &str = "\
; sample matrix
[Versions]
list = 1.0.0, 2.0.0

[Datatypes]
report_group = Types
list = INT, MONEY,
    SQL_VARIANT
supported-1.0.0 = INT
review_semantics-1.0.0 = MONEY
supported-2.0.0 = MONEY
not_supported-1.0.0 = SQL_VARIANT

[Table hints]
list = *
ignored-1.0.0 = NOLOCK
default_classification = review_manually

[Unlisted]
";

#[test]
fn test_continuation_lines_extend_the_list() {
    let matrix = ConfigMatrix::parse("sample", MATRIX).unwrap();
    assert!(matrix.exists("Datatypes", Some("sql_variant")));
    assert_eq!(
        matrix
            .status(&version("2.0.0"), "datatypes", Some("SQL_VARIANT"))
            .unwrap(),
        Status::NotSupported
    );
}

#[test]
fn test_newest_applicable_rule_wins() {
    let matrix = ConfigMatrix::parse("sample", MATRIX).unwrap();
    let money = |v: &str| matrix.status(&version(v), "Datatypes", Some("MONEY")).unwrap();
    assert_eq!(money("1.0.0"), Status::ReviewSemantics);
    assert_eq!(money("2.0.0"), Status::Supported);
}

#[test]
fn test_closed_list_rejects_unknown_item() {
    let matrix = ConfigMatrix::parse("sample", MATRIX).unwrap();
    let err = matrix
        .status(&version("1.0.0"), "Datatypes", Some("GEOGRAPHY"))
        .unwrap_err();
    assert!(matches!(err, CompassError::ConfigDrift { .. }));
    assert!(matrix.status(&version("1.0.0"), "Nope", None).is_err());
}

#[test]
fn test_open_list_default_classification() {
    let matrix = ConfigMatrix::parse("sample", MATRIX).unwrap();
    let v = version("1.0.0");
    assert_eq!(matrix.status(&v, "Table hints", Some("nolock")).unwrap(), Status::Ignored);
    assert_eq!(
        matrix.status(&v, "Table hints", Some("SNAPSHOT")).unwrap(),
        Status::ReviewManually
    );
}

#[test]
fn test_section_without_rules_is_not_supported() {
    let matrix = ConfigMatrix::parse("sample", MATRIX).unwrap();
    assert_eq!(
        matrix.status(&version("1.0.0"), "Unlisted", Some("ANYTHING")).unwrap(),
        Status::NotSupported
    );
}

#[test]
fn test_report_group_defaults_to_section_name() {
    let matrix = ConfigMatrix::parse("sample", MATRIX).unwrap();
    assert_eq!(matrix.report_group("Datatypes", Some("INT")).unwrap(), "Types");
    assert_eq!(matrix.report_group("Table hints", None).unwrap(), "Table hints");
}

#[test]
fn test_unknown_status_key_is_parse_error() {
    let text = "[Versions]\nlist = 1.0.0\n[A]\nsometimes-1.0.0 = X\n";
    let err = ConfigMatrix::parse("bad", text).unwrap_err();
    assert!(matches!(err, CompassError::MatrixParse { line: 4, .. }));
}

#[test]
fn test_load_reports_missing_file() {
    let err = ConfigMatrix::load(std::path::Path::new("/nonexistent/matrix.cfg")).unwrap_err();
    assert!(matches!(err, CompassError::MatrixReadError { .. }));
}
