//! Property tests for finding records and classification stability

use proptest::prelude::*;
use rust_sqlcompass::features::ConfigMatrix;
use rust_sqlcompass::report::{decode_record, encode_record, escape_field, unescape_field, RecordSource};
use rust_sqlcompass::{analyze_sql, AnalyzerConfig, Finding, Status};

fn finding(item: String, detail: String, object_context: String) -> Finding {
    Finding {
        item,
        detail,
        report_group: "Queries".to_string(),
        status: Status::ReviewManually,
        line: 1,
        batch: 1,
        file_line: 1,
        object_context,
        sub_object_context: String::new(),
        misc: String::new(),
    }
}

/// Field text without line breaks, biased towards the delimiter and escape characters.
fn field() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just('|'),
            Just('~'),
            Just('p'),
            Just('t'),
            Just(' '),
            proptest::char::range('a', 'z'),
            proptest::char::range('\u{e0}', '\u{ff}'),
        ],
        0..24,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn escaping_is_reversible(value in field()) {
        prop_assert_eq!(unescape_field(&escape_field(&value)), value);
    }

    #[test]
    fn escaped_value_has_no_delimiter(value in field()) {
        prop_assert!(!escape_field(&value).contains('|'));
    }

    #[test]
    fn record_fields_survive_encoding(item in field(), detail in field(), context in field()) {
        let source = RecordSource { application: "app|x", file: "dir/a~b.sql" };
        let record = encode_record(&finding(item.clone(), detail.clone(), context.clone()), &source).unwrap();
        let fields = decode_record(&record);
        prop_assert_eq!(fields.len(), 12);
        prop_assert_eq!(&fields[0], &item);
        prop_assert_eq!(&fields[1], &detail);
        prop_assert_eq!(&fields[5], "app|x");
        prop_assert_eq!(&fields[6], "dir/a~b.sql");
        prop_assert_eq!(&fields[9], &context);
    }

    #[test]
    fn line_breaks_are_rejected(prefix in field(), suffix in field()) {
        let source = RecordSource { application: "", file: "" };
        let item = format!("{}\n{}", prefix, suffix);
        prop_assert!(encode_record(&finding(item, String::new(), String::new()), &source).is_err());
    }

    #[test]
    fn classification_is_deterministic(
        table in "t_[a-z]{1,10}",
        column in "c_[a-z]{1,10}",
        top in proptest::option::of(1u32..1000),
        ordered in any::<bool>(),
    ) {
        let top = top.map(|n| format!("TOP {} ", n)).unwrap_or_default();
        let order = if ordered { format!(" ORDER BY {}", column) } else { String::new() };
        let sql = format!("SELECT {}{} FROM {}{}\nGO\nDELETE FROM {} WHERE {} = 1", top, column, table, order, table, column);

        let matrix = ConfigMatrix::embedded().unwrap();
        let config = AnalyzerConfig::default();
        let first = analyze_sql(&sql, &config, &matrix).unwrap();
        let second = analyze_sql(&sql, &config, &matrix).unwrap();
        prop_assert_eq!(&first.findings, &second.findings);
        prop_assert_eq!(first.batches, 2);
        for f in &first.findings {
            prop_assert!(!f.detail.contains('\n'));
            prop_assert!(f.batch == 1 || f.batch == 2);
        }
    }
}
