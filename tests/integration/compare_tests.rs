use crate::common::*;
use pipediff::{
    compare_all, compare_entries, compare_latest, compare_pair, dtypes_table, schema_drift,
    AggSpec, CaptureOptions, CaptureOverrides, Column, DType, EntryRef, Frame, Label, LevelOrder,
    PipediffError, SnapshotLogger, Value,
};

fn min_logger() -> SnapshotLogger {
    SnapshotLogger::new(CaptureOptions {
        agg: Some(AggSpec::names(&["min"])),
        ..Default::default()
    })
}

#[test]
fn test_end_to_end_min_scenario() {
    let mut logger = min_logger();
    let first = logger.log_frame(&df_num(), None).unwrap();

    let agg = first.agg.as_ref().unwrap();
    assert_eq!(agg.index(), &[Label::from("min")]);
    assert_eq!(agg.value(&Label::from("min"), "float"), Some(&Value::Float(1.0)));
    assert_eq!(agg.value(&Label::from("min"), "int"), Some(&Value::Int(1)));

    logger.log_frame(&df_num(), None).unwrap();
    let table = compare_latest(logger.logs(), LevelOrder::default()).unwrap();

    assert_eq!(table.entries(), vec!["entry_0", "entry_1"]);
    for column in ["float", "int"] {
        for entry in ["entry_0", "entry_1"] {
            assert_eq!(table.exists(entry, column), Some(true));
        }
        assert_eq!(
            table.value(&Label::from("min"), column, "entry_0"),
            table.value(&Label::from("min"), column, "entry_1")
        );
    }
    assert!(table.is_uniform());
}

#[test]
fn test_existence_with_partial_overlap() {
    let mut logger = SnapshotLogger::new(CaptureOptions {
        agg: Some(AggSpec::from("count")),
        ..Default::default()
    });
    let ab = Frame::new([("a", Column::from_iter([1i64])), ("b", Column::from_iter([2i64]))]).unwrap();
    let bc = Frame::new([("b", Column::from_iter([2i64])), ("c", Column::from_iter([3i64]))]).unwrap();
    logger.log_frame(&ab, Some("first")).unwrap();
    logger.log_frame(&bc, Some("second")).unwrap();

    let table = compare_pair(logger.logs(), "first", "second", LevelOrder::ColumnsFirst).unwrap();
    assert_eq!(table.columns(), vec!["a", "b", "c"]);

    let flags = |entry: &str| -> Vec<bool> {
        ["a", "b", "c"]
            .iter()
            .map(|c| table.exists(entry, c).unwrap())
            .collect()
    };
    assert_eq!(flags("first"), vec![true, true, false]);
    assert_eq!(flags("second"), vec![false, true, true]);
    assert_eq!(table.value(&Label::from("count"), "c", "first"), Some(&Value::Null));
}

#[test]
fn test_level_order_groups_contiguously() {
    let mut logger = min_logger();
    logger.log_frame(&df_num(), Some("one")).unwrap();
    logger.log_frame(&df_num(), Some("two")).unwrap();

    let entries_first = compare_all(logger.logs(), LevelOrder::EntriesFirst).unwrap();
    let pairs: Vec<(String, String)> = entries_first
        .keys()
        .iter()
        .map(|k| (k.entry.clone(), k.column.clone()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("one".to_string(), "float".to_string()),
            ("one".to_string(), "int".to_string()),
            ("two".to_string(), "float".to_string()),
            ("two".to_string(), "int".to_string()),
        ]
    );

    let columns_first = compare_all(logger.logs(), LevelOrder::ColumnsFirst).unwrap();
    let outer: Vec<&str> = columns_first.keys().iter().map(|k| k.column.as_str()).collect();
    assert_eq!(outer, vec!["float", "float", "int", "int"]);
}

#[test]
fn test_insufficient_entries() {
    let mut logger = min_logger();
    assert!(matches!(
        compare_latest(logger.logs(), LevelOrder::default()),
        Err(PipediffError::InsufficientEntries { found: 0 })
    ));

    logger.log_frame(&df_num(), None).unwrap();
    assert!(matches!(
        compare_all(logger.logs(), LevelOrder::default()),
        Err(PipediffError::InsufficientEntries { found: 1 })
    ));

    logger.log_frame(&df_num(), None).unwrap();
    let one_ref = [EntryRef::from("entry_0")];
    assert!(matches!(
        compare_entries(logger.logs(), &one_ref, LevelOrder::default()),
        Err(PipediffError::InsufficientEntries { found: 1 })
    ));
}

#[test]
fn test_compare_by_position_and_unknown_key() {
    let mut logger = min_logger();
    for _ in 0..3 {
        logger.log_frame(&df_num(), None).unwrap();
    }

    let table = compare_pair(logger.logs(), 0isize, -1isize, LevelOrder::default()).unwrap();
    assert_eq!(table.entries(), vec!["entry_0", "entry_2"]);

    assert!(matches!(
        compare_pair(logger.logs(), "entry_0", "nope", LevelOrder::default()),
        Err(PipediffError::KeyNotFound { .. })
    ));
}

#[test]
fn test_entries_without_agg_still_report_existence() {
    let mut logger = SnapshotLogger::new(CaptureOptions {
        column_names: true,
        ..Default::default()
    });
    logger.log_frame(&df_num(), Some("one")).unwrap();
    logger.log_frame(&df_wide(), Some("two")).unwrap();

    let table = compare_latest(logger.logs(), LevelOrder::default()).unwrap();
    assert_eq!(table.exists("one", "float"), Some(true));
    assert_eq!(table.exists("two", "float"), Some(false));
    assert_eq!(table.row_labels().count(), 0);
}

#[test]
fn test_dtypes_table_tracks_changes() {
    let mut logger = SnapshotLogger::new(CaptureOptions {
        dtypes: true,
        ..Default::default()
    });
    logger.log_frame(&df_num(), Some("one")).unwrap();
    let widened = Frame::new([
        ("float", Column::from_iter([1.0, 2.0, 3.0])),
        ("int", Column::from_iter([1.0, 2.0, 3.0])),
    ])
    .unwrap();
    logger.log_frame(&widened, Some("two")).unwrap();
    logger.log(&df_num(), Some("three"), &CaptureOverrides::new().dtypes(false)).unwrap();

    let table = dtypes_table(logger.logs());
    assert_eq!(table.columns(), &["float".to_string(), "int".to_string()]);
    assert_eq!(table.entries().collect::<Vec<_>>(), vec!["one", "two", "three"]);
    assert_eq!(table.get("one", "int"), Some(DType::Int64));
    assert_eq!(table.get("two", "int"), Some(DType::Float64));
    assert_eq!(table.get("three", "int"), None);
}

#[test]
fn test_schema_drift_between_entries() {
    let mut logger = SnapshotLogger::new(CaptureOptions {
        dtypes: true,
        ..Default::default()
    });
    logger.log_frame(&df_num(), Some("before")).unwrap();
    let after = Frame::new([
        ("int", Column::from_iter([1.0, 2.0, 3.0])),
        ("label", Column::from_iter(["a", "b", "c"])),
    ])
    .unwrap();
    logger.log_frame(&after, Some("after")).unwrap();
    logger.log_frame(&df_num(), Some("again")).unwrap();

    let drift = schema_drift(logger.logs(), "before", "after").unwrap();
    assert!(drift.has_changes());
    assert_eq!(drift.added, vec!["label"]);
    assert_eq!(drift.removed, vec!["float"]);
    assert_eq!(drift.type_changes.len(), 1);
    assert_eq!(drift.type_changes[0].column, "int");
    assert_eq!(drift.type_changes[0].from, DType::Int64);
    assert_eq!(drift.type_changes[0].to, DType::Float64);
    assert_ne!(drift.left_fingerprint, drift.right_fingerprint);

    let same = schema_drift(logger.logs(), "before", "again").unwrap();
    assert!(!same.has_changes());
    assert_eq!(same.left_fingerprint, same.right_fingerprint);
}

#[test]
fn test_comparison_serializes() {
    let mut logger = min_logger();
    logger.log_frame(&df_num(), Some("one")).unwrap();
    logger.log_frame(&df_num(), Some("two")).unwrap();

    let table = compare_latest(logger.logs(), LevelOrder::default()).unwrap();
    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["order"], "columns_first");
    assert_eq!(json["exists"].as_array().map(|a| a.len()), Some(4));
    assert_eq!(json["rows"]["min"][0], serde_json::json!(1.0));
}
