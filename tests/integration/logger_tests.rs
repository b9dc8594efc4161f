use crate::common::*;
use pipediff::{
    aggregate, normalize, AggFunc, AggRef, AggSpec, Axis, CaptureOptions, CaptureOverrides,
    ColumnFuncs, Frame, Label, PipediffError, Snapshot, SnapshotLogger, Value,
};
use std::sync::Arc;

fn logger() -> SnapshotLogger {
    SnapshotLogger::new(CaptureOptions::default())
}

#[test]
fn test_empty_logger() {
    assert!(logger().logs().is_empty());
}

#[test]
fn test_log_empty_frame_and_access() {
    let mut logger = logger();
    logger
        .log(&Frame::empty(), None, &CaptureOverrides::new().copy(true))
        .unwrap();
    let logs = logger.logs();

    assert_eq!(logs.len(), 1);
    let by_key = logs.get_by_key("entry_0").unwrap();
    assert_eq!(by_key.copy, Some(Frame::empty()));
    assert!(Arc::ptr_eq(by_key, logs.get_by_position(0).unwrap()));
    assert!(Arc::ptr_eq(by_key, logs.get_by_position(-1).unwrap()));
    for sliced in [logs.slice(0..), logs.slice(0..1), logs.slice(-1..)] {
        assert!(Arc::ptr_eq(by_key, sliced.get_by_key("entry_0").unwrap()));
    }
}

#[test]
fn test_explicit_key_twice_fails() {
    let mut logger = logger();
    logger.log_frame(&Frame::empty(), Some("my_frame")).unwrap();
    assert!(logger.logs().get("my_frame").is_some());

    let result = logger.log_frame(&Frame::empty(), Some("my_frame"));
    assert!(matches!(result, Err(PipediffError::DuplicateKey { .. })));
    assert_eq!(logger.logs().len(), 1);
}

#[test]
fn test_reset_and_log_again() {
    let mut logger = logger();
    logger.log_frame(&df_num(), None).unwrap();
    logger.log_frame(&df_num(), None).unwrap();
    assert_eq!(logger.logs().len(), 2);

    logger.reset();
    assert!(logger.logs().is_empty());
    assert!(logger.log_frame(&df_num(), None).unwrap().agg.is_none());
    assert_eq!(logger.logs().keys().collect::<Vec<_>>(), vec!["entry_0"]);
}

#[test]
fn test_metadata_describes_unsliced_frame() {
    let mut logger = logger();
    let overrides = CaptureOverrides::new()
        .column_labels(["c0", "c1"])
        .row_labels([Label::Int(0), Label::Int(1)])
        .agg("count")
        .shape(true)
        .dtypes(true)
        .column_names(true)
        .copy(true);
    let snapshot = logger.log(&df_wide(), None, &overrides).unwrap();

    assert_eq!(snapshot.shape, Some((3, 5)));
    assert_eq!(snapshot.dtypes.as_ref().map(|d| d.len()), Some(5));
    assert_eq!(snapshot.column_names.as_ref().map(|c| c.len()), Some(5));

    let agg = snapshot.agg.as_ref().unwrap();
    assert_eq!(agg.column_names(), vec!["c0", "c1"]);
    assert_eq!(agg.value(&Label::from("count"), "c0"), Some(&Value::Int(2)));
    assert_eq!(snapshot.copy.as_ref().map(|c| c.shape()), Some((2, 2)));
}

#[test]
fn test_defaults_and_overrides() {
    let mut logger = SnapshotLogger::new(CaptureOptions {
        agg: Some(AggSpec::from("max")),
        shape: true,
        ..Default::default()
    });

    let default = logger.log_frame(&df_num(), None).unwrap();
    assert!(default.shape.is_some());
    assert_eq!(
        default.agg.as_ref().unwrap().value(&Label::from("max"), "int"),
        Some(&Value::Int(3))
    );

    let switched = logger
        .log(&df_num(), None, &CaptureOverrides::new().shape(false).agg("min"))
        .unwrap();
    assert!(switched.shape.is_none());
    assert_eq!(
        switched.agg.as_ref().unwrap().value(&Label::from("min"), "int"),
        Some(&Value::Int(1))
    );
}

#[test]
fn test_nans_counted_per_column() {
    let frame = Frame::new([(
        "nan_column",
        pipediff::Column::from_iter([None, Some(2.0), Some(3.0), Some(f64::NAN)]),
    )])
    .unwrap();

    let mut logger = SnapshotLogger::new(CaptureOptions {
        agg: Some(AggSpec::from("nans")),
        ..Default::default()
    });
    let snapshot = logger.log_frame(&frame, None).unwrap();
    let agg = snapshot.agg.as_ref().unwrap();

    assert_eq!(agg.column_names(), frame.column_names());
    assert_eq!(agg.value(&Label::from("nans"), "nan_column"), Some(&Value::Int(2)));
}

#[test]
fn test_aggregation_shapes_are_equivalent() {
    let frame = df_num();
    let columns = frame.column_names();

    let bases: Vec<AggFunc> = ["sum", "mean", "max", "min"]
        .iter()
        .map(|name| pipediff::registry::lookup_agg_func(name).unwrap())
        .chain(std::iter::once(quantile_75()))
        .collect();

    for base in bases {
        let native = normalize(&AggSpec::List(vec![AggRef::Func(base.clone())]), None).unwrap();
        let expected = aggregate(&frame, &native, Axis::PerColumn).unwrap();

        let shapes = [
            AggSpec::from(base.clone()),
            AggSpec::List(vec![AggRef::Func(base.clone())]),
            AggSpec::per_column(columns.iter().map(|c| (c.clone(), ColumnFuncs::from(base.clone())))),
            AggSpec::per_column(
                columns
                    .iter()
                    .map(|c| (c.clone(), ColumnFuncs::from(vec![base.clone()]))),
            ),
        ];

        let mut logger = logger();
        for spec in shapes {
            let snapshot = logger
                .log(&frame, None, &CaptureOverrides::new().agg(spec.clone()))
                .unwrap();
            assert_eq!(
                snapshot.agg.as_ref(),
                Some(&expected),
                "'{}' via {:?} differs from the list form",
                base.name(),
                spec
            );
        }
    }
}

#[test]
fn test_per_row_axis() {
    let mut logger = logger();
    let overrides = CaptureOverrides::new()
        .agg(AggSpec::names(&["sum", "max"]))
        .axis(Axis::PerRow);
    let snapshot = logger.log(&df_num(), None, &overrides).unwrap();
    let agg = snapshot.agg.as_ref().unwrap();

    assert_eq!(snapshot.axis, Some(Axis::PerRow));
    assert_eq!(agg.shape(), (3, 2));
    assert_eq!(agg.value(&Label::Int(1), "sum"), Some(&Value::Float(4.0)));

    let mapping = CaptureOverrides::new()
        .agg(AggSpec::per_column([("0", "sum"), ("7", "sum")]))
        .axis(Axis::PerRow);
    let snapshot = logger.log(&df_num(), None, &mapping).unwrap();
    assert_eq!(snapshot.agg.as_ref().unwrap().index(), &[Label::Int(0)]);
}

#[test]
fn test_failed_aggregation_appends_nothing() {
    let mut logger = logger();
    let result = logger.log(&df_wide(), None, &CaptureOverrides::new().agg("mean"));
    assert!(matches!(result, Err(PipediffError::Aggregation { .. })));
    assert!(logger.logs().is_empty());
}

#[test]
fn test_snapshot_json_shape() {
    let mut logger = logger();
    let snapshot = logger
        .log(&df_num(), Some("one"), &CaptureOverrides::new().shape(true).agg("min"))
        .unwrap();
    let json = serde_json::to_value(snapshot.as_ref()).unwrap();

    assert_eq!(json["shape"], serde_json::json!([3, 2]));
    assert_eq!(json["axis"], serde_json::json!(0));
    assert!(json["dtypes"].is_null());
    assert_ne!(*snapshot, Snapshot::default());
}
