use crate::common::*;
use pipediff::cli::CaptureArgs;
use pipediff::commands::capture_settings;
use pipediff::{
    AggRef, AggSpec, Axis, CaptureOptions, CaptureOverrides, ColumnFuncs, Label, PipediffError,
    Value,
};
use serde_json::json;

#[test]
fn test_load_options_from_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_json(
            "capture.json",
            &json!({
                "agg": {"price": ["min", "max"], "id": "count"},
                "row_labels": [0, 2],
                "shape": true,
                "axis": 0
            }),
        )
        .unwrap();

    let options = CaptureOptions::from_json_file(&path).unwrap();
    assert!(options.shape);
    assert!(!options.dtypes);
    assert_eq!(options.axis, Axis::PerColumn);
    assert_eq!(options.row_labels, Some(vec![Label::Int(0), Label::Int(2)]));
    assert_eq!(
        options.agg,
        Some(AggSpec::per_column([
            ("price", ColumnFuncs::from(vec!["min", "max"])),
            ("id", ColumnFuncs::from("count")),
        ]))
    );
}

#[test]
fn test_unknown_config_key_is_named() {
    let result = CaptureOptions::from_json_str(r#"{"agg": "min", "colour": "red"}"#);
    match result {
        Err(PipediffError::UnknownOption { option }) => assert_eq!(option, "colour"),
        other => panic!("Expected unknown option, got {:?}", other),
    }
}

#[test]
fn test_invalid_axis_in_config() {
    let result = CaptureOptions::from_json_str(r#"{"axis": 3}"#);
    assert!(matches!(result, Err(PipediffError::Json(_))));
}

#[test]
fn test_overrides_from_text() {
    let mut overrides = CaptureOverrides::new();
    overrides.set_assignment("agg=min, max").unwrap();
    overrides.set_assignment("rows=1").unwrap_err();
    overrides.set_assignment("row_labels=1,b").unwrap();
    overrides.set_assignment("axis=1").unwrap();
    overrides.set_assignment("shape=no").unwrap();

    assert_eq!(overrides.agg, Some(AggSpec::names(&["min", "max"])));
    assert_eq!(overrides.row_labels, Some(vec![Label::Int(1), Label::from("b")]));
    assert_eq!(overrides.axis, Some(Axis::PerRow));
    assert_eq!(overrides.shape, Some(false));

    assert!(overrides.set("axis", "2").is_err());
    assert!(overrides.set("copy", "maybe").is_err());
    assert!(overrides.set_assignment("copy").is_err());
}

#[test]
fn test_capture_settings_defaults_without_config() {
    let (logger, overrides) = capture_settings(&CaptureArgs::default()).unwrap();
    let defaults = logger.defaults();

    assert!(defaults.dtypes && defaults.shape);
    assert_eq!(defaults.agg, Some(AggSpec::names(&["count", "nans", "nunique"])));
    assert_eq!(overrides, CaptureOverrides::new());
}

#[test]
fn test_config_defaults_with_flag_overrides() {
    let fixture = TestFixture::new().unwrap();
    let config = fixture
        .create_json("capture.json", &json!({"agg": "max", "dtypes": true}))
        .unwrap();
    let data = fixture
        .create_json("data.json", &sample_data::sales_columns())
        .unwrap();

    let args = CaptureArgs {
        config: Some(config),
        columns: Some("price".to_string()),
        overrides: vec!["dtypes=false".to_string()],
        ..Default::default()
    };
    let (mut logger, overrides) = capture_settings(&args).unwrap();
    assert_eq!(logger.defaults().agg, Some(AggSpec::Single(AggRef::from("max"))));

    let frame = pipediff::Frame::from_json_file(&data).unwrap();
    let snapshot = logger.log(&frame, Some("data"), &overrides).unwrap();
    assert!(snapshot.dtypes.is_none());

    let agg = snapshot.agg.as_ref().unwrap();
    assert_eq!(agg.column_names(), vec!["price"]);
    assert_eq!(agg.value(&Label::from("max"), "price"), Some(&Value::Float(12.0)));
}

#[test]
fn test_config_cli_flag() {
    let runner = CliTestRunner::new().unwrap();
    let config = runner
        .fixture()
        .create_json("capture.json", &json!({"agg": ["min"], "column_names": true}))
        .unwrap();
    runner
        .fixture()
        .create_json("data.json", &sample_data::sales_columns())
        .unwrap();

    let data = runner.path("data.json");
    let config = config.display().to_string();
    runner.expect_success(&["show", &data, "--config", &config]);

    let bad = runner
        .fixture()
        .create_json("bad.json", &json!({"aggs": "min"}))
        .unwrap()
        .display()
        .to_string();
    let err = runner.expect_failure(&["show", &data, "--config", &bad]);
    assert!(matches!(err, PipediffError::UnknownOption { ref option } if option == "aggs"));
}
