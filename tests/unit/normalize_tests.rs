use crate::common::*;
use pipediff::registry::{lookup_agg_func, registered_names};
use pipediff::{normalize, register_agg_func, AggRef, AggSpec, ColumnFuncs, NormalizedSpec, PipediffError, Value};

#[test]
fn test_builtin_names_are_registered() {
    let names = registered_names();
    for name in ["sum", "mean", "min", "max", "count", "median", "std", "var", "nunique", "nans"] {
        assert!(names.iter().any(|n| n == name), "missing builtin '{}'", name);
    }
}

#[test]
fn test_every_shape_normalizes_to_lists() {
    let shapes = [
        AggSpec::from("max"),
        AggSpec::names(&["max"]),
        AggSpec::per_column([("float", "max"), ("int", "max")]),
        AggSpec::per_column([("float", vec!["max"]), ("int", vec!["max"])]),
    ];

    for spec in &shapes {
        match normalize(spec, None).unwrap() {
            NormalizedSpec::Funcs(funcs) => {
                assert_eq!(funcs.len(), 1);
                assert_eq!(funcs[0].name(), "max");
            }
            NormalizedSpec::PerColumn(map) => {
                assert_eq!(map.len(), 2);
                assert!(map.values().all(|funcs| funcs.len() == 1 && funcs[0].name() == "max"));
            }
        }
    }
}

#[test]
fn test_normalize_twice_is_stable() {
    let spec = AggSpec::per_column([
        ("float", ColumnFuncs::from(quantile_75())),
        ("int", ColumnFuncs::from(vec!["min", "nans"])),
    ]);
    let once = normalize(&spec, None).unwrap();
    let twice = normalize(&AggSpec::from(once.clone()), None).unwrap();
    assert_eq!(once, twice);

    let list = normalize(&AggSpec::List(vec![AggRef::from("sum"), quantile_75().into()]), None).unwrap();
    assert_eq!(normalize(&list.clone().into(), None).unwrap(), list);
}

#[test]
fn test_resolved_names_keep_registry_key() {
    let spec = normalize(&AggSpec::from("nans"), None).unwrap();
    let NormalizedSpec::Funcs(funcs) = spec else {
        panic!("Expected a function list");
    };
    assert_eq!(funcs[0].name(), "nans");
    assert_eq!(
        funcs[0].call(&[Value::Null, Value::Float(f64::NAN), Value::Int(1)]).unwrap(),
        Value::Int(2)
    );
}

#[test]
fn test_unknown_labels_dropped_only_with_known_labels() {
    let spec = AggSpec::per_column([("float", "min"), ("ghost", "min")]);

    let NormalizedSpec::PerColumn(unfiltered) = normalize(&spec, None).unwrap() else {
        panic!("Expected a per-column spec");
    };
    assert_eq!(unfiltered.len(), 2);

    let known = df_num().column_names();
    let NormalizedSpec::PerColumn(filtered) = normalize(&spec, Some(known.as_slice())).unwrap() else {
        panic!("Expected a per-column spec");
    };
    assert_eq!(filtered.keys().collect::<Vec<_>>(), vec!["float"]);
}

#[test]
fn test_unresolvable_reference_fails() {
    let result = normalize(&AggSpec::per_column([("float", "does_not_exist")]), None);
    assert!(matches!(result, Err(PipediffError::InvalidAggregation { .. })));
}

#[test]
fn test_register_custom_name() {
    register_agg_func("test_first_value", |values: &[Value]| {
        Ok(values.first().cloned().unwrap_or(Value::Null))
    })
    .unwrap();

    assert!(lookup_agg_func("test_first_value").is_some());
    let again = register_agg_func("test_first_value", |_: &[Value]| Ok(Value::Null));
    assert!(matches!(again, Err(PipediffError::InvalidAggregation { .. })));

    let spec = normalize(&AggSpec::from("test_first_value"), None).unwrap();
    let NormalizedSpec::Funcs(funcs) = spec else {
        panic!("Expected a function list");
    };
    assert_eq!(funcs[0].call(&[Value::Int(7), Value::Int(8)]).unwrap(), Value::Int(7));
}

#[test]
fn test_custom_function_errors_propagate() {
    use anyhow::Context;
    use pipediff::{CaptureOverrides, Column, Frame, SnapshotLogger};

    register_agg_func("test_parsed_total", |values: &[Value]| {
        let mut total = 0i64;
        for value in values {
            let text = value.to_string();
            total += text
                .parse::<i64>()
                .with_context(|| format!("'{}' is not a whole number", text))?;
        }
        Ok(Value::Int(total))
    })
    .unwrap();

    let frame = Frame::new([
        ("ok", Column::from_iter(["1", "2"])),
        ("bad", Column::from_iter(["3", "x"])),
    ])
    .unwrap();
    let mut logger = SnapshotLogger::default();

    let summed = logger
        .log(&frame, None, &CaptureOverrides::new().column_labels(["ok"]).agg("test_parsed_total"))
        .unwrap();
    let agg = summed.agg.as_ref().unwrap();
    assert_eq!(agg.value(&"test_parsed_total".into(), "ok"), Some(&Value::Int(3)));

    let failed = logger.log(&frame, None, &CaptureOverrides::new().agg("test_parsed_total"));
    match failed {
        Err(PipediffError::Generic(e)) => assert!(e.to_string().contains("'x'")),
        other => panic!("Expected a generic error, got {:?}", other),
    }
}
