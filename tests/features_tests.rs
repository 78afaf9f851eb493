// Feature encoder and frozen schema tests

mod common;

use common::observation;
use netdiag::error::DiagnosisError;
use netdiag::features::{FrozenSchema, encode};
use netdiag::models::{ErrorKind, WindowedObservation};

fn shipped_schema() -> FrozenSchema {
    FrozenSchema::load(&common::schema_path()).expect("shipped schema")
}

fn nominal() -> WindowedObservation {
    observation(20.0, 0.0, true, 3.0, 10.0, -50.0, 20.0, 0, ErrorKind::None)
}

#[test]
fn test_shipped_schema_loads() {
    let schema = shipped_schema();
    assert_eq!(schema.version(), 1);
    assert_eq!(schema.model_id(), "netdiag-rf-2025.03.1");
    assert_eq!(schema.len(), 12);
    assert_eq!(schema.columns()[0], "latency");
    assert_eq!(schema.position("err_unreachable"), Some(11));
}

#[test]
fn test_encoding_follows_schema_order() {
    let schema = shipped_schema();
    let v = encode(&nominal(), &schema);
    assert_eq!(v.columns(), schema.columns());
    assert_eq!(
        v.values(),
        &[20.0, 0.0, 1.0, 3.0, 10.0, -50.0, 20.0, 0.0, 1.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn test_length_and_order_invariant_across_inputs() {
    let schema = shipped_schema();
    let inputs = [
        nominal(),
        WindowedObservation::degraded(),
        observation(700.0, 80.0, true, 400.0, 40.0, -60.0, 999.0, 2, ErrorKind::Refused),
        observation(f64::NAN, f64::NAN, false, f64::INFINITY, f64::NAN, f64::NAN, f64::NAN, 0, ErrorKind::Timeout),
    ];
    for obs in &inputs {
        let v = encode(obs, &schema);
        assert_eq!(v.len(), schema.len());
        assert_eq!(v.columns(), schema.columns());
    }
}

#[test]
fn test_one_hot_sets_exactly_one_error_column() {
    let schema = shipped_schema();
    for kind in ErrorKind::ALL {
        let mut obs = nominal();
        obs.error_kind = kind;
        let v = encode(&obs, &schema);
        let hot: Vec<&str> = v
            .iter()
            .filter(|(c, val)| c.starts_with("err_") && *val == 1.0)
            .map(|(c, _)| c)
            .collect();
        assert_eq!(hot, vec![format!("err_{}", kind).as_str()]);
    }
}

#[test]
fn test_non_finite_inputs_are_imputed_to_sentinels() {
    let schema = shipped_schema();
    let obs = observation(
        f64::NAN,
        f64::NAN,
        true,
        f64::INFINITY,
        f64::NAN,
        f64::NEG_INFINITY,
        f64::NAN,
        0,
        ErrorKind::None,
    );
    let v = encode(&obs, &schema);
    assert_eq!(v.get("latency"), Some(999.0));
    assert_eq!(v.get("jitter"), Some(999.0));
    assert_eq!(v.get("dns_resolution_time"), Some(999.0));
    assert_eq!(v.get("signal_strength"), Some(-999.0));
    assert_eq!(v.get("packet_loss"), Some(100.0));
    assert_eq!(v.get("bandwidth_usage"), Some(100.0));
}

#[test]
fn test_schema_columns_missing_from_encoding_are_zero_filled() {
    let schema = FrozenSchema::new(
        1,
        "m",
        vec!["latency".into(), "err_refused".into(), "rssi_trend".into()],
    )
    .unwrap();
    let v = encode(&nominal(), &schema);
    assert_eq!(v.values(), &[20.0, 0.0, 0.0]);
}

#[test]
fn test_encoded_columns_absent_from_schema_are_dropped() {
    let schema = FrozenSchema::new(1, "m", vec!["packet_loss".into()]).unwrap();
    let v = encode(&nominal(), &schema);
    assert_eq!(v.len(), 1);
    assert_eq!(v.get("latency"), None);
}

#[test]
fn test_encoding_is_deterministic() {
    let schema = shipped_schema();
    let obs = observation(123.456, 7.5, true, 9.1, 33.3, -61.2, 45.6, 1, ErrorKind::Timeout);
    let a = encode(&obs, &schema);
    let b = encode(&obs, &schema);
    let bits = |v: &netdiag::features::FeatureVector| v.values().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a), bits(&b));
}

#[test]
fn test_feature_vector_serializes_as_ordered_map() {
    let schema = shipped_schema();
    let json = serde_json::to_string(&encode(&nominal(), &schema)).unwrap();
    assert!(json.starts_with("{\"latency\":20.0,\"packet_loss\":0.0,\"connected\":1.0"));
}

#[test]
fn test_schema_rejects_empty_column_list() {
    let err = FrozenSchema::from_json(r#"{"version":1,"model_id":"m","columns":[]}"#).unwrap_err();
    assert!(err.to_string().contains("no columns"));
}

#[test]
fn test_schema_load_missing_file_is_io_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = FrozenSchema::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.is_missing_artifact());
    assert!(matches!(err, DiagnosisError::ArtifactIo { .. }));
}
