use serde_json::{Value, json};

use flow_spec::{
    FieldDescriptor, FieldKind, FieldValue, FlowState, PathSeg, StateStore,
};

#[test]
fn writes_create_missing_intermediates() {
    let mut store = StateStore::new();
    store.set(
        "demo",
        &["a".into(), "b".into(), "c".into()],
        json!("deep"),
    );
    assert_eq!(
        store.get("demo", &["a".into(), "b".into(), "c".into()]),
        Some(&json!("deep"))
    );
    assert!(store.get("demo", &["a".into(), "b".into()]).is_some());
}

#[test]
fn reads_never_create_anything() {
    let store = StateStore::new();
    assert!(store.get("demo", &["a".into()]).is_none());
    assert!(!store.has_form("demo"));
}

#[test]
fn index_segments_pad_arrays_with_nulls() {
    let mut store = StateStore::new();
    store.set("demo", &["list".into(), PathSeg::index(2)], json!("third"));
    assert_eq!(
        store.get("demo", &["list".into()]),
        Some(&json!([null, null, "third"]))
    );
    assert_eq!(
        store.get("demo", &["list".into(), PathSeg::index(2)]),
        Some(&json!("third"))
    );
    assert!(store.get("demo", &["list".into(), PathSeg::index(5)]).is_none());
}

#[test]
fn writing_replaces_mismatched_node_shapes() {
    let mut store = StateStore::new();
    store.set("demo", &["slot".into()], json!("scalar"));
    store.set("demo", &["slot".into(), "key".into()], json!(1));
    assert_eq!(
        store.get("demo", &["slot".into()]),
        Some(&json!({"key": 1}))
    );
}

#[test]
fn forms_are_isolated_namespaces() {
    let mut store = StateStore::new();
    store.set("one", &["shared".into()], json!(1));
    store.set("two", &["shared".into()], json!(2));
    assert_eq!(store.get("one", &["shared".into()]), Some(&json!(1)));
    assert_eq!(store.get("two", &["shared".into()]), Some(&json!(2)));

    store.forget_form("one");
    assert!(!store.has_form("one"));
    assert_eq!(store.get("two", &["shared".into()]), Some(&json!(2)));
}

#[test]
fn global_namespace_is_seeded_with_defaults() {
    let store = StateStore::new();
    let selector = store
        .global_get(&["selectors".into(), "field".into()])
        .and_then(Value::as_str)
        .expect("seeded selector");
    assert!(selector.contains("data-form-id"));

    let comparators = store
        .global_get(&["comparators".into()])
        .and_then(Value::as_array)
        .expect("seeded comparators");
    assert_eq!(comparators.len(), 14);
}

#[test]
fn template_falls_back_when_overwritten_badly() {
    let mut store = StateStore::new();
    store.global_set(&["style".into(), "elementId".into()], json!(42));
    assert_eq!(
        store.template("style", "elementId", "style-{formId}-{bucket}"),
        "style-{formId}-{bucket}"
    );
}

#[test]
fn typed_field_accessors_round_trip() {
    let mut store = StateStore::new();
    let mut field = FieldDescriptor::new("country", FieldKind::Select);
    field.value = FieldValue::Many(vec!["us".into()]);
    store.set_field("demo", &field).expect("set field");

    let loaded = store.field("demo", "country").expect("field");
    assert_eq!(loaded.kind, FieldKind::Select);
    assert_eq!(loaded.value, FieldValue::Many(vec!["us".into()]));

    store
        .set_field_value("demo", "country", &FieldValue::Many(vec!["ca".into()]))
        .expect("set value");
    assert_eq!(
        store.field_value("demo", "country"),
        Some(FieldValue::Many(vec!["ca".into()]))
    );
    assert_eq!(store.field_names("demo"), vec!["country".to_string()]);
}

#[test]
fn flow_state_round_trips_through_the_tree() {
    let mut store = StateStore::new();
    let mut state = FlowState::start("s1");
    state.begin_request();
    store.set_flow_state("demo", &state).expect("set");

    let loaded = store.flow_state("demo").expect("flow state");
    assert_eq!(loaded, state);
    assert!(loaded.pending);

    // The typed accessor reads the same node the raw path API sees.
    assert_eq!(
        store.get("demo", &["flow".into(), "currentStepId".into()]),
        Some(&json!("s1"))
    );
}
