use std::collections::BTreeMap;

use flow_spec::{
    Bucket, BucketKind, FieldDescriptor, FieldKind, FieldValue, StateStore, apply,
};

fn store_with_field(form_id: &str, name: &str, kind: FieldKind, value: FieldValue) -> StateStore {
    let mut store = StateStore::new();
    let mut field = FieldDescriptor::new(name, kind);
    field.value = value;
    store.set_field(form_id, &field).expect("register field");
    store
}

#[test]
fn hide_bucket_batches_selectors_into_one_rule() {
    let mut store = StateStore::new();
    for name in ["email", "note"] {
        store
            .set_field("demo", &FieldDescriptor::new(name, FieldKind::Text))
            .expect("register");
    }
    let mut bucket = Bucket {
        top: vec!["email".into(), "note".into()],
        ..Bucket::default()
    };

    let sheet = apply(&mut store, "demo", BucketKind::ConditionalHide, &mut bucket).expect("apply");
    assert_eq!(sheet.element_id, "style-demo-ct-hide");
    let expected = concat!(
        "[data-form-id=\"demo\"] [data-field-name=\"email\"],",
        "[data-form-id=\"demo\"] [data-field-name=\"note\"]",
        "{display:none !important;}",
    );
    assert_eq!(sheet.css, expected);
}

#[test]
fn empty_bucket_blanks_the_style_rule() {
    let mut store = StateStore::new();
    let mut bucket = Bucket::default();
    let sheet = apply(&mut store, "demo", BucketKind::ConditionalHide, &mut bucket).expect("apply");
    assert_eq!(sheet.element_id, "style-demo-ct-hide");
    assert_eq!(sheet.css, "");
}

#[test]
fn show_bucket_uses_initial_and_skips_clearing() {
    let mut store = store_with_field(
        "demo",
        "demo",
        FieldKind::Text,
        FieldValue::Single("kept".into()),
    );
    let mut bucket = Bucket {
        top: vec!["demo".into()],
        ..Bucket::default()
    };

    let sheet = apply(&mut store, "demo", BucketKind::FormsShow, &mut bucket).expect("apply");
    assert_eq!(sheet.element_id, "style-demo-forms-show");
    assert!(sheet.css.contains("display:initial !important"));
    // Form-level buckets address the form wrapper, not a field.
    assert!(sheet.css.starts_with("[data-form-id=\"demo\"]{"));
    assert_eq!(
        store.field_value("demo", "demo"),
        Some(FieldValue::Single("kept".into()))
    );
}

#[test]
fn hiding_clears_values_by_kind() {
    let mut store = StateStore::new();
    let mut text = FieldDescriptor::new("note", FieldKind::Text);
    text.value = FieldValue::Single("stale".into());
    store.set_field("demo", &text).expect("register");
    let mut boxes = FieldDescriptor::new("extras", FieldKind::Checkbox);
    boxes.value = FieldValue::Options(BTreeMap::from([("a".to_string(), "a".to_string())]));
    store.set_field("demo", &boxes).expect("register");

    let mut bucket = Bucket {
        top: vec!["note".into(), "extras".into()],
        ..Bucket::default()
    };
    apply(&mut store, "demo", BucketKind::ConditionalHide, &mut bucket).expect("apply");

    assert_eq!(
        store.field_value("demo", "note"),
        Some(FieldValue::Single(String::new()))
    );
    assert_eq!(
        store.field_value("demo", "extras"),
        Some(FieldValue::Options(BTreeMap::new()))
    );
}

#[test]
fn top_final_is_the_deduplicated_union() {
    let mut store = StateStore::new();
    for name in ["a", "b"] {
        store
            .set_field("demo", &FieldDescriptor::new(name, FieldKind::Text))
            .expect("register");
    }
    let mut bucket = Bucket {
        top: vec!["a".into(), "b".into()],
        inner_parents: vec!["b".into(), "a".into()],
        ..Bucket::default()
    };
    apply(&mut store, "demo", BucketKind::ConditionalHide, &mut bucket).expect("apply");
    assert_eq!(bucket.top_final, vec!["a".to_string(), "b".to_string()]);

    let stored = store
        .bucket("demo", BucketKind::ConditionalHide)
        .expect("persisted");
    assert_eq!(stored.top_final, bucket.top_final);
}

#[test]
fn option_selectors_depend_on_the_parent_kind() {
    let mut store = store_with_field("demo", "country", FieldKind::Select, FieldValue::Many(vec![]));
    let mut boxes = FieldDescriptor::new("extras", FieldKind::Checkbox);
    boxes.value = FieldValue::Options(BTreeMap::new());
    store.set_field("demo", &boxes).expect("register");

    let mut bucket = Bucket {
        inner: BTreeMap::from([
            ("country".to_string(), vec!["mx".to_string()]),
            ("extras".to_string(), vec!["beta".to_string()]),
        ]),
        ..Bucket::default()
    };
    let sheet = apply(&mut store, "demo", BucketKind::ConditionalHide, &mut bucket).expect("apply");

    assert!(sheet.css.contains("option[value=\"mx\"]"));
    assert!(sheet.css.contains("[name=\"beta\"]"));
    // Option-only hiding never lands the parent on the exclusion list.
    assert!(bucket.top_final.is_empty());
}

#[test]
fn selector_templates_are_read_from_the_global_store() {
    let mut store = store_with_field(
        "demo",
        "note",
        FieldKind::Text,
        FieldValue::Single(String::new()),
    );
    store.global_set(
        &["selectors".into(), "field".into()],
        serde_json::json!("#custom-{formId}-{name}"),
    );

    let mut bucket = Bucket {
        top: vec!["note".into()],
        ..Bucket::default()
    };
    let sheet = apply(&mut store, "demo", BucketKind::ConditionalHide, &mut bucket).expect("apply");
    assert_eq!(sheet.css, "#custom-demo-note{display:none !important;}");
}
