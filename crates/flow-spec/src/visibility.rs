//! Visibility applier: turns evaluator output into batched CSS-selector
//! injection and clears the values of freshly hidden fields.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::consts;
use crate::error::FlowError;
use crate::spec::field::{FieldKind, FieldValue};
use crate::store::StateStore;

/// The three style targets, one `<style>` element each per form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    /// Form-level "hide whole form" rules.
    FormsHide,
    /// Form-level "show whole form" rules.
    FormsShow,
    /// Field- and option-level conditional tags.
    ConditionalHide,
}

impl BucketKind {
    pub fn slug(&self) -> &'static str {
        match self {
            BucketKind::FormsHide => "forms-hide",
            BucketKind::FormsShow => "forms-show",
            BucketKind::ConditionalHide => "ct-hide",
        }
    }

    pub fn is_show(&self) -> bool {
        matches!(self, BucketKind::FormsShow)
    }

    fn display_value(&self) -> &'static str {
        if self.is_show() { "initial" } else { "none" }
    }

    fn is_form_level(&self) -> bool {
        matches!(self, BucketKind::FormsHide | BucketKind::FormsShow)
    }
}

/// Names collected for one bucket. `top_final` is the deduplicated union of
/// `top` and cascaded `inner_parents`; it is the authoritative list of names
/// excluded from submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    #[serde(default)]
    pub top: Vec<String>,
    #[serde(default)]
    pub top_final: Vec<String>,
    #[serde(default)]
    pub inner_parents: Vec<String>,
    #[serde(default)]
    pub inner: BTreeMap<String, Vec<String>>,
}

/// The create-or-replace `<style>` element a host writes to the document.
/// An empty css body clears the rule without removing the element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StyleSheet {
    pub element_id: String,
    pub css: String,
}

/// Applies a bucket: builds one selector per hidden name, batches them into a
/// single style write, clears the values of hidden fields (unless this is a
/// show bucket), and persists the bucket with its deduplicated `top_final`.
pub fn apply(
    store: &mut StateStore,
    form_id: &str,
    kind: BucketKind,
    bucket: &mut Bucket,
) -> Result<StyleSheet, FlowError> {
    let mut selectors = Vec::new();
    let mut top_final = Vec::new();

    for name in &bucket.top {
        selectors.push(wrapper_selector(store, form_id, kind, name));
        if !top_final.contains(name) {
            top_final.push(name.clone());
        }
    }
    for name in &bucket.inner_parents {
        if !top_final.contains(name) {
            selectors.push(wrapper_selector(store, form_id, kind, name));
            top_final.push(name.clone());
        }
    }
    for (name, options) in &bucket.inner {
        let field_kind = store.field(form_id, name).map(|field| field.kind);
        for option in options {
            selectors.push(option_selector(store, form_id, name, field_kind, option));
        }
    }

    let css = if selectors.is_empty() {
        String::new()
    } else {
        format!(
            "{}{{display:{} !important;}}",
            selectors.join(","),
            kind.display_value()
        )
    };
    let element_id = store
        .template("style", "elementId", consts::STYLE_ELEMENT_ID)
        .replace("{formId}", form_id)
        .replace("{bucket}", kind.slug());

    if !kind.is_show() {
        // Hidden fields must not be submitted with stale data.
        for name in &top_final {
            if let Some(field) = store.field(form_id, name) {
                store.set_field_value(form_id, name, &FieldValue::cleared(field.kind))?;
            }
        }
    }

    bucket.top_final = top_final;
    store.set_bucket(form_id, kind, bucket)?;

    Ok(StyleSheet { element_id, css })
}

fn wrapper_selector(store: &StateStore, form_id: &str, kind: BucketKind, name: &str) -> String {
    if kind.is_form_level() {
        store
            .template("selectors", "form", consts::SELECTOR_FORM)
            .replace("{name}", name)
    } else {
        store
            .template("selectors", "field", consts::SELECTOR_FIELD)
            .replace("{formId}", form_id)
            .replace("{name}", name)
    }
}

fn option_selector(
    store: &StateStore,
    form_id: &str,
    name: &str,
    field_kind: Option<FieldKind>,
    option: &str,
) -> String {
    // Selects address options by value attribute, everything else by name.
    let template = match field_kind {
        Some(FieldKind::Select | FieldKind::Country) => {
            store.template("selectors", "optionValue", consts::SELECTOR_OPTION_VALUE)
        }
        _ => store.template("selectors", "optionName", consts::SELECTOR_OPTION_NAME),
    };
    template
        .replace("{formId}", form_id)
        .replace("{name}", name)
        .replace("{option}", option)
}
