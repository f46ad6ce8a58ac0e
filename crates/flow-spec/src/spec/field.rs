use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::comparator::Comparand;
use crate::spec::rules::RuleSet;

/// Field kinds understood by the evaluator and the visibility applier.
///
/// Value extraction and clearing match exhaustively on this, so adding a kind
/// is a compiler-checked exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Email,
    Select,
    Checkbox,
    Radio,
    Country,
    Phone,
    Date,
    DateTime,
    Range,
    Rating,
    File,
}

/// One selectable sub-option of a checkbox, radio, or select field.
///
/// For selects the first item is the non-selectable placeholder; conditional
/// tags never address it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldItem {
    pub name: String,
    pub value: String,
}

/// Current value of a field; the shape depends on the field kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    /// Country prefix plus subscriber number for phone fields.
    Phone { prefix: String, value: String },
    /// Sub-option name to checked value; unchecked options hold an empty
    /// string or are absent.
    Options(BTreeMap<String, String>),
    /// Multi-valued storage used by select and country fields.
    Many(Vec<String>),
    /// Scalar storage used by every other kind.
    Single(String),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Single(String::new())
    }
}

impl FieldValue {
    /// The empty value a hidden field is reset to, per kind.
    pub fn cleared(kind: FieldKind) -> FieldValue {
        match kind {
            FieldKind::Checkbox => FieldValue::Options(BTreeMap::new()),
            FieldKind::Select | FieldKind::Country => FieldValue::Many(Vec::new()),
            FieldKind::Phone => FieldValue::Phone {
                prefix: String::new(),
                value: String::new(),
            },
            FieldKind::Text
            | FieldKind::Email
            | FieldKind::Radio
            | FieldKind::Date
            | FieldKind::DateTime
            | FieldKind::Range
            | FieldKind::Rating
            | FieldKind::File => FieldValue::Single(String::new()),
        }
    }

    /// Coerces an untyped JSON value into the shape the kind expects.
    pub fn from_json(kind: FieldKind, raw: &Value) -> FieldValue {
        match kind {
            FieldKind::Checkbox => {
                let map = raw
                    .as_object()
                    .map(|object| {
                        object
                            .iter()
                            .map(|(key, value)| (key.clone(), scalar_string(value)))
                            .collect()
                    })
                    .unwrap_or_default();
                FieldValue::Options(map)
            }
            FieldKind::Select | FieldKind::Country => {
                let values = match raw {
                    Value::Array(items) => items.iter().map(scalar_string).collect(),
                    Value::Null => Vec::new(),
                    other => {
                        let text = scalar_string(other);
                        if text.is_empty() { Vec::new() } else { vec![text] }
                    }
                };
                FieldValue::Many(values)
            }
            FieldKind::Phone => FieldValue::Phone {
                prefix: raw
                    .get("prefix")
                    .map(scalar_string)
                    .unwrap_or_default(),
                value: raw.get("value").map(scalar_string).unwrap_or_default(),
            },
            _ => FieldValue::Single(scalar_string(raw)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Single(value) => value.is_empty(),
            FieldValue::Many(values) => values.iter().all(|value| value.is_empty()),
            FieldValue::Options(map) => map.values().all(|value| value.is_empty()),
            FieldValue::Phone { value, .. } => value.is_empty(),
        }
    }

    /// Flat string rendering used for plain-equality step-flow matching.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Single(value) => value.clone(),
            FieldValue::Many(values) => values.join(","),
            FieldValue::Options(map) => {
                let checked: Vec<&str> = map
                    .values()
                    .filter(|value| !value.is_empty())
                    .map(String::as_str)
                    .collect();
                checked.join(",")
            }
            FieldValue::Phone { prefix, value } => format!("{prefix}{value}"),
        }
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// One per form field name; created when the form is initialized from its
/// schema and kept for the form's lifetime. Hiding a field clears its value
/// but never destroys the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<FieldItem>,
    /// Snapshot taken at initialization, restored on form reset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<FieldValue>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleSet>,
    /// Per-option visibility rules, keyed by sub-option name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inner_rules: BTreeMap<String, RuleSet>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value: FieldValue::default(),
            items: Vec::new(),
            initial_value: None,
            required: false,
            pattern: None,
            rules: None,
            inner_rules: BTreeMap::new(),
        }
    }

    /// The comparison value this field contributes when another field's rule
    /// depends on it. `option_hint` is the rule's comparison value, used by
    /// checkboxes to address a specific sub-option.
    pub fn comparand(&self, option_hint: &str) -> Comparand {
        match (&self.kind, &self.value) {
            (FieldKind::Checkbox, FieldValue::Options(map)) => {
                if option_hint.is_empty() {
                    // Anything-checked signal: empty when nothing is checked.
                    let any = map.values().any(|value| !value.is_empty());
                    Comparand::One(if any { "true".to_string() } else { String::new() })
                } else {
                    Comparand::One(map.get(option_hint).cloned().unwrap_or_default())
                }
            }
            (FieldKind::Select | FieldKind::Country, FieldValue::Many(values)) => {
                Comparand::Many(values.clone())
            }
            (FieldKind::Phone, FieldValue::Phone { prefix, value }) => {
                Comparand::One(format!("{prefix}{value}"))
            }
            _ => Comparand::One(self.value.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cleared_values_match_kind() {
        assert_eq!(
            FieldValue::cleared(FieldKind::Text),
            FieldValue::Single(String::new())
        );
        assert_eq!(
            FieldValue::cleared(FieldKind::Checkbox),
            FieldValue::Options(BTreeMap::new())
        );
        assert_eq!(
            FieldValue::cleared(FieldKind::Country),
            FieldValue::Many(Vec::new())
        );
        assert!(FieldValue::cleared(FieldKind::Phone).is_empty());
    }

    #[test]
    fn from_json_coerces_shapes() {
        assert_eq!(
            FieldValue::from_json(FieldKind::Select, &json!("us")),
            FieldValue::Many(vec!["us".into()])
        );
        assert_eq!(
            FieldValue::from_json(FieldKind::Select, &json!(["us", "ca"])),
            FieldValue::Many(vec!["us".into(), "ca".into()])
        );
        assert_eq!(
            FieldValue::from_json(FieldKind::Range, &json!(5)),
            FieldValue::Single("5".into())
        );
        let phone = FieldValue::from_json(FieldKind::Phone, &json!({"prefix": "+44", "value": "7"}));
        assert_eq!(phone.display(), "+447");
    }

    #[test]
    fn checkbox_comparand_uses_option_hint() {
        let mut field = FieldDescriptor::new("hobbies", FieldKind::Checkbox);
        field.value = FieldValue::Options(BTreeMap::from([
            ("reading".to_string(), "reading".to_string()),
            ("sports".to_string(), String::new()),
        ]));
        assert_eq!(field.comparand("reading"), Comparand::One("reading".into()));
        assert_eq!(field.comparand("sports"), Comparand::One(String::new()));
        assert_eq!(field.comparand(""), Comparand::One("true".into()));
    }
}
