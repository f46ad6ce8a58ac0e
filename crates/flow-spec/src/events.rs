//! Custom events emitted for external collaborators; nothing in this crate
//! consumes them.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum FormEvent {
    #[serde(rename = "form-loaded", rename_all = "camelCase")]
    FormLoaded { form_id: String },
    #[serde(rename = "field-changed", rename_all = "camelCase")]
    FieldChanged {
        form_id: String,
        name: String,
        value: Value,
    },
    #[serde(rename = "step-changed", rename_all = "camelCase")]
    StepChanged { form_id: String, name: String },
}
