use serde_json::{Value, json};

/// Shared attribute, selector, event, and wire-format names.
///
/// These are seeded into the global namespace of the state store once at
/// process start; components read them through the store rather than
/// hard-coding selector shapes.
pub const ATTR_FORM_ID: &str = "data-form-id";
pub const ATTR_FIELD_NAME: &str = "data-field-name";

pub const SELECTOR_FIELD: &str = "[data-form-id=\"{formId}\"] [data-field-name=\"{name}\"]";
pub const SELECTOR_FORM: &str = "[data-form-id=\"{name}\"]";
pub const SELECTOR_OPTION_VALUE: &str =
    "[data-form-id=\"{formId}\"] [data-field-name=\"{name}\"] option[value=\"{option}\"]";
pub const SELECTOR_OPTION_NAME: &str =
    "[data-form-id=\"{formId}\"] [data-field-name=\"{name}\"] [name=\"{option}\"]";

pub const STYLE_ELEMENT_ID: &str = "style-{formId}-{bucket}";

pub const EVENT_FORM_LOADED: &str = "form-loaded";
pub const EVENT_FIELD_CHANGED: &str = "field-changed";
pub const EVENT_STEP_CHANGED: &str = "step-changed";

pub const RESPONSE_STEP_TYPE: &str = "stepType";
pub const RESPONSE_STEP_NEXT_STEP: &str = "stepNextStep";
pub const RESPONSE_STEP_PROGRESS_BAR_ITEMS: &str = "stepProgressBarItems";
pub const RESPONSE_STEP_IS_DISABLE_NEXT_BUTTON: &str = "stepIsDisableNextButton";
pub const RESPONSE_VALIDATION: &str = "validation";

/// Sentinel returned instead of a step id when the terminal step validates
/// successfully and the only remaining transition is submission.
pub const NEXT_STEP_SUBMIT: &str = "submit";

/// Initial contents of the global (non-form-scoped) store namespace.
pub fn global_defaults() -> Value {
    json!({
        "selectors": {
            "field": SELECTOR_FIELD,
            "form": SELECTOR_FORM,
            "optionValue": SELECTOR_OPTION_VALUE,
            "optionName": SELECTOR_OPTION_NAME,
        },
        "style": {
            "elementId": STYLE_ELEMENT_ID,
        },
        "events": {
            "formLoaded": EVENT_FORM_LOADED,
            "fieldChanged": EVENT_FIELD_CHANGED,
            "stepChanged": EVENT_STEP_CHANGED,
        },
        "responseKeys": {
            "stepType": RESPONSE_STEP_TYPE,
            "stepNextStep": RESPONSE_STEP_NEXT_STEP,
            "stepProgressBarItems": RESPONSE_STEP_PROGRESS_BAR_ITEMS,
            "stepIsDisableNextButton": RESPONSE_STEP_IS_DISABLE_NEXT_BUTTON,
            "validation": RESPONSE_VALIDATION,
        },
        "comparators": [
            "is", "isn", "gt", "gte", "lt", "lte",
            "c", "cn", "sw", "ew", "b", "bs", "bn", "bns",
        ],
    })
}
