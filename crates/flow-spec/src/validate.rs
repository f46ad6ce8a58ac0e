//! Field validation used by the server-side step-validation decision.

use std::collections::BTreeMap;

use regex::Regex;

use crate::spec::field::{FieldDescriptor, FieldValue};

/// Field name to user-facing message, carried by the failure response.
pub type ValidationMap = BTreeMap<String, String>;

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_PATTERN: &str = "Value does not match the expected format.";

/// Validates one field against a candidate value. `None` means the value is
/// acceptable. An invalid pattern in the schema is skipped rather than
/// reported; authoring mistakes must not block submissions.
pub fn validate_value(field: &FieldDescriptor, value: &FieldValue) -> Option<String> {
    if field.required && value.is_empty() {
        return Some(MSG_REQUIRED.to_string());
    }

    if let Some(pattern) = &field.pattern
        && let Ok(regex) = Regex::new(pattern)
    {
        let text = value.display();
        if !text.is_empty() && !regex.is_match(&text) {
            return Some(MSG_PATTERN.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::FieldKind;

    #[test]
    fn required_empty_value_fails() {
        let mut field = FieldDescriptor::new("name", FieldKind::Text);
        field.required = true;
        assert_eq!(
            validate_value(&field, &FieldValue::Single(String::new())),
            Some(MSG_REQUIRED.to_string())
        );
        assert_eq!(validate_value(&field, &FieldValue::Single("x".into())), None);
    }

    #[test]
    fn pattern_mismatch_fails_but_bad_pattern_is_skipped() {
        let mut field = FieldDescriptor::new("email", FieldKind::Email);
        field.pattern = Some("^[^@\\s]+@[^@\\s]+$".into());
        assert!(validate_value(&field, &FieldValue::Single("nope".into())).is_some());
        assert_eq!(
            validate_value(&field, &FieldValue::Single("a@b.co".into())),
            None
        );

        field.pattern = Some("(unclosed".into());
        assert_eq!(
            validate_value(&field, &FieldValue::Single("anything".into())),
            None
        );
    }

    #[test]
    fn optional_empty_value_passes_pattern() {
        let mut field = FieldDescriptor::new("email", FieldKind::Email);
        field.pattern = Some("@".into());
        assert_eq!(
            validate_value(&field, &FieldValue::Single(String::new())),
            None
        );
    }
}
