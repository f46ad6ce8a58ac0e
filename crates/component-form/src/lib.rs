//! String-in/string-out API for the authoritative server side of the rules
//! engine: visibility computation, the step-validation decision, and
//! submission filtering.
//!
//! The client runs the same algorithms as an optimistic preview; whatever
//! this component answers wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use flow_spec::{
    BucketKind, FieldValue, FlowError, FormEngine, FormSchema, StepsSetup, ValidationMap, consts,
    compute_next_step, validate_value,
    visibility::StyleSheet,
};

const DEFAULT_SCHEMA: &str = include_str!("../../flow-spec/tests/fixtures/contact_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_schema_json: Option<String>,
}

/// Wire shape of the step-validation request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepRequest {
    form_id: String,
    current_step_id: String,
    #[serde(default)]
    submitted_field_values: Map<String, Value>,
    #[serde(default)]
    steps_setup: StepsSetup,
}

fn load_form_schema(config_json: &str) -> Result<FormSchema, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let schema_json = config.form_schema_json.as_deref().unwrap_or(DEFAULT_SCHEMA);

    serde_json::from_str(schema_json).map_err(ComponentError::ConfigParse)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSchema, ComponentError> {
    let schema = load_form_schema(config_json)?;
    if schema.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(schema)
    }
}

fn parse_values(values_json: &str) -> Map<String, Value> {
    serde_json::from_str::<Value>(values_json)
        .ok()
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default()
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// Evaluates the conditional tags server-side: an engine instance seeded with
/// the schema, with every submitted value applied.
fn evaluated_engine(
    schema: &FormSchema,
    values: &Map<String, Value>,
) -> Result<(FormEngine, Vec<StyleSheet>), ComponentError> {
    let mut engine = FormEngine::new();
    let mut styles = engine.init_form(schema)?.styles;
    for (name, raw) in values {
        let Some(field) = schema.field(name) else {
            continue;
        };
        let outcome = engine.set_value(&schema.id, name, FieldValue::from_json(field.kind, raw))?;
        styles = outcome.styles;
    }
    Ok((engine, styles))
}

/// Field names excluded from validation and submission because the rules hid
/// them for the given values.
fn hidden_names(
    schema: &FormSchema,
    values: &Map<String, Value>,
) -> Result<Vec<String>, ComponentError> {
    let (engine, _) = evaluated_engine(schema, values)?;
    Ok(engine
        .store()
        .bucket(&schema.id, BucketKind::ConditionalHide)
        .map(|bucket| bucket.top_final)
        .unwrap_or_default())
}

/// Echoes the parsed schema for a form id.
pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        serde_json::to_value(schema).map_err(ComponentError::JsonEncode)
    }))
}

/// Computes the conditional-hide bucket and batched style output for a set of
/// field values. `topFinal` in the result is the authoritative list of names
/// excluded from submission.
pub fn compute_visibility(form_id: &str, config_json: &str, values_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        let values = parse_values(values_json);
        let (engine, styles) = evaluated_engine(&schema, &values)?;
        let bucket = engine
            .store()
            .bucket(&schema.id, BucketKind::ConditionalHide)
            .unwrap_or_default();
        Ok(json!({
            "bucket": serde_json::to_value(&bucket).map_err(ComponentError::JsonEncode)?,
            "styles": serde_json::to_value(&styles).map_err(ComponentError::JsonEncode)?,
        }))
    }))
}

/// The authoritative step-validation decision.
///
/// Visible required/pattern constraints on the current step are checked
/// first; a failure response carries the field-to-message map so the client
/// can jump to the first failing field. On success the next step is computed
/// with the same algorithm the client previews with; a validated terminal
/// step resolves to the submit sentinel.
pub fn validate_step(form_id: &str, config_json: &str, request_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        let request: StepRequest =
            serde_json::from_str(request_json).map_err(ComponentError::ConfigParse)?;
        if request.form_id != schema.id {
            return Err(ComponentError::FormUnavailable(request.form_id));
        }

        let setup = if request.steps_setup.steps.is_empty() {
            schema.steps_setup()
        } else {
            request.steps_setup.clone()
        };
        let current = setup
            .steps
            .iter()
            .find(|step| step.id == request.current_step_id)
            .ok_or_else(|| {
                ComponentError::Flow(FlowError::UnknownStep(request.current_step_id.clone()))
            })?;

        let excluded = hidden_names(&schema, &request.submitted_field_values)?;
        let mut validation = ValidationMap::new();
        for name in &current.field_names {
            if excluded.contains(name) {
                continue;
            }
            let Some(field) = schema.field(name) else {
                continue;
            };
            let raw = request
                .submitted_field_values
                .get(name)
                .cloned()
                .unwrap_or(Value::Null);
            let value = FieldValue::from_json(field.kind, &raw);
            if let Some(message) = validate_value(field, &value) {
                validation.insert(name.clone(), message);
            }
        }
        if !validation.is_empty() {
            let mut map = Map::new();
            map.insert(
                consts::RESPONSE_VALIDATION.to_string(),
                serde_json::to_value(&validation).map_err(ComponentError::JsonEncode)?,
            );
            return Ok(Value::Object(map));
        }

        let mut map = Map::new();
        match compute_next_step(
            &setup.steps,
            &setup.multiflow,
            &request.current_step_id,
            &request.submitted_field_values,
        ) {
            Ok(next) => {
                map.insert(consts::RESPONSE_STEP_TYPE.to_string(), json!(next.kind.as_str()));
                map.insert(consts::RESPONSE_STEP_NEXT_STEP.to_string(), json!(next.step_id));
                map.insert(
                    consts::RESPONSE_STEP_PROGRESS_BAR_ITEMS.to_string(),
                    json!(next.progress_count),
                );
                map.insert(
                    consts::RESPONSE_STEP_IS_DISABLE_NEXT_BUTTON.to_string(),
                    json!(next.disable_next),
                );
            }
            Err(error) if error.is_no_next_step() => {
                // Terminal step validated: submission replaces navigation.
                let kind = if setup.multiflow.is_empty() {
                    "multistep"
                } else {
                    "multiflow"
                };
                map.insert(consts::RESPONSE_STEP_TYPE.to_string(), json!(kind));
                map.insert(
                    consts::RESPONSE_STEP_NEXT_STEP.to_string(),
                    json!(consts::NEXT_STEP_SUBMIT),
                );
                map.insert(
                    consts::RESPONSE_STEP_PROGRESS_BAR_ITEMS.to_string(),
                    json!(setup.steps.len()),
                );
                map.insert(
                    consts::RESPONSE_STEP_IS_DISABLE_NEXT_BUTTON.to_string(),
                    json!(true),
                );
            }
            Err(error) => return Err(ComponentError::Flow(error)),
        }
        Ok(Value::Object(map))
    }))
}

/// Validates a full submission and strips every hidden field from it.
pub fn submit(form_id: &str, config_json: &str, values_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        let values = parse_values(values_json);
        let excluded = hidden_names(&schema, &values)?;

        let mut validation = ValidationMap::new();
        for field in &schema.fields {
            if excluded.contains(&field.name) {
                continue;
            }
            let raw = values.get(&field.name).cloned().unwrap_or(Value::Null);
            let value = FieldValue::from_json(field.kind, &raw);
            if let Some(message) = validate_value(field, &value) {
                validation.insert(field.name.clone(), message);
            }
        }
        if !validation.is_empty() {
            let mut map = Map::new();
            map.insert(
                consts::RESPONSE_VALIDATION.to_string(),
                serde_json::to_value(&validation).map_err(ComponentError::JsonEncode)?,
            );
            return Ok(Value::Object(map));
        }

        let filtered: Map<String, Value> = values
            .into_iter()
            .filter(|(name, _)| !excluded.contains(name))
            .collect();
        Ok(json!({
            "status": "success",
            "values": filtered,
        }))
    }))
}
