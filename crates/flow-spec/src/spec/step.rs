use std::borrow::Cow;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::spec::rules::Condition;

/// One step of a multi-step form and the fields it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    pub id: String,
    #[serde(default)]
    pub field_names: Vec<String>,
}

impl StepDescriptor {
    pub fn new(id: impl Into<String>, field_names: Vec<String>) -> Self {
        Self {
            id: id.into(),
            field_names,
        }
    }
}

/// One branching entry of the multiflow table, serialized as
/// `[nextStepId, currentStepId, conditionGroups, progressBarCount, disableNextButton]`
/// with the trailing two elements optional on input.
///
/// Table order is significant: the first matching entry wins.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEntry {
    pub next_step_id: String,
    pub current_step_id: String,
    pub condition_groups: Vec<Vec<Condition>>,
    pub progress_bar_count: usize,
    pub disable_next_button: bool,
}

impl Serialize for FlowEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(5))?;
        seq.serialize_element(&self.next_step_id)?;
        seq.serialize_element(&self.current_step_id)?;
        seq.serialize_element(&self.condition_groups)?;
        seq.serialize_element(&self.progress_bar_count)?;
        seq.serialize_element(&self.disable_next_button)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for FlowEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = Vec::<Value>::deserialize(deserializer)?;
        if parts.len() < 3 {
            return Err(serde::de::Error::invalid_length(
                parts.len(),
                &"a [nextStepId, currentStepId, conditionGroups] entry",
            ));
        }
        let next_step_id = parts[0]
            .as_str()
            .ok_or_else(|| serde::de::Error::custom("nextStepId must be a string"))?
            .to_string();
        let current_step_id = parts[1]
            .as_str()
            .ok_or_else(|| serde::de::Error::custom("currentStepId must be a string"))?
            .to_string();
        let condition_groups =
            serde_json::from_value(parts[2].clone()).map_err(serde::de::Error::custom)?;
        let progress_bar_count = parts
            .get(3)
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let disable_next_button = parts.get(4).and_then(Value::as_bool).unwrap_or(false);
        Ok(FlowEntry {
            next_step_id,
            current_step_id,
            condition_groups,
            progress_bar_count,
            disable_next_button,
        })
    }
}

impl JsonSchema for FlowEntry {
    fn schema_name() -> Cow<'static, str> {
        "FlowEntry".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "array",
            "minItems": 3,
            "maxItems": 5,
        })
    }
}

/// The step layout carried by the step-validation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepsSetup {
    #[serde(default)]
    pub steps: Vec<StepDescriptor>,
    #[serde(default)]
    pub multiflow: Vec<FlowEntry>,
}
