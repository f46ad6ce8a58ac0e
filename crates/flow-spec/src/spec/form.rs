use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::FieldDescriptor;
use crate::spec::rules::RuleSet;
use crate::spec::step::{FlowEntry, StepDescriptor, StepsSetup};

/// Top-level form definition consumed by the engine, the server authority,
/// and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multiflow: Vec<FlowEntry>,
    /// Rule set controlling visibility of the form as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_rules: Option<RuleSet>,
}

impl FormSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> BTreeSet<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    pub fn steps_setup(&self) -> StepsSetup {
        StepsSetup {
            steps: self.steps.clone(),
            multiflow: self.multiflow.clone(),
        }
    }

    /// True when the form uses the branching multiflow table rather than the
    /// plain linear step order.
    pub fn is_multiflow(&self) -> bool {
        !self.multiflow.is_empty()
    }
}
