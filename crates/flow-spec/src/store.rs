//! Key-path-addressable per-form state store.
//!
//! All per-form data (field descriptors, current values, cached rule
//! evaluations, visibility buckets, flow state) lives under a namespace keyed
//! by form id; a global namespace holds shared configuration seeded once at
//! process start. No other component reads field values except through this
//! store.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::consts;
use crate::error::FlowError;
use crate::evaluator::EvalRef;
use crate::flow::FlowState;
use crate::spec::field::{FieldDescriptor, FieldValue};
use crate::spec::rules::RuleSet;
use crate::spec::step::StepsSetup;
use crate::visibility::{Bucket, BucketKind};

/// One key of a state path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

impl PathSeg {
    pub fn key(name: impl Into<String>) -> Self {
        PathSeg::Key(name.into())
    }

    pub fn index(position: usize) -> Self {
        PathSeg::Index(position)
    }
}

impl From<&str> for PathSeg {
    fn from(value: &str) -> Self {
        PathSeg::Key(value.to_string())
    }
}

impl From<String> for PathSeg {
    fn from(value: String) -> Self {
        PathSeg::Key(value)
    }
}

impl From<usize> for PathSeg {
    fn from(value: usize) -> Self {
        PathSeg::Index(value)
    }
}

/// Explicitly injected state holder; never ambient, so multiple forms and
/// test instances stay isolated.
#[derive(Debug, Clone)]
pub struct StateStore {
    forms: BTreeMap<String, Value>,
    global: Value,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            forms: BTreeMap::new(),
            global: consts::global_defaults(),
        }
    }

    /// Reads through a path; missing intermediates yield `None`, they are
    /// never created on read.
    pub fn get(&self, form_id: &str, path: &[PathSeg]) -> Option<&Value> {
        read_path(self.forms.get(form_id)?, path)
    }

    /// Writes through a path, creating missing intermediate objects and
    /// arrays along the way.
    pub fn set(&mut self, form_id: &str, path: &[PathSeg], value: Value) {
        let root = self
            .forms
            .entry(form_id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        write_path(root, path, value);
    }

    pub fn global_get(&self, path: &[PathSeg]) -> Option<&Value> {
        read_path(&self.global, path)
    }

    pub fn global_set(&mut self, path: &[PathSeg], value: Value) {
        write_path(&mut self.global, path, value);
    }

    pub fn has_form(&self, form_id: &str) -> bool {
        self.forms.contains_key(form_id)
    }

    /// Tears down every record of a form.
    pub fn forget_form(&mut self, form_id: &str) {
        self.forms.remove(form_id);
    }

    // Typed accessors. Everything below routes through `get`/`set` so the raw
    // tree stays the single source of truth.

    pub fn set_field(&mut self, form_id: &str, field: &FieldDescriptor) -> Result<(), FlowError> {
        self.encode(form_id, &[PathSeg::key("fields"), PathSeg::key(&field.name)], field)
    }

    pub fn field(&self, form_id: &str, name: &str) -> Option<FieldDescriptor> {
        self.decode(form_id, &[PathSeg::key("fields"), PathSeg::key(name)])
    }

    pub fn field_names(&self, form_id: &str) -> Vec<String> {
        self.get(form_id, &[PathSeg::key("fields")])
            .and_then(Value::as_object)
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_field_value(
        &mut self,
        form_id: &str,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), FlowError> {
        self.encode(
            form_id,
            &[PathSeg::key("fields"), PathSeg::key(name), PathSeg::key("value")],
            value,
        )
    }

    pub fn field_value(&self, form_id: &str, name: &str) -> Option<FieldValue> {
        self.decode(
            form_id,
            &[PathSeg::key("fields"), PathSeg::key(name), PathSeg::key("value")],
        )
    }

    pub fn set_eval_ref(&mut self, form_id: &str, name: &str, eval: &EvalRef) -> Result<(), FlowError> {
        self.encode(form_id, &[PathSeg::key("eval"), PathSeg::key(name)], eval)
    }

    pub fn eval_ref(&self, form_id: &str, name: &str) -> Option<EvalRef> {
        self.decode(form_id, &[PathSeg::key("eval"), PathSeg::key(name)])
    }

    pub fn set_inner_eval_ref(
        &mut self,
        form_id: &str,
        name: &str,
        option: &str,
        eval: &EvalRef,
    ) -> Result<(), FlowError> {
        self.encode(
            form_id,
            &[PathSeg::key("evalInner"), PathSeg::key(name), PathSeg::key(option)],
            eval,
        )
    }

    pub fn inner_eval_ref(&self, form_id: &str, name: &str, option: &str) -> Option<EvalRef> {
        self.decode(
            form_id,
            &[PathSeg::key("evalInner"), PathSeg::key(name), PathSeg::key(option)],
        )
    }

    pub fn set_form_rules(&mut self, form_id: &str, rules: &RuleSet) -> Result<(), FlowError> {
        self.encode(form_id, &[PathSeg::key("rules"), PathSeg::key("form")], rules)
    }

    pub fn form_rules(&self, form_id: &str) -> Option<RuleSet> {
        self.decode(form_id, &[PathSeg::key("rules"), PathSeg::key("form")])
    }

    pub fn set_form_eval_ref(&mut self, form_id: &str, eval: &EvalRef) -> Result<(), FlowError> {
        self.encode(form_id, &[PathSeg::key("evalForm")], eval)
    }

    pub fn form_eval_ref(&self, form_id: &str) -> Option<EvalRef> {
        self.decode(form_id, &[PathSeg::key("evalForm")])
    }

    pub fn set_bucket(
        &mut self,
        form_id: &str,
        kind: BucketKind,
        bucket: &Bucket,
    ) -> Result<(), FlowError> {
        self.encode(
            form_id,
            &[PathSeg::key("buckets"), PathSeg::key(kind.slug())],
            bucket,
        )
    }

    pub fn bucket(&self, form_id: &str, kind: BucketKind) -> Option<Bucket> {
        self.decode(form_id, &[PathSeg::key("buckets"), PathSeg::key(kind.slug())])
    }

    pub fn set_flow_state(&mut self, form_id: &str, state: &FlowState) -> Result<(), FlowError> {
        self.encode(form_id, &[PathSeg::key("flow")], state)
    }

    pub fn flow_state(&self, form_id: &str) -> Option<FlowState> {
        self.decode(form_id, &[PathSeg::key("flow")])
    }

    pub fn set_steps_setup(&mut self, form_id: &str, setup: &StepsSetup) -> Result<(), FlowError> {
        self.encode(form_id, &[PathSeg::key("steps")], setup)
    }

    pub fn steps_setup(&self, form_id: &str) -> Option<StepsSetup> {
        self.decode(form_id, &[PathSeg::key("steps")])
    }

    /// Reads a selector or id template from the global namespace, falling
    /// back to the built-in default when the entry was overwritten badly.
    pub fn template(&self, group: &str, key: &str, fallback: &'static str) -> String {
        self.global_get(&[PathSeg::key(group), PathSeg::key(key)])
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    }

    fn encode<T: Serialize>(
        &mut self,
        form_id: &str,
        path: &[PathSeg],
        value: &T,
    ) -> Result<(), FlowError> {
        let encoded = serde_json::to_value(value)?;
        self.set(form_id, path, encoded);
        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self, form_id: &str, path: &[PathSeg]) -> Option<T> {
        let value = self.get(form_id, path)?;
        serde_json::from_value(value.clone()).ok()
    }
}

fn read_path<'a>(mut node: &'a Value, path: &[PathSeg]) -> Option<&'a Value> {
    for seg in path {
        node = match seg {
            PathSeg::Key(key) => node.get(key.as_str())?,
            PathSeg::Index(position) => node.get(*position)?,
        };
    }
    Some(node)
}

fn write_path(node: &mut Value, path: &[PathSeg], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    match head {
        PathSeg::Key(key) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Some(map) = node.as_object_mut() {
                let child = map.entry(key.clone()).or_insert(Value::Null);
                write_path(child, rest, value);
            }
        }
        PathSeg::Index(position) => {
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            if let Some(items) = node.as_array_mut() {
                while items.len() <= *position {
                    items.push(Value::Null);
                }
                write_path(&mut items[*position], rest, value);
            }
        }
    }
}
