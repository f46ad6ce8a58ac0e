//! Client-side runtime facade wiring the store, evaluator, visibility
//! applier, and step-flow controller into one synchronous pipeline.
//!
//! Every mutation recomputes and re-applies visibility in the same call, so
//! the returned style output is never stale relative to the triggering input.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::FlowError;
use crate::evaluator::{self, DependencyIndex, build_eval_ref};
use crate::events::FormEvent;
use crate::flow::{self, FlowState, NextStep, ProgressBar};
use crate::messages::MessageChannel;
use crate::spec::field::FieldValue;
use crate::spec::form::FormSchema;
use crate::spec::rules::Direction;
use crate::store::StateStore;
use crate::visibility::{self, Bucket, BucketKind, StyleSheet};

/// What a mutation produced: batched style writes (one per bucket) and the
/// events to dispatch to external collaborators.
#[derive(Debug, Default)]
pub struct ChangeOutcome {
    pub styles: Vec<StyleSheet>,
    pub events: Vec<FormEvent>,
}

/// Per-process engine hosting any number of isolated form instances.
#[derive(Debug, Default)]
pub struct FormEngine {
    store: StateStore,
    indexes: BTreeMap<String, DependencyIndex>,
    messages: BTreeMap<String, MessageChannel>,
}

impl FormEngine {
    pub fn new() -> Self {
        Self {
            store: StateStore::new(),
            indexes: BTreeMap::new(),
            messages: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Registers a form: normalizes its rule sets against the fields that
    /// actually exist, snapshots initial values, builds the dependency index
    /// and evaluation references, seeds the flow state, and applies the
    /// initial visibility pass.
    pub fn init_form(&mut self, schema: &FormSchema) -> Result<ChangeOutcome, FlowError> {
        let form_id = schema.id.clone();
        let known = schema.field_names();

        let mut normalized = schema.clone();
        for field in &mut normalized.fields {
            if let Some(rules) = &field.rules {
                field.rules = Some(rules.normalize(&known));
            }
            for rules in field.inner_rules.values_mut() {
                *rules = rules.normalize(&known);
            }
            field.initial_value = Some(field.value.clone());
        }
        if let Some(rules) = &normalized.form_rules {
            normalized.form_rules = Some(rules.normalize(&known));
        }

        let index = evaluator::build_dependency_index(&normalized);

        for field in &normalized.fields {
            self.store.set_field(&form_id, field)?;
            if let Some(rules) = &field.rules {
                self.store
                    .set_eval_ref(&form_id, &field.name, &build_eval_ref(rules))?;
            }
            for (option, rules) in &field.inner_rules {
                self.store
                    .set_inner_eval_ref(&form_id, &field.name, option, &build_eval_ref(rules))?;
            }
        }
        if let Some(rules) = &normalized.form_rules {
            self.store.set_form_rules(&form_id, rules)?;
            self.store.set_form_eval_ref(&form_id, &build_eval_ref(rules))?;
        }

        self.store.set_steps_setup(&form_id, &normalized.steps_setup())?;
        if let Some(first) = normalized.steps.first() {
            self.store
                .set_flow_state(&form_id, &FlowState::start(&first.id))?;
        }

        // Prime every cached cell from the initial values.
        for name in &self.store.field_names(&form_id) {
            evaluator::recompute(&mut self.store, &form_id, name, &index)?;
        }
        self.indexes.insert(form_id.clone(), index);
        self.messages.entry(form_id.clone()).or_default();

        let styles = self.refresh_visibility(&form_id)?;
        Ok(ChangeOutcome {
            styles,
            events: vec![FormEvent::FormLoaded { form_id }],
        })
    }

    /// Stores a user-facing field mutation and synchronously re-derives
    /// visibility before returning.
    pub fn set_value(
        &mut self,
        form_id: &str,
        name: &str,
        value: FieldValue,
    ) -> Result<ChangeOutcome, FlowError> {
        if self.store.field(form_id, name).is_none() {
            return Err(FlowError::UnknownField(name.to_string()));
        }
        let index = self
            .indexes
            .get(form_id)
            .ok_or_else(|| FlowError::UnknownForm(form_id.to_string()))?;

        self.store.set_field_value(form_id, name, &value)?;
        evaluator::recompute(&mut self.store, form_id, name, index)?;

        let styles = self.refresh_visibility(form_id)?;
        Ok(ChangeOutcome {
            styles,
            events: vec![FormEvent::FieldChanged {
                form_id: form_id.to_string(),
                name: name.to_string(),
                value: serde_json::to_value(&value)?,
            }],
        })
    }

    /// Optimistic forward navigation. A "cannot advance" condition is not an
    /// error: it surfaces through the global-message channel and leaves the
    /// flow state untouched.
    pub fn advance(&mut self, form_id: &str) -> Result<ChangeOutcome, FlowError> {
        let setup = self
            .store
            .steps_setup(form_id)
            .ok_or_else(|| FlowError::UnknownForm(form_id.to_string()))?;
        let mut state = self
            .store
            .flow_state(form_id)
            .ok_or_else(|| FlowError::UnknownForm(form_id.to_string()))?;
        if state.pending || state.next_disabled {
            return Ok(ChangeOutcome::default());
        }

        let values = self.submitted_values(form_id);
        match flow::compute_next_step(&setup.steps, &setup.multiflow, &state.current_step_id, &values)
        {
            Ok(decision) => {
                state.go_forward(&decision);
                self.store.set_flow_state(form_id, &state)?;
                Ok(ChangeOutcome {
                    styles: Vec::new(),
                    events: vec![FormEvent::StepChanged {
                        form_id: form_id.to_string(),
                        name: decision.step_id,
                    }],
                })
            }
            Err(error) if error.is_no_next_step() => {
                self.show_message(form_id, error.to_string());
                Ok(ChangeOutcome::default())
            }
            Err(error) => Err(error),
        }
    }

    /// Backward navigation pops the visited stack without re-validation.
    pub fn back(&mut self, form_id: &str) -> Result<ChangeOutcome, FlowError> {
        let mut state = self
            .store
            .flow_state(form_id)
            .ok_or_else(|| FlowError::UnknownForm(form_id.to_string()))?;
        let Some(previous) = state.go_backward().map(str::to_string) else {
            return Ok(ChangeOutcome::default());
        };
        self.store.set_flow_state(form_id, &state)?;
        Ok(ChangeOutcome {
            styles: Vec::new(),
            events: vec![FormEvent::StepChanged {
                form_id: form_id.to_string(),
                name: previous,
            }],
        })
    }

    /// Jumps to the step owning `field_name`, used when the server reports a
    /// validation error outside the current step.
    pub fn jump_to_field(&mut self, form_id: &str, field_name: &str) -> Result<ChangeOutcome, FlowError> {
        let setup = self
            .store
            .steps_setup(form_id)
            .ok_or_else(|| FlowError::UnknownForm(form_id.to_string()))?;
        let mut state = self
            .store
            .flow_state(form_id)
            .ok_or_else(|| FlowError::UnknownForm(form_id.to_string()))?;
        let Some(target) = state
            .go_to_step_containing(&setup.steps, field_name)
            .map(str::to_string)
        else {
            return Ok(ChangeOutcome::default());
        };
        self.store.set_flow_state(form_id, &state)?;
        Ok(ChangeOutcome {
            styles: Vec::new(),
            events: vec![FormEvent::StepChanged {
                form_id: form_id.to_string(),
                name: target,
            }],
        })
    }

    /// Marks a step-validation request as in flight; navigation controls stay
    /// disabled until the matching generation completes.
    pub fn begin_step_request(&mut self, form_id: &str) -> Result<u64, FlowError> {
        let mut state = self
            .store
            .flow_state(form_id)
            .ok_or_else(|| FlowError::UnknownForm(form_id.to_string()))?;
        let generation = state.begin_request();
        self.store.set_flow_state(form_id, &state)?;
        Ok(generation)
    }

    /// Applies the authoritative server decision. A stale generation (a newer
    /// request superseded it) is ignored; otherwise the server's answer
    /// overwrites whatever the optimistic preview decided.
    pub fn apply_server_step(
        &mut self,
        form_id: &str,
        generation: u64,
        decision: &NextStep,
    ) -> Result<ChangeOutcome, FlowError> {
        let mut state = self
            .store
            .flow_state(form_id)
            .ok_or_else(|| FlowError::UnknownForm(form_id.to_string()))?;
        if !state.finish_request(generation) {
            return Ok(ChangeOutcome::default());
        }
        let changed = state.current_step_id != decision.step_id;
        state.apply_server_decision(decision);
        self.store.set_flow_state(form_id, &state)?;
        let events = if changed {
            vec![FormEvent::StepChanged {
                form_id: form_id.to_string(),
                name: decision.step_id.clone(),
            }]
        } else {
            Vec::new()
        };
        Ok(ChangeOutcome {
            styles: Vec::new(),
            events,
        })
    }

    /// Restores every field to its initialization snapshot and rewinds the
    /// flow to the first step.
    pub fn reset_form(&mut self, form_id: &str) -> Result<ChangeOutcome, FlowError> {
        let index = self
            .indexes
            .get(form_id)
            .ok_or_else(|| FlowError::UnknownForm(form_id.to_string()))?
            .clone();
        for name in self.store.field_names(form_id) {
            let Some(field) = self.store.field(form_id, &name) else {
                continue;
            };
            let restored = field
                .initial_value
                .clone()
                .unwrap_or_else(|| FieldValue::cleared(field.kind));
            self.store.set_field_value(form_id, &name, &restored)?;
            evaluator::recompute(&mut self.store, form_id, &name, &index)?;
        }
        if let Some(setup) = self.store.steps_setup(form_id)
            && let Some(first) = setup.steps.first()
        {
            let mut state = self.store.flow_state(form_id).unwrap_or_default();
            state.reset(&first.id);
            self.store.set_flow_state(form_id, &state)?;
        }
        if let Some(channel) = self.messages.get_mut(form_id) {
            channel.dismiss();
        }
        let styles = self.refresh_visibility(form_id)?;
        Ok(ChangeOutcome {
            styles,
            events: Vec::new(),
        })
    }

    /// Tears a form down entirely.
    pub fn teardown(&mut self, form_id: &str) {
        self.store.forget_form(form_id);
        self.indexes.remove(form_id);
        self.messages.remove(form_id);
    }

    pub fn progress(&self, form_id: &str) -> Option<ProgressBar> {
        let setup = self.store.steps_setup(form_id)?;
        let state = self.store.flow_state(form_id)?;
        Some(flow::progress_bar(
            &setup.steps,
            !setup.multiflow.is_empty(),
            &state,
            state.progress_count,
        ))
    }

    pub fn show_message(&mut self, form_id: &str, text: impl Into<String>) -> u64 {
        self.messages.entry(form_id.to_string()).or_default().show(text)
    }

    pub fn expire_message(&mut self, form_id: &str, token: u64) -> bool {
        self.messages
            .get_mut(form_id)
            .map(|channel| channel.expire(token))
            .unwrap_or(false)
    }

    pub fn message(&self, form_id: &str) -> Option<&str> {
        self.messages.get(form_id)?.current()
    }

    /// Current values keyed by field name, with everything on the
    /// authoritative exclusion list stripped out.
    pub fn submitted_values(&self, form_id: &str) -> Map<String, Value> {
        let excluded = self
            .store
            .bucket(form_id, BucketKind::ConditionalHide)
            .map(|bucket| bucket.top_final)
            .unwrap_or_default();
        let mut values = Map::new();
        for name in self.store.field_names(form_id) {
            if excluded.contains(&name) {
                continue;
            }
            if let Some(value) = self.store.field_value(form_id, &name) {
                values.insert(name, Value::String(value.display()));
            }
        }
        values
    }

    /// Rebuilds all three buckets from the cached evaluation state and
    /// applies them: one batched style write per bucket per cycle.
    ///
    /// Applying a hide bucket clears hidden fields' values, which can flip
    /// cached cells that depend on those fields. Each pass recomputes the
    /// dependents of every value it cleared and repeats until no value
    /// changes; a pass only ever clears values, so the loop settles.
    fn refresh_visibility(&mut self, form_id: &str) -> Result<Vec<StyleSheet>, FlowError> {
        let index = self.indexes.get(form_id).cloned().unwrap_or_default();
        loop {
            let mut conditional = Bucket::default();
            for name in self.store.field_names(form_id) {
                if evaluator::decide_top_level(&self.store, form_id, &name) == Some(true) {
                    conditional.top.push(name.clone());
                }
                let Some(field) = self.store.field(form_id, &name) else {
                    continue;
                };
                let mut hidden_options = Vec::new();
                for option in field.inner_rules.keys() {
                    if evaluator::decide_inner_option(&self.store, form_id, &name, option)
                        == Some(true)
                    {
                        hidden_options.push(option.clone());
                    }
                }
                if !hidden_options.is_empty() {
                    if evaluator::parent_cascade(field.kind, hidden_options.len(), field.items.len())
                    {
                        conditional.inner_parents.push(name.clone());
                    }
                    conditional.inner.insert(name.clone(), hidden_options);
                }
            }

            let mut forms_hide = Bucket::default();
            let mut forms_show = Bucket::default();
            if let Some((direction, true)) = evaluator::decide_form(&self.store, form_id) {
                match direction {
                    Direction::Hide => forms_hide.top.push(form_id.to_string()),
                    Direction::Show => forms_show.top.push(form_id.to_string()),
                }
            }

            let before: BTreeMap<String, FieldValue> = self
                .store
                .field_names(form_id)
                .into_iter()
                .filter_map(|name| {
                    self.store
                        .field_value(form_id, &name)
                        .map(|value| (name, value))
                })
                .collect();

            // Empty buckets are still applied so a previously written style
            // rule gets blanked out rather than lingering.
            let styles = vec![
                visibility::apply(&mut self.store, form_id, BucketKind::FormsHide, &mut forms_hide)?,
                visibility::apply(&mut self.store, form_id, BucketKind::FormsShow, &mut forms_show)?,
                visibility::apply(
                    &mut self.store,
                    form_id,
                    BucketKind::ConditionalHide,
                    &mut conditional,
                )?,
            ];

            let cleared: Vec<String> = before
                .into_iter()
                .filter(|(name, old)| self.store.field_value(form_id, name).as_ref() != Some(old))
                .map(|(name, _)| name)
                .collect();
            if cleared.is_empty() {
                return Ok(styles);
            }
            for name in &cleared {
                evaluator::recompute(&mut self.store, form_id, name, &index)?;
            }
        }
    }
}
