//! Step-flow controller: next-step computation, navigation history, and
//! progress tracking.
//!
//! [`compute_next_step`] is shared verbatim between the client-side
//! optimistic preview and the server authority; the server's answer always
//! wins when the two disagree.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FlowError;
use crate::spec::step::{FlowEntry, StepDescriptor};

/// Whether the form navigates linearly or through the branching table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Multistep,
    Multiflow,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Multistep => "multistep",
            StepKind::Multiflow => "multiflow",
        }
    }
}

/// The decision produced by [`compute_next_step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextStep {
    pub step_id: String,
    pub kind: StepKind,
    pub progress_count: usize,
    pub disable_next: bool,
}

/// Computes the step that follows `current`.
///
/// Multiflow entries for the current step are evaluated in table order with
/// OR-of-AND semantics over the submitted values, using plain string equality
/// only; the first matching entry wins and the order must never be reshuffled.
/// When no entry matches (or the table is empty) the linear successor is
/// used. An unknown current step or a missing successor is reported to the
/// caller, not swallowed.
pub fn compute_next_step(
    steps: &[StepDescriptor],
    table: &[FlowEntry],
    current: &str,
    values: &Map<String, Value>,
) -> Result<NextStep, FlowError> {
    let kind = if table.is_empty() {
        StepKind::Multistep
    } else {
        StepKind::Multiflow
    };

    for entry in table {
        if entry.current_step_id != current {
            continue;
        }
        if entry_matches(entry, values) {
            let progress_count = if entry.progress_bar_count > 0 {
                entry.progress_bar_count
            } else {
                steps.len()
            };
            return Ok(NextStep {
                disable_next: entry.disable_next_button
                    || is_terminal(steps, &entry.next_step_id),
                step_id: entry.next_step_id.clone(),
                kind,
                progress_count,
            });
        }
    }

    let position = steps
        .iter()
        .position(|step| step.id == current)
        .ok_or_else(|| FlowError::UnknownStep(current.to_string()))?;
    let next = steps
        .get(position + 1)
        .ok_or_else(|| FlowError::NoNextStep(current.to_string()))?;
    Ok(NextStep {
        step_id: next.id.clone(),
        kind,
        progress_count: steps.len(),
        disable_next: is_terminal(steps, &next.id),
    })
}

fn entry_matches(entry: &FlowEntry, values: &Map<String, Value>) -> bool {
    entry.condition_groups.iter().any(|group| {
        group
            .iter()
            .all(|condition| submitted_value(values, &condition.field) == condition.value)
    })
}

fn submitted_value(values: &Map<String, Value>, field: &str) -> String {
    match values.get(field) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(num)) => num.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
            .collect::<Vec<_>>()
            .join(","),
        _ => String::new(),
    }
}

fn is_terminal(steps: &[StepDescriptor], step_id: &str) -> bool {
    steps.last().map(|step| step.id == step_id).unwrap_or(false)
}

/// Navigation history of one form instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub current_step_id: String,
    /// Steps left behind on forward navigation; popped when going back.
    #[serde(default)]
    pub visited: Vec<String>,
    /// Monotonic counter guarding against stale in-flight step responses.
    #[serde(default)]
    pub generation: u64,
    /// True while a step-validation request is outstanding; navigation is
    /// refused until the response lands.
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub next_disabled: bool,
    /// Progress-bar count carried by the last multiflow decision; zero means
    /// no override.
    #[serde(default)]
    pub progress_count: usize,
}

impl FlowState {
    pub fn start(first_step_id: &str) -> Self {
        FlowState {
            current_step_id: first_step_id.to_string(),
            ..FlowState::default()
        }
    }

    /// Pushes the current step and moves to the decided one.
    pub fn go_forward(&mut self, decision: &NextStep) {
        self.visited.push(self.current_step_id.clone());
        self.current_step_id = decision.step_id.clone();
        self.next_disabled = decision.disable_next;
        self.progress_count = decision.progress_count;
    }

    /// Pops the history, restoring the previous step without re-validation.
    pub fn go_backward(&mut self) -> Option<&str> {
        let previous = self.visited.pop()?;
        self.current_step_id = previous;
        self.next_disabled = false;
        Some(self.current_step_id.as_str())
    }

    /// Jumps to the step owning `field_name`, truncating the history as if
    /// the user had navigated back to it. Used when the server reports a
    /// validation error on a field outside the current step.
    pub fn go_to_step_containing(
        &mut self,
        steps: &[StepDescriptor],
        field_name: &str,
    ) -> Option<&str> {
        let target = steps
            .iter()
            .find(|step| step.field_names.iter().any(|name| name == field_name))?;
        if let Some(position) = self.visited.iter().position(|id| *id == target.id) {
            self.visited.truncate(position);
        }
        self.current_step_id = target.id.clone();
        self.next_disabled = false;
        Some(self.current_step_id.as_str())
    }

    pub fn reset(&mut self, first_step_id: &str) {
        self.current_step_id = first_step_id.to_string();
        self.visited.clear();
        self.pending = false;
        self.next_disabled = false;
        self.progress_count = 0;
    }

    /// Marks a step request as in flight and returns its generation token.
    pub fn begin_request(&mut self) -> u64 {
        self.generation += 1;
        self.pending = true;
        self.generation
    }

    /// Completes a request; returns false when the token is stale (a newer
    /// request superseded it) and the response must be ignored.
    pub fn finish_request(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.pending = false;
        true
    }

    /// Overwrites the optimistic position with the server's decision.
    pub fn apply_server_decision(&mut self, decision: &NextStep) {
        if self.current_step_id != decision.step_id {
            self.current_step_id = decision.step_id.clone();
        }
        self.next_disabled = decision.disable_next;
        self.progress_count = decision.progress_count;
    }
}

/// Marker rendered for one linear step in the progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepMarker {
    pub id: String,
    pub active: bool,
    pub complete: bool,
}

/// Progress-bar fill: per-step markers for linear forms, a flat counter for
/// multiflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProgressBar {
    Markers { items: Vec<StepMarker> },
    Flat { count: usize, position: usize },
}

/// Recomputes the progress-bar fill for the current flow state.
pub fn progress_bar(
    steps: &[StepDescriptor],
    multiflow: bool,
    state: &FlowState,
    override_count: usize,
) -> ProgressBar {
    if multiflow {
        ProgressBar::Flat {
            count: if override_count > 0 {
                override_count
            } else {
                steps.len()
            },
            position: state.visited.len() + 1,
        }
    } else {
        ProgressBar::Markers {
            items: steps
                .iter()
                .map(|step| StepMarker {
                    id: step.id.clone(),
                    active: step.id == state.current_step_id,
                    complete: state.visited.iter().any(|id| *id == step.id),
                })
                .collect(),
        }
    }
}
