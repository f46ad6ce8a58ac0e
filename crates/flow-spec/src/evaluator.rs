//! Conditional-tags evaluator.
//!
//! Builds the dependency index once per form, then recomputes only the cached
//! boolean cells reachable from a changed field. The decision formula in
//! [`decide`] is the contract: the `show`/`hide` labels pick a branch of the
//! XOR-like combination and are not literal imperatives.

use crate::comparator;
use crate::error::FlowError;
use crate::spec::field::{FieldDescriptor, FieldKind};
use crate::spec::form::FormSchema;
use crate::spec::rules::{Condition, Direction, RuleSet};
use crate::store::StateStore;
use std::collections::BTreeMap;

/// Boolean mirror of a rule set's group shape, one cell per condition.
pub type EvalRef = Vec<Vec<bool>>;

/// Something that must be recomputed when a dependency field changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependentRef {
    /// A field's own top-level rule set.
    Field(String),
    /// A sub-option rule set: `(field name, option name)`.
    Option(String, String),
    /// The form-level rule set.
    Form,
}

/// Map from field name to everything depending on it. Built once at form
/// initialization and treated as immutable for the form's lifetime.
pub type DependencyIndex = BTreeMap<String, Vec<DependentRef>>;

/// One-time pass over every rule set of the schema, O(total conditions).
pub fn build_dependency_index(schema: &FormSchema) -> DependencyIndex {
    let mut index = DependencyIndex::new();
    let mut record = |dependency: &str, dependent: DependentRef| {
        let entry = index.entry(dependency.to_string()).or_default();
        if !entry.contains(&dependent) {
            entry.push(dependent);
        }
    };

    for field in &schema.fields {
        if let Some(rules) = &field.rules {
            for dependency in rules.dependencies() {
                record(dependency, DependentRef::Field(field.name.clone()));
            }
        }
        for (option, rules) in &field.inner_rules {
            for dependency in rules.dependencies() {
                record(
                    dependency,
                    DependentRef::Option(field.name.clone(), option.clone()),
                );
            }
        }
    }
    if let Some(rules) = &schema.form_rules {
        for dependency in rules.dependencies() {
            record(dependency, DependentRef::Form);
        }
    }
    index
}

/// Builds the boolean mirror of a rule set, all cells false.
pub fn build_eval_ref(rules: &RuleSet) -> EvalRef {
    rules
        .groups
        .iter()
        .map(|group| vec![false; group.len()])
        .collect()
}

/// Re-evaluates the cached cells that list `changed` as their dependency.
///
/// Unrelated fields' cached booleans are untouched; only references reachable
/// through the dependency index are visited.
pub fn recompute(
    store: &mut StateStore,
    form_id: &str,
    changed: &str,
    index: &DependencyIndex,
) -> Result<(), FlowError> {
    let Some(changed_field) = store.field(form_id, changed) else {
        return Ok(());
    };
    let Some(dependents) = index.get(changed) else {
        return Ok(());
    };

    for dependent in dependents {
        match dependent {
            DependentRef::Field(name) => {
                let Some(field) = store.field(form_id, name) else {
                    continue;
                };
                let Some(rules) = field.rules else { continue };
                let mut eval = store
                    .eval_ref(form_id, name)
                    .unwrap_or_else(|| build_eval_ref(&rules));
                refresh_cells(&mut eval, &rules, &changed_field, changed);
                store.set_eval_ref(form_id, name, &eval)?;
            }
            DependentRef::Option(name, option) => {
                let Some(field) = store.field(form_id, name) else {
                    continue;
                };
                let Some(rules) = field.inner_rules.get(option) else {
                    continue;
                };
                let mut eval = store
                    .inner_eval_ref(form_id, name, option)
                    .unwrap_or_else(|| build_eval_ref(rules));
                refresh_cells(&mut eval, rules, &changed_field, changed);
                store.set_inner_eval_ref(form_id, name, option, &eval)?;
            }
            DependentRef::Form => {
                let Some(rules) = store.form_rules(form_id) else {
                    continue;
                };
                let mut eval = store
                    .form_eval_ref(form_id)
                    .unwrap_or_else(|| build_eval_ref(&rules));
                refresh_cells(&mut eval, &rules, &changed_field, changed);
                store.set_form_eval_ref(form_id, &eval)?;
            }
        }
    }
    Ok(())
}

fn refresh_cells(eval: &mut EvalRef, rules: &RuleSet, changed_field: &FieldDescriptor, changed: &str) {
    for (group_index, group) in rules.groups.iter().enumerate() {
        for (condition_index, condition) in group.iter().enumerate() {
            if condition.field != changed {
                continue;
            }
            let met = evaluate_condition(changed_field, condition);
            if let Some(cell) = eval
                .get_mut(group_index)
                .and_then(|cells| cells.get_mut(condition_index))
            {
                *cell = met;
            }
        }
    }
}

/// Evaluates a single condition against the dependency field's current value.
pub fn evaluate_condition(dependency: &FieldDescriptor, condition: &Condition) -> bool {
    let comparand = dependency.comparand(&condition.value);
    let code = effective_operator(dependency.kind, &condition.operator);
    comparator::evaluate(code, &comparand, &condition.value, condition.end.as_deref())
}

/// Select-like storage is a collection, not a scalar, so `is`/`isn` are
/// silently remapped to the membership operators.
pub fn effective_operator(kind: FieldKind, code: &str) -> &str {
    match (kind, code) {
        (FieldKind::Select | FieldKind::Country, "is") => "c",
        (FieldKind::Select | FieldKind::Country, "isn") => "cn",
        _ => code,
    }
}

/// The decision formula. This exact combination is the contract; the labels
/// on [`Direction`] name which branch is taken, so do not restate this as the
/// intuitive show/hide behavior.
pub fn decide(rules: &RuleSet, eval: &EvalRef) -> bool {
    let conditions_met = eval.iter().any(|group| group.iter().all(|met| *met));
    (conditions_met && rules.default_direction == Direction::Show)
        || (!conditions_met && rules.default_direction == Direction::Hide)
}

/// Applies [`decide`] to a field's own rule set. `None` means the field has
/// no rule effect (no rules, or zero groups after normalization).
pub fn decide_top_level(store: &StateStore, form_id: &str, name: &str) -> Option<bool> {
    let field = store.field(form_id, name)?;
    let rules = field.rules.as_ref()?;
    if rules.is_empty() {
        return None;
    }
    let eval = store
        .eval_ref(form_id, name)
        .unwrap_or_else(|| build_eval_ref(rules));
    Some(decide(rules, &eval))
}

/// Same formula for a sub-option's rule set.
pub fn decide_inner_option(
    store: &StateStore,
    form_id: &str,
    name: &str,
    option: &str,
) -> Option<bool> {
    let field = store.field(form_id, name)?;
    let rules = field.inner_rules.get(option)?;
    if rules.is_empty() {
        return None;
    }
    let eval = store
        .inner_eval_ref(form_id, name, option)
        .unwrap_or_else(|| build_eval_ref(rules));
    Some(decide(rules, &eval))
}

/// Same formula for the form-level rule set; the direction is returned so the
/// caller can route the form into the matching show or hide bucket.
pub fn decide_form(store: &StateStore, form_id: &str) -> Option<(Direction, bool)> {
    let rules = store.form_rules(form_id)?;
    if rules.is_empty() {
        return None;
    }
    let eval = store
        .form_eval_ref(form_id)
        .unwrap_or_else(|| build_eval_ref(&rules));
    Some((rules.default_direction, decide(&rules, &eval)))
}

/// Whether hiding `hidden` of `total` options cascades to the parent wrapper.
///
/// A select's first option is its placeholder and can never be hidden, so the
/// parent cascades one short of the item count; checkbox and radio cascade
/// only when every option is hidden.
pub fn parent_cascade(kind: FieldKind, hidden: usize, total: usize) -> bool {
    match kind {
        FieldKind::Select | FieldKind::Country => total > 0 && hidden == total - 1,
        FieldKind::Checkbox | FieldKind::Radio => total > 0 && hidden == total,
        _ => false,
    }
}
