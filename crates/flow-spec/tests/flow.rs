use serde_json::{Map, Value, json};

use flow_spec::spec::rules::Condition;
use flow_spec::spec::step::FlowEntry;
use flow_spec::{
    FlowState, NextStep, ProgressBar, StepDescriptor, StepKind, compute_next_step, progress_bar,
};

fn steps() -> Vec<StepDescriptor> {
    vec![
        StepDescriptor::new("s1", vec!["name".into()]),
        StepDescriptor::new("s2", vec!["plan".into()]),
        StepDescriptor::new("s3", vec!["note".into()]),
        StepDescriptor::new("s4", vec![]),
    ]
}

fn entry(next: &str, current: &str, field: &str, value: &str, progress: usize) -> FlowEntry {
    FlowEntry {
        next_step_id: next.to_string(),
        current_step_id: current.to_string(),
        condition_groups: vec![vec![Condition::new(field, "is", value)]],
        progress_bar_count: progress,
        disable_next_button: false,
    }
}

fn values(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn linear_successor_when_table_is_empty() {
    let next = compute_next_step(&steps(), &[], "s1", &Map::new()).expect("next");
    assert_eq!(next.step_id, "s2");
    assert_eq!(next.kind, StepKind::Multistep);
    assert_eq!(next.progress_count, 4);
    assert!(!next.disable_next);
}

#[test]
fn first_matching_entry_wins_in_table_order() {
    let table = vec![
        entry("s4", "s2", "plan", "pro", 2),
        entry("s3", "s2", "plan", "pro", 3),
    ];
    let next = compute_next_step(&steps(), &table, "s2", &values(&[("plan", json!("pro"))]))
        .expect("next");
    assert_eq!(next.step_id, "s4");
    assert_eq!(next.progress_count, 2);
}

#[test]
fn unmatched_table_falls_back_to_linear_order() {
    let table = vec![entry("s4", "s2", "plan", "pro", 0)];
    let next = compute_next_step(&steps(), &table, "s2", &values(&[("plan", json!("free"))]))
        .expect("next");
    assert_eq!(next.step_id, "s3");
    assert_eq!(next.kind, StepKind::Multiflow);
}

#[test]
fn matching_uses_plain_string_equality_only() {
    // `10` does not equal `10.0` as text even though they are numerically equal.
    let table = vec![entry("s4", "s1", "count", "10", 0)];
    let next = compute_next_step(&steps(), &table, "s1", &values(&[("count", json!("10.0"))]))
        .expect("next");
    assert_eq!(next.step_id, "s2");

    let next = compute_next_step(&steps(), &table, "s1", &values(&[("count", json!(10))]))
        .expect("next");
    assert_eq!(next.step_id, "s4");
}

#[test]
fn zero_progress_count_means_no_override() {
    let table = vec![entry("s3", "s2", "plan", "pro", 0)];
    let next = compute_next_step(&steps(), &table, "s2", &values(&[("plan", json!("pro"))]))
        .expect("next");
    assert_eq!(next.progress_count, 4);
}

#[test]
fn landing_on_the_terminal_step_disables_next() {
    let next = compute_next_step(&steps(), &[], "s3", &Map::new()).expect("next");
    assert_eq!(next.step_id, "s4");
    assert!(next.disable_next);
}

#[test]
fn unknown_and_terminal_steps_are_reported() {
    let error = compute_next_step(&steps(), &[], "nope", &Map::new()).expect_err("unknown");
    assert!(matches!(error, flow_spec::FlowError::UnknownStep(_)));

    let error = compute_next_step(&steps(), &[], "s4", &Map::new()).expect_err("terminal");
    assert!(error.is_no_next_step());
}

#[test]
fn forward_and_backward_walk_the_visited_stack() {
    let mut state = FlowState::start("s1");
    let decision = NextStep {
        step_id: "s2".into(),
        kind: StepKind::Multistep,
        progress_count: 4,
        disable_next: false,
    };
    state.go_forward(&decision);
    state.go_forward(&NextStep {
        step_id: "s3".into(),
        ..decision.clone()
    });
    assert_eq!(state.current_step_id, "s3");
    assert_eq!(state.visited, vec!["s1".to_string(), "s2".to_string()]);

    assert_eq!(state.go_backward(), Some("s2"));
    assert_eq!(state.go_backward(), Some("s1"));
    assert_eq!(state.go_backward(), None);
    assert_eq!(state.current_step_id, "s1");
}

#[test]
fn jumping_to_a_fields_step_truncates_history() {
    let mut state = FlowState::start("s1");
    let base = NextStep {
        step_id: String::new(),
        kind: StepKind::Multistep,
        progress_count: 4,
        disable_next: false,
    };
    state.go_forward(&NextStep { step_id: "s2".into(), ..base.clone() });
    state.go_forward(&NextStep { step_id: "s3".into(), ..base.clone() });
    state.go_forward(&NextStep { step_id: "s4".into(), ..base });

    assert_eq!(state.go_to_step_containing(&steps(), "plan"), Some("s2"));
    assert_eq!(state.current_step_id, "s2");
    assert_eq!(state.visited, vec!["s1".to_string()]);

    assert_eq!(state.go_to_step_containing(&steps(), "ghost"), None);
}

#[test]
fn stale_request_generations_are_ignored() {
    let mut state = FlowState::start("s1");
    let first = state.begin_request();
    let second = state.begin_request();
    assert!(state.pending);

    assert!(!state.finish_request(first));
    assert!(state.pending);
    assert!(state.finish_request(second));
    assert!(!state.pending);
}

#[test]
fn server_decision_overwrites_the_optimistic_position() {
    let mut state = FlowState::start("s1");
    state.go_forward(&NextStep {
        step_id: "s2".into(),
        kind: StepKind::Multiflow,
        progress_count: 4,
        disable_next: false,
    });

    state.apply_server_decision(&NextStep {
        step_id: "s3".into(),
        kind: StepKind::Multiflow,
        progress_count: 2,
        disable_next: true,
    });
    assert_eq!(state.current_step_id, "s3");
    assert!(state.next_disabled);
    assert_eq!(state.progress_count, 2);
}

#[test]
fn progress_bar_markers_for_linear_forms() {
    let mut state = FlowState::start("s1");
    state.go_forward(&NextStep {
        step_id: "s2".into(),
        kind: StepKind::Multistep,
        progress_count: 4,
        disable_next: false,
    });

    let ProgressBar::Markers { items } = progress_bar(&steps(), false, &state, 0) else {
        panic!("expected markers");
    };
    assert_eq!(items.len(), 4);
    assert!(items[0].complete && !items[0].active);
    assert!(items[1].active && !items[1].complete);
    assert!(!items[2].active && !items[2].complete);
}

#[test]
fn progress_bar_flat_counter_for_multiflow() {
    let mut state = FlowState::start("s1");
    state.go_forward(&NextStep {
        step_id: "s4".into(),
        kind: StepKind::Multiflow,
        progress_count: 2,
        disable_next: false,
    });

    let ProgressBar::Flat { count, position } = progress_bar(&steps(), true, &state, 2) else {
        panic!("expected flat bar");
    };
    assert_eq!(count, 2);
    assert_eq!(position, 2);

    let ProgressBar::Flat { count, .. } = progress_bar(&steps(), true, &state, 0) else {
        panic!("expected flat bar");
    };
    assert_eq!(count, 4);
}
