#![allow(missing_docs)]

pub mod comparator;
pub mod consts;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod flow;
pub mod messages;
pub mod spec;
pub mod store;
pub mod validate;
pub mod visibility;

pub use comparator::{Comparand, Operator, compare};
pub use engine::{ChangeOutcome, FormEngine};
pub use error::FlowError;
pub use evaluator::{
    DependencyIndex, DependentRef, EvalRef, build_dependency_index, build_eval_ref, decide,
    decide_form, decide_inner_option, decide_top_level, parent_cascade, recompute,
};
pub use events::FormEvent;
pub use flow::{FlowState, NextStep, ProgressBar, StepKind, StepMarker, compute_next_step, progress_bar};
pub use messages::MessageChannel;
pub use spec::{
    Condition, Direction, FieldDescriptor, FieldItem, FieldKind, FieldValue, FlowEntry, FormSchema,
    MatchMode, RuleSet, StepDescriptor, StepsSetup, parse_conditional_tags,
};
pub use store::{PathSeg, StateStore};
pub use validate::{ValidationMap, validate_value};
pub use visibility::{Bucket, BucketKind, StyleSheet, apply};
