pub mod field;
pub mod form;
pub mod rules;
pub mod step;

pub use field::{FieldDescriptor, FieldItem, FieldKind, FieldValue};
pub use form::FormSchema;
pub use rules::{Condition, Direction, MatchMode, RuleSet, parse_conditional_tags};
pub use step::{FlowEntry, StepDescriptor, StepsSetup};
