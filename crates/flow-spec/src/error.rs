use thiserror::Error;

/// Errors surfaced by the store, evaluator, and step-flow controller.
///
/// Rule parsing never lands here: malformed conditional tags degrade to an
/// empty rule set instead of failing.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("failed to encode state value: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("form '{0}' is not initialized")]
    UnknownForm(String),
    #[error("field '{0}' is not registered on this form")]
    UnknownField(String),
    #[error("step '{0}' is not part of the step list")]
    UnknownStep(String),
    #[error("no step follows '{0}'")]
    NoNextStep(String),
}

impl FlowError {
    /// True for the "cannot advance" condition callers may surface as a
    /// user-facing message rather than a failure.
    pub fn is_no_next_step(&self) -> bool {
        matches!(self, FlowError::NoNextStep(_))
    }
}
