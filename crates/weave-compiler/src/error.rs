use thiserror::Error;
use weave_core::EvalError;

/// A pipeline stage failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{stage}] {message}")]
pub struct StageError {
    pub stage: &'static str,
    pub message: String,
}

impl StageError {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Running a compiled executable failed.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("expected {expected} argument(s), got {found}")]
    ArgumentCount { expected: usize, found: usize },

    #[error("no output at index {0}")]
    NoSuchOutput(usize),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
