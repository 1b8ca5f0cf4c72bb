//! Evaluation errors definitions.

use thiserror::Error;

/// The error type of value evaluators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The evaluation would need more steps than allowed.
    #[error("evaluation too complex: more than {max_steps} steps needed")]
    TooComplex { max_steps: usize },

    #[error("method has an empty code")]
    EmptyCode,

    #[error("no evaluation available for {0}")]
    NotAvailable(String),

    #[error("evaluation failed: {0}")]
    Failed(String),
}
