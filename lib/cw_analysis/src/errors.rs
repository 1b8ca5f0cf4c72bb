//! Analysis errors definition.

use crate::evaluation::errors::EvaluationError;
use cw_bytecode::errors::BytecodeError;
use regex::Error as RegexError;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("internal error: {0}")]
    Internal(String),

    #[error("bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),

    #[error("regex error: {0}")]
    Regex(#[from] RegexError),

    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("instruction not found: {0}")]
    InstructionNotFound(String),

    #[error("the method has no implementation")]
    NoCode,

    /// The control flow node has not been reached by the last dominators
    /// computation (or no computation has been run yet).
    #[error("control flow node not reached: {0}")]
    NodeNotReached(String),
}

