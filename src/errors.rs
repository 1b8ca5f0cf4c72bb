//! Global error handling.
//!
//! Each sub-crate of the project defines its own type error.
//! Their types can be unified, for example in a main function,
//! when winding results at the top-level.
//!
//! ```rust
//! use classworks::prelude::*;
//!
//! fn main() -> CwResult<()> { // can return a CwError
//!    let mut repo = Repo::new();
//!    repo.close_hierarchy()?; // can return an AnalysisError
//!    Ok(())
//! }
//! ```

use cw_analysis::errors::AnalysisError;
use cw_analysis::evaluation::EvaluationError;
use cw_bytecode::errors::BytecodeError;
use thiserror::Error;

/// An alias for result that can be a [`CwError`].
pub type CwResult<T> = Result<T, CwError>;

/// The main error type for error winding at the top-level.
/// It mainly consists of transparent wrapper over error types that
/// are defined in dependencies.
#[derive(Debug, Error)]
pub enum CwError {
    /// Error that can be returned from regex compilation.
    #[error(transparent)]
    Regex(#[from] regex::Error),

    /// Error that can be returned when installing the logger twice.
    #[error(transparent)]
    Logger(#[from] log::SetLoggerError),

    /// Error that can be returned from [`cw_analysis`] functions.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Error that can be returned from value evaluators.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Error that can be returned from [`cw_bytecode`] functions.
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
}
