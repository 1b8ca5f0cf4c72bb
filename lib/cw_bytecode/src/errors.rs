//! Bytecode model errors definitions.

use crate::Addr;
use std::fmt;
use thiserror::Error;

/// An alias for result that can be a [`BytecodeError`].
pub type BytecodeResult<T> = Result<T, BytecodeError>;

/// The bytecode model error type.
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Error that can be returned when formatting class parts.
    #[error("formatting error: {0}")]
    Fmt(#[from] fmt::Error),

    /// Custom internal error type.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("constant not found in pool (index: {0})")]
    ConstantNotFound(u16),

    #[error("constant #{index} is not a {expected}")]
    UnexpectedConstant { index: u16, expected: &'static str },

    #[error("constant pool is full")]
    ConstantPoolOverflow,

    #[error("instruction not found (address: {0})")]
    InstructionNotFound(Addr),

    #[error("undefined label: {0}")]
    UndefinedLabel(String),

    #[error("branch offset out of range at {0}")]
    BranchOutOfRange(Addr),
}
