//! Method `Code` attribute: instructions, exception table and line numbers.

use crate::errors::{BytecodeError, BytecodeResult};
use crate::instrs::LabeledInstr;
use crate::Addr;

#[derive(Debug, Clone, Default)]
pub struct Code {
    pub(crate) max_stack: u16,
    pub(crate) max_locals: u16,
    pub(crate) insns: Vec<LabeledInstr>,
    pub(crate) handlers: Vec<ExceptionHandler>,
    pub(crate) line_numbers: Vec<LineNumber>,
}

impl Code {
    #[inline]
    #[must_use]
    pub const fn max_stack(&self) -> u16 {
        self.max_stack
    }

    #[inline]
    #[must_use]
    pub const fn max_locals(&self) -> u16 {
        self.max_locals
    }

    #[inline]
    #[must_use]
    pub fn instructions_count(&self) -> usize {
        self.insns.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    /// Total length in bytes of the instructions.
    #[must_use]
    pub fn code_length(&self) -> usize {
        self.insns.last().map_or(0, |linstr| linstr.next_addr().0)
    }

    #[inline]
    pub fn iter_instructions(&self) -> impl Iterator<Item = &LabeledInstr> {
        self.insns.iter()
    }

    #[inline]
    pub fn instruction_at(&self, addr: Addr) -> BytecodeResult<&LabeledInstr> {
        let index = self
            .insns
            .binary_search_by(|linstr| linstr.addr().cmp(&addr))
            .map_err(|_| BytecodeError::InstructionNotFound(addr))?;
        Ok(&self.insns[index])
    }

    #[inline]
    pub fn iter_handlers(&self) -> impl Iterator<Item = &ExceptionHandler> {
        self.handlers.iter()
    }

    /// Returns the exception handlers whose protected range contains `addr`,
    /// in exception table order.
    pub fn handlers_covering(&self, addr: Addr) -> impl Iterator<Item = &ExceptionHandler> {
        self.handlers.iter().filter(move |h| h.covers(addr))
    }

    #[inline]
    pub fn iter_line_numbers(&self) -> impl Iterator<Item = &LineNumber> {
        self.line_numbers.iter()
    }

    /// Source line of the instruction at `addr`, if line number information
    /// is available: the line of the closest table entry starting at or
    /// before `addr`.
    #[must_use]
    pub fn line_number_at(&self, addr: Addr) -> Option<u16> {
        self.line_numbers
            .iter()
            .filter(|ln| ln.start_addr() <= addr)
            .max_by_key(|ln| ln.start_addr())
            .map(LineNumber::line)
    }
}

/// An exception table entry: `[start, end)` is protected by the code at `handler`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub(crate) start: Addr,
    pub(crate) end: Addr,
    pub(crate) handler: Addr,
    pub(crate) catch_type: Option<String>,
}

impl ExceptionHandler {
    #[must_use]
    pub fn new(start: Addr, end: Addr, handler: Addr, catch_type: Option<String>) -> Self {
        Self {
            start,
            end,
            handler,
            catch_type,
        }
    }

    #[inline]
    #[must_use]
    pub const fn start_addr(&self) -> Addr {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end_addr(&self) -> Addr {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn handler_addr(&self) -> Addr {
        self.handler
    }

    /// Caught class name, `None` for a catch-all (`finally`) handler.
    #[inline]
    #[must_use]
    pub fn catch_type(&self) -> Option<&str> {
        self.catch_type.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn covers(&self, addr: Addr) -> bool {
        addr >= self.start && addr < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub(crate) start: Addr,
    pub(crate) line: u16,
}

impl LineNumber {
    #[must_use]
    pub const fn new(start: Addr, line: u16) -> Self {
        Self { start, line }
    }

    #[inline]
    #[must_use]
    pub const fn start_addr(&self) -> Addr {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn line(&self) -> u16 {
        self.line
    }
}
