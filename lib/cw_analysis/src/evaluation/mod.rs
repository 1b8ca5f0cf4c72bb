//! Interface with the abstract interpreters that compute, for every
//! instruction, the values on the operand stack.
//!
//! Two evaluations are used by the call resolver: a multi-type one, reporting
//! every possible runtime type of references, and a particular-value one,
//! reporting exact values when they are known.

mod values;

pub mod errors;

pub use errors::EvaluationError;
pub use values::{Nullness, PrimitiveValue, ReferenceValue, Value};

use crate::repo::Repo;
use crate::signature::MethodSignature;
use cw_bytecode::classes::{ClassFile, MethodInfo};
use cw_bytecode::Addr;
use std::collections::BTreeMap;

/// Operand stacks before and after each evaluated instruction.
///
/// Stacks are stored by slots, bottom first: category-2 values occupy two
/// slots, a [`Value::Top`] one under the slot holding the value itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frames {
    before: BTreeMap<Addr, Vec<Value>>,
    after: BTreeMap<Addr, Vec<Value>>,
    steps: usize,
}

fn to_slots(values: Vec<Value>) -> Vec<Value> {
    let mut slots = Vec::with_capacity(values.len());
    for value in values {
        if value.is_category2() {
            slots.push(Value::Top);
        }
        slots.push(value);
    }
    slots
}

fn slot_at(stack: &[Value], depth: usize) -> Option<&Value> {
    stack
        .len()
        .checked_sub(depth + 1)
        .and_then(|idx| stack.get(idx))
}

impl Frames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the stack before the instruction at `addr`, values given from
    /// bottom to top.
    pub fn set_stack_before(&mut self, addr: Addr, values: Vec<Value>) {
        self.before.insert(addr, to_slots(values));
    }

    /// Records the stack after the instruction at `addr`, values given from
    /// bottom to top.
    pub fn set_stack_after(&mut self, addr: Addr, values: Vec<Value>) {
        self.after.insert(addr, to_slots(values));
    }

    /// Records the number of steps the evaluation took.
    pub fn set_steps(&mut self, steps: usize) {
        self.steps = steps;
    }

    #[inline]
    #[must_use]
    pub const fn steps(&self) -> usize {
        self.steps
    }

    /// Stack slot at `depth` (0 is the top) before the instruction at `addr`.
    #[must_use]
    pub fn stack_before(&self, addr: Addr, depth: usize) -> Option<&Value> {
        self.before
            .get(&addr)
            .and_then(|stack| slot_at(stack, depth))
    }

    /// Stack slot at `depth` (0 is the top) after the instruction at `addr`.
    #[must_use]
    pub fn stack_after(&self, addr: Addr, depth: usize) -> Option<&Value> {
        self.after.get(&addr).and_then(|stack| slot_at(stack, depth))
    }

    #[must_use]
    pub fn is_evaluated(&self, addr: Addr) -> bool {
        self.before.contains_key(&addr)
    }
}

/// An abstract interpreter computing operand stacks of a method.
pub trait Evaluator {
    /// Evaluates a method body.
    ///
    /// # Errors
    ///
    /// Evaluation may fail when the method is too complex to be evaluated
    /// within `max_steps` steps, when the code is empty, or for
    /// interpreter-specific reasons.
    fn evaluate(
        &self,
        repo: &Repo,
        class: &ClassFile,
        method: &MethodInfo,
        max_steps: Option<usize>,
    ) -> Result<Frames, EvaluationError>;
}

/// Serves evaluations computed ahead of time, indexed by method signature.
#[derive(Debug, Default)]
pub struct PrecomputedEvaluator {
    entries: BTreeMap<MethodSignature, Result<Frames, EvaluationError>>,
}

impl PrecomputedEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, signature: MethodSignature, frames: Frames) {
        self.entries.insert(signature, Ok(frames));
    }

    /// Records that the evaluation of a method fails.
    pub fn insert_failure(&mut self, signature: MethodSignature, error: EvaluationError) {
        self.entries.insert(signature, Err(error));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Evaluator for PrecomputedEvaluator {
    fn evaluate(
        &self,
        _repo: &Repo,
        class: &ClassFile,
        method: &MethodInfo,
        max_steps: Option<usize>,
    ) -> Result<Frames, EvaluationError> {
        if method.code().map_or(true, |code| code.is_empty()) {
            return Err(EvaluationError::EmptyCode);
        }
        let signature = MethodSignature::of(class.name(), method.name(), method.descriptor());
        let frames = self
            .entries
            .get(&signature)
            .ok_or_else(|| EvaluationError::NotAvailable(signature.to_string()))?
            .clone()?;
        match max_steps {
            Some(max_steps) if frames.steps() > max_steps => {
                Err(EvaluationError::TooComplex { max_steps })
            }
            _ => Ok(frames),
        }
    }
}
