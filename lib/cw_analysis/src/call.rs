//! Resolved calls, as reported to visitors and stored in call graphs.

use crate::evaluation::{Nullness, Value};
use crate::signature::{CodeLocation, MethodSignature};
use cw_bytecode::classes::{ClassFile, MethodInfo};
use cw_bytecode::instrs::{Instr, InvokeKind};
use std::fmt;

/// What a call invokes.
#[derive(Debug, Clone)]
pub enum CallTarget<'a> {
    /// The target method has been found in the repository.
    Concrete {
        signature: MethodSignature,
        class: &'a ClassFile,
        method: &'a MethodInfo,
    },
    /// The target is only known by its (possibly incomplete) signature.
    Symbolic(MethodSignature),
}

impl<'a> CallTarget<'a> {
    #[must_use]
    pub const fn signature(&self) -> &MethodSignature {
        match self {
            Self::Concrete { signature, .. } | Self::Symbolic(signature) => signature,
        }
    }

    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        matches!(self, Self::Concrete { .. })
    }

    #[must_use]
    pub const fn class(&self) -> Option<&'a ClassFile> {
        match self {
            Self::Concrete { class, .. } => Some(*class),
            Self::Symbolic(_) => None,
        }
    }

    #[must_use]
    pub const fn method(&self) -> Option<&'a MethodInfo> {
        match self {
            Self::Concrete { method, .. } => Some(*method),
            Self::Symbolic(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Call<'a> {
    caller: CodeLocation,
    target: CallTarget<'a>,
    instruction: Instr,
    null_result: Nullness,
    control_flow_dependent: bool,
    runtime_type_dependent: bool,
    instance: Option<Value>,
    arguments: Vec<Value>,
    return_value: Option<Value>,
}

impl<'a> fmt::Display for Call<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.caller, self.target.signature())?;
        if !self.is_concrete() {
            write!(f, " (symbolic)")?;
        }
        Ok(())
    }
}

impl<'a> Call<'a> {
    #[must_use]
    pub fn new(
        caller: CodeLocation,
        target: CallTarget<'a>,
        instruction: Instr,
        null_result: Nullness,
    ) -> Self {
        Self {
            caller,
            target,
            instruction,
            null_result,
            control_flow_dependent: false,
            runtime_type_dependent: false,
            instance: None,
            arguments: Vec::new(),
            return_value: None,
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, control_flow: bool, runtime_type: bool) -> Self {
        self.control_flow_dependent = control_flow;
        self.runtime_type_dependent = runtime_type;
        self
    }

    #[must_use]
    pub fn with_values(
        mut self,
        instance: Option<Value>,
        arguments: Vec<Value>,
        return_value: Option<Value>,
    ) -> Self {
        self.instance = instance;
        self.arguments = arguments;
        self.return_value = return_value;
        self
    }

    #[inline]
    #[must_use]
    pub const fn caller(&self) -> &CodeLocation {
        &self.caller
    }

    #[inline]
    #[must_use]
    pub const fn caller_signature(&self) -> &MethodSignature {
        self.caller.signature()
    }

    #[inline]
    #[must_use]
    pub const fn target(&self) -> &CallTarget<'a> {
        &self.target
    }

    #[inline]
    #[must_use]
    pub const fn target_signature(&self) -> &MethodSignature {
        self.target.signature()
    }

    #[inline]
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        self.target.is_concrete()
    }

    #[inline]
    #[must_use]
    pub const fn instruction(&self) -> &Instr {
        &self.instruction
    }

    #[must_use]
    pub fn invoke_kind(&self) -> Option<InvokeKind> {
        self.instruction.invocation().map(|(kind, _)| kind)
    }

    /// Nullness of the receiver instance (`Never` for static and dynamic calls).
    #[inline]
    #[must_use]
    pub const fn null_result(&self) -> Nullness {
        self.null_result
    }

    /// The call may not be executed on every path to the caller exit.
    #[inline]
    #[must_use]
    pub const fn is_control_flow_dependent(&self) -> bool {
        self.control_flow_dependent
    }

    /// The target depends on the runtime type of the receiver.
    #[inline]
    #[must_use]
    pub const fn is_runtime_type_dependent(&self) -> bool {
        self.runtime_type_dependent
    }

    #[inline]
    #[must_use]
    pub const fn instance(&self) -> Option<&Value> {
        self.instance.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    #[inline]
    #[must_use]
    pub const fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Drops reconstructed values, keeping the call identity.
    pub fn clear_values(&mut self) {
        self.instance = None;
        self.arguments.clear();
        self.return_value = None;
    }
}

/// Observer of the calls found by a call resolver.
pub trait CallVisitor {
    fn visit_call(&mut self, call: &Call);
}

impl<F> CallVisitor for F
where
    F: FnMut(&Call),
{
    fn visit_call(&mut self, call: &Call) {
        self(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{PrimitiveValue, ReferenceValue};
    use cw_bytecode::Addr;

    #[test]
    fn clearing_values_keeps_identity() {
        let caller = CodeLocation::new(MethodSignature::of("t/A", "f", "()V"), Addr(4), Some(12));
        let target = MethodSignature::of("t/B", "g", "(I)I");
        let call = Call::new(
            caller.clone(),
            CallTarget::Symbolic(target.clone()),
            Instr::InvokeVirtual(3),
            Nullness::Never,
        )
        .with_dependencies(true, false)
        .with_values(
            Some(ReferenceValue::exact("t/B").into()),
            vec![PrimitiveValue::Int(Some(2)).into()],
            Some(PrimitiveValue::Int(None).into()),
        );
        assert_eq!(call.arguments().len(), 1);
        assert_eq!(call.invoke_kind(), Some(InvokeKind::Virtual));

        let mut cleared = call.clone();
        cleared.clear_values();
        assert!(cleared.instance().is_none());
        assert!(cleared.arguments().is_empty());
        assert!(cleared.return_value().is_none());
        assert_eq!(cleared.caller(), &caller);
        assert_eq!(cleared.target_signature(), &target);
        assert_eq!(cleared.is_concrete(), call.is_concrete());
        assert!(cleared.is_control_flow_dependent());
        assert_eq!(cleared.to_string(), "t/A.f()V@4 (line 12) -> t/B.g(I)I (symbolic)");
    }

    #[test]
    fn closures_are_visitors() {
        let call = Call::new(
            CodeLocation::new(MethodSignature::of("t/A", "f", "()V"), Addr(0), None),
            CallTarget::Symbolic(MethodSignature::unknown()),
            Instr::InvokeDynamic(1),
            Nullness::Never,
        );
        fn visit_twice<V: CallVisitor>(visitor: &mut V, call: &Call) {
            visitor.visit_call(call);
            visitor.visit_call(call);
        }
        fn as_visitor<F: FnMut(&Call)>(f: F) -> F {
            f
        }

        let mut seen = Vec::new();
        let mut visitor = as_visitor(|call| seen.push(call.caller().offset()));
        visit_twice(&mut visitor, &call);
        assert_eq!(seen, vec![Addr(0), Addr(0)]);
    }
}
