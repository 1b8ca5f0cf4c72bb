//! Call graph construction.
//!
//! A [`CallResolver`] walks the methods of a repository and reports every
//! invocation it finds as one or several [`Call`]s: one per possible target
//! class. Virtual and interface calls are dispatched on the receiver types
//! computed by an optional multi-type [`Evaluator`], and calls get their
//! arguments and return values from an optional particular-value evaluator.
//! Without evaluators, receivers are assumed to be of the referenced class
//! or of any of its subclasses.
//!
//! Resolved calls are handed to registered [`CallVisitor`]s, then appended to
//! a [`CallGraph`] when one is given.

use crate::call::{Call, CallTarget, CallVisitor};
use crate::callgraph::CallGraph;
use crate::config::ResolverOptions;
use crate::dominators::Dominators;
use crate::evaluation::{EvaluationError, Evaluator, Frames, Nullness, ReferenceValue, Value};
use crate::metrics::{MetricType, Metrics};
use crate::repo::Repo;
use crate::resolution::{
    resolve_invoke_dynamic, resolve_invoke_special, resolve_invoke_static, resolve_virtual,
};
use crate::signature::{CodeLocation, MethodSignature};
use cw_bytecode::classes::{ClassFile, MethodInfo, JAVA_LANG_OBJECT};
use cw_bytecode::constants::{ConstantIndex, MethodRefInfo};
use cw_bytecode::errors::BytecodeError;
use cw_bytecode::instrs::{InvokeKind, LabeledInstr};
use cw_bytecode::types::MethodDescriptor;
use cw_bytecode::Addr;

type PacingHook<'r> = Box<dyn FnMut(&ClassFile, &MethodInfo) -> bool + 'r>;

// values reconstructed around an invocation, shared by all its targets
#[derive(Debug, Default)]
struct StackValues {
    instance: Option<Value>,
    arguments: Vec<Value>,
    return_value: Option<Value>,
}

pub struct CallResolver<'r, 'a> {
    repo: &'r Repo<'a>,
    metrics: &'r Metrics,
    options: ResolverOptions,
    multi_type_evaluator: Option<&'r dyn Evaluator>,
    particular_evaluator: Option<&'r dyn Evaluator>,
    visitors: Vec<Box<dyn CallVisitor + 'r>>,
    pacing_hook: Option<PacingHook<'r>>,
    dominators: Dominators,

    // state of the method being visited
    multi_type_frames: Option<Frames>,
    particular_frames: Option<Frames>,
    dominators_computed: bool,
}

impl<'r, 'a> CallResolver<'r, 'a> {
    #[must_use]
    pub fn new(repo: &'r Repo<'a>, metrics: &'r Metrics, options: ResolverOptions) -> Self {
        let dominators = Dominators::new(options.ignore_exception_edges);
        Self {
            repo,
            metrics,
            options,
            multi_type_evaluator: None,
            particular_evaluator: None,
            visitors: Vec::new(),
            pacing_hook: None,
            dominators,
            multi_type_frames: None,
            particular_frames: None,
            dominators_computed: false,
        }
    }

    /// Evaluator giving the possible runtime types of receivers.
    #[must_use]
    pub fn with_multi_type_evaluator(mut self, evaluator: &'r dyn Evaluator) -> Self {
        self.multi_type_evaluator = Some(evaluator);
        self
    }

    /// Evaluator giving particular values of arguments and return values.
    #[must_use]
    pub fn with_particular_evaluator(mut self, evaluator: &'r dyn Evaluator) -> Self {
        self.particular_evaluator = Some(evaluator);
        self
    }

    /// Installs a hook asked before each method is visited, methods for
    /// which it returns `false` are skipped.
    #[must_use]
    pub fn with_pacing_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&ClassFile, &MethodInfo) -> bool + 'r,
    {
        self.pacing_hook = Some(Box::new(hook));
        self
    }

    /// Registers a visitor. Visitors are notified in registration order.
    pub fn add_visitor<V>(&mut self, visitor: V)
    where
        V: CallVisitor + 'r,
    {
        self.visitors.push(Box::new(visitor));
    }

    pub fn on_call<F>(&mut self, callback: F)
    where
        F: FnMut(&Call) + 'r,
    {
        self.add_visitor(callback);
    }

    #[must_use]
    pub const fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolves the calls of every defined class of the repository.
    pub fn run(&mut self, mut graph: Option<&mut CallGraph<'a>>) {
        let repo = self.repo;
        for class in repo.iter_defined_classes() {
            if class.is_library() && !self.options.include_library_classes {
                continue;
            }
            if let Some(content) = class.content() {
                self.visit_class(content, graph.as_deref_mut());
            }
        }
    }

    pub fn visit_class(&mut self, class: &'a ClassFile, mut graph: Option<&mut CallGraph<'a>>) {
        log::debug!("resolving calls of class {}", class.name());
        for method in class.iter_methods() {
            self.visit_method(class, method, graph.as_deref_mut());
        }
    }

    pub fn visit_method(
        &mut self,
        class: &'a ClassFile,
        method: &'a MethodInfo,
        mut graph: Option<&mut CallGraph<'a>>,
    ) {
        let Some(code) = method.code() else {
            return;
        };
        if let Some(hook) = &mut self.pacing_hook {
            if !hook(class, method) {
                log::trace!("skipping {}.{}{}", class.name(), method.name(), method.descriptor());
                return;
            }
        }

        let signature = MethodSignature::of(class.name(), method.name(), method.descriptor());
        log::trace!("resolving calls of {signature}");

        self.multi_type_frames = self.evaluate(self.multi_type_evaluator, class, method, "multi-type");
        self.particular_frames = self.evaluate(self.particular_evaluator, class, method, "particular");

        self.dominators_computed = false;
        if self.options.use_dominator_analysis {
            match self.dominators.analyze(signature.clone(), code) {
                Ok(()) => self.dominators_computed = true,
                Err(err) => {
                    log::warn!("cannot compute dominators of {signature}: {err}");
                    self.metrics.increment(MetricType::DominatorFailure);
                }
            }
        }

        for linstr in code.iter_instructions() {
            let Some((kind, idx)) = linstr.instr().invocation() else {
                continue;
            };
            let location = CodeLocation::new(
                signature.clone(),
                linstr.addr(),
                code.line_number_at(linstr.addr()),
            );
            for call in self.invocation_calls(class, &location, linstr, kind, idx) {
                self.report(call, graph.as_deref_mut());
            }
        }
    }

    fn evaluate(
        &self,
        evaluator: Option<&dyn Evaluator>,
        class: &ClassFile,
        method: &MethodInfo,
        analysis: &str,
    ) -> Option<Frames> {
        let evaluator = evaluator?;
        match evaluator.evaluate(self.repo, class, method, self.options.max_analysis_steps) {
            Ok(frames) => Some(frames),
            Err(err) => {
                log::warn!(
                    "{analysis} evaluation of {}.{}{} failed: {err}",
                    class.name(),
                    method.name(),
                    method.descriptor()
                );
                self.metrics.increment(MetricType::AnalysisDegraded);
                match err {
                    EvaluationError::TooComplex { .. } => {
                        self.metrics.increment(MetricType::EvaluationTooComplex);
                    }
                    EvaluationError::EmptyCode => self.metrics.increment(MetricType::EmptyCode),
                    EvaluationError::NotAvailable(_) | EvaluationError::Failed(_) => (),
                }
                None
            }
        }
    }

    fn invocation_calls(
        &self,
        class: &ClassFile,
        location: &CodeLocation,
        linstr: &LabeledInstr,
        kind: InvokeKind,
        idx: ConstantIndex,
    ) -> Vec<Call<'a>> {
        let addr = linstr.addr();
        let constants = class.constants();

        if kind == InvokeKind::Dynamic {
            let descriptor = match constants.invoke_dynamic(idx) {
                Ok((_, descriptor)) => descriptor,
                Err(err) => return self.malformed_call(location, linstr, &err),
            };
            let parsed = match MethodDescriptor::try_from(descriptor) {
                Ok(parsed) => parsed,
                Err(err) => return self.malformed_call(location, linstr, &err),
            };
            let values = self.stack_values(addr, &parsed, false);
            return self
                .new_call(location, resolve_invoke_dynamic(descriptor), linstr, Nullness::Never, false, &values)
                .into_iter()
                .collect();
        }

        let method_ref = match constants.method_ref(idx) {
            Ok(method_ref) => method_ref,
            Err(err) => return self.malformed_call(location, linstr, &err),
        };
        let descriptor = match method_ref.parsed_descriptor() {
            Ok(descriptor) => descriptor,
            Err(err) => return self.malformed_call(location, linstr, &err),
        };
        let has_instance = kind != InvokeKind::Static;
        let values = self.stack_values(addr, &descriptor, has_instance);

        let (targets, runtime_type_dependent) = match kind {
            InvokeKind::Static => (
                vec![(
                    resolve_invoke_static(self.repo, self.metrics, &method_ref),
                    Nullness::Never,
                )],
                false,
            ),
            InvokeKind::Special => {
                let nullness = values.instance.as_ref().map_or(Nullness::Maybe, nullness_of);
                let mut targets: Vec<(String, Nullness)> =
                    resolve_invoke_special(self.repo, self.metrics, class, &method_ref)
                        .into_iter()
                        .map(|class_name| (class_name, nullness))
                        .collect();
                if targets.is_empty() {
                    targets.push((method_ref.class_name.clone(), nullness));
                }
                (targets, false)
            }
            InvokeKind::Virtual | InvokeKind::Interface | InvokeKind::Dynamic => {
                let receivers = self.receiver_types(addr, descriptor.parameters_slots(), &method_ref);
                (self.dispatch(&method_ref, &receivers), receivers.len() > 1)
            }
        };

        targets
            .into_iter()
            .filter_map(|(class_name, null_result)| {
                let signature =
                    MethodSignature::of(&class_name, &method_ref.name, &method_ref.descriptor);
                self.new_call(location, signature, linstr, null_result, runtime_type_dependent, &values)
            })
            .collect()
    }

    // Receiver types from the multi-type evaluation, then from the
    // particular one, then the referenced class itself.
    fn receiver_types(&self, addr: Addr, depth: usize, method_ref: &MethodRefInfo) -> Vec<ReferenceValue> {
        let reported = |frames: &Option<Frames>| {
            frames
                .as_ref()
                .and_then(|frames| frames.stack_before(addr, depth))
                .map(|value| value.reference_types().into_iter().cloned().collect::<Vec<_>>())
                .filter(|types| !types.is_empty())
        };
        reported(&self.multi_type_frames)
            .or_else(|| reported(&self.particular_frames))
            .unwrap_or_else(|| vec![ReferenceValue::extensible(&method_ref.class_name)])
    }

    // Target classes of a virtual call, deduplicated, with the nullness of
    // the receiver they were found from.
    fn dispatch(&self, method_ref: &MethodRefInfo, receivers: &[ReferenceValue]) -> Vec<(String, Nullness)> {
        let (name, descriptor) = (method_ref.name.as_str(), method_ref.descriptor.as_str());
        let mut targets: Vec<(String, Nullness)> = Vec::new();
        let mut push = |class_name: String, nullness: Nullness| {
            if !targets.iter().any(|(known, _)| *known == class_name) {
                targets.push((class_name, nullness));
            }
        };

        for receiver in receivers {
            if receiver.nullness() == Nullness::Always {
                push(method_ref.class_name.clone(), Nullness::Always);
                continue;
            }
            let type_name = receiver.type_name().unwrap_or(&method_ref.class_name);
            let mut classes = resolve_virtual(self.repo, self.metrics, Some(type_name), name, descriptor);
            if classes.is_empty() {
                classes.insert(type_name.to_string());
            }
            if self.options.include_subclasses
                && receiver.may_be_extension()
                && type_name != JAVA_LANG_OBJECT
            {
                for subclass in self.repo.subclasses(type_name) {
                    let is_class = self
                        .repo
                        .get_class(subclass)
                        .map_or(false, |class| !class.is_interface());
                    if is_class {
                        classes.extend(resolve_virtual(
                            self.repo,
                            self.metrics,
                            Some(subclass),
                            name,
                            descriptor,
                        ));
                    }
                }
            }
            for class_name in classes {
                push(class_name, receiver.nullness());
            }
        }
        targets
    }

    fn new_call(
        &self,
        location: &CodeLocation,
        signature: MethodSignature,
        linstr: &LabeledInstr,
        null_result: Nullness,
        runtime_type_dependent: bool,
        values: &StackValues,
    ) -> Option<Call<'a>> {
        if self.options.skip_incomplete_calls && !signature.is_complete() {
            log::trace!("skipping incomplete call to {signature} at {location}");
            self.metrics.increment(MetricType::IncompleteCallSkipped);
            return None;
        }
        let target = self.target_of(signature);
        let call = Call::new(location.clone(), target, linstr.instr().clone(), null_result)
            .with_dependencies(
                self.is_control_flow_dependent(location.offset()),
                runtime_type_dependent,
            )
            .with_values(
                values.instance.clone(),
                values.arguments.clone(),
                values.return_value.clone(),
            );
        Some(call)
    }

    fn target_of(&self, signature: MethodSignature) -> CallTarget<'a> {
        let found = match (signature.class(), signature.method(), signature.descriptor()) {
            (Some(class_name), Some(name), Some(descriptor)) => self
                .repo
                .get_class(class_name)
                .map(|class| (class, class.find_method(name, descriptor))),
            _ => None,
        };
        match found {
            Some((class, Some(method))) => {
                self.metrics.increment(MetricType::ConcreteCall);
                CallTarget::Concrete {
                    signature,
                    class,
                    method,
                }
            }
            Some((_, None)) => {
                log::debug!("method {signature} not found");
                self.metrics.increment(MetricType::MissingMethod);
                self.metrics.increment(MetricType::SymbolicCall);
                CallTarget::Symbolic(signature)
            }
            None => {
                self.metrics.increment(MetricType::SymbolicCall);
                CallTarget::Symbolic(signature)
            }
        }
    }

    fn malformed_call(
        &self,
        location: &CodeLocation,
        linstr: &LabeledInstr,
        err: &BytecodeError,
    ) -> Vec<Call<'a>> {
        log::warn!("malformed invocation at {location}: {err}");
        self.metrics.increment(MetricType::MalformedInvocation);
        self.new_call(
            location,
            MethodSignature::unknown(),
            linstr,
            Nullness::Maybe,
            false,
            &StackValues::default(),
        )
        .into_iter()
        .collect()
    }

    fn is_control_flow_dependent(&self, addr: Addr) -> bool {
        if !self.options.use_dominator_analysis {
            return false;
        }
        if !self.dominators_computed {
            return true;
        }
        match self.dominators.dominates_exit(addr) {
            Ok(dominates) => !dominates,
            Err(err) => {
                log::warn!("dominators of {addr} not available: {err}");
                true
            }
        }
    }

    // Arguments are popped right to left, the receiver lying below them.
    fn stack_values(&self, addr: Addr, descriptor: &MethodDescriptor, has_instance: bool) -> StackValues {
        let mut depth = 0;
        let mut arguments = Vec::with_capacity(descriptor.parameters_types().len());
        for parameter in descriptor.parameters_types().iter().rev() {
            arguments.push(self.stack_value(addr, depth));
            depth += parameter.slots();
        }
        arguments.reverse();

        let instance = has_instance.then(|| self.stack_value(addr, depth));
        let return_value = if descriptor.returns_void() {
            None
        } else {
            self.particular_frames
                .as_ref()
                .and_then(|frames| frames.stack_after(addr, 0))
                .cloned()
        };
        StackValues {
            instance,
            arguments,
            return_value,
        }
    }

    fn stack_value(&self, addr: Addr, depth: usize) -> Value {
        let particular = self
            .particular_frames
            .as_ref()
            .and_then(|frames| frames.stack_before(addr, depth));
        let multi_type = self
            .multi_type_frames
            .as_ref()
            .and_then(|frames| frames.stack_before(addr, depth));
        match (particular, multi_type) {
            (_, Some(value)) if value.type_count() > 1 => value.clone(),
            (Some(value), _) | (None, Some(value)) => value.clone(),
            (None, None) => Value::Top,
        }
    }

    fn report(&mut self, mut call: Call<'a>, graph: Option<&mut CallGraph<'a>>) {
        log::trace!("{call}");
        for visitor in &mut self.visitors {
            visitor.visit_call(&call);
        }
        if self.options.clear_call_values_after_visit {
            call.clear_values();
        }
        if let Some(graph) = graph {
            graph.add_call(call);
        }
    }
}

fn nullness_of(value: &Value) -> Nullness {
    let types = value.reference_types();
    if types.is_empty() {
        Nullness::Maybe
    } else if types.iter().all(|t| t.nullness() == Nullness::Always) {
        Nullness::Always
    } else if types.iter().all(|t| t.nullness() == Nullness::Never) {
        Nullness::Never
    } else {
        Nullness::Maybe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{PrecomputedEvaluator, PrimitiveValue};
    use cw_bytecode::flags::MethodFlags;
    use cw_bytecode::instrs::{Comp, Instr, Operand, ReturnKind};
    use cw_bytecode::ClassBuilder;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn with_g(builder: ClassBuilder) -> ClassBuilder {
        builder
            .method_with_code(MethodFlags::ACC_PUBLIC, "g", "()V", |code| {
                code.ret(ReturnKind::Void);
                Ok(())
            })
            .unwrap()
    }

    fn main_class() -> ClassFile {
        ClassBuilder::new("t/Main")
            // 0: aload_0, 1: invokevirtual, 4: return
            .method_with_code(MethodFlags::ACC_STATIC, "run", "(Lt/B;)V", |code| {
                code.op(0x2a, 1);
                code.invoke_virtual("t/B", "g", "()V")?;
                code.ret(ReturnKind::Void);
                Ok(())
            })
            .unwrap()
            // 0: iconst_1, 1: ldc2_w, 4: ldc, 6: invokestatic, 9: pop, 10: return
            .method_with_code(MethodFlags::ACC_STATIC, "args", "()V", |code| {
                code.op(0x04, 1);
                code.op(0x14, 3);
                code.op(0x12, 2);
                code.invoke_static("t/Util", "h", "(IJLjava/lang/String;)I")?;
                code.op(0x57, 1);
                code.ret(ReturnKind::Void);
                Ok(())
            })
            .unwrap()
            // 0: iload_0, 1: ifeq, 4: invokestatic k, 7: goto, 10: invokestatic k,
            // 13: invokestatic l, 16: return
            .method_with_code(MethodFlags::ACC_STATIC, "branchy", "(I)V", |code| {
                let (else_, end) = (code.new_label(), code.new_label());
                code.op(0x1a, 1);
                code.branch(Comp::Eq, Operand::Zero, else_);
                code.invoke_static("t/Util", "k", "()V")?;
                code.goto(end);
                code.place_label(else_)?;
                code.invoke_static("t/Util", "k", "()V")?;
                code.place_label(end)?;
                code.invoke_static("t/Util", "l", "()V")?;
                code.ret(ReturnKind::Void);
                Ok(())
            })
            .unwrap()
            .method_with_code(MethodFlags::ACC_STATIC, "others", "()V", |code| {
                code.invoke_dynamic(0, "run", "()Ljava/lang/Runnable;")?;
                code.op(0x57, 1);
                code.invoke_static("t/Gone", "m", "()V")?;
                code.invoke_static("t/Util", "nope", "()V")?;
                code.instr(Instr::InvokeStatic(250));
                code.ret(ReturnKind::Void);
                Ok(())
            })
            .unwrap()
            .build()
    }

    fn classes() -> Vec<ClassFile> {
        vec![
            with_g(ClassBuilder::new("t/B")).build(),
            with_g(ClassBuilder::new("t/X").extends(Some("t/B"))).build(),
            with_g(ClassBuilder::new("t/Y").extends(Some("t/B"))).build(),
            ClassBuilder::new("t/Z").extends(Some("t/B")).build(),
            ClassBuilder::new("t/Util")
                .method(MethodFlags::ACC_STATIC, "h", "(IJLjava/lang/String;)I")
                .method(MethodFlags::ACC_STATIC, "k", "()V")
                .method(MethodFlags::ACC_STATIC, "l", "()V")
                .build(),
            main_class(),
        ]
    }

    fn interface_classes() -> Vec<ClassFile> {
        vec![
            ClassBuilder::interface("t/B")
                .method(MethodFlags::ACC_PUBLIC | MethodFlags::ACC_ABSTRACT, "g", "()V")
                .build(),
            with_g(ClassBuilder::new("t/X").implements("t/B")).build(),
            with_g(ClassBuilder::new("t/Y").implements("t/B")).build(),
            ClassBuilder::new("t/Main")
                // 0: aload_0, 1: invokeinterface, 6: return
                .method_with_code(MethodFlags::ACC_STATIC, "run", "(Lt/B;)V", |code| {
                    code.op(0x2a, 1);
                    code.invoke_interface("t/B", "g", "()V")?;
                    code.ret(ReturnKind::Void);
                    Ok(())
                })
                .unwrap()
                .build(),
        ]
    }

    fn repo_of(classes: &[ClassFile]) -> Repo {
        let mut repo = Repo::new();
        repo.register_classes(classes, false).unwrap();
        repo.close_hierarchy().unwrap();
        repo
    }

    fn main_method<'c>(classes: &'c [ClassFile], name: &str) -> (&'c ClassFile, &'c MethodInfo) {
        let main = classes.iter().find(|class| class.name() == "t/Main").unwrap();
        let method = main.iter_methods().find(|method| method.name() == name).unwrap();
        (main, method)
    }

    fn main_sig(name: &str, descriptor: &str) -> MethodSignature {
        MethodSignature::of("t/Main", name, descriptor)
    }

    fn targets(graph: &CallGraph, caller: &MethodSignature) -> Vec<MethodSignature> {
        graph
            .calls_from(caller)
            .into_iter()
            .map(|call| call.target_signature().clone())
            .collect()
    }

    fn g_of(class_name: &str) -> MethodSignature {
        MethodSignature::of(class_name, "g", "()V")
    }

    #[test]
    fn dispatch_on_runtime_types() {
        let classes = classes();
        let repo = repo_of(&classes);
        let metrics = Metrics::new();
        let mut evaluator = PrecomputedEvaluator::new();
        let mut frames = Frames::new();
        frames.set_stack_before(
            Addr(1),
            vec![Value::MultiType(vec![
                ReferenceValue::exact("t/X"),
                ReferenceValue::exact("t/Y"),
            ])],
        );
        evaluator.insert(main_sig("run", "(Lt/B;)V"), frames);

        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, ResolverOptions::default())
            .with_multi_type_evaluator(&evaluator);
        let (main, run) = main_method(&classes, "run");
        resolver.visit_method(main, run, Some(&mut graph));

        let caller = main_sig("run", "(Lt/B;)V");
        assert_eq!(targets(&graph, &caller), vec![g_of("t/X"), g_of("t/Y")]);
        for call in graph.calls_from(&caller) {
            assert!(call.is_concrete());
            assert!(call.is_runtime_type_dependent());
            assert!(!call.is_control_flow_dependent());
            assert_eq!(call.null_result(), Nullness::Never);
            assert_eq!(call.caller().offset(), Addr(1));
            assert_eq!(call.invoke_kind(), Some(InvokeKind::Virtual));
        }
        assert_eq!(metrics.get(MetricType::ConcreteCall), 2);
        assert_eq!(metrics.get(MetricType::AnalysisDegraded), 0);
    }

    #[test]
    fn interface_dispatch() {
        let classes = interface_classes();
        let repo = repo_of(&classes);
        let metrics = Metrics::new();
        let mut evaluator = PrecomputedEvaluator::new();
        let mut frames = Frames::new();
        frames.set_stack_before(
            Addr(1),
            vec![Value::MultiType(vec![
                ReferenceValue::exact("t/X"),
                ReferenceValue::exact("t/Y"),
            ])],
        );
        evaluator.insert(main_sig("run", "(Lt/B;)V"), frames);

        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, ResolverOptions::default())
            .with_multi_type_evaluator(&evaluator);
        let (main, run) = main_method(&classes, "run");
        resolver.visit_method(main, run, Some(&mut graph));

        let caller = main_sig("run", "(Lt/B;)V");
        assert_eq!(targets(&graph, &caller), vec![g_of("t/X"), g_of("t/Y")]);
        for call in graph.calls_from(&caller) {
            assert!(call.is_concrete());
            assert!(call.is_runtime_type_dependent());
            assert_eq!(call.invoke_kind(), Some(InvokeKind::Interface));
        }
        assert_eq!(metrics.get(MetricType::ConcreteCall), 2);
        assert_eq!(metrics.get(MetricType::SymbolicCall), 0);
    }

    #[test]
    fn special_calls() {
        let mut classes = classes();
        classes.push(ClassBuilder::interface("t/I").build());
        classes.push(
            ClassBuilder::new("t/Sub")
                .extends(Some("t/Z"))
                // 0: aload_0, 1: invokespecial, 4: return
                .method_with_code(MethodFlags::ACC_PUBLIC, "h", "()V", |code| {
                    code.op(0x2a, 1);
                    code.invoke_special("t/Z", "g", "()V")?;
                    code.ret(ReturnKind::Void);
                    Ok(())
                })
                .unwrap()
                .method_with_code(MethodFlags::ACC_PUBLIC, "i", "()V", |code| {
                    code.op(0x2a, 1);
                    code.invoke_special("t/I", "g", "()V")?;
                    code.ret(ReturnKind::Void);
                    Ok(())
                })
                .unwrap()
                .build(),
        );
        let repo = repo_of(&classes);
        let sub = classes.iter().find(|class| class.name() == "t/Sub").unwrap();
        let (h, i) = (
            sub.find_method("h", "()V").unwrap(),
            sub.find_method("i", "()V").unwrap(),
        );
        let h_sig = MethodSignature::of("t/Sub", "h", "()V");

        // Z inherits g from B
        let metrics = Metrics::new();
        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, ResolverOptions::default());
        resolver.visit_method(sub, h, Some(&mut graph));
        let calls = graph.calls_from(&h_sig);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_signature(), &g_of("t/B"));
        assert!(calls[0].is_concrete());
        assert!(!calls[0].is_runtime_type_dependent());
        assert_eq!(calls[0].null_result(), Nullness::Maybe);
        assert_eq!(calls[0].invoke_kind(), Some(InvokeKind::Special));

        let mut evaluator = PrecomputedEvaluator::new();
        let mut frames = Frames::new();
        frames.set_stack_before(Addr(1), vec![ReferenceValue::exact("t/Sub").into()]);
        evaluator.insert(h_sig.clone(), frames);
        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, ResolverOptions::default())
            .with_particular_evaluator(&evaluator);
        resolver.visit_method(sub, h, Some(&mut graph));
        let calls = graph.calls_from(&h_sig);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_signature(), &g_of("t/B"));
        assert_eq!(calls[0].null_result(), Nullness::Never);

        // nothing selected, the referenced method is reported
        let metrics = Metrics::new();
        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, ResolverOptions::default());
        resolver.visit_method(sub, i, Some(&mut graph));
        let calls = graph.calls_from(&MethodSignature::of("t/Sub", "i", "()V"));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_signature(), &g_of("t/I"));
        assert!(!calls[0].is_concrete());
        assert_eq!(metrics.get(MetricType::MissingMethod), 1);
    }

    #[test]
    fn receivers_without_evaluation() {
        let classes = classes();
        let repo = repo_of(&classes);
        let caller = main_sig("run", "(Lt/B;)V");
        let (main, run) = main_method(&classes, "run");

        let metrics = Metrics::new();
        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, ResolverOptions::default());
        resolver.visit_method(main, run, Some(&mut graph));
        assert_eq!(targets(&graph, &caller), vec![g_of("t/B")]);
        let call = graph.calls_from(&caller)[0];
        assert!(!call.is_runtime_type_dependent());
        assert_eq!(call.null_result(), Nullness::Maybe);
        // no evaluator is not a degradation
        assert_eq!(metrics.get(MetricType::AnalysisDegraded), 0);

        // Z inherits g from B
        let options = ResolverOptions {
            include_subclasses: true,
            ..ResolverOptions::default()
        };
        let evaluator = PrecomputedEvaluator::new();
        let mut graph = CallGraph::new();
        let mut resolver =
            CallResolver::new(&repo, &metrics, options).with_multi_type_evaluator(&evaluator);
        resolver.visit_method(main, run, Some(&mut graph));
        let mut found = targets(&graph, &caller);
        found.sort();
        assert_eq!(found, vec![g_of("t/B"), g_of("t/X"), g_of("t/Y")]);
        assert_eq!(metrics.get(MetricType::AnalysisDegraded), 1);
    }

    #[test]
    fn null_receiver() {
        let classes = classes();
        let repo = repo_of(&classes);
        let metrics = Metrics::new();
        let mut evaluator = PrecomputedEvaluator::new();
        let mut frames = Frames::new();
        frames.set_stack_before(Addr(1), vec![ReferenceValue::null().into()]);
        evaluator.insert(main_sig("run", "(Lt/B;)V"), frames);

        let options = ResolverOptions {
            include_subclasses: true,
            ..ResolverOptions::default()
        };
        let mut graph = CallGraph::new();
        let mut resolver =
            CallResolver::new(&repo, &metrics, options).with_particular_evaluator(&evaluator);
        let (main, run) = main_method(&classes, "run");
        resolver.visit_method(main, run, Some(&mut graph));

        let calls = graph.calls_from(&main_sig("run", "(Lt/B;)V"));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_signature(), &g_of("t/B"));
        assert_eq!(calls[0].null_result(), Nullness::Always);
    }

    #[test]
    fn arguments_and_return_value() {
        let classes = classes();
        let repo = repo_of(&classes);
        let metrics = Metrics::new();
        let string_types = Value::MultiType(vec![
            ReferenceValue::exact("java/lang/String"),
            ReferenceValue::exact("java/lang/StringBuilder"),
        ]);

        let mut particular = PrecomputedEvaluator::new();
        let mut frames = Frames::new();
        frames.set_stack_before(
            Addr(6),
            vec![
                PrimitiveValue::Int(Some(1)).into(),
                PrimitiveValue::Long(Some(5)).into(),
                ReferenceValue::exact("java/lang/String").with_constant("x").into(),
            ],
        );
        frames.set_stack_after(Addr(6), vec![PrimitiveValue::Int(Some(42)).into()]);
        particular.insert(main_sig("args", "()V"), frames);

        let mut multi_type = PrecomputedEvaluator::new();
        let mut frames = Frames::new();
        frames.set_stack_before(
            Addr(6),
            vec![
                PrimitiveValue::Int(None).into(),
                PrimitiveValue::Long(None).into(),
                string_types.clone(),
            ],
        );
        multi_type.insert(main_sig("args", "()V"), frames);

        let options = ResolverOptions {
            clear_call_values_after_visit: false,
            ..ResolverOptions::default()
        };
        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, options)
            .with_multi_type_evaluator(&multi_type)
            .with_particular_evaluator(&particular);
        let (main, args) = main_method(&classes, "args");
        resolver.visit_method(main, args, Some(&mut graph));

        let calls = graph.calls_from(&main_sig("args", "()V"));
        assert_eq!(calls.len(), 1);
        let call = calls[0];
        assert_eq!(
            call.target_signature(),
            &MethodSignature::of("t/Util", "h", "(IJLjava/lang/String;)I")
        );
        assert!(call.is_concrete());
        assert_eq!(call.instance(), None);
        assert_eq!(
            call.arguments(),
            &[
                PrimitiveValue::Int(Some(1)).into(),
                PrimitiveValue::Long(Some(5)).into(),
                string_types,
            ]
        );
        assert_eq!(call.return_value(), Some(&PrimitiveValue::Int(Some(42)).into()));
    }

    #[test]
    fn values_are_cleared_after_visit() {
        let classes = classes();
        let repo = repo_of(&classes);
        let metrics = Metrics::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, ResolverOptions::default());
        let seen_by_visitor = Rc::clone(&seen);
        resolver.on_call(move |call: &Call| {
            seen_by_visitor.borrow_mut().push(call.arguments().len());
        });
        let (main, args) = main_method(&classes, "args");
        resolver.visit_method(main, args, Some(&mut graph));

        assert_eq!(*seen.borrow(), vec![3]);
        let calls = graph.calls_from(&main_sig("args", "()V"));
        assert!(calls[0].arguments().is_empty());
        assert_eq!(calls[0].return_value(), None);
    }

    #[test]
    fn control_flow_dependence() {
        let classes = classes();
        let repo = repo_of(&classes);
        let metrics = Metrics::new();
        let caller = main_sig("branchy", "(I)V");
        let (main, branchy) = main_method(&classes, "branchy");

        let dependences = |options: ResolverOptions| {
            let mut graph = CallGraph::new();
            let mut resolver = CallResolver::new(&repo, &metrics, options);
            resolver.visit_method(main, branchy, Some(&mut graph));
            graph
                .calls_from(&caller)
                .into_iter()
                .map(|call| (call.caller().offset(), call.is_control_flow_dependent()))
                .collect::<Vec<_>>()
        };

        assert_eq!(
            dependences(ResolverOptions {
                use_dominator_analysis: true,
                ..ResolverOptions::default()
            }),
            vec![(Addr(4), true), (Addr(10), true), (Addr(13), false)]
        );
        assert_eq!(
            dependences(ResolverOptions::default()),
            vec![(Addr(4), false), (Addr(10), false), (Addr(13), false)]
        );
        assert_eq!(metrics.get(MetricType::DominatorFailure), 0);
    }

    #[test]
    fn dominators_failure() {
        let mut classes = classes();
        classes.push(
            ClassBuilder::new("t/Bad")
                // 0: invokestatic, 3: goto -10
                .method_with_code(MethodFlags::ACC_STATIC, "f", "()V", |code| {
                    code.invoke_static("t/Util", "k", "()V")?;
                    code.instr(Instr::Goto(-10));
                    Ok(())
                })
                .unwrap()
                .build(),
        );
        let repo = repo_of(&classes);
        let bad = classes.iter().find(|class| class.name() == "t/Bad").unwrap();
        let metrics = Metrics::new();
        let options = ResolverOptions {
            use_dominator_analysis: true,
            ..ResolverOptions::default()
        };

        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, options);
        resolver.visit_method(bad, bad.find_method("f", "()V").unwrap(), Some(&mut graph));
        let calls = graph.calls_from(&MethodSignature::of("t/Bad", "f", "()V"));
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is_concrete());
        assert!(calls[0].is_control_flow_dependent());
        assert_eq!(metrics.get(MetricType::DominatorFailure), 1);

        // the next method gets its own dominators
        let (main, branchy) = main_method(&classes, "branchy");
        resolver.visit_method(main, branchy, Some(&mut graph));
        let last = graph.calls_from(&main_sig("branchy", "(I)V"))[2];
        assert_eq!(last.caller().offset(), Addr(13));
        assert!(!last.is_control_flow_dependent());
        assert_eq!(metrics.get(MetricType::DominatorFailure), 1);
    }

    #[test]
    fn incomplete_missing_and_malformed_calls() {
        let classes = classes();
        let repo = repo_of(&classes);
        let caller = main_sig("others", "()V");
        let (main, others) = main_method(&classes, "others");

        let metrics = Metrics::new();
        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, ResolverOptions::default());
        resolver.visit_method(main, others, Some(&mut graph));
        assert_eq!(
            targets(&graph, &caller),
            vec![
                MethodSignature::new(None, None, Some("()Ljava/lang/Runnable;")),
                MethodSignature::of("t/Gone", "m", "()V"),
                MethodSignature::of("t/Util", "nope", "()V"),
                MethodSignature::unknown(),
            ]
        );
        assert_eq!(graph.nb_symbolic_calls(), 4);
        assert_eq!(metrics.get(MetricType::SymbolicCall), 4);
        assert_eq!(metrics.get(MetricType::MissingClass), 1);
        assert_eq!(metrics.get(MetricType::MissingMethod), 1);
        assert_eq!(metrics.get(MetricType::MalformedInvocation), 1);

        let metrics = Metrics::new();
        let options = ResolverOptions {
            skip_incomplete_calls: true,
            ..ResolverOptions::default()
        };
        let mut graph = CallGraph::new();
        let mut resolver = CallResolver::new(&repo, &metrics, options);
        resolver.visit_method(main, others, Some(&mut graph));
        assert_eq!(
            targets(&graph, &caller),
            vec![
                MethodSignature::of("t/Gone", "m", "()V"),
                MethodSignature::of("t/Util", "nope", "()V"),
            ]
        );
        assert_eq!(metrics.get(MetricType::IncompleteCallSkipped), 2);
    }

    #[test]
    fn degraded_evaluations() {
        let classes = classes();
        let repo = repo_of(&classes);
        let metrics = Metrics::new();
        let mut evaluator = PrecomputedEvaluator::new();
        let mut frames = Frames::new();
        frames.set_steps(100);
        frames.set_stack_before(Addr(1), vec![ReferenceValue::exact("t/X").into()]);
        evaluator.insert(main_sig("run", "(Lt/B;)V"), frames);

        let options = ResolverOptions {
            max_analysis_steps: Some(10),
            ..ResolverOptions::default()
        };
        let mut graph = CallGraph::new();
        let mut resolver =
            CallResolver::new(&repo, &metrics, options).with_multi_type_evaluator(&evaluator);
        let (main, run) = main_method(&classes, "run");
        resolver.visit_method(main, run, Some(&mut graph));

        // falls back to the referenced class
        assert_eq!(targets(&graph, &main_sig("run", "(Lt/B;)V")), vec![g_of("t/B")]);
        assert_eq!(metrics.get(MetricType::AnalysisDegraded), 1);
        assert_eq!(metrics.get(MetricType::EvaluationTooComplex), 1);
    }

    #[test]
    fn whole_repository_runs() {
        let classes = classes();
        let library = ClassBuilder::new("lib/L")
            .method_with_code(MethodFlags::ACC_STATIC, "f", "()V", |code| {
                code.invoke_static("t/Util", "k", "()V")?;
                code.ret(ReturnKind::Void);
                Ok(())
            })
            .unwrap()
            .build();
        let mut repo = Repo::new();
        repo.register_classes(&classes, false).unwrap();
        repo.register_class(&library, true).unwrap();
        repo.close_hierarchy().unwrap();
        let metrics = Metrics::new();

        let visited = RefCell::new(Vec::new());
        let notified = RefCell::new(0);
        let mut first = CallGraph::new();
        let mut second = CallGraph::new();
        {
            let mut resolver = CallResolver::new(&repo, &metrics, ResolverOptions::default())
                .with_pacing_hook(|_, method| {
                    visited.borrow_mut().push(method.name().to_string());
                    method.name() != "args"
                });
            resolver.on_call(|_: &Call| *notified.borrow_mut() += 1);
            resolver.run(Some(&mut first));
            resolver.run(Some(&mut second));
            resolver.run(None);
        }

        assert!(first.calls_from(&main_sig("args", "()V")).is_empty());
        assert!(!first.contains_method(&MethodSignature::of("lib/L", "f", "()V")));
        // methods without code are never handed to the hook
        assert!(!visited.borrow().iter().any(|name| name == "h"));
        assert!(visited.borrow().iter().any(|name| name == "args"));

        let calls = |graph: &CallGraph| {
            graph
                .iter_calls()
                .map(|call| call.to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(calls(&first), calls(&second));
        assert_eq!(*notified.borrow(), 3 * first.nb_calls());

        let options = ResolverOptions {
            include_library_classes: true,
            ..ResolverOptions::default()
        };
        let mut graph = CallGraph::new();
        CallResolver::new(&repo, &metrics, options).run(Some(&mut graph));
        assert_eq!(graph.calls_from(&MethodSignature::of("lib/L", "f", "()V")).len(), 1);
        assert_eq!(graph.nb_calls(), first.nb_calls() + 2);
    }
}
