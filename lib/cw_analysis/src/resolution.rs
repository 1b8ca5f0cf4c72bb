//! Invocation targets lookup, following the JVM methods resolution and
//! selection procedures.

use crate::metrics::{MetricType, Metrics};
use crate::repo::Repo;
use crate::signature::MethodSignature;
use cw_bytecode::classes::{ClassFile, INIT_NAME, JAVA_LANG_OBJECT};
use cw_bytecode::constants::MethodRefInfo;
use cw_bytecode::instrs::{Instr, InvokeKind};
use lazy_static::lazy_static;
use std::collections::BTreeSet;

lazy_static! {
    // public instance methods of java.lang.Object, used when the class is
    // not part of the repository
    static ref OBJECT_PUBLIC_METHODS: BTreeSet<(&'static str, &'static str)> = [
        ("equals", "(Ljava/lang/Object;)Z"),
        ("getClass", "()Ljava/lang/Class;"),
        ("hashCode", "()I"),
        ("notify", "()V"),
        ("notifyAll", "()V"),
        ("toString", "()Ljava/lang/String;"),
        ("wait", "()V"),
        ("wait", "(J)V"),
        ("wait", "(JI)V"),
    ]
    .into_iter()
    .collect();
}

fn object_has_public_method(repo: &Repo, name: &str, descriptor: &str) -> bool {
    match repo.get_class(JAVA_LANG_OBJECT) {
        Some(object) => object
            .find_method(name, descriptor)
            .map_or(false, |m| m.is_public() && !m.is_static()),
        None => OBJECT_PUBLIC_METHODS.contains(&(name, descriptor)),
    }
}

/// Finds the class declaring the method invoked by an `invokestatic`
/// instruction: the referenced class, or its closest superclass declaring
/// the method.
pub fn resolve_invoke_static(repo: &Repo, metrics: &Metrics, method_ref: &MethodRefInfo) -> String {
    let referenced = method_ref.class_name.as_str();
    if repo.get_class(referenced).is_none() {
        log::debug!("static call to {method_ref}: class {referenced} not found");
        metrics.increment(MetricType::MissingClass);
        return referenced.to_string();
    }

    let mut visited = BTreeSet::new();
    let mut current = Some(referenced);
    while let Some(class_name) = current {
        if !visited.insert(class_name) {
            break;
        }
        match repo.get_class(class_name) {
            Some(class)
                if class
                    .find_method(&method_ref.name, &method_ref.descriptor)
                    .is_some() =>
            {
                return class_name.to_string()
            }
            Some(_) => current = repo.superclass(class_name),
            None => break,
        }
    }
    referenced.to_string()
}

/// Resolves the class(es) providing the implementation invoked by an
/// `invokespecial` instruction located in `calling_class`.
pub fn resolve_invoke_special(
    repo: &Repo,
    metrics: &Metrics,
    calling_class: &ClassFile,
    method_ref: &MethodRefInfo,
) -> BTreeSet<String> {
    let referenced = method_ref.class_name.as_str();
    let (name, descriptor) = (method_ref.name.as_str(), method_ref.descriptor.as_str());

    let use_superclass = calling_class.is_super()
        && name != INIT_NAME
        && repo
            .get_class(referenced)
            .map_or(false, |class| !class.is_interface())
        && repo.is_subclass_of(calling_class.name(), referenced);
    let start = match calling_class.superclass() {
        Some(superclass) if use_superclass => superclass,
        _ => referenced,
    };

    let Some(class) = repo.get_class(start) else {
        log::debug!("special call to {method_ref}: class {start} not found");
        metrics.increment(MetricType::MissingClass);
        return BTreeSet::from([start.to_string()]);
    };

    if class.find_method(name, descriptor).is_some() {
        return BTreeSet::from([start.to_string()]);
    }

    if class.is_interface() {
        if object_has_public_method(repo, name, descriptor) {
            return BTreeSet::from([JAVA_LANG_OBJECT.to_string()]);
        }
    } else if let Some(found) = class
        .superclass()
        .and_then(|superclass| superclass_search(repo, superclass, name, descriptor))
    {
        return BTreeSet::from([found]);
    }

    maximally_specific_superinterfaces(repo, start, name, descriptor)
}

/// Selects the class(es) providing the implementation of a virtual or
/// interface call whose receiver has the runtime type `receiver_type`.
pub fn resolve_virtual(
    repo: &Repo,
    metrics: &Metrics,
    receiver_type: Option<&str>,
    name: &str,
    descriptor: &str,
) -> BTreeSet<String> {
    let Some(receiver_type) = receiver_type else {
        return BTreeSet::new();
    };
    if repo.get_class(receiver_type).is_none() {
        log::debug!("virtual call to {name}{descriptor}: class {receiver_type} not found");
        metrics.increment(MetricType::MissingClass);
        return BTreeSet::from([receiver_type.to_string()]);
    }

    if let Some(found) = superclass_search(repo, receiver_type, name, descriptor) {
        return BTreeSet::from([found]);
    }
    maximally_specific_superinterfaces(repo, receiver_type, name, descriptor)
}

/// Dynamic call sites are bound at runtime by their bootstrap method, only
/// the descriptor is statically known.
#[must_use]
pub fn resolve_invoke_dynamic(descriptor: &str) -> MethodSignature {
    MethodSignature::new(None, None, Some(descriptor))
}

/// Walks up the superclasses chain from `class_name`, looking for the first
/// class declaring a concrete `name`/`descriptor` method.
fn superclass_search(repo: &Repo, class_name: &str, name: &str, descriptor: &str) -> Option<String> {
    let mut visited = BTreeSet::new();
    let mut current = Some(class_name);
    while let Some(class_name) = current {
        if !visited.insert(class_name) {
            break;
        }
        let class = repo.get_class(class_name)?;
        if class
            .find_method(name, descriptor)
            .map_or(false, |m| !m.is_abstract())
        {
            return Some(class_name.to_string());
        }
        current = repo.superclass(class_name);
    }
    None
}

/// Default methods candidates: superinterfaces declaring a concrete
/// `name`/`descriptor` method that is not overridden by another candidate.
///
/// Several candidates are returned when the choice is ambiguous.
pub fn maximally_specific_superinterfaces(
    repo: &Repo,
    class_name: &str,
    name: &str,
    descriptor: &str,
) -> BTreeSet<String> {
    let applicable: BTreeSet<&str> = repo
        .all_superinterfaces(class_name)
        .into_iter()
        .filter(|interface| {
            repo.get_class(interface)
                .and_then(|class| class.find_method(name, descriptor))
                .map_or(false, |m| !m.is_private() && !m.is_static() && !m.is_abstract())
        })
        .collect();

    let overridden: BTreeSet<&str> = applicable
        .iter()
        .flat_map(|interface| repo.all_superinterfaces(interface))
        .collect();

    applicable
        .difference(&overridden)
        .map(|interface| (*interface).to_string())
        .collect()
}

/// Signature of the method invoked by `instr`, as far as it can be known
/// without any value analysis: static calls are fully resolved, other calls
/// only get their name and descriptor (their declaring class depends on
/// runtime types).
#[must_use]
pub fn quick_resolve(class: &ClassFile, instr: &Instr) -> MethodSignature {
    let Some((kind, idx)) = instr.invocation() else {
        return MethodSignature::unknown();
    };
    let constants = class.constants();
    let res = if kind == InvokeKind::Dynamic {
        constants
            .invoke_dynamic(idx)
            .map(|(_, descriptor)| resolve_invoke_dynamic(descriptor))
    } else {
        constants.method_ref(idx).map(|mref| {
            if kind == InvokeKind::Static {
                MethodSignature::of(&mref.class_name, &mref.name, &mref.descriptor)
            } else {
                MethodSignature::new(None, Some(&mref.name), Some(&mref.descriptor))
            }
        })
    };
    res.unwrap_or_else(|err| {
        log::warn!("cannot resolve {instr} in {}: {err}", class.name());
        MethodSignature::unknown()
    })
}
