//! Parallel call graph construction.
//!
//! Classes are resolved independently from each other: each rayon task runs
//! its own [`CallResolver`] on one class and produces a partial call graph,
//! partial graphs are then merged in classes order.

use crate::errors::CwResult;
use cw_analysis::callgraph::CallGraph;
use cw_analysis::config::ResolverOptions;
use cw_analysis::evaluation::Evaluator;
use cw_analysis::metrics::Metrics;
use cw_analysis::repo::{Class, Repo};
use cw_analysis::resolver::CallResolver;
use cw_bytecode::ClassFile;
use rayon::prelude::*;
use regex::Regex;

/// Value evaluators shared by the resolvers of all tasks.
#[derive(Clone, Copy, Default)]
pub struct Evaluators<'e> {
    pub multi_type: Option<&'e (dyn Evaluator + Sync)>,
    pub particular: Option<&'e (dyn Evaluator + Sync)>,
}

/// Builds the call graph of every defined class of `repo`.
pub fn build_callgraph<'a>(
    repo: &Repo<'a>,
    metrics: &Metrics,
    options: &ResolverOptions,
    evaluators: Evaluators,
) -> CallGraph<'a> {
    build(repo, metrics, options, evaluators, |_| true)
}

/// Builds the call graph of the defined classes of `repo` whose name
/// matches `class_pattern`.
///
/// # Errors
///
/// Fails if `class_pattern` is not a valid regular expression.
pub fn build_filtered_callgraph<'a>(
    repo: &Repo<'a>,
    metrics: &Metrics,
    options: &ResolverOptions,
    evaluators: Evaluators,
    class_pattern: &str,
) -> CwResult<CallGraph<'a>> {
    let pattern = Regex::new(class_pattern)?;
    log::debug!("filtering classes on pattern {pattern:?}");
    Ok(build(repo, metrics, options, evaluators, |class| {
        pattern.is_match(class.name())
    }))
}

fn build<'a, P>(
    repo: &Repo<'a>,
    metrics: &Metrics,
    options: &ResolverOptions,
    evaluators: Evaluators,
    predicate: P,
) -> CallGraph<'a>
where
    P: Fn(&ClassFile) -> bool,
{
    let classes: Vec<&'a ClassFile> = repo
        .iter_defined_classes()
        .filter(|class| options.include_library_classes || !class.is_library())
        .filter_map(Class::content)
        .filter(|class| predicate(class))
        .collect();
    log::info!("resolving calls of {} classes", classes.len());

    let graph = classes
        .into_par_iter()
        .map(|class| {
            let mut resolver = CallResolver::new(repo, metrics, options.clone());
            if let Some(evaluator) = evaluators.multi_type {
                resolver = resolver.with_multi_type_evaluator(evaluator);
            }
            if let Some(evaluator) = evaluators.particular {
                resolver = resolver.with_particular_evaluator(evaluator);
            }
            let mut graph = CallGraph::new();
            resolver.visit_class(class, Some(&mut graph));
            graph
        })
        .reduce(CallGraph::new, |mut graph, other| {
            graph.merge(other);
            graph
        });

    log::info!(
        "call graph contains {} methods and {} calls ({} symbolic)",
        graph.nb_methods(),
        graph.nb_calls(),
        graph.nb_symbolic_calls()
    );
    graph
}
