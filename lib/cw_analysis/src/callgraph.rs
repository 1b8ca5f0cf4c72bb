//! Graph representation of the resolved calls between methods.
//!
//! Nodes are method signatures (callers and targets), edges are calls. The
//! graph is a multiset: the same call site may be recorded several times,
//! once per possible target.

use crate::call::Call;
use crate::signature::MethodSignature;
use petgraph::dot::{Config, Dot};
use petgraph::prelude::*;
use petgraph::visit::Reversed;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Write;

#[derive(Debug, Clone, Default)]
pub struct CallGraph<'a> {
    inner: DiGraph<MethodSignature, Call<'a>>,
    node_ids: BTreeMap<MethodSignature, NodeIndex>,
}

impl<'a> CallGraph<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn node_id(&mut self, signature: &MethodSignature) -> NodeIndex {
        if let Some(id) = self.node_ids.get(signature) {
            return *id;
        }
        let id = self.inner.add_node(signature.clone());
        self.node_ids.insert(signature.clone(), id);
        id
    }

    pub fn add_call(&mut self, call: Call<'a>) {
        let src = self.node_id(call.caller_signature());
        let dst = self.node_id(call.target_signature());
        self.inner.add_edge(src, dst, call);
    }

    /// Appends every call of `other`, in its insertion order.
    pub fn merge(&mut self, other: CallGraph<'a>) {
        let (_, edges) = other.inner.into_nodes_edges();
        for edge in edges {
            self.add_call(edge.weight);
        }
    }

    fn calls_directed(&self, signature: &MethodSignature, dir: Direction) -> Vec<&Call<'a>> {
        let Some(id) = self.node_ids.get(signature) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.inner.edges_directed(*id, dir).collect();
        edges.sort_by_key(|edge| edge.id());
        edges.into_iter().map(|edge| edge.weight()).collect()
    }

    /// Calls located in the given method.
    #[must_use]
    pub fn calls_from(&self, signature: &MethodSignature) -> Vec<&Call<'a>> {
        self.calls_directed(signature, Outgoing)
    }

    /// Calls targeting the given method.
    #[must_use]
    pub fn calls_to(&self, signature: &MethodSignature) -> Vec<&Call<'a>> {
        self.calls_directed(signature, Incoming)
    }

    pub fn iter_calls(&self) -> impl Iterator<Item = &Call<'a>> {
        self.inner.edge_weights()
    }

    pub fn iter_methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.inner.node_weights()
    }

    #[must_use]
    pub fn contains_method(&self, signature: &MethodSignature) -> bool {
        self.node_ids.contains_key(signature)
    }

    pub fn nb_calls(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn nb_methods(&self) -> usize {
        self.inner.node_count()
    }

    pub fn nb_concrete_calls(&self) -> usize {
        self.iter_calls().filter(|call| call.is_concrete()).count()
    }

    pub fn nb_symbolic_calls(&self) -> usize {
        self.iter_calls().filter(|call| !call.is_concrete()).count()
    }

    fn walk(
        &self,
        signature: &MethodSignature,
        max_depth: Option<usize>,
        dir: Direction,
    ) -> BTreeSet<&MethodSignature> {
        let mut found = BTreeSet::new();
        let Some(start) = self.node_ids.get(signature) else {
            return found;
        };
        let mut visited = BTreeSet::from([*start]);
        let mut todo = VecDeque::from([(*start, 0)]);
        while let Some((id, depth)) = todo.pop_front() {
            if max_depth.map_or(false, |max| depth >= max) {
                continue;
            }
            for next in self.inner.neighbors_directed(id, dir) {
                if visited.insert(next) {
                    found.insert(&self.inner[next]);
                    todo.push_back((next, depth + 1));
                }
            }
        }
        found
    }

    /// Methods transitively calling the given one, up to `max_depth` calls
    /// away (unbounded when `None`).
    #[must_use]
    pub fn callers_of(
        &self,
        signature: &MethodSignature,
        max_depth: Option<usize>,
    ) -> BTreeSet<&MethodSignature> {
        self.walk(signature, max_depth, Incoming)
    }

    /// Methods transitively called by the given one, up to `max_depth` calls
    /// away (unbounded when `None`).
    #[must_use]
    pub fn callees_of(
        &self,
        signature: &MethodSignature,
        max_depth: Option<usize>,
    ) -> BTreeSet<&MethodSignature> {
        self.walk(signature, max_depth, Outgoing)
    }

    /// Keeps only the methods lying on a call path leading to a method
    /// matching `predicate`.
    #[must_use]
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&MethodSignature) -> bool,
    {
        // node ids must survive removals
        let mut stable_graph: StableDiGraph<_, _> = self.inner.clone().into();

        let mut to_remove: BTreeSet<NodeIndex> = stable_graph.node_indices().collect();

        // backward traversal from targets
        let reversed = Reversed(&stable_graph);
        let mut dfs = Dfs::empty(reversed);
        for id in stable_graph.node_indices() {
            if predicate(&stable_graph[id]) {
                dfs.move_to(id);
                while let Some(keep_id) = dfs.next(reversed) {
                    to_remove.remove(&keep_id);
                }
            }
        }

        stable_graph.retain_nodes(|_, id| !to_remove.contains(&id));

        let inner: DiGraph<_, _> = stable_graph.into();
        let node_ids = inner
            .node_indices()
            .map(|id| (inner[id].clone(), id))
            .collect();
        Self { inner, node_ids }
    }

    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut res = String::new();
        res.push_str("digraph {\n");
        res.push_str("  rankdir=LR;\n");
        // writing into a String cannot fail
        let _ = write!(
            res,
            "{}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::GraphContentOnly, Config::EdgeNoLabel],
                &|_, edge| {
                    let call = edge.weight();
                    let color = if call.is_concrete() { "black" } else { "red" };
                    let style = if call.is_control_flow_dependent() {
                        "dashed"
                    } else {
                        "solid"
                    };
                    format!("color={color},style={style}")
                },
                &|_, (_, signature)| {
                    let color = if signature.is_complete() {
                        "black"
                    } else {
                        "red"
                    };
                    format!("color={color},shape=box")
                }
            )
        );
        res.push('}');
        res
    }
}
