//! Classes hierarchy graph representation.

use crate::errors::{AnalysisError, AnalysisResult};
use crate::repo::{Class, RepoCounters};
use cw_bytecode::classes::JAVA_LANG_OBJECT;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use Direction::Outgoing;

#[derive(Debug, PartialEq, Eq)]
pub enum Inheritance {
    Extends,
    Implements,
}

impl fmt::Display for Inheritance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Extends => write!(f, "<extends>"),
            Self::Implements => write!(f, "<implements>"),
        }
    }
}

#[derive(Debug)]
pub struct Hierarchy<'a> {
    inner: DiGraph<Class<'a>, Inheritance>,
    node_ids: BTreeMap<String, NodeIndex>,
}

impl<'a> Hierarchy<'a> {
    pub(crate) fn new() -> Self {
        Self {
            inner: DiGraph::new(),
            node_ids: BTreeMap::new(),
        }
    }

    pub(crate) fn insert_class(&mut self, class: Class<'a>) -> AnalysisResult<()> {
        if self.node_ids.contains_key(class.name()) {
            return Err(AnalysisError::Internal(
                "duplicate object in hierarchy graph".to_string(),
            ));
        }

        let class_name = class.name().to_string();
        let id = self.inner.add_node(class);
        self.node_ids.insert(class_name, id);
        Ok(())
    }

    pub(crate) fn update_class(&mut self, class: Class<'a>) -> AnalysisResult<()> {
        if let Some(id) = self.node_ids.get(class.name()) {
            self.inner[*id] = class;
            Ok(())
        } else {
            Err(AnalysisError::ClassNotFound(class.name().to_string()))
        }
    }

    pub(crate) fn contains_class(&self, class_name: &str) -> bool {
        self.node_ids.contains_key(class_name)
    }

    /// Iterates over classes in registration order.
    pub fn iter_classes(&self) -> impl Iterator<Item = &Class<'a>> {
        self.inner.node_weights()
    }

    pub(crate) fn insert_extends(&mut self, class: &str, superclass: &str) -> AnalysisResult<()> {
        self.insert_link(class, superclass, Inheritance::Extends)
    }

    pub(crate) fn insert_implements(&mut self, class: &str, interface: &str) -> AnalysisResult<()> {
        self.insert_link(class, interface, Inheritance::Implements)
    }

    fn insert_link(&mut self, from: &str, to: &str, link: Inheritance) -> AnalysisResult<()> {
        let src = self
            .node_ids
            .get(from)
            .ok_or_else(|| AnalysisError::ClassNotFound(from.to_string()))?;
        let dst = self
            .node_ids
            .get(to)
            .ok_or_else(|| AnalysisError::ClassNotFound(to.to_string()))?;
        self.inner.add_edge(*src, *dst, link);
        Ok(())
    }

    pub(crate) fn close(&mut self, counters: &mut RepoCounters) -> AnalysisResult<()> {
        if !self.contains_class(JAVA_LANG_OBJECT) {
            self.insert_class(Class::new_no_def(
                counters.new_class_uid(),
                JAVA_LANG_OBJECT,
            ))?;
        }

        let id_orphans: Vec<NodeIndex> = self
            .inner
            .externals(Outgoing)
            .filter(|id| self.inner[*id].name() != JAVA_LANG_OBJECT)
            .collect();

        for id in id_orphans {
            let class_name = self.inner[id].name().to_string();
            log::warn!("add missing java.lang.Object inheritance to {class_name}");
            self.insert_extends(&class_name, JAVA_LANG_OBJECT)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get_class(&self, class_name: &str) -> Option<&Class<'a>> {
        self.node_ids.get(class_name).map(|id| &self.inner[*id])
    }

    fn links(&self, class_name: &str, link: Inheritance) -> Vec<&Class<'a>> {
        let Some(id) = self.node_ids.get(class_name) else {
            return Vec::new();
        };
        // petgraph walks edges from the most recently added one
        let mut targets: Vec<&Class<'a>> = self
            .inner
            .edges_directed(*id, Outgoing)
            .filter(|edge| *edge.weight() == link)
            .map(|edge| &self.inner[edge.target()])
            .collect();
        targets.reverse();
        targets
    }

    /// Direct superclass of the given class, if recorded.
    #[must_use]
    pub fn superclass(&self, class_name: &str) -> Option<&Class<'a>> {
        self.links(class_name, Inheritance::Extends).into_iter().next()
    }

    /// Directly implemented interfaces (or extended interfaces for an
    /// interface), in declaration order.
    #[must_use]
    pub fn interfaces(&self, class_name: &str) -> Vec<&Class<'a>> {
        self.links(class_name, Inheritance::Implements)
    }

    /// Transitive closure of the interfaces of a class: interfaces of its
    /// superclasses and superinterfaces of those interfaces.
    #[must_use]
    pub fn all_superinterfaces(&self, class_name: &str) -> BTreeSet<&Class<'a>> {
        let mut interfaces = BTreeSet::new();
        let Some(start) = self.node_ids.get(class_name) else {
            return interfaces;
        };
        let mut visited = BTreeSet::from([*start]);
        let mut todo = vec![*start];
        while let Some(id) = todo.pop() {
            for edge in self.inner.edges_directed(id, Outgoing) {
                let parent = edge.target();
                if *edge.weight() == Inheritance::Implements {
                    interfaces.insert(&self.inner[parent]);
                }
                if visited.insert(parent) {
                    todo.push(parent);
                }
            }
        }
        interfaces
    }

    /// All classes (and interfaces) that transitively inherit from the given
    /// one, itself excluded.
    #[must_use]
    pub fn subclasses(&self, class_name: &str) -> BTreeSet<&Class<'a>> {
        let mut children = BTreeSet::new();
        if let Some(id) = self.node_ids.get(class_name) {
            let reversed = Reversed(&self.inner);
            let mut dfs = Dfs::new(reversed, *id);
            while let Some(child) = dfs.next(reversed) {
                if child != *id {
                    children.insert(&self.inner[child]);
                }
            }
        }
        children
    }

    /// Checks whether `class_name` strictly inherits from `ancestor_name`
    /// through its superclasses chain.
    #[must_use]
    pub fn is_subclass_of(&self, class_name: &str, ancestor_name: &str) -> bool {
        let mut visited = BTreeSet::new();
        let mut current = self.superclass(class_name);
        while let Some(class) = current {
            if class.name() == ancestor_name {
                return true;
            }
            if !visited.insert(class.uid()) {
                log::warn!("cyclic inheritance detected at {}", class.name());
                return false;
            }
            current = self.superclass(class.name());
        }
        false
    }

    #[must_use]
    pub fn to_dot(&self) -> String {
        format!(
            "{}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::EdgeNoLabel],
                &|_, edge| {
                    let style = match edge.weight() {
                        Inheritance::Extends => "solid",
                        Inheritance::Implements => "dashed",
                    };
                    format!("arrowType=empty,style={style}")
                },
                &|_, (_, class)| {
                    let (color, shape) = if class.is_defined() {
                        if class.is_library() {
                            ("#00000088", "box")
                        } else {
                            ("black", "box")
                        }
                    } else {
                        ("black", "none")
                    };
                    format!("color={color},shape={shape}")
                }
            )
        )
    }
}
