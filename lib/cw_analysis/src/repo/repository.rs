//! A repository to centralize program and library classes.

use crate::errors::AnalysisResult;
use crate::hierarchy::Hierarchy;
use crate::repo::*;
use cw_bytecode::classes::{ClassFile, MethodInfo};
use regex::Regex;

pub struct Repo<'a> {
    hierarchy: Hierarchy<'a>,
    counters: RepoCounters,
}

impl<'a> Default for Repo<'a> {
    fn default() -> Self {
        Self {
            hierarchy: Hierarchy::new(),
            counters: RepoCounters::new(),
        }
    }
}

impl<'a> Repo<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a batch of classes; `is_library` marks dependencies that
    /// are not part of the analyzed program.
    pub fn register_classes<I>(&mut self, classes: I, is_library: bool) -> AnalysisResult<()>
    where
        I: IntoIterator<Item = &'a ClassFile>,
    {
        for class_file in classes {
            self.register_class(class_file, is_library)?;
        }
        Ok(())
    }

    pub fn register_class(&mut self, class_file: &'a ClassFile, is_library: bool) -> AnalysisResult<()> {
        let class_name = class_file.name();
        log::trace!(
            "pushing '{}'{} in repository",
            class_name,
            if is_library { " (LIB)" } else { "" }
        );

        let mut uid_to_update = None;
        if let Some(class_h) = self.hierarchy.get_class(class_name) {
            if class_h.is_defined() {
                log::warn!(
                    "class '{}'{} has already been pushed in repository",
                    class_name,
                    if is_library { " (LIB)" } else { "" }
                );
                // no change of the hierarchy nor of the repository for this class
                return Ok(());
            }
            uid_to_update = Some(class_h.uid());
        }

        let class = Class::new(
            uid_to_update.unwrap_or_else(|| self.counters.new_class_uid()),
            class_file,
            is_library,
        );
        self.counters.count_methods(class_file.iter_methods().count());
        if uid_to_update.is_some() {
            self.hierarchy.update_class(class)?;
        } else {
            self.hierarchy.insert_class(class)?;
        }

        // filling in the hierarchy links
        if let Some(superclass_name) = class_file.superclass() {
            self.ensure_declared(superclass_name)?;
            self.hierarchy.insert_extends(class_name, superclass_name)?;
        }
        for interface_name in class_file.interfaces() {
            self.ensure_declared(interface_name)?;
            self.hierarchy.insert_implements(class_name, interface_name)?;
        }

        Ok(())
    }

    fn ensure_declared(&mut self, class_name: &str) -> AnalysisResult<()> {
        if !self.hierarchy.contains_class(class_name) {
            self.hierarchy
                .insert_class(Class::new_no_def(self.counters.new_class_uid(), class_name))?;
        }
        Ok(())
    }

    /// Links every class without superclass to `java/lang/Object`.
    pub fn close_hierarchy(&mut self) -> AnalysisResult<()> {
        self.hierarchy.close(&mut self.counters)
    }

    #[inline]
    #[must_use]
    pub const fn hierarchy(&self) -> &Hierarchy<'a> {
        &self.hierarchy
    }

    #[inline]
    pub fn iter_classes(&self) -> impl Iterator<Item = &Class<'a>> {
        self.hierarchy.iter_classes()
    }

    /// Iterates over classes having a definition, program and library ones.
    pub fn iter_defined_classes(&self) -> impl Iterator<Item = &Class<'a>> {
        self.iter_classes().filter(|class| class.is_defined())
    }

    pub fn iter_missing_classes(&self) -> impl Iterator<Item = &str> {
        self.hierarchy
            .iter_classes()
            .filter(|class| !class.is_defined())
            .map(Class::name)
    }

    /// Gets a class node, defined or not.
    #[must_use]
    pub fn get_class_by_name(&self, name: &str) -> Option<&Class<'a>> {
        self.hierarchy.get_class(name)
    }

    /// Gets the definition of a class. Placeholders for referenced but
    /// unregistered classes count as not found.
    #[must_use]
    pub fn get_class(&self, name: &str) -> Option<&'a ClassFile> {
        self.hierarchy.get_class(name).and_then(Class::content)
    }

    pub fn find_classes<'r>(&'r self, pattern: &'r Regex) -> impl Iterator<Item = &'r Class<'a>> {
        self.hierarchy
            .iter_classes()
            .filter(|class| pattern.is_match(class.name()))
    }

    /// Same as [`Repo::find_classes`] from a pattern string.
    pub fn find_classes_by_pattern(&self, pattern: &str) -> AnalysisResult<Vec<&Class<'a>>> {
        let regex = Regex::new(pattern)?;
        Ok(self
            .hierarchy
            .iter_classes()
            .filter(|class| regex.is_match(class.name()))
            .collect())
    }

    /// Finds a method declared by the named class itself.
    #[must_use]
    pub fn find_method(&self, class_name: &str, name: &str, descriptor: &str) -> Option<&'a MethodInfo> {
        self.get_class(class_name)?.find_method(name, descriptor)
    }

    #[must_use]
    pub fn superclass(&self, class_name: &str) -> Option<&str> {
        self.hierarchy.superclass(class_name).map(Class::name)
    }

    #[must_use]
    pub fn interfaces(&self, class_name: &str) -> Vec<&str> {
        self.hierarchy
            .interfaces(class_name)
            .into_iter()
            .map(Class::name)
            .collect()
    }

    /// Names of every transitive subclass (or implementor) of a class.
    #[must_use]
    pub fn subclasses(&self, class_name: &str) -> Vec<&str> {
        self.hierarchy
            .subclasses(class_name)
            .into_iter()
            .map(Class::name)
            .collect()
    }

    #[must_use]
    pub fn all_superinterfaces(&self, class_name: &str) -> Vec<&str> {
        self.hierarchy
            .all_superinterfaces(class_name)
            .into_iter()
            .map(Class::name)
            .collect()
    }

    #[must_use]
    pub fn is_subclass_of(&self, class_name: &str, ancestor_name: &str) -> bool {
        self.hierarchy.is_subclass_of(class_name, ancestor_name)
    }

    pub fn nb_classes(&self) -> usize {
        self.counters.nb_classes()
    }

    pub fn nb_methods(&self) -> usize {
        self.counters.nb_methods()
    }
}
