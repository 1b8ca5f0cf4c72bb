use crate::repo::ClassUid;
use cw_bytecode::classes::{ClassFile, MethodInfo};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

/// A class node of the repository.
///
/// Classes that are only referenced (as superclass or interface of a
/// registered class) are kept as placeholders without definition.
#[derive(Debug, Clone)]
pub struct Class<'a> {
    // Unique identifier in the repository
    uid: ClassUid,
    // Class definition, absent for referenced but not registered classes
    content: Option<&'a ClassFile>,
    // Flag to indicate that the class comes from a dependency, not from the analyzed program
    library: bool,
    // Cache of name that identify the class
    name: String,
}

impl<'a> PartialEq for Class<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl<'a> Eq for Class<'a> {}

impl<'a> PartialOrd for Class<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Ord for Class<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uid.cmp(&other.uid)
    }
}

impl<'a> fmt::Display for Class<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl<'a> Class<'a> {
    pub(crate) fn new(uid: ClassUid, content: &'a ClassFile, library: bool) -> Self {
        Self {
            uid,
            content: Some(content),
            library,
            name: content.name().to_string(),
        }
    }

    /// Builds a class declaration without definition.
    pub(crate) fn new_no_def(uid: ClassUid, name: &str) -> Self {
        Self {
            uid,
            content: None,
            library: false,
            name: name.to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn uid(&self) -> ClassUid {
        self.uid
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn content(&self) -> Option<&'a ClassFile> {
        self.content
    }

    #[inline]
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        self.content.is_some()
    }

    #[inline]
    #[must_use]
    pub const fn is_library(&self) -> bool {
        self.library
    }

    /// Undefined classes are never considered as interfaces.
    #[inline]
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.content.map_or(false, ClassFile::is_interface)
    }

    #[inline]
    #[must_use]
    pub fn is_super(&self) -> bool {
        self.content.map_or(false, ClassFile::is_super)
    }

    /// Returns a iterator over all methods declared by the class.
    pub fn iter_methods(&self) -> impl Iterator<Item = &'a MethodInfo> {
        self.content
            .into_iter()
            .flat_map(|content| content.iter_methods())
    }

    /// Looks for a method declared by the class itself (inherited methods are
    /// not considered).
    #[must_use]
    pub fn get_method(&self, name: &str, descriptor: &str) -> Option<&'a MethodInfo> {
        self.content
            .and_then(|content| content.find_method(name, descriptor))
    }

    pub fn find_methods<'r>(&self, pattern: &'r Regex) -> impl Iterator<Item = &'a MethodInfo> + 'r
    where
        'a: 'r,
    {
        self.iter_methods()
            .filter(move |m| pattern.is_match(m.name()))
    }
}
