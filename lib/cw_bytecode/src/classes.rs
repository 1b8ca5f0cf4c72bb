//! JVM class definitions.

use crate::code::Code;
use crate::constants::ConstantPool;
use crate::errors::BytecodeResult;
use crate::flags::{ClassFlags, MethodFlags};
use crate::types::MethodDescriptor;
use std::fmt;

/// Name of the instance initialization methods.
pub const INIT_NAME: &str = "<init>";

/// Name of the class initialization methods.
pub const CLINIT_NAME: &str = "<clinit>";

/// Root of the class hierarchy.
pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";

/// The JVM class definition.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub(crate) access_flags: ClassFlags,
    pub(crate) name: String,
    pub(crate) superclass: Option<String>,
    pub(crate) interfaces: Vec<String>,
    pub(crate) constants: ConstantPool,
    pub(crate) methods: Vec<MethodInfo>,
}

impl fmt::Display for ClassFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.access_flags, self.name)
    }
}

impl ClassFile {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> ClassFlags {
        self.access_flags
    }

    #[inline]
    #[must_use]
    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    #[inline]
    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.interfaces.iter().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub const fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    #[inline]
    pub fn iter_methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter()
    }

    /// Finds a method declared by this very class (inherited methods are not
    /// considered).
    #[must_use]
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    #[inline]
    #[must_use]
    pub const fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassFlags::ACC_INTERFACE)
    }

    #[inline]
    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.access_flags.contains(ClassFlags::ACC_ABSTRACT)
    }

    /// Legacy `ACC_SUPER` marker, changing `invokespecial` semantics.
    #[inline]
    #[must_use]
    pub const fn is_super(&self) -> bool {
        self.access_flags.contains(ClassFlags::ACC_SUPER)
    }
}

/// The JVM method definition.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub(crate) access_flags: MethodFlags,
    pub(crate) name: String,
    pub(crate) descriptor: String,
    pub(crate) code: Option<Code>,
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.access_flags, self.name, self.descriptor)
    }
}

impl MethodInfo {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn parsed_descriptor(&self) -> BytecodeResult<MethodDescriptor> {
        MethodDescriptor::try_from(self.descriptor.as_str())
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> MethodFlags {
        self.access_flags
    }

    #[inline]
    #[must_use]
    pub const fn code(&self) -> Option<&Code> {
        self.code.as_ref()
    }

    #[inline]
    #[must_use]
    pub const fn is_public(&self) -> bool {
        self.access_flags.contains(MethodFlags::ACC_PUBLIC)
    }

    #[inline]
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.access_flags.contains(MethodFlags::ACC_PRIVATE)
    }

    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.access_flags.contains(MethodFlags::ACC_STATIC)
    }

    #[inline]
    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.access_flags.contains(MethodFlags::ACC_ABSTRACT)
    }

    #[inline]
    #[must_use]
    pub const fn is_native(&self) -> bool {
        self.access_flags.contains(MethodFlags::ACC_NATIVE)
    }

    #[inline]
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == crate::classes::INIT_NAME
    }
}
