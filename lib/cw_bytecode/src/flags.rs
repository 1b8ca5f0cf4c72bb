//! Class and method access flags.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// JVM class flags
    pub struct ClassFlags: u16 {
        const ACC_PUBLIC                = 0x0001;
        const ACC_FINAL                 = 0x0010;
        const ACC_SUPER                 = 0x0020;
        const ACC_INTERFACE             = 0x0200;
        const ACC_ABSTRACT              = 0x0400;
        const ACC_SYNTHETIC             = 0x1000;
        const ACC_ANNOTATION            = 0x2000;
        const ACC_ENUM                  = 0x4000;
        const ACC_MODULE                = 0x8000;
    }
}

impl fmt::Display for ClassFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.contains(Self::ACC_PUBLIC) {
            write!(f, "public ")?;
        }
        if self.contains(Self::ACC_FINAL) {
            write!(f, "final ")?;
        }
        if self.contains(Self::ACC_SUPER) {
            write!(f, "super ")?;
        }
        if self.contains(Self::ACC_INTERFACE) {
            write!(f, "interface ")?;
        }
        if self.contains(Self::ACC_ABSTRACT) {
            write!(f, "abstract ")?;
        }
        if self.contains(Self::ACC_SYNTHETIC) {
            write!(f, "synthetic ")?;
        }
        if self.contains(Self::ACC_ANNOTATION) {
            write!(f, "annotation ")?;
        }
        if self.contains(Self::ACC_ENUM) {
            write!(f, "enum ")?;
        }
        if self.contains(Self::ACC_MODULE) {
            write!(f, "module ")?;
        }
        Ok(())
    }
}

bitflags! {
    /// JVM method flags
    pub struct MethodFlags: u16 {
        const ACC_PUBLIC                = 0x0001;
        const ACC_PRIVATE               = 0x0002;
        const ACC_PROTECTED             = 0x0004;
        const ACC_STATIC                = 0x0008;
        const ACC_FINAL                 = 0x0010;
        const ACC_SYNCHRONIZED          = 0x0020;
        const ACC_BRIDGE                = 0x0040;
        const ACC_VARARGS               = 0x0080;
        const ACC_NATIVE                = 0x0100;
        const ACC_ABSTRACT              = 0x0400;
        const ACC_STRICT                = 0x0800;
        const ACC_SYNTHETIC             = 0x1000;
    }
}

impl fmt::Display for MethodFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.contains(Self::ACC_PUBLIC) {
            write!(f, "public ")?;
        }
        if self.contains(Self::ACC_PRIVATE) {
            write!(f, "private ")?;
        }
        if self.contains(Self::ACC_PROTECTED) {
            write!(f, "protected ")?;
        }
        if self.contains(Self::ACC_STATIC) {
            write!(f, "static ")?;
        }
        if self.contains(Self::ACC_FINAL) {
            write!(f, "final ")?;
        }
        if self.contains(Self::ACC_SYNCHRONIZED) {
            write!(f, "synchronized ")?;
        }
        if self.contains(Self::ACC_BRIDGE) {
            write!(f, "bridge ")?;
        }
        if self.contains(Self::ACC_VARARGS) {
            write!(f, "varargs ")?;
        }
        if self.contains(Self::ACC_NATIVE) {
            write!(f, "native ")?;
        }
        if self.contains(Self::ACC_ABSTRACT) {
            write!(f, "abstract ")?;
        }
        if self.contains(Self::ACC_STRICT) {
            write!(f, "strict ")?;
        }
        if self.contains(Self::ACC_SYNTHETIC) {
            write!(f, "synthetic ")?;
        }
        Ok(())
    }
}
