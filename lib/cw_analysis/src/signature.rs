//! Method signatures and code locations.

use cw_bytecode::Addr;
use serde::Serialize;
use std::fmt;

/// Identifies a method by declaring class, name and descriptor. Every part
/// may be unknown when it cannot be statically resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MethodSignature {
    class: Option<String>,
    method: Option<String>,
    descriptor: Option<String>,
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{}{}",
            self.class.as_deref().unwrap_or("?"),
            self.method.as_deref().unwrap_or("?"),
            self.descriptor.as_deref().unwrap_or("(?)"),
        )
    }
}

impl MethodSignature {
    #[must_use]
    pub fn new(class: Option<&str>, method: Option<&str>, descriptor: Option<&str>) -> Self {
        Self {
            class: class.map(str::to_string),
            method: method.map(str::to_string),
            descriptor: descriptor.map(str::to_string),
        }
    }

    /// Fully resolved signature.
    #[must_use]
    pub fn of(class: &str, method: &str, descriptor: &str) -> Self {
        Self::new(Some(class), Some(method), Some(descriptor))
    }

    /// Signature with no information at all.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            class: None,
            method: None,
            descriptor: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    /// Same signature with another declaring class.
    #[must_use]
    pub fn with_class(&self, class: &str) -> Self {
        Self {
            class: Some(class.to_string()),
            method: self.method.clone(),
            descriptor: self.descriptor.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.class.is_some() && self.method.is_some() && self.descriptor.is_some()
    }
}

/// Position of an instruction inside a method.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CodeLocation {
    signature: MethodSignature,
    offset: Addr,
    line: Option<u16>,
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.signature, self.offset)?;
        if let Some(line) = self.line {
            write!(f, " (line {line})")?;
        }
        Ok(())
    }
}

impl CodeLocation {
    #[must_use]
    pub const fn new(signature: MethodSignature, offset: Addr, line: Option<u16>) -> Self {
        Self {
            signature,
            offset,
            line,
        }
    }

    #[inline]
    #[must_use]
    pub const fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    #[inline]
    #[must_use]
    pub const fn offset(&self) -> Addr {
        self.offset
    }

    /// Source line, when a line number table was available.
    #[inline]
    #[must_use]
    pub const fn line(&self) -> Option<u16> {
        self.line
    }
}
