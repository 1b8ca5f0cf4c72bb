//! Abstract values reported by evaluators.

use serde::Serialize;
use std::fmt;

/// What is known about a reference being null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Nullness {
    Never,
    #[default]
    Maybe,
    Always,
}

impl fmt::Display for Nullness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Never => write!(f, "non-null"),
            Self::Maybe => write!(f, "maybe-null"),
            Self::Always => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PrimitiveValue {
    Int(Option<i32>),
    Long(Option<i64>),
    Float(Option<f32>),
    Double(Option<f64>),
}

impl PrimitiveValue {
    #[must_use]
    pub const fn is_category2(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }

    #[must_use]
    pub const fn is_particular(&self) -> bool {
        match self {
            Self::Int(v) => v.is_some(),
            Self::Long(v) => v.is_some(),
            Self::Float(v) => v.is_some(),
            Self::Double(v) => v.is_some(),
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn opt<T: fmt::Display>(f: &mut fmt::Formatter, kind: &str, v: &Option<T>) -> fmt::Result {
            match v {
                Some(v) => write!(f, "{kind}:{v}"),
                None => write!(f, "{kind}"),
            }
        }
        match self {
            Self::Int(v) => opt(f, "int", v),
            Self::Long(v) => opt(f, "long", v),
            Self::Float(v) => opt(f, "float", v),
            Self::Double(v) => opt(f, "double", v),
        }
    }
}

/// A reference value: its (static) type, nullness and known constant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReferenceValue {
    type_name: Option<String>,
    nullness: Nullness,
    may_be_extension: bool,
    constant: Option<String>,
}

impl fmt::Display for ReferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.type_name.as_deref().unwrap_or("?"))?;
        if self.may_be_extension {
            write!(f, "+")?;
        }
        write!(f, " ({})", self.nullness)?;
        if let Some(constant) = &self.constant {
            write!(f, " {constant:?}")?;
        }
        Ok(())
    }
}

impl ReferenceValue {
    /// A non-null reference whose runtime type is exactly `type_name`.
    #[must_use]
    pub fn exact(type_name: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            nullness: Nullness::Never,
            may_be_extension: false,
            constant: None,
        }
    }

    /// A maybe-null reference of type `type_name` or of one of its subtypes.
    #[must_use]
    pub fn extensible(type_name: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            nullness: Nullness::Maybe,
            may_be_extension: true,
            constant: None,
        }
    }

    #[must_use]
    pub fn null() -> Self {
        Self {
            type_name: None,
            nullness: Nullness::Always,
            may_be_extension: false,
            constant: None,
        }
    }

    #[must_use]
    pub fn with_nullness(mut self, nullness: Nullness) -> Self {
        self.nullness = nullness;
        self
    }

    #[must_use]
    pub fn with_constant(mut self, constant: &str) -> Self {
        self.constant = Some(constant.to_string());
        self
    }

    #[inline]
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    #[inline]
    #[must_use]
    pub const fn nullness(&self) -> Nullness {
        self.nullness
    }

    #[inline]
    #[must_use]
    pub const fn may_be_extension(&self) -> bool {
        self.may_be_extension
    }

    #[inline]
    #[must_use]
    pub fn constant(&self) -> Option<&str> {
        self.constant.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// Unknown value, or upper half of a category-2 stack slot.
    Top,
    Primitive(PrimitiveValue),
    Reference(ReferenceValue),
    /// Several possible runtime types.
    MultiType(Vec<ReferenceValue>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Top => write!(f, "T"),
            Self::Primitive(p) => p.fmt(f),
            Self::Reference(r) => r.fmt(f),
            Self::MultiType(refs) => {
                write!(f, "{{")?;
                for (i, r) in refs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    r.fmt(f)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Value {
    /// Whether the exact runtime value is known.
    #[must_use]
    pub fn is_particular(&self) -> bool {
        match self {
            Self::Top | Self::MultiType(_) => false,
            Self::Primitive(p) => p.is_particular(),
            Self::Reference(r) => r.constant.is_some() || r.nullness == Nullness::Always,
        }
    }

    #[must_use]
    pub const fn is_category2(&self) -> bool {
        match self {
            Self::Primitive(p) => p.is_category2(),
            _ => false,
        }
    }

    /// Number of distinct runtime types the value may have.
    #[must_use]
    pub fn type_count(&self) -> usize {
        match self {
            Self::Top => 0,
            Self::Primitive(_) | Self::Reference(_) => 1,
            Self::MultiType(refs) => refs.len(),
        }
    }

    /// Possible reference types of the value, empty for non references.
    #[must_use]
    pub fn reference_types(&self) -> Vec<&ReferenceValue> {
        match self {
            Self::Reference(r) => vec![r],
            Self::MultiType(refs) => refs.iter().collect(),
            Self::Top | Self::Primitive(_) => Vec::new(),
        }
    }
}

impl From<PrimitiveValue> for Value {
    fn from(p: PrimitiveValue) -> Self {
        Self::Primitive(p)
    }
}

impl From<ReferenceValue> for Value {
    fn from(r: ReferenceValue) -> Self {
        Self::Reference(r)
    }
}
