//! JVM field and method descriptors.

use crate::errors::{BytecodeError, BytecodeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JVM concrete type descriptor type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Type {
    /// `void` type, only valid for return types.
    Void,
    /// `boolean` type.
    Boolean,
    /// `byte` type.
    Byte,
    /// `short` type.
    Short,
    /// `char` type.
    Char,
    /// `int` type.
    Int,
    /// `long` type.
    Long,
    /// `float` type.
    Float,
    /// `double` type.
    Double,
    /// Array of the given type descriptor, usable recursively for arrays of arrays,
    /// though it is invalid to have more than 255 dimensions.
    Array(usize, Box<Self>),
    /// Type of a class, given by its internal name (`java/lang/String`).
    Class(String),
}

impl Type {
    /// Returns a java-like representation of the type.
    #[must_use]
    pub fn to_java_string(&self) -> String {
        match self {
            Self::Void => "void".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Byte => "byte".to_string(),
            Self::Short => "short".to_string(),
            Self::Char => "char".to_string(),
            Self::Int => "int".to_string(),
            Self::Long => "long".to_string(),
            Self::Float => "float".to_string(),
            Self::Double => "double".to_string(),
            Self::Array(n, sub) => {
                let mut s = sub.to_java_string();
                for _ in 0..*n {
                    s.push_str("[]");
                }
                s
            }
            Self::Class(name) => name.replace('/', "."),
        }
    }

    /// Long and double values take two slots on the operand stack.
    #[inline]
    #[must_use]
    pub const fn is_category2(&self) -> bool {
        matches!(self, Self::Long | Self::Double)
    }

    #[inline]
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Array(_, _) | Self::Class(_))
    }

    /// Number of operand stack slots a value of this type occupies.
    #[must_use]
    pub const fn slots(&self) -> usize {
        match self {
            Self::Void => 0,
            Self::Long | Self::Double => 2,
            _ => 1,
        }
    }

    pub fn as_class_name(&self) -> BytecodeResult<&str> {
        if let Self::Class(name) = self {
            Ok(name)
        } else {
            Err(BytecodeError::InvalidDescriptor(format!(
                "{self} is not a class type"
            )))
        }
    }

    /// Reads one type at the start of `s`, returning it with the number of
    /// consumed bytes.
    fn parse_prefix(s: &str) -> BytecodeResult<(Self, usize)> {
        let bytes = s.as_bytes();
        let mut dims = 0;
        while dims < bytes.len() && bytes[dims] == b'[' {
            dims += 1;
        }
        if dims >= bytes.len() || dims > 255 {
            return Err(BytecodeError::InvalidDescriptor(s.to_string()));
        }

        let (base, len) = match bytes[dims] {
            b'V' if dims == 0 => (Self::Void, 1),
            b'Z' => (Self::Boolean, 1),
            b'B' => (Self::Byte, 1),
            b'S' => (Self::Short, 1),
            b'C' => (Self::Char, 1),
            b'I' => (Self::Int, 1),
            b'J' => (Self::Long, 1),
            b'F' => (Self::Float, 1),
            b'D' => (Self::Double, 1),
            b'L' => {
                let end = s[dims..]
                    .find(';')
                    .ok_or_else(|| BytecodeError::InvalidDescriptor(s.to_string()))?;
                if end < 2 {
                    return Err(BytecodeError::InvalidDescriptor(s.to_string()));
                }
                (Self::Class(s[dims + 1..dims + end].to_string()), end + 1)
            }
            _ => return Err(BytecodeError::InvalidDescriptor(s.to_string())),
        };

        if dims == 0 {
            Ok((base, len))
        } else {
            Ok((Self::Array(dims, Box::new(base)), dims + len))
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Void => write!(f, "V"),
            Self::Boolean => write!(f, "Z"),
            Self::Byte => write!(f, "B"),
            Self::Short => write!(f, "S"),
            Self::Char => write!(f, "C"),
            Self::Int => write!(f, "I"),
            Self::Long => write!(f, "J"),
            Self::Float => write!(f, "F"),
            Self::Double => write!(f, "D"),
            Self::Array(n, inner) => {
                for _ in 0..*n {
                    write!(f, "[")?;
                }
                write!(f, "{inner}")
            }
            Self::Class(classname) => write!(f, "L{classname};"),
        }
    }
}

impl TryFrom<&str> for Type {
    type Error = BytecodeError;

    fn try_from(s: &str) -> BytecodeResult<Self> {
        let (t, len) = Self::parse_prefix(s)?;
        if len == s.len() {
            Ok(t)
        } else {
            Err(BytecodeError::InvalidDescriptor(s.to_string()))
        }
    }
}

/// Parsed method descriptor, e.g. `(ILjava/lang/String;)V`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    parameters: Vec<Type>,
    return_type: Type,
}

impl MethodDescriptor {
    #[must_use]
    pub fn new(parameters: Vec<Type>, return_type: Type) -> Self {
        Self {
            parameters,
            return_type,
        }
    }

    #[inline]
    #[must_use]
    pub fn parameters_types(&self) -> &[Type] {
        &self.parameters
    }

    #[inline]
    #[must_use]
    pub const fn return_type(&self) -> &Type {
        &self.return_type
    }

    #[inline]
    #[must_use]
    pub fn returns_void(&self) -> bool {
        self.return_type == Type::Void
    }

    /// Number of operand stack slots taken by the declared parameters
    /// (without any receiver).
    #[must_use]
    pub fn parameters_slots(&self) -> usize {
        self.parameters.iter().map(Type::slots).sum()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for t in &self.parameters {
            write!(f, "{t}")?;
        }
        write!(f, "){}", self.return_type)
    }
}

impl TryFrom<&str> for MethodDescriptor {
    type Error = BytecodeError;

    fn try_from(s: &str) -> BytecodeResult<Self> {
        let body = s
            .strip_prefix('(')
            .ok_or_else(|| BytecodeError::InvalidDescriptor(s.to_string()))?;
        let close = body
            .find(')')
            .ok_or_else(|| BytecodeError::InvalidDescriptor(s.to_string()))?;

        let mut parameters = Vec::new();
        let mut rest = &body[..close];
        while !rest.is_empty() {
            let (t, len) = Type::parse_prefix(rest)?;
            if t == Type::Void {
                return Err(BytecodeError::InvalidDescriptor(s.to_string()));
            }
            parameters.push(t);
            rest = &rest[len..];
        }
        let return_type = Type::try_from(&body[close + 1..])?;

        Ok(Self {
            parameters,
            return_type,
        })
    }
}
