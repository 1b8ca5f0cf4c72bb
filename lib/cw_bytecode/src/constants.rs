//! Class file constant pool.

use crate::errors::{BytecodeError, BytecodeResult};
use crate::types::MethodDescriptor;
use std::collections::HashMap;
use std::fmt;

/// Index of an entry in the constant pool. Valid indices start at 1.
pub type ConstantIndex = u16;

/// A constant pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ConstantIndex),
    String(ConstantIndex),
    FieldRef {
        class: ConstantIndex,
        name_and_type: ConstantIndex,
    },
    MethodRef {
        class: ConstantIndex,
        name_and_type: ConstantIndex,
    },
    InterfaceMethodRef {
        class: ConstantIndex,
        name_and_type: ConstantIndex,
    },
    NameAndType {
        name: ConstantIndex,
        descriptor: ConstantIndex,
    },
    MethodHandle {
        kind: u8,
        reference: ConstantIndex,
    },
    MethodType(ConstantIndex),
    InvokeDynamic {
        bootstrap_method: u16,
        name_and_type: ConstantIndex,
    },
}

impl Constant {
    /// Long and double constants take two entries in the pool.
    #[inline]
    const fn width(&self) -> u16 {
        match self {
            Self::Long(_) | Self::Double(_) => 2,
            _ => 1,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Utf8(_) => "Utf8",
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::Long(_) => "Long",
            Self::Double(_) => "Double",
            Self::Class(_) => "Class",
            Self::String(_) => "String",
            Self::FieldRef { .. } => "Fieldref",
            Self::MethodRef { .. } => "Methodref",
            Self::InterfaceMethodRef { .. } => "InterfaceMethodref",
            Self::NameAndType { .. } => "NameAndType",
            Self::MethodHandle { .. } => "MethodHandle",
            Self::MethodType(_) => "MethodType",
            Self::InvokeDynamic { .. } => "InvokeDynamic",
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Utf8(s) => write!(f, "{}({s:?})", self.kind()),
            Self::Integer(i) => write!(f, "{}({i})", self.kind()),
            Self::Float(x) => write!(f, "{}({x})", self.kind()),
            Self::Long(l) => write!(f, "{}({l})", self.kind()),
            Self::Double(x) => write!(f, "{}({x})", self.kind()),
            Self::Class(i) | Self::String(i) | Self::MethodType(i) => {
                write!(f, "{}(#{i})", self.kind())
            }
            Self::FieldRef {
                class,
                name_and_type,
            }
            | Self::MethodRef {
                class,
                name_and_type,
            }
            | Self::InterfaceMethodRef {
                class,
                name_and_type,
            } => write!(f, "{}(#{class}, #{name_and_type})", self.kind()),
            Self::NameAndType { name, descriptor } => {
                write!(f, "{}(#{name}, #{descriptor})", self.kind())
            }
            Self::MethodHandle { kind, reference } => {
                write!(f, "{}({kind}, #{reference})", self.kind())
            }
            Self::InvokeDynamic {
                bootstrap_method,
                name_and_type,
            } => write!(
                f,
                "{}(bsm {bootstrap_method}, #{name_and_type})",
                self.kind()
            ),
        }
    }
}

/// A method reference as resolved from the constant pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRefInfo {
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
    pub is_interface: bool,
}

impl MethodRefInfo {
    pub fn parsed_descriptor(&self) -> BytecodeResult<MethodDescriptor> {
        MethodDescriptor::try_from(self.descriptor.as_str())
    }
}

impl fmt::Display for MethodRefInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}{}", self.class_name, self.name, self.descriptor)
    }
}

/// The constant pool of a class, with interning of already pushed entries.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    // entry i is stored at position i - 1, padding entries after wide constants are None
    entries: Vec<Option<Constant>>,
    utf8s: HashMap<String, ConstantIndex>,
}

impl ConstantPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of used indices, including padding entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a constant, reusing an identical existing entry if any.
    pub fn push(&mut self, constant: Constant) -> BytecodeResult<ConstantIndex> {
        if let Constant::Utf8(s) = &constant {
            if let Some(idx) = self.utf8s.get(s) {
                return Ok(*idx);
            }
        } else if let Some(pos) = self
            .entries
            .iter()
            .position(|c| c.as_ref() == Some(&constant))
        {
            return Ok(pos as ConstantIndex + 1);
        }

        let index = u16::try_from(self.entries.len() + 1)
            .ok()
            .filter(|i| i.checked_add(constant.width()).is_some())
            .ok_or(BytecodeError::ConstantPoolOverflow)?;
        if let Constant::Utf8(s) = &constant {
            self.utf8s.insert(s.clone(), index);
        }
        let width = constant.width();
        self.entries.push(Some(constant));
        if width == 2 {
            self.entries.push(None);
        }
        Ok(index)
    }

    pub fn push_utf8(&mut self, s: &str) -> BytecodeResult<ConstantIndex> {
        self.push(Constant::Utf8(s.to_string()))
    }

    pub fn push_class(&mut self, name: &str) -> BytecodeResult<ConstantIndex> {
        let name = self.push_utf8(name)?;
        self.push(Constant::Class(name))
    }

    pub fn push_string(&mut self, s: &str) -> BytecodeResult<ConstantIndex> {
        let s = self.push_utf8(s)?;
        self.push(Constant::String(s))
    }

    pub fn push_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> BytecodeResult<ConstantIndex> {
        let name = self.push_utf8(name)?;
        let descriptor = self.push_utf8(descriptor)?;
        self.push(Constant::NameAndType { name, descriptor })
    }

    pub fn push_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> BytecodeResult<ConstantIndex> {
        let class = self.push_class(class)?;
        let name_and_type = self.push_name_and_type(name, descriptor)?;
        if is_interface {
            self.push(Constant::InterfaceMethodRef {
                class,
                name_and_type,
            })
        } else {
            self.push(Constant::MethodRef {
                class,
                name_and_type,
            })
        }
    }

    pub fn push_invoke_dynamic(
        &mut self,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
    ) -> BytecodeResult<ConstantIndex> {
        let name_and_type = self.push_name_and_type(name, descriptor)?;
        self.push(Constant::InvokeDynamic {
            bootstrap_method,
            name_and_type,
        })
    }

    pub fn get(&self, index: ConstantIndex) -> BytecodeResult<&Constant> {
        if index == 0 {
            return Err(BytecodeError::ConstantNotFound(index));
        }
        self.entries
            .get(usize::from(index) - 1)
            .and_then(Option::as_ref)
            .ok_or(BytecodeError::ConstantNotFound(index))
    }

    pub fn utf8(&self, index: ConstantIndex) -> BytecodeResult<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            _ => Err(BytecodeError::UnexpectedConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    pub fn class_name(&self, index: ConstantIndex) -> BytecodeResult<&str> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(BytecodeError::UnexpectedConstant {
                index,
                expected: "Class",
            }),
        }
    }

    pub fn name_and_type(&self, index: ConstantIndex) -> BytecodeResult<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(BytecodeError::UnexpectedConstant {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// Resolves a `Methodref` or `InterfaceMethodref` entry.
    pub fn method_ref(&self, index: ConstantIndex) -> BytecodeResult<MethodRefInfo> {
        let (class, name_and_type, is_interface) = match self.get(index)? {
            Constant::MethodRef {
                class,
                name_and_type,
            } => (*class, *name_and_type, false),
            Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => (*class, *name_and_type, true),
            _ => {
                return Err(BytecodeError::UnexpectedConstant {
                    index,
                    expected: "Methodref",
                })
            }
        };
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok(MethodRefInfo {
            class_name: self.class_name(class)?.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            is_interface,
        })
    }

    /// Resolves an `InvokeDynamic` entry into its name and descriptor.
    pub fn invoke_dynamic(&self, index: ConstantIndex) -> BytecodeResult<(&str, &str)> {
        match self.get(index)? {
            Constant::InvokeDynamic { name_and_type, .. } => self.name_and_type(*name_and_type),
            _ => Err(BytecodeError::UnexpectedConstant {
                index,
                expected: "InvokeDynamic",
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (i as ConstantIndex + 1, c)))
    }
}
