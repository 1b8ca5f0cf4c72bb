//! JVM bytecode instructions definitions.

use crate::constants::ConstantIndex;
use crate::Addr;
use std::fmt;

pub trait Instruction {
    fn mnemonic(&self) -> &str;
    fn size(&self) -> usize;
    fn can_throw(&self) -> bool;
}

/// Comparison performed by a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comp {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

/// Second operand of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// `if<cond>`: compares the top int against zero.
    Zero,
    /// `if_icmp<cond>`: compares two ints.
    Int,
    /// `if_acmp<cond>`: compares two references.
    Reference,
    /// `ifnull` / `ifnonnull`.
    Null,
}

/// Kind of value a return instruction hands back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Void,
    Int,
    Long,
    Float,
    Double,
    Reference,
}

/// Invocation instructions kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvokeKind {
    Static,
    Special,
    Virtual,
    Interface,
    Dynamic,
}

impl fmt::Display for InvokeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Special => write!(f, "special"),
            Self::Virtual => write!(f, "virtual"),
            Self::Interface => write!(f, "interface"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// A decoded instruction. Branch offsets are relative to the instruction address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    InvokeVirtual(ConstantIndex),
    InvokeSpecial(ConstantIndex),
    InvokeStatic(ConstantIndex),
    InvokeInterface(ConstantIndex, u8),
    InvokeDynamic(ConstantIndex),
    If(Comp, Operand, i16),
    Goto(i16),
    GotoW(i32),
    TableSwitch {
        default: i32,
        low: i32,
        offsets: Vec<i32>,
    },
    LookupSwitch {
        default: i32,
        pairs: Vec<(i32, i32)>,
    },
    Return(ReturnKind),
    AThrow,
    /// Any other instruction, only known by its opcode and encoded length.
    Other { opcode: u8, length: u8 },
}

// opcodes of instructions that may raise an exception, out of invocations,
// branches and returns
const THROWING_OPCODES: &[u8] = &[
    0x12, 0x13, // ldc, ldc_w
    0x2e, 0x2f, 0x30, 0x31, 0x32, 0x33, 0x34, 0x35, // array loads
    0x4f, 0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56, // array stores
    0x6c, 0x6d, 0x70, 0x71, // idiv, ldiv, irem, lrem
    0xb2, 0xb3, 0xb4, 0xb5, // field accesses
    0xbb, 0xbc, 0xbd, 0xbe, // new, newarray, anewarray, arraylength
    0xc0, 0xc2, 0xc3, 0xc5, // checkcast, monitorenter, monitorexit, multianewarray
];

impl Instr {
    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Self::InvokeVirtual(_) => 0xb6,
            Self::InvokeSpecial(_) => 0xb7,
            Self::InvokeStatic(_) => 0xb8,
            Self::InvokeInterface(_, _) => 0xb9,
            Self::InvokeDynamic(_) => 0xba,
            Self::If(comp, operand, _) => {
                let rank = match comp {
                    Comp::Eq => 0,
                    Comp::Ne => 1,
                    Comp::Lt => 2,
                    Comp::Ge => 3,
                    Comp::Gt => 4,
                    Comp::Le => 5,
                };
                match operand {
                    Operand::Zero => 0x99 + rank,
                    Operand::Int => 0x9f + rank,
                    Operand::Reference => 0xa5 + rank,
                    Operand::Null => 0xc6 + rank,
                }
            }
            Self::Goto(_) => 0xa7,
            Self::GotoW(_) => 0xc8,
            Self::TableSwitch { .. } => 0xaa,
            Self::LookupSwitch { .. } => 0xab,
            Self::Return(kind) => match kind {
                ReturnKind::Int => 0xac,
                ReturnKind::Long => 0xad,
                ReturnKind::Float => 0xae,
                ReturnKind::Double => 0xaf,
                ReturnKind::Reference => 0xb0,
                ReturnKind::Void => 0xb1,
            },
            Self::AThrow => 0xbf,
            Self::Other { opcode, .. } => *opcode,
        }
    }

    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::InvokeVirtual(_) => "invokevirtual",
            Self::InvokeSpecial(_) => "invokespecial",
            Self::InvokeStatic(_) => "invokestatic",
            Self::InvokeInterface(_, _) => "invokeinterface",
            Self::InvokeDynamic(_) => "invokedynamic",
            Self::If(comp, operand, _) => match (operand, comp) {
                (Operand::Zero, Comp::Eq) => "ifeq",
                (Operand::Zero, Comp::Ne) => "ifne",
                (Operand::Zero, Comp::Lt) => "iflt",
                (Operand::Zero, Comp::Ge) => "ifge",
                (Operand::Zero, Comp::Gt) => "ifgt",
                (Operand::Zero, Comp::Le) => "ifle",
                (Operand::Int, Comp::Eq) => "if_icmpeq",
                (Operand::Int, Comp::Ne) => "if_icmpne",
                (Operand::Int, Comp::Lt) => "if_icmplt",
                (Operand::Int, Comp::Ge) => "if_icmpge",
                (Operand::Int, Comp::Gt) => "if_icmpgt",
                (Operand::Int, Comp::Le) => "if_icmple",
                (Operand::Reference, Comp::Eq) => "if_acmpeq",
                (Operand::Reference, _) => "if_acmpne",
                (Operand::Null, Comp::Eq) => "ifnull",
                (Operand::Null, _) => "ifnonnull",
            },
            Self::Goto(_) => "goto",
            Self::GotoW(_) => "goto_w",
            Self::TableSwitch { .. } => "tableswitch",
            Self::LookupSwitch { .. } => "lookupswitch",
            Self::Return(kind) => match kind {
                ReturnKind::Int => "ireturn",
                ReturnKind::Long => "lreturn",
                ReturnKind::Float => "freturn",
                ReturnKind::Double => "dreturn",
                ReturnKind::Reference => "areturn",
                ReturnKind::Void => "return",
            },
            Self::AThrow => "athrow",
            Self::Other { .. } => "<other>",
        }
    }

    /// Encoded size of the instruction when placed at `addr` (switches are
    /// padded to a 4-bytes boundary).
    #[must_use]
    pub fn size_at(&self, addr: Addr) -> usize {
        let padding = 3 - (addr.0 % 4);
        match self {
            Self::InvokeVirtual(_)
            | Self::InvokeSpecial(_)
            | Self::InvokeStatic(_)
            | Self::If(_, _, _)
            | Self::Goto(_) => 3,
            Self::InvokeInterface(_, _) | Self::InvokeDynamic(_) | Self::GotoW(_) => 5,
            Self::TableSwitch { offsets, .. } => 1 + padding + 12 + 4 * offsets.len(),
            Self::LookupSwitch { pairs, .. } => 1 + padding + 8 + 8 * pairs.len(),
            Self::Return(_) | Self::AThrow => 1,
            Self::Other { length, .. } => usize::from(*length),
        }
    }

    #[must_use]
    pub fn can_throw(&self) -> bool {
        match self {
            Self::InvokeVirtual(_)
            | Self::InvokeSpecial(_)
            | Self::InvokeStatic(_)
            | Self::InvokeInterface(_, _)
            | Self::InvokeDynamic(_)
            | Self::AThrow => true,
            // returns may throw IllegalMonitorStateException
            Self::Return(_) => true,
            Self::Other { opcode, .. } => THROWING_OPCODES.contains(opcode),
            _ => false,
        }
    }

    /// Returns the invocation kind and constant pool reference of invocation instructions.
    #[must_use]
    pub const fn invocation(&self) -> Option<(InvokeKind, ConstantIndex)> {
        match self {
            Self::InvokeVirtual(idx) => Some((InvokeKind::Virtual, *idx)),
            Self::InvokeSpecial(idx) => Some((InvokeKind::Special, *idx)),
            Self::InvokeStatic(idx) => Some((InvokeKind::Static, *idx)),
            Self::InvokeInterface(idx, _) => Some((InvokeKind::Interface, *idx)),
            Self::InvokeDynamic(idx) => Some((InvokeKind::Dynamic, *idx)),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_invocation(&self) -> bool {
        self.invocation().is_some()
    }

    #[inline]
    #[must_use]
    pub const fn is_return(&self) -> bool {
        matches!(self, Self::Return(_))
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvokeVirtual(idx)
            | Self::InvokeSpecial(idx)
            | Self::InvokeStatic(idx)
            | Self::InvokeDynamic(idx) => write!(f, "{} #{idx}", self.mnemonic()),
            Self::InvokeInterface(idx, count) => write!(f, "{} #{idx}, {count}", self.mnemonic()),
            Self::If(_, _, off) => write!(f, "{} {off:+}", self.mnemonic()),
            Self::Goto(off) => write!(f, "{} {off:+}", self.mnemonic()),
            Self::GotoW(off) => write!(f, "{} {off:+}", self.mnemonic()),
            Self::TableSwitch {
                default,
                low,
                offsets,
            } => {
                write!(f, "{} {{ ", self.mnemonic())?;
                for (i, off) in offsets.iter().enumerate() {
                    write!(f, "{}: {off:+}, ", *low + i as i32)?;
                }
                write!(f, "default: {default:+} }}")
            }
            Self::LookupSwitch { default, pairs } => {
                write!(f, "{} {{ ", self.mnemonic())?;
                for (key, off) in pairs {
                    write!(f, "{key}: {off:+}, ")?;
                }
                write!(f, "default: {default:+} }}")
            }
            Self::Return(_) | Self::AThrow => write!(f, "{}", self.mnemonic()),
            Self::Other { opcode, length } => write!(f, "op_{opcode:#04x} ({length} bytes)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledInstr {
    pub(crate) addr: Addr,
    pub(crate) instr: Instr,
}

impl Instruction for LabeledInstr {
    #[inline]
    fn mnemonic(&self) -> &str {
        self.instr.mnemonic()
    }

    #[inline]
    fn size(&self) -> usize {
        self.instr.size_at(self.addr)
    }

    #[inline]
    fn can_throw(&self) -> bool {
        self.instr.can_throw()
    }
}

impl fmt::Display for LabeledInstr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:5}: {}", self.addr, self.instr)
    }
}

impl LabeledInstr {
    #[must_use]
    pub const fn new(addr: Addr, instr: Instr) -> Self {
        Self { addr, instr }
    }

    #[inline]
    #[must_use]
    pub const fn addr(&self) -> Addr {
        self.addr
    }

    #[inline]
    #[must_use]
    pub const fn instr(&self) -> &Instr {
        &self.instr
    }

    #[inline]
    #[must_use]
    pub fn next_addr(&self) -> Addr {
        Addr(self.addr.0 + self.size())
    }
}
