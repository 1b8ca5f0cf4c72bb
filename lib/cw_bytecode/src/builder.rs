//! Programmatic construction of classes and method bodies.
//!
//! Classes are usually decoded by a class file reader upstream; these
//! builders let callers assemble the same structures directly, taking care of
//! constant pool interning and of instruction addresses.

use crate::classes::{ClassFile, MethodInfo, JAVA_LANG_OBJECT};
use crate::code::{Code, ExceptionHandler, LineNumber};
use crate::constants::{ConstantIndex, ConstantPool};
use crate::errors::{BytecodeError, BytecodeResult};
use crate::flags::{ClassFlags, MethodFlags};
use crate::instrs::{Comp, Instr, LabeledInstr, Operand, ReturnKind};
use crate::types::MethodDescriptor;
use crate::Addr;
use std::collections::BTreeMap;

pub struct ClassBuilder {
    access_flags: ClassFlags,
    name: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    constants: ConstantPool,
    methods: Vec<MethodInfo>,
}

impl ClassBuilder {
    /// Starts a public class extending `java/lang/Object`, with the
    /// `ACC_SUPER` flag set as modern compilers do.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            access_flags: ClassFlags::ACC_PUBLIC | ClassFlags::ACC_SUPER,
            name: name.to_string(),
            superclass: Some(JAVA_LANG_OBJECT.to_string()),
            interfaces: Vec::new(),
            constants: ConstantPool::new(),
            methods: Vec::new(),
        }
    }

    /// Starts a public interface.
    #[must_use]
    pub fn interface(name: &str) -> Self {
        Self::new(name).flags(
            ClassFlags::ACC_PUBLIC | ClassFlags::ACC_INTERFACE | ClassFlags::ACC_ABSTRACT,
        )
    }

    #[must_use]
    pub fn flags(mut self, access_flags: ClassFlags) -> Self {
        self.access_flags = access_flags;
        self
    }

    #[must_use]
    pub fn extends(mut self, superclass: Option<&str>) -> Self {
        self.superclass = superclass.map(str::to_string);
        self
    }

    #[must_use]
    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Declares a method without code (abstract or native methods, or
    /// library stubs).
    #[must_use]
    pub fn method(mut self, access_flags: MethodFlags, name: &str, descriptor: &str) -> Self {
        self.methods.push(MethodInfo {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: None,
        });
        self
    }

    /// Declares a method whose body is produced by `body`.
    pub fn method_with_code<F>(
        mut self,
        access_flags: MethodFlags,
        name: &str,
        descriptor: &str,
        body: F,
    ) -> BytecodeResult<Self>
    where
        F: FnOnce(&mut CodeBuilder) -> BytecodeResult<()>,
    {
        MethodDescriptor::try_from(descriptor)?;
        let mut builder = CodeBuilder::new(&mut self.constants);
        body(&mut builder)?;
        let code = builder.build()?;
        self.methods.push(MethodInfo {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: Some(code),
        });
        Ok(self)
    }

    /// Gives access to the constant pool, e.g. to forge invalid references.
    pub fn constants_mut(&mut self) -> &mut ConstantPool {
        &mut self.constants
    }

    #[must_use]
    pub fn build(self) -> ClassFile {
        ClassFile {
            access_flags: self.access_flags,
            name: self.name,
            superclass: self.superclass,
            interfaces: self.interfaces,
            constants: self.constants,
            methods: self.methods,
        }
    }
}

/// A position in the code, bound to an address once placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Label(usize);

#[derive(Debug)]
enum Pending {
    Ready(Instr),
    If(Comp, Operand, Label),
    Goto(Label),
    TableSwitch {
        low: i32,
        targets: Vec<Label>,
        default: Label,
    },
    LookupSwitch {
        pairs: Vec<(i32, Label)>,
        default: Label,
    },
}

pub struct CodeBuilder<'p> {
    constants: &'p mut ConstantPool,
    pending: Vec<(Addr, Pending)>,
    next_addr: Addr,
    labels: BTreeMap<Label, Option<Addr>>,
    handlers: Vec<(Label, Label, Label, Option<String>)>,
    line_numbers: Vec<LineNumber>,
    max_stack: u16,
    max_locals: u16,
}

impl<'p> CodeBuilder<'p> {
    pub(crate) fn new(constants: &'p mut ConstantPool) -> Self {
        Self {
            constants,
            pending: Vec::new(),
            next_addr: Addr::entry(),
            labels: BTreeMap::new(),
            handlers: Vec::new(),
            line_numbers: Vec::new(),
            max_stack: 0,
            max_locals: 0,
        }
    }

    /// Address of the next emitted instruction.
    #[inline]
    #[must_use]
    pub const fn current_addr(&self) -> Addr {
        self.next_addr
    }

    pub fn set_max_stack(&mut self, max_stack: u16) {
        self.max_stack = max_stack;
    }

    pub fn set_max_locals(&mut self, max_locals: u16) {
        self.max_locals = max_locals;
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len());
        self.labels.insert(label, None);
        label
    }

    pub fn place_label(&mut self, label: Label) -> BytecodeResult<()> {
        let addr = self.next_addr;
        match self.labels.get_mut(&label) {
            Some(slot) if slot.is_none() => {
                *slot = Some(addr);
                Ok(())
            }
            _ => Err(BytecodeError::UndefinedLabel(format!("{label:?}"))),
        }
    }

    /// Records that the next instruction starts source line `line`.
    pub fn line(&mut self, line: u16) {
        self.line_numbers.push(LineNumber::new(self.next_addr, line));
    }

    pub fn try_catch(&mut self, start: Label, end: Label, handler: Label, catch_type: Option<&str>) {
        self.handlers
            .push((start, end, handler, catch_type.map(str::to_string)));
    }

    fn emit(&mut self, pending: Pending, size: usize) -> Addr {
        let addr = self.next_addr;
        self.pending.push((addr, pending));
        self.next_addr = Addr(addr.0 + size);
        addr
    }

    /// Emits an already resolved instruction.
    pub fn instr(&mut self, instr: Instr) -> Addr {
        let size = instr.size_at(self.next_addr);
        self.emit(Pending::Ready(instr), size)
    }

    /// Emits an instruction the model only knows by opcode and length.
    pub fn op(&mut self, opcode: u8, length: u8) -> Addr {
        self.instr(Instr::Other { opcode, length })
    }

    fn method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> BytecodeResult<ConstantIndex> {
        self.constants
            .push_method_ref(class, name, descriptor, is_interface)
    }

    pub fn invoke_static(&mut self, class: &str, name: &str, descriptor: &str) -> BytecodeResult<Addr> {
        let idx = self.method_ref(class, name, descriptor, false)?;
        Ok(self.instr(Instr::InvokeStatic(idx)))
    }

    pub fn invoke_special(&mut self, class: &str, name: &str, descriptor: &str) -> BytecodeResult<Addr> {
        let idx = self.method_ref(class, name, descriptor, false)?;
        Ok(self.instr(Instr::InvokeSpecial(idx)))
    }

    pub fn invoke_virtual(&mut self, class: &str, name: &str, descriptor: &str) -> BytecodeResult<Addr> {
        let idx = self.method_ref(class, name, descriptor, false)?;
        Ok(self.instr(Instr::InvokeVirtual(idx)))
    }

    pub fn invoke_interface(&mut self, class: &str, name: &str, descriptor: &str) -> BytecodeResult<Addr> {
        let slots = MethodDescriptor::try_from(descriptor)?.parameters_slots() + 1;
        let count = u8::try_from(slots)
            .map_err(|_| BytecodeError::InvalidDescriptor(descriptor.to_string()))?;
        let idx = self.method_ref(class, name, descriptor, true)?;
        Ok(self.instr(Instr::InvokeInterface(idx, count)))
    }

    pub fn invoke_dynamic(&mut self, bootstrap_method: u16, name: &str, descriptor: &str) -> BytecodeResult<Addr> {
        let idx = self
            .constants
            .push_invoke_dynamic(bootstrap_method, name, descriptor)?;
        Ok(self.instr(Instr::InvokeDynamic(idx)))
    }

    pub fn branch(&mut self, comp: Comp, operand: Operand, target: Label) -> Addr {
        self.emit(Pending::If(comp, operand, target), 3)
    }

    pub fn goto(&mut self, target: Label) -> Addr {
        self.emit(Pending::Goto(target), 3)
    }

    pub fn table_switch(&mut self, low: i32, targets: Vec<Label>, default: Label) -> Addr {
        let size = Instr::TableSwitch {
            default: 0,
            low,
            offsets: vec![0; targets.len()],
        }
        .size_at(self.next_addr);
        self.emit(
            Pending::TableSwitch {
                low,
                targets,
                default,
            },
            size,
        )
    }

    pub fn lookup_switch(&mut self, pairs: Vec<(i32, Label)>, default: Label) -> Addr {
        let size = Instr::LookupSwitch {
            default: 0,
            pairs: vec![(0, 0); pairs.len()],
        }
        .size_at(self.next_addr);
        self.emit(Pending::LookupSwitch { pairs, default }, size)
    }

    pub fn ret(&mut self, kind: ReturnKind) -> Addr {
        self.instr(Instr::Return(kind))
    }

    pub fn athrow(&mut self) -> Addr {
        self.instr(Instr::AThrow)
    }

    fn resolve(&self, label: Label) -> BytecodeResult<Addr> {
        self.labels
            .get(&label)
            .copied()
            .flatten()
            .ok_or_else(|| BytecodeError::UndefinedLabel(format!("{label:?}")))
    }

    fn short_offset(&self, from: Addr, label: Label) -> BytecodeResult<i16> {
        let distance = from.distance_to(self.resolve(label)?);
        i16::try_from(distance).map_err(|_| BytecodeError::BranchOutOfRange(from))
    }

    pub(crate) fn build(self) -> BytecodeResult<Code> {
        let mut insns = Vec::with_capacity(self.pending.len());
        for (addr, pending) in &self.pending {
            let instr = match pending {
                Pending::Ready(instr) => instr.clone(),
                Pending::If(comp, operand, label) => {
                    Instr::If(*comp, *operand, self.short_offset(*addr, *label)?)
                }
                Pending::Goto(label) => Instr::Goto(self.short_offset(*addr, *label)?),
                Pending::TableSwitch {
                    low,
                    targets,
                    default,
                } => Instr::TableSwitch {
                    default: addr.distance_to(self.resolve(*default)?),
                    low: *low,
                    offsets: targets
                        .iter()
                        .map(|l| Ok(addr.distance_to(self.resolve(*l)?)))
                        .collect::<BytecodeResult<_>>()?,
                },
                Pending::LookupSwitch { pairs, default } => Instr::LookupSwitch {
                    default: addr.distance_to(self.resolve(*default)?),
                    pairs: pairs
                        .iter()
                        .map(|(key, l)| Ok((*key, addr.distance_to(self.resolve(*l)?))))
                        .collect::<BytecodeResult<_>>()?,
                },
            };
            insns.push(LabeledInstr::new(*addr, instr));
        }

        let handlers = self
            .handlers
            .iter()
            .map(|(start, end, handler, catch_type)| {
                Ok(ExceptionHandler::new(
                    self.resolve(*start)?,
                    self.resolve(*end)?,
                    self.resolve(*handler)?,
                    catch_type.clone(),
                ))
            })
            .collect::<BytecodeResult<_>>()?;

        log::trace!("built code with {} instructions", insns.len());
        Ok(Code {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            insns,
            handlers,
            line_numbers: self.line_numbers,
        })
    }
}
