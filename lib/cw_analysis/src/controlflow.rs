//! Instruction level control flow.

use crate::errors::{AnalysisError, AnalysisResult};
use cw_bytecode::code::Code;
use cw_bytecode::instrs::{Comp, Instr, LabeledInstr, Operand};
use cw_bytecode::Addr;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    IfTrue(Comp, Operand),
    IfFalse(Comp, Operand),
    Switch(i32),
    SwitchDefault,
    Jmp,
    Sequence,
    Return,
    Catch(String),
    CatchAll,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::IfTrue(_, _) => write!(f, "<true>"),
            Self::IfFalse(_, _) => write!(f, "<false>"),
            Self::Switch(key) => write!(f, "<switch {key}>"),
            Self::SwitchDefault => write!(f, "<switch _>"),
            Self::Jmp => write!(f, "<jmp>"),
            Self::Sequence => write!(f, "<seq>"),
            Self::Return => write!(f, "<ret>"),
            Self::Catch(typ) => write!(f, "<catch {typ}>"),
            Self::CatchAll => write!(f, "<catch *>"),
        }
    }
}

/// Normal successors of an instruction. A `None` target stands for the
/// method exit. Thrown exceptions are not considered here, see
/// [`instruction_handlers`].
pub fn instruction_successors(
    code: &Code,
    linstr: &LabeledInstr,
) -> AnalysisResult<Vec<(Branch, Option<Addr>)>> {
    let addr = linstr.addr();
    let successors = match linstr.instr() {
        Instr::Goto(offset) => vec![(Branch::Jmp, addr.offset(i32::from(*offset)))],
        Instr::GotoW(offset) => vec![(Branch::Jmp, addr.offset(*offset))],
        Instr::If(comp, operand, offset) => vec![
            (
                Branch::IfTrue(*comp, *operand),
                addr.offset(i32::from(*offset)),
            ),
            (Branch::IfFalse(*comp, *operand), Some(linstr.next_addr())),
        ],
        Instr::TableSwitch {
            default,
            low,
            offsets,
        } => std::iter::once((Branch::SwitchDefault, addr.offset(*default)))
            .chain(offsets.iter().zip(*low..).map(|(offset, key)| {
                (Branch::Switch(key), addr.offset(*offset))
            }))
            .collect(),
        Instr::LookupSwitch { default, pairs } => {
            std::iter::once((Branch::SwitchDefault, addr.offset(*default)))
                .chain(
                    pairs
                        .iter()
                        .map(|(key, offset)| (Branch::Switch(*key), addr.offset(*offset))),
                )
                .collect()
        }
        Instr::Return(_) => return Ok(vec![(Branch::Return, None)]),
        Instr::AThrow => Vec::new(),
        _ => vec![(Branch::Sequence, Some(linstr.next_addr()))],
    };

    // a `None` target here is a branch before the start of the code
    successors
        .into_iter()
        .map(|(branch, target)| {
            let target = target
                .filter(|target| code.instruction_at(*target).is_ok())
                .ok_or_else(|| {
                    AnalysisError::InstructionNotFound(format!(
                        "branch target of instruction at {addr}"
                    ))
                })?;
            Ok((branch, Some(target)))
        })
        .collect()
}

/// Exception handlers that may be reached from the instruction at `addr`.
pub fn instruction_handlers(code: &Code, addr: Addr) -> Vec<(Branch, Addr)> {
    code.handlers_covering(addr)
        .map(|handler| {
            let branch = match handler.catch_type() {
                Some(typ) => Branch::Catch(typ.to_string()),
                None => Branch::CatchAll,
            };
            (branch, handler.handler_addr())
        })
        .collect()
}

#[inline]
#[must_use]
pub fn instruction_does_return(linstr: &LabeledInstr) -> bool {
    linstr.instr().is_return()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_bytecode::flags::MethodFlags;
    use cw_bytecode::instrs::ReturnKind;
    use cw_bytecode::{ClassBuilder, ClassFile};

    fn switch_class() -> ClassFile {
        ClassBuilder::new("t/A")
            .method_with_code(MethodFlags::ACC_STATIC, "f", "(I)I", |code| {
                let (l0, l1, end, handler) = (
                    code.new_label(),
                    code.new_label(),
                    code.new_label(),
                    code.new_label(),
                );
                code.op(0x1a, 1); // iload_0
                code.table_switch(0, vec![l0, l1, l0], end);
                code.place_label(l0)?;
                code.invoke_static("t/A", "g", "()V")?;
                code.goto(end);
                code.place_label(l1)?;
                code.op(0x1a, 1);
                code.branch(Comp::Lt, Operand::Zero, end);
                code.athrow();
                code.place_label(end)?;
                code.op(0x03, 1); // iconst_0
                code.ret(ReturnKind::Int);
                code.place_label(handler)?;
                code.athrow();
                code.try_catch(l0, l1, handler, None);
                Ok(())
            })
            .unwrap()
            .build()
    }

    #[test]
    fn successors() {
        let class = switch_class();
        let code = class.find_method("f", "(I)I").unwrap().code().unwrap();
        let instrs: Vec<&LabeledInstr> = code.iter_instructions().collect();
        // 0: iload_0, 1: tableswitch (2 bytes padding, 24 bytes), 28: invokestatic,
        // 31: goto, 34: iload_0, 35: iflt, 38: athrow, 39: iconst_0, 40: ireturn,
        // 41: athrow
        assert_eq!(instrs[2].addr(), Addr(28));

        assert_eq!(
            instruction_successors(code, instrs[0]).unwrap(),
            vec![(Branch::Sequence, Some(Addr(1)))]
        );
        assert_eq!(
            instruction_successors(code, instrs[1]).unwrap(),
            vec![
                (Branch::SwitchDefault, Some(Addr(39))),
                (Branch::Switch(0), Some(Addr(28))),
                (Branch::Switch(1), Some(Addr(34))),
                (Branch::Switch(2), Some(Addr(28))),
            ]
        );
        assert_eq!(
            instruction_successors(code, instrs[3]).unwrap(),
            vec![(Branch::Jmp, Some(Addr(39)))]
        );
        assert_eq!(
            instruction_successors(code, instrs[5]).unwrap(),
            vec![
                (Branch::IfTrue(Comp::Lt, Operand::Zero), Some(Addr(39))),
                (Branch::IfFalse(Comp::Lt, Operand::Zero), Some(Addr(38))),
            ]
        );
        assert!(instruction_successors(code, instrs[6]).unwrap().is_empty());
        assert_eq!(
            instruction_successors(code, instrs[8]).unwrap(),
            vec![(Branch::Return, None)]
        );
        assert!(instruction_does_return(instrs[8]));

        assert_eq!(
            instruction_handlers(code, Addr(31)),
            vec![(Branch::CatchAll, Addr(41))]
        );
        assert!(instruction_handlers(code, Addr(34)).is_empty());
    }

    #[test]
    fn falling_off_the_code_is_an_error() {
        let class = ClassBuilder::new("t/B")
            .method_with_code(MethodFlags::ACC_STATIC, "f", "()V", |code| {
                code.op(0x00, 1); // nop
                Ok(())
            })
            .unwrap()
            .build();
        let code = class.find_method("f", "()V").unwrap().code().unwrap();
        let linstr = code.iter_instructions().next().unwrap();
        assert!(matches!(
            instruction_successors(code, linstr),
            Err(AnalysisError::InstructionNotFound(_))
        ));
    }

    #[test]
    fn branching_before_the_code_is_an_error() {
        let class = ClassBuilder::new("t/C")
            .method_with_code(MethodFlags::ACC_STATIC, "f", "()V", |code| {
                code.instr(Instr::Goto(-10));
                code.ret(ReturnKind::Void);
                Ok(())
            })
            .unwrap()
            .build();
        let code = class.find_method("f", "()V").unwrap().code().unwrap();
        let linstr = code.iter_instructions().next().unwrap();
        assert_eq!(linstr.addr(), Addr(0));
        assert!(matches!(
            instruction_successors(code, linstr),
            Err(AnalysisError::InstructionNotFound(_))
        ));
    }
}
