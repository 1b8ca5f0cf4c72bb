//! Dominators computation on instruction level control flow.
//!
//! Every instruction of a method is a node of the control flow, together
//! with two virtual nodes: the method entry and the method exit. A node `a`
//! dominates a node `b` when every path from the entry to `b` goes through
//! `a`.

use crate::controlflow::{instruction_handlers, instruction_successors};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::signature::MethodSignature;
use cw_bytecode::code::Code;
use cw_bytecode::instrs::LabeledInstr;
use cw_bytecode::Addr;
use fixedbitset::FixedBitSet;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Node {
    Entry,
    Instr(Addr),
    Exit,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Entry => write!(f, "<entry>"),
            Self::Instr(addr) => write!(f, "{addr}"),
            Self::Exit => write!(f, "<exit>"),
        }
    }
}

/// Dominators sets of the last analyzed method.
#[derive(Debug, Default)]
pub struct Dominators {
    ignore_exceptions: bool,
    method: Option<MethodSignature>,
    // dense index of each instruction, entry and exit come after them
    indices: BTreeMap<Addr, usize>,
    // reverse of `indices`
    addrs: Vec<Addr>,
    // `None` until the node is reached, standing for the universal set
    dominators: Vec<Option<FixedBitSet>>,
}

impl Dominators {
    #[must_use]
    pub fn new(ignore_exceptions: bool) -> Self {
        Self {
            ignore_exceptions,
            ..Self::default()
        }
    }

    /// Signature of the last analyzed method.
    #[inline]
    #[must_use]
    pub const fn method(&self) -> Option<&MethodSignature> {
        self.method.as_ref()
    }

    fn entry_index(&self) -> usize {
        self.addrs.len()
    }

    fn exit_index(&self) -> usize {
        self.addrs.len() + 1
    }

    fn index(&self, node: Node) -> AnalysisResult<usize> {
        match node {
            Node::Entry => Ok(self.entry_index()),
            Node::Exit => Ok(self.exit_index()),
            Node::Instr(addr) => self
                .indices
                .get(&addr)
                .copied()
                .ok_or_else(|| AnalysisError::InstructionNotFound(addr.to_string())),
        }
    }

    fn node(&self, index: usize) -> Node {
        match self.addrs.get(index) {
            Some(addr) => Node::Instr(*addr),
            None if index == self.entry_index() => Node::Entry,
            None => Node::Exit,
        }
    }

    /// Computes dominators of every node of the given code, replacing the
    /// results of the previous analysis.
    pub fn analyze(&mut self, signature: MethodSignature, code: &Code) -> AnalysisResult<()> {
        log::debug!("computing dominators of {signature}");
        self.method = None;
        self.addrs = code.iter_instructions().map(LabeledInstr::addr).collect();
        self.indices = self
            .addrs
            .iter()
            .enumerate()
            .map(|(i, addr)| (*addr, i))
            .collect();
        let size = self.addrs.len() + 2;
        self.dominators = vec![None; size];

        let entry = self.entry_index();
        let mut entry_set = FixedBitSet::with_capacity(size);
        entry_set.insert(entry);
        self.dominators[entry] = Some(entry_set);

        let mut worklist = Vec::new();
        if let Some(first) = code.iter_instructions().next() {
            let mut targets = vec![first.addr()];
            if !self.ignore_exceptions {
                targets.extend(
                    instruction_handlers(code, first.addr())
                        .into_iter()
                        .map(|(_, handler)| handler),
                );
            }
            for target in targets {
                let target_index = self.index(Node::Instr(target))?;
                if self.propagate(entry, target_index) {
                    worklist.push(target);
                }
            }
        }

        while let Some(addr) = worklist.pop() {
            let src = self.index(Node::Instr(addr))?;
            let linstr = code.instruction_at(addr)?;
            log::trace!("dominators: visiting {linstr}");

            let mut reaches_exit = false;
            let mut targets = BTreeSet::new();
            for (_, target) in instruction_successors(code, linstr)? {
                match target {
                    Some(target) => {
                        targets.insert(target);
                        if !self.ignore_exceptions {
                            targets.extend(
                                instruction_handlers(code, target)
                                    .into_iter()
                                    .map(|(_, handler)| handler),
                            );
                        }
                    }
                    None => reaches_exit = true,
                }
            }

            if reaches_exit {
                let exit = self.exit_index();
                self.propagate(src, exit);
            }
            for target in targets {
                let dst = self.index(Node::Instr(target))?;
                if self.propagate(src, dst) {
                    worklist.push(target);
                }
            }
        }

        self.method = Some(signature);
        Ok(())
    }

    // dom[dst] = (dom[dst] ∩ dom[src]) ∪ {dst}
    fn propagate(&mut self, src: usize, dst: usize) -> bool {
        let Some(src_set) = self.dominators[src].clone() else {
            return false;
        };
        let slot = &mut self.dominators[dst];
        if let Some(dst_set) = slot.as_mut() {
            let before = dst_set.count_ones(..);
            dst_set.intersect_with(&src_set);
            dst_set.insert(dst);
            return dst_set.count_ones(..) != before;
        }
        let mut dst_set = src_set;
        dst_set.insert(dst);
        *slot = Some(dst_set);
        true
    }

    fn reached_set(&self, node: Node) -> AnalysisResult<&FixedBitSet> {
        if self.method.is_none() {
            return Err(AnalysisError::NodeNotReached(format!(
                "{node} (no method analyzed)"
            )));
        }
        self.dominators[self.index(node)?]
            .as_ref()
            .ok_or_else(|| AnalysisError::NodeNotReached(node.to_string()))
    }

    #[must_use]
    pub fn is_reached(&self, node: Node) -> bool {
        self.reached_set(node).is_ok()
    }

    /// Checks whether `dominator` dominates `node`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NodeNotReached`] when `node` has not been
    /// reached by the last analysis.
    pub fn dominates(&self, dominator: Node, node: Node) -> AnalysisResult<bool> {
        let set = self.reached_set(node)?;
        Ok(set.contains(self.index(dominator)?))
    }

    /// Checks whether the instruction at `addr` is executed on every path
    /// leading to a normal method exit. Methods never returning have no
    /// such instruction.
    pub fn dominates_exit(&self, addr: Addr) -> AnalysisResult<bool> {
        if self.method.is_none() {
            return Err(AnalysisError::NodeNotReached(
                "<exit> (no method analyzed)".to_string(),
            ));
        }
        if !self.is_reached(Node::Exit) {
            return Ok(false);
        }
        self.dominates(Node::Instr(addr), Node::Exit)
    }

    /// All dominators of a node, itself included.
    pub fn dominators_of(&self, node: Node) -> AnalysisResult<Vec<Node>> {
        Ok(self
            .reached_set(node)?
            .ones()
            .map(|index| self.node(index))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_bytecode::flags::MethodFlags;
    use cw_bytecode::instrs::{Comp, Instr, Operand, ReturnKind};
    use cw_bytecode::{ClassBuilder, ClassFile, CodeBuilder};

    fn single_method<F>(body: F) -> ClassFile
    where
        F: FnOnce(&mut CodeBuilder) -> cw_bytecode::errors::BytecodeResult<()>,
    {
        ClassBuilder::new("t/A")
            .method_with_code(MethodFlags::ACC_STATIC, "f", "(I)V", body)
            .unwrap()
            .build()
    }

    fn analyze(class: &ClassFile, ignore_exceptions: bool) -> Dominators {
        let method = class.find_method("f", "(I)V").unwrap();
        let mut dominators = Dominators::new(ignore_exceptions);
        dominators
            .analyze(
                MethodSignature::of("t/A", "f", "(I)V"),
                method.code().unwrap(),
            )
            .unwrap();
        dominators
    }

    #[test]
    fn straight_line() {
        let class = single_method(|code| {
            code.op(0x00, 1); // nop
            code.invoke_static("t/A", "g", "()V")?;
            code.ret(ReturnKind::Void);
            Ok(())
        });
        let doms = analyze(&class, false);

        assert!(doms.dominates(Node::Instr(Addr(0)), Node::Exit).unwrap());
        assert!(doms.dominates_exit(Addr(1)).unwrap());
        assert!(doms.dominates_exit(Addr(4)).unwrap());
        assert!(doms.dominates(Node::Entry, Node::Instr(Addr(4))).unwrap());
        assert!(!doms.dominates(Node::Instr(Addr(4)), Node::Instr(Addr(0))).unwrap());
        assert_eq!(
            doms.dominators_of(Node::Exit).unwrap(),
            vec![
                Node::Instr(Addr(0)),
                Node::Instr(Addr(1)),
                Node::Instr(Addr(4)),
                Node::Entry,
                Node::Exit
            ]
        );
        assert_eq!(doms.method(), Some(&MethodSignature::of("t/A", "f", "(I)V")));
    }

    #[test]
    fn if_else() {
        let class = single_method(|code| {
            let (else_, end) = (code.new_label(), code.new_label());
            code.op(0x1a, 1); // iload_0
            code.branch(Comp::Eq, Operand::Zero, else_);
            code.invoke_static("t/A", "g", "()V")?;
            code.goto(end);
            code.place_label(else_)?;
            code.invoke_static("t/A", "h", "()V")?;
            code.place_label(end)?;
            code.ret(ReturnKind::Void);
            Ok(())
        });
        let doms = analyze(&class, false);

        // 0: iload_0, 1: ifeq, 4: invokestatic g, 7: goto, 10: invokestatic h, 13: return
        assert_eq!(
            doms.dominators_of(Node::Instr(Addr(10))).unwrap(),
            vec![
                Node::Instr(Addr(0)),
                Node::Instr(Addr(1)),
                Node::Instr(Addr(10)),
                Node::Entry
            ]
        );
        assert_eq!(
            doms.dominators_of(Node::Exit).unwrap(),
            vec![
                Node::Instr(Addr(0)),
                Node::Instr(Addr(1)),
                Node::Instr(Addr(13)),
                Node::Entry,
                Node::Exit
            ]
        );
        assert!(doms.dominates_exit(Addr(0)).unwrap());
        assert!(doms.dominates_exit(Addr(1)).unwrap());
        assert!(!doms.dominates_exit(Addr(4)).unwrap());
        assert!(!doms.dominates_exit(Addr(10)).unwrap());
        assert!(doms.dominates_exit(Addr(13)).unwrap());
        assert!(doms.dominates(Node::Instr(Addr(1)), Node::Instr(Addr(10))).unwrap());
        assert!(!doms.dominates(Node::Instr(Addr(4)), Node::Instr(Addr(13))).unwrap());
    }

    #[test]
    fn exit_never_reached() {
        let class = single_method(|code| {
            let start = code.new_label();
            code.place_label(start)?;
            code.invoke_static("t/A", "g", "()V")?;
            code.goto(start);
            Ok(())
        });
        let doms = analyze(&class, false);

        assert!(!doms.dominates_exit(Addr(0)).unwrap());
        assert!(matches!(
            doms.dominates(Node::Instr(Addr(0)), Node::Exit),
            Err(AnalysisError::NodeNotReached(_))
        ));
        assert!(doms.dominates(Node::Instr(Addr(0)), Node::Instr(Addr(3))).unwrap());
    }

    #[test]
    fn exception_edges() {
        let class = single_method(|code| {
            let (start, end, handler) = (code.new_label(), code.new_label(), code.new_label());
            code.place_label(start)?;
            code.invoke_static("t/A", "g", "()V")?;
            code.invoke_static("t/A", "h", "()V")?;
            code.place_label(end)?;
            code.ret(ReturnKind::Void);
            code.place_label(handler)?;
            code.ret(ReturnKind::Void);
            code.try_catch(start, end, handler, Some("java/lang/Exception"));
            Ok(())
        });

        // 0: invokestatic g, 3: invokestatic h, 6: return, 7: return (handler)
        let doms = analyze(&class, false);
        assert!(doms.is_reached(Node::Instr(Addr(7))));
        assert!(!doms.dominates_exit(Addr(3)).unwrap());
        assert!(doms.dominates(Node::Entry, Node::Instr(Addr(7))).unwrap());
        assert!(!doms.dominates(Node::Instr(Addr(0)), Node::Instr(Addr(7))).unwrap());

        let doms = analyze(&class, true);
        assert!(!doms.is_reached(Node::Instr(Addr(7))));
        assert!(doms.dominates_exit(Addr(3)).unwrap());
    }

    #[test]
    fn branch_before_the_code() {
        let class = single_method(|code| {
            code.invoke_static("t/A", "g", "()V")?;
            code.instr(Instr::Goto(-10));
            Ok(())
        });
        let mut doms = Dominators::new(false);
        let result = doms.analyze(
            MethodSignature::of("t/A", "f", "(I)V"),
            class.find_method("f", "(I)V").unwrap().code().unwrap(),
        );
        assert!(matches!(result, Err(AnalysisError::InstructionNotFound(_))));
        assert_eq!(doms.method(), None);
        assert!(doms.dominates_exit(Addr(0)).is_err());
    }

    #[test]
    fn queries_before_analysis() {
        let doms = Dominators::new(false);
        assert!(matches!(
            doms.dominates_exit(Addr(0)),
            Err(AnalysisError::NodeNotReached(_))
        ));
        assert!(matches!(
            doms.dominates(Node::Entry, Node::Exit),
            Err(AnalysisError::NodeNotReached(_))
        ));
    }

    #[test]
    fn analysis_replaces_previous_state() {
        let first = single_method(|code| {
            let skip = code.new_label();
            code.op(0x1a, 1);
            code.branch(Comp::Ne, Operand::Zero, skip);
            code.invoke_static("t/A", "g", "()V")?;
            code.place_label(skip)?;
            code.ret(ReturnKind::Void);
            Ok(())
        });
        let second = single_method(|code| {
            code.op(0x00, 1);
            code.op(0x00, 1);
            code.op(0x00, 1);
            code.op(0x00, 1);
            code.invoke_static("t/A", "g", "()V")?;
            code.ret(ReturnKind::Void);
            Ok(())
        });

        let mut doms = analyze(&first, false);
        assert!(!doms.dominates_exit(Addr(4)).unwrap());
        doms.analyze(
            MethodSignature::of("t/A", "other", "()V"),
            second.find_method("f", "(I)V").unwrap().code().unwrap(),
        )
        .unwrap();
        assert!(doms.dominates_exit(Addr(4)).unwrap());
        assert_eq!(doms.method(), Some(&MethodSignature::of("t/A", "other", "()V")));
    }
}
