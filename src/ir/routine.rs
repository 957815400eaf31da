//! The routine: an arena of instructions organized into basic blocks.
//!
//! A routine is the control-flow graph of one decompiled method body. The
//! arena owns every instruction and addresses it through a stable [`InsnId`]
//! handle; blocks hold ordered handle sequences. "Remove instruction" is
//! unlinking the handle from its block and from its operands' use lists,
//! never a deallocation, so no dangling reference can survive a removal.
//!
//! # Mutation contract
//!
//! The rewrite pass depends on the primitives here being atomic and free of
//! side effects beyond the stated mutation:
//!
//! - [`Routine::replace_arg`] keeps the instruction well-typed and the use
//!   lists exact, or refuses and changes nothing.
//! - [`Routine::remove_all_and_unbind`] unbinds each instruction from its
//!   block, from its operands' use lists, and retires its result variable.
//! - [`Routine::attach_comment`] and [`Routine::inherit_metadata`] only
//!   touch non-executable metadata.

use std::fmt;

use crate::ir::{
    ArgType, Insn, InsnAttrs, InsnId, Operand, SsaVar, UseSite, VarId,
};
use crate::{Error, Result};

/// One arena slot: the instruction plus whether it is still linked into a
/// block.
#[derive(Debug, Clone)]
struct Slot {
    insn: Insn,
    block: usize,
    bound: bool,
}

/// A basic block: an ordered sequence of instruction handles.
#[derive(Debug, Clone, Default)]
struct Block {
    insns: Vec<InsnId>,
}

/// A decompiled method body in SSA form.
///
/// Built by the host decompiler (or a test fixture) through [`Routine::add_block`],
/// [`Routine::new_var`] and [`Routine::push`]; mutated in place by the
/// rewrite pass through the primitives below.
#[derive(Debug, Clone)]
pub struct Routine {
    name: String,
    arena: Vec<Slot>,
    blocks: Vec<Block>,
    vars: Vec<SsaVar>,
}

impl Routine {
    /// Creates an empty routine.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arena: Vec::new(),
            blocks: Vec::new(),
            vars: Vec::new(),
        }
    }

    /// Returns the routine name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends an empty basic block and returns its index.
    pub fn add_block(&mut self) -> usize {
        self.blocks.push(Block::default());
        self.blocks.len() - 1
    }

    /// Returns the number of basic blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the ordered instruction handles of a block.
    #[must_use]
    pub fn block_insns(&self, block: usize) -> &[InsnId] {
        &self.blocks[block].insns
    }

    /// Creates a fresh SSA variable with the given declared and initial
    /// types. The definition binds when a producing instruction is pushed.
    pub fn new_var(&mut self, declared: ArgType, initial: ArgType) -> VarId {
        let id = VarId::new(self.vars.len());
        self.vars.push(SsaVar::new(id, declared, initial));
        id
    }

    /// Returns a variable by identifier.
    #[must_use]
    pub fn var(&self, id: VarId) -> &SsaVar {
        &self.vars[id.index()]
    }

    /// Returns a mutable variable by identifier.
    pub fn var_mut(&mut self, id: VarId) -> &mut SsaVar {
        &mut self.vars[id.index()]
    }

    /// Returns the number of variables ever created in this routine.
    #[must_use]
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Appends an instruction to a block, wiring its result definition and
    /// the use lists of its variable operands.
    pub fn push(&mut self, block: usize, insn: Insn) -> InsnId {
        let id = InsnId::new(self.arena.len());
        if let Some(result) = insn.result() {
            self.vars[result.index()].set_def(id);
        }
        for (slot, operand) in insn.operands().iter().enumerate() {
            if let Some(var) = operand.as_var() {
                self.vars[var.index()].add_use(UseSite::new(id, slot));
            }
        }
        self.arena.push(Slot {
            insn,
            block,
            bound: true,
        });
        self.blocks[block].insns.push(id);
        id
    }

    /// Returns an instruction if its handle is still bound.
    #[must_use]
    pub fn insn(&self, id: InsnId) -> Option<&Insn> {
        let slot = self.arena.get(id.index())?;
        slot.bound.then_some(&slot.insn)
    }

    /// Returns `true` if the handle is still linked into a block.
    #[must_use]
    pub fn is_bound(&self, id: InsnId) -> bool {
        self.arena.get(id.index()).is_some_and(|s| s.bound)
    }

    /// Returns the block an instruction belongs to, if bound.
    #[must_use]
    pub fn block_of(&self, id: InsnId) -> Option<usize> {
        let slot = self.arena.get(id.index())?;
        slot.bound.then_some(slot.block)
    }

    fn bound_slot_mut(&mut self, id: InsnId) -> Result<&mut Slot> {
        match self.arena.get_mut(id.index()) {
            Some(slot) if slot.bound => Ok(slot),
            _ => Err(Error::DeadHandle(id)),
        }
    }

    /// Replaces the variable operand of `insn` at `slot` with `new`.
    ///
    /// The slot must currently read `var`; the replacement's rendered type
    /// must be assignable to the variable's declared type. On success the
    /// old use is dropped from `var`'s use list and, if `new` reads a
    /// variable, a use is registered for it.
    ///
    /// # Errors
    ///
    /// [`Error::DeadHandle`] for an unbound instruction,
    /// [`Error::OperandNotFound`] when the slot does not read `var`, and
    /// [`Error::TypeConflict`] when the replacement is not assignable. The
    /// instruction is unchanged on any error.
    pub fn replace_arg(&mut self, insn: InsnId, slot: usize, var: VarId, new: Operand) -> Result<()> {
        {
            let current = self
                .insn(insn)
                .ok_or(Error::DeadHandle(insn))?
                .operand(slot);
            match current {
                Some(op) if op.as_var() == Some(var) => {}
                _ => return Err(Error::OperandNotFound { insn, var, slot }),
            }
            let expected = self.vars[var.index()].declared_type();
            let found = new.ty(|v| self.vars[v.index()].declared_type());
            if !expected.accepts(found) {
                return Err(Error::TypeConflict {
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }
        if let Some(new_var) = new.as_var() {
            self.vars[new_var.index()].add_use(UseSite::new(insn, slot));
        }
        self.vars[var.index()].remove_use(insn, slot);
        let slot_ref = self.bound_slot_mut(insn)?;
        slot_ref.insn.set_operand(slot, new);
        Ok(())
    }

    /// Unlinks all listed instructions from a block in one batch.
    ///
    /// For each still-bound instruction: it is removed from the block's
    /// handle sequence, every variable operand drops its matching use
    /// entry, and the result variable (if any) is retired. Handles not
    /// belonging to `block`, or already unbound, are skipped.
    pub fn remove_all_and_unbind(&mut self, block: usize, ids: &[InsnId]) {
        for &id in ids {
            let Some(slot) = self.arena.get_mut(id.index()) else {
                continue;
            };
            if !slot.bound || slot.block != block {
                continue;
            }
            slot.bound = false;
            let result = slot.insn.result();
            let operand_vars: Vec<(usize, VarId)> = slot
                .insn
                .operands()
                .iter()
                .enumerate()
                .filter_map(|(i, op)| op.as_var().map(|v| (i, v)))
                .collect();
            self.blocks[block].insns.retain(|&i| i != id);
            for (operand_slot, var) in operand_vars {
                self.vars[var.index()].remove_use(id, operand_slot);
            }
            if let Some(result) = result {
                self.vars[result.index()].retire_def();
            }
        }
    }

    /// Attaches a non-executable comment to an instruction.
    ///
    /// # Errors
    ///
    /// [`Error::DeadHandle`] if the instruction is no longer bound.
    pub fn attach_comment(&mut self, insn: InsnId, text: impl Into<String>) -> Result<()> {
        self.bound_slot_mut(insn)?.insn.add_comment(text);
        Ok(())
    }

    /// Carries source-position and comment metadata from `src` to `dst`.
    ///
    /// The destination keeps its own source line when it already has one.
    ///
    /// # Errors
    ///
    /// [`Error::DeadHandle`] if either instruction is no longer in the
    /// arena (an unbound but still queued source is allowed; its metadata
    /// is what is being preserved).
    pub fn inherit_metadata(&mut self, dst: InsnId, src: InsnId) -> Result<()> {
        let (line, comments) = {
            let slot = self.arena.get(src.index()).ok_or(Error::DeadHandle(src))?;
            (slot.insn.source_line(), slot.insn.comments().to_vec())
        };
        let dst_slot = self.bound_slot_mut(dst)?;
        if dst_slot.insn.source_line().is_none() {
            if let Some(line) = line {
                dst_slot.insn.set_source_line(line);
            }
        }
        for comment in comments {
            dst_slot.insn.add_comment(comment);
        }
        Ok(())
    }

    /// Adds attribute flags to an instruction.
    ///
    /// # Errors
    ///
    /// [`Error::DeadHandle`] if the instruction is no longer bound.
    pub fn add_insn_attrs(&mut self, insn: InsnId, attrs: InsnAttrs) -> Result<()> {
        self.bound_slot_mut(insn)?.insn.add_attrs(attrs);
        Ok(())
    }

    /// Returns `true` if the instruction carries the given attributes.
    #[must_use]
    pub fn has_insn_attrs(&self, insn: InsnId, attrs: InsnAttrs) -> bool {
        self.insn(insn).is_some_and(|i| i.attrs().contains(attrs))
    }
}

impl fmt::Display for Routine {
    /// Renders the routine as generated output: instructions flagged
    /// `DONT_GENERATE` are skipped, matching what the code writer emits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "routine {}:", self.name)?;
        for (idx, block) in self.blocks.iter().enumerate() {
            writeln!(f, "  B{idx}:")?;
            for &id in &block.insns {
                let insn = &self.arena[id.index()].insn;
                if insn.attrs().contains(InsnAttrs::DONT_GENERATE) {
                    continue;
                }
                writeln!(f, "    {insn}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InvokeKind, MethodSig};

    fn test_sig() -> MethodSig {
        MethodSig::new("android.view.View", "void", "setVisibility", ["int"])
    }

    #[test]
    fn test_push_wires_def_and_uses() {
        let mut r = Routine::new("m");
        let b0 = r.add_block();
        let v0 = r.new_var(ArgType::Int, ArgType::Int);
        let v1 = r.new_var(ArgType::Object("android.view.View".into()), ArgType::Unknown);

        let c = r.push(b0, Insn::const_int(0, v0));
        let call = r.push(
            b0,
            Insn::invoke(
                InvokeKind::Virtual,
                test_sig(),
                vec![Operand::var(v1), Operand::var(v0)],
            ),
        );

        assert_eq!(r.var(v0).def(), Some(c));
        assert_eq!(r.var(v0).uses(), &[UseSite::new(call, 1)]);
        assert_eq!(r.var(v1).uses(), &[UseSite::new(call, 0)]);
        assert_eq!(r.block_insns(b0), &[c, call]);
    }

    #[test]
    fn test_replace_arg_updates_use_lists() {
        let mut r = Routine::new("m");
        let b0 = r.add_block();
        let v0 = r.new_var(ArgType::Int, ArgType::Int);
        let v1 = r.new_var(ArgType::Object("android.view.View".into()), ArgType::Unknown);
        r.push(b0, Insn::const_int(0, v0));
        let call = r.push(
            b0,
            Insn::invoke(
                InvokeKind::Virtual,
                test_sig(),
                vec![Operand::var(v1), Operand::var(v0)],
            ),
        );

        let field = crate::ir::FieldRef::new("android.view.View", "VISIBLE");
        r.replace_arg(
            call,
            1,
            v0,
            Operand::Field {
                field,
                ty: ArgType::Int,
            },
        )
        .unwrap();

        assert!(r.var(v0).is_dead());
        let rendered = format!("{}", r.insn(call).unwrap());
        assert!(rendered.contains("android.view.View.VISIBLE"));
    }

    #[test]
    fn test_replace_arg_rejects_wrong_slot() {
        let mut r = Routine::new("m");
        let b0 = r.add_block();
        let v0 = r.new_var(ArgType::Int, ArgType::Int);
        let v1 = r.new_var(ArgType::Object("android.view.View".into()), ArgType::Unknown);
        r.push(b0, Insn::const_int(0, v0));
        let call = r.push(
            b0,
            Insn::invoke(
                InvokeKind::Virtual,
                test_sig(),
                vec![Operand::var(v1), Operand::var(v0)],
            ),
        );

        let err = r
            .replace_arg(call, 0, v0, Operand::lit(1, ArgType::Int))
            .unwrap_err();
        assert!(matches!(err, Error::OperandNotFound { .. }));
        // unchanged
        assert_eq!(r.var(v0).use_count(), 1);
    }

    #[test]
    fn test_replace_arg_rejects_type_conflict() {
        let mut r = Routine::new("m");
        let b0 = r.add_block();
        let v0 = r.new_var(ArgType::Int, ArgType::Int);
        let call = r.push(
            b0,
            Insn::invoke(InvokeKind::Static, test_sig(), vec![Operand::var(v0)]),
        );

        let err = r
            .replace_arg(
                call,
                0,
                v0,
                Operand::Field {
                    field: crate::ir::FieldRef::new("a.B", "C"),
                    ty: ArgType::string(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::TypeConflict { .. }));
        assert_eq!(r.var(v0).use_count(), 1);
    }

    #[test]
    fn test_remove_all_and_unbind() {
        let mut r = Routine::new("m");
        let b0 = r.add_block();
        let v0 = r.new_var(ArgType::Int, ArgType::Int);
        let c = r.push(b0, Insn::const_int(0, v0));
        let ret = r.push(b0, Insn::ret(None));

        r.remove_all_and_unbind(b0, &[c]);

        assert!(!r.is_bound(c));
        assert!(r.insn(c).is_none());
        assert!(r.var(v0).def().is_none());
        assert_eq!(r.block_insns(b0), &[ret]);

        // double removal is a no-op
        r.remove_all_and_unbind(b0, &[c]);
        assert_eq!(r.block_insns(b0), &[ret]);
    }

    #[test]
    fn test_remove_drops_operand_uses() {
        let mut r = Routine::new("m");
        let b0 = r.add_block();
        let v0 = r.new_var(ArgType::Int, ArgType::Int);
        let v1 = r.new_var(ArgType::Int, ArgType::Int);
        r.push(b0, Insn::const_int(1, v0));
        let m = r.push(b0, Insn::mov(v1, Operand::var(v0)));

        assert_eq!(r.var(v0).use_count(), 1);
        r.remove_all_and_unbind(b0, &[m]);
        assert!(r.var(v0).is_dead());
        assert!(r.var(v1).def().is_none());
    }

    #[test]
    fn test_inherit_metadata() {
        let mut r = Routine::new("m");
        let b0 = r.add_block();
        let v0 = r.new_var(ArgType::Int, ArgType::Int);
        let c = r.push(b0, Insn::const_int(0, v0).with_source_line(12));
        r.attach_comment(c, "original note").unwrap();
        let ret = r.push(b0, Insn::ret(None));

        r.inherit_metadata(ret, c).unwrap();
        let dst = r.insn(ret).unwrap();
        assert_eq!(dst.source_line(), Some(12));
        assert_eq!(dst.comments(), ["original note".to_string()]);
    }

    #[test]
    fn test_display_skips_hidden_insns() {
        let mut r = Routine::new("m");
        let b0 = r.add_block();
        let v0 = r.new_var(ArgType::Int, ArgType::Int);
        let c = r.push(b0, Insn::const_int(7, v0));
        r.push(b0, Insn::ret(None));

        assert!(format!("{r}").contains("const 7"));
        r.add_insn_attrs(c, InsnAttrs::DONT_GENERATE).unwrap();
        assert!(!format!("{r}").contains("const 7"));
    }
}
