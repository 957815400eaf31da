//! SSA variables with explicit def and use tracking.
//!
//! Every variable in a routine is defined by exactly one instruction and
//! read by zero or more instructions. The use list is the source of truth
//! the rewrite pass walks when deciding whether a shared literal can be
//! removed, hidden or must stay visible, so every mutation primitive keeps
//! it exact.

use std::fmt;

use bitflags::bitflags;

use crate::ir::{ArgType, InsnId};

/// Unique identifier for an SSA variable.
///
/// A lightweight index into the routine's variable table. Unique within a
/// single routine, not globally.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    /// Creates a new variable identifier.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying index into the variable table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

bitflags! {
    /// Attribute flags on an SSA variable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VarAttrs: u8 {
        /// The variable is tied to other SSA variables that must stay in
        /// sync, e.g. a value duplicated across exception-handling paths.
        /// Such variables are not inlined unless the duplication goes
        /// through a phi merge.
        const LINKED_TO_OTHERS = 1 << 0;
    }
}

/// A single read of an SSA variable: the using instruction and the operand
/// slot within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UseSite {
    /// The instruction reading the variable.
    pub insn: InsnId,
    /// The operand index within that instruction.
    pub operand: usize,
}

impl UseSite {
    /// Creates a use site.
    #[must_use]
    pub const fn new(insn: InsnId, operand: usize) -> Self {
        Self { insn, operand }
    }
}

/// An SSA variable: one definition, explicit uses, rendered types.
///
/// The declared type is what the decompiler's inference settled on for the
/// variable; the initial type is the narrowed type at the definition point,
/// used as a fallback when inference produced `Unknown`.
#[derive(Debug, Clone)]
pub struct SsaVar {
    id: VarId,
    def: Option<InsnId>,
    declared_type: ArgType,
    initial_type: ArgType,
    attrs: VarAttrs,
    uses: Vec<UseSite>,
}

impl SsaVar {
    /// Creates a new variable with no definition yet.
    ///
    /// The definition is bound when an instruction producing this variable
    /// is appended to a block.
    #[must_use]
    pub fn new(id: VarId, declared_type: ArgType, initial_type: ArgType) -> Self {
        Self {
            id,
            def: None,
            declared_type,
            initial_type,
            attrs: VarAttrs::empty(),
            uses: Vec::new(),
        }
    }

    /// Returns the variable's identifier.
    #[must_use]
    pub const fn id(&self) -> VarId {
        self.id
    }

    /// Returns the unique defining instruction, if bound.
    ///
    /// `None` either before construction finished or after the definition
    /// was removed by the pass (the variable is then retired).
    #[must_use]
    pub const fn def(&self) -> Option<InsnId> {
        self.def
    }

    /// Binds the defining instruction.
    pub fn set_def(&mut self, insn: InsnId) {
        debug_assert!(self.def.is_none(), "SSA variable defined twice");
        self.def = Some(insn);
    }

    /// Clears the definition after the defining instruction was unlinked.
    pub fn retire_def(&mut self) {
        self.def = None;
    }

    /// Returns the declared type.
    #[must_use]
    pub fn declared_type(&self) -> &ArgType {
        &self.declared_type
    }

    /// Returns the narrowed type at the definition point.
    #[must_use]
    pub fn initial_type(&self) -> &ArgType {
        &self.initial_type
    }

    /// Returns the attribute flags.
    #[must_use]
    pub const fn attrs(&self) -> VarAttrs {
        self.attrs
    }

    /// Sets attribute flags.
    pub fn add_attrs(&mut self, attrs: VarAttrs) {
        self.attrs |= attrs;
    }

    /// Returns all current use sites.
    #[must_use]
    pub fn uses(&self) -> &[UseSite] {
        &self.uses
    }

    /// Returns the number of uses.
    #[must_use]
    pub fn use_count(&self) -> usize {
        self.uses.len()
    }

    /// Returns `true` if the variable has no uses.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.uses.is_empty()
    }

    /// Registers a use site.
    pub fn add_use(&mut self, site: UseSite) {
        self.uses.push(site);
    }

    /// Drops the use site matching the given instruction and operand slot.
    ///
    /// Returns `true` if a matching entry was removed.
    pub fn remove_use(&mut self, insn: InsnId, operand: usize) -> bool {
        if let Some(pos) = self
            .uses
            .iter()
            .position(|u| u.insn == insn && u.operand == operand)
        {
            self.uses.remove(pos);
            true
        } else {
            false
        }
    }
}

impl fmt::Display for SsaVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.declared_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_id_display() {
        let id = VarId::new(7);
        assert_eq!(format!("{id}"), "v7");
        assert_eq!(format!("{id:?}"), "v7");
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn test_var_def_lifecycle() {
        let mut var = SsaVar::new(VarId::new(0), ArgType::Int, ArgType::Int);
        assert!(var.def().is_none());

        var.set_def(InsnId::new(3));
        assert_eq!(var.def(), Some(InsnId::new(3)));

        var.retire_def();
        assert!(var.def().is_none());
    }

    #[test]
    fn test_var_use_tracking() {
        let mut var = SsaVar::new(VarId::new(0), ArgType::Int, ArgType::Int);
        assert!(var.is_dead());

        var.add_use(UseSite::new(InsnId::new(1), 0));
        var.add_use(UseSite::new(InsnId::new(2), 1));
        assert_eq!(var.use_count(), 2);

        assert!(var.remove_use(InsnId::new(1), 0));
        assert!(!var.remove_use(InsnId::new(1), 0));
        assert_eq!(var.use_count(), 1);
        assert_eq!(var.uses()[0].insn, InsnId::new(2));
    }

    #[test]
    fn test_var_attrs() {
        let mut var = SsaVar::new(VarId::new(0), ArgType::Int, ArgType::Int);
        assert!(!var.attrs().contains(VarAttrs::LINKED_TO_OTHERS));
        var.add_attrs(VarAttrs::LINKED_TO_OTHERS);
        assert!(var.attrs().contains(VarAttrs::LINKED_TO_OTHERS));
    }
}
