//! IR instructions with explicit operands and results.
//!
//! The pass only needs to distinguish literal loads, invokes and phi merges;
//! everything else flows through as an opaque kind. Operands are explicit:
//! a read of an SSA variable, an inline literal, or a static field read (the
//! substitution target the pass installs).

use std::fmt;

use bitflags::bitflags;

use crate::ir::{ArgType, FieldRef, MethodSig, VarId};

/// Stable handle of an instruction within a routine's arena.
///
/// Handles stay valid across removals: removal unlinks an instruction from
/// its block and from the def-use web but never reuses its slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InsnId(usize);

impl InsnId {
    /// Creates an instruction handle from an arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for InsnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

impl fmt::Display for InsnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

bitflags! {
    /// Attribute flags on an instruction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InsnAttrs: u8 {
        /// The instruction is suppressed from generated output. It stays in
        /// the IR (its value may feed other hidden instructions) but the
        /// code writer skips it.
        const DONT_GENERATE = 1 << 0;
    }
}

bitflags! {
    /// Attribute flags on a variable operand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OperandAttrs: u8 {
        /// The operand must not be replaced by an inlined value of any kind.
        const DONT_INLINE = 1 << 0;
        /// The operand must not be replaced by an inlined constant
        /// specifically (e.g. the decompiler decided the named variable
        /// reads better at this site).
        const DONT_INLINE_CONST = 1 << 1;
    }
}

/// How an invoke dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    /// Virtual dispatch through the receiver.
    Virtual,
    /// Static call, no receiver.
    Static,
    /// Direct (non-virtual) instance call, e.g. a constructor or private
    /// method.
    Direct,
    /// Interface dispatch.
    Interface,
}

impl fmt::Display for InvokeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Virtual => write!(f, "invoke-virtual"),
            Self::Static => write!(f, "invoke-static"),
            Self::Direct => write!(f, "invoke-direct"),
            Self::Interface => write!(f, "invoke-interface"),
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A read of an SSA variable.
    Var {
        /// The variable being read.
        var: VarId,
        /// Per-operand attribute flags.
        attrs: OperandAttrs,
    },
    /// An inline literal with its rendered type.
    Lit {
        /// Raw 64-bit payload (sign-extended for narrower types).
        value: i64,
        /// The rendered type of the literal.
        ty: ArgType,
    },
    /// A read of a declared static constant, installed by substitution.
    Field {
        /// The constant being read.
        field: FieldRef,
        /// The rendered type of the read.
        ty: ArgType,
    },
}

impl Operand {
    /// Variable-read operand with no attributes.
    #[must_use]
    pub const fn var(var: VarId) -> Self {
        Self::Var {
            var,
            attrs: OperandAttrs::empty(),
        }
    }

    /// Variable-read operand with attributes.
    #[must_use]
    pub const fn var_with(var: VarId, attrs: OperandAttrs) -> Self {
        Self::Var { var, attrs }
    }

    /// Inline literal operand.
    #[must_use]
    pub const fn lit(value: i64, ty: ArgType) -> Self {
        Self::Lit { value, ty }
    }

    /// Returns the variable read by this operand, if any.
    #[must_use]
    pub const fn as_var(&self) -> Option<VarId> {
        match self {
            Self::Var { var, .. } => Some(*var),
            _ => None,
        }
    }

    /// Returns the rendered type the operand carries into its slot.
    #[must_use]
    pub fn ty<'a>(&'a self, var_type: impl FnOnce(VarId) -> &'a ArgType) -> &'a ArgType {
        match self {
            Self::Var { var, .. } => var_type(*var),
            Self::Lit { ty, .. } | Self::Field { ty, .. } => ty,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var { var, .. } => write!(f, "{var}"),
            Self::Lit { value, .. } => write!(f, "{value}"),
            Self::Field { field, .. } => write!(f, "{field}"),
        }
    }
}

/// The operation an instruction performs.
#[derive(Debug, Clone, PartialEq)]
pub enum InsnKind {
    /// Numeric constant load: `result = const value`.
    Const {
        /// Raw 64-bit payload of the constant.
        value: i64,
    },
    /// String constant load: `result = const-str "value"`.
    ConstStr {
        /// The string payload.
        value: String,
    },
    /// Method invocation. For instance dispatch the receiver occupies
    /// operand slot 0 and declared arguments follow.
    Invoke {
        /// Dispatch kind.
        kind: InvokeKind,
        /// The statically declared target.
        target: MethodSig,
    },
    /// Phi merge of values arriving from predecessor blocks.
    Phi,
    /// Register copy.
    Move,
    /// Method return.
    Return,
}

impl InsnKind {
    /// Returns `true` for phi merges.
    #[must_use]
    pub const fn is_phi(&self) -> bool {
        matches!(self, Self::Phi)
    }

    /// Returns `true` for instructions that produce a literal value.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Const { .. } | Self::ConstStr { .. })
    }
}

/// An IR instruction: kind, explicit operands, optional result and
/// source metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Insn {
    kind: InsnKind,
    operands: Vec<Operand>,
    result: Option<VarId>,
    attrs: InsnAttrs,
    comments: Vec<String>,
    source_line: Option<u32>,
}

impl Insn {
    /// Creates an instruction from its parts.
    #[must_use]
    pub fn new(kind: InsnKind, operands: Vec<Operand>, result: Option<VarId>) -> Self {
        Self {
            kind,
            operands,
            result,
            attrs: InsnAttrs::empty(),
            comments: Vec::new(),
            source_line: None,
        }
    }

    /// Numeric constant load defining `result`.
    #[must_use]
    pub fn const_int(value: i64, result: VarId) -> Self {
        Self::new(InsnKind::Const { value }, Vec::new(), Some(result))
    }

    /// String constant load defining `result`.
    #[must_use]
    pub fn const_str(value: impl Into<String>, result: VarId) -> Self {
        Self::new(
            InsnKind::ConstStr {
                value: value.into(),
            },
            Vec::new(),
            Some(result),
        )
    }

    /// Invoke instruction with the given operands (receiver first for
    /// instance dispatch).
    #[must_use]
    pub fn invoke(kind: InvokeKind, target: MethodSig, operands: Vec<Operand>) -> Self {
        Self::new(InsnKind::Invoke { kind, target }, operands, None)
    }

    /// Phi merge defining `result` from the given variable operands.
    #[must_use]
    pub fn phi(result: VarId, operands: Vec<Operand>) -> Self {
        Self::new(InsnKind::Phi, operands, Some(result))
    }

    /// Register copy defining `result`.
    #[must_use]
    pub fn mov(result: VarId, operand: Operand) -> Self {
        Self::new(InsnKind::Move, vec![operand], Some(result))
    }

    /// Method return, optionally carrying a value.
    #[must_use]
    pub fn ret(operand: Option<Operand>) -> Self {
        Self::new(InsnKind::Return, operand.into_iter().collect(), None)
    }

    /// Returns the operation kind.
    #[must_use]
    pub const fn kind(&self) -> &InsnKind {
        &self.kind
    }

    /// Returns the operands.
    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Gets an operand by slot index.
    #[must_use]
    pub fn operand(&self, index: usize) -> Option<&Operand> {
        self.operands.get(index)
    }

    /// Sets an operand by slot index. Callers maintain use lists.
    pub(crate) fn set_operand(&mut self, index: usize, operand: Operand) {
        self.operands[index] = operand;
    }

    /// Returns the defined variable, if the instruction produces one.
    #[must_use]
    pub const fn result(&self) -> Option<VarId> {
        self.result
    }

    /// Returns the attribute flags.
    #[must_use]
    pub const fn attrs(&self) -> InsnAttrs {
        self.attrs
    }

    /// Sets attribute flags.
    pub fn add_attrs(&mut self, attrs: InsnAttrs) {
        self.attrs |= attrs;
    }

    /// Returns attached comments.
    #[must_use]
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Attaches a non-executable comment.
    pub fn add_comment(&mut self, text: impl Into<String>) {
        self.comments.push(text.into());
    }

    /// Returns the source line this instruction maps to, if known.
    #[must_use]
    pub const fn source_line(&self) -> Option<u32> {
        self.source_line
    }

    /// Sets the source line.
    pub fn set_source_line(&mut self, line: u32) {
        self.source_line = Some(line);
    }

    /// Builder-style source line attachment.
    #[must_use]
    pub fn with_source_line(mut self, line: u32) -> Self {
        self.source_line = Some(line);
        self
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = self.result {
            write!(f, "{result} = ")?;
        }
        match &self.kind {
            InsnKind::Const { value } => write!(f, "const {value}")?,
            InsnKind::ConstStr { value } => write!(f, "const-str {value:?}")?,
            InsnKind::Invoke { kind, target } => write!(f, "{kind} {target}")?,
            InsnKind::Phi => write!(f, "phi")?,
            InsnKind::Move => write!(f, "move")?,
            InsnKind::Return => write!(f, "return")?,
        }
        if !self.operands.is_empty() {
            write!(f, " (")?;
            for (i, op) in self.operands.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{op}")?;
            }
            write!(f, ")")?;
        }
        for comment in &self.comments {
            write!(f, " // {comment}")?;
        }
        Ok(())
    }
}
