//! Routine IR consumed and mutated by the rewrite pass.
//!
//! A routine is a control-flow graph of basic blocks of instructions in SSA
//! form: every variable has exactly one defining instruction and zero or
//! more using instructions. The pass relies on that invariant holding on
//! input and keeps it intact through every mutation.
//!
//! The representation is handle-based: instructions live in an arena owned
//! by the [`Routine`] and are addressed by stable [`InsnId`] handles, so
//! destructive removal is an unlink, never a free.

mod instruction;
mod routine;
mod types;
mod variable;

pub use instruction::{Insn, InsnAttrs, InsnId, InsnKind, InvokeKind, Operand, OperandAttrs};
pub use routine::Routine;
pub use types::{ArgType, FieldRef, MethodSig};
pub use variable::{SsaVar, UseSite, VarAttrs, VarId};
