use thiserror::Error;

use crate::ir::{ArgType, InsnId, VarId};

/// The generic Error type covering all failures this library can return.
///
/// Most of the rewrite pass is deliberately infallible: an unmatched call,
/// an unresolved symbol or a non-constant definition is ordinary output and
/// is skipped silently. The variants here cover the remaining cases:
///
/// ## Precondition Errors
/// - [`Error::Uninitialized`] - Rule data consumed before it was built
///
/// ## IR Mutation Errors
/// - [`Error::DeadHandle`] - Instruction handle no longer bound to a routine
/// - [`Error::OperandNotFound`] - Replacement target operand does not exist
/// - [`Error::TypeConflict`] - Replacement would break instruction typing
///
/// Mutation errors are per-call-site: the pass logs them as warnings and
/// continues with the next candidate. Only [`Error::Uninitialized`] aborts
/// a run.
#[derive(Error, Debug)]
pub enum Error {
    /// The rewrite pass was started before its read-only inputs were built.
    ///
    /// The pass reads the rule index and the resolved symbol maps as
    /// immutable snapshots. Running it while any rule still lacks its
    /// symbol map is a fatal precondition violation.
    #[error("rewrite pass started before {0} was initialized")]
    Uninitialized(&'static str),

    /// An instruction handle is no longer bound to its routine.
    ///
    /// Removal unlinks instructions instead of freeing them, so stale
    /// handles are detectable. Operating on an unlinked handle yields
    /// this error instead of touching dead state.
    #[error("instruction {0} is not bound to this routine")]
    DeadHandle(InsnId),

    /// An argument replacement named an operand the instruction does not have.
    ///
    /// Either the operand index is out of range or the slot does not read
    /// the expected variable.
    #[error("instruction {insn} has no variable operand {var} at slot {slot}")]
    OperandNotFound {
        /// The instruction whose operand was targeted.
        insn: InsnId,
        /// The variable the operand was expected to read.
        var: VarId,
        /// The operand slot that was targeted.
        slot: usize,
    },

    /// A replacement operand would leave the instruction ill-typed.
    ///
    /// The `replace_arg` primitive keeps instructions well-typed; a
    /// substitution whose rendered type is not assignable to the
    /// destination slot is refused.
    #[error("operand type {found} is not assignable to {expected}")]
    TypeConflict {
        /// The type the destination slot requires.
        expected: ArgType,
        /// The rendered type of the refused replacement.
        found: ArgType,
    },
}
