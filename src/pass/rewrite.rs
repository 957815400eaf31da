//! The constant substitution pass.
//!
//! For every invoke instruction in a routine the pass matches the declared
//! target against the rule index (expanded across the type hierarchy),
//! traces the matched argument back to its unique defining instruction
//! through the SSA def-use links, and either substitutes the literal with a
//! read of the symbolic constant, or annotates the call with a best-effort
//! bitmask decomposition.
//!
//! # Matching policy
//!
//! - Owner scan: the declared owner first, then its ancestors in provider
//!   order. The first owner with a non-empty rule list terminates the scan
//!   for that call, whether or not substitution then succeeds.
//! - Rule scan: first-fit over the owner's rules; the first rule whose
//!   target argument is a plain variable reference is attempted and no
//!   further rule is evaluated for that call.
//!
//! # Shared-literal safety
//!
//! A literal-defining instruction may feed several use sites, but each
//! matched call rewrites only its own argument. The definition is removed
//! only once no use of its result remains, and hidden (not deleted) when
//! all the uses that remain sit in suppressed instructions. A literal
//! shared with a use no rule resolves therefore stays defined and visible
//! at that site.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::ir::{
    ArgType, FieldRef, InsnAttrs, InsnId, InsnKind, Operand, OperandAttrs, Routine, UseSite,
    VarAttrs, VarId,
};
use crate::pass::{DependencySet, TypeHierarchy};
use crate::rules::{OwnerKey, Rule, RuleIndex, ValueKind};
use crate::{Error, Result};

/// The literal payload traced from a defining instruction.
enum Literal {
    Num(i64),
    Str(String),
}

impl Literal {
    /// The numeric payload, for the type-rendering rules. String literals
    /// behave like zero (they never force the narrow-numeric fallback).
    const fn numeric(&self) -> i64 {
        match self {
            Self::Num(value) => *value,
            Self::Str(_) => 0,
        }
    }
}

/// The SSA constant substitution pass.
///
/// Holds read-only snapshots of the rule index and accumulates the
/// [`DependencySet`] across every routine processed during its lifetime.
/// Routines are independent; [`RewritePass::run_all`] processes them in
/// parallel.
#[derive(Debug)]
pub struct RewritePass {
    rules: Arc<RuleIndex>,
    deps: DependencySet,
}

impl RewritePass {
    /// Creates a pass over a fully initialized rule index.
    ///
    /// # Errors
    ///
    /// [`Error::Uninitialized`] if any rule still lacks its symbol map,
    /// i.e. [`ConstantResolver::attach_maps`](crate::rules::ConstantResolver::attach_maps)
    /// has not run. The pass cannot safely start without its read-only
    /// snapshots.
    pub fn new(rules: Arc<RuleIndex>) -> Result<Self> {
        for (_, list) in rules.iter() {
            if list.iter().any(|rule| rule.map().is_none()) {
                return Err(Error::Uninitialized("rule symbol maps"));
            }
        }
        Ok(Self {
            rules,
            deps: DependencySet::new(),
        })
    }

    /// Returns the dependency sources recorded so far.
    #[must_use]
    pub fn dependencies(&self) -> &DependencySet {
        &self.deps
    }

    /// Runs the pass on one routine, mutating its IR in place.
    ///
    /// Returns `true` if anything changed. Running the pass again on
    /// already-rewritten code is a no-op: no matching literal remains.
    pub fn run(&self, routine: &mut Routine, hierarchy: &dyn TypeHierarchy) -> bool {
        let mut changed = false;
        for block in 0..routine.block_count() {
            let mut to_remove: Vec<InsnId> = Vec::new();
            for insn in routine.block_insns(block).to_vec() {
                changed |= self.check_insn(routine, hierarchy, insn, &mut to_remove);
            }
            changed |= !to_remove.is_empty();
            routine.remove_all_and_unbind(block, &to_remove);
        }
        changed
    }

    /// Runs the pass over many routines in parallel.
    ///
    /// Returns the number of routines that changed. Routines share nothing
    /// mutable except the dependency set, which is thread-safe.
    pub fn run_all(&self, routines: &mut [Routine], hierarchy: &dyn TypeHierarchy) -> usize {
        routines
            .par_iter_mut()
            .map(|routine| usize::from(self.run(routine, hierarchy)))
            .sum()
    }

    /// Matches one instruction against the rule index.
    fn check_insn(
        &self,
        routine: &mut Routine,
        hierarchy: &dyn TypeHierarchy,
        insn: InsnId,
        to_remove: &mut Vec<InsnId>,
    ) -> bool {
        let target = match routine.insn(insn).map(|i| i.kind()) {
            Some(InsnKind::Invoke { target, .. }) => target.clone(),
            _ => return false,
        };

        // Candidate owner sequence: declared type first, then ancestors in
        // provider order, nested-type separators normalized.
        let mut owners = vec![target.owner().to_string()];
        for ancestor in hierarchy.ancestors_of(target.owner()) {
            let ancestor = ancestor.replace('$', ".");
            if !owners.contains(&ancestor) {
                owners.push(ancestor);
            }
        }

        for owner in &owners {
            let key = OwnerKey::for_call(owner, &target);
            let rules = self.rules.lookup(&key);
            if rules.is_empty() {
                continue;
            }
            // First owner with rules wins, whatever happens next.
            return self.probe_rules(routine, rules, insn, to_remove);
        }
        false
    }

    /// First-fit scan of the matched owner's rules.
    fn probe_rules(
        &self,
        routine: &mut Routine,
        rules: &[Rule],
        call: InsnId,
        to_remove: &mut Vec<InsnId>,
    ) -> bool {
        for rule in rules {
            // +1 skips the implicit receiver slot of an instance call.
            let slot = rule.argument_offset() + 1;
            let var = routine
                .insn(call)
                .and_then(|insn| insn.operand(slot))
                .and_then(Operand::as_var);
            if let Some(var) = var {
                return self.probe_rule(routine, rule, call, slot, var, to_remove);
            }
            // No plain variable reference at this offset: try the next rule.
        }
        false
    }

    /// Attempts substitution for one matched rule/argument pair.
    fn probe_rule(
        &self,
        routine: &mut Routine,
        rule: &Rule,
        call: InsnId,
        slot: usize,
        var: VarId,
        to_remove: &mut Vec<InsnId>,
    ) -> bool {
        let Some(def) = routine.var(var).def() else {
            return false;
        };
        if to_remove.contains(&def) {
            // Already fully resolved against an earlier call in this block.
            return false;
        }
        let Some(map) = rule.map() else {
            warn!(owner = %rule.owner(), "rule has no symbol map, skipping");
            return false;
        };

        let literal = match routine.insn(def).map(|insn| insn.kind()) {
            Some(InsnKind::Const { value }) => Literal::Num(*value),
            Some(InsnKind::ConstStr { value }) => Literal::Str(value.clone()),
            _ => return false,
        };

        let field = match &literal {
            Literal::Num(value) => map.get_numeric(*value).cloned(),
            Literal::Str(value) => map.get_str(value).cloned(),
        };

        match field {
            Some(field) => {
                let (changed, removable) =
                    self.replace_use(routine, rule, def, var, &literal, field, call, slot);
                if removable {
                    to_remove.push(def);
                }
                changed
            }
            None if rule.is_flag() => match &literal {
                Literal::Num(value) => self.annotate_flags(routine, rule, call, *value),
                Literal::Str(_) => false,
            },
            None => {
                // A bare literal never backed by a symbol is common and
                // legitimate output.
                debug!(owner = %rule.owner(), "literal not covered by rule symbols");
                false
            }
        }
    }

    /// Rewrites the matched call's own argument, if safely inlineable.
    ///
    /// Other uses of the same literal are untouched here; a use at another
    /// matching call resolves when the block scan reaches that call.
    ///
    /// Returns `(changed, removable)`: whether the IR changed, and whether
    /// the defining instruction can be queued for removal (no use of its
    /// result remains).
    #[allow(clippy::too_many_arguments)]
    fn replace_use(
        &self,
        routine: &mut Routine,
        rule: &Rule,
        def: InsnId,
        var: VarId,
        literal: &Literal,
        field: FieldRef,
        call: InsnId,
        slot: usize,
    ) -> (bool, bool) {
        if !can_inline(routine, var, UseSite::new(call, slot)) {
            return (false, false);
        }
        let ty = rendered_type(routine, var, literal);
        if let Err(error) = routine.replace_arg(call, slot, var, Operand::Field { field, ty }) {
            warn!(%error, "constant replacement refused");
            return (false, false);
        }
        if let Err(error) = routine.inherit_metadata(call, def) {
            warn!(%error, "could not carry literal metadata to call");
        }
        self.deps.record(rule.source());

        let remaining = routine.var(var).uses().to_vec();
        if remaining.is_empty() {
            return (true, true);
        }
        // Hide the literal if it only feeds suppressed instructions now,
        // so a value shared between rewritten and dead uses is neither
        // deleted nor shown spuriously.
        if remaining.iter().all(|site| can_ignore(routine, var, *site)) {
            let _ = routine.add_insn_attrs(def, InsnAttrs::DONT_GENERATE);
        }
        (true, false)
    }

    /// Best-effort bitmask decomposition for flag rules.
    ///
    /// The call's arguments are left untouched; the reconstruction is
    /// attached as a non-executable comment. Nothing is attached when no
    /// flag bit matches at all.
    fn annotate_flags(
        &self,
        routine: &mut Routine,
        rule: &Rule,
        call: InsnId,
        raw: i64,
    ) -> bool {
        let Some(map) = rule.map() else {
            return false;
        };
        let value = match rule.kind() {
            ValueKind::Int => i64::from(raw as i32),
            _ => raw,
        };

        let mut names: Vec<String> = Vec::new();
        let mut combined: i64 = 0;
        for (flag, field) in map.numeric_entries() {
            if value & flag != 0 {
                names.push(field.name().to_string());
                combined |= flag;
            }
        }
        if names.is_empty() {
            debug!(value, owner = %rule.owner(), "no flag bits recovered");
            return false;
        }
        if combined != value {
            // Rule symbol lists may be incomplete; keep the unrecovered
            // bits as a plain number.
            names.push((value & !combined).to_string());
        }

        let comment = format!("{value} = ({})", names.join(" | "));
        match routine.attach_comment(call, comment) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "could not attach flag annotation");
                false
            }
        }
    }
}

/// Whether a use site may have the literal substituted in place.
fn can_inline(routine: &Routine, var: VarId, site: UseSite) -> bool {
    let Some(insn) = routine.insn(site.insn) else {
        return false;
    };
    let Some(Operand::Var { attrs, .. }) = insn.operand(site.operand) else {
        return false;
    };
    if attrs.intersects(OperandAttrs::DONT_INLINE | OperandAttrs::DONT_INLINE_CONST) {
        return false;
    }
    if insn.attrs().contains(InsnAttrs::DONT_GENERATE) {
        return false;
    }
    if routine.var(var).attrs().contains(VarAttrs::LINKED_TO_OTHERS) && !used_in_phi(routine, var)
    {
        // Values duplicated across exception paths stay put unless the
        // duplication goes through a phi merge.
        return false;
    }
    true
}

/// Whether a remaining use lets the defining literal be hidden.
fn can_ignore(routine: &Routine, var: VarId, site: UseSite) -> bool {
    let Some(insn) = routine.insn(site.insn) else {
        return false;
    };
    if insn.kind().is_phi() {
        return false;
    }
    if routine.var(var).attrs().contains(VarAttrs::LINKED_TO_OTHERS) {
        return false;
    }
    insn.attrs().contains(InsnAttrs::DONT_GENERATE)
}

fn used_in_phi(routine: &Routine, var: VarId) -> bool {
    routine
        .var(var)
        .uses()
        .iter()
        .any(|site| routine.insn(site.insn).is_some_and(|insn| insn.kind().is_phi()))
}

/// The rendered type of the replacement at a destination variable.
///
/// Declared type first; `Unknown` falls back to the narrowed initial type;
/// an object-typed slot carrying a non-zero numeric literal falls back to
/// the generic narrow-numeric type (an object slot cannot carry a non-zero
/// inlined numeric literal's type tag).
fn rendered_type(routine: &Routine, var: VarId, literal: &Literal) -> ArgType {
    let variable = routine.var(var);
    let mut ty = variable.declared_type().clone();
    if ty == ArgType::Unknown {
        ty = variable.initial_type().clone();
    }
    if ty.is_object() && literal.numeric() != 0 {
        ty = ArgType::NarrowNumbers;
    }
    ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Insn;

    #[test]
    fn test_pass_requires_resolved_maps() {
        let mut index = RuleIndex::new();
        index.insert(Rule::new(
            OwnerKey::new("a.B", "void", "m", &["int".into()]),
            0,
            false,
            "Android SDK",
            ValueKind::Int,
            vec!["a.B.C".into()],
        ));
        let err = RewritePass::new(Arc::new(index)).unwrap_err();
        assert!(matches!(err, Error::Uninitialized(_)));
    }

    #[test]
    fn test_empty_index_is_valid_and_inert() {
        let pass = RewritePass::new(Arc::new(RuleIndex::new())).unwrap();
        let mut routine = Routine::new("m");
        let b0 = routine.add_block();
        routine.push(b0, Insn::ret(None));
        assert!(!pass.run(&mut routine, &crate::pass::EmptyHierarchy));
        assert!(pass.dependencies().is_empty());
    }

    #[test]
    fn test_rendered_type_fallbacks() {
        let mut routine = Routine::new("m");
        let unknown = routine.new_var(ArgType::Unknown, ArgType::Int);
        let object = routine.new_var(
            ArgType::Object("java.lang.Runnable".into()),
            ArgType::Unknown,
        );

        assert_eq!(
            rendered_type(&routine, unknown, &Literal::Num(1)),
            ArgType::Int
        );
        assert_eq!(
            rendered_type(&routine, object, &Literal::Num(1)),
            ArgType::NarrowNumbers
        );
        // zero stays assignable to an object slot (null-like)
        assert_eq!(
            rendered_type(&routine, object, &Literal::Num(0)),
            ArgType::Object("java.lang.Runnable".into())
        );
    }
}
