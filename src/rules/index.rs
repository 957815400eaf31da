//! Owner keys and the rule index.
//!
//! An owner key is the canonical identity of one callable API: declaring
//! type, return type, method name and ordered parameter types, rendered
//! with a fixed separator so the key built from a call site and the key a
//! rule was indexed under compare structurally.

use std::collections::HashMap;
use std::fmt;

use crate::ir::MethodSig;
use crate::rules::Rule;

/// Canonical identity of a callable API.
///
/// Rendered as `declaring.Type returnType name(param1, param2)`. Immutable
/// once formed; equality and hashing are structural over the rendered form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerKey(String);

impl OwnerKey {
    /// Builds a key from its components.
    #[must_use]
    pub fn new(owner: &str, return_type: &str, name: &str, params: &[String]) -> Self {
        Self(format!(
            "{owner} {return_type} {name}({})",
            params.join(", ")
        ))
    }

    /// Builds the key for a call whose declared target is `sig`, resolved
    /// against `owner` (the declared type or one of its ancestors during
    /// owner-set expansion).
    #[must_use]
    pub fn for_call(owner: &str, sig: &MethodSig) -> Self {
        Self::new(owner, sig.return_type(), sig.name(), sig.param_types())
    }

    /// Returns the rendered key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable (after construction) mapping from owner key to its rules,
/// insertion order preserved per key.
///
/// Order is significant: match resolution inside the pass is first-fit over
/// this order.
#[derive(Debug, Default)]
pub struct RuleIndex {
    rules: HashMap<OwnerKey, Vec<Rule>>,
}

impl RuleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule under its owner key, preserving insertion order.
    pub fn insert(&mut self, rule: Rule) {
        self.rules.entry(rule.owner().clone()).or_default().push(rule);
    }

    /// Returns the rules for a key, or an empty slice. Never fails.
    #[must_use]
    pub fn lookup(&self, key: &OwnerKey) -> &[Rule] {
        self.rules.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of distinct owner keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the index holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates all `(key, rules)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&OwnerKey, &[Rule])> {
        self.rules.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Iterates all entries mutably. Used by the resolver to attach the
    /// shared symbol maps during initialization; the index is read-only
    /// afterwards.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&OwnerKey, &mut Vec<Rule>)> {
        self.rules.iter_mut()
    }
}
