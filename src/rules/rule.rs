//! Substitution rules and their symbolic value maps.
//!
//! A rule ties one argument position of one API signature to a family of
//! named constants. Rules come in three kinds (int, long, string) matching
//! the enum-style annotation that produced them; the kind is fixed at
//! construction and never changes.
//!
//! Several APIs reference the same enum family, so the value-to-field map
//! is not per-rule state: it is built once per `(owner, kind)` by the
//! [`ConstantResolver`](crate::rules::ConstantResolver) and shared by
//! reference across all rules with that key.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ir::FieldRef;
use crate::rules::OwnerKey;

/// The value kind a rule matches, fixed at rule construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ValueKind {
    /// 32-bit integer constants (`IntDef`).
    #[strum(serialize = "int")]
    Int,
    /// 64-bit integer constants (`LongDef`).
    #[strum(serialize = "long")]
    Long,
    /// String constants (`StringDef`).
    #[strum(serialize = "string")]
    Str,
}

/// A resolved, shared mapping from literal value to the field that declares
/// it.
///
/// Backed by ordered maps so flag decomposition can iterate values in
/// ascending order deterministically. The `Arc` makes sharing across rules
/// with the same `(owner, kind)` explicit and cheap.
#[derive(Debug, Clone)]
pub enum SymbolMap {
    /// `IntDef` values.
    Int(Arc<BTreeMap<i32, FieldRef>>),
    /// `LongDef` values.
    Long(Arc<BTreeMap<i64, FieldRef>>),
    /// `StringDef` values.
    Str(Arc<BTreeMap<String, FieldRef>>),
}

impl SymbolMap {
    /// Returns the kind this map serves.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Str(_) => ValueKind::Str,
        }
    }

    /// Returns the number of resolved symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int(m) => m.len(),
            Self::Long(m) => m.len(),
            Self::Str(m) => m.len(),
        }
    }

    /// Returns `true` if no symbols resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a numeric literal.
    ///
    /// Int maps truncate the 64-bit IR payload to `i32` before matching
    /// (the IR stores narrow literals sign-extended); long maps use the
    /// full value. String maps never match numerics.
    #[must_use]
    pub fn get_numeric(&self, value: i64) -> Option<&FieldRef> {
        match self {
            Self::Int(m) => m.get(&(value as i32)),
            Self::Long(m) => m.get(&value),
            Self::Str(_) => None,
        }
    }

    /// Looks up a string literal. Numeric maps never match strings.
    #[must_use]
    pub fn get_str(&self, value: &str) -> Option<&FieldRef> {
        match self {
            Self::Str(m) => m.get(value),
            _ => None,
        }
    }

    /// Returns `(value, field)` pairs in ascending value order, with int
    /// values sign-extended to 64 bits. Empty for string maps.
    #[must_use]
    pub fn numeric_entries(&self) -> Vec<(i64, &FieldRef)> {
        match self {
            Self::Int(m) => m.iter().map(|(v, f)| (i64::from(*v), f)).collect(),
            Self::Long(m) => m.iter().map(|(v, f)| (*v, f)).collect(),
            Self::Str(_) => Vec::new(),
        }
    }
}

/// One substitution rule: an API argument position plus the symbol family
/// that may replace its literal values.
#[derive(Debug, Clone)]
pub struct Rule {
    owner: OwnerKey,
    argument_offset: usize,
    is_flag: bool,
    source: String,
    symbols: Vec<String>,
    kind: ValueKind,
    map: Option<SymbolMap>,
}

impl Rule {
    /// Creates a rule from an already-parsed descriptor.
    ///
    /// `symbols` is the ordered list of dotted `Type.CONST` names the
    /// annotation declared; the value map stays unset until the resolver
    /// attaches it.
    #[must_use]
    pub fn new(
        owner: OwnerKey,
        argument_offset: usize,
        is_flag: bool,
        source: impl Into<String>,
        kind: ValueKind,
        symbols: Vec<String>,
    ) -> Self {
        Self {
            owner,
            argument_offset,
            is_flag,
            source: source.into(),
            symbols,
            kind,
            map: None,
        }
    }

    /// Splits a comma-separated `Type.CONST` list as it appears in rule
    /// descriptors.
    #[must_use]
    pub fn parse_symbol_list(raw: &str) -> Vec<String> {
        raw.split(", ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Returns the owner key this rule is indexed under.
    #[must_use]
    pub fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    /// Returns the declared argument offset (receiver slot excluded).
    #[must_use]
    pub const fn argument_offset(&self) -> usize {
        self.argument_offset
    }

    /// Returns `true` if the rule's values form an OR-combinable bitmask
    /// domain rather than a closed enumeration.
    #[must_use]
    pub const fn is_flag(&self) -> bool {
        self.is_flag
    }

    /// Returns the rule source name (library or platform).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the raw dotted symbol names.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Returns the value kind, fixed at construction.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns the resolved symbol map, if attached.
    #[must_use]
    pub const fn map(&self) -> Option<&SymbolMap> {
        self.map.as_ref()
    }

    /// Attaches the shared symbol map.
    ///
    /// The map's kind must equal the rule's kind; a mismatch is a
    /// programming error in the resolver and is rejected in debug builds.
    pub fn set_map(&mut self, map: SymbolMap) {
        debug_assert_eq!(map.kind(), self.kind);
        self.map = Some(map);
    }
}
