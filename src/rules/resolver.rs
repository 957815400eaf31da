//! Constant resolution: turning raw name/value pairs into shared symbol maps.
//!
//! The resolver consumes a raw constant table (`Type.CONST=literalText`
//! lines extracted offline from compiled constant pools) and, for every
//! rule in an index, builds the mapping from parsed literal value to field
//! reference. Maps are cached per `(owner key, value kind)` and attached to
//! rules by shared reference, because several rules routinely point at the
//! same enum family.
//!
//! Resolution never aborts: a symbol with no table entry, or whose text
//! does not parse for its declared kind, is skipped with a diagnostic.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::warn;

use crate::ir::FieldRef;
use crate::rules::{OwnerKey, RuleIndex, SymbolMap, ValueKind};

/// Raw constant table: fully qualified constant name to literal text.
#[derive(Debug, Default)]
pub struct ConstantTable {
    values: HashMap<String, String>,
}

impl ConstantTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `fully.qualified.Type.CONST=literalText` lines.
    ///
    /// Blank lines and `#` comments are skipped; lines without a `=` are
    /// skipped with a warning. Later entries win over earlier duplicates.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut table = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('=') {
                Some((name, value)) if !name.is_empty() => {
                    table.insert(name.trim(), value.trim());
                }
                _ => {
                    warn!(line = idx + 1, text = line, "skipping malformed constant table line");
                }
            }
        }
        table
    }

    /// Inserts one name/value pair.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Looks up the literal text of a fully qualified constant name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Builds and caches symbol maps per `(owner key, value kind)`.
///
/// Construction runs once, single-threaded, before any routine is
/// processed; the attached maps are read-only snapshots afterwards.
#[derive(Debug, Default)]
pub struct ConstantResolver {
    int_maps: HashMap<OwnerKey, Arc<BTreeMap<i32, FieldRef>>>,
    long_maps: HashMap<OwnerKey, Arc<BTreeMap<i64, FieldRef>>>,
    str_maps: HashMap<OwnerKey, Arc<BTreeMap<String, FieldRef>>>,
}

impl ConstantResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a symbol map to every rule in the index, building each
    /// `(owner key, kind)` map once and sharing it by reference.
    pub fn attach_maps(&mut self, index: &mut RuleIndex, table: &ConstantTable) {
        for (key, rules) in index.iter_mut() {
            for rule in rules.iter_mut() {
                let map = match rule.kind() {
                    ValueKind::Int => {
                        let arc = self
                            .int_maps
                            .entry(key.clone())
                            .or_insert_with(|| {
                                Arc::new(build_map(rule.symbols(), table, parse_int))
                            })
                            .clone();
                        SymbolMap::Int(arc)
                    }
                    ValueKind::Long => {
                        let arc = self
                            .long_maps
                            .entry(key.clone())
                            .or_insert_with(|| {
                                Arc::new(build_map(rule.symbols(), table, parse_long))
                            })
                            .clone();
                        SymbolMap::Long(arc)
                    }
                    ValueKind::Str => {
                        let arc = self
                            .str_maps
                            .entry(key.clone())
                            .or_insert_with(|| {
                                Arc::new(build_map(rule.symbols(), table, parse_str))
                            })
                            .clone();
                        SymbolMap::Str(arc)
                    }
                };
                rule.set_map(map);
            }
        }
    }

    /// Returns the number of distinct maps built so far.
    #[must_use]
    pub fn map_count(&self) -> usize {
        self.int_maps.len() + self.long_maps.len() + self.str_maps.len()
    }
}

fn parse_int(text: &str) -> Option<i32> {
    text.parse().ok()
}

fn parse_long(text: &str) -> Option<i64> {
    text.parse().ok()
}

fn parse_str(text: &str) -> Option<String> {
    Some(text.to_string())
}

/// Resolves a dotted symbol list against the raw table.
///
/// Each `Type.CONST` name is split at the last dot into owning type and
/// constant name. Missing table entries and unparsable values are skipped
/// with a diagnostic; the build never fails.
fn build_map<T: Ord>(
    symbols: &[String],
    table: &ConstantTable,
    parse: fn(&str) -> Option<T>,
) -> BTreeMap<T, FieldRef> {
    let mut map = BTreeMap::new();
    for symbol in symbols {
        let Some((owner, constant)) = symbol.rsplit_once('.') else {
            warn!(symbol, "ignoring symbol without an owning type");
            continue;
        };
        let Some(text) = table.get(symbol) else {
            warn!(symbol, "no constant value found");
            continue;
        };
        let Some(value) = parse(text) else {
            warn!(symbol, text, "constant value does not parse for its kind");
            continue;
        };
        map.insert(value, FieldRef::new(owner, constant));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;

    fn key() -> OwnerKey {
        OwnerKey::new("android.view.View", "void", "setVisibility", &["int".into()])
    }

    fn table() -> ConstantTable {
        ConstantTable::parse(
            "android.view.View.VISIBLE=0\n\
             android.view.View.INVISIBLE=4\n\
             android.view.View.GONE=8\n",
        )
    }

    #[test]
    fn test_parse_table() {
        let table = ConstantTable::parse(
            "# comment\n\
             \n\
             a.B.C=1\n\
             garbage-line\n\
             a.B.D = 2\n",
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a.B.C"), Some("1"));
        assert_eq!(table.get("a.B.D"), Some("2"));
    }

    #[test]
    fn test_build_skips_unresolved_and_unparsable() {
        let mut table = table();
        table.insert("android.view.View.BAD", "not-a-number");
        let symbols = vec![
            "android.view.View.VISIBLE".to_string(),
            "android.view.View.MISSING".to_string(),
            "android.view.View.BAD".to_string(),
            "no-dot".to_string(),
        ];
        let map = build_map(&symbols, &table, parse_int);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&0], FieldRef::new("android.view.View", "VISIBLE"));
    }

    #[test]
    fn test_maps_shared_across_rules_with_same_key_and_kind() {
        let mut index = RuleIndex::new();
        let symbols = Rule::parse_symbol_list(
            "android.view.View.VISIBLE, android.view.View.INVISIBLE, android.view.View.GONE",
        );
        index.insert(Rule::new(
            key(),
            0,
            false,
            "Android SDK",
            ValueKind::Int,
            symbols.clone(),
        ));
        index.insert(Rule::new(
            key(),
            1,
            false,
            "Android SDK",
            ValueKind::Int,
            symbols,
        ));

        let mut resolver = ConstantResolver::new();
        resolver.attach_maps(&mut index, &table());

        assert_eq!(resolver.map_count(), 1);
        let rules = index.lookup(&key());
        let (SymbolMap::Int(a), SymbolMap::Int(b)) =
            (rules[0].map().unwrap(), rules[1].map().unwrap())
        else {
            panic!("expected int maps");
        };
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_long_and_string_kinds() {
        let mut index = RuleIndex::new();
        let lkey = OwnerKey::new("a.Clock", "void", "setMillis", &["long".into()]);
        let skey = OwnerKey::new("a.Ctx", "Object", "getSystemService", &["java.lang.String".into()]);
        index.insert(Rule::new(
            lkey.clone(),
            0,
            false,
            "Android SDK",
            ValueKind::Long,
            vec!["a.Clock.EPOCH".to_string()],
        ));
        index.insert(Rule::new(
            skey.clone(),
            0,
            false,
            "Android SDK",
            ValueKind::Str,
            vec!["a.Ctx.WINDOW_SERVICE".to_string()],
        ));

        let mut table = ConstantTable::new();
        table.insert("a.Clock.EPOCH", "0");
        table.insert("a.Ctx.WINDOW_SERVICE", "window");

        let mut resolver = ConstantResolver::new();
        resolver.attach_maps(&mut index, &table);

        assert!(index.lookup(&lkey)[0]
            .map()
            .unwrap()
            .get_numeric(0)
            .is_some());
        assert!(index.lookup(&skey)[0]
            .map()
            .unwrap()
            .get_str("window")
            .is_some());
    }
}
