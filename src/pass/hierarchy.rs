//! Type hierarchy access for owner-set expansion.
//!
//! Rules are indexed under the type that declares an API, but call sites
//! name whatever subtype the decompiled code happened to use. The pass
//! therefore scans the declared type first and then its ancestors, in
//! exactly the order the provider supplies them; no canonical depth-first
//! or breadth-first order is imposed on top.

use std::collections::HashMap;

/// Supplies ancestor type names for owner-set expansion.
///
/// Implementations must be total and pure: unknown types yield an empty
/// sequence, never an error. The returned order is authoritative for match
/// resolution.
pub trait TypeHierarchy: Send + Sync {
    /// Returns the ancestors of `type_name`, nearest first as far as the
    /// host type system knows them.
    fn ancestors_of(&self, type_name: &str) -> Vec<String>;
}

/// A hierarchy that knows no ancestors. Useful when only exact-owner rules
/// should apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyHierarchy;

impl TypeHierarchy for EmptyHierarchy {
    fn ancestors_of(&self, _type_name: &str) -> Vec<String> {
        Vec::new()
    }
}

/// A map-backed hierarchy, pre-populated by the host (or a test).
#[derive(Debug, Clone, Default)]
pub struct MapHierarchy {
    ancestors: HashMap<String, Vec<String>>,
}

impl MapHierarchy {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the ordered ancestor list of a type.
    pub fn add(
        &mut self,
        type_name: impl Into<String>,
        ancestors: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.ancestors.insert(
            type_name.into(),
            ancestors.into_iter().map(Into::into).collect(),
        );
    }
}

impl TypeHierarchy for MapHierarchy {
    fn ancestors_of(&self, type_name: &str) -> Vec<String> {
        self.ancestors.get(type_name).cloned().unwrap_or_default()
    }
}
