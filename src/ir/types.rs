//! Type and reference descriptors shared across the routine IR.
//!
//! These are rendered identities, not resolved type-system handles: the
//! decompiler that owns the real type system hands the pass declared owner
//! and parameter type names as strings, and the pass only compares and
//! re-emits them.

use std::fmt;

/// The rendered type of an IR value slot.
///
/// Mirrors the narrowed type lattice a Java-bytecode decompiler works with.
/// Numeric constants in the IR are untyped 64-bit payloads; the slot type
/// decides how a literal is rendered and which replacements are assignable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    /// Type inference has not produced a result yet.
    Unknown,
    /// `boolean`
    Boolean,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// An unresolved narrow numeric type (`int`/`short`/`byte`/`char`).
    ///
    /// Used when a literal must be numeric but the exact width is not
    /// recoverable, e.g. a non-zero literal flowing into an object-typed
    /// slot.
    NarrowNumbers,
    /// A reference type with its fully qualified name.
    Object(String),
}

impl ArgType {
    /// The `java.lang.String` reference type.
    #[must_use]
    pub fn string() -> Self {
        Self::Object("java.lang.String".to_string())
    }

    /// Returns `true` for reference types.
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Returns `true` for primitive numeric types (including the narrow
    /// placeholder).
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Int
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::NarrowNumbers
        )
    }

    /// Whether a value of type `other` can occupy a slot of this type.
    ///
    /// `Unknown` accepts anything on either side. `NarrowNumbers` unifies
    /// with any numeric type and is also admitted into object slots: it is
    /// the rendered fallback for a non-zero numeric literal flowing into a
    /// reference-typed slot, so an object slot must take it. Otherwise
    /// types must agree on the numeric/reference divide and, for
    /// references, on the exact name.
    #[must_use]
    pub fn accepts(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unknown, _) | (_, Self::Unknown) => true,
            (Self::NarrowNumbers, o) => o.is_numeric(),
            (Self::Object(_), Self::NarrowNumbers) => true,
            (s, Self::NarrowNumbers) => s.is_numeric(),
            (Self::Object(a), Self::Object(b)) => a == b,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "?"),
            Self::Boolean => write!(f, "boolean"),
            Self::Int => write!(f, "int"),
            Self::Long => write!(f, "long"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::NarrowNumbers => write!(f, "narrow"),
            Self::Object(name) => write!(f, "{name}"),
        }
    }
}

/// Identity of a declared static constant: owning type plus field name.
///
/// Carries no value. It is only ever substituted in place of a literal, so
/// the owning type's rendered name is all the pass needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    owner: String,
    name: String,
}

impl FieldRef {
    /// Creates a field reference from an owning type and a field name.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Returns the fully qualified owning type name.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// The statically declared target of an invoke instruction.
///
/// All components are rendered type names as the decompiler declares them;
/// the declared owner may differ from the type that actually carries the
/// rules (owner-set expansion walks the ancestors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    owner: String,
    return_type: String,
    name: String,
    param_types: Vec<String>,
}

impl MethodSig {
    /// Creates a method signature descriptor.
    #[must_use]
    pub fn new(
        owner: impl Into<String>,
        return_type: impl Into<String>,
        name: impl Into<String>,
        param_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            owner: owner.into(),
            return_type: return_type.into(),
            name: name.into(),
            param_types: param_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the declaring type name.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the rendered return type name.
    #[must_use]
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ordered rendered parameter type names.
    #[must_use]
    pub fn param_types(&self) -> &[String] {
        &self.param_types
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}({})",
            self.owner,
            self.return_type,
            self.name,
            self.param_types.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_type_accepts_unknown() {
        assert!(ArgType::Unknown.accepts(&ArgType::Int));
        assert!(ArgType::Int.accepts(&ArgType::Unknown));
    }

    #[test]
    fn test_arg_type_accepts_narrow() {
        assert!(ArgType::Int.accepts(&ArgType::NarrowNumbers));
        assert!(ArgType::NarrowNumbers.accepts(&ArgType::Long));
        assert!(!ArgType::NarrowNumbers.accepts(&ArgType::string()));
    }

    #[test]
    fn test_object_slot_admits_narrow_fallback() {
        let slot = ArgType::Object("java.lang.Object".into());
        assert!(slot.accepts(&ArgType::NarrowNumbers));
        assert!(!slot.accepts(&ArgType::Int));
    }

    #[test]
    fn test_arg_type_rejects_cross_kind() {
        assert!(!ArgType::string().accepts(&ArgType::Int));
        assert!(!ArgType::Int.accepts(&ArgType::string()));
    }

    #[test]
    fn test_arg_type_object_names_must_match() {
        let a = ArgType::Object("android.view.View".into());
        let b = ArgType::Object("android.content.Intent".into());
        assert!(a.accepts(&a.clone()));
        assert!(!a.accepts(&b));
    }

    #[test]
    fn test_field_ref_display() {
        let field = FieldRef::new("android.view.View", "VISIBLE");
        assert_eq!(format!("{field}"), "android.view.View.VISIBLE");
        assert_eq!(field.owner(), "android.view.View");
        assert_eq!(field.name(), "VISIBLE");
    }

    #[test]
    fn test_method_sig_display() {
        let sig = MethodSig::new("android.view.View", "void", "setVisibility", ["int"]);
        assert_eq!(format!("{sig}"), "android.view.View void setVisibility(int)");
    }
}
