//! The type lattice: canonicalization, assignability, and literal inference.

use serde_json::Value;
use std::fmt;

/// A type name canonicalized per the lattice's alias rules.
///
/// `Other` preserves any type name the lattice doesn't recognize verbatim
/// (identity), since catalogs may declare arbitrary port type names for
/// `lib`-backed nodes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalType {
    Double,
    Int,
    String,
    Bool,
    Any,
    Other(String),
}

impl CanonicalType {
    /// Canonicalize a raw type name: `number|double|float` → `Double`,
    /// `int` → `Int`, `string` → `String`, `bool` → `Bool`, `any|auto` →
    /// `Any`, anything else kept verbatim.
    pub fn canonicalize(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "number" | "double" | "float" => CanonicalType::Double,
            "int" => CanonicalType::Int,
            "string" => CanonicalType::String,
            "bool" => CanonicalType::Bool,
            "any" | "auto" => CanonicalType::Any,
            _ => CanonicalType::Other(raw.to_string()),
        }
    }

    /// The canonical name as it should appear in diagnostics (the original
    /// spelling for `Other`, the canonical family name otherwise).
    pub fn name(&self) -> &str {
        match self {
            CanonicalType::Double => "double",
            CanonicalType::Int => "int",
            CanonicalType::String => "string",
            CanonicalType::Bool => "bool",
            CanonicalType::Any => "any",
            CanonicalType::Other(s) => s,
        }
    }

    /// The C++ spelling used when declaring a variable or return type of
    /// this type (as opposed to [`name`](Self::name), used in diagnostics).
    pub fn cpp_type(&self) -> String {
        match self {
            CanonicalType::Double => "double".to_string(),
            CanonicalType::Int => "int".to_string(),
            CanonicalType::Bool => "bool".to_string(),
            CanonicalType::String => "std::string".to_string(),
            CanonicalType::Any => "auto".to_string(),
            CanonicalType::Other(s) => s.clone(),
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonicalize a raw type name. Shorthand for [`CanonicalType::canonicalize`].
pub fn canonicalize(raw: &str) -> CanonicalType {
    CanonicalType::canonicalize(raw)
}

/// Whether a value of actual type `actual` may be assigned to a destination
/// expecting `expected`, under the lattice's widening rules.
///
/// `any` is compatible with everything in either position; otherwise types
/// must match exactly, except that `int` widens to `double`.
pub fn is_assignable(expected: &str, actual: &str) -> bool {
    let e = CanonicalType::canonicalize(expected);
    let a = CanonicalType::canonicalize(actual);
    if e == CanonicalType::Any || a == CanonicalType::Any {
        return true;
    }
    if e == a {
        return true;
    }
    matches!((&e, &a), (CanonicalType::Double, CanonicalType::Int))
}

/// A literal value as carried in a node's `properties.value`.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other,
}

impl Scalar {
    /// Classify a raw JSON property value, matching the order booleans are
    /// checked before integers (booleans subset integers in JSON numerics,
    /// so this must be explicit).
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(b)) => Scalar::Bool(*b),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Scalar::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Scalar::Float(f)
                } else {
                    Scalar::Other
                }
            }
            Some(Value::String(s)) => Scalar::Text(s.clone()),
            _ => Scalar::Other,
        }
    }

    /// The canonical type this literal infers to: `bool`, `int`, `double`,
    /// `string`, or `any`.
    pub fn canonical_type(&self) -> CanonicalType {
        match self {
            Scalar::Bool(_) => CanonicalType::Bool,
            Scalar::Int(_) => CanonicalType::Int,
            Scalar::Float(_) => CanonicalType::Double,
            Scalar::Text(_) => CanonicalType::String,
            Scalar::Other => CanonicalType::Any,
        }
    }
}

/// Infer a literal's canonical type name from its raw property value.
pub fn infer_literal_type(value: Option<&Value>) -> CanonicalType {
    Scalar::from_json(value).canonical_type()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_canonicalize() {
        assert_eq!(canonicalize("number"), CanonicalType::Double);
        assert_eq!(canonicalize("float"), CanonicalType::Double);
        assert_eq!(canonicalize("DOUBLE"), CanonicalType::Double);
        assert_eq!(canonicalize("auto"), CanonicalType::Any);
        assert_eq!(
            canonicalize("Widget"),
            CanonicalType::Other("Widget".to_string())
        );
    }

    #[test]
    fn widening_is_one_directional() {
        assert!(is_assignable("double", "int"));
        assert!(!is_assignable("int", "double"));
    }

    #[test]
    fn any_is_universally_compatible() {
        assert!(is_assignable("any", "string"));
        assert!(is_assignable("int", "any"));
    }

    #[test]
    fn literal_inference_checks_bool_before_int() {
        let v = Value::Bool(true);
        assert_eq!(infer_literal_type(Some(&v)), CanonicalType::Bool);
        let v = serde_json::json!(3);
        assert_eq!(infer_literal_type(Some(&v)), CanonicalType::Int);
        let v = serde_json::json!(3.5);
        assert_eq!(infer_literal_type(Some(&v)), CanonicalType::Double);
        let v = serde_json::json!("hi");
        assert_eq!(infer_literal_type(Some(&v)), CanonicalType::String);
        assert_eq!(infer_literal_type(None), CanonicalType::Any);
    }
}
