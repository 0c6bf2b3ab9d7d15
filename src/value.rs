//! Value - the tagged variant every variable, parameter binding, and config
//! store property is ultimately stored as.
//!
//! Type Coercion (spec C1) is the single choke point that produces these
//! from raw tokens; everything else in the crate consumes `Value`.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A runtime value. Untyped at rest (as spec C2 describes variables), but
/// every value carries its own tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Path(PathBuf),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(IndexMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness as used by `if`/`while` condition evaluation and the
    /// sandboxed expression evaluator's `and`/`or`/`not`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Path(p) => !p.as_os_str().is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::Dict(d) => !d.is_empty(),
        }
    }

    /// The type name as it would be reported in an error message.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::Path(_) => "Path",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            Value::Tuple(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_repr(f, item)?;
                }
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_repr(f, item)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Dict(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': ", k)?;
                    write_repr(f, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_repr(f: &mut fmt::Formatter<'_>, v: &Value) -> fmt::Result {
    match v {
        Value::String(s) => write!(f, "'{}'", s),
        other => write!(f, "{}", other),
    }
}

/// A declared static type, as would appear on a command parameter field or
/// be inferred for a variable's type hint.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Str,
    Int,
    Float,
    Bool,
    Path,
    Any,
    List(Box<TypeSpec>),
    /// Fixed-arity tuple, or variable-arity when `variadic` is true (the
    /// head type repeats, matching `Tuple[T, ...]`).
    Tuple(Vec<TypeSpec>, bool),
    Dict(Box<TypeSpec>, Box<TypeSpec>),
    Optional(Box<TypeSpec>),
    Union(Vec<TypeSpec>),
}

impl TypeSpec {
    pub fn optional(inner: TypeSpec) -> TypeSpec {
        TypeSpec::Optional(Box::new(inner))
    }

    pub fn list_of(inner: TypeSpec) -> TypeSpec {
        TypeSpec::List(Box::new(inner))
    }

    pub fn dict_of(key: TypeSpec, value: TypeSpec) -> TypeSpec {
        TypeSpec::Dict(Box::new(key), Box::new(value))
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Str => write!(f, "str"),
            TypeSpec::Int => write!(f, "int"),
            TypeSpec::Float => write!(f, "float"),
            TypeSpec::Bool => write!(f, "bool"),
            TypeSpec::Path => write!(f, "Path"),
            TypeSpec::Any => write!(f, "Any"),
            TypeSpec::List(inner) => write!(f, "List[{}]", inner),
            TypeSpec::Tuple(items, variadic) => {
                write!(f, "Tuple[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if *variadic {
                    write!(f, ", ...")?;
                }
                write!(f, "]")
            }
            TypeSpec::Dict(k, v) => write!(f, "Dict[{}, {}]", k, v),
            TypeSpec::Optional(inner) => write!(f, "Optional[{}]", inner),
            TypeSpec::Union(items) => {
                write!(f, "Union[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_python_semantics() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
    }

    #[test]
    fn display_renders_bool_as_python_literal() {
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Bool(false).to_string(), "False");
    }

    #[test]
    fn display_renders_list_with_quoted_strings() {
        let v = Value::List(vec![Value::String("a".into()), Value::Int(1)]);
        assert_eq!(v.to_string(), "['a', 1]");
    }
}
