//! Type Coercion (spec C1) — the single choke point that turns textual
//! tokens, or already-typed `Value`s, into values of a declared `TypeSpec`.
//!
//! Grounded in the teacher's `interpreter/helpers/*` style: small, free
//! functions operating on plain data, gathered under one module rather than
//! a struct with methods.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::TypeConversionError;
use crate::value::{TypeSpec, Value};

const TRUE_WORDS: &[&str] = &["true", "yes", "y", "t", "1"];
const FALSE_WORDS: &[&str] = &["false", "no", "n", "f", "0"];

/// Convert a raw command-line token into a value of the declared type.
/// This is the entry point argument binding (C4) uses.
pub fn convert_from_str(raw: &str, target: &TypeSpec) -> Result<Value, TypeConversionError> {
    convert(Value::String(raw.to_string()), target)
}

/// Convert an already-typed value (or a raw string wrapped as `Value::String`)
/// into a value of the declared type. This is also the function the
/// Variable Manager uses for `get_typed`/`set(..., type_hint)`.
pub fn convert(value: Value, target: &TypeSpec) -> Result<Value, TypeConversionError> {
    // None/missing -> None, regardless of target. The caller decides
    // whether a missing mandatory value is an error.
    if let Value::Null = value {
        return Ok(Value::Null);
    }

    match target {
        TypeSpec::Any => Ok(value),
        TypeSpec::Str => convert_str(value),
        TypeSpec::Bool => convert_bool(value),
        TypeSpec::Int => convert_int(value),
        TypeSpec::Float => convert_float(value),
        TypeSpec::Path => convert_path(value),
        TypeSpec::Optional(inner) => convert(value, inner),
        TypeSpec::Union(branches) => convert_union(value, branches),
        TypeSpec::List(elem) => convert_list(value, elem),
        TypeSpec::Tuple(items, variadic) => convert_tuple(value, items, *variadic),
        TypeSpec::Dict(key, val) => convert_dict(value, key, val),
    }
}

fn convert_str(value: Value) -> Result<Value, TypeConversionError> {
    match value {
        Value::String(s) => Ok(Value::String(s)),
        other => Ok(Value::String(other.to_string())),
    }
}

fn convert_bool(value: Value) -> Result<Value, TypeConversionError> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(b)),
        Value::String(s) => {
            let lower = s.to_lowercase();
            if TRUE_WORDS.contains(&lower.as_str()) {
                Ok(Value::Bool(true))
            } else if FALSE_WORDS.contains(&lower.as_str()) {
                Ok(Value::Bool(false))
            } else {
                Err(TypeConversionError::new(s, "bool"))
            }
        }
        other => Err(TypeConversionError::new(other.to_string(), "bool")),
    }
}

fn convert_int(value: Value) -> Result<Value, TypeConversionError> {
    match value {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| TypeConversionError::with_cause(s, "int", e.to_string())),
        other => Err(TypeConversionError::new(other.to_string(), "int")),
    }
}

fn convert_float(value: Value) -> Result<Value, TypeConversionError> {
    match value {
        Value::Float(f) => Ok(Value::Float(f)),
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| TypeConversionError::with_cause(s, "float", e.to_string())),
        other => Err(TypeConversionError::new(other.to_string(), "float")),
    }
}

fn convert_path(value: Value) -> Result<Value, TypeConversionError> {
    match value {
        Value::Path(p) => Ok(Value::Path(p)),
        Value::String(s) => Ok(Value::Path(expand_home(&s))),
        other => Err(TypeConversionError::new(other.to_string(), "Path")),
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix('~') {
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}

fn type_matches(value: &Value, spec: &TypeSpec) -> bool {
    matches!(
        (value, spec),
        (Value::String(_), TypeSpec::Str)
            | (Value::Bool(_), TypeSpec::Bool)
            | (Value::Int(_), TypeSpec::Int)
            | (Value::Float(_), TypeSpec::Float)
            | (Value::Path(_), TypeSpec::Path)
            | (Value::List(_), TypeSpec::List(_))
            | (Value::Tuple(_), TypeSpec::Tuple(_, _))
            | (Value::Dict(_), TypeSpec::Dict(_, _))
    )
}

fn convert_union(value: Value, branches: &[TypeSpec]) -> Result<Value, TypeConversionError> {
    // Preserve a value that already matches one of the branch shapes
    // (important for lists/dicts of Union, and for idempotence).
    for branch in branches {
        if type_matches(&value, branch) {
            return convert(value.clone(), branch);
        }
    }

    let mut last_err = None;
    for branch in branches {
        match convert(value.clone(), branch) {
            Ok(v) => return Ok(v),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        TypeConversionError::new(
            value.to_string(),
            format!(
                "Union[{}]",
                branches
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
    }))
}

fn convert_list(value: Value, elem: &TypeSpec) -> Result<Value, TypeConversionError> {
    let raw_items = match value {
        Value::List(items) => items,
        Value::Tuple(items) => items,
        Value::String(s) => parse_container_text(&s, ContainerShape::List)?,
        other => return Err(TypeConversionError::new(other.to_string(), format!("List[{}]", elem))),
    };
    let mut out = Vec::with_capacity(raw_items.len());
    for item in raw_items {
        out.push(convert(item, elem)?);
    }
    Ok(Value::List(out))
}

fn convert_tuple(value: Value, items: &[TypeSpec], variadic: bool) -> Result<Value, TypeConversionError> {
    let raw_items = match value {
        Value::List(v) => v,
        Value::Tuple(v) => v,
        Value::String(s) => parse_container_text(&s, ContainerShape::List)?,
        other => {
            return Err(TypeConversionError::new(
                other.to_string(),
                format!("Tuple[{}{}]", items.first().map(|t| t.to_string()).unwrap_or_default(), if variadic { ", ..." } else { "" }),
            ))
        }
    };

    if variadic {
        let head = items.first().cloned().unwrap_or(TypeSpec::Any);
        let mut out = Vec::with_capacity(raw_items.len());
        for item in raw_items {
            out.push(convert(item, &head)?);
        }
        Ok(Value::Tuple(out))
    } else {
        if raw_items.len() != items.len() {
            return Err(TypeConversionError::new(
                format!("{} items", raw_items.len()),
                format!("tuple of arity {}", items.len()),
            ));
        }
        let mut out = Vec::with_capacity(items.len());
        for (item, ty) in raw_items.into_iter().zip(items.iter()) {
            out.push(convert(item, ty)?);
        }
        Ok(Value::Tuple(out))
    }
}

fn convert_dict(value: Value, key: &TypeSpec, val: &TypeSpec) -> Result<Value, TypeConversionError> {
    let raw_map = match value {
        Value::Dict(m) => m,
        Value::String(s) => match parse_container_text(&s, ContainerShape::Dict)? {
            // parse_container_text returns a single-element List[Dict] wrapper
            // for the dict shape; unwrap it.
            mut items => match items.pop() {
                Some(Value::Dict(m)) => m,
                _ => return Err(TypeConversionError::new(s, format!("Dict[{}, {}]", key, val))),
            },
        },
        other => return Err(TypeConversionError::new(other.to_string(), format!("Dict[{}, {}]", key, val))),
    };

    let mut out = IndexMap::with_capacity(raw_map.len());
    for (k, v) in raw_map {
        let coerced_key = match key {
            TypeSpec::Str | TypeSpec::Any => k.clone(),
            other => {
                return Err(TypeConversionError::new(
                    k,
                    format!("dict key type {} is unsupported (only str keys are normalized)", other),
                ))
            }
        };
        out.insert(coerced_key, convert(v, val)?);
    }
    Ok(Value::Dict(out))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ContainerShape {
    List,
    Dict,
}

/// Attempt JSON, then Python-literal, then (for list shape with no explicit
/// opener) CSV-with-trimming. Returns the parsed elements: for `List` shape
/// this is the list's items; for `Dict` shape this is a single-element
/// vector wrapping the parsed `Value::Dict` (kept as `Vec` so both shapes
/// share a return type).
fn parse_container_text(raw: &str, shape: ContainerShape) -> Result<Vec<Value>, TypeConversionError> {
    let trimmed = raw.trim();

    if let Some(v) = try_parse_json(trimmed) {
        if let Some(items) = shape_match(&v, shape) {
            return Ok(items);
        }
    }

    if let Some(v) = try_parse_python_literal(trimmed) {
        if let Some(items) = shape_match(&v, shape) {
            return Ok(items);
        }
    }

    if shape == ContainerShape::List && !starts_with_opener(trimmed) {
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(trimmed.split(',').map(|s| Value::String(s.trim().to_string())).collect());
    }

    let target_name = match shape {
        ContainerShape::List => "list",
        ContainerShape::Dict => "dict",
    };
    Err(TypeConversionError::new(raw, target_name))
}

fn shape_match(v: &Value, shape: ContainerShape) -> Option<Vec<Value>> {
    match (v, shape) {
        (Value::List(items), ContainerShape::List) => Some(items.clone()),
        (Value::Tuple(items), ContainerShape::List) => Some(items.clone()),
        (Value::Dict(_), ContainerShape::Dict) => Some(vec![v.clone()]),
        _ => None,
    }
}

fn starts_with_opener(s: &str) -> bool {
    matches!(s.chars().next(), Some('[') | Some('{') | Some('('))
}

fn try_parse_json(s: &str) -> Option<Value> {
    let parsed: serde_json::Value = serde_json::from_str(s).ok()?;
    Some(json_to_value(parsed))
}

fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::List(items.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            Value::Dict(map.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// A minimal Python-literal parser: single/double quoted strings with
/// backslash escapes, `True`/`False`/`true`/`false`, `None`/`null`,
/// integers, floats, lists `[...]`, tuples `(...)`, dicts `{...}`.
fn try_parse_python_literal(s: &str) -> Option<Value> {
    let mut chars = s.char_indices().peekable();
    let v = parse_literal_value(s, &mut chars)?;
    skip_ws(s, &mut chars);
    if chars.peek().is_some() {
        return None;
    }
    Some(v)
}

type CharIter<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn skip_ws(_s: &str, chars: &mut CharIter) {
    while let Some(&(_, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else {
            break;
        }
    }
}

fn parse_literal_value(s: &str, chars: &mut CharIter) -> Option<Value> {
    skip_ws(s, chars);
    let &(idx, c) = chars.peek()?;
    match c {
        '[' => parse_literal_seq(s, chars, '[', ']').map(Value::List),
        '(' => parse_literal_seq(s, chars, '(', ')').map(Value::Tuple),
        '{' => parse_literal_dict(s, chars),
        '\'' | '"' => parse_literal_string(s, chars),
        _ => {
            let word_end = s[idx..]
                .find(|ch: char| ch == ',' || ch == ']' || ch == '}' || ch == ')' || ch.is_whitespace())
                .map(|o| idx + o)
                .unwrap_or(s.len());
            let word = &s[idx..word_end];
            for _ in 0..word.chars().count() {
                chars.next();
            }
            parse_literal_scalar(word)
        }
    }
}

fn parse_literal_scalar(word: &str) -> Option<Value> {
    match word {
        "True" | "true" => Some(Value::Bool(true)),
        "False" | "false" => Some(Value::Bool(false)),
        "None" | "null" => Some(Value::Null),
        _ => {
            if let Ok(i) = word.parse::<i64>() {
                Some(Value::Int(i))
            } else {
                word.parse::<f64>().ok().map(Value::Float)
            }
        }
    }
}

fn parse_literal_string(s: &str, chars: &mut CharIter) -> Option<Value> {
    let (_, quote) = chars.next()?;
    let mut out = String::new();
    loop {
        let (_, c) = chars.next()?;
        if c == quote {
            break;
        }
        if c == '\\' {
            let (_, escaped) = chars.next()?;
            out.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
        } else {
            out.push(c);
        }
    }
    let _ = s;
    Some(Value::String(out))
}

fn parse_literal_seq(s: &str, chars: &mut CharIter, open: char, close: char) -> Option<Vec<Value>> {
    let (_, c) = chars.next()?;
    if c != open {
        return None;
    }
    let mut items = Vec::new();
    skip_ws(s, chars);
    if chars.peek().map(|&(_, c)| c) == Some(close) {
        chars.next();
        return Some(items);
    }
    loop {
        let v = parse_literal_value(s, chars)?;
        items.push(v);
        skip_ws(s, chars);
        match chars.peek().map(|&(_, c)| c) {
            Some(',') => {
                chars.next();
                skip_ws(s, chars);
                if chars.peek().map(|&(_, c)| c) == Some(close) {
                    chars.next();
                    break;
                }
            }
            Some(c) if c == close => {
                chars.next();
                break;
            }
            _ => return None,
        }
    }
    Some(items)
}

fn parse_literal_dict(s: &str, chars: &mut CharIter) -> Option<Value> {
    let (_, c) = chars.next()?;
    if c != '{' {
        return None;
    }
    let mut map = IndexMap::new();
    skip_ws(s, chars);
    if chars.peek().map(|&(_, c)| c) == Some('}') {
        chars.next();
        return Some(Value::Dict(map));
    }
    loop {
        let key = parse_literal_value(s, chars)?;
        let key_str = match key {
            Value::String(k) => k,
            other => other.to_string(),
        };
        skip_ws(s, chars);
        if chars.next().map(|(_, c)| c) != Some(':') {
            return None;
        }
        let value = parse_literal_value(s, chars)?;
        map.insert(key_str, value);
        skip_ws(s, chars);
        match chars.peek().map(|&(_, c)| c) {
            Some(',') => {
                chars.next();
                skip_ws(s, chars);
                if chars.peek().map(|&(_, c)| c) == Some('}') {
                    chars.next();
                    break;
                }
            }
            Some('}') => {
                chars.next();
                break;
            }
            _ => return None,
        }
    }
    Some(Value::Dict(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotence_for_matching_type() {
        let v = Value::Int(5);
        assert_eq!(convert(v.clone(), &TypeSpec::Int).unwrap(), v);
    }

    #[test]
    fn bool_recognizes_word_sets_case_insensitively() {
        for w in ["true", "YES", "Y", "t", "1"] {
            assert_eq!(convert_from_str(w, &TypeSpec::Bool).unwrap(), Value::Bool(true));
        }
        for w in ["false", "NO", "n", "f", "0"] {
            assert_eq!(convert_from_str(w, &TypeSpec::Bool).unwrap(), Value::Bool(false));
        }
    }

    #[test]
    fn bool_rejects_maybe() {
        assert!(convert_from_str("maybe", &TypeSpec::Bool).is_err());
    }

    #[test]
    fn path_expands_tilde_against_home() {
        std::env::set_var("HOME", "/home/tester");
        let v = convert_from_str("~/config.json", &TypeSpec::Path).unwrap();
        assert_eq!(v, Value::Path(PathBuf::from("/home/tester/config.json")));
    }

    #[test]
    fn container_round_trips_from_json() {
        let target = TypeSpec::list_of(TypeSpec::Int);
        let v = convert_from_str("[1, 2, 3]", &target).unwrap();
        assert_eq!(v, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn container_round_trips_from_python_literal() {
        let target = TypeSpec::list_of(TypeSpec::Str);
        let v = convert_from_str("['a', 'b']", &target).unwrap();
        assert_eq!(v, Value::List(vec![Value::String("a".into()), Value::String("b".into())]));
    }

    #[test]
    fn container_csv_fallback_when_no_opener() {
        let target = TypeSpec::list_of(TypeSpec::Str);
        let v = convert_from_str("a, b, c", &target).unwrap();
        assert_eq!(
            v,
            Value::List(vec![Value::String("a".into()), Value::String("b".into()), Value::String("c".into())])
        );
    }

    #[test]
    fn union_preserves_already_typed_runtime_value() {
        let union = TypeSpec::Union(vec![TypeSpec::Int, TypeSpec::Str]);
        let v = convert(Value::Int(5), &union).unwrap();
        assert_eq!(v, Value::Int(5));
    }

    #[test]
    fn union_tries_branches_in_order() {
        let union = TypeSpec::Union(vec![TypeSpec::Int, TypeSpec::Str]);
        let v = convert_from_str("hello", &union).unwrap();
        assert_eq!(v, Value::String("hello".into()));
    }

    #[test]
    fn optional_returns_none_for_null() {
        let opt = TypeSpec::optional(TypeSpec::Int);
        assert_eq!(convert(Value::Null, &opt).unwrap(), Value::Null);
    }

    #[test]
    fn tuple_fixed_arity_requires_exact_length() {
        let t = TypeSpec::Tuple(vec![TypeSpec::Int, TypeSpec::Str], false);
        assert!(convert_from_str("[1]", &t).is_err());
        let ok = convert_from_str("[1, 'a']", &t).unwrap();
        assert_eq!(ok, Value::Tuple(vec![Value::Int(1), Value::String("a".into())]));
    }

    #[test]
    fn tuple_variadic_accepts_any_length() {
        let t = TypeSpec::Tuple(vec![TypeSpec::Int], true);
        let ok = convert_from_str("[1, 2, 3, 4]", &t).unwrap();
        assert_eq!(ok.as_list().unwrap().len(), 4);
    }

    #[test]
    fn dict_round_trips_nested_values() {
        let t = TypeSpec::dict_of(TypeSpec::Str, TypeSpec::Int);
        let v = convert_from_str("{\"a\": 1, \"b\": 2}", &t).unwrap();
        match v {
            Value::Dict(m) => {
                assert_eq!(m.get("a"), Some(&Value::Int(1)));
                assert_eq!(m.get("b"), Some(&Value::Int(2)));
            }
            _ => panic!("expected dict"),
        }
    }

    #[test]
    fn clear_error_names_source_value_and_target_type() {
        let err = convert_from_str("notanumber", &TypeSpec::Int).unwrap_err();
        assert!(err.to_string().contains("notanumber"));
        assert!(err.to_string().contains("int"));
    }
}
