//! Variable Manager (spec C2): a typed name -> value table, the sandboxed
//! expression evaluator, and `$name`/`${expr}` interpolation.

pub mod expr;
pub mod interpolate;

use indexmap::IndexMap;

use crate::coerce;
use crate::error::{TypeConversionError, VariableEvaluationError};
use crate::value::{TypeSpec, Value};

/// Typed name -> value table. Starter defaults are populated at
/// construction: an empty server-name list, an empty path mapping, an
/// integer cleanup window, and a verbosity flag.
#[derive(Debug, Clone)]
pub struct VariableManager {
    vars: IndexMap<String, Value>,
}

impl Default for VariableManager {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableManager {
    pub fn new() -> Self {
        let mut vars = IndexMap::new();
        vars.insert("servers".to_string(), Value::List(Vec::new()));
        vars.insert("paths".to_string(), Value::Dict(IndexMap::new()));
        vars.insert("cleanup_days".to_string(), Value::Int(30));
        vars.insert("verbose".to_string(), Value::Bool(false));
        Self { vars }
    }

    /// Returns the raw value, or `default` if unset. If `type_hint` is
    /// given and coercion fails, the raw value is returned unchanged (not
    /// an error) — coercion failure here is advisory.
    pub fn get(&self, name: &str, default: Option<Value>, type_hint: Option<&TypeSpec>) -> Option<Value> {
        let raw = self.vars.get(name).cloned().or(default)?;
        match type_hint {
            Some(t) => Some(coerce::convert(raw.clone(), t).unwrap_or(raw)),
            None => Some(raw),
        }
    }

    /// Like [`get`](Self::get) but raises on coercion failure.
    pub fn get_typed(&self, name: &str, ty: &TypeSpec, default: Option<Value>) -> Result<Option<Value>, TypeConversionError> {
        let raw = match self.vars.get(name).cloned().or(default) {
            Some(v) => v,
            None => return Ok(None),
        };
        coerce::convert(raw, ty).map(Some)
    }

    /// Evaluate `expression_text` against the current table, optionally
    /// coerce through `type_hint`, then commit atomically.
    pub fn set(&mut self, name: &str, expression_text: &str, type_hint: Option<&TypeSpec>) -> Result<Value, VariableEvaluationError> {
        let mut value = expr::evaluate(expression_text, &self.vars)?;
        if let Some(t) = type_hint {
            value = coerce::convert(value, t).map_err(|e| VariableEvaluationError::Value(e.to_string()))?;
        }
        self.vars.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Evaluate `text` in the sandbox without mutating the table.
    pub fn evaluate_expression(&self, text: &str) -> Result<Value, VariableEvaluationError> {
        expr::evaluate(text, &self.vars)
    }

    /// Bind `name` to an already-computed `Value`, bypassing the sandboxed
    /// evaluator. Used for loop/parallel item binding, where the value
    /// comes from iterating a collection rather than from source text.
    pub fn set_value(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    /// Remove `name`, returning whether it existed.
    pub fn delete(&mut self, name: &str) -> bool {
        self.vars.shift_remove(name).is_some()
    }

    /// A defensive copy of the whole table.
    pub fn list_variables(&self) -> IndexMap<String, Value> {
        self.vars.clone()
    }

    /// `$name`/`${expr}` interpolation over the current table (P9).
    pub fn expand_variables(&self, text: &str) -> String {
        interpolate::expand(text, &self.vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_defaults_are_present() {
        let vm = VariableManager::new();
        assert_eq!(vm.list_variables().get("servers"), Some(&Value::List(vec![])));
        assert_eq!(vm.list_variables().get("cleanup_days"), Some(&Value::Int(30)));
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut vm = VariableManager::new();
        vm.set("x", "1 + 2", None).unwrap();
        assert_eq!(vm.get("x", None, None), Some(Value::Int(3)));
    }

    #[test]
    fn get_with_failing_type_hint_returns_raw_value_not_error() {
        let mut vm = VariableManager::new();
        vm.set("name", "'not-a-number'", None).unwrap();
        let v = vm.get("name", None, Some(&TypeSpec::Int));
        assert_eq!(v, Some(Value::String("not-a-number".into())));
    }

    #[test]
    fn get_typed_raises_on_coercion_failure() {
        let mut vm = VariableManager::new();
        vm.set("name", "'not-a-number'", None).unwrap();
        assert!(vm.get_typed("name", &TypeSpec::Int, None).is_err());
    }

    #[test]
    fn delete_reports_existence() {
        let mut vm = VariableManager::new();
        assert!(vm.delete("servers"));
        assert!(!vm.delete("servers"));
    }

    #[test]
    fn evaluate_expression_does_not_mutate() {
        let vm = VariableManager::new();
        vm.evaluate_expression("1 + 1").unwrap();
        assert!(!vm.list_variables().contains_key("1"));
    }
}
