//! Argument binding (spec C4 step 2-4): the two-pass positional/named walk
//! that turns a tokenized argument list into a map of coerced values.

use indexmap::IndexMap;

use crate::coerce;
use crate::error::ShellError;
use crate::params::definition::ParameterDefinition;
use crate::params::tokenize::tokenize;
use crate::value::Value;

pub fn bind(params: &[ParameterDefinition], args_text: &str) -> Result<IndexMap<String, Value>, ShellError> {
    let tokens = tokenize(args_text);
    let mut consumed = vec![false; tokens.len()];
    let mut raw: IndexMap<String, String> = IndexMap::new();

    // First pass: named bindings.
    let mut i = 0;
    while i < tokens.len() {
        if consumed[i] {
            i += 1;
            continue;
        }
        let token = &tokens[i];
        if token.starts_with('-') {
            let param = params.iter().find(|p| p.matches_token(token));
            let param = match param {
                Some(p) => p,
                None => return Err(ShellError::UnknownParameter(token.clone())),
            };
            consumed[i] = true;
            let has_value = i + 1 < tokens.len() && !tokens[i + 1].starts_with('-');
            if has_value {
                raw.insert(param.name.clone(), tokens[i + 1].clone());
                consumed[i + 1] = true;
                i += 2;
            } else {
                raw.insert(param.name.clone(), "true".to_string());
                i += 1;
            }
        } else {
            i += 1;
        }
    }

    // Second pass: positionals, in position-index order, skipping anything
    // already bound by name.
    let mut positional_params: Vec<&ParameterDefinition> =
        params.iter().filter(|p| p.position.is_some() && !raw.contains_key(&p.name)).collect();
    positional_params.sort_by_key(|p| p.position.unwrap());

    let remaining_tokens: Vec<&String> = tokens.iter().zip(consumed.iter()).filter(|(_, c)| !**c).map(|(t, _)| t).collect();

    for (param, token) in positional_params.into_iter().zip(remaining_tokens.into_iter()) {
        raw.insert(param.name.clone(), token.clone());
    }

    // Mandatory-without-default check.
    for param in params {
        if param.mandatory && param.default.is_none() && !raw.contains_key(&param.name) {
            return Err(ShellError::MissingMandatoryParameter(param.name.clone()));
        }
    }

    // Coerce every binding, falling back to declared defaults.
    let mut bound = IndexMap::new();
    for param in params {
        let value = if let Some(text) = raw.get(&param.name) {
            coerce::convert_from_str(text, &param.ty).map_err(|e| {
                ShellError::other(format!("Cannot convert {} to {} for parameter '{}': {}", text, param.ty, param.name, e))
            })?
        } else if let Some(default) = &param.default {
            default.clone()
        } else {
            Value::Null
        };
        bound.insert(param.name.clone(), value);
    }

    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::definition::{assign_positions, ParameterDefinition};
    use crate::value::TypeSpec;

    fn connect_params() -> Vec<ParameterDefinition> {
        assign_positions(vec![
            ParameterDefinition::new("server_name", TypeSpec::Str).mandatory().at_position(0),
            ParameterDefinition::new("port", TypeSpec::Int).with_default(Value::Int(22)),
        ])
    }

    #[test]
    fn positional_and_named_mix() {
        let bound = bind(&connect_params(), "prod01 -port 2222").unwrap();
        assert_eq!(bound.get("server_name"), Some(&Value::String("prod01".into())));
        assert_eq!(bound.get("port"), Some(&Value::Int(2222)));
    }

    #[test]
    fn unbound_mandatory_parameter_errors() {
        let err = bind(&connect_params(), "-port 2222").unwrap_err();
        assert!(matches!(err, ShellError::MissingMandatoryParameter(_)));
    }

    #[test]
    fn unknown_named_parameter_errors() {
        let err = bind(&connect_params(), "prod01 -bogus x").unwrap_err();
        assert!(matches!(err, ShellError::UnknownParameter(_)));
    }

    #[test]
    fn bool_flag_with_no_value_binds_true() {
        let params = vec![ParameterDefinition::new("verbose", TypeSpec::Bool).with_default(Value::Bool(false))];
        let bound = bind(&params, "-verbose").unwrap();
        assert_eq!(bound.get("verbose"), Some(&Value::Bool(true)));
    }

    #[test]
    fn default_is_used_when_unbound() {
        let bound = bind(&connect_params(), "prod01").unwrap();
        assert_eq!(bound.get("port"), Some(&Value::Int(22)));
    }
}
