//! ParameterDefinition (spec C4): the formal-parameter metadata derived
//! from a command's declared fields.

use crate::value::{TypeSpec, Value};

#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    pub name: String,
    pub ty: TypeSpec,
    pub default: Option<Value>,
    pub mandatory: bool,
    pub position: Option<usize>,
    pub aliases: Vec<String>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, ty: TypeSpec) -> Self {
        Self { name: name.into(), ty, default: None, mandatory: false, position: None, aliases: Vec::new() }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Primary CLI spelling, e.g. `-server_name`.
    pub fn flag(&self) -> String {
        format!("-{}", self.name)
    }

    /// Alias CLI spellings, e.g. `-v` for alias `v`.
    pub fn alias_flags(&self) -> Vec<String> {
        self.aliases.iter().map(|a| format!("-{}", a)).collect()
    }

    pub fn matches_token(&self, token: &str) -> bool {
        token == self.flag() || self.alias_flags().iter().any(|a| a == token)
    }
}

/// Assigns positional indices: explicit positions are honored as given;
/// remaining mandatory parameters without an explicit position are
/// auto-assigned in declaration order, starting after the highest explicit
/// position. Named-only (non-mandatory, unpositioned) parameters keep
/// `position = None`.
pub fn assign_positions(mut params: Vec<ParameterDefinition>) -> Vec<ParameterDefinition> {
    let highest_explicit = params.iter().filter_map(|p| p.position).max();
    let mut next = highest_explicit.map(|p| p + 1).unwrap_or(0);
    for p in params.iter_mut() {
        if p.position.is_none() && p.mandatory {
            p.position = Some(next);
            next += 1;
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_position_is_preserved() {
        let params = vec![ParameterDefinition::new("server_name", TypeSpec::Str).mandatory().at_position(0)];
        let assigned = assign_positions(params);
        assert_eq!(assigned[0].position, Some(0));
    }

    #[test]
    fn mandatory_without_position_is_auto_assigned_after_highest_explicit() {
        let params = vec![
            ParameterDefinition::new("a", TypeSpec::Str).mandatory().at_position(2),
            ParameterDefinition::new("b", TypeSpec::Str).mandatory(),
            ParameterDefinition::new("c", TypeSpec::Bool).with_default(Value::Bool(false)),
        ];
        let assigned = assign_positions(params);
        assert_eq!(assigned[0].position, Some(2));
        assert_eq!(assigned[1].position, Some(3));
        assert_eq!(assigned[2].position, None);
    }

    #[test]
    fn alias_exposed_with_dash_prefix() {
        let p = ParameterDefinition::new("verbose", TypeSpec::Bool).with_aliases(["v"]);
        assert_eq!(p.alias_flags(), vec!["-v".to_string()]);
        assert!(p.matches_token("-v"));
    }
}
