use async_trait::async_trait;
use indexmap::IndexMap;

use crate::commands::types::Command;
use crate::error::ShellError;
use crate::params::ParameterDefinition;
use crate::shell::Shell;
use crate::value::{TypeSpec, Value};

pub struct SetCommand;

#[async_trait]
impl Command for SetCommand {
    fn name(&self) -> &'static str {
        "set"
    }

    fn description(&self) -> &'static str {
        "Evaluate an expression and bind it to a variable"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0),
            ParameterDefinition::new("expression", TypeSpec::Str).mandatory().at_position(1),
        ]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = args.get("name").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("name".into()))?.to_string();
        let expression = args.get("expression").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("expression".into()))?.to_string();
        shell.vars.set(&name, &expression, None)?;
        Ok(true)
    }
}

pub struct GetCommand;

#[async_trait]
impl Command for GetCommand {
    fn name(&self) -> &'static str {
        "get"
    }

    fn description(&self) -> &'static str {
        "Print the current value of a variable"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0)]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = args.get("name").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("name".into()))?.to_string();
        match shell.vars.get(&name, None, None) {
            Some(value) => {
                shell.print(value.to_string());
                Ok(true)
            }
            None => Err(ShellError::VariableEvaluation(crate::error::VariableEvaluationError::UndefinedName(name))),
        }
    }
}

/// Always reports success — per the spec, removing a variable that was
/// never set is not an error.
pub struct UnsetCommand;

#[async_trait]
impl Command for UnsetCommand {
    fn name(&self) -> &'static str {
        "unset"
    }

    fn description(&self) -> &'static str {
        "Remove a variable from the table"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0)]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = args.get("name").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("name".into()))?.to_string();
        shell.vars.delete(&name);
        Ok(true)
    }
}

pub struct VarsCommand;

#[async_trait]
impl Command for VarsCommand {
    fn name(&self) -> &'static str {
        "vars"
    }

    fn description(&self) -> &'static str {
        "List every variable currently bound"
    }

    async fn execute_command(&self, shell: &mut Shell, _args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let vars = shell.vars.list_variables();
        for (name, value) in vars.iter() {
            shell.print(format!("{} = {}", name, value));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let mut shell = Shell::new_in_memory();
        let mut args = IndexMap::new();
        args.insert("name".to_string(), Value::String("x".to_string()));
        args.insert("expression".to_string(), Value::String("2 + 2".to_string()));
        SetCommand.execute_command(&mut shell, &args).await.unwrap();

        let mut get_args = IndexMap::new();
        get_args.insert("name".to_string(), Value::String("x".to_string()));
        GetCommand.execute_command(&mut shell, &get_args).await.unwrap();
        assert_eq!(shell.last_output(), Some("4"));
    }

    #[tokio::test]
    async fn unset_missing_variable_still_succeeds() {
        let mut shell = Shell::new_in_memory();
        let mut args = IndexMap::new();
        args.insert("name".to_string(), Value::String("ghost".to_string()));
        assert!(UnsetCommand.execute_command(&mut shell, &args).await.unwrap());
    }
}
