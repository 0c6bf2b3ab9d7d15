use async_trait::async_trait;
use indexmap::IndexMap;

use crate::commands::types::Command;
use crate::error::ShellError;
use crate::params::ParameterDefinition;
use crate::shell::Shell;
use crate::store::{Endpoint, System};
use crate::value::{TypeSpec, Value};

pub struct AddSystemCommand;

#[async_trait]
impl Command for AddSystemCommand {
    fn name(&self) -> &'static str {
        "add-system"
    }

    fn description(&self) -> &'static str {
        "Register a new system in the config store"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0),
            ParameterDefinition::new("hostname", TypeSpec::Str).mandatory().at_position(1),
            ParameterDefinition::new("port", TypeSpec::Int).with_default(Value::Int(22)),
        ]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = args.get("name").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("name".into()))?.to_string();
        let hostname = args.get("hostname").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("hostname".into()))?.to_string();
        let port = args.get("port").and_then(Value::as_int).unwrap_or(22) as u16;

        let system = System::new(name.clone(), Endpoint::new(hostname, port));
        shell.store.lock().await.add_system(system)?;
        shell.print(format!("Added system {}", name));
        Ok(true)
    }
}

pub struct RemoveSystemCommand;

#[async_trait]
impl Command for RemoveSystemCommand {
    fn name(&self) -> &'static str {
        "remove-system"
    }

    fn description(&self) -> &'static str {
        "Remove a system from the config store"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0)]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = args.get("name").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("name".into()))?.to_string();
        shell.store.lock().await.remove_system(&name)?;
        shell.print(format!("Removed system {}", name));
        Ok(true)
    }
}

pub struct ListSystemsCommand;

#[async_trait]
impl Command for ListSystemsCommand {
    fn name(&self) -> &'static str {
        "list-systems"
    }

    fn description(&self) -> &'static str {
        "List every system in the config store"
    }

    async fn execute_command(&self, shell: &mut Shell, _args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let lines: Vec<String> = {
            let store = shell.store.lock().await;
            store.list_systems().iter().map(|s| format!("{} ({}:{}) {:?}", s.name, s.endpoint.hostname, s.endpoint.port, s.endpoint.status)).collect()
        };
        if lines.is_empty() {
            shell.print("No systems registered");
        } else {
            for line in lines {
                shell.print(line);
            }
        }
        Ok(true)
    }
}

pub struct ShowSystemCommand;

#[async_trait]
impl Command for ShowSystemCommand {
    fn name(&self) -> &'static str {
        "show-system"
    }

    fn description(&self) -> &'static str {
        "Show the details of a single system"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0)]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = args.get("name").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("name".into()))?.to_string();

        let summary = {
            let store = shell.store.lock().await;
            let system = store.get_system(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;
            format!(
                "{}: {}:{} status={:?} tags={:?} roles={:?}",
                system.name,
                system.endpoint.hostname,
                system.endpoint.port,
                system.endpoint.status,
                system.tags,
                system.roles.keys().collect::<Vec<_>>()
            )
        };
        shell.print(summary);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_list_then_remove() {
        let mut shell = Shell::new_in_memory();

        let mut add_args = IndexMap::new();
        add_args.insert("name".to_string(), Value::String("web1".to_string()));
        add_args.insert("hostname".to_string(), Value::String("web1.example.com".to_string()));
        AddSystemCommand.execute_command(&mut shell, &add_args).await.unwrap();

        assert_eq!(shell.store.lock().await.list_systems().len(), 1);

        let mut remove_args = IndexMap::new();
        remove_args.insert("name".to_string(), Value::String("web1".to_string()));
        RemoveSystemCommand.execute_command(&mut shell, &remove_args).await.unwrap();
        assert!(shell.store.lock().await.list_systems().is_empty());
    }

    #[tokio::test]
    async fn show_unknown_system_errors() {
        let mut shell = Shell::new_in_memory();
        let mut args = IndexMap::new();
        args.insert("name".to_string(), Value::String("ghost".to_string()));
        let err = ShowSystemCommand.execute_command(&mut shell, &args).await.unwrap_err();
        assert!(matches!(err, ShellError::ServerNotFoundError(_)));
    }
}
